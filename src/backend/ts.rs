//! Declaration builder
//!
//! Typed TypeScript fragments rendered through the shared `CodeWriter`.

use crate::backend::cpp::CodeWriter;

/// One parameter of a declared function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsParam {
    pub name: String,
    pub ty: String,
    /// C type shown in event docs
    pub original_type: String,
}

impl TsParam {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, original_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            original_type: original_type.into(),
        }
    }
}

/// `name(p: T, ...): R`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsSignature {
    pub name: String,
    pub params: Vec<TsParam>,
    /// Append `...args: any[]`
    pub rest: bool,
    pub ret: String,
    /// Single-line doc comment (the raw C declaration)
    pub doc: Option<String>,
}

impl TsSignature {
    pub fn new(name: impl Into<String>, ret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            rest: false,
            ret: ret.into(),
            doc: None,
        }
    }

    pub fn param_list(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
        if self.rest {
            parts.push("...args: any[]".to_string());
        }
        parts.join(", ")
    }

    /// Method form without the trailing semicolon
    pub fn render(&self) -> String {
        format!("{}({}): {}", self.name, self.param_list(), self.ret)
    }

    /// `/** doc */` then `name(...): R;`
    pub fn render_method(&self, w: &mut CodeWriter) {
        if let Some(doc) = &self.doc {
            w.writeln(&format!("/** {} */", doc));
        }
        w.writeln(&format!("{};", self.render()));
    }

    /// Event-map property: `"name": (...) => void;` with param docs
    pub fn render_event(&self, w: &mut CodeWriter) {
        w.writeln("/**");
        w.writeln(&format!(" * Event handler for {}", self.name));
        for param in &self.params {
            w.writeln(&format!(" * @param {} {} - {}", param.name, param.original_type, param.ty));
        }
        w.writeln(" */");
        w.writeln(&format!("\"{}\": ({}) => {};", self.name, self.param_list(), self.ret));
    }
}

/// A member of a declared interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsMember {
    Property { name: String, ty: String },
    Method(TsSignature),
    Event(TsSignature),
    Comment(String),
}

/// `interface Name { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsInterface {
    pub name: String,
    pub members: Vec<TsMember>,
    /// Blank line between members
    pub spaced: bool,
}

impl TsInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            spaced: false,
        }
    }

    pub fn spaced(mut self) -> Self {
        self.spaced = true;
        self
    }

    pub fn property(&mut self, name: impl Into<String>, ty: impl Into<String>) {
        self.members.push(TsMember::Property {
            name: name.into(),
            ty: ty.into(),
        });
    }

    pub fn push(&mut self, member: TsMember) {
        self.members.push(member);
    }

    pub fn render(&self, w: &mut CodeWriter) {
        w.open(&format!("interface {}", self.name));
        for (i, member) in self.members.iter().enumerate() {
            if self.spaced && i > 0 {
                w.blank();
            }
            match member {
                TsMember::Property { name, ty } => w.writeln(&format!("{}: {};", name, ty)),
                TsMember::Method(sig) => sig.render_method(w),
                TsMember::Event(sig) => sig.render_event(w),
                TsMember::Comment(text) => w.writeln(&format!("// {}", text)),
            }
        }
        w.close("}");
    }
}

/// `const enum` / `enum` declaration with optional trailing comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsEnum {
    pub name: String,
    pub is_const: bool,
    pub doc: Option<String>,
    pub values: Vec<(String, i64, Option<String>)>,
}

impl TsEnum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_const: false,
            doc: None,
            values: Vec::new(),
        }
    }

    pub fn value(&mut self, name: impl Into<String>, value: i64, comment: Option<&str>) {
        self.values.push((name.into(), value, comment.map(str::to_string)));
    }

    pub fn render(&self, w: &mut CodeWriter) {
        if let Some(doc) = &self.doc {
            w.writeln(&format!("/** {} */", doc));
        }
        let keyword = if self.is_const { "const enum" } else { "enum" };
        w.open(&format!("{} {}", keyword, self.name));
        for (name, value, comment) in &self.values {
            match comment {
                Some(comment) => w.writeln(&format!("{} = {}, // {}", name, value, comment)),
                None => w.writeln(&format!("{} = {},", name, value)),
            }
        }
        w.close("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_signature_render() {
        let mut sig = TsSignature::new("setModel", "void");
        sig.params.push(TsParam::new("e", "Entity", "edict_t *"));
        sig.params.push(TsParam::new("m", "string", "const char *"));
        assert_eq!(sig.render(), "setModel(e: Entity, m: string): void");

        sig.rest = true;
        assert_eq!(sig.param_list(), "e: Entity, m: string, ...args: any[]");
    }

    #[test]
    fn test_event_render() {
        let mut sig = TsSignature::new("dllClientPutInServer", "void");
        sig.params.push(TsParam::new("pEntity", "Entity", "edict_t *"));
        let mut w = CodeWriter::new();
        sig.render_event(&mut w);
        assert_eq!(
            w.finish(),
            "/**\n * Event handler for dllClientPutInServer\n * @param pEntity edict_t * - Entity\n */\n\"dllClientPutInServer\": (pEntity: Entity) => void;\n"
        );
    }

    #[test]
    fn test_spaced_interface() {
        let mut iface = TsInterface::new("Cvar").spaced();
        iface.property("name", "string");
        iface.property("value", "number");
        let mut w = CodeWriter::new();
        iface.render(&mut w);
        assert_eq!(w.finish(), "interface Cvar {\n  name: string;\n\n  value: number;\n}\n");
    }

    #[test]
    fn test_enum_render() {
        let mut e = TsEnum::new("HAM_RESULT");
        e.is_const = true;
        e.value("UNSET", 0, Some("Default state"));
        e.value("IGNORED", 1, None);
        let mut w = CodeWriter::new();
        e.render(&mut w);
        assert_eq!(
            w.finish(),
            "const enum HAM_RESULT {\n  UNSET = 0, // Default state\n  IGNORED = 1,\n}\n"
        );
    }
}
