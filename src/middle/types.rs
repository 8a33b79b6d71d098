//! Type-Mapping Tables
//!
//! Maps C types from the SDK header to V8 conversion expressions in both
//! directions and to declared script types. Lookup is staged: exact basic
//! match, then struct base name, then pointer category, then an explicit
//! unknown marker.
//!
//! Expression templates use `{v}` for the value, `{n}` for the argument
//! name, `{t}` for the canonical C type and `{len}` for an element count.

use std::collections::HashMap;

use log::warn;

use crate::frontend::ast::VARIADIC;

/// Which table produced a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    Exact,
    Struct,
    Pointer,
    Unknown,
}

/// A generated conversion expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub expr: String,
    pub source: MappingSource,
    /// Element count taken from the row default because none was known
    pub assumed_len: Option<usize>,
}

impl Conversion {
    fn new(expr: String, source: MappingSource) -> Self {
        Self {
            expr,
            source,
            assumed_len: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.source == MappingSource::Unknown
    }
}

/// Exact-match row
#[derive(Debug, Clone)]
pub struct BasicMapping {
    to_native: &'static str,
    to_script: &'static str,
    pub declared: &'static str,
}

/// Struct row keyed by base name
#[derive(Debug, Clone)]
pub struct StructMapping {
    /// Suffix of `structures::wrapX` / `structures::unwrapX`
    pub wrapper: &'static str,
    pub declared: &'static str,
    /// Parameter type of the wrap function when a const pointer needs a cast
    const_cast: Option<&'static str>,
}

/// Pointer-category row keyed by pointee
#[derive(Debug, Clone)]
pub struct PointerMapping {
    to_native: &'static str,
    to_script: &'static str,
    pub declared: &'static str,
    /// Length used by array conversions when none is known
    pub default_len: Option<usize>,
}

/// Collapse spacing so `const char *`, `const char*` and `const  char *`
/// share one key: words joined by a space, stars glued to the end.
pub fn canonical(ty: &str) -> String {
    let stars = ty.chars().filter(|&c| c == '*').count();
    let words = ty.replace('*', " ");
    let mut out = words.split_whitespace().collect::<Vec<_>>().join(" ");
    out.push_str(&"*".repeat(stars));
    out
}

/// Type without `const`, `struct` and pointer stars
pub fn base_name(ty: &str) -> String {
    ty.replace('*', " ")
        .split_whitespace()
        .filter(|w| *w != "const" && *w != "struct")
        .collect::<Vec<_>>()
        .join(" ")
}

fn pointer_depth(ty: &str) -> usize {
    ty.chars().filter(|&c| c == '*').count()
}

fn render(template: &str, value: &str, name: &str, ty: &str, len: Option<&str>) -> String {
    let mut out = template.replace("{v}", value).replace("{n}", name).replace("{t}", ty);
    if let Some(len) = len {
        out = out.replace("{len}", len);
    }
    out
}

/// The three mapping tables
pub struct TypeTable {
    basic: HashMap<&'static str, BasicMapping>,
    structs: HashMap<&'static str, StructMapping>,
    pointers: HashMap<&'static str, PointerMapping>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            basic: HashMap::new(),
            structs: HashMap::new(),
            pointers: HashMap::new(),
        };
        table.register_all();
        table
    }

    fn basic(&mut self, key: &'static str, to_native: &'static str, to_script: &'static str, declared: &'static str) {
        self.basic.insert(key, BasicMapping { to_native, to_script, declared });
    }

    fn structure(&mut self, base: &'static str, wrapper: &'static str, declared: &'static str, const_cast: Option<&'static str>) {
        self.structs.insert(base, StructMapping { wrapper, declared, const_cast });
    }

    fn pointer(
        &mut self,
        pointee: &'static str,
        to_native: &'static str,
        to_script: &'static str,
        declared: &'static str,
        default_len: Option<usize>,
    ) {
        self.pointers.insert(pointee, PointerMapping { to_native, to_script, declared, default_len });
    }

    fn register_all(&mut self) {
        const STRING_IN: &str = "utils::js2string(isolate, {v})";
        const STRING_OUT: &str = "v8::String::NewFromUtf8(isolate, {v} ? {v} : \"\").ToLocalChecked()";
        const INT_IN: &str = "{v}->Int32Value(context).ToChecked()";
        const UINT_IN: &str = "{v}->Uint32Value(context).ToChecked()";
        const NUMBER_IN: &str = "{v}->NumberValue(context).ToChecked()";
        const NUMBER_OUT: &str = "v8::Number::New(isolate, {v})";
        const EXTERNAL_OUT: &str = "v8::External::New(isolate, {v})";

        // Strings
        self.basic("const char*", STRING_IN, STRING_OUT, "string");
        self.basic("char*", STRING_IN, STRING_OUT, "string");

        // Integers
        for key in ["char", "int", "unsigned char", "short", "unsigned short", "byte"] {
            self.basic(key, INT_IN, NUMBER_OUT, "number");
        }
        self.basic("unsigned int", UINT_IN, NUMBER_OUT, "number");
        self.basic("CRC32_t", UINT_IN, NUMBER_OUT, "number");
        self.basic("float", NUMBER_IN, NUMBER_OUT, "number");
        self.basic("double", NUMBER_IN, NUMBER_OUT, "number");
        self.basic("qboolean", "{v}->BooleanValue(isolate)", "v8::Boolean::New(isolate, {v})", "boolean");

        // SDK enums travel as plain integers
        self.basic("ALERT_TYPE", "(ALERT_TYPE){v}->Int32Value(context).ToChecked()", NUMBER_OUT, "number");
        self.basic("FORCE_TYPE", "(FORCE_TYPE){v}->Int32Value(context).ToChecked()", NUMBER_OUT, "number");
        self.basic("PRINT_TYPE", "(PRINT_TYPE){v}->Int32Value(context).ToChecked()", NUMBER_OUT, "number");

        // Values with dedicated helpers
        self.basic("vec3_t", "{n}_vec", "utils::vect2js(isolate, {v})", "number[]");
        self.basic(
            "TraceResult",
            "*structures::unwrapTraceResult(isolate, {v})",
            "structures::wrapTraceResult(isolate, &{v})",
            "TraceResult",
        );

        // Opaque and multi-level pointers
        self.basic("void*", "utils::jsToPointer(isolate, {v})", EXTERNAL_OUT, "ArrayBuffer | null");
        self.basic("FILE*", "(FILE*)utils::jsToPointer(isolate, {v})", EXTERNAL_OUT, "FileHandle");
        self.basic("char**", "(char**)utils::jsToPointer(isolate, {v})", "utils::stringArrayToJS(isolate, {v})", "string[]");
        self.basic(
            "unsigned char**",
            "(unsigned char**)utils::jsToPointer(isolate, {v})",
            EXTERNAL_OUT,
            "ArrayBuffer | null",
        );
        self.basic(
            "const struct usercmd_s*",
            "(const struct usercmd_s*)structures::unwrapUserCmd(isolate, {v})",
            "structures::wrapUserCmd(isolate, (void*){v})",
            "UserCmd",
        );
        self.basic(
            "const struct netadr_s*",
            "(const struct netadr_s*)structures::unwrapNetAdr(isolate, {v})",
            "structures::wrapNetAdr(isolate, (void*){v})",
            "NetAdr",
        );
        self.basic(VARIADIC, "/* variadic args */", "/* variadic args */", "any[]");

        // Structs, by base name
        self.structure("edict_t", "Entity", "Entity", None);
        self.structure("edict_s", "Entity", "Entity", None);
        self.structure("entvars_t", "Entvars", "Entvars", Some("entvars_t*"));
        self.structure("entvars_s", "Entvars", "Entvars", Some("entvars_t*"));
        self.structure("clientdata_s", "ClientData", "ClientData", Some("void*"));
        self.structure("entity_state_s", "EntityState", "EntityState", Some("void*"));
        self.structure("usercmd_s", "UserCmd", "UserCmd", Some("void*"));
        self.structure("netadr_s", "NetAdr", "NetAdr", Some("void*"));
        self.structure("weapon_data_s", "WeaponData", "WeaponData", Some("void*"));
        self.structure("playermove_s", "PlayerMove", "PlayerMove", Some("void*"));
        self.structure("customization_t", "Customization", "Customization", Some("void*"));
        self.structure("KeyValueData", "KeyValueData", "KeyValueData", Some("void*"));
        self.structure("SAVERESTOREDATA", "SaveRestoreData", "SaveRestoreData", Some("void*"));
        self.structure("TYPEDESCRIPTION", "TypeDescription", "TypeDescription", Some("void*"));
        self.structure("delta_s", "Delta", "Delta", Some("void*"));
        self.structure("cvar_s", "Cvar", "Cvar", Some("void*"));
        self.structure("cvar_t", "Cvar", "Cvar", Some("void*"));
        self.structure("TraceResult", "TraceResult", "TraceResult", Some("TraceResult*"));

        // Pointer categories
        self.pointer(
            "float",
            "(float*)utils::jsToPointer(isolate, {v})",
            "utils::floatArrayToJS(isolate, {v}, {len})",
            "number[]",
            Some(3),
        );
        self.pointer(
            "int",
            "(int*)utils::jsToPointer(isolate, {v})",
            "utils::intArrayToJS(isolate, {v}, {len})",
            "number[]",
            Some(1),
        );
        self.pointer(
            "unsigned char",
            "(unsigned char*)utils::jsToPointer(isolate, {v})",
            "utils::byteArrayToJS(isolate, {v}, {len})",
            "Uint8Array",
            Some(1),
        );
        self.pointer(
            "byte",
            "(byte*)utils::jsToPointer(isolate, {v})",
            "utils::byteArrayToJS(isolate, {v}, {len})",
            "Uint8Array",
            Some(1),
        );
        self.pointer("void", "utils::jsToPointer(isolate, {v})", EXTERNAL_OUT, "ArrayBuffer | null", None);
        self.pointer("CRC32_t", "(CRC32_t*)utils::jsToPointer(isolate, {v})", EXTERNAL_OUT, "ArrayBuffer | null", None);
        self.pointer("FILE", "(FILE*)utils::jsToPointer(isolate, {v})", EXTERNAL_OUT, "FileHandle", None);
    }

    /// Struct row for a value or single pointer
    pub fn struct_mapping(&self, ty: &str) -> Option<&StructMapping> {
        let canon = canonical(ty);
        if self.basic.contains_key(canon.as_str()) || pointer_depth(&canon) > 1 {
            return None;
        }
        self.structs.get(base_name(&canon).as_str())
    }

    /// Pointer row for a single pointer whose pointee is not a struct
    pub fn pointer_mapping(&self, ty: &str) -> Option<&PointerMapping> {
        let canon = canonical(ty);
        if pointer_depth(&canon) != 1 || self.basic.contains_key(canon.as_str()) || self.struct_mapping(&canon).is_some() {
            return None;
        }
        self.pointers.get(base_name(&canon).as_str())
    }

    pub fn is_struct(&self, ty: &str) -> bool {
        self.struct_mapping(ty).is_some()
    }

    /// Native value to script value, with no known element count
    pub fn native_to_script(&self, ty: &str, value: &str) -> Conversion {
        self.native_to_script_sized(ty, value, None)
    }

    /// Native value to script value; `len` (a count or a C expression)
    /// overrides a pointer row's default
    pub fn native_to_script_sized(&self, ty: &str, value: &str, len: Option<&str>) -> Conversion {
        let canon = canonical(ty);

        if let Some(row) = self.basic.get(canon.as_str()) {
            return Conversion::new(render(row.to_script, value, "", &canon, None), MappingSource::Exact);
        }

        if let Some(row) = self.struct_mapping(&canon) {
            let is_const = canon.split_whitespace().any(|w| w == "const");
            let arg = match row.const_cast {
                Some(cast) if is_const => format!("({}){}", cast, value),
                _ => value.to_string(),
            };
            let expr = format!("structures::wrap{}(isolate, {})", row.wrapper, arg);
            return Conversion::new(expr, MappingSource::Struct);
        }

        if let Some(row) = self.pointer_mapping(&canon) {
            let mut conversion = Conversion::new(String::new(), MappingSource::Pointer);
            let needs_len = row.to_script.contains("{len}");
            let fallback = row.default_len.map(|n| n.to_string());
            let effective = match len {
                Some(len) => Some(len),
                None if needs_len => {
                    conversion.assumed_len = row.default_len;
                    fallback.as_deref()
                }
                None => None,
            };
            conversion.expr = render(row.to_script, value, "", &canon, effective);
            return conversion;
        }

        warn!("no native-to-script mapping for type `{}`", ty);
        Conversion::new(
            format!("v8::External::New(isolate, (void*){}) /* unknown type: {} */", value, ty),
            MappingSource::Unknown,
        )
    }

    /// Script value to native value; `name` names staging locals (`vec3_t`)
    pub fn script_to_native(&self, ty: &str, value: &str, name: &str) -> Conversion {
        let canon = canonical(ty);

        if let Some(row) = self.basic.get(canon.as_str()) {
            return Conversion::new(render(row.to_native, value, name, &canon, None), MappingSource::Exact);
        }

        if let Some(row) = self.struct_mapping(&canon) {
            let call = format!("structures::unwrap{}(isolate, {})", row.wrapper, value);
            let expr = if pointer_depth(&canon) == 0 {
                format!("*({}*){}", canon, call)
            } else {
                format!("({}){}", canon, call)
            };
            return Conversion::new(expr, MappingSource::Struct);
        }

        if let Some(row) = self.pointer_mapping(&canon) {
            return Conversion::new(render(row.to_native, value, name, &canon, None), MappingSource::Pointer);
        }

        warn!("no script-to-native mapping for type `{}`", ty);
        Conversion::new(format!("nullptr /* unknown type: {} */", ty), MappingSource::Unknown)
    }

    /// Declared script type for a C type
    pub fn declared_type(&self, ty: &str) -> String {
        let canon = canonical(ty);
        if canon == "void" {
            return "void".to_string();
        }
        if let Some(row) = self.basic.get(canon.as_str()) {
            return row.declared.to_string();
        }
        if let Some(row) = self.struct_mapping(&canon) {
            return row.declared.to_string();
        }
        if let Some(row) = self.pointer_mapping(&canon) {
            return row.declared.to_string();
        }
        if pointer_depth(&canon) > 0 {
            return "ArrayBuffer | null".to_string();
        }
        "unknown".to_string()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_spellings() {
        assert_eq!(canonical("const char *"), "const char*");
        assert_eq!(canonical("const  char*"), "const char*");
        assert_eq!(canonical("char **"), "char**");
        assert_eq!(canonical("FILE *"), "FILE*");
        assert_eq!(base_name("const struct usercmd_s *"), "usercmd_s");
    }

    #[test]
    fn test_every_row_maps_both_ways() {
        let table = TypeTable::new();
        for key in table.basic.keys() {
            assert!(!table.native_to_script(key, "v").is_unknown(), "{}", key);
            assert!(!table.script_to_native(key, "info[0]", "v").is_unknown(), "{}", key);
        }
        for (base, row) in &table.structs {
            let ty = format!("{} *", base);
            assert_eq!(table.native_to_script(&ty, "v").source, MappingSource::Struct, "{}", ty);
            assert_eq!(table.script_to_native(&ty, "info[0]", "v").source, MappingSource::Struct, "{}", ty);
            assert_eq!(table.declared_type(&ty), row.declared);
        }
    }

    #[test]
    fn test_basic_conversions() {
        let table = TypeTable::new();
        assert_eq!(
            table.script_to_native("const char *", "info[0]", "s").expr,
            "utils::js2string(isolate, info[0])"
        );
        assert_eq!(
            table.native_to_script("int", "result").expr,
            "v8::Number::New(isolate, result)"
        );
        assert_eq!(table.script_to_native("vec3_t", "info[1]", "origin").expr, "origin_vec");
        assert_eq!(table.declared_type("qboolean"), "boolean");
    }

    #[test]
    fn test_struct_lookup_strips_qualifiers() {
        let table = TypeTable::new();
        assert_eq!(
            table.native_to_script("const edict_t *", "pEdict").expr,
            "structures::wrapEntity(isolate, pEdict)"
        );
        assert_eq!(
            table.native_to_script("const struct entity_state_s *", "state").expr,
            "structures::wrapEntityState(isolate, (void*)state)"
        );
        assert_eq!(
            table.script_to_native("edict_t *", "info[0]", "e").expr,
            "(edict_t*)structures::unwrapEntity(isolate, info[0])"
        );
        assert_eq!(table.declared_type("struct cvar_s *"), "Cvar");
    }

    #[test]
    fn test_pointer_lengths() {
        let table = TypeTable::new();
        let assumed = table.native_to_script("float *", "rgflOrigin");
        assert_eq!(assumed.expr, "utils::floatArrayToJS(isolate, rgflOrigin, 3)");
        assert_eq!(assumed.assumed_len, Some(3));

        let sized = table.native_to_script_sized("float*", "rgflOrigin", Some("4"));
        assert_eq!(sized.expr, "utils::floatArrayToJS(isolate, rgflOrigin, 4)");
        assert_eq!(sized.assumed_len, None);

        assert_eq!(table.declared_type("unsigned char *"), "Uint8Array");
        assert_eq!(table.native_to_script("void *", "p").assumed_len, None);
    }

    #[test]
    fn test_unknown_types_are_marked() {
        let table = TypeTable::new();
        let conversion = table.script_to_native("model_t", "info[0]", "m");
        assert!(conversion.is_unknown());
        assert!(conversion.expr.contains("/* unknown type: model_t */"));
        assert_eq!(table.declared_type("model_t"), "unknown");
        assert_eq!(table.declared_type("model_t *"), "ArrayBuffer | null");
    }
}
