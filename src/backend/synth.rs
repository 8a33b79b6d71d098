//! Function Synthesizer
//!
//! Produces the three aligned artifacts for one SDK function: the event
//! hook body (native call into script listeners), the API body (script call
//! into the native function) and the declaration signature. All three are
//! driven by the same normalized argument list, so they agree on argument
//! order and semantic type.
//!
//! Results are returned beside the parsed [`Function`]; the function itself
//! is never modified.

use std::fmt;

use log::warn;
use serde::Serialize;

use crate::backend::cpp::CppFunction;
use crate::backend::ts::{TsParam, TsSignature};
use crate::frontend::ast::{Argument, Direction, Function, TableId};
use crate::middle::normalize::{normalize, NormalizedArg, NormalizedArgs};
use crate::middle::overrides::{CustomOverride, DeclaredParam, OverrideProvider};
use crate::middle::types::{base_name, canonical, Conversion, MappingSource, TypeTable};
use crate::utils::camelize;

/// Frame-tick function unless configured otherwise
pub const DEFAULT_FRAME_TICK: &str = "pfnStartFrame";

const EXTERNAL_PREFIX: &str = "v8::External::New(isolate, ";

/// Something a generated body relies on that needs a human look
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthFlag {
    /// No mapping row; a sentinel expression was emitted
    UnknownType { arg: String, ty: String },
    /// An array conversion used the row's default element count
    AssumedLength { arg: String, len: usize },
}

impl fmt::Display for SynthFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthFlag::UnknownType { arg, ty } => write!(f, "unknown type {} ({})", ty, arg),
            SynthFlag::AssumedLength { arg, len } => write!(f, "assumed length {} for {}", len, arg),
        }
    }
}

/// Output of event synthesis for one slot of a dispatch table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSymbol {
    /// Symbol placed in the dispatch table; `None` renders as `NULL`
    pub symbol: Option<String>,
    pub event_name: Option<String>,
    pub code: String,
    pub flags: Vec<SynthFlag>,
}

/// A function paired with its generated event hook
#[derive(Debug, Clone)]
pub struct SynthesizedEvent<'f> {
    pub function: &'f Function,
    pub direction: Direction,
    pub generated: GeneratedSymbol,
}

impl SynthesizedEvent<'_> {
    /// Dispatch table entry
    pub fn table_entry(&self) -> &str {
        self.generated.symbol.as_deref().unwrap_or("NULL")
    }
}

/// Whether an API body can be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Ready,
    /// Emitted, but not installed
    Flagged(String),
    Unparsable,
}

/// A function paired with its generated API body
#[derive(Debug, Clone)]
pub struct SynthesizedApi<'f> {
    pub function: &'f Function,
    pub symbol: String,
    pub script_name: String,
    pub body: Option<CppFunction>,
    pub status: ApiStatus,
    pub flags: Vec<SynthFlag>,
}

impl SynthesizedApi<'_> {
    /// `{ "scriptName", sf_... }` entry of the installer table
    pub fn definition(&self) -> String {
        format!("{{ \"{}\", {} }}", self.script_name, self.symbol)
    }
}

/// Event name for a function in a direction: `dllServerDeactivate`, `postEngSetModel`
pub fn event_name(func: &Function, table: TableId, direction: Direction) -> String {
    camelize(&format!("{}{}", table.event_prefix(direction), func.bare_name()))
}

/// Hook symbol for a function in a direction: `dll_pfnServerDeactivate`
pub fn event_symbol(func: &Function, table: TableId, direction: Direction) -> String {
    format!("{}_{}", table.event_prefix(direction), func.name)
}

/// API body symbol: `sf_eng_pfnPrecacheModel`
pub fn api_symbol(func: &Function, table: TableId) -> String {
    format!("sf_{}_{}", table.key(), func.name)
}

/// Zero value returned when no listener overrides the result
fn default_return(ty: &str) -> &'static str {
    let canon = canonical(ty);
    if canon.contains('*') {
        "nullptr"
    } else if canon == "float" {
        "0.0f"
    } else if canon == "double" {
        "0.0"
    } else {
        "0"
    }
}

/// Non-const `TraceResult *` argument of a void function: an output parameter
fn trace_out_param(func: &Function) -> Option<&Argument> {
    if !func.returns_void() {
        return None;
    }
    func.fixed_args()
        .find(|a| canonical(&a.ty) == "TraceResult*" && !a.is_const())
}

/// C parameter list of an event hook; `...` is kept
fn c_params(func: &Function) -> String {
    func.args
        .iter()
        .map(|a| if a.is_variadic() { "...".to_string() } else { a.c_decl() })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The synthesizer
pub struct Synthesizer {
    types: TypeTable,
    overrides: Box<dyn OverrideProvider>,
    frame_tick: String,
    namespace: String,
}

impl Synthesizer {
    pub fn new(overrides: Box<dyn OverrideProvider>) -> Self {
        Self {
            types: TypeTable::new(),
            overrides,
            frame_tick: DEFAULT_FRAME_TICK.to_string(),
            namespace: "nodemod".to_string(),
        }
    }

    pub fn with_frame_tick(mut self, function: &str) -> Self {
        self.frame_tick = function.to_string();
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    fn custom(&self, table: TableId, func: &Function) -> Option<&CustomOverride> {
        self.overrides.lookup(table, &func.name)
    }

    /// Record the flags a conversion raises
    fn note(conversion: &Conversion, arg: &str, ty: &str, flags: &mut Vec<SynthFlag>) {
        if conversion.source == MappingSource::Unknown {
            flags.push(SynthFlag::UnknownType {
                arg: arg.to_string(),
                ty: ty.to_string(),
            });
        }
        if let Some(len) = conversion.assumed_len {
            warn!("assuming {} element(s) for `{}` ({})", len, arg, ty);
            flags.push(SynthFlag::AssumedLength {
                arg: arg.to_string(),
                len,
            });
        }
    }

    // ==================== Event bodies ====================

    /// Native value of one event argument as a script value
    fn event_arg(&self, arg: &NormalizedArg, flags: &mut Vec<SynthFlag>) -> String {
        let len = arg
            .length
            .clone()
            .or_else(|| arg.arg.size.map(|n| n.to_string()));
        let mut conversion = self.types.native_to_script_sized(arg.ty(), arg.name(), len.as_deref());

        // External wants a mutable pointer
        if arg.arg.is_const() && !conversion.is_unknown() && conversion.expr.starts_with(EXTERNAL_PREFIX) {
            let cast = format!("(void*){}", arg.name());
            conversion = self.types.native_to_script_sized(arg.ty(), &cast, len.as_deref());
        }

        Self::note(&conversion, arg.name(), arg.ty(), flags);
        conversion.expr
    }

    /// Event hook for one function in one direction
    pub fn event<'f>(&self, func: &'f Function, table: TableId, direction: Direction) -> SynthesizedEvent<'f> {
        let symbol = event_symbol(func, table, direction);
        let custom_event = self.custom(table, func).and_then(|c| c.event.as_ref());

        if func.is_unparsable() && custom_event.is_none() {
            return SynthesizedEvent {
                function: func,
                direction,
                generated: GeneratedSymbol {
                    symbol: None,
                    event_name: None,
                    code: format!("// NULL {}", symbol),
                    flags: Vec::new(),
                },
            };
        }

        let name = event_name(func, table, direction);
        let normalized = normalize(func);
        let mut flags = Vec::new();

        let ret = if func.is_unparsable() { "void" } else { func.return_type.as_str() };
        let params = match custom_event {
            Some(custom) => custom.args.clone(),
            None => c_params(func),
        };
        let listener_args = match self.custom(table, func).and_then(|c| c.declared_parameters.as_ref()) {
            Some(declared) => declared.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
            None => normalized.args.iter().map(|a| a.script_name.clone()).collect(),
        };

        let mut body = CppFunction::new(format!("{} {}({})", ret, symbol, params)).comment(format!(
            "{}.on('{}', ({}) => console.log('{} fired!'));",
            self.namespace,
            name,
            listener_args.join(", "),
            name
        ));
        body.line("SET_META_RESULT(MRES_IGNORED);");
        if direction == Direction::Base && func.name == self.frame_tick {
            body.line("nodeImpl.Tick();");
        }

        if let Some(custom) = custom_event {
            body.line(format!("event::findAndCall(\"{}\", [=](v8::Isolate* isolate) {{", name));
            for line in custom.body.lines() {
                body.line(if line.is_empty() { String::new() } else { format!("  {}", line) });
            }
            body.line("  return std::pair<unsigned int, v8::Local<v8::Value>*>(v8_argCount, v8_args);");
            body.line("});");
        } else if normalized.is_empty() {
            body.line(format!("event::findAndCall(\"{}\", nullptr, 0);", name));
        } else {
            let count = normalized.len();
            body.line(format!("event::findAndCall(\"{}\", [=](v8::Isolate* isolate) {{", name));
            body.line(format!("  unsigned int v8_argCount = {};", count));
            body.line(format!("  v8::Local<v8::Value>* v8_args = new v8::Local<v8::Value>[{}];", count));
            for (i, arg) in normalized.args.iter().enumerate() {
                let expr = self.event_arg(arg, &mut flags);
                body.line(format!("  v8_args[{}] = {}; // {} ({})", i, expr, arg.name(), arg.ty()));
            }
            body.line("  return std::pair<unsigned int, v8::Local<v8::Value>*>(v8_argCount, v8_args);");
            body.line("});");
        }

        if ret != "void" {
            body.line("");
            body.line("META_RES result = event::lastResult();");
            body.line("if (result == MRES_OVERRIDE || result == MRES_SUPERCEDE) {");
            body.line(format!(
                "  RETURN_META_VALUE(result, event::lastReturnValue<{}>());",
                canonical(ret)
            ));
            body.line("}");
            body.line(format!("return {};", default_return(ret)));
        }

        SynthesizedEvent {
            function: func,
            direction,
            generated: GeneratedSymbol {
                symbol: Some(symbol),
                event_name: Some(name),
                code: body.to_source(),
                flags,
            },
        }
    }

    // ==================== API bodies ====================

    /// Staging statements that convert a folded array into a heap buffer
    fn stage_array(func: &Function, arg: &NormalizedArg, index: usize, length: &str) -> Vec<String> {
        let element = base_name(arg.ty());
        let (c_type, getter) = match element.as_str() {
            "float" => ("float", "NumberValue"),
            "unsigned char" | "byte" => ("unsigned char", "Int32Value"),
            _ => ("int", "Int32Value"),
        };
        let length_type = func
            .fixed_args()
            .find(|a| a.name == length)
            .map(|a| a.ty.clone())
            .unwrap_or_else(|| "int".to_string());
        let name = arg.name();

        vec![
            String::new(),
            format!("// Convert script array to {} array for {}", c_type, name),
            format!("v8::Local<v8::Array> {}_array = v8::Local<v8::Array>::Cast(info[{}]);", name, index),
            format!("{} {} = {}_array->Length();", length_type, length, name),
            format!("{}* {} = new {}[{}];", c_type, name, c_type, length),
            format!("for (int j = 0; j < (int){}; j++) {{", length),
            format!(
                "  {}[j] = {}_array->Get(context, j).ToLocalChecked()->{}(context).ToChecked();",
                name, name, getter
            ),
            "}".to_string(),
        ]
    }

    /// API body for one function
    pub fn api<'f>(&self, func: &'f Function, table: TableId) -> SynthesizedApi<'f> {
        let symbol = api_symbol(func, table);
        let script_name = func.script_name();

        if func.is_unparsable() {
            return SynthesizedApi {
                function: func,
                symbol,
                script_name,
                body: None,
                status: ApiStatus::Unparsable,
                flags: Vec::new(),
            };
        }

        let mut body = CppFunction::new(format!(
            "void {}(const v8::FunctionCallbackInfo<v8::Value>& info)",
            symbol
        ))
        .brace_on_new_line()
        .comment(format!("{}.{}.{}();", self.namespace, table.key(), script_name));
        body.line("V8_STUFF();");

        let mut flags = Vec::new();

        if let Some(custom) = self.custom(table, func).and_then(|c| c.api_body.as_ref()) {
            body.line(custom);
            return SynthesizedApi {
                function: func,
                symbol,
                script_name,
                body: Some(body),
                status: ApiStatus::Ready,
                flags,
            };
        }

        let normalized = normalize(func);
        let out_param = trace_out_param(func);
        let script_args = script_args(&normalized, out_param);

        let mut staging = Vec::new();
        let mut checks = Vec::new();
        let mut cleanup = Vec::new();

        if let Some(out) = out_param {
            staging.push(format!("TraceResult {}_result = {{}};", out.name));
        }

        for (index, arg) in script_args.iter().enumerate() {
            if canonical(arg.ty()) == "vec3_t" {
                staging.push(format!("vec3_t {}_vec;", arg.name()));
                staging.push(format!(
                    "utils::js2vect(isolate, v8::Local<v8::Array>::Cast(info[{}]), {}_vec);",
                    index,
                    arg.name()
                ));
            } else if let Some(length) = &arg.length {
                staging.extend(Self::stage_array(func, arg, index, length));
                cleanup.push(format!("delete[] {}; // Free allocated array", arg.name()));
            } else if arg.arg.is_pointer() && !arg.arg.is_char_pointer() && !self.types.is_struct(arg.ty()) {
                checks.push(format!("if (!info[{}]->IsExternal()) {{", index));
                checks.push(format!(
                    "  printf(\"Warning: {} parameter {} ({}) is not External, using nullptr\\n\");",
                    func.name,
                    index,
                    arg.ty()
                ));
                checks.push("}".to_string());
            }
        }

        // Call arguments follow the C declaration, not the script list
        let mut call_args = Vec::new();
        for arg in func.fixed_args() {
            if out_param.map(|o| o.name == arg.name).unwrap_or(false) {
                call_args.push(format!("&{}_result", arg.name));
                continue;
            }
            if normalized.is_length_of_array(&arg.name) {
                call_args.push(arg.name.clone());
                continue;
            }
            match script_args.iter().position(|a| a.name() == arg.name) {
                Some(index) => {
                    let folded = script_args[index].length.is_some();
                    if folded {
                        call_args.push(arg.name.clone());
                    } else {
                        let conversion = self.types.script_to_native(&arg.ty, &format!("info[{}]", index), &arg.name);
                        Self::note(&conversion, &arg.name, &arg.ty, &mut flags);
                        call_args.push(conversion.expr);
                    }
                }
                None => call_args.push(format!("nullptr /* missing parameter: {} */", arg.name)),
            }
        }
        let call = format!("{}({})", table.native_callee(&func.name), call_args.join(", "));

        let mut invoke = Vec::new();
        if func.returns_void() {
            invoke.push(format!("{};", call));
            if let Some(out) = out_param {
                invoke.push(format!(
                    "info.GetReturnValue().Set(structures::wrapTraceResult(isolate, &{}_result));",
                    out.name
                ));
            }
        } else if matches!(canonical(&func.return_type).as_str(), "char*" | "const char*") {
            invoke.push(format!("const char* temp_str = {};", call));
            invoke.push(
                "info.GetReturnValue().Set(v8::String::NewFromUtf8(isolate, temp_str ? temp_str : \"\").ToLocalChecked());"
                    .to_string(),
            );
        } else {
            let conversion = self.types.native_to_script(&func.return_type, &call);
            Self::note(&conversion, "return", &func.return_type, &mut flags);
            invoke.push(format!("info.GetReturnValue().Set({});", conversion.expr));
        }

        for line in staging {
            body.line(line);
        }
        if !checks.is_empty() {
            body.line("");
            for line in checks {
                body.line(line);
            }
        }
        body.line("");
        for line in invoke {
            body.line(line);
        }
        for line in cleanup {
            body.line(line);
        }

        let unknown: Vec<String> = flags
            .iter()
            .filter(|f| matches!(f, SynthFlag::UnknownType { .. }))
            .map(|f| f.to_string())
            .collect();
        for flag in &flags {
            body = body.comment(format!("FLAGGED: {}", flag));
        }
        let status = if unknown.is_empty() {
            ApiStatus::Ready
        } else {
            warn!("{}: API body flagged ({})", func.name, unknown.join(", "));
            ApiStatus::Flagged(format!("unmapped type: {}", unknown.join(", ")))
        };

        SynthesizedApi {
            function: func,
            symbol,
            script_name,
            body: Some(body),
            status,
            flags,
        }
    }

    // ==================== Declarations ====================

    fn declared_params(&self, declared: &[DeclaredParam]) -> Vec<TsParam> {
        declared
            .iter()
            .map(|p| TsParam::new(p.name.clone(), p.ty.clone(), p.original_type.clone()))
            .collect()
    }

    fn generic_params(&self, args: &[&NormalizedArg]) -> Vec<TsParam> {
        args.iter()
            .map(|a| TsParam::new(a.script_name.clone(), self.types.declared_type(a.ty()), a.ty()))
            .collect()
    }

    /// Declared method of the direct-call surface
    pub fn declaration(&self, func: &Function, table: TableId) -> TsSignature {
        let custom = self.custom(table, func);
        let normalized = normalize(func);
        let out_param = trace_out_param(func);

        let mut sig = TsSignature::new(func.script_name(), "void");
        sig.doc = Some(func.original.trim().to_string());

        match custom.and_then(|c| c.declared_parameters.as_ref()) {
            Some(declared) => sig.params = self.declared_params(declared),
            None => {
                sig.params = self.generic_params(&script_args(&normalized, out_param));
                sig.rest = normalized.variadic;
            }
        }

        sig.ret = match (custom.and_then(|c| c.declared_return.as_ref()), out_param) {
            (Some(ret), _) => ret.clone(),
            (None, Some(_)) => "TraceResult".to_string(),
            (None, None) => self.types.declared_type(&func.return_type),
        };
        sig
    }

    /// Listener signature in the event map; `None` when the slot is `NULL`
    pub fn event_declaration(&self, func: &Function, table: TableId, direction: Direction) -> Option<TsSignature> {
        let custom = self.custom(table, func);
        if func.is_unparsable() && custom.and_then(|c| c.event.as_ref()).is_none() {
            return None;
        }

        let mut sig = TsSignature::new(event_name(func, table, direction), "void");
        match custom.and_then(|c| c.declared_parameters.as_ref()) {
            Some(declared) => sig.params = self.declared_params(declared),
            None => {
                let normalized = normalize(func);
                let all: Vec<&NormalizedArg> = normalized.args.iter().collect();
                sig.params = self.generic_params(&all);
                sig.rest = normalized.variadic;
            }
        }
        Some(sig)
    }
}

/// Script-visible arguments: normalized, minus the output parameter
fn script_args<'a>(normalized: &'a NormalizedArgs, out_param: Option<&Argument>) -> Vec<&'a NormalizedArg> {
    normalized
        .args
        .iter()
        .filter(|a| out_param.map(|o| o.name != a.arg.name).unwrap_or(true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_declaration;
    use crate::middle::overrides::{BuiltinOverrides, NoOverrides};
    use pretty_assertions::assert_eq;

    fn synth() -> Synthesizer {
        Synthesizer::new(Box::new(BuiltinOverrides::new()))
    }

    #[test]
    fn test_precache_model_declaration() {
        let func = parse_declaration("int (*pfnPrecacheModel)( const char *s );", 1);
        let sig = synth().declaration(&func, TableId::Engine);
        assert_eq!(sig.render(), "precacheModel(s: string): number");
        assert_eq!(sig.doc.as_deref(), Some("int (*pfnPrecacheModel)( const char *s );"));
    }

    #[test]
    fn test_set_model_declaration() {
        let func = parse_declaration("void (*pfnSetModel)( edict_t *e, const char *m );", 1);
        let s = synth();
        assert_eq!(s.declaration(&func, TableId::Engine).render(), "setModel(e: Entity, m: string): void");

        let api = s.api(&func, TableId::Engine);
        assert_eq!(api.status, ApiStatus::Ready);
        let source = api.body.as_ref().map(|b| b.to_source()).unwrap_or_default();
        assert!(source.contains(
            "(*g_engfuncs.pfnSetModel)((edict_t*)structures::unwrapEntity(isolate, info[0]), utils::js2string(isolate, info[1]));"
        ));
        assert_eq!(api.definition(), "{ \"setModel\", sf_eng_pfnSetModel }");
    }

    #[test]
    fn test_opaque_pointer_return() {
        let func = parse_declaration("void *(*pfnPvAllocEntPrivateData)( edict_t *pEdict, int cb );", 1);
        let s = synth();
        let api = s.api(&func, TableId::Engine);
        assert_eq!(api.status, ApiStatus::Ready);
        assert!(api.flags.is_empty());
        let source = api.body.as_ref().map(|b| b.to_source()).unwrap_or_default();
        assert!(source.contains("info.GetReturnValue().Set(v8::External::New(isolate, (*g_engfuncs.pfnPvAllocEntPrivateData)("));
        assert_eq!(
            s.declaration(&func, TableId::Engine).render(),
            "pvAllocEntPrivateData(pEdict: Entity, cb: number): ArrayBuffer | null"
        );
    }

    #[test]
    fn test_zero_argument_event_dispatches_empty_set() {
        let func = parse_declaration("void (*pfnServerDeactivate)( void );", 1);
        let event = synth().event(&func, TableId::Dll, Direction::Base);
        assert_eq!(event.table_entry(), "dll_pfnServerDeactivate");
        assert_eq!(
            event.generated.code,
            "// nodemod.on('dllServerDeactivate', () => console.log('dllServerDeactivate fired!'));\n\
             void dll_pfnServerDeactivate() {\n  \
             SET_META_RESULT(MRES_IGNORED);\n  \
             event::findAndCall(\"dllServerDeactivate\", nullptr, 0);\n\
             }\n"
        );
    }

    #[test]
    fn test_event_with_args_and_return() {
        let func = parse_declaration("int (*pfnPrecacheModel)( const char *s );", 1);
        let event = synth().event(&func, TableId::Engine, Direction::Post);
        let code = &event.generated.code;
        assert_eq!(event.generated.event_name.as_deref(), Some("postEngPrecacheModel"));
        assert!(code.contains("int postEng_pfnPrecacheModel(const char * s) {"));
        assert!(code.contains("  v8_args[0] = v8::String::NewFromUtf8(isolate, s ? s : \"\").ToLocalChecked(); // s (const char *)"));
        assert!(code.contains("RETURN_META_VALUE(result, event::lastReturnValue<int>());"));
        assert!(code.ends_with("  return 0;\n}\n"));
    }

    #[test]
    fn test_reserved_name_renamed_only_on_script_side() {
        let func = parse_declaration("void (*pfnRegisterThing)( const char *name, int function );", 1);
        let s = synth();
        let event = s.event(&func, TableId::Engine, Direction::Base);
        let code = &event.generated.code;
        assert!(code.contains("void eng_pfnRegisterThing(const char * name, int function) {"));
        assert!(code.contains("(name, callback) => console.log"));
        assert!(code.contains("; // function (int)"));
        assert_eq!(
            s.declaration(&func, TableId::Engine).render(),
            "registerThing(name: string, callback: number): void"
        );
    }

    #[test]
    fn test_frame_tick_only_in_base_direction() {
        let func = parse_declaration("void (*pfnStartFrame)( void );", 1);
        let s = synth();
        assert!(s.event(&func, TableId::Dll, Direction::Base).generated.code.contains("nodeImpl.Tick();"));
        assert!(!s.event(&func, TableId::Dll, Direction::Post).generated.code.contains("nodeImpl.Tick();"));

        let custom = Synthesizer::new(Box::new(NoOverrides)).with_frame_tick("pfnThink");
        assert!(!custom.event(&func, TableId::Dll, Direction::Base).generated.code.contains("Tick"));
    }

    #[test]
    fn test_unparsable_is_null_stub() {
        let func = parse_declaration("int (*pfnBroken)( int a ;", 7);
        let s = synth();
        let event = s.event(&func, TableId::Engine, Direction::Base);
        assert_eq!(event.table_entry(), "NULL");
        assert_eq!(event.generated.code, "// NULL eng_pfnBroken");
        assert!(s.event_declaration(&func, TableId::Engine, Direction::Base).is_none());
        assert_eq!(s.api(&func, TableId::Engine).status, ApiStatus::Unparsable);
    }

    #[test]
    fn test_variadic_event_keeps_ellipsis() {
        let func = parse_declaration("void (*pfnServerPrint)( const char *szMsg, ... );", 1);
        let s = Synthesizer::new(Box::new(NoOverrides));
        let event = s.event(&func, TableId::Engine, Direction::Base);
        assert!(event.generated.code.contains("void eng_pfnServerPrint(const char * szMsg, ...) {"));
        assert!(event.generated.code.contains("unsigned int v8_argCount = 1;"));

        let sig = s.declaration(&func, TableId::Engine);
        assert_eq!(sig.render(), "serverPrint(szMsg: string, ...args: any[]): void");
        let api = s.api(&func, TableId::Engine).body.map(|b| b.to_source()).unwrap_or_default();
        assert!(api.contains("(*g_engfuncs.pfnServerPrint)(utils::js2string(isolate, info[0]));"));
    }

    #[test]
    fn test_api_only_override_leaves_event_and_declaration_generic() {
        let func = parse_declaration("void (*pfnAlertMessage)( ALERT_TYPE atype, const char *szFmt, ... );", 1);
        let with = synth();
        let without = Synthesizer::new(Box::new(NoOverrides));

        let custom_api = with.api(&func, TableId::Engine).body.map(|b| b.to_source()).unwrap_or_default();
        let generic_api = without.api(&func, TableId::Engine).body.map(|b| b.to_source()).unwrap_or_default();
        assert!(custom_api.contains("\"%s\", utils::js2string(isolate, info[1])"));
        assert!(!generic_api.contains("\"%s\""));

        assert_eq!(
            with.event(&func, TableId::Engine, Direction::Base).generated,
            without.event(&func, TableId::Engine, Direction::Base).generated
        );
        assert_eq!(with.declaration(&func, TableId::Engine), without.declaration(&func, TableId::Engine));
    }

    #[test]
    fn test_custom_event_override() {
        let func = parse_declaration("void (*pfnClientCommand)( edict_t* pEntity );", 1);
        let s = synth();
        let code = s.event(&func, TableId::Dll, Direction::Base).generated.code;
        assert!(code.contains("void dll_pfnClientCommand(edict_t* ed) {"));
        assert!(code.contains("    snprintf(buf, sizeof(buf), \"%s %s\", CMD_ARGV(0), CMD_ARGS());"));
        assert!(code.contains("(client, commandText) => console.log"));

        let sig = s.event_declaration(&func, TableId::Dll, Direction::Base).unwrap();
        assert_eq!(sig.param_list(), "client: Entity, commandText: string");
    }

    #[test]
    fn test_folded_array_is_staged_and_freed() {
        let func = parse_declaration("void (*pfnSendData)( int *data, int dataLength );", 1);
        let s = Synthesizer::new(Box::new(NoOverrides));
        let source = s.api(&func, TableId::Engine).body.map(|b| b.to_source()).unwrap_or_default();
        assert!(source.contains("  int dataLength = data_array->Length();"));
        assert!(source.contains("  int* data = new int[dataLength];"));
        assert!(source.contains("(*g_engfuncs.pfnSendData)(data, dataLength);"));
        assert!(source.contains("  delete[] data; // Free allocated array"));
        assert_eq!(s.declaration(&func, TableId::Engine).render(), "sendData(data: number[]): void");

        let event = s.event(&func, TableId::Engine, Direction::Base).generated;
        assert!(event.code.contains("utils::intArrayToJS(isolate, data, dataLength)"));
        assert!(event.flags.is_empty());
    }

    #[test]
    fn test_trace_output_parameter() {
        let func = parse_declaration(
            "void (*pfnTraceLine)( const float *v1, const float *v2, int fNoMonsters, edict_t *pentToSkip, TraceResult *ptr );",
            1,
        );
        let s = synth();
        let sig = s.declaration(&func, TableId::Engine);
        assert_eq!(
            sig.render(),
            "traceLine(v1: number[], v2: number[], fNoMonsters: number, pentToSkip: Entity): TraceResult"
        );
        let source = s.api(&func, TableId::Engine).body.map(|b| b.to_source()).unwrap_or_default();
        assert!(source.contains("  TraceResult ptr_result = {};"));
        assert!(source.contains(", &ptr_result);"));
        assert!(source.contains("structures::wrapTraceResult(isolate, &ptr_result)"));
    }

    #[test]
    fn test_assumed_lengths_are_flagged() {
        let func = parse_declaration("void (*pfnGetSpot)( const float *rgflOrigin );", 1);
        let event = synth().event(&func, TableId::Engine, Direction::Base).generated;
        assert!(event.code.contains("utils::floatArrayToJS(isolate, rgflOrigin, 3)"));
        assert_eq!(
            event.flags,
            vec![SynthFlag::AssumedLength {
                arg: "rgflOrigin".into(),
                len: 3
            }]
        );
    }

    #[test]
    fn test_unknown_types_flag_the_api() {
        let func = parse_declaration("void (*pfnUseModel)( model_t m );", 1);
        let api = synth().api(&func, TableId::Engine);
        assert!(matches!(api.status, ApiStatus::Flagged(ref reason) if reason.contains("model_t")));
        let source = api.body.as_ref().map(|b| b.to_source()).unwrap_or_default();
        assert!(source.starts_with("// nodemod.eng.useModel();\n// FLAGGED: unknown type model_t (m)\n"));
        assert!(source.contains("nullptr /* unknown type: model_t */"));
    }

    #[test]
    fn test_dll_api_calls_through_gamedll_table() {
        let func = parse_declaration("void (*pfnGameInit)( void );", 1);
        let api = synth().api(&func, TableId::Dll);
        assert_eq!(api.symbol, "sf_dll_pfnGameInit");
        let source = api.body.as_ref().map(|b| b.to_source()).unwrap_or_default();
        assert!(source.contains("(*gpGamedllFuncs->dllapi_table->pfnGameInit)();"));
    }
}
