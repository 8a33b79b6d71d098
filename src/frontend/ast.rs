//! Data model for parsed declarations and the Ham catalogue

use crate::utils::{camelize, Span};

/// Type of the synthetic argument standing in for a C `...`
pub const VARIADIC: &str = "...";

/// Return type marking a declaration the parser could not understand
pub const UNPARSABLE: &str = "NULL";

// ==================== Declaration tables ====================

/// One function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    /// Raw C type, trimmed
    pub ty: String,
    /// Fixed array size from a `name[N]` declarator
    pub size: Option<usize>,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            size: None,
        }
    }

    pub fn variadic() -> Self {
        Self::new("args", VARIADIC)
    }

    pub fn is_variadic(&self) -> bool {
        self.ty == VARIADIC
    }

    pub fn is_pointer(&self) -> bool {
        self.ty.contains('*')
    }

    pub fn is_const(&self) -> bool {
        self.ty.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == "const")
    }

    /// `char *`, `const char*` and friends
    pub fn is_char_pointer(&self) -> bool {
        self.is_pointer() && self.ty.contains("char")
    }

    /// C parameter text as written in a generated signature
    pub fn c_decl(&self) -> String {
        format!("{} {}", self.ty, self.name)
    }
}

/// One parsed function-pointer declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Raw C return type, or [`UNPARSABLE`]
    pub return_type: String,
    pub args: Vec<Argument>,
    /// The source line this was parsed from
    pub original: String,
    pub span: Span,
}

impl Function {
    pub fn unparsable(name: impl Into<String>, original: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            return_type: UNPARSABLE.to_string(),
            args: Vec::new(),
            original: original.into(),
            span,
        }
    }

    pub fn is_unparsable(&self) -> bool {
        self.return_type == UNPARSABLE
    }

    pub fn returns_void(&self) -> bool {
        self.return_type == "void"
    }

    pub fn is_variadic(&self) -> bool {
        self.args.iter().any(Argument::is_variadic)
    }

    /// Arguments before the variadic tail
    pub fn fixed_args(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter().filter(|a| !a.is_variadic())
    }

    /// Name without the `pfn` prefix
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix("pfn").unwrap_or(&self.name)
    }

    /// Script-visible method name, `pfnPrecacheModel` -> `precacheModel`
    pub fn script_name(&self) -> String {
        camelize(self.bare_name())
    }
}

/// Which SDK table a declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Dll,
    Engine,
}

/// Base call or post call; only changes generated names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Base,
    Post,
}

impl TableId {
    pub const ALL: [TableId; 2] = [TableId::Dll, TableId::Engine];

    /// Short key: `dll` or `eng`
    pub fn key(self) -> &'static str {
        match self {
            TableId::Dll => "dll",
            TableId::Engine => "eng",
        }
    }

    /// Event-name and symbol prefix for a direction: `dll`, `postDll`, `eng`, `postEng`
    pub fn event_prefix(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (TableId::Dll, Direction::Base) => "dll",
            (TableId::Dll, Direction::Post) => "postDll",
            (TableId::Engine, Direction::Base) => "eng",
            (TableId::Engine, Direction::Post) => "postEng",
        }
    }

    /// C struct type name as spelled in eiface.h
    pub fn c_struct(self) -> &'static str {
        match self {
            TableId::Dll => "DLL_FUNCTIONS",
            TableId::Engine => "enginefuncs_t",
        }
    }

    /// Global holding the event dispatch table
    pub fn table_symbol(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (TableId::Dll, Direction::Base) => "g_DllFunctionTable",
            (TableId::Dll, Direction::Post) => "g_DllFunctionTable_Post",
            (TableId::Engine, Direction::Base) => "g_EngineFunctionsTable",
            (TableId::Engine, Direction::Post) => "g_EngineFunctionsTable_Post",
        }
    }

    /// Expression invoking the real function pointer
    pub fn native_callee(self, function: &str) -> String {
        match self {
            TableId::Dll => format!("(*gpGamedllFuncs->dllapi_table->{})", function),
            TableId::Engine => format!("(*g_engfuncs.{})", function),
        }
    }

    pub fn extern_decl(self) -> &'static str {
        match self {
            TableId::Dll => "extern gamedll_funcs_t *gpGamedllFuncs;",
            TableId::Engine => "extern enginefuncs_t g_engfuncs;",
        }
    }

    /// Name of the script interface describing the direct-call surface
    pub fn interface_name(self) -> &'static str {
        match self {
            TableId::Dll => "DLL",
            TableId::Engine => "Engine",
        }
    }

    pub fn event_registration_fn(self) -> &'static str {
        match self {
            TableId::Dll => "registerDllEvents",
            TableId::Engine => "registerEngineEvents",
        }
    }

    pub fn api_registration_fn(self) -> &'static str {
        match self {
            TableId::Dll => "registerDllFunctions",
            TableId::Engine => "registerEngineFunctions",
        }
    }

    pub fn api_table_symbol(self) -> &'static str {
        match self {
            TableId::Dll => "gamedllSpecificFunctions",
            TableId::Engine => "engineSpecificFunctions",
        }
    }

    pub fn events_file(self) -> &'static str {
        match self {
            TableId::Dll => "dll_events.cpp",
            TableId::Engine => "engine_events.cpp",
        }
    }

    pub fn functions_file(self) -> &'static str {
        match self {
            TableId::Dll => "dll_functions.cpp",
            TableId::Engine => "engine_functions.cpp",
        }
    }

    pub fn typings_file(self) -> &'static str {
        match self {
            TableId::Dll => "dll.d.ts",
            TableId::Engine => "engine.d.ts",
        }
    }
}

// ==================== Ham catalogue ====================

/// Parameter shape code from `g_hamFunctions[]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HamParam {
    Int,
    Float,
    Vector,
    Entity,
    Entvars,
    String,
    Trace,
    Edict,
    ItemInfo,
    Unknown(String),
}

impl HamParam {
    pub fn from_code(code: &str) -> Self {
        match code {
            "HAM_PARAM_INT" => HamParam::Int,
            "HAM_PARAM_FLOAT" => HamParam::Float,
            "HAM_PARAM_VECTOR" => HamParam::Vector,
            "HAM_PARAM_ENTITY" => HamParam::Entity,
            "HAM_PARAM_ENTVAR" => HamParam::Entvars,
            "HAM_PARAM_STRING" => HamParam::String,
            "HAM_PARAM_TRACE" => HamParam::Trace,
            "HAM_PARAM_EDICT" => HamParam::Edict,
            "HAM_PARAM_ITEMINFO" => HamParam::ItemInfo,
            other => HamParam::Unknown(other.to_string()),
        }
    }
}

/// Return shape code from `g_hamFunctions[]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HamReturn {
    Void,
    Int,
    Float,
    Vector,
    Entity,
    String,
    Unknown(String),
}

impl HamReturn {
    pub fn from_code(code: &str) -> Self {
        match code {
            "HAM_RET_VOID" => HamReturn::Void,
            "HAM_RET_INT" => HamReturn::Int,
            "HAM_RET_FLOAT" => HamReturn::Float,
            "HAM_RET_VECTOR" => HamReturn::Vector,
            "HAM_RET_ENTITY" => HamReturn::Entity,
            "HAM_RET_STRING" => HamReturn::String,
            other => HamReturn::Unknown(other.to_string()),
        }
    }
}

/// One `Identifier [= value]` entry of a C enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    /// Name with the enum prefix (`Ham_`, `HAM_`) removed
    pub name: String,
    pub value: i64,
    pub line: usize,
}

/// One `{"name", HAM_RET_*, count, {HAM_PARAM_*...}}` row; its id is its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HamSignature {
    pub key: String,
    pub return_code: HamReturn,
    /// The count literal written in the row
    pub declared_param_count: usize,
    pub params: Vec<HamParam>,
    pub line: usize,
}

/// A hookable function: enum name and id joined with its signature row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HamFunctionEntry {
    /// Enum name without `Ham_`
    pub name: String,
    pub id: usize,
    /// `None` when the array has no row at this id
    pub signature: Option<HamSignature>,
}

/// Everything parsed from the Ham sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HamCatalogue {
    /// In enum order
    pub entries: Vec<HamFunctionEntry>,
    /// All array rows in array order, including ones no enum entry points at
    pub signatures: Vec<HamSignature>,
    /// `HamResult` values without the `HAM_` prefix
    pub results: Vec<EnumEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_name_strips_pfn() {
        let func = Function {
            name: "pfnCvar_RegisterVariable".into(),
            return_type: "void".into(),
            args: vec![],
            original: String::new(),
            span: Span::dummy(),
        };
        assert_eq!(func.bare_name(), "Cvar_RegisterVariable");
        assert_eq!(func.script_name(), "cvarRegisterVariable");
    }

    #[test]
    fn test_argument_flags() {
        assert!(Argument::new("s", "const char *").is_char_pointer());
        assert!(Argument::new("s", "const char *").is_const());
        assert!(!Argument::new("p", "edict_t *").is_const());
        assert!(Argument::variadic().is_variadic());
        assert!(!Argument::new("f", "float *").is_char_pointer());
    }

    #[test]
    fn test_ham_codes() {
        assert_eq!(HamParam::from_code("HAM_PARAM_ENTVAR"), HamParam::Entvars);
        assert_eq!(HamReturn::from_code("HAM_RET_INT"), HamReturn::Int);
        assert_eq!(
            HamParam::from_code("HAM_PARAM_SHORT"),
            HamParam::Unknown("HAM_PARAM_SHORT".into())
        );
    }
}
