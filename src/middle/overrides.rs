//! Custom Override Registry
//!
//! Hand-written fragments for functions generic synthesis cannot express:
//! command-line events built from `CMD_ARGS()`, printf-style natives that
//! need a fixed format, cvar registration and out-parameter pairs returned
//! as objects. Each fragment replaces only its own artifact.

use std::collections::HashMap;

use log::debug;

use crate::frontend::ast::TableId;

/// Replacement event signature and dispatch lambda body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOverride {
    /// C parameter list written in the hook signature
    pub args: String,
    /// Lambda body; must declare `v8_argCount` and `v8_args`
    pub body: String,
}

/// One hand-declared script parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredParam {
    pub name: String,
    pub ty: String,
    /// C type shown in event docs
    pub original_type: String,
}

impl DeclaredParam {
    pub fn new(name: &str, ty: &str, original_type: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
            original_type: original_type.to_string(),
        }
    }
}

/// Override fragments for one function; `None` means generic synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomOverride {
    pub event: Option<EventOverride>,
    /// Statements replacing the native call and return conversion
    pub api_body: Option<String>,
    pub declared_parameters: Option<Vec<DeclaredParam>>,
    pub declared_return: Option<String>,
}

/// Lookup of override fragments by table and function name
pub trait OverrideProvider {
    fn lookup(&self, table: TableId, name: &str) -> Option<&CustomOverride>;
}

/// Provider with no overrides at all
#[cfg(test)]
pub struct NoOverrides;

#[cfg(test)]
impl OverrideProvider for NoOverrides {
    fn lookup(&self, _table: TableId, _name: &str) -> Option<&CustomOverride> {
        None
    }
}

/// The overrides compiled into the generator
pub struct BuiltinOverrides {
    entries: HashMap<TableId, HashMap<String, CustomOverride>>,
}

impl OverrideProvider for BuiltinOverrides {
    fn lookup(&self, table: TableId, name: &str) -> Option<&CustomOverride> {
        self.entries.get(&table)?.get(name)
    }
}

impl BuiltinOverrides {
    pub fn new() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register_all();
        debug!("{} custom overrides registered", registry.len());
        registry
    }

    pub fn register(&mut self, table: TableId, name: &str, custom: CustomOverride) {
        self.entries.entry(table).or_default().insert(name.to_string(), custom);
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    fn register_all(&mut self) {
        // Engine: client command, rebuilt from the command buffer
        self.register(
            TableId::Engine,
            "pfnClientCommand",
            CustomOverride {
                event: Some(EventOverride {
                    args: "edict_t* ed, const char *szFmt, ...".to_string(),
                    body: [
                        "unsigned int v8_argCount = 2;",
                        "v8::Local<v8::Value>* v8_args = new v8::Local<v8::Value>[2];",
                        "v8_args[0] = structures::wrapEntity(isolate, ed);",
                        "v8_args[1] = v8::String::NewFromUtf8(isolate, CMD_ARGS()).ToLocalChecked();",
                    ]
                    .join("\n"),
                }),
                api_body: Some(
                    "(*g_engfuncs.pfnClientCommand)(structures::unwrapEntity(isolate, info[0]), utils::js2string(isolate, info[1]));"
                        .to_string(),
                ),
                declared_parameters: Some(vec![
                    DeclaredParam::new("entity", "Entity", "edict_t *"),
                    DeclaredParam::new("commandArgs", "string", "string"),
                ]),
                declared_return: None,
            },
        );

        // Engine: printf-style natives get a fixed "%s" format
        self.api_only(
            "pfnAlertMessage",
            "(*g_engfuncs.pfnAlertMessage)((ALERT_TYPE)info[0]->Int32Value(context).ToChecked(), \"%s\", utils::js2string(isolate, info[1]));",
        );
        self.api_only(
            "pfnEngineFprintf",
            "fprintf((FILE*)utils::jsToPointer(isolate, info[0]), \"%s\", utils::js2string(isolate, info[1]));",
        );

        // Engine: cvar registration takes the unwrapped cvar_t
        self.api_only(
            "pfnCVarRegister",
            "(*g_engfuncs.pfnCVarRegister)((cvar_t*)structures::unwrapCvar(isolate, info[0]));",
        );
        self.api_only(
            "pfnCvar_RegisterVariable",
            "(*g_engfuncs.pfnCvar_RegisterVariable)((cvar_t*)structures::unwrapCvar(isolate, info[0]));",
        );
        self.api_only(
            "pfnCvar_DirectSet",
            "(*g_engfuncs.pfnCvar_DirectSet)((cvar_t*)structures::unwrapCvar(isolate, info[0]), utils::js2string(isolate, info[1]));",
        );

        // Engine: message origin and target are optional in scripts
        self.register(
            TableId::Engine,
            "pfnMessageBegin",
            CustomOverride {
                declared_parameters: Some(vec![
                    DeclaredParam::new("msg_dest", "number", "int"),
                    DeclaredParam::new("msg_type", "number", "int"),
                    DeclaredParam::new("pOrigin", "number[]", "const float *"),
                    DeclaredParam::new("ed", "Entity | undefined", "edict_t *"),
                ]),
                ..CustomOverride::default()
            },
        );

        // Engine: out-parameter pairs come back as one object
        self.register(
            TableId::Engine,
            "pfnGetAttachment",
            vector_pair_return("pfnGetAttachment", "iAttachment"),
        );
        self.register(
            TableId::Engine,
            "pfnGetBonePosition",
            vector_pair_return("pfnGetBonePosition", "iBone"),
        );

        // Dll: client command with its full text
        self.register(
            TableId::Dll,
            "pfnClientCommand",
            CustomOverride {
                event: Some(EventOverride {
                    args: "edict_t* ed".to_string(),
                    body: [
                        "unsigned int v8_argCount = 2;",
                        "v8::Local<v8::Value>* v8_args = new v8::Local<v8::Value>[2];",
                        "v8_args[0] = structures::wrapEntity(isolate, ed);",
                        "",
                        "if (CMD_ARGC() > 1) {",
                        "  char buf[100];",
                        "  snprintf(buf, sizeof(buf), \"%s %s\", CMD_ARGV(0), CMD_ARGS());",
                        "  v8_args[1] = v8::String::NewFromUtf8(isolate, buf).ToLocalChecked();",
                        "} else {",
                        "  v8_args[1] = v8::String::NewFromUtf8(isolate, CMD_ARGV(0)).ToLocalChecked();",
                        "}",
                    ]
                    .join("\n"),
                }),
                declared_parameters: Some(vec![
                    DeclaredParam::new("client", "Entity", "edict_t *"),
                    DeclaredParam::new("commandText", "string", "string"),
                ]),
                ..CustomOverride::default()
            },
        );
    }

    fn api_only(&mut self, name: &str, body: &str) {
        self.register(
            TableId::Engine,
            name,
            CustomOverride {
                api_body: Some(body.to_string()),
                ..CustomOverride::default()
            },
        );
    }
}

impl Default for BuiltinOverrides {
    fn default() -> Self {
        Self::new()
    }
}

/// `fn(entity, index, float* origin, float* angles)` returning `{ origin, angles }`
fn vector_pair_return(function: &str, index_name: &str) -> CustomOverride {
    let body = [
        "float origin[3] = { 0.0f, 0.0f, 0.0f };".to_string(),
        "float angles[3] = { 0.0f, 0.0f, 0.0f };".to_string(),
        format!(
            "(*g_engfuncs.{})(structures::unwrapEntity(isolate, info[0]), info[1]->Int32Value(context).ToChecked(), origin, angles);",
            function
        ),
        "v8::Local<v8::Object> result = v8::Object::New(isolate);".to_string(),
        "result->Set(context, v8::String::NewFromUtf8(isolate, \"origin\").ToLocalChecked(), utils::floatArrayToJS(isolate, origin, 3)).Check();".to_string(),
        "result->Set(context, v8::String::NewFromUtf8(isolate, \"angles\").ToLocalChecked(), utils::floatArrayToJS(isolate, angles, 3)).Check();".to_string(),
        "info.GetReturnValue().Set(result);".to_string(),
    ]
    .join("\n");

    CustomOverride {
        api_body: Some(body),
        declared_parameters: Some(vec![
            DeclaredParam::new("entity", "Entity", "const edict_t *"),
            DeclaredParam::new(index_name, "number", "int"),
        ]),
        declared_return: Some("{ origin: number[]; angles: number[] }".to_string()),
        ..CustomOverride::default()
    }
}
