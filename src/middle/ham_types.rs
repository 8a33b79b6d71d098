//! Ham type table and shared parameter naming
//!
//! Both the trampoline synthesizer and the Ham declaration generator take
//! parameter names from [`param_names`], so a hook's C parameters and its
//! script callback parameters always line up.

use crate::frontend::ast::{HamParam, HamReturn};

/// Name of the hooked object in script callbacks; never reused for a parameter
pub const THIS_NAME: &str = "this_";

/// Types and default name for one parameter code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HamParamInfo {
    pub ts_type: &'static str,
    pub c_type: &'static str,
    pub default_name: Option<&'static str>,
}

pub fn param_info(param: &HamParam) -> HamParamInfo {
    let (ts_type, c_type, default_name) = match param {
        HamParam::Int => ("number", "int", Some("value")),
        HamParam::Float => ("number", "float", Some("value")),
        HamParam::Vector => ("number[]", "float*", Some("vec")),
        HamParam::Entity => ("Entity", "void*", Some("other")),
        HamParam::Entvars => ("Entvars", "void*", Some("other")),
        HamParam::String => ("string", "const char*", Some("str")),
        HamParam::Trace => ("TraceResult", "void*", Some("trace")),
        HamParam::Edict => ("Entity", "void*", Some("other")),
        HamParam::ItemInfo => ("ItemInfo", "void*", Some("itemInfo")),
        HamParam::Unknown(_) => ("any", "void*", None),
    };
    HamParamInfo {
        ts_type,
        c_type,
        default_name,
    }
}

/// Script type of a hook's return value
pub fn return_ts_type(ret: &HamReturn) -> &'static str {
    match ret {
        HamReturn::Void => "void",
        HamReturn::Int | HamReturn::Float => "number",
        HamReturn::Vector => "number[]",
        HamReturn::Entity => "Entity",
        HamReturn::String => "string",
        HamReturn::Unknown(_) => "any",
    }
}

/// C return type of a trampoline; vectors are written through `out`
pub fn return_c_type(ret: &HamReturn) -> &'static str {
    match ret {
        HamReturn::Void | HamReturn::Vector | HamReturn::Unknown(_) => "void",
        HamReturn::Int => "int",
        HamReturn::Float => "float",
        HamReturn::Entity => "void*",
        HamReturn::String => "const char*",
    }
}

/// Hand-picked names for well-known hooks, keyed by lowercase function key
pub fn special_names(key: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match key.to_lowercase().as_str() {
        "use" => &["activator", "caller", "useType", "value"],
        "takedamage" => &["inflictor", "attacker", "damage", "damageBits"],
        "traceattack" => &["attacker", "damage", "direction", "trace", "damageBits"],
        "tracebleed" => &["damage", "direction", "trace", "damageBits"],
        "killed" => &["attacker", "gibType"],
        "giveammo" => &["amount", "name", "max"],
        "addpoints" | "addpointstoteam" => &["score", "allowNegative"],
        "item_addtoplayer" => &["player"],
        "item_addduplicate" => &["original"],
        "item_getiteminfo" => &["itemInfo"],
        "item_holster" => &["skipLocal"],
        "weapon_extractammo" | "weapon_extractclipammo" => &["weapon"],
        "ts_goslow" => &["duration", "mode"],
        "ts_breakablerespawn" => &["respawnTime"],
        _ => return None,
    };
    Some(names)
}

/// Name of one parameter before de-duplication.
///
/// Special name at this index, else the type's default name (numbered by
/// position when the type repeats), else `argN`.
pub fn param_name(key: &str, params: &[HamParam], index: usize) -> String {
    if let Some(name) = special_names(key).and_then(|names| names.get(index)) {
        return name.to_string();
    }

    let Some(param) = params.get(index) else {
        return format!("arg{}", index + 1);
    };
    let Some(base) = param_info(param).default_name else {
        return format!("arg{}", index + 1);
    };

    let same_type = params.iter().filter(|p| *p == param).count();
    if same_type > 1 {
        let position = params[..index].iter().filter(|p| *p == param).count();
        format!("{}{}", base, position + 1)
    } else {
        base.to_string()
    }
}

/// All parameter names of a hook, unique and distinct from [`THIS_NAME`]
pub fn param_names(key: &str, params: &[HamParam]) -> Vec<String> {
    let mut used = vec![THIS_NAME.to_string()];
    let mut names = Vec::with_capacity(params.len());

    for index in 0..params.len() {
        let base = param_name(key, params, index);
        let mut name = base.clone();
        let mut counter = 1;
        while used.contains(&name) {
            counter += 1;
            name = format!("{}{}", base, counter);
        }
        used.push(name.clone());
        names.push(name);
    }
    names
}

/// V8 value for a trampoline parameter
pub fn v8_conversion(param: &HamParam, name: &str) -> String {
    const NULL: &str = "v8::Null(isolate).As<v8::Value>()";
    match param {
        HamParam::Int => format!("v8::Integer::New(isolate, {})", name),
        HamParam::Float => format!("v8::Number::New(isolate, {})", name),
        HamParam::Vector => format!("utils::vect2js(isolate, {})", name),
        HamParam::String => format!(
            "{n} ? v8::String::NewFromUtf8(isolate, {n}).ToLocalChecked().As<v8::Value>() : {null}",
            n = name,
            null = NULL
        ),
        HamParam::Entity => format!(
            "getEdictFromThis({n}) ? structures::wrapEntity(isolate, getEdictFromThis({n})) : {null}",
            n = name,
            null = NULL
        ),
        HamParam::Entvars => format!(
            "{n} ? structures::wrapEntvars(isolate, static_cast<entvars_t*>({n})) : {null}",
            n = name,
            null = NULL
        ),
        HamParam::Edict => format!(
            "{n} ? structures::wrapEntity(isolate, static_cast<edict_t*>({n})) : {null}",
            n = name,
            null = NULL
        ),
        HamParam::Trace => format!(
            "{n} ? structures::wrapTraceResult(isolate, static_cast<TraceResult*>({n})) : {null}",
            n = name,
            null = NULL
        ),
        HamParam::ItemInfo | HamParam::Unknown(_) => NULL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_special_names_win() {
        let params = [HamParam::Entvars, HamParam::Entvars, HamParam::Float, HamParam::Int];
        assert_eq!(
            param_names("takedamage", &params),
            vec!["inflictor", "attacker", "damage", "damageBits"]
        );
    }

    #[test]
    fn test_repeated_types_are_numbered() {
        let params = [HamParam::Entity, HamParam::Entity, HamParam::Int];
        assert_eq!(param_names("somehook", &params), vec!["other1", "other2", "value"]);
    }

    #[test]
    fn test_entity_and_entvars_share_a_default_name() {
        // Different codes, same default name: de-duplication takes over
        let params = [HamParam::Entity, HamParam::Entvars];
        assert_eq!(param_names("touchlike", &params), vec!["other", "other2"]);
    }

    #[test]
    fn test_special_names_shorter_than_params() {
        let params = [HamParam::Entity, HamParam::Int];
        assert_eq!(param_names("item_addtoplayer", &params), vec!["player", "value"]);
    }

    #[test]
    fn test_unknown_codes_fall_back_to_arg_n() {
        let params = [HamParam::Int, HamParam::Unknown("HAM_PARAM_SHORT".into())];
        assert_eq!(param_names("x", &params), vec!["value", "arg2"]);
        assert_eq!(param_info(&params[1]).ts_type, "any");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(v8_conversion(&HamParam::Int, "value"), "v8::Integer::New(isolate, value)");
        assert_eq!(
            v8_conversion(&HamParam::ItemInfo, "itemInfo"),
            "v8::Null(isolate).As<v8::Value>()"
        );
        assert!(v8_conversion(&HamParam::Entvars, "attacker").starts_with("attacker ? structures::wrapEntvars"));
    }
}
