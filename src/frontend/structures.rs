//! Structure shape scraper
//!
//! Infers the script-visible properties of each wrapped SDK struct from its
//! native wrapper source: `obj->Set(context, <"name">, <value>)` calls and
//! `ACCESSOR*` template registrations. The inferred types are what the
//! wrappers actually produce, so `structures.d.ts` cannot drift from them.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::Span;

/// Wrapper source stem and the interface it produces
pub const STRUCTURE_SOURCES: [(&str, &str); 14] = [
    ("entvars", "Entvars"),
    ("clientdata", "ClientData"),
    ("entitystate", "EntityState"),
    ("usercmd", "UserCmd"),
    ("netadr", "NetAdr"),
    ("weapondata", "WeaponData"),
    ("playermove", "PlayerMove"),
    ("customization", "Customization"),
    ("keyvaluedata", "KeyValueData"),
    ("saverestoredata", "SaveRestoreData"),
    ("typedescription", "TypeDescription"),
    ("delta", "Delta"),
    ("cvar", "Cvar"),
    ("trace_result", "TraceResult"),
];

/// One property of a script-side interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructProperty {
    pub name: String,
    pub ty: String,
}

impl StructProperty {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A script-side interface for one wrapped struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureInterface {
    pub name: String,
    pub properties: Vec<StructProperty>,
    /// Comment lines emitted in place of properties
    pub notes: Vec<String>,
}

impl StructureInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Scrape every known wrapper under `dir`, in declaration order.
///
/// Missing or unreadable files give an empty interface; the declarations
/// still have to name every struct the type tables refer to.
pub fn load_structures(dir: Option<&Path>) -> Vec<StructureInterface> {
    let mut interfaces: Vec<StructureInterface> = STRUCTURE_SOURCES
        .iter()
        .map(|(stem, name)| {
            let mut interface = StructureInterface::new(*name);
            if let Some(dir) = dir {
                let path = dir.join(format!("{}.cpp", stem));
                match fs::read_to_string(&path) {
                    Ok(source) => interface.properties = scrape_properties(&source),
                    Err(err) => warn!("skipping {}: {}", path.display(), err),
                }
            }
            if interface.properties.is_empty() && *name == "Delta" {
                interface.notes = vec![
                    "Delta compression structure - internal engine type".to_string(),
                    "Fields not exposed in public SDK headers".to_string(),
                ];
            }
            debug!("{}: {} properties", name, interface.properties.len());
            interface
        })
        .collect();

    interfaces.push(entity_interface());
    interfaces
}

/// Properties set by one wrapper source, in source order, first one wins
pub fn scrape_properties(source: &str) -> Vec<StructProperty> {
    let mut lexer = Lexer::new(source, 1);
    let tokens = lexer.tokenize();
    let mut properties: Vec<StructProperty> = Vec::new();

    let mut push = |property: StructProperty| {
        if !properties.iter().any(|p| p.name == property.name) {
            properties.push(property);
        }
    };

    let mut i = 0;
    while i < tokens.len() {
        if let Some((args, next)) = object_set_call(&tokens, i) {
            if let [_, key, value, ..] = args.as_slice() {
                if let Some(name) = string_literal(&tokens[key.0..key.1]) {
                    let text = lexer.slice(span_of(&tokens, *value));
                    push(StructProperty::new(name, infer_value_type(&text)));
                }
            }
            i = next;
            continue;
        }
        if let Some((args, next)) = accessor_call(&tokens, i) {
            if let Some(property) = accessor_property(&tokens, &args) {
                push(property);
            }
            i = next;
            continue;
        }
        i += 1;
    }

    properties
}

/// The hand-maintained `Entity` shape; entity wrappers delegate to entvars
pub fn entity_interface() -> StructureInterface {
    const NUMBER_ARRAYS: &[&str] = &[
        "origin", "oldorigin", "velocity", "basevelocity", "clbasevelocity", "movedir", "angles",
        "avelocity", "punchangle", "angle", "endpos", "startpos", "absmin", "absmax", "mins",
        "maxs", "size", "rendercolor", "viewOfs",
    ];
    const STRINGS: &[&str] = &[
        "classname", "globalname", "model", "target", "targetname", "netname", "message", "noise",
        "noise1", "noise2", "noise3",
    ];
    const ORDER: &[&str] = &[
        "id", "classname", "globalname", "origin", "oldorigin", "velocity", "basevelocity",
        "clbasevelocity", "movedir", "angles", "avelocity", "punchangle", "angle", "endpos",
        "startpos", "impacttime", "starttime", "fixangle", "idealpitch", "pitchSpeed", "idealYaw",
        "yawSpeed", "modelindex", "model", "viewmodel", "weaponmodel", "absmin", "absmax", "mins",
        "maxs", "size", "ltime", "nextthink", "movetype", "solid", "skin", "body", "effects",
        "gravity", "friction", "lightLevel", "sequence", "gaitsequence", "frame", "animtime",
        "framerate", "scale", "rendermode", "renderamt", "rendercolor", "renderfx", "health",
        "frags", "weapons", "takedamage", "deadflag", "viewOfs", "button", "impulse", "spawnflags",
        "flags", "colormap", "team", "maxHealth", "teleportTime", "armortype", "armorvalue",
        "waterlevel", "watertype", "target", "targetname", "netname", "message", "dmgTake",
        "dmgSave", "dmg", "dmgtime", "noise", "noise1", "noise2", "noise3", "speed", "airFinished",
        "painFinished", "radsuitFinished", "playerclass", "maxspeed", "fov", "weaponanim",
        "pushmsec", "bInDuck", "flTimeStepSound", "flSwimTime", "flDuckTime", "iStepLeft",
        "fallVelocity", "gamestate", "oldbuttons", "groupinfo",
    ];

    let mut interface = StructureInterface::new("Entity");
    interface.properties = ORDER
        .iter()
        .map(|name| {
            let ty = if NUMBER_ARRAYS.contains(name) {
                "number[]"
            } else if STRINGS.contains(name) {
                "string"
            } else {
                "number"
            };
            StructProperty::new(*name, ty)
        })
        .collect();
    interface
}

/// TS type of a wrapper value expression
fn infer_value_type(expr: &str) -> &'static str {
    let trimmed = expr.trim();
    if trimmed.contains("NewFromUtf8") || trimmed.contains("pfnSzFromIndex") || trimmed.contains("str2js") {
        "string"
    } else if trimmed.contains("Number::New") || trimmed.contains("Integer::New") {
        "number"
    } else if trimmed.contains("Boolean::New") {
        "boolean"
    } else if trimmed.contains("vect2js") {
        "number[]"
    } else if trimmed.contains("wrapEntity") {
        "Entity | null"
    } else if trimmed.contains("arr2js")
        || trimmed.contains("Array::New")
        || (trimmed.ends_with("Array") && trimmed.chars().all(|c| c.is_alphanumeric() || c == '_'))
    {
        "number[]"
    } else {
        "unknown"
    }
}

/// Token ranges `[start, end)` of top-level arguments
type ArgRanges = Vec<(usize, usize)>;

/// Match `obj -> Set (` at `i`; returns its argument ranges and the index after `)`
fn object_set_call(tokens: &[Token], i: usize) -> Option<(ArgRanges, usize)> {
    let window = tokens.get(i..i + 5)?;
    let arrow = window[1].kind == TokenKind::Other('-') && window[2].kind == TokenKind::Other('>');
    if window[0].is_ident("obj") && arrow && window[3].is_ident("Set") && window[4].kind == TokenKind::LParen {
        split_call_args(tokens, i + 4)
    } else {
        None
    }
}

/// Match `ACCESSOR*(` at `i`
fn accessor_call(tokens: &[Token], i: usize) -> Option<(ArgRanges, usize)> {
    let name = tokens.get(i)?.ident()?;
    if !matches!(name, "ACCESSOR_T" | "ACCESSORL_T" | "ACCESSOR_RO_T" | "ACCESSOR" | "ACCESSORL") {
        return None;
    }
    if tokens.get(i + 1)?.kind != TokenKind::LParen {
        return None;
    }
    split_call_args(tokens, i + 1)
}

/// `ACCESSOR*(..., "name", FIELD, GETX, ...)`; the getter follows the field
fn accessor_property(tokens: &[Token], args: &ArgRanges) -> Option<StructProperty> {
    let name_index = args
        .iter()
        .position(|range| string_literal(&tokens[range.0..range.1]).is_some())?;
    let name = string_literal(&tokens[args[name_index].0..args[name_index].1])?;
    let getter = args
        .get(name_index + 2)
        .and_then(|range| tokens[range.0..range.1].iter().find_map(Token::ident))
        .unwrap_or("");

    let ty = match getter {
        "GETSTR" => "string",
        "GETVEC3" => "number[]",
        "GETBOOL" | "GETQBOOL" => "boolean",
        _ => "number",
    };
    Some(StructProperty::new(name, ty))
}

/// Split the arguments of a call whose `(` is at `open`
fn split_call_args(tokens: &[Token], open: usize) -> Option<(ArgRanges, usize)> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;

    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if start < index {
                        args.push((start, index));
                    }
                    return Some((args, index + 1));
                }
            }
            TokenKind::Comma if depth == 1 => {
                args.push((start, index));
                start = index + 1;
            }
            TokenKind::Eof => return None,
            _ => {}
        }
    }
    None
}

fn string_literal(tokens: &[Token]) -> Option<String> {
    tokens.iter().find_map(|t| match &t.kind {
        TokenKind::StringLit(s) => Some(s.clone()),
        _ => None,
    })
}

fn span_of(tokens: &[Token], range: (usize, usize)) -> Span {
    let first = tokens[range.0].span;
    let last = tokens[range.1.saturating_sub(1).max(range.0)].span;
    first.merge(&last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scrape_object_set_calls() {
        let source = r#"
v8::Local<v8::Value> wrapTraceResult(v8::Isolate* isolate, TraceResult* trace) {
    // Set TraceResult properties
    obj->Set(context, v8::String::NewFromUtf8(isolate, "allSolid").ToLocalChecked(),
        v8::Boolean::New(isolate, trace->fAllSolid)).Check();
    obj->Set(context, convert::str2js(isolate, "fraction"),
        v8::Number::New(isolate, trace->flFraction)).Check();
    obj->Set(context, v8::String::NewFromUtf8(isolate, "endPos").ToLocalChecked(),
        utils::vect2js(isolate, trace->vecEndPos)).Check();
    obj->Set(context, v8::String::NewFromUtf8(isolate, "hit").ToLocalChecked(),
        trace->pHit ? wrapEntity(isolate, trace->pHit) : v8::Null(isolate)).Check();
    obj->Set(context, v8::String::NewFromUtf8(isolate, "classname").ToLocalChecked(),
        v8::String::NewFromUtf8(isolate, g_engfuncs.pfnSzFromIndex(e->classname)).ToLocalChecked()).Check();
    v8::Local<v8::Array> ipArray = v8::Array::New(isolate, 4);
    obj->Set(context, v8::String::NewFromUtf8(isolate, "ip").ToLocalChecked(), ipArray).Check();
}
"#;
        assert_eq!(
            scrape_properties(source),
            vec![
                StructProperty::new("allSolid", "boolean"),
                StructProperty::new("fraction", "number"),
                StructProperty::new("endPos", "number[]"),
                StructProperty::new("hit", "Entity | null"),
                StructProperty::new("classname", "string"),
                StructProperty::new("ip", "number[]"),
            ]
        );
    }

    #[test]
    fn test_scrape_accessors() {
        let source = r#"
#define ACCESSOR_T(STRUCT_TYPE, UNWRAP_FN, TEMPLATE, NAME, FIELD, GET, SET) \
    TEMPLATE->SetNativeDataProperty(NAME, GET, SET)
void registerCvar(v8::Local<v8::ObjectTemplate> tpl) {
    ACCESSOR_T(cvar_t, unwrapCvar, tpl, "name", name, GETSTR, SETSTR);
    ACCESSOR_RO_T(cvar_t, unwrapCvar, tpl, "value", value, GETN);
    ACCESSORL(tpl, "inDuck", v.bInDuck, GETQBOOL, SETBOOL);
}
"#;
        assert_eq!(
            scrape_properties(source),
            vec![
                StructProperty::new("name", "string"),
                StructProperty::new("value", "number"),
                StructProperty::new("inDuck", "boolean"),
            ]
        );
    }

    #[test]
    fn test_without_sources_every_interface_is_present() {
        let interfaces = load_structures(None);
        assert_eq!(interfaces.len(), STRUCTURE_SOURCES.len() + 1);
        assert!(interfaces.iter().all(|i| i.name != "Entity" || i.properties.len() == 99));
        let delta = interfaces.iter().find(|i| i.name == "Delta").unwrap();
        assert_eq!(delta.notes.len(), 2);
    }

    #[test]
    fn test_entity_shape() {
        let entity = entity_interface();
        assert_eq!(entity.properties[0], StructProperty::new("id", "number"));
        assert!(entity.properties.contains(&StructProperty::new("viewOfs", "number[]")));
        assert_eq!(entity.properties.last().map(|p| p.name.as_str()), Some("groupinfo"));
    }
}
