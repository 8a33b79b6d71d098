//! Declaration files
//!
//! Every `.d.ts` file starts with the generated banner and wraps its body in
//! `declare namespace <ns> { ... }`. Fragments come from the synthesizer
//! (`TsSignature`) and the structure scraper; this module only lays them out.

use crate::backend::cpp::CodeWriter;
use crate::backend::ts::{TsEnum, TsInterface, TsMember, TsSignature};
use crate::frontend::ast::{HamCatalogue, HamFunctionEntry, TableId};
use crate::frontend::structures::StructureInterface;
use crate::middle::ham_types::{param_info, param_names, return_ts_type, THIS_NAME};

pub const GENERATED_BANNER: &str = "// This file is generated automatically. Don't edit it.";

pub const ENUMS_FILE: &str = "enums.d.ts";
pub const EVENTS_FILE: &str = "events.d.ts";
pub const STRUCTURES_FILE: &str = "structures.d.ts";
pub const HAM_FILE: &str = "ham.d.ts";
pub const INDEX_FILE: &str = "index.d.ts";

/// Banner, references and the namespace block around `body`
fn declaration_file(namespace: &str, references: &[&str], body: impl FnOnce(&mut CodeWriter)) -> String {
    let mut w = CodeWriter::new();
    w.writeln(GENERATED_BANNER);
    for reference in references {
        w.writeln(&format!("/// <reference path=\"./{}\" />", reference));
    }
    if !references.is_empty() {
        w.blank();
    }
    w.open(&format!("declare namespace {}", namespace));
    body(&mut w);
    w.close("}");
    w.finish()
}

/// Metamod and engine enums
pub fn enums_file(namespace: &str) -> String {
    let mut meta = TsEnum::new("META_RES");
    meta.value("UNSET", 0, Some("Uninitialized (causes error)"));
    meta.value("IGNORED", 1, Some("Plugin didn't take any action, continue normally"));
    meta.value("HANDLED", 2, Some("Plugin did something, but original function still executes"));
    meta.value("OVERRIDE", 3, Some("Execute original function, but use plugin's return value"));
    meta.value("SUPERCEDE", 4, Some("Skip original function entirely, use plugin's behavior"));

    let mut alert = TsEnum::new("ALERT_TYPE");
    for (value, name) in ["at_notice", "at_console", "at_aiconsole", "at_warning", "at_error", "at_logged"]
        .iter()
        .enumerate()
    {
        alert.value(*name, value as i64, None);
    }

    let mut print = TsEnum::new("PRINT_TYPE");
    for (value, name) in ["print_console", "print_center", "print_chat"].iter().enumerate() {
        print.value(*name, value as i64, None);
    }

    let mut force = TsEnum::new("FORCE_TYPE");
    for (value, name) in [
        "force_exactfile",
        "force_model_samebounds",
        "force_model_specifybounds",
        "force_model_specifybounds_if_avail",
    ]
    .iter()
    .enumerate()
    {
        force.value(*name, value as i64, None);
    }

    let sections = [
        ("Metamod result constants", meta),
        ("Alert types for engine functions", alert),
        ("Print types for client output", print),
        ("Force types for consistency checking", force),
    ];

    declaration_file(namespace, &[], |w| {
        for (i, (comment, decl)) in sections.iter().enumerate() {
            if i > 0 {
                w.blank();
            }
            w.writeln(&format!("// {}", comment));
            decl.render(w);
        }
    })
}

/// `EventCallbacks`: one entry per generated event, base and post
pub fn events_file(namespace: &str, events: &[TsSignature]) -> String {
    let mut callbacks = TsInterface::new("EventCallbacks");
    for event in events {
        callbacks.push(TsMember::Event(event.clone()));
    }

    declaration_file(namespace, &[STRUCTURES_FILE], |w| {
        w.writeln("// Event callbacks map");
        callbacks.render(w);
    })
}

/// Scraped struct interfaces, plus the opaque handles
pub fn structures_file(namespace: &str, structures: &[StructureInterface]) -> String {
    let mut file_handle = TsInterface::new("FileHandle");
    file_handle.push(TsMember::Comment("Opaque file handle - use with engine file functions".to_string()));

    let mut item_info = TsInterface::new("ItemInfo");
    item_info.push(TsMember::Comment("Weapon item info - Ham callbacks receive null until it is wrapped".to_string()));

    let interfaces: Vec<TsInterface> = structures
        .iter()
        .map(|structure| {
            let mut iface = TsInterface::new(structure.name.clone()).spaced();
            for note in &structure.notes {
                iface.push(TsMember::Comment(note.clone()));
            }
            for property in &structure.properties {
                iface.property(property.name.clone(), property.ty.clone());
            }
            iface
        })
        .collect();

    declaration_file(namespace, &[], |w| {
        file_handle.render(w);
        w.blank();
        for iface in &interfaces {
            iface.render(w);
        }
        item_info.render(w);
    })
}

/// Direct-call surface of one table: `interface Engine` + `const eng: Engine;`
pub fn surface_file(namespace: &str, table: TableId, methods: &[TsSignature]) -> String {
    let mut surface = TsInterface::new(table.interface_name());
    for method in methods {
        surface.push(TsMember::Method(method.clone()));
    }

    declaration_file(namespace, &[STRUCTURES_FILE, ENUMS_FILE], |w| {
        surface.render(w);
        w.writeln(&format!("const {}: {};", table.key(), table.interface_name()));
    })
}

fn ham_result_description(name: &str) -> Option<&'static str> {
    match name {
        "UNSET" => Some("Default state"),
        "IGNORED" => Some("Hook had no effect, continue normally"),
        "HANDLED" => Some("Hook processed the call, but still call original"),
        "OVERRIDE" => Some("Use hook's return value instead of original"),
        "SUPERCEDE" => Some("Don't call original function at all"),
        _ => None,
    }
}

/// `(this_: Entity, inflictor: Entvars, ...) => HAM_RESULT | number` for one entry
fn ham_callback_type(catalogue_entry: &HamFunctionEntry) -> String {
    let Some(signature) = &catalogue_entry.signature else {
        return format!("({}: Entity) => HAM_RESULT | void", THIS_NAME);
    };

    let mut params = vec![format!("{}: Entity", THIS_NAME)];
    let names = param_names(&signature.key, &signature.params);
    for (param, name) in signature.params.iter().zip(&names) {
        params.push(format!("{}: {}", name, param_info(param).ts_type));
    }
    format!(
        "({}) => HAM_RESULT | {}",
        params.join(", "),
        return_ts_type(&signature.return_code)
    )
}

/// Hook ids, result values and the id-to-callback type map
pub fn ham_file(namespace: &str, catalogue: &HamCatalogue) -> String {
    let mut functions = TsEnum::new("HAM_FUNC");
    functions.is_const = true;
    functions.doc = Some("Ham function IDs for virtual function hooking".to_string());
    for entry in &catalogue.entries {
        functions.value(entry.name.clone(), entry.id as i64, None);
    }

    let mut results = TsEnum::new("HAM_RESULT");
    results.is_const = true;
    results.doc = Some("Ham (Hamsandwich) hook result values".to_string());
    for result in &catalogue.results {
        results.value(result.name.clone(), result.value, ham_result_description(&result.name));
    }

    declaration_file(namespace, &[STRUCTURES_FILE], |w| {
        functions.render(w);
        w.blank();
        results.render(w);
        w.blank();
        w.writeln("// Ham callback type mappings - maps HAM_FUNC to callback signature");
        w.writeln(&format!(
            "// All callbacks receive '{}' (the hooked entity) as the first parameter",
            THIS_NAME
        ));
        w.writeln("type HamCallbackFor<T extends HAM_FUNC> =");
        w.indent();
        for entry in &catalogue.entries {
            w.writeln(&format!(
                "T extends HAM_FUNC.{} ? {} :",
                entry.name,
                ham_callback_type(entry)
            ));
        }
        w.writeln(&format!("({}: Entity, ...args: any[]) => HAM_RESULT | void;", THIS_NAME));
        w.dedent();
    })
}

/// Root aggregator: references, runtime properties and the event API
pub fn index_file(namespace: &str) -> String {
    let references = [
        ENUMS_FILE,
        EVENTS_FILE,
        STRUCTURES_FILE,
        TableId::Engine.typings_file(),
        TableId::Dll.typings_file(),
        HAM_FILE,
    ];
    let listener = |name: &str| {
        format!(
            "function {}<T extends keyof EventCallbacks>(eventName: T, callback: EventCallbacks[T]): void;",
            name
        )
    };

    declaration_file(namespace, &references, |w| {
        w.writeln("// Properties");
        w.writeln("const cwd: string;");
        w.writeln("const players: Entity[];");
        w.writeln("const mapname: string;");
        w.writeln("const time: number;");
        w.blank();
        w.writeln("// Event system functions");
        for name in ["on", "addEventListener", "addListener", "removeListener", "removeEventListener"] {
            w.writeln(&listener(name));
        }
        w.writeln("function clearListeners(eventName?: keyof EventCallbacks): void;");
        w.writeln(
            "function fire<T extends keyof EventCallbacks>(eventName: T, ...args: Parameters<EventCallbacks[T]>): void;",
        );
        w.blank();
        w.writeln("// Utility functions");
        w.writeln("function getUserMsgId(msgName: string): number;");
        w.writeln("function getUserMsgName(msgId: number): string;");
        w.writeln("function setMetaResult(result: META_RES): void;");
        w.writeln("function continueServer(): void;");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ts::TsParam;
    use crate::frontend::ham::parse_catalogue;
    use crate::frontend::structures::{StructProperty, StructureInterface};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_file_has_banner_and_namespace() {
        let catalogue = HamCatalogue::default();
        for source in [
            enums_file("nodemod"),
            events_file("nodemod", &[]),
            structures_file("nodemod", &[]),
            surface_file("nodemod", TableId::Engine, &[]),
            ham_file("nodemod", &catalogue),
            index_file("nodemod"),
        ] {
            assert!(source.starts_with(GENERATED_BANNER), "{}", source);
            assert!(source.contains("declare namespace nodemod {\n"), "{}", source);
            assert!(source.ends_with("}\n"), "{}", source);
        }
    }

    #[test]
    fn test_engine_surface() {
        let mut sig = TsSignature::new("precacheModel", "number");
        sig.params.push(TsParam::new("s", "string", "const char *"));
        sig.doc = Some("int (*pfnPrecacheModel)( const char *s );".to_string());

        assert_eq!(
            surface_file("nodemod", TableId::Engine, &[sig]),
            "// This file is generated automatically. Don't edit it.\n\
             /// <reference path=\"./structures.d.ts\" />\n\
             /// <reference path=\"./enums.d.ts\" />\n\
             \n\
             declare namespace nodemod {\n  \
             interface Engine {\n    \
             /** int (*pfnPrecacheModel)( const char *s ); */\n    \
             precacheModel(s: string): number;\n  \
             }\n  \
             const eng: Engine;\n\
             }\n"
        );
        assert!(surface_file("nodemod", TableId::Dll, &[]).contains("  const dll: DLL;\n"));
    }

    #[test]
    fn test_enum_values() {
        let source = enums_file("nodemod");
        assert!(source.contains("    SUPERCEDE = 4, // Skip original function entirely, use plugin's behavior\n"));
        assert!(source.contains("    at_logged = 5,\n"));
        assert!(source.contains("    force_model_specifybounds_if_avail = 3,\n"));
        assert!(source.contains("  // Print types for client output\n  enum PRINT_TYPE {\n"));
    }

    #[test]
    fn test_structures_with_opaque_handles() {
        let mut cvar = StructureInterface::new("Cvar");
        cvar.properties.push(StructProperty::new("name", "string"));
        cvar.properties.push(StructProperty::new("value", "number"));
        let source = structures_file("custom", &[cvar]);

        assert!(source.contains(
            "  interface FileHandle {\n    // Opaque file handle - use with engine file functions\n  }\n\n"
        ));
        assert!(source.contains("  interface Cvar {\n    name: string;\n\n    value: number;\n  }\n"));
        assert!(source.contains("  interface ItemInfo {\n"));
        assert!(source.contains("declare namespace custom {"));
    }

    #[test]
    fn test_ham_declarations() {
        let enum_src = "enum HamType {\n  Ham_Spawn = 0,\n  Ham_TakeDamage,\n  Ham_Missing,\n  Ham_EndMarker\n};";
        let array_src = r#"HamFunctionInfo g_hamFunctions[] = {
    {"spawn", HAM_RET_VOID, 0, {}},
    {"takedamage", HAM_RET_INT, 4, {HAM_PARAM_ENTVAR, HAM_PARAM_ENTVAR, HAM_PARAM_FLOAT, HAM_PARAM_INT}},
};"#;
        let catalogue = parse_catalogue(enum_src, array_src).unwrap();
        let source = ham_file("nodemod", &catalogue);

        assert!(source.contains("  /** Ham function IDs for virtual function hooking */\n  const enum HAM_FUNC {\n    Spawn = 0,\n"));
        assert!(source.contains("    OVERRIDE = 3, // Use hook's return value instead of original\n"));
        assert!(source.contains(
            "    T extends HAM_FUNC.TakeDamage ? (this_: Entity, inflictor: Entvars, attacker: Entvars, damage: number, damageBits: number) => HAM_RESULT | number :\n"
        ));
        assert!(source.contains("    T extends HAM_FUNC.Spawn ? (this_: Entity) => HAM_RESULT | void :\n"));
        assert!(source.contains("    T extends HAM_FUNC.Missing ? (this_: Entity) => HAM_RESULT | void :\n"));
        assert!(source.ends_with("    (this_: Entity, ...args: any[]) => HAM_RESULT | void;\n}\n"));
    }

    #[test]
    fn test_index_references_every_file() {
        let source = index_file("nodemod");
        for file in ["enums.d.ts", "events.d.ts", "structures.d.ts", "engine.d.ts", "dll.d.ts", "ham.d.ts"] {
            assert!(source.contains(&format!("/// <reference path=\"./{}\" />", file)));
        }
        assert!(source.contains("  function setMetaResult(result: META_RES): void;\n"));
        assert!(source.contains(
            "  function on<T extends keyof EventCallbacks>(eventName: T, callback: EventCallbacks[T]): void;\n"
        ));
    }
}
