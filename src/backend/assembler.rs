//! Output Assembler
//!
//! Collects synthesized fragments into the native sources and declaration
//! files. Dispatch tables are positional: entry `i` of a generated table is
//! the hook for declaration `i` of the SDK struct, or `NULL`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::backend::cpp::{includes, CodeWriter, CppFunction, CppTable};
use crate::backend::declarations::{self, GENERATED_BANNER};
use crate::backend::synth::{ApiStatus, SynthFlag, SynthesizedApi, SynthesizedEvent, Synthesizer};
use crate::backend::trampoline;
use crate::backend::ts::TsSignature;
use crate::feedback::{Diagnostic, GenerationReport, HamSummary, Severity, TableSummary};
use crate::frontend::ast::{Direction, HamCatalogue, TableId};
use crate::frontend::header::ParsedTable;
use crate::frontend::structures::StructureInterface;
use crate::utils::{Error, Result};

const EVENT_INCLUDES: &[&str] = &[
    "<extdll.h>",
    "node/nodeimpl.hpp",
    "node/events.hpp",
    "meta_api.h",
    "node/utils.hpp",
    "structures/structures.hpp",
];

const FUNCTION_INCLUDES: &[&str] = &[
    "<string>",
    "v8.h",
    "extdll.h",
    "node/utils.hpp",
    "structures/structures.hpp",
];

pub const HAM_CALLBACKS_FILE: &str = "ham_callbacks.cpp";

/// Where a generated file goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Native,
    Typings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub kind: OutputKind,
    pub name: String,
    pub contents: String,
}

/// Every file of one run, in write order
#[derive(Debug, Clone, Default)]
pub struct OutputSet {
    pub files: Vec<OutputFile>,
}

impl OutputSet {
    fn add(&mut self, kind: OutputKind, name: &str, contents: String) {
        self.files.push(OutputFile {
            kind,
            name: name.to_string(),
            contents,
        });
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.iter().find(|f| f.name == name).map(|f| f.contents.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Destination of every file
    pub fn paths(&self, native_dir: &Path, typings_dir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| match f.kind {
                OutputKind::Native => native_dir.join(&f.name),
                OutputKind::Typings => typings_dir.join(&f.name),
            })
            .collect()
    }

    /// Write every file, creating the output directories
    pub fn write_to(&self, native_dir: &Path, typings_dir: &Path) -> Result<Vec<PathBuf>> {
        for dir in [native_dir, typings_dir] {
            fs::create_dir_all(dir).map_err(|e| Error::Io(format!("{}: {}", dir.display(), e)))?;
        }

        let paths = self.paths(native_dir, typings_dir);
        for (file, path) in self.files.iter().zip(&paths) {
            fs::write(path, &file.contents).map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
            info!("wrote {} ({} bytes)", path.display(), file.contents.len());
        }
        Ok(paths)
    }
}

/// Everything generated for one SDK table
struct TableOutput {
    events_source: String,
    functions_source: String,
    event_declarations: Vec<TsSignature>,
    api_declarations: Vec<TsSignature>,
}

/// The assembler
pub struct Assembler {
    synth: Synthesizer,
    namespace: String,
    api_exclude: Vec<String>,
    header_name: String,
    ham_name: String,
}

impl Assembler {
    pub fn new(synth: Synthesizer, namespace: &str) -> Self {
        Self {
            synth,
            namespace: namespace.to_string(),
            api_exclude: Vec::new(),
            header_name: "eiface.h".to_string(),
            ham_name: "ham_manager.cpp".to_string(),
        }
    }

    /// Leave functions whose name contains any of `patterns` out of the API
    pub fn with_api_exclude(mut self, patterns: &[String]) -> Self {
        self.api_exclude = patterns.to_vec();
        self
    }

    /// File names used in diagnostic locations
    pub fn with_source_names(mut self, header: &str, ham: &str) -> Self {
        self.header_name = header.to_string();
        self.ham_name = ham.to_string();
        self
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.api_exclude.iter().any(|pattern| name.contains(pattern.as_str()))
    }

    // ==================== Events ====================

    /// Hook bodies and the positional dispatch table for one direction
    pub fn event_table<'p>(&self, parsed: &'p ParsedTable, direction: Direction) -> (Vec<SynthesizedEvent<'p>>, CppTable) {
        let table = parsed.table;
        let events: Vec<SynthesizedEvent<'p>> = parsed
            .functions
            .iter()
            .map(|func| self.synth.event(func, table, direction))
            .collect();

        let mut dispatch = CppTable::new(format!("{} {}", table.c_struct(), table.table_symbol(direction)));
        for event in &events {
            dispatch.push(event.table_entry());
        }
        debug!("{}: {} slots", table.table_symbol(direction), dispatch.len());
        (events, dispatch)
    }

    fn events_file(&self, parsed: &ParsedTable, report: &mut GenerationReport, summary: &mut TableSummary) -> (String, Vec<TsSignature>) {
        let table = parsed.table;
        let mut w = CodeWriter::new();
        w.writeln(GENERATED_BANNER);
        includes(&mut w, EVENT_INCLUDES);
        w.blank();

        let mut registration = CppFunction::new(format!("void {}()", table.event_registration_fn())).brace_on_new_line();
        let mut signatures = Vec::new();

        for direction in [Direction::Base, Direction::Post] {
            let (events, dispatch) = self.event_table(parsed, direction);

            w.writeln(match direction {
                Direction::Base => "/* BASE EVENTS */",
                Direction::Post => "/* POST EVENTS */",
            });
            for event in &events {
                w.write_lines(&event.generated.code);
                w.blank();
            }
            dispatch.render(&mut w);
            w.blank();

            registration.line(match direction {
                Direction::Base => "// base",
                Direction::Post => "// post",
            });
            for event in &events {
                if let Some(name) = &event.generated.event_name {
                    registration.line(format!("event::register_event(\"{}\", \"\");", name));
                    summary.events += 1;
                }
                if let Some(sig) = self.synth.event_declaration(event.function, table, direction) {
                    signatures.push(sig);
                }
                // Both directions raise the same flags; report them once
                if event.direction == Direction::Base {
                    for flag in &event.generated.flags {
                        report.push(self.flag_diagnostic(table, event.function.name.as_str(), event.function.span.line, flag));
                    }
                }
            }
        }

        registration.render(&mut w);
        (w.finish(), signatures)
    }

    fn flag_diagnostic(&self, table: TableId, function: &str, line: usize, flag: &SynthFlag) -> Diagnostic {
        Diagnostic::warning(table.key(), flag.to_string())
            .function(function)
            .at(&self.header_name, line)
    }

    // ==================== API ====================

    fn functions_file(&self, parsed: &ParsedTable, report: &mut GenerationReport, summary: &mut TableSummary) -> (String, Vec<TsSignature>) {
        let table = parsed.table;
        let apis: Vec<SynthesizedApi> = parsed
            .functions
            .iter()
            .filter(|func| {
                let excluded = self.is_excluded(&func.name);
                if excluded {
                    summary.excluded += 1;
                }
                !excluded
            })
            .map(|func| self.synth.api(func, table))
            .collect();

        let mut w = CodeWriter::new();
        w.writeln(GENERATED_BANNER);
        includes(&mut w, FUNCTION_INCLUDES);
        w.blank();
        w.writeln(table.extern_decl());
        w.blank();

        let mut installer = CppTable::new(format!(
            "static std::pair<std::string, v8::FunctionCallback> {}[]",
            table.api_table_symbol()
        ));
        let mut signatures = Vec::new();
        let mut failed = Vec::new();

        for api in &apis {
            if let Some(body) = &api.body {
                body.render(&mut w);
                w.blank();
            }
            // Unknown types are reported with the status below
            for flag in api.flags.iter().filter(|f| !matches!(f, SynthFlag::UnknownType { .. })) {
                report.push(
                    Diagnostic::warning(table.key(), format!("API body: {}", flag))
                        .function(&api.function.name)
                        .at(&self.header_name, api.function.span.line),
                );
            }
            match &api.status {
                ApiStatus::Ready => {
                    installer.push(api.definition());
                    signatures.push(self.synth.declaration(api.function, table));
                    summary.api_functions += 1;
                }
                ApiStatus::Flagged(reason) => {
                    summary.flagged += 1;
                    report.push(
                        Diagnostic::warning(table.key(), format!("API not installed: {}", reason))
                            .function(&api.function.name)
                            .at(&self.header_name, api.function.span.line)
                            .original(&api.function.original),
                    );
                    failed.push(format!("// FAILED ({}): {}", reason, api.function.original.trim()));
                }
                ApiStatus::Unparsable => {
                    failed.push(format!("// FAILED (unparsable): {}", api.function.original.trim()));
                }
            }
        }

        if installer.is_empty() {
            warn!("{}: no API function installed", table.key());
        }
        installer.render(&mut w);
        w.blank();

        let mut register = CppFunction::new(format!(
            "v8::Local<v8::ObjectTemplate> {}(v8::Isolate* isolate)",
            table.api_registration_fn()
        ));
        register.line("v8::Local<v8::ObjectTemplate> object = v8::ObjectTemplate::New(isolate);");
        register.line(format!("for (auto &routine : {}) {{", table.api_table_symbol()));
        register.line("  object->Set(v8::String::NewFromUtf8(isolate, routine.first.c_str(), v8::NewStringType::kNormal).ToLocalChecked(), v8::FunctionTemplate::New(isolate, routine.second));");
        register.line("}");
        register.line("");
        register.line("return object;");
        register.render(&mut w);

        if !failed.is_empty() {
            w.blank();
            for line in &failed {
                w.writeln(line);
            }
        }

        (w.finish(), signatures)
    }

    // ==================== Tables ====================

    fn table(&self, parsed: &ParsedTable, report: &mut GenerationReport) -> TableOutput {
        let table = parsed.table;
        let unparsable = parsed.unparsable().count();
        let mut summary = TableSummary {
            table: table.key().to_string(),
            declared: parsed.functions.len(),
            parsed: parsed.functions.len() - unparsable,
            unparsable,
            ..TableSummary::default()
        };

        for func in parsed.unparsable() {
            warn!("{}: {} left as NULL (line {})", table.key(), func.name, func.span.line);
            report.push(
                Diagnostic::warning(table.key(), "unparsable declaration")
                    .function(&func.name)
                    .at(&self.header_name, func.span.line)
                    .original(&func.original),
            );
        }

        let (events_source, event_declarations) = self.events_file(parsed, report, &mut summary);
        let (functions_source, api_declarations) = self.functions_file(parsed, report, &mut summary);

        info!(
            "{}: {} declared, {} unparsable, {} API functions, {} flagged",
            table.key(),
            summary.declared,
            summary.unparsable,
            summary.api_functions,
            summary.flagged
        );
        report.tables.push(summary);

        TableOutput {
            events_source,
            functions_source,
            event_declarations,
            api_declarations,
        }
    }

    /// Ham trampolines and their summary
    fn ham(&self, catalogue: &HamCatalogue, report: &mut GenerationReport) -> String {
        let (source, trampolines) = trampoline::callbacks_file(catalogue);
        let mut missing = 0;
        for entry in catalogue.entries.iter().filter(|e| e.signature.is_none()) {
            missing += 1;
            report.push(
                Diagnostic::new(
                    Severity::Info,
                    "ham",
                    format!("id {} has no row in {}; callback slot is nullptr", entry.id, self.ham_name),
                )
                .function(&format!("Ham_{}", entry.name)),
            );
        }

        let summary = report.ham.get_or_insert_with(HamSummary::default);
        summary.entries = catalogue.entries.len();
        summary.signatures = catalogue.signatures.len();
        summary.trampolines = trampolines.len();
        summary.missing_signatures = missing;

        info!("ham: {} trampolines for {} entries", trampolines.len(), catalogue.entries.len());
        source
    }

    /// Assemble every output file
    pub fn assemble(
        &self,
        tables: &[ParsedTable],
        catalogue: &HamCatalogue,
        structures: &[StructureInterface],
        report: &mut GenerationReport,
    ) -> OutputSet {
        let mut outputs = OutputSet::default();
        let mut events = Vec::new();
        let mut surfaces = Vec::new();

        for parsed in tables {
            let output = self.table(parsed, report);
            outputs.add(OutputKind::Native, parsed.table.events_file(), output.events_source);
            outputs.add(OutputKind::Native, parsed.table.functions_file(), output.functions_source);
            events.extend(output.event_declarations);
            surfaces.push((parsed.table, output.api_declarations));
        }

        let ham_source = self.ham(catalogue, report);
        outputs.add(OutputKind::Native, HAM_CALLBACKS_FILE, ham_source);

        let ns = self.namespace.as_str();
        outputs.add(OutputKind::Typings, declarations::ENUMS_FILE, declarations::enums_file(ns));
        outputs.add(OutputKind::Typings, declarations::EVENTS_FILE, declarations::events_file(ns, &events));
        outputs.add(
            OutputKind::Typings,
            declarations::STRUCTURES_FILE,
            declarations::structures_file(ns, structures),
        );
        for (table, methods) in &surfaces {
            outputs.add(
                OutputKind::Typings,
                table.typings_file(),
                declarations::surface_file(ns, *table, methods),
            );
        }
        outputs.add(OutputKind::Typings, declarations::HAM_FILE, declarations::ham_file(ns, catalogue));
        outputs.add(OutputKind::Typings, declarations::INDEX_FILE, declarations::index_file(ns));

        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ham::parse_catalogue;
    use crate::frontend::header::parse_table;
    use crate::middle::overrides::{BuiltinOverrides, NoOverrides};
    use pretty_assertions::assert_eq;

    const HEADER: &str = r#"
#endif

typedef struct
{
    void (*pfnGameInit) ( void );
    int (*pfnSpawn) ( edict_t *pent );
    void (*pfnBroken);
    void (*pfnServerDeactivate) ( void );
} DLL_FUNCTIONS;

typedef struct enginefuncs_s
{
    int (*pfnPrecacheModel) (const char *s);
    void (*pfnSetModel) (edict_t *e, const char *m);
    CRC32_t (*pfnCRC32_Final) (CRC32_t pulCRC);
    void (*pfnUseModel) (model_t m);
} enginefuncs_t;
"#;

    const HAM_ENUM: &str = "enum HamType {\n  Ham_Spawn = 0,\n  Ham_TakeDamage,\n  Ham_EndMarker\n};";
    const HAM_ARRAY: &str = r#"HamFunctionInfo g_hamFunctions[] = {
    {"spawn", HAM_RET_VOID, 0, {}},
    {"takedamage", HAM_RET_INT, 4, {HAM_PARAM_ENTVAR, HAM_PARAM_ENTVAR, HAM_PARAM_FLOAT, HAM_PARAM_INT}},
};"#;

    fn assembler() -> Assembler {
        Assembler::new(Synthesizer::new(Box::new(BuiltinOverrides::new())), "nodemod")
            .with_api_exclude(&["CRC32".to_string()])
    }

    fn run() -> (OutputSet, GenerationReport) {
        let tables = vec![
            parse_table(HEADER, TableId::Dll).unwrap(),
            parse_table(HEADER, TableId::Engine).unwrap(),
        ];
        let catalogue = parse_catalogue(HAM_ENUM, HAM_ARRAY).unwrap();
        let mut report = GenerationReport::new();
        let outputs = assembler().assemble(&tables, &catalogue, &[], &mut report);
        (outputs, report)
    }

    #[test]
    fn test_dispatch_table_is_positional() {
        let parsed = parse_table(HEADER, TableId::Dll).unwrap();
        let (events, table) = assembler().event_table(&parsed, Direction::Base);

        assert_eq!(table.len(), parsed.functions.len());
        assert_eq!(events.len(), 4);
        let nulls = table.entries.iter().filter(|e| *e == "NULL").count();
        assert_eq!(nulls, parsed.unparsable().count());
        assert_eq!(
            table.entries,
            vec!["dll_pfnGameInit", "dll_pfnSpawn", "NULL", "dll_pfnServerDeactivate"]
        );
        assert_eq!(table.prefix, "DLL_FUNCTIONS g_DllFunctionTable");
    }

    #[test]
    fn test_events_file_layout() {
        let (outputs, _) = run();
        let source = outputs.get("dll_events.cpp").unwrap();

        assert!(source.starts_with(GENERATED_BANNER));
        assert!(source.contains("#include <extdll.h>\n#include \"node/nodeimpl.hpp\"\n"));
        let base = source.find("/* BASE EVENTS */").unwrap();
        let post = source.find("/* POST EVENTS */").unwrap();
        let table = source.find("DLL_FUNCTIONS g_DllFunctionTable = {").unwrap();
        let post_table = source.find("DLL_FUNCTIONS g_DllFunctionTable_Post = {").unwrap();
        assert!(base < table && table < post && post < post_table);

        assert!(source.contains("// NULL dll_pfnBroken\n"));
        assert!(source.contains("  dll_pfnSpawn,\n  NULL,\n  dll_pfnServerDeactivate\n};\n"));
        assert!(source.contains("void registerDllEvents()\n{\n  // base\n  event::register_event(\"dllGameInit\", \"\");\n"));
        assert!(source.contains("  event::register_event(\"postDllServerDeactivate\", \"\");\n}\n"));
        assert!(!source.contains("\"dllBroken\""));
    }

    #[test]
    fn test_functions_file_installs_ready_apis_only() {
        let (outputs, report) = run();
        let source = outputs.get("engine_functions.cpp").unwrap();

        assert!(source.contains("extern enginefuncs_t g_engfuncs;\n"));
        assert!(source.contains(
            "static std::pair<std::string, v8::FunctionCallback> engineSpecificFunctions[] = {\n  { \"precacheModel\", sf_eng_pfnPrecacheModel },\n  { \"setModel\", sf_eng_pfnSetModel }\n};\n"
        ));
        assert!(source.contains("v8::Local<v8::ObjectTemplate> registerEngineFunctions(v8::Isolate* isolate) {\n"));
        assert!(source.contains("// FAILED (unmapped type: unknown type model_t (m)): void (*pfnUseModel) (model_t m);"));
        assert!(!source.contains("CRC32_Final"));

        let dll = outputs.get("dll_functions.cpp").unwrap();
        assert!(dll.contains("extern gamedll_funcs_t *gpGamedllFuncs;"));
        assert!(dll.contains("// FAILED (unparsable): void (*pfnBroken);"));

        let engine = &report.tables[1];
        assert_eq!(engine.table, "eng");
        assert_eq!(engine.declared, 4);
        assert_eq!(engine.excluded, 1);
        assert_eq!(engine.flagged, 1);
        assert_eq!(engine.api_functions, 2);
        assert_eq!(engine.events, 8);
        assert_eq!(report.tables[0].unparsable, 1);
        assert_eq!(report.tables[0].events, 6);
    }

    #[test]
    fn test_api_flags_reach_the_report() {
        let header = "typedef struct enginefuncs_s\n{\n    float * (*pfnGetOrigin) ( int index );\n} enginefuncs_t;\n";
        let parsed = parse_table(header, TableId::Engine).unwrap();
        let mut report = GenerationReport::new();
        assembler().assemble(&[parsed], &HamCatalogue::default(), &[], &mut report);

        let flagged: Vec<&Diagnostic> = report
            .diagnostics
            .iter()
            .filter(|d| d.function.as_deref() == Some("pfnGetOrigin"))
            .collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].message, "API body: assumed length 3 for return");
        assert_eq!(flagged[0].location.as_ref().map(|l| l.line), Some(3));
        assert_eq!(report.tables[0].api_functions, 1);
    }

    #[test]
    fn test_typings_follow_api_surface() {
        let (outputs, _) = run();
        let engine = outputs.get("engine.d.ts").unwrap();
        assert!(engine.contains("    precacheModel(s: string): number;\n"));
        assert!(engine.contains("    setModel(e: Entity, m: string): void;\n"));
        assert!(!engine.contains("useModel"));
        assert!(!engine.contains("cRC32Final"));

        let events = outputs.get("events.d.ts").unwrap();
        assert!(events.contains("\"engCRC32Final\""));
        assert!(events.contains("\"postDllSpawn\""));
        assert!(!events.contains("Broken"));
    }

    #[test]
    fn test_every_output_is_named_once() {
        let (outputs, report) = run();
        let names: Vec<&str> = outputs.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "dll_events.cpp",
                "dll_functions.cpp",
                "engine_events.cpp",
                "engine_functions.cpp",
                "ham_callbacks.cpp",
                "enums.d.ts",
                "events.d.ts",
                "structures.d.ts",
                "dll.d.ts",
                "engine.d.ts",
                "ham.d.ts",
                "index.d.ts",
            ]
        );
        assert_eq!(report.ham.as_ref().map(|h| h.trampolines), Some(2));

        let paths = outputs.paths(Path::new("native"), Path::new("typings"));
        assert_eq!(paths[0], PathBuf::from("native/dll_events.cpp"));
        assert_eq!(paths[11], PathBuf::from("typings/index.d.ts"));
    }

    #[test]
    fn test_write_to_creates_directories() {
        let root = std::env::temp_dir().join(format!("nodegen-assembler-{}", std::process::id()));
        let mut outputs = OutputSet::default();
        outputs.add(OutputKind::Native, "a.cpp", "int a;\n".to_string());
        outputs.add(OutputKind::Typings, "a.d.ts", "declare namespace x {}\n".to_string());

        let written = outputs.write_to(&root.join("src/auto"), &root.join("packages/core")).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "int a;\n");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_generic_synthesizer_is_accepted() {
        let parsed = parse_table(HEADER, TableId::Engine).unwrap();
        let assembler = Assembler::new(Synthesizer::new(Box::new(NoOverrides)), "mod");
        let mut report = GenerationReport::new();
        let outputs = assembler.assemble(&[parsed], &HamCatalogue::default(), &[], &mut report);
        assert!(outputs.get("engine.d.ts").unwrap().contains("declare namespace mod {"));
        assert!(outputs.get("dll_events.cpp").is_none());
        assert_eq!(outputs.len(), 9);
    }
}
