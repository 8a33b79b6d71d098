//! nodemod code generator
//!
//! Reads the SDK function tables and the Ham catalogue, and writes the V8
//! glue, the TypeScript declarations and the Ham trampolines.

mod frontend;
mod middle;
mod backend;
mod utils;
mod feedback;
mod config;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use log::info;

use backend::{Assembler, OutputSet, Synthesizer};
use config::{ConfigOverrides, GeneratorConfig};
use feedback::{Diagnostic, GenerationReport, Severity};
use frontend::ast::TableId;
use frontend::ham::parse_catalogue;
use frontend::header::parse_table;
use frontend::structures::load_structures;
use middle::overrides::BuiltinOverrides;
use middle::validate::{apply_policy, validate_catalogue, MismatchPolicy};

/// nodemod code generator
#[derive(Parser, Debug)]
#[command(name = "nodegen")]
#[command(version = "0.1.0")]
#[command(about = "Generates V8 glue, TypeScript declarations and Ham trampolines from the HLSDK headers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: Options,
}

#[derive(Args, Debug)]
struct Options {
    /// Project root; relative paths resolve against it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SDK header holding the function tables
    #[arg(long, global = true, value_name = "FILE")]
    header: Option<PathBuf>,

    /// Ham enum source
    #[arg(long, global = true, value_name = "FILE")]
    ham_enum: Option<PathBuf>,

    /// Ham signature array source
    #[arg(long, global = true, value_name = "FILE")]
    ham_table: Option<PathBuf>,

    /// Structure wrapper sources
    #[arg(long, global = true, value_name = "DIR")]
    structures_dir: Option<PathBuf>,

    /// Output directory for native sources
    #[arg(long, global = true, value_name = "DIR")]
    native_out: Option<PathBuf>,

    /// Output directory for declaration files
    #[arg(long, global = true, value_name = "DIR")]
    typings_out: Option<PathBuf>,

    /// Script namespace of the declarations
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// What a Ham catalogue mismatch does
    #[arg(long, global = true, value_enum)]
    ham_mismatch: Option<PolicyArg>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate every output file
    Generate {
        /// Write the JSON report here
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Run everything but write no outputs
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse, synthesize and validate without writing
    Check {
        /// Write the JSON report here
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Warn,
    Error,
}

impl From<PolicyArg> for MismatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Warn => MismatchPolicy::Warn,
            PolicyArg::Error => MismatchPolicy::Error,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Generate { report, dry_run }) => generate(&cli.options, report.as_deref(), *dry_run),
        Some(Commands::Check { report }) => check(&cli.options, report.as_deref()),
        Some(Commands::Version) => {
            println!("nodegen 0.1.0");
            println!("nodemod code generator");
            println!("License: Apache-2.0");
            Ok(true)
        }
        None => generate(&cli.options, None, false),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// File config, flags on top, paths anchored at `--root`
fn load_config(options: &Options) -> anyhow::Result<GeneratorConfig> {
    let file = match &options.config {
        Some(path) => Some(if path.is_absolute() { path.clone() } else { options.root.join(path) }),
        None => None,
    };
    let config = GeneratorConfig::load_or_default(file.as_deref())?
        .merge(ConfigOverrides {
            header: options.header.clone(),
            ham_enum: options.ham_enum.clone(),
            ham_table: options.ham_table.clone(),
            structures_dir: options.structures_dir.clone(),
            native_out: options.native_out.clone(),
            typings_out: options.typings_out.clone(),
            script_namespace: options.namespace.clone(),
            ham_mismatch: options.ham_mismatch.map(MismatchPolicy::from),
        })
        .resolve(&options.root);
    config.validate()?;
    Ok(config)
}

fn read_input(path: &Path, what: &str) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {} {}", what, path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every input, then parse, validate and synthesize
fn run_pipeline(config: &GeneratorConfig) -> anyhow::Result<(OutputSet, GenerationReport)> {
    let header = read_input(&config.header, "header")?;
    let ham_enum = read_input(&config.ham_enum, "Ham enum source")?;
    let ham_table = read_input(&config.ham_table, "Ham array source")?;
    let header_name = file_name(&config.header);
    let ham_name = file_name(&config.ham_table);

    let mut report = GenerationReport::new();

    let mut tables = Vec::new();
    for table in TableId::ALL {
        let parsed = parse_table(&header, table).with_context(|| format!("parsing {}", config.header.display()))?;
        for skipped in &parsed.skipped {
            report.push(
                Diagnostic::new(Severity::Info, table.key(), "preprocessor line skipped")
                    .at(&header_name, skipped.line)
                    .original(&skipped.text),
            );
        }
        println!("  [✓] Parsed {} ({} declarations)", table.c_struct(), parsed.functions.len());
        tables.push(parsed);
    }

    let catalogue = parse_catalogue(&ham_enum, &ham_table)
        .with_context(|| format!("parsing Ham catalogue from {}", config.ham_enum.display()))?;
    println!(
        "  [✓] Parsed Ham catalogue ({} hooks, {} signatures)",
        catalogue.entries.len(),
        catalogue.signatures.len()
    );

    let issues = validate_catalogue(&catalogue);
    for issue in &issues {
        report.push(Diagnostic::from_issue(issue, Severity::Warning, &ham_name));
    }
    if let Err(e) = apply_policy(&issues, config.ham_mismatch) {
        report.push(Diagnostic::from_error(&e, "ham", &ham_name));
    }

    let structures = load_structures(config.structures_dir.as_deref());

    let synth = Synthesizer::new(Box::new(BuiltinOverrides::new()))
        .with_frame_tick(&config.frame_tick_function)
        .with_namespace(&config.script_namespace);
    let assembler = Assembler::new(synth, &config.script_namespace)
        .with_api_exclude(&config.api_exclude)
        .with_source_names(&header_name, &ham_name);

    let outputs = assembler.assemble(&tables, &catalogue, &structures, &mut report);
    if let Some(ham) = report.ham.as_mut() {
        ham.issues = issues.len();
    }
    println!("  [✓] Synthesized {} files", outputs.len());

    Ok((outputs, report))
}

fn write_report(report: &GenerationReport, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        fs::write(path, report.to_json()).with_context(|| format!("writing report {}", path.display()))?;
        info!("wrote report {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &GenerationReport) {
    for table in &report.tables {
        println!(
            "  {}: {} declared, {} unparsable, {} events, {} API functions, {} flagged, {} excluded",
            table.table, table.declared, table.unparsable, table.events, table.api_functions, table.flagged, table.excluded
        );
    }
    if let Some(ham) = &report.ham {
        println!(
            "  ham: {} hooks, {} trampolines, {} without signature, {} issues",
            ham.entries, ham.trampolines, ham.missing_signatures, ham.issues
        );
    }
}

/// Full run; nothing is written when the run has errors
fn generate(options: &Options, report_path: Option<&Path>, dry_run: bool) -> anyhow::Result<bool> {
    println!("nodegen 0.1.0");
    let config = load_config(options)?;
    let (outputs, mut report) = run_pipeline(&config)?;
    print_summary(&report);

    if report.has_errors() {
        write_report(&report, report_path)?;
        bail!("{} error(s); no files written", report.count(Severity::Error));
    }

    let paths = if dry_run {
        let paths = outputs.paths(&config.native_out, &config.typings_out);
        for path in &paths {
            println!("  [dry-run] {}", path.display());
        }
        paths
    } else {
        outputs.write_to(&config.native_out, &config.typings_out)?
    };
    report.files = paths.iter().map(|p| p.display().to_string()).collect();
    write_report(&report, report_path)?;

    println!("\n✅ {} files {}", paths.len(), if dry_run { "planned" } else { "written" });
    Ok(true)
}

/// Validation only; fails on unparsable lines or errors
fn check(options: &Options, report_path: Option<&Path>) -> anyhow::Result<bool> {
    let config = load_config(options)?;
    let (_, report) = run_pipeline(&config)?;
    print_summary(&report);
    write_report(&report, report_path)?;

    let unparsable = report.unparsable();
    if unparsable > 0 || report.has_errors() {
        eprintln!(
            "❌ {} unparsable declaration(s), {} error(s)",
            unparsable,
            report.count(Severity::Error)
        );
        return Ok(false);
    }
    println!("✅ No errors found");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const HEADER: &str = "#endif

typedef struct
{
    void (*pfnGameInit) ( void );
    void (*pfnStartFrame) ( void );
} DLL_FUNCTIONS;

typedef struct enginefuncs_s
{
    int (*pfnPrecacheModel) (const char *s);
} enginefuncs_t;
";

    const HAM_ENUM: &str = "enum HamType\n{\n\tHam_Spawn = 0,\n\tHam_EndMarker\n};\n";
    const HAM_TABLE: &str = "HamFunctionInfo g_hamFunctions[] = {\n    {\"spawn\", HAM_RET_VOID, 0, {}},\n};\n";

    fn project(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("nodegen-{}-{}", name, process::id()));
        fs::create_dir_all(root.join("sdk")).unwrap();
        fs::write(root.join("sdk/eiface.h"), HEADER).unwrap();
        fs::write(root.join("sdk/ham_const.h"), HAM_ENUM).unwrap();
        fs::write(root.join("sdk/ham_manager.cpp"), HAM_TABLE).unwrap();
        root
    }

    fn options(root: &Path) -> Options {
        Options {
            root: root.to_path_buf(),
            config: None,
            header: Some(PathBuf::from("sdk/eiface.h")),
            ham_enum: Some(PathBuf::from("sdk/ham_const.h")),
            ham_table: Some(PathBuf::from("sdk/ham_manager.cpp")),
            structures_dir: None,
            native_out: Some(PathBuf::from("out/native")),
            typings_out: Some(PathBuf::from("out/typings")),
            namespace: None,
            ham_mismatch: None,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_writes_everything() {
        let root = project("generate");
        let report = root.join("report.json");
        assert!(generate(&options(&root), Some(&report), false).unwrap());

        let events = fs::read_to_string(root.join("out/native/dll_events.cpp")).unwrap();
        assert!(events.contains("nodeImpl.Tick();"));
        assert!(root.join("out/native/ham_callbacks.cpp").exists());
        assert!(root.join("out/typings/index.d.ts").exists());

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["files"].as_array().map(Vec::len), Some(12));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let root = project("dry-run");
        assert!(generate(&options(&root), None, true).unwrap());
        assert!(!root.join("out").exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_check_fails_on_unparsable_line() {
        let root = project("check");
        assert!(check(&options(&root), None).unwrap());

        fs::write(root.join("sdk/eiface.h"), HEADER.replace("( void );\n} DLL", ";\n} DLL")).unwrap();
        assert!(!check(&options(&root), None).unwrap());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let root = project("missing");
        fs::remove_file(root.join("sdk/ham_const.h")).unwrap();
        let err = generate(&options(&root), None, false).unwrap_err();
        assert!(format!("{:#}", err).contains("ham_const.h"));
        assert!(!root.join("out").exists());
        fs::remove_dir_all(&root).unwrap();
    }
}
