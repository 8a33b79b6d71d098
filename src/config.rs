//! Generator configuration
//!
//! Loaded from an optional JSON file, then overridden by command-line flags.
//! Relative paths resolve against the project root.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::backend::synth::DEFAULT_FRAME_TICK;
use crate::middle::validate::MismatchPolicy;
use crate::utils::{Error, Result};

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// SDK header holding `DLL_FUNCTIONS` and `enginefuncs_t`
    pub header: PathBuf,
    /// Source holding the `HamType` and `HamResult` enums
    pub ham_enum: PathBuf,
    /// Source holding `g_hamFunctions[]`
    pub ham_table: PathBuf,
    /// Structure wrapper sources; interfaces stay empty without it
    pub structures_dir: Option<PathBuf>,
    pub native_out: PathBuf,
    pub typings_out: PathBuf,
    pub script_namespace: String,
    /// DLL function whose base hook advances the script runtime
    pub frame_tick_function: String,
    /// Name substrings left out of the API surface
    pub api_exclude: Vec<String>,
    pub ham_mismatch: MismatchPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            header: PathBuf::from("build/vcpkg_installed/x86-linux/include/hlsdk/engine/eiface.h"),
            ham_enum: PathBuf::from("src/ham/ham_const.h"),
            ham_table: PathBuf::from("src/ham/ham_manager.cpp"),
            structures_dir: Some(PathBuf::from("src/structures")),
            native_out: PathBuf::from("src/auto"),
            typings_out: PathBuf::from("packages/core"),
            script_namespace: "nodemod".to_string(),
            frame_tick_function: DEFAULT_FRAME_TICK.to_string(),
            api_exclude: vec!["CRC32".to_string()],
            ham_mismatch: MismatchPolicy::Warn,
        }
    }
}

/// Flag values that win over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub header: Option<PathBuf>,
    pub ham_enum: Option<PathBuf>,
    pub ham_table: Option<PathBuf>,
    pub structures_dir: Option<PathBuf>,
    pub native_out: Option<PathBuf>,
    pub typings_out: Option<PathBuf>,
    pub script_namespace: Option<String>,
    pub ham_mismatch: Option<MismatchPolicy>,
}

impl GeneratorConfig {
    /// Parse a JSON config; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// File config when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(header) = overrides.header {
            self.header = header;
        }
        if let Some(ham_enum) = overrides.ham_enum {
            self.ham_enum = ham_enum;
        }
        if let Some(ham_table) = overrides.ham_table {
            self.ham_table = ham_table;
        }
        if overrides.structures_dir.is_some() {
            self.structures_dir = overrides.structures_dir;
        }
        if let Some(native_out) = overrides.native_out {
            self.native_out = native_out;
        }
        if let Some(typings_out) = overrides.typings_out {
            self.typings_out = typings_out;
        }
        if let Some(namespace) = overrides.script_namespace {
            self.script_namespace = namespace;
        }
        if let Some(policy) = overrides.ham_mismatch {
            self.ham_mismatch = policy;
        }
        self
    }

    /// Anchor every relative path at `root`
    pub fn resolve(mut self, root: &Path) -> Self {
        let anchor = |path: PathBuf| if path.is_absolute() { path } else { root.join(path) };
        self.header = anchor(self.header);
        self.ham_enum = anchor(self.ham_enum);
        self.ham_table = anchor(self.ham_table);
        self.structures_dir = self.structures_dir.map(anchor);
        self.native_out = anchor(self.native_out);
        self.typings_out = anchor(self.typings_out);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.script_namespace.trim().is_empty() {
            return Err(Error::Config("script_namespace must not be empty".to_string()));
        }
        if self.script_namespace.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "script_namespace `{}` is not an identifier",
                self.script_namespace
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = GeneratorConfig::from_json(r#"{ "script_namespace": "mm", "ham_mismatch": "error" }"#).unwrap();
        assert_eq!(config.script_namespace, "mm");
        assert_eq!(config.ham_mismatch, MismatchPolicy::Error);
        assert_eq!(config.api_exclude, vec!["CRC32".to_string()]);
        assert_eq!(config.frame_tick_function, "pfnStartFrame");
        assert_eq!(config.native_out, PathBuf::from("src/auto"));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = GeneratorConfig::from_json("{ \"ham_mismatch\": \"sometimes\" }").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_reads_file_and_names_it_on_error() {
        let dir = std::env::temp_dir().join(format!("nodegen-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let good = dir.join("nodegen.json");
        fs::write(&good, r#"{ "script_namespace": "mm" }"#).unwrap();
        let config = GeneratorConfig::load_or_default(Some(&good)).unwrap();
        assert_eq!(config.script_namespace, "mm");
        assert_eq!(config.typings_out, PathBuf::from("packages/core"));

        let bad = dir.join("broken.json");
        fs::write(&bad, "{ \"ham_mismatch\": 3 }").unwrap();
        match GeneratorConfig::load(&bad).unwrap_err() {
            Error::Config(msg) => assert!(msg.starts_with(&bad.display().to_string()), "{}", msg),
            other => panic!("unexpected error {:?}", other),
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_flags_override_file() {
        let file = GeneratorConfig::from_json(r#"{ "typings_out": "types", "script_namespace": "mm" }"#).unwrap();
        let merged = file.merge(ConfigOverrides {
            typings_out: Some(PathBuf::from("out/types")),
            header: Some(PathBuf::from("sdk/eiface.h")),
            ..ConfigOverrides::default()
        });
        assert_eq!(merged.typings_out, PathBuf::from("out/types"));
        assert_eq!(merged.header, PathBuf::from("sdk/eiface.h"));
        assert_eq!(merged.script_namespace, "mm");
        assert_eq!(merged.structures_dir, Some(PathBuf::from("src/structures")));
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let root = std::env::temp_dir().join("nodemod");
        let absolute = std::env::temp_dir().join("sdk").join("eiface.h");
        let config = GeneratorConfig {
            header: absolute.clone(),
            structures_dir: None,
            ..GeneratorConfig::default()
        }
        .resolve(&root);

        assert_eq!(config.header, absolute);
        assert_eq!(config.ham_enum, root.join("src/ham/ham_const.h"));
        assert_eq!(config.native_out, root.join("src/auto"));
        assert_eq!(config.structures_dir, None);
    }

    #[test]
    fn test_namespace_must_be_identifier() {
        let config = GeneratorConfig {
            script_namespace: "node mod".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(GeneratorConfig::default().validate().is_ok());
    }
}
