//! Ham catalogue validation
//!
//! The enum and the signature array are maintained by hand in two files.
//! This pass cross-checks them after parsing: entry counts, ids with no
//! row, param-count literals and enum-name/key agreement.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::frontend::ast::HamCatalogue;
use crate::utils::{Error, Result};

/// Enum name prefixes of mod-specific hooks and the key prefix they map to
const MOD_PREFIXES: [(&str, &str); 8] = [
    ("CS_", "cstrike_"),
    ("DOD_", "dod_"),
    ("TFC_", "tfc_"),
    ("NS_", "ns_"),
    ("ESF_", "esf_"),
    ("SC_", "sc_"),
    ("TS_", "ts_"),
    ("OPF_", "gearbox_"),
];

/// What to do with validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    #[default]
    Warn,
    Error,
}

/// One inconsistency between the enum and the array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HamIssue {
    CountMismatch {
        enum_entries: usize,
        array_rows: usize,
    },
    MissingSignature {
        name: String,
        id: usize,
    },
    ParamCountMismatch {
        key: String,
        declared: usize,
        actual: usize,
        line: usize,
    },
    NameMismatch {
        name: String,
        id: usize,
        expected: String,
        found: String,
        line: usize,
    },
}

impl HamIssue {
    pub fn line(&self) -> Option<usize> {
        match self {
            HamIssue::ParamCountMismatch { line, .. } | HamIssue::NameMismatch { line, .. } => Some(*line),
            HamIssue::CountMismatch { .. } | HamIssue::MissingSignature { .. } => None,
        }
    }
}

impl fmt::Display for HamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HamIssue::CountMismatch { enum_entries, array_rows } => write!(
                f,
                "HamType has {} entries but g_hamFunctions has {} rows",
                enum_entries, array_rows
            ),
            HamIssue::MissingSignature { name, id } => {
                write!(f, "Ham_{} (id {}) has no g_hamFunctions row", name, id)
            }
            HamIssue::ParamCountMismatch { key, declared, actual, .. } => write!(
                f,
                "\"{}\" declares {} params but lists {}",
                key, declared, actual
            ),
            HamIssue::NameMismatch { name, id, expected, found, .. } => write!(
                f,
                "Ham_{} (id {}) expects key \"{}\", row has \"{}\"",
                name, id, expected, found
            ),
        }
    }
}

/// Key an enum name is expected to have in the array
pub fn expected_key(name: &str) -> String {
    for (prefix, replacement) in MOD_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            return format!("{}{}", replacement, rest).to_lowercase();
        }
    }
    name.to_lowercase()
}

/// Collect every inconsistency in the catalogue
pub fn validate_catalogue(catalogue: &HamCatalogue) -> Vec<HamIssue> {
    let mut issues = Vec::new();

    if catalogue.entries.len() != catalogue.signatures.len() {
        issues.push(HamIssue::CountMismatch {
            enum_entries: catalogue.entries.len(),
            array_rows: catalogue.signatures.len(),
        });
    }

    for entry in &catalogue.entries {
        let Some(signature) = &entry.signature else {
            issues.push(HamIssue::MissingSignature {
                name: entry.name.clone(),
                id: entry.id,
            });
            continue;
        };

        let expected = expected_key(&entry.name);
        if expected != signature.key {
            issues.push(HamIssue::NameMismatch {
                name: entry.name.clone(),
                id: entry.id,
                expected,
                found: signature.key.clone(),
                line: signature.line,
            });
        }
    }

    // Every row, including ones no enum entry reaches
    for signature in &catalogue.signatures {
        if signature.declared_param_count != signature.params.len() {
            issues.push(HamIssue::ParamCountMismatch {
                key: signature.key.clone(),
                declared: signature.declared_param_count,
                actual: signature.params.len(),
                line: signature.line,
            });
        }
    }

    issues
}

/// Log every issue; under [`MismatchPolicy::Error`] any issue is fatal
pub fn apply_policy(issues: &[HamIssue], policy: MismatchPolicy) -> Result<()> {
    for issue in issues {
        warn!("ham: {}", issue);
    }

    if policy == MismatchPolicy::Error && !issues.is_empty() {
        return Err(Error::CatalogueMismatch {
            message: format!("{} issue(s), first: {}", issues.len(), issues[0]),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ham::parse_catalogue;
    use pretty_assertions::assert_eq;

    const ENUM: &str = "enum HamType {\n  Ham_Spawn = 0,\n  Ham_TakeDamage,\n  Ham_CS_Item_CanDrop,\n  Ham_EndMarker\n};";

    #[test]
    fn test_expected_key_maps_mod_prefixes() {
        assert_eq!(expected_key("TakeDamage"), "takedamage");
        assert_eq!(expected_key("CS_Item_CanDrop"), "cstrike_item_candrop");
        assert_eq!(expected_key("OPF_Weapon_Fire"), "gearbox_weapon_fire");
    }

    #[test]
    fn test_consistent_catalogue_has_no_issues() {
        let array = r#"HamFunctionInfo g_hamFunctions[] = {
    {"spawn", HAM_RET_VOID, 0, {}},
    {"takedamage", HAM_RET_INT, 4, {HAM_PARAM_ENTVAR, HAM_PARAM_ENTVAR, HAM_PARAM_FLOAT, HAM_PARAM_INT}},
    {"cstrike_item_candrop", HAM_RET_INT, 0, {}},
};"#;
        let catalogue = parse_catalogue(ENUM, array).unwrap();
        assert_eq!(validate_catalogue(&catalogue), vec![]);
        assert!(apply_policy(&[], MismatchPolicy::Error).is_ok());
    }

    #[test]
    fn test_mismatches_are_reported() {
        let array = r#"HamFunctionInfo g_hamFunctions[] = {
    {"spawn", HAM_RET_VOID, 0, {}},
    {"precache", HAM_RET_INT, 3, {HAM_PARAM_ENTVAR}},
};"#;
        let catalogue = parse_catalogue(ENUM, array).unwrap();
        let issues = validate_catalogue(&catalogue);

        assert_eq!(issues.len(), 4);
        assert_eq!(
            issues[0],
            HamIssue::CountMismatch {
                enum_entries: 3,
                array_rows: 2
            }
        );
        assert!(matches!(&issues[1], HamIssue::NameMismatch { expected, found, .. }
            if expected == "takedamage" && found == "precache"));
        assert!(matches!(&issues[2], HamIssue::MissingSignature { id: 2, .. }));
        assert!(matches!(&issues[3], HamIssue::ParamCountMismatch { declared: 3, actual: 1, .. }));
    }

    #[test]
    fn test_error_policy_fails() {
        let issues = vec![HamIssue::MissingSignature {
            name: "Spawn".into(),
            id: 0,
        }];
        assert!(apply_policy(&issues, MismatchPolicy::Warn).is_ok());
        let err = apply_policy(&issues, MismatchPolicy::Error).unwrap_err();
        assert!(matches!(err, Error::CatalogueMismatch { .. }));
    }
}
