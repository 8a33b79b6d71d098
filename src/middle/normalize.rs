//! Argument Shape Normalizer
//!
//! Turns a parsed argument list into the shape every backend works from:
//! `data, dataLength` pairs are folded into one array argument, the
//! variadic tail is split off, and script-reserved names are rewritten.

use crate::frontend::ast::{Argument, Function};

/// Script names that cannot be used as parameter names; generated C keeps the header name
const RESERVED: [(&str, &str); 3] = [("var", "variable"), ("function", "callback"), ("class", "className")];

/// One argument after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedArg {
    pub arg: Argument,
    /// Name used on the script side
    pub script_name: String,
    /// Name of the folded length argument
    pub length: Option<String>,
}

impl NormalizedArg {
    fn new(arg: Argument) -> Self {
        Self {
            script_name: script_safe_name(&arg.name),
            arg,
            length: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.arg.name
    }

    pub fn ty(&self) -> &str {
        &self.arg.ty
    }
}

/// A function's normalized argument list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedArgs {
    pub args: Vec<NormalizedArg>,
    pub variadic: bool,
}

impl NormalizedArgs {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// True if `name` was absorbed as some array's length
    pub fn is_length_of_array(&self, name: &str) -> bool {
        self.args.iter().any(|a| a.length.as_deref() == Some(name))
    }
}

/// Rewrite a name the script side reserves
pub fn script_safe_name(name: &str) -> String {
    RESERVED
        .iter()
        .find(|(reserved, _)| *reserved == name)
        .map(|(_, replacement)| replacement.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Fold array+length pairs with a single lookahead and split off `...`
pub fn normalize(func: &Function) -> NormalizedArgs {
    let fixed: Vec<&Argument> = func.fixed_args().collect();
    let mut args = Vec::with_capacity(fixed.len());
    let mut i = 0;

    while i < fixed.len() {
        let current = fixed[i];
        let mut normalized = NormalizedArg::new(current.clone());

        if let Some(next) = fixed.get(i + 1) {
            let folds = current.is_pointer()
                && !current.is_char_pointer()
                && next.name.to_lowercase().contains("length");
            if folds {
                normalized.length = Some(next.name.clone());
                i += 1;
            }
        }

        args.push(normalized);
        i += 1;
    }

    NormalizedArgs {
        args,
        variadic: func.is_variadic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_declaration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_and_length_fold() {
        let func = parse_declaration("void (*pfnSend)( float *data, int dataLength );", 1);
        let normalized = normalize(&func);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.args[0].name(), "data");
        assert_eq!(normalized.args[0].length.as_deref(), Some("dataLength"));
        assert!(normalized.is_length_of_array("dataLength"));
    }

    #[test]
    fn test_char_pointers_do_not_fold() {
        let func = parse_declaration("void (*pfnCopy)( char *buf, int bufLength );", 1);
        assert_eq!(normalize(&func).len(), 2);
    }

    #[test]
    fn test_variadic_is_split_off() {
        let func = parse_declaration("void (*pfnAlertMessage)( ALERT_TYPE atype, const char *szFmt, ... );", 1);
        let normalized = normalize(&func);
        assert!(normalized.variadic);
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn test_reserved_names() {
        let func = parse_declaration("void (*pfnAddServerCommand)( const char *cmd_name, void (*function) (void) );", 1);
        let normalized = normalize(&func);
        assert_eq!(normalized.args[1].name(), "function");
        assert_eq!(normalized.args[1].script_name, "callback");
        assert_eq!(script_safe_name("var"), "variable");
        assert_eq!(script_safe_name("class"), "className");
        assert_eq!(script_safe_name("pEdict"), "pEdict");
    }
}
