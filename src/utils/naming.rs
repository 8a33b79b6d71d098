//! Identifier casing helpers shared by every emitter

/// Lowercase the first character, remove underscores, and uppercase the
/// character following each removed underscore.
///
/// `engCvar_RegisterVariable` becomes `engCvarRegisterVariable`,
/// `CVarSetFloat` becomes `cVarSetFloat`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if i == 0 {
            out.extend(c.to_lowercase());
        } else if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_camelize_strips_underscores() {
        assert_eq!(camelize("engCvar_RegisterVariable"), "engCvarRegisterVariable");
        assert_eq!(camelize("Info_RemoveKey"), "infoRemoveKey");
        assert_eq!(camelize("CVarSetFloat"), "cVarSetFloat");
    }
}
