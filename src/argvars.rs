//! IAR argument variable parser and expander.
//!
//! Paths inside `.ewp` files reference *argument variables* of the form
//! `$NAME$`, for example:
//!
//! - `$PROJ_DIR$\src\main.c`
//! - `$TOOLKIT_DIR$\CMSIS\Include`
//! - `$SDK_ROOT$/drivers/$BOARD$`
//!
//! Uses [`chumsky`] for the parsing grammar.
//!
//! ## Grammar
//!
//! ```text
//! path     = part*
//! part     = variable | literal | '$'
//! variable = '$' name '$'
//! name     = [A-Za-z0-9_]+
//! literal  = [^$]+
//! ```
//!
//! A `$` that does not open a well-formed variable is kept as literal text.

use chumsky::prelude::*;
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A fragment of a path that may contain `$NAME$` references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    /// Literal text (no variable expansion needed).
    Literal(String),
    /// A `$NAME$` reference.
    Variable(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

/// Join adjacent literals produced by stray `$` characters.
fn merge_literals(parts: Vec<PathPart>) -> Vec<PathPart> {
    let mut merged: Vec<PathPart> = Vec::with_capacity(parts.len());
    for part in parts {
        if let PathPart::Literal(next) = &part {
            if let Some(PathPart::Literal(prev)) = merged.last_mut() {
                prev.push_str(next);
                continue;
            }
        }
        merged.push(part);
    }
    merged
}

/// Build the chumsky parser for argument-variable strings.
fn argvar_parser<'a>() -> impl Parser<'a, &'a str, Vec<PathPart>, extra::Err<Simple<'a, char>>> {
    let name = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice();

    // ── $NAME$ ───────────────────────────────────────────────────────────
    let variable = name
        .delimited_by(just('$'), just('$'))
        .map(|s: &str| PathPart::Variable(s.to_string()));

    // ── Plain text up to the next '$' ────────────────────────────────────
    let literal = none_of('$')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| PathPart::Literal(s.to_string()));

    // ── A '$' that does not open a variable ──────────────────────────────
    let stray = just('$').to(PathPart::Literal("$".to_string()));

    choice((variable, literal, stray))
        .repeated()
        .collect::<Vec<_>>()
        .map(merge_literals)
}

/// Split a path string into literal and `$NAME$` fragments.
pub fn parse_argvars(input: &str) -> Result<Vec<PathPart>, String> {
    argvar_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            format!(
                "Failed to parse argument variables in '{}': {}",
                input,
                messages.join("; ")
            )
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Expansion
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand `$NAME$` references using the given variable map.
///
/// Unknown variables are kept verbatim so that later stages (and IAR itself)
/// still see the reference as written.
pub fn expand_argvars(input: &str, vars: &HashMap<String, String>) -> String {
    if vars.is_empty() || !input.contains('$') {
        return input.to_string();
    }
    let Ok(parts) = parse_argvars(input) else {
        return input.to_string();
    };

    parts
        .into_iter()
        .map(|part| match part {
            PathPart::Literal(s) => s,
            PathPart::Variable(name) => match vars.get(&name) {
                Some(value) => value.clone(),
                None => format!("${name}$"),
            },
        })
        .collect()
}

/// Names of all `$NAME$` references in `input`, in order of appearance.
pub fn referenced_argvars(input: &str) -> Vec<String> {
    if !input.contains('$') {
        return Vec::new();
    }
    parse_argvars(input)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| match part {
            PathPart::Variable(name) => Some(name),
            PathPart::Literal(_) => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn make_vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ── Parsing ──────────────────────────────────────────────────────────

    #[test]
    fn literal_only() {
        assert_eq!(
            parse_argvars("src\\main.c").unwrap(),
            vec![PathPart::Literal("src\\main.c".into())]
        );
    }

    #[test]
    fn variable_only() {
        assert_eq!(
            parse_argvars("$PROJ_DIR$").unwrap(),
            vec![PathPart::Variable("PROJ_DIR".into())]
        );
    }

    #[test]
    fn mixed_parts() {
        assert_eq!(
            parse_argvars("$TOOLKIT_DIR$\\CMSIS\\$BOARD$").unwrap(),
            vec![
                PathPart::Variable("TOOLKIT_DIR".into()),
                PathPart::Literal("\\CMSIS\\".into()),
                PathPart::Variable("BOARD".into()),
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_argvars("").unwrap(), Vec::<PathPart>::new());
    }

    #[test]
    fn stray_dollars_stay_literal() {
        assert_eq!(
            parse_argvars("a$b").unwrap(),
            vec![PathPart::Literal("a$b".into())]
        );
        assert_eq!(
            parse_argvars("$$").unwrap(),
            vec![PathPart::Literal("$$".into())]
        );
        assert_eq!(
            parse_argvars("$NOT CLOSED").unwrap(),
            vec![PathPart::Literal("$NOT CLOSED".into())]
        );
    }

    #[test]
    fn unclosed_after_variable() {
        assert_eq!(
            parse_argvars("$A$B$").unwrap(),
            vec![
                PathPart::Variable("A".into()),
                PathPart::Literal("B$".into()),
            ]
        );
    }

    // ── Expansion ────────────────────────────────────────────────────────

    #[test]
    fn expand_known_variable() {
        let vars = make_vars(&[("SDK_ROOT", "C:\\sdk")]);
        assert_eq!(
            expand_argvars("$SDK_ROOT$\\drivers", &vars),
            "C:\\sdk\\drivers"
        );
    }

    #[test]
    fn expand_keeps_unknown_variable() {
        let vars = make_vars(&[("SDK_ROOT", "C:\\sdk")]);
        assert_eq!(
            expand_argvars("$PROJ_DIR$\\$SDK_ROOT$", &vars),
            "$PROJ_DIR$\\C:\\sdk"
        );
    }

    #[test]
    fn expand_with_empty_map_is_identity() {
        let input = "$PROJ_DIR$\\inc";
        assert_eq!(expand_argvars(input, &HashMap::new()), input);
    }

    #[test]
    fn referenced_in_order() {
        assert_eq!(
            referenced_argvars("$TOOLKIT_DIR$/inc/$BOARD$/x$"),
            vec!["TOOLKIT_DIR".to_string(), "BOARD".to_string()]
        );
        assert!(referenced_argvars("plain/path").is_empty());
    }
}
