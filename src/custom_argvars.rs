//! Parse IAR `.custom_argvars` files into a variable map.
//!
//! Embedded Workbench stores user-defined argument variables in a small XML
//! file next to the workspace:
//!
//! ```xml
//! <iarUserArgVars>
//!   <group active="true" name="Board">
//!     <variable>
//!       <name>SDK_ROOT</name>
//!       <value>C:\sdk</value>
//!     </variable>
//!   </group>
//! </iarUserArgVars>
//! ```
//!
//! These variables appear as `$SDK_ROOT$` references inside `.ewp` files and
//! need to be expanded before the paths mean anything outside the IDE.

use std::collections::HashMap;

use crate::argvars::expand_argvars;
use crate::error::{EwpError, EwpResult};

/// Parse the **contents** of a `.custom_argvars` file into a variable map.
///
/// Only groups whose `active` attribute is `true` (or missing) contribute.
/// `$NAME$` references inside values are expanded using the variables
/// accumulated so far (document order). Later definitions win.
///
/// # Example
/// ```
/// let content = r#"<iarUserArgVars>
///   <group active="true" name="g">
///     <variable><name>SDK</name><value>C:\sdk</value></variable>
///     <variable><name>HAL</name><value>$SDK$\hal</value></variable>
///   </group>
/// </iarUserArgVars>"#;
/// let vars = ewp_premake::custom_argvars::parse_custom_argvars(content).unwrap();
/// assert_eq!(vars["HAL"], r"C:\sdk\hal");
/// ```
pub fn parse_custom_argvars(content: &str) -> EwpResult<HashMap<String, String>> {
    let doc = roxmltree::Document::parse(content)?;
    let mut vars = HashMap::new();

    let groups = doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "group");

    for group in groups {
        let active = group
            .attribute("active")
            .map(|a| a.eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        if !active {
            log::debug!(
                "skipping inactive argvar group '{}'",
                group.attribute("name").unwrap_or("")
            );
            continue;
        }

        for variable in group
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "variable")
        {
            let Some(name) = child_text(&variable, "name") else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let raw_value = child_text(&variable, "value").unwrap_or("");
            let value = expand_argvars(raw_value, &vars);
            vars.insert(name.to_string(), value);
        }
    }

    Ok(vars)
}

/// Parse a `.custom_argvars` file from disk into a variable map.
pub fn parse_custom_argvars_file(
    path: impl AsRef<std::path::Path>,
) -> EwpResult<HashMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| EwpError::io(path, e))?;
    parse_custom_argvars(&content)
}

fn child_text<'a>(parent: &roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
        .and_then(|c| c.text())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_variables() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<iarUserArgVars>
  <group active="true" name="Paths">
    <variable>
      <name>SDK_ROOT</name>
      <value>C:\sdk</value>
    </variable>
    <variable>
      <name>BOARD</name>
      <value>nucleo</value>
    </variable>
  </group>
</iarUserArgVars>"#;
        let vars = parse_custom_argvars(content).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["SDK_ROOT"], "C:\\sdk");
        assert_eq!(vars["BOARD"], "nucleo");
    }

    #[test]
    fn inactive_groups_are_skipped() {
        let content = r#"<iarUserArgVars>
  <group active="false" name="Old">
    <variable><name>SDK_ROOT</name><value>D:\old</value></variable>
  </group>
  <group name="Current">
    <variable><name>BOARD</name><value>disco</value></variable>
  </group>
</iarUserArgVars>"#;
        let vars = parse_custom_argvars(content).unwrap();
        assert!(!vars.contains_key("SDK_ROOT"));
        assert_eq!(vars["BOARD"], "disco");
    }

    #[test]
    fn values_expand_earlier_variables() {
        let content = r#"<iarUserArgVars>
  <group active="true" name="g">
    <variable><name>SDK</name><value>C:\sdk</value></variable>
    <variable><name>HAL</name><value>$SDK$\hal\$UNKNOWN$</value></variable>
  </group>
</iarUserArgVars>"#;
        let vars = parse_custom_argvars(content).unwrap();
        assert_eq!(vars["HAL"], "C:\\sdk\\hal\\$UNKNOWN$");
    }

    #[test]
    fn later_definitions_override() {
        let content = r#"<iarUserArgVars>
  <group name="a"><variable><name>X</name><value>1</value></variable></group>
  <group name="b"><variable><name>X</name><value>2</value></variable></group>
</iarUserArgVars>"#;
        let vars = parse_custom_argvars(content).unwrap();
        assert_eq!(vars["X"], "2");
    }

    #[test]
    fn empty_value_and_nameless_variable() {
        let content = r#"<iarUserArgVars>
  <group name="g">
    <variable><name>EMPTY</name><value></value></variable>
    <variable><value>orphan</value></variable>
  </group>
</iarUserArgVars>"#;
        let vars = parse_custom_argvars(content).unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["EMPTY"], "");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_custom_argvars("<iarUserArgVars>").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = parse_custom_argvars_file("does-not-exist.custom_argvars").unwrap_err();
        assert!(err.to_string().contains("does-not-exist.custom_argvars"));
    }
}
