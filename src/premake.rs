//! premake5 script emission.
//!
//! The group tree is walked once per configuration. Excluding a group prunes
//! its whole subtree; excluding a file drops only that file.

use std::path::Path;

use crate::error::{EwpError, EwpResult};
use crate::ewp::{BuildConfiguration, ConfigName, Ewp, ProjectGroup};

/// Default file name of the generated script.
pub const SCRIPT_NAME: &str = "ewp-premake.lua";

/// Include directory every configuration gets as a system include path.
pub const SYSTEM_INCLUDE_DIR: &str = "$(VC_IncludePath)";

pub const PROJECT_KIND: &str = "ConsoleApp";
pub const PROJECT_LANGUAGE: &str = "C";

/// Makes vc2010 projects emit `sysincludedirs` as one verbatim `IncludePath`
/// value instead of prefixing each entry.
pub const INCLUDE_PATH_OVERRIDE: &str = r#"premake.override(premake.vstudio.vc2010, "includePath", function(base,cfg)
   local dirs = premake.vstudio.path(cfg, cfg.sysincludedirs)
    if #dirs > 0 then
    premake.vstudio.vc2010.element("IncludePath", nil, "%s", table.concat(dirs, ";"))
    end
end)
"#;

// ═══════════════════════════════════════════════════════════════════════════════
//  Tree flattening
// ═══════════════════════════════════════════════════════════════════════════════

/// One `vpaths` mapping: a group's full path and its direct files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpathEntry<'a> {
    pub group: &'a str,
    pub files: Vec<&'a str>,
}

/// Every file built under `config`, depth first in document order.
pub fn source_files<'a>(groups: &'a [ProjectGroup], config: &ConfigName) -> Vec<&'a str> {
    let mut files = Vec::new();
    collect_files(groups, config, &mut files);
    files
}

fn collect_files<'a>(groups: &'a [ProjectGroup], config: &ConfigName, out: &mut Vec<&'a str>) {
    for group in groups.iter().filter(|g| !g.is_excluded(config)) {
        out.extend(group.included_files(config).map(|f| f.name.as_str()));
        collect_files(&group.subgroups, config, out);
    }
}

/// One entry per group visible under `config`, in the same order as
/// [`source_files`]. Subgroup files are never folded into the parent.
pub fn vpaths<'a>(groups: &'a [ProjectGroup], config: &ConfigName) -> Vec<VpathEntry<'a>> {
    let mut entries = Vec::new();
    collect_vpaths(groups, config, &mut entries);
    entries
}

fn collect_vpaths<'a>(
    groups: &'a [ProjectGroup],
    config: &ConfigName,
    out: &mut Vec<VpathEntry<'a>>,
) {
    for group in groups.iter().filter(|g| !g.is_excluded(config)) {
        out.push(VpathEntry {
            group: &group.full_path,
            files: group.included_files(config).map(|f| f.name.as_str()).collect(),
        });
        collect_vpaths(&group.subgroups, config, out);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Lua rendering
// ═══════════════════════════════════════════════════════════════════════════════

/// Quote `s` as a Lua string literal.
fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `{ "a", "b" }`, or `{}` when empty.
fn lua_list<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "{}".to_string();
    }
    let quoted: Vec<String> = items.iter().map(|s| lua_string(s.as_ref())).collect();
    format!("{{ {} }}", quoted.join(", "))
}

fn lua_vpaths(entries: &[VpathEntry]) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let mapped: Vec<String> = entries
        .iter()
        .map(|e| format!("[{}] = {}", lua_string(e.group), lua_list(&e.files)))
        .collect();
    format!("{{ {} }}", mapped.join(", "))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  PremakeScript
// ═══════════════════════════════════════════════════════════════════════════════

/// A rendered premake5 script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremakeScript {
    text: String,
}

impl PremakeScript {
    /// Render the workspace, the project and one filter block per
    /// configuration, followed by [`INCLUDE_PATH_OVERRIDE`].
    pub fn render(
        workspace: &str,
        configurations: &[BuildConfiguration],
        groups: &[ProjectGroup],
    ) -> Self {
        let names: Vec<&str> = configurations.iter().map(|c| c.name.as_str()).collect();

        let mut text = String::new();
        text.push_str(&format!("workspace {}\n", lua_string(workspace)));
        text.push_str(&format!("  configurations {}\n", lua_list(&names)));
        text.push_str(&format!("project {}\n", lua_string(workspace)));
        text.push_str(&format!("  kind {}\n", lua_string(PROJECT_KIND)));
        text.push_str(&format!("  language {}\n", lua_string(PROJECT_LANGUAGE)));

        for config in configurations {
            let files = source_files(groups, &config.name);
            let entries = vpaths(groups, &config.name);
            log::debug!(
                "configuration '{}': {} file(s) in {} vpath(s)",
                config.name,
                files.len(),
                entries.len()
            );

            let filter = format!("configurations:{}", config.name);
            text.push_str(&format!("filter {}\n", lua_string(&filter)));
            text.push_str(&format!("  sysincludedirs {}\n", lua_list(&[SYSTEM_INCLUDE_DIR])));
            text.push_str(&format!("  defines {}\n", lua_list(&config.defines)));
            text.push_str(&format!("  forceincludes {}\n", lua_list(&config.pre_includes)));
            text.push_str(&format!("  includedirs {}\n", lua_list(&config.include_paths)));
            text.push_str(&format!("  files {}\n", lua_list(&files)));
            text.push_str(&format!("  vpaths {}\n", lua_vpaths(&entries)));
        }

        text.push_str(INCLUDE_PATH_OVERRIDE);
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Write the script to `path`, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> EwpResult<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.text).map_err(|e| EwpError::io(path, e))?;
        log::info!("wrote {} ({} bytes)", path.display(), self.text.len());
        Ok(())
    }
}

impl std::fmt::Display for PremakeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl Ewp {
    /// Render this project as a premake5 script.
    ///
    /// Paths are emitted as they are; call
    /// [`normalize_paths`](Ewp::normalize_paths) first.
    pub fn to_premake(&self) -> PremakeScript {
        PremakeScript::render(&self.project_name(), &self.configurations, &self.groups)
    }

    /// Write the premake5 script named `script_name` next to the `.ewp`
    /// file (or into the current directory for in-memory projects) and
    /// return its path.
    pub fn write_premake(&self, script_name: &str) -> EwpResult<std::path::PathBuf> {
        let path = self
            .directory()
            .map(|d| d.join(script_name))
            .unwrap_or_else(|| script_name.into());
        self.to_premake().write_to(&path)?;
        Ok(path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
