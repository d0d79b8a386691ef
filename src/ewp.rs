use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::argvars;
use crate::error::{EwpError, EwpResult};
use crate::path::normalize_path;

// ═══════════════════════════════════════════════════════════════════════════════
//  Vendor vocabulary
// ═══════════════════════════════════════════════════════════════════════════════

/// `<settings>` block holding the general target options.
pub const GENERAL_SETTINGS: &str = "General";
/// `<settings>` block holding the C/C++ compiler options.
pub const COMPILER_SETTINGS: &str = "ICCARM";

/// Vendor runtime library (CMSIS) flag in the general settings.
pub const OPT_RUNTIME_LIBRARY: &str = "OGUseCmsis";
pub const OPT_DEFINES: &str = "CCDefines";
pub const OPT_PRE_INCLUDES: &str = "PreInclude";
pub const OPT_INCLUDE_PATHS: &str = "CCIncludePath2";

/// Appended to every configuration so that other compilers parse IAR sources:
/// toolchain marker, compiler identity, and erasure of vendor keywords.
pub const IDENTITY_DEFINES: [&str; 4] = ["_IAR_", "__ICCARM__", "_Pragma(x)=", "__interrupt="];

// ═══════════════════════════════════════════════════════════════════════════════
//  Type definitions
// ═══════════════════════════════════════════════════════════════════════════════

// ─── ConfigName ──────────────────────────────────────────────────────────────

/// Name of a build configuration (e.g. `Debug`).
///
/// The same type is used for [`BuildConfiguration::name`] and for every
/// exclusion set, so exclusion checks are a typed equality test.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigName(String);

impl ConfigName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConfigName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Configurations under which a group or file is left out of the build.
pub type ExclusionSet = BTreeSet<ConfigName>;

// ─── ProjectFile ─────────────────────────────────────────────────────────────

/// A `<file>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFile {
    pub name: String,
    pub excluded_in: ExclusionSet,
}

impl ProjectFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            excluded_in: ExclusionSet::new(),
        }
    }

    /// Whether the file's own exclusion list names `config`.
    ///
    /// Exclusion inherited from enclosing groups is not reflected here.
    pub fn is_excluded(&self, config: &ConfigName) -> bool {
        self.excluded_in.contains(config)
    }
}

// ─── ProjectGroup ────────────────────────────────────────────────────────────

/// A `<group>` node: an IDE folder, unrelated to the on-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectGroup {
    pub name: String,
    /// Ancestor names and this group's name joined by `/`.
    pub full_path: String,
    /// Document order; determines emission order.
    pub files: Vec<ProjectFile>,
    pub subgroups: Vec<ProjectGroup>,
    /// Excluding a group excludes everything below it.
    pub excluded_in: ExclusionSet,
}

impl ProjectGroup {
    /// Create a top-level group.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_path: name.clone(),
            name,
            ..Default::default()
        }
    }

    /// Create a group nested under `parent`, deriving its full path.
    pub fn child_of(parent: &ProjectGroup, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_path: format!("{}/{}", parent.full_path, name),
            name,
            ..Default::default()
        }
    }

    pub fn is_excluded(&self, config: &ConfigName) -> bool {
        self.excluded_in.contains(config)
    }

    /// Direct files that are built under `config`.
    ///
    /// Does not look at this group's own exclusion; callers prune excluded
    /// groups before asking.
    pub fn included_files<'a, 'c>(
        &'a self,
        config: &'c ConfigName,
    ) -> impl Iterator<Item = &'a ProjectFile> + use<'a, 'c> {
        self.files.iter().filter(move |f| !f.is_excluded(config))
    }

    /// Number of files in this group and all subgroups, ignoring exclusions.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.subgroups.iter().map(Self::file_count).sum::<usize>()
    }

    fn for_each_file_mut(&mut self, f: &mut impl FnMut(&mut ProjectFile)) {
        for file in &mut self.files {
            f(file);
        }
        for group in &mut self.subgroups {
            group.for_each_file_mut(f);
        }
    }

    fn for_each_file(&self, f: &mut impl FnMut(&ProjectFile)) {
        for file in &self.files {
            f(file);
        }
        for group in &self.subgroups {
            group.for_each_file(f);
        }
    }
}

// ─── BuildConfiguration ──────────────────────────────────────────────────────

/// One `<configuration>` of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub name: ConfigName,
    /// Declared defines followed by [`IDENTITY_DEFINES`].
    pub defines: Vec<String>,
    pub pre_includes: Vec<String>,
    pub include_paths: Vec<String>,
    /// `OGUseCmsis`. Parsed but not used by the emitter.
    pub uses_vendor_runtime_library: bool,
}

impl BuildConfiguration {
    /// A configuration with no declared settings; `defines` already holds
    /// the identity defines.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: ConfigName::new(name),
            defines: IDENTITY_DEFINES.iter().map(|d| d.to_string()).collect(),
            pre_includes: Vec::new(),
            include_paths: Vec::new(),
            uses_vendor_runtime_library: false,
        }
    }
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

/// An option that was never found while scanning a configuration.
///
/// Such options resolve to an empty list (or `false`); they are collected
/// here so callers can decide whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedOption {
    pub configuration: ConfigName,
    pub option: &'static str,
}

impl fmt::Display for UnresolvedOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.configuration, self.option)
    }
}

/// Result of the configuration pass.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationScan {
    pub configurations: Vec<BuildConfiguration>,
    pub unresolved: Vec<UnresolvedOption>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Ewp – top-level handle
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed `.ewp` project: its configurations and its group tree.
#[derive(Debug, Clone)]
pub struct Ewp {
    /// Path of the `.ewp` file. `None` when created via [`Ewp::parse`].
    path: Option<PathBuf>,
    /// User argument variables expanded by [`Ewp::normalize_paths`].
    argvars: HashMap<String, String>,
    pub configurations: Vec<BuildConfiguration>,
    pub groups: Vec<ProjectGroup>,
    unresolved: Vec<UnresolvedOption>,
}

impl Ewp {
    /// Parse a project from its XML source.
    ///
    /// Configurations and groups are read by two independent passes over
    /// the same source.
    pub fn parse(source: impl Into<String>) -> EwpResult<Self> {
        let source = source.into();
        let scan = extract_configurations(&source)?;
        let groups = parse_groups(&source)?;
        Ok(Self {
            path: None,
            argvars: HashMap::new(),
            configurations: scan.configurations,
            groups,
            unresolved: scan.unresolved,
        })
    }

    /// Load a project from disk.
    pub fn from_file(path: impl AsRef<Path>) -> EwpResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| EwpError::io(path, e))?;
        let mut ewp = Self::parse(source)?;
        ewp.path = Some(path.to_path_buf());
        Ok(ewp)
    }

    /// Path of the `.ewp` file (set by [`from_file`](Self::from_file)).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory containing the `.ewp` file.
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// File stem of the `.ewp` file, used for the workspace and project
    /// names. Falls back to `"project"` for in-memory sources.
    pub fn project_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .map(String::from)
            .unwrap_or_else(|| "project".to_string())
    }

    /// Configuration names in document order.
    pub fn configuration_names(&self) -> Vec<&ConfigName> {
        self.configurations.iter().map(|c| &c.name).collect()
    }

    pub fn configuration(&self, name: &str) -> Option<&BuildConfiguration> {
        self.configurations.iter().find(|c| c.name.as_str() == name)
    }

    /// Total number of files in the group tree, ignoring exclusions.
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(ProjectGroup::file_count).sum()
    }

    /// Options that resolved to an empty value because they were not found.
    pub fn unresolved_options(&self) -> &[UnresolvedOption] {
        &self.unresolved
    }

    /// User argument variables that [`normalize_paths`](Self::normalize_paths)
    /// expands.
    pub fn argvars(&self) -> &HashMap<String, String> {
        &self.argvars
    }

    /// Rewrite every file name, include path and pre-include: expand user
    /// argument variables, then apply [`normalize_path`].
    pub fn normalize_paths(&mut self) {
        let vars = &self.argvars;
        let rewrite = |s: &str| normalize_path(&argvars::expand_argvars(s, vars));

        for group in &mut self.groups {
            group.for_each_file_mut(&mut |file: &mut ProjectFile| file.name = rewrite(&file.name));
        }
        for config in &mut self.configurations {
            for path in config
                .include_paths
                .iter_mut()
                .chain(config.pre_includes.iter_mut())
            {
                *path = rewrite(path.as_str());
            }
        }
    }

    /// Argument variables still referenced by paths, sorted and deduplicated.
    ///
    /// After [`normalize_paths`](Self::normalize_paths) these are the
    /// references no user variable resolved.
    pub fn referenced_argvars(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for group in &self.groups {
            group.for_each_file(&mut |file: &ProjectFile| names.extend(argvars::referenced_argvars(&file.name)));
        }
        for config in &self.configurations {
            for path in config.include_paths.iter().chain(&config.pre_includes) {
                names.extend(argvars::referenced_argvars(path));
            }
        }
        names
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  EwpBuilder – construction with user argument variables
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing an [`Ewp`] with user argument variables.
///
/// The variables are expanded by [`Ewp::normalize_paths`], so references like
/// `$SDK_ROOT$\drivers` become real paths in the generated script.
///
/// # Example
/// ```no_run
/// use ewp_premake::EwpBuilder;
///
/// let ewp = EwpBuilder::new()
///     .custom_argvars_file("Workspace.custom_argvars")
///     .unwrap()
///     .argvar("BOARD", "nucleo_f401")
///     .from_file("Firmware.ewp")
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct EwpBuilder {
    argvars: HashMap<String, String>,
}

impl EwpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a variable map. Later calls override earlier values.
    pub fn argvars(mut self, vars: HashMap<String, String>) -> Self {
        self.argvars.extend(vars);
        self
    }

    /// Set a single argument variable.
    pub fn argvar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.argvars.insert(name.into(), value.into());
        self
    }

    /// Merge the variables of a `.custom_argvars` document.
    pub fn custom_argvars(self, content: &str) -> EwpResult<Self> {
        let vars = crate::custom_argvars::parse_custom_argvars(content)?;
        Ok(self.argvars(vars))
    }

    /// Merge the variables of a `.custom_argvars` file on disk.
    pub fn custom_argvars_file(self, path: impl AsRef<Path>) -> EwpResult<Self> {
        let vars = crate::custom_argvars::parse_custom_argvars_file(path)?;
        Ok(self.argvars(vars))
    }

    pub fn parse(self, source: impl Into<String>) -> EwpResult<Ewp> {
        let mut ewp = Ewp::parse(source)?;
        ewp.argvars = self.argvars;
        Ok(ewp)
    }

    pub fn from_file(self, path: impl AsRef<Path>) -> EwpResult<Ewp> {
        let mut ewp = Ewp::from_file(path)?;
        ewp.argvars = self.argvars;
        Ok(ewp)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration pass
// ═══════════════════════════════════════════════════════════════════════════════

/// Read every `<configuration>` declared under the document root.
pub fn extract_configurations(source: &str) -> EwpResult<ConfigurationScan> {
    let doc = roxmltree::Document::parse(source)?;
    let mut scan = ConfigurationScan::default();

    for node in element_children(doc.root_element(), "configuration") {
        let index = scan.configurations.len() + 1;
        let name = child_text(&node, "name")
            .ok_or_else(|| EwpError::missing("name", format!("configuration #{index}")))?;
        let config = parse_configuration(&node, ConfigName::new(name), &mut scan.unresolved)?;
        log::debug!(
            "configuration '{}': {} define(s), {} include path(s), {} pre-include(s)",
            config.name,
            config.defines.len(),
            config.include_paths.len(),
            config.pre_includes.len()
        );
        scan.configurations.push(config);
    }

    if scan.configurations.is_empty() {
        return Err(EwpError::NoConfigurations);
    }
    for missing in &scan.unresolved {
        log::warn!("option {} not found in configuration '{}'", missing.option, missing.configuration);
    }
    Ok(scan)
}

fn parse_configuration(
    node: &roxmltree::Node,
    name: ConfigName,
    unresolved: &mut Vec<UnresolvedOption>,
) -> EwpResult<BuildConfiguration> {
    let settings: Vec<roxmltree::Node> = element_children(*node, "settings").collect();

    let general_index = settings
        .iter()
        .position(|s| child_text(s, "name") == Some(GENERAL_SETTINGS))
        .or(if settings.is_empty() { None } else { Some(0) });
    let compiler = settings
        .iter()
        .find(|s| child_text(s, "name") == Some(COMPILER_SETTINGS))
        .or_else(|| general_index.and_then(|i| settings.get(i + 1)));

    let mut missing = |option: &'static str| {
        unresolved.push(UnresolvedOption {
            configuration: name.clone(),
            option,
        })
    };

    // ── General settings ─────────────────────────────────────────────────
    let runtime_flag = general_index
        .and_then(|i| option_values(&settings[i], OPT_RUNTIME_LIBRARY))
        .map(|values| values.into_iter().next());
    let uses_vendor_runtime_library = match runtime_flag {
        Some(Some(state)) => {
            let value: i64 = state.trim().parse().map_err(|_| EwpError::InvalidOption {
                configuration: name.to_string(),
                option: OPT_RUNTIME_LIBRARY,
                value: state.clone(),
            })?;
            value > 0
        }
        Some(None) => false,
        None => {
            missing(OPT_RUNTIME_LIBRARY);
            false
        }
    };

    // ── Compiler settings ────────────────────────────────────────────────
    let mut multi_valued = |option: &'static str| match compiler.and_then(|c| option_values(c, option)) {
        Some(values) => values,
        None => {
            missing(option);
            Vec::new()
        }
    };
    let mut defines = multi_valued(OPT_DEFINES);
    let pre_includes = multi_valued(OPT_PRE_INCLUDES);
    let include_paths = multi_valued(OPT_INCLUDE_PATHS);

    defines.extend(IDENTITY_DEFINES.iter().map(|d| d.to_string()));

    Ok(BuildConfiguration {
        name,
        defines,
        pre_includes,
        include_paths,
        uses_vendor_runtime_library,
    })
}

/// Values of the option titled `title` inside `region`.
///
/// The title marker is a `<name>` element whose text equals `title`; the
/// values are every non-blank text below the marker's following siblings
/// (the `<state>` elements of an `<option>`); the marker's own text is not a
/// value. `None` when no marker exists.
fn option_values(region: &roxmltree::Node, title: &str) -> Option<Vec<String>> {
    let marker = region
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "name" && n.text() == Some(title))?;

    Some(
        marker
            .next_siblings()
            .skip(1)
            .filter(|n| n.is_element())
            .flat_map(|n| leaf_texts(&n))
            .collect(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Group pass
// ═══════════════════════════════════════════════════════════════════════════════

/// Read the top-level `<group>` elements (those without a `<group>`
/// ancestor) into group trees, in document order.
pub fn parse_groups(source: &str) -> EwpResult<Vec<ProjectGroup>> {
    let doc = roxmltree::Document::parse(source)?;

    let roots = doc
        .root_element()
        .descendants()
        .filter(|n| is_element(n, "group"))
        .filter(|n| !n.ancestors().skip(1).any(|a| is_element(&a, "group")));

    let mut groups = Vec::new();
    for node in roots {
        groups.push(parse_group(&node, None)?);
    }

    if groups.is_empty() {
        log::warn!("project contains no <group> elements");
    }
    Ok(groups)
}

fn parse_group(node: &roxmltree::Node, parent: Option<&ProjectGroup>) -> EwpResult<ProjectGroup> {
    let name = child_text(node, "name").ok_or_else(|| {
        let context = match parent {
            Some(p) => format!("group under '{}'", p.full_path),
            None => "top-level group".to_string(),
        };
        EwpError::missing("name", context)
    })?;

    let mut group = match parent {
        Some(p) => ProjectGroup::child_of(p, name),
        None => ProjectGroup::new(name),
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "group" => {
                let subgroup = parse_group(&child, Some(&group))?;
                group.subgroups.push(subgroup);
            }
            "file" => {
                let file = parse_file(&child, &group)?;
                group.files.push(file);
            }
            "excluded" => {
                group
                    .excluded_in
                    .extend(leaf_texts(&child).into_iter().map(ConfigName::new));
            }
            _ => {}
        }
    }

    log::debug!(
        "group '{}': {} file(s), {} subgroup(s), excluded in {:?}",
        group.full_path,
        group.files.len(),
        group.subgroups.len(),
        group.excluded_in
    );
    Ok(group)
}

fn parse_file(node: &roxmltree::Node, group: &ProjectGroup) -> EwpResult<ProjectFile> {
    // Only the file's own <name>, never a deeper one.
    let name = child_text(node, "name")
        .ok_or_else(|| EwpError::missing("name", format!("file in group '{}'", group.full_path)))?;

    let mut file = ProjectFile::new(name);
    for excluded in element_children(*node, "excluded") {
        file.excluded_in
            .extend(leaf_texts(&excluded).into_iter().map(ConfigName::new));
    }
    Ok(file)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn is_element(node: &roxmltree::Node, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn element_children<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    parent.children().filter(move |n| is_element(n, tag))
}

/// Text content of the first child element with the given tag name.
/// Blank text counts as absent.
fn child_text<'a>(parent: &roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    parent
        .children()
        .find(|c| is_element(c, tag))
        .and_then(|c| c.text())
        .filter(|t| !t.trim().is_empty())
}

/// Every non-blank text node below `node`, in document order.
fn leaf_texts(node: &roxmltree::Node) -> Vec<String> {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .filter(|t| !t.trim().is_empty())
        .map(String::from)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
