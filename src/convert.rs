//! The parse → normalize → emit pipeline.

use std::path::PathBuf;

use crate::error::{EwpError, EwpResult};
use crate::ewp::Ewp;
use crate::premake::SCRIPT_NAME;

/// Settings for [`convert`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// File name of the script written next to the project.
    pub script_name: String,
    /// Fail when an option could not be found instead of treating it as
    /// empty.
    pub strict: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            script_name: SCRIPT_NAME.to_string(),
            strict: false,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = name.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub script: PathBuf,
    pub configurations: usize,
    pub files: usize,
    /// Options that resolved to an empty value.
    pub unresolved: usize,
    /// Argument variables left unexpanded in the script.
    pub unexpanded_argvars: Vec<String>,
}

/// Normalize `ewp` in place and write its premake script.
///
/// Running the generator on the result is up to the caller.
pub fn convert(ewp: &mut Ewp, options: &ConvertOptions) -> EwpResult<Conversion> {
    let unresolved = ewp.unresolved_options();
    if options.strict && !unresolved.is_empty() {
        let names: Vec<String> = unresolved.iter().map(|u| u.to_string()).collect();
        return Err(EwpError::UnresolvedOptions {
            count: names.len(),
            names: names.join(", "),
        });
    }

    ewp.normalize_paths();

    let unexpanded_argvars: Vec<String> = ewp.referenced_argvars().into_iter().collect();
    for name in &unexpanded_argvars {
        log::warn!("argument variable ${name}$ is not defined; it is kept as is");
    }

    let script = ewp.write_premake(&options.script_name)?;

    Ok(Conversion {
        script,
        configurations: ewp.configurations.len(),
        files: ewp.file_count(),
        unresolved: ewp.unresolved_options().len(),
        unexpanded_argvars,
    })
}
