//! Invocation of the external premake executable.
//!
//! The generator is run synchronously as `<program> --file=<script file> <target>`
//! from the script's directory, with stdout and stderr captured.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{EwpError, EwpResult};

/// Executable used when none is configured.
pub const DEFAULT_GENERATOR: &str = "premake5";

/// Actions offered by default. Any other string is passed through as is.
pub const KNOWN_TARGETS: [&str; 10] = [
    "vs2019", "vs2017", "vs2015", "vs2013", "vs2012", "vs2010", "vs2008", "vs2005", "gmake",
    "xcode",
];

/// Whether `target` produces a Visual Studio solution.
pub fn is_visual_studio(target: &str) -> bool {
    target.starts_with("vs")
}

/// The `.sln` a Visual Studio target generates for `project`, if any.
pub fn solution_path(project: &Path, target: &str) -> Option<PathBuf> {
    is_visual_studio(target).then(|| project.with_extension("sln"))
}

/// Captured result of a generator run.
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GeneratorOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr.
    pub fn output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }
}

/// The premake executable and the action to run.
#[derive(Debug, Clone)]
pub struct Generator {
    program: PathBuf,
    target: String,
}

impl Generator {
    /// Use [`DEFAULT_GENERATOR`] to produce `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_GENERATOR),
            target: target.into(),
        }
    }

    /// Use a specific executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run the generator on `script` and wait for it.
    ///
    /// A non-zero exit is an error carrying the captured output.
    pub fn run(&self, script: &Path) -> EwpResult<GeneratorOutput> {
        log::info!(
            "running {} --file={} {}",
            self.program.display(),
            script.display(),
            self.target
        );

        // Run from the script's directory; `--file` is then relative to it.
        let dir = script.parent().filter(|d| !d.as_os_str().is_empty());
        let file = match (dir, script.file_name()) {
            (Some(_), Some(name)) => Path::new(name),
            _ => script,
        };

        let mut command = Command::new(&self.program);
        command
            .arg(format!("--file={}", file.display()))
            .arg(&self.target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| EwpError::GeneratorLaunch {
            program: self.program.clone(),
            source: e,
        })?;

        let result = GeneratorOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::debug!("generator exited with {}", result.exit_code);

        if !result.success() {
            return Err(EwpError::GeneratorFailed {
                program: self.program.clone(),
                exit_code: result.exit_code,
                output: result.output(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_studio_targets() {
        assert!(is_visual_studio("vs2019"));
        assert!(!is_visual_studio("gmake"));
        assert_eq!(
            solution_path(Path::new("fw/Firmware.ewp"), "vs2017"),
            Some(PathBuf::from("fw/Firmware.sln"))
        );
        assert_eq!(solution_path(Path::new("fw/Firmware.ewp"), "xcode"), None);
    }

    #[test]
    fn known_targets_start_with_newest_studio() {
        assert_eq!(KNOWN_TARGETS[0], "vs2019");
        assert!(KNOWN_TARGETS.contains(&"gmake"));
    }

    #[test]
    fn combined_output() {
        let out = GeneratorOutput {
            exit_code: 0,
            stdout: "Building configurations...".into(),
            stderr: "warning".into(),
        };
        assert_eq!(out.output(), "Building configurations...\nwarning");
        assert!(out.success());
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let generator = Generator::new("gmake").with_program("ewp-premake-no-such-generator");
        assert_eq!(generator.program(), Path::new("ewp-premake-no-such-generator"));
        let err = generator.run(Path::new("script.lua")).unwrap_err();
        assert!(matches!(err, EwpError::GeneratorLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let generator = Generator::new("gmake").with_program("true");
        let out = generator.run(Path::new("script.lua")).unwrap();
        assert_eq!(out.exit_code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn relative_script_in_subdirectory_is_found() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir_in(".").unwrap();
        let fw = root.path().join("fw");
        std::fs::create_dir(&fw).unwrap();
        let script = fw.join("ewp-premake.lua");
        std::fs::write(&script, "-- generated\n").unwrap();
        assert!(script.is_relative());

        let fake = root.path().join("fake-premake");
        std::fs::write(
            &fake,
            "#!/bin/sh\nfile=\"${1#--file=}\"\n[ -f \"$file\" ] && exit 0\necho \"missing $file in $(pwd)\"\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let generator = Generator::new("gmake").with_program(std::path::absolute(&fake).unwrap());
        let out = generator.run(&script).unwrap();
        assert!(out.success());
        assert_eq!(generator.target(), "gmake");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_failure() {
        let generator = Generator::new("gmake").with_program("false");
        match generator.run(Path::new("script.lua")) {
            Err(EwpError::GeneratorFailed { exit_code, .. }) => assert_ne!(exit_code, 0),
            other => panic!("expected GeneratorFailed, got {other:?}"),
        }
    }
}
