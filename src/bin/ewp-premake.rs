use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ewp_premake::generator::{self, DEFAULT_GENERATOR};
use ewp_premake::premake::SCRIPT_NAME;
use ewp_premake::{ConvertOptions, EwpBuilder, EwpError, Generator};

/// Convert an IAR Embedded Workbench project into a premake5 script and run
/// premake on it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// IAR project file (.ewp)
    input: PathBuf,

    /// premake action, e.g. vs2019, vs2017, gmake, xcode
    #[arg(short, long, env = "EWP_PREMAKE_TARGET", default_value = generator::KNOWN_TARGETS[0])]
    target: String,

    /// premake executable
    #[arg(long, env = "EWP_PREMAKE_GENERATOR", default_value = DEFAULT_GENERATOR)]
    generator: PathBuf,

    /// File name of the generated script (written next to the project)
    #[arg(long, default_value = SCRIPT_NAME)]
    script_name: String,

    /// Only write the script; do not run premake
    #[arg(long)]
    no_generate: bool,

    /// Fail if a configuration option cannot be found
    #[arg(long)]
    strict: bool,

    /// Define an argument variable, NAME=VALUE (repeatable)
    #[arg(short = 'D', long = "argvar", value_name = "NAME=VALUE", value_parser = parse_argvar)]
    argvars: Vec<(String, String)>,

    /// Load argument variables from a .custom_argvars file
    #[arg(long, value_name = "FILE")]
    custom_argvars: Option<PathBuf>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_argvar(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim().trim_matches('$');
    if name.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // 1. ── Parse ──────────────────────────────────────────────────────
    let mut builder = EwpBuilder::new();
    if let Some(path) = &cli.custom_argvars {
        builder = builder
            .custom_argvars_file(path)
            .with_context(|| format!("Reading {}", path.display()))?;
    }
    for (name, value) in &cli.argvars {
        builder = builder.argvar(name, value);
    }
    let mut ewp = builder
        .from_file(&cli.input)
        .with_context(|| format!("Parsing {}", cli.input.display()))?;

    // 2. ── Convert ────────────────────────────────────────────────────
    let options = ConvertOptions::new()
        .script_name(&cli.script_name)
        .strict(cli.strict);
    let conversion = ewp_premake::convert(&mut ewp, &options)
        .with_context(|| format!("Converting {}", cli.input.display()))?;
    println!(
        "Wrote {} ({} configuration(s), {} file(s))",
        conversion.script.display(),
        conversion.configurations,
        conversion.files
    );
    if conversion.unresolved > 0 {
        println!("{} option(s) not found, treated as empty", conversion.unresolved);
    }

    if cli.no_generate {
        return Ok(());
    }

    // 3. ── Generate ───────────────────────────────────────────────────
    let runner = Generator::new(&cli.target).with_program(&cli.generator);
    match runner.run(&conversion.script) {
        Ok(output) => {
            print!("{}", output.output());
            if let Some(sln) = generator::solution_path(&cli.input, runner.target()) {
                println!("Solution: {}", sln.display());
            }
            Ok(())
        }
        Err(EwpError::GeneratorFailed { output, .. }) if !output.is_empty() => {
            eprint!("{output}");
            anyhow::bail!("premake failed for target '{}'", runner.target())
        }
        Err(e) => Err(e).with_context(|| format!("Running {}", runner.program().display())),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argvar_pairs() {
        assert_eq!(
            parse_argvar("SDK_ROOT=C:\\sdk").unwrap(),
            ("SDK_ROOT".to_string(), "C:\\sdk".to_string())
        );
        assert_eq!(
            parse_argvar("$BOARD$=a=b").unwrap(),
            ("BOARD".to_string(), "a=b".to_string())
        );
        assert!(parse_argvar("NOVALUE").is_err());
        assert!(parse_argvar("=x").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["ewp-premake", "fw.ewp"]).unwrap();
        assert_eq!(cli.script_name, SCRIPT_NAME);
        assert!(!cli.no_generate);
        assert!(cli.argvars.is_empty());
    }

    #[test]
    fn cli_collects_argvars() {
        let cli = Cli::try_parse_from([
            "ewp-premake", "fw.ewp", "-t", "gmake", "-D", "A=1", "--argvar", "B=2", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.target, "gmake");
        assert_eq!(cli.argvars.len(), 2);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
