//! CLI argument parsing for ripple
//!
//! Defines the Command enum and parse_args() for the single analysis command.

use anyhow::Result;
use ripple::language::supported_languages_normalized;
use std::path::PathBuf;

const DEFAULT_OUTPUT_DIR: &str = ".ring/codereview";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub fn print_usage() {
    eprintln!("ripple - Call graph impact analysis for modified functions");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  ripple --ast <FILE> [--lang <LANG>] [--languages-file <FILE>] [--output <DIR>]");
    eprintln!("         [--timeout <SECS>] [--output-suffix <SUFFIX>] [-v]");
    eprintln!("  ripple --help");
    eprintln!("  ripple --version");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  --ast <FILE>             Semantic diff JSON from the AST phase (required)");
    eprintln!("  --lang <LANG>            Language override; detected from the AST file name if omitted");
    eprintln!("  --languages-file <FILE>  JSON file {{\"languages\": [...]}} listing languages to analyze");
    eprintln!("  --output <DIR>           Output directory (default: {DEFAULT_OUTPUT_DIR})");
    eprintln!("  --timeout <SECS>         Time budget in seconds, 0 = analyzer default (default: {DEFAULT_TIMEOUT_SECS})");
    eprintln!("  --output-suffix <S>      Suffix appended to the output directory");
    eprintln!("  -v, --verbose            Debug logging on stderr");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  ripple --ast .ring/codereview/go-ast.json");
    eprintln!("  ripple --ast ast-output.json --lang typescript");
    eprintln!("  ripple --ast go-ast.json --output ./output --timeout 60");
    eprintln!();
    eprintln!("Supported languages: {}", supported_languages_normalized().join(", "));
}

/// Options for one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeArgs {
    pub ast_file: PathBuf,
    pub language: Option<String>,
    pub languages_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub timeout_secs: u64,
    pub output_suffix: Option<String>,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Help,
    Version,
}

/// Parse `args` (without the program name)
pub fn parse_args_from<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();

    let mut ast_file: Option<PathBuf> = None;
    let mut language: Option<String> = None;
    let mut languages_file: Option<PathBuf> = None;
    let mut output_dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
    let mut timeout_secs = DEFAULT_TIMEOUT_SECS;
    let mut output_suffix: Option<String> = None;
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "--ast" | "--lang" | "--languages-file" | "--output" | "--timeout" | "--output-suffix" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(anyhow::anyhow!("{flag} requires an argument"));
                };
                match flag {
                    "--ast" => ast_file = Some(PathBuf::from(value)),
                    "--lang" => language = Some(value.clone()),
                    "--languages-file" => languages_file = Some(PathBuf::from(value)),
                    "--output" => output_dir = PathBuf::from(value),
                    "--timeout" => {
                        timeout_secs = value.parse().map_err(|_| {
                            anyhow::anyhow!("--timeout must be a non-negative integer, got {value}")
                        })?
                    }
                    _ => output_suffix = Some(value.clone()).filter(|s| !s.is_empty()),
                }
                i += 2;
            }
            other => return Err(anyhow::anyhow!("Unknown argument: {other}")),
        }
    }

    let ast_file = ast_file.ok_or_else(|| anyhow::anyhow!("--ast is required"))?;

    Ok(Command::Analyze(AnalyzeArgs {
        ast_file,
        language: language.filter(|l| !l.is_empty()),
        languages_file,
        output_dir,
        timeout_secs,
        output_suffix,
        verbose,
    }))
}

pub fn parse_args() -> Result<Command> {
    parse_args_from(std::env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        match parse(&["--ast", "go-ast.json"]).unwrap() {
            Command::Analyze(args) => {
                assert_eq!(args.ast_file, PathBuf::from("go-ast.json"));
                assert_eq!(args.output_dir, PathBuf::from(".ring/codereview"));
                assert_eq!(args.timeout_secs, 30);
                assert_eq!(args.language, None);
                assert_eq!(args.output_suffix, None);
                assert!(!args.verbose);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_all_flags() {
        let command = parse(&[
            "-v",
            "--ast",
            "ast.json",
            "--lang",
            "ts",
            "--languages-file",
            "langs.json",
            "--output",
            "out",
            "--timeout",
            "0",
            "--output-suffix",
            "-pr",
        ])
        .unwrap();
        assert_eq!(
            command,
            Command::Analyze(AnalyzeArgs {
                ast_file: PathBuf::from("ast.json"),
                language: Some("ts".to_string()),
                languages_file: Some(PathBuf::from("langs.json")),
                output_dir: PathBuf::from("out"),
                timeout_secs: 0,
                output_suffix: Some("-pr".to_string()),
                verbose: true,
            })
        );
    }

    #[test]
    fn test_help_version_and_errors() {
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
        assert_eq!(parse(&["--ast", "a.json", "-V"]).unwrap(), Command::Version);
        assert!(parse(&[]).is_err());
        assert!(parse(&["--ast"]).is_err());
        assert!(parse(&["--ast", "a.json", "--timeout", "-1"]).is_err());
        assert!(parse(&["--ast", "a.json", "--bogus"]).is_err());
    }
}
