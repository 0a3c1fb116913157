//! Analyze command implementation
//!
//! Reads a semantic diff, selects languages and runs one analyzer per
//! language, writing `<language>-calls.json` and `impact-summary.md`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use ripple::input::{
    build_modified_functions, detect_language_from_filename, extract_languages_from_diffs,
    filter_diffs_by_language, parse_semantic_diffs, read_json_file, read_languages_file,
    SemanticDiff,
};
use ripple::language::{normalize_language, supported_languages_normalized, Language};
use ripple::output::write_all;
use ripple::{new_analyzer_with_config, AnalyzerConfig, CallGraphResult};

use crate::cli::AnalyzeArgs;

pub fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let work_dir = std::env::current_dir().context("failed to get working directory")?;

    let ast_data = read_json_file(&args.ast_file, &work_dir).context("failed to read AST file")?;
    let diffs = parse_semantic_diffs(&ast_data)?;

    let mut requested: Vec<String> = args.language.iter().cloned().collect();
    if let Some(path) = &args.languages_file {
        requested.extend(read_languages_file(path, &work_dir)?);
    }
    let languages = select_languages(&requested, &args.ast_file, &diffs)?;

    let config = AnalyzerConfig::from_env();
    let mut failures = Vec::new();

    for language in &languages {
        let suffix = match &args.output_suffix {
            Some(suffix) => Some(suffix.clone()),
            None if languages.len() > 1 => Some(format!("-{language}")),
            None => None,
        };
        let output_dir = output_dir_with_suffix(&args.output_dir, suffix.as_deref());
        let language_diffs = filter_diffs_by_language(&diffs, *language);

        if let Err(e) = run_language(
            *language,
            &language_diffs,
            &work_dir,
            &output_dir,
            args.timeout_secs,
            &config,
        ) {
            tracing::error!(language = %language, error = %e, "call graph analysis failed");
            failures.push(format!("{language}: {e:#}"));
        }
    }

    if !failures.is_empty() {
        bail!("{}", failures.join("\n"));
    }
    Ok(())
}

/// Explicit languages win, then the AST file name, then the diffs themselves
fn select_languages(
    requested: &[String],
    ast_file: &Path,
    diffs: &[SemanticDiff],
) -> Result<Vec<Language>> {
    let mut languages = Vec::new();
    for name in requested {
        let Some(language) = normalize_language(name) else {
            bail!(
                "unsupported language: {} (supported: {})",
                name,
                supported_languages_normalized().join(", ")
            );
        };
        if !languages.contains(&language) {
            languages.push(language);
        }
    }

    if languages.is_empty() {
        languages.extend(detect_language_from_filename(ast_file));
    }
    if languages.is_empty() {
        languages = extract_languages_from_diffs(diffs);
    }
    if languages.is_empty() {
        bail!("could not detect language from AST data, use --lang");
    }
    Ok(languages)
}

fn output_dir_with_suffix(base: &Path, suffix: Option<&str>) -> PathBuf {
    match suffix {
        Some(suffix) => {
            let base = base.to_string_lossy();
            PathBuf::from(format!("{}{}", base.trim_end_matches(['/', '\\']), suffix))
        }
        None => base.to_path_buf(),
    }
}

fn run_language(
    language: Language,
    diffs: &[SemanticDiff],
    work_dir: &Path,
    output_dir: &Path,
    timeout_secs: u64,
    config: &AnalyzerConfig,
) -> Result<()> {
    let functions = build_modified_functions(diffs);
    tracing::debug!(
        language = %language,
        output = %output_dir.display(),
        functions = functions.len(),
        timeout_secs,
        "analyzing"
    );
    for function in &functions {
        match function.receiver() {
            Some(receiver) => tracing::debug!("  - ({}).{} in {}", receiver, function.name, function.file),
            None => tracing::debug!("  - {} in {}", function.name, function.file),
        }
    }

    let result = if functions.is_empty() {
        tracing::debug!("no modified functions, writing empty result");
        CallGraphResult::new(language.as_str())
    } else {
        let analyzer = new_analyzer_with_config(language.as_str(), work_dir, config.clone())
            .context("failed to create analyzer")?;
        analyzer
            .analyze(&functions, timeout_secs)
            .context("analysis failed")?
    };

    write_all(&result, output_dir)?;
    print_summary(&result, output_dir);
    Ok(())
}

fn print_summary(result: &CallGraphResult, output_dir: &Path) {
    let impact = &result.impact_analysis;
    println!("Call graph analysis complete:");
    println!("  Language: {}", result.language);
    println!("  Functions analyzed: {}", result.modified_functions.len());
    println!("  Direct callers: {}", impact.direct_callers);
    println!("  Transitive callers: {}", impact.transitive_callers);
    println!("  Affected tests: {}", impact.affected_tests);
    println!("  Affected packages: {}", impact.affected_packages.len());
    if result.time_budget_exceeded {
        println!("  Warning: Time budget exceeded, results may be partial");
    }
    if result.partial_results {
        println!("  Warning: Partial results due to analysis limitations");
    }
    println!(
        "  Output: {}",
        output_dir.join(format!("{}-calls.json", result.language)).display()
    );
    println!("  Summary: {}", output_dir.join("impact-summary.md").display());

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(language: &str) -> SemanticDiff {
        SemanticDiff {
            language: language.to_string(),
            file_path: "a/b.go".to_string(),
            functions: Vec::new(),
        }
    }

    #[test]
    fn test_explicit_languages_deduplicated() {
        let requested = vec!["golang".to_string(), "py".to_string(), "go".to_string()];
        let langs = select_languages(&requested, Path::new("ast.json"), &[]).unwrap();
        assert_eq!(langs, vec![Language::Go, Language::Python]);
    }

    #[test]
    fn test_unsupported_language_is_error() {
        let err = select_languages(&["rust".to_string()], Path::new("go-ast.json"), &[]).unwrap_err();
        assert!(err.to_string().contains("unsupported language: rust"));
    }

    #[test]
    fn test_fallback_order() {
        let diffs = vec![diff("python"), diff("ts")];
        assert_eq!(
            select_languages(&[], Path::new("go-ast.json"), &diffs).unwrap(),
            vec![Language::Go]
        );
        assert_eq!(
            select_languages(&[], Path::new("ast.json"), &diffs).unwrap(),
            vec![Language::TypeScript, Language::Python]
        );
        assert!(select_languages(&[], Path::new("ast.json"), &[]).is_err());
    }

    #[test]
    fn test_output_suffix() {
        assert_eq!(
            output_dir_with_suffix(Path::new(".ring/codereview/"), Some("-go")),
            PathBuf::from(".ring/codereview-go")
        );
        assert_eq!(
            output_dir_with_suffix(Path::new("out"), None),
            PathBuf::from("out")
        );
    }
}
