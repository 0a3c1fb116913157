//! Language dispatch: the single entry point for building an analyzer

use std::path::Path;

use crate::analyzer::Analyzer;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::golang::GoAnalyzer;
use crate::language::Language;
use crate::python::PythonAnalyzer;
use crate::typescript::TypeScriptAnalyzer;

/// Build the analyzer for `language` (aliases accepted, case-insensitive)
/// rooted at `work_dir`, with default limits.
pub fn new_analyzer(language: &str, work_dir: &Path) -> Result<Box<dyn Analyzer>, AnalyzerError> {
    new_analyzer_with_config(language, work_dir, AnalyzerConfig::default())
}

/// Like `new_analyzer` with explicit limits and tool locations
pub fn new_analyzer_with_config(
    language: &str,
    work_dir: &Path,
    config: AnalyzerConfig,
) -> Result<Box<dyn Analyzer>, AnalyzerError> {
    let language: Language = language.parse()?;
    check_work_dir(work_dir)?;

    tracing::debug!(language = %language, work_dir = %work_dir.display(), "creating analyzer");

    Ok(match language {
        Language::Go => Box::new(GoAnalyzer::new(work_dir, config)),
        Language::TypeScript => Box::new(TypeScriptAnalyzer::new(work_dir, config)),
        Language::Python => Box::new(PythonAnalyzer::new(work_dir, config)),
    })
}

fn check_work_dir(work_dir: &Path) -> Result<(), AnalyzerError> {
    let invalid = |reason: &str| AnalyzerError::InvalidWorkDir {
        path: work_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    if work_dir.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    match std::fs::metadata(work_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(invalid("not a directory")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_aliases_select_backend() {
        let dir = TempDir::new().unwrap();
        for (input, expected) in [
            ("go", Language::Go),
            ("GoLang", Language::Go),
            ("ts", Language::TypeScript),
            (" TypeScript ", Language::TypeScript),
            ("py", Language::Python),
            ("PYTHON", Language::Python),
        ] {
            let analyzer = new_analyzer(input, dir.path()).unwrap();
            assert_eq!(analyzer.language(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_unsupported_language() {
        let dir = TempDir::new().unwrap();
        let err = new_analyzer("rust", dir.path()).err().unwrap();
        match err {
            AnalyzerError::UnsupportedLanguage { language, supported } => {
                assert_eq!(language, "rust");
                assert_eq!(supported, "go, typescript, python");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_work_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(matches!(
            new_analyzer("go", &file).err().unwrap(),
            AnalyzerError::InvalidWorkDir { .. }
        ));
        assert!(matches!(
            new_analyzer("go", &dir.path().join("missing")).err().unwrap(),
            AnalyzerError::InvalidWorkDir { .. }
        ));
        assert!(matches!(
            new_analyzer("go", Path::new("")).err().unwrap(),
            AnalyzerError::InvalidWorkDir { .. }
        ));
    }
}
