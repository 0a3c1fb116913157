//! Semantic-diff input: parsing, language selection and `ModifiedFunction` building

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::language::{normalize_language, Language};
use crate::types::ModifiedFunction;
use crate::validation::validate_path_within_root;

/// Largest JSON input accepted (50 MiB)
pub const MAX_JSON_FILE_SIZE: u64 = 50 * 1024 * 1024;

const CHANGE_REMOVED: &str = "removed";

/// Signature fields the analyzer needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

/// One function-level change from the diff phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDiff {
    pub name: String,
    /// `added`, `modified`, `removed` or `renamed`
    pub change_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<FunctionSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<FunctionSignature>,
}

/// Changes in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticDiff {
    #[serde(default)]
    pub language: String,
    pub file_path: String,
    #[serde(default)]
    pub functions: Vec<FunctionDiff>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiffDocument {
    Batch(Vec<SemanticDiff>),
    Single(SemanticDiff),
}

#[derive(Deserialize)]
struct LanguagesFile {
    #[serde(default)]
    languages: Option<Vec<String>>,
}

/// Parse a semantic-diff document: one object, an array of them, or `null`
pub fn parse_semantic_diffs(data: &[u8]) -> Result<Vec<SemanticDiff>> {
    let document: Option<DiffDocument> = serde_json::from_slice(data)
        .context("failed to parse AST data as a semantic diff or a list of semantic diffs")?;
    Ok(match document {
        Some(DiffDocument::Batch(diffs)) => diffs,
        Some(DiffDocument::Single(diff)) => vec![diff],
        None => Vec::new(),
    })
}

/// Read a JSON file that must resolve inside `root` and stay under the size cap
pub fn read_json_file(path: &Path, root: &Path) -> Result<Vec<u8>> {
    let validated = validate_path_within_root(path, root)
        .with_context(|| format!("invalid input path {}", path.display()))?;

    let size = std::fs::metadata(&validated)
        .with_context(|| format!("failed to stat {}", validated.display()))?
        .len();
    if size > MAX_JSON_FILE_SIZE {
        bail!(
            "file {} exceeds maximum allowed size of {} bytes (actual: {} bytes)",
            validated.display(),
            MAX_JSON_FILE_SIZE,
            size
        );
    }

    std::fs::read(&validated).with_context(|| format!("failed to read {}", validated.display()))
}

/// Languages listed in a `{"languages": [...]}` file
pub fn read_languages_file(path: &Path, root: &Path) -> Result<Vec<String>> {
    let data = read_json_file(path, root).context("failed to read languages file")?;
    let payload: LanguagesFile =
        serde_json::from_slice(&data).context("failed to parse languages file")?;
    Ok(payload.languages.unwrap_or_default())
}

/// Language implied by an AST file name such as `go-ast.json` or `ts-ast.json`
pub fn detect_language_from_filename(path: &Path) -> Option<Language> {
    let base = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    let prefix = base.split('-').next()?;
    if prefix.len() == base.len() {
        return None;
    }
    normalize_language(prefix)
}

/// Supported languages present in `diffs`, in Go, TypeScript, Python order
pub fn extract_languages_from_diffs(diffs: &[SemanticDiff]) -> Vec<Language> {
    let present: BTreeSet<Language> = diffs
        .iter()
        .filter_map(|d| normalize_language(&d.language))
        .collect();
    Language::ALL
        .into_iter()
        .filter(|lang| present.contains(lang))
        .collect()
}

/// Diffs whose language normalizes to `language`
pub fn filter_diffs_by_language(diffs: &[SemanticDiff], language: Language) -> Vec<SemanticDiff> {
    diffs
        .iter()
        .filter(|d| normalize_language(&d.language) == Some(language))
        .cloned()
        .collect()
}

/// Functions still present after the change, with their receivers and packages
pub fn build_modified_functions(diffs: &[SemanticDiff]) -> Vec<ModifiedFunction> {
    let mut functions = Vec::new();
    for diff in diffs {
        let package = package_from_path(&diff.file_path);
        for change in &diff.functions {
            if change.change_type == CHANGE_REMOVED {
                continue;
            }
            let receiver = [&change.after, &change.before]
                .into_iter()
                .flatten()
                .filter_map(|sig| sig.receiver.as_deref())
                .find(|r| !r.is_empty());

            let mut function = ModifiedFunction::new(&change.name, &diff.file_path, &package);
            if let Some(receiver) = receiver {
                function = function.with_receiver(receiver);
            }
            functions.push(function);
        }
    }
    functions
}

/// Parent directory name of `file`, `main` for top-level files
fn package_from_path(file: &str) -> String {
    Path::new(file)
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| name != ".")
        .unwrap_or_else(|| "main".to_string())
}
