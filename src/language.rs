//! Language identifiers and their accepted aliases

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// Languages with an analyzer backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    TypeScript,
    Python,
}

/// Alias table, matched case-insensitively
const ALIASES: &[(&str, Language)] = &[
    ("go", Language::Go),
    ("golang", Language::Go),
    ("typescript", Language::TypeScript),
    ("ts", Language::TypeScript),
    ("python", Language::Python),
    ("py", Language::Python),
];

impl Language {
    /// All languages in analysis priority order
    pub const ALL: [Language; 3] = [Language::Go, Language::TypeScript, Language::Python];

    /// Canonical identifier used in results and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_language(s).ok_or_else(|| AnalyzerError::UnsupportedLanguage {
            language: s.to_string(),
            supported: supported_languages_normalized().join(", "),
        })
    }
}

/// Resolve an identifier or alias, ignoring case and surrounding whitespace
pub fn normalize_language(s: &str) -> Option<Language> {
    let needle = s.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, lang)| *lang)
}

/// Every accepted identifier, aliases included
pub fn supported_languages() -> Vec<&'static str> {
    ALIASES.iter().map(|(alias, _)| *alias).collect()
}

/// Canonical identifiers only
pub fn supported_languages_normalized() -> Vec<&'static str> {
    Language::ALL.iter().map(Language::as_str).collect()
}

pub fn is_supported(s: &str) -> bool {
    normalize_language(s).is_some()
}
