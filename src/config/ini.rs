//! Ordered INI documents.
//!
//! `config.ini` is a plain sectioned key-value file. [`ConfigDocument`] keeps
//! sections and keys in the order they were first seen so that rendering a
//! document back to disk produces a stable, diff-friendly file.
//!
//! Syntax accepted by [`ConfigDocument::parse`]:
//!
//! ```text
//! ; comment          # comment
//! [SECTION]
//! key = value
//! other: value
//! long = first line
//!     continued line
//! ```
//!
//! Section and key names are case-sensitive. A repeated section header adds
//! to the existing section and a repeated key overwrites the earlier value,
//! so no input line is ever silently discarded in favour of an error.
//! Comments are not preserved when a document is rendered.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

use crate::core::AutocrewError;

/// One `[name]` block and its entries, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl ConfigSection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or overwrite `key`. New keys are appended at the end.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An ordered mapping of section name to ordered key/value entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: Vec<ConfigSection>,
}

impl ConfigDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text that did not come from a named file.
    pub fn parse(text: &str) -> Result<Self, AutocrewError> {
        Self::parse_named(text, "<memory>")
    }

    /// Parse INI text, naming `file` in any syntax error.
    pub fn parse_named(text: &str, file: &str) -> Result<Self, AutocrewError> {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;
        let mut last_key: Option<String> = None;

        let syntax_error = |line: usize, reason: &str| AutocrewError::ConfigParseError {
            file: file.to_string(),
            line,
            reason: reason.to_string(),
        };

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Indented line directly after an entry continues its value
            if raw.starts_with([' ', '\t']) {
                if let (Some(section_idx), Some(key)) = (current, last_key.as_ref()) {
                    let section = &mut doc.sections[section_idx];
                    let previous = section.get(key).unwrap_or_default().to_string();
                    let joined = if previous.is_empty() {
                        trimmed.to_string()
                    } else {
                        format!("{previous}\n{trimmed}")
                    };
                    section.set(key.clone(), joined);
                    continue;
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| syntax_error(line_no, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(syntax_error(line_no, "empty section name"));
                }
                current = Some(doc.section_index_or_insert(name));
                last_key = None;
                continue;
            }

            let Some(section_idx) = current else {
                return Err(syntax_error(line_no, "entry appears before any [section] header"));
            };

            let split_at = trimmed
                .find(['=', ':'])
                .ok_or_else(|| syntax_error(line_no, "expected 'key = value'"))?;
            let key = trimmed[..split_at].trim();
            let value = trimmed[split_at + 1..].trim();
            if key.is_empty() {
                return Err(syntax_error(line_no, "empty key"));
            }

            doc.sections[section_idx].set(key, value);
            last_key = Some(key.to_string());
        }

        Ok(doc)
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(AutocrewError::from)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let doc = Self::parse_named(&text, &path.display().to_string())?;
        Ok(doc)
    }

    /// Read and parse a file, treating a missing file as an empty document.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Render the document in INI syntax.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in section.entries() {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(&value.replace('\n', "\n\t"));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    pub fn sections(&self) -> impl Iterator<Item = &ConfigSection> {
        self.sections.iter()
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Return the section, creating an empty one at the end when missing.
    pub fn section_mut_or_insert(&mut self, name: &str) -> &mut ConfigSection {
        let idx = self.section_index_or_insert(name);
        &mut self.sections[idx]
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    #[must_use]
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.section(section).is_some_and(|s| s.contains_key(key))
    }

    pub fn set(&mut self, section: &str, key: impl Into<String>, value: impl Into<String>) {
        self.section_mut_or_insert(section).set(key, value);
    }

    /// Copy of the document with secret-looking values masked, for logging.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for section in &mut copy.sections {
            for (key, value) in &mut section.entries {
                if is_secret_key(key) && !value.is_empty() {
                    *value = "********".to_string();
                }
            }
        }
        copy
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self.sections.iter().position(|s| s.name == name) {
            return idx;
        }
        self.sections.push(ConfigSection::new(name));
        self.sections.len() - 1
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["api_key", "apikey", "token", "secret", "password"].iter().any(|marker| key.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
; AutoCrew settings
[CREWAI]
api_key = sk-123
model: gpt-4

[MISCELLANEOUS]
# console verbosity
on_screen_logging_level = INFO
description = first line
    second line
";

    #[test]
    fn test_parse_sections_and_keys_in_order() {
        let doc = ConfigDocument::parse(SAMPLE).unwrap();
        let names: Vec<&str> = doc.sections().map(ConfigSection::name).collect();
        assert_eq!(names, vec!["CREWAI", "MISCELLANEOUS"]);

        let keys: Vec<&str> = doc.section("CREWAI").unwrap().keys().collect();
        assert_eq!(keys, vec!["api_key", "model"]);
        assert_eq!(doc.get("CREWAI", "model"), Some("gpt-4"));
        assert_eq!(doc.get("MISCELLANEOUS", "description"), Some("first line\nsecond line"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let doc = ConfigDocument::parse("[Sec]\nKey = 1\nkey = 2\n").unwrap();
        assert_eq!(doc.get("Sec", "Key"), Some("1"));
        assert_eq!(doc.get("Sec", "key"), Some("2"));
        assert!(!doc.has_section("sec"));
    }

    #[test]
    fn test_repeated_section_and_key_are_merged() {
        let doc = ConfigDocument::parse("[A]\nx = 1\n[B]\ny = 2\n[A]\nx = 3\nz = 4\n").unwrap();
        assert_eq!(doc.sections().count(), 2);
        assert_eq!(doc.get("A", "x"), Some("3"));
        assert_eq!(doc.get("A", "z"), Some("4"));
    }

    #[test]
    fn test_value_may_contain_delimiters() {
        let doc = ConfigDocument::parse("[URLS]\nendpoint = http://localhost:11434/api\n").unwrap();
        assert_eq!(doc.get("URLS", "endpoint"), Some("http://localhost:11434/api"));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = ConfigDocument::parse("key = value\n").unwrap_err();
        assert!(matches!(err, AutocrewError::ConfigParseError { line: 1, .. }));

        let err = ConfigDocument::parse("[A]\nno delimiter here\n").unwrap_err();
        assert!(matches!(err, AutocrewError::ConfigParseError { line: 2, .. }));

        let err = ConfigDocument::parse("[A\nx = 1\n").unwrap_err();
        assert!(matches!(err, AutocrewError::ConfigParseError { line: 1, .. }));
    }

    #[test]
    fn test_render_then_parse_preserves_document() {
        let doc = ConfigDocument::parse(SAMPLE).unwrap();
        let rendered = doc.render();
        assert!(rendered.starts_with("[CREWAI]\napi_key = sk-123\nmodel = gpt-4\n\n"));
        assert!(rendered.contains("description = first line\n\tsecond line\n"));
        assert_eq!(ConfigDocument::parse(&rendered).unwrap(), doc);
    }

    #[test]
    fn test_set_creates_section() {
        let mut doc = ConfigDocument::new();
        doc.set("NEW", "flag", "true");
        assert!(doc.contains("NEW", "flag"));
        assert_eq!(doc.get("NEW", "flag"), Some("true"));
    }

    #[test]
    fn test_redacted_masks_secret_values() {
        let doc = ConfigDocument::parse(
            "[CREWAI]\napi_key = sk-123\nOPENAI_API_KEY = abc\nauth_token =\nmodel = gpt-4\n",
        )
        .unwrap();
        let redacted = doc.redacted();
        assert_eq!(redacted.get("CREWAI", "api_key"), Some("********"));
        assert_eq!(redacted.get("CREWAI", "OPENAI_API_KEY"), Some("********"));
        assert_eq!(redacted.get("CREWAI", "auth_token"), Some(""));
        assert_eq!(redacted.get("CREWAI", "model"), Some("gpt-4"));
        // the original is untouched
        assert_eq!(doc.get("CREWAI", "api_key"), Some("sk-123"));
    }

    #[test]
    fn test_load_or_empty_missing_file() {
        let temp = TempDir::new().unwrap();
        let doc = ConfigDocument::load_or_empty(&temp.path().join("config.ini")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_load_names_file_in_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "orphan = 1\n").unwrap();

        let err = ConfigDocument::load(&path).unwrap_err();
        let typed = err.downcast_ref::<AutocrewError>().unwrap();
        match typed {
            AutocrewError::ConfigParseError { file, .. } => assert!(file.ends_with("config.ini")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_unreadable_is_io_error() {
        let temp = TempDir::new().unwrap();
        // a directory cannot be read as text
        let err = ConfigDocument::load(temp.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<AutocrewError>(), Some(AutocrewError::Io(_))));
    }
}
