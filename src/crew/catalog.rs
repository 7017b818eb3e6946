//! Discovery of previously generated scripts.

use anyhow::{Context, Result};
use glob::Pattern;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

use super::ScriptArtifact;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// File-name form of a goal: lowercase alphanumeric words joined by `_`.
///
/// ```
/// use autocrew::crew::goal_slug;
/// assert_eq!(goal_slug("Plan a 3-day trip to Rome!"), "plan_a_3_day_trip_to_rome");
/// ```
#[must_use]
pub fn goal_slug(goal: &str) -> String {
    NON_WORD.replace_all(&goal.to_lowercase(), "_").trim_matches('_').to_string()
}

/// The `scripts/` directory of an installation.
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    dir: PathBuf,
}

impl ScriptCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Every CSV artifact, sorted by path. A missing directory is empty.
    pub fn all(&self) -> Result<Vec<ScriptArtifact>> {
        let pattern = format!("{}/*.csv", Pattern::escape(&self.dir.to_string_lossy()));
        let entries =
            glob::glob(&pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read scripts directory entry")?;
            if path.is_file() {
                artifacts.push(ScriptArtifact::new(path));
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Artifacts whose file name contains the slug of `goal`.
    pub fn find_for_goal(&self, goal: &str) -> Result<Vec<ScriptArtifact>> {
        let slug = goal_slug(goal);
        if slug.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<ScriptArtifact> =
            self.all()?.into_iter().filter(|a| goal_slug(&a.stem()).contains(&slug)).collect();
        debug!("Found {} script(s) for goal slug '{}' in {}", found.len(), slug, self.dir.display());
        Ok(found)
    }
}
