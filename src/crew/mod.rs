//! The crew collaborator.
//!
//! Generating crew scripts and ranking them is done by an external backend
//! (LLM prompting, agent roles and the CSV schema all live there). AutoCrew
//! talks to it through [`CrewBackend`], finds previously generated scripts
//! with [`ScriptCatalog`], and can run generated scripts with [`auto_run`].
//!
//! A generated artifact is a pair of files in `scripts/`:
//!
//! ```text
//! scripts/<stem>.csv   crew description
//! scripts/<stem>.py    runnable script
//! ```

pub mod auto_run;
pub mod backend;
pub mod catalog;

pub use auto_run::{AutoRunSummary, auto_run};
pub use backend::{CommandBackend, CrewBackend, RankingReport};
pub use catalog::{ScriptCatalog, goal_slug};

use std::path::{Path, PathBuf};

/// One generated crew, identified by its CSV file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptArtifact {
    csv: PathBuf,
}

impl ScriptArtifact {
    pub fn new(csv: impl Into<PathBuf>) -> Self {
        Self {
            csv: csv.into(),
        }
    }

    #[must_use]
    pub fn csv_path(&self) -> &Path {
        &self.csv
    }

    /// The runnable script next to the CSV.
    #[must_use]
    pub fn script_path(&self) -> PathBuf {
        self.csv.with_extension("py")
    }

    #[must_use]
    pub fn stem(&self) -> String {
        self.csv.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_path_replaces_extension() {
        let artifact = ScriptArtifact::new("scripts/crew_plan_a_trip_1.csv");
        assert_eq!(artifact.script_path(), PathBuf::from("scripts/crew_plan_a_trip_1.py"));
        assert_eq!(artifact.stem(), "crew_plan_a_trip_1");
    }
}
