//! Running generated scripts.

use std::path::Path;
use tracing::{info, warn};

use super::ScriptArtifact;
use crate::process::{CommandRunner, CommandSpec};

/// How an auto-run pass went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoRunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Run the script of each artifact with `python`, one after another, from
/// `root`.
///
/// Each script is its own subprocess. A script that is missing, cannot be
/// started or exits unsuccessfully is logged and skipped; it never fails
/// the caller.
pub async fn auto_run<R: CommandRunner>(
    runner: &R,
    python: &str,
    artifacts: &[ScriptArtifact],
    root: &Path,
) -> AutoRunSummary {
    let mut summary = AutoRunSummary::default();

    for artifact in artifacts {
        let script = artifact.script_path();
        if !script.is_file() {
            warn!("Cannot auto-run {}: script not found", script.display());
            summary.failed += 1;
            continue;
        }

        info!("Running {}", script.display());
        let spec = CommandSpec::new(python).arg(script.display().to_string()).current_dir(root);
        match runner.run(&spec).await {
            Ok(status) if status.success() => summary.succeeded += 1,
            Ok(status) => {
                warn!("{} finished with {}", script.display(), status.describe());
                summary.failed += 1;
            }
            Err(e) => {
                warn!("Could not run {}: {e:#}", script.display());
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandStatus;
    use crate::test_utils::FakeCommandRunner;
    use tempfile::TempDir;

    fn artifacts(dir: &Path, stems: &[&str]) -> Vec<ScriptArtifact> {
        stems
            .iter()
            .map(|stem| {
                std::fs::write(dir.join(format!("{stem}.csv")), "").unwrap();
                std::fs::write(dir.join(format!("{stem}.py")), "print('hi')").unwrap();
                ScriptArtifact::new(dir.join(format!("{stem}.csv")))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_each_script_with_python() {
        let temp = TempDir::new().unwrap();
        let runner = FakeCommandRunner::new();
        let artifacts = artifacts(temp.path(), &["one", "two"]);

        let summary = auto_run(&runner, "python3", &artifacts, temp.path()).await;

        assert_eq!(summary, AutoRunSummary { succeeded: 2, failed: 0 });
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "python3");
        assert_eq!(calls[0].args, vec![temp.path().join("one.py").display().to_string()]);
        assert_eq!(calls[1].args, vec![temp.path().join("two.py").display().to_string()]);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let temp = TempDir::new().unwrap();
        let mut list = artifacts(temp.path(), &["one"]);
        list.push(ScriptArtifact::new(temp.path().join("missing.csv")));

        let failing = FakeCommandRunner::new().with_status(CommandStatus::from_code(1));
        let summary = auto_run(&failing, "python3", &list, temp.path()).await;
        assert_eq!(summary, AutoRunSummary { succeeded: 0, failed: 2 });
        // the missing script is never spawned
        assert_eq!(failing.calls().len(), 1);

        let unspawnable = FakeCommandRunner::new().failing("python3 not found");
        let summary = auto_run(&unspawnable, "python3", &list, temp.path()).await;
        assert_eq!(summary.failed, 2);
    }
}
