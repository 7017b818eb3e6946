//! Command-line interface for AutoCrew.
//!
//! A single command with flags; there are no subcommands.
//!
//! # Flags
//!
//! - `-v, --verbose` - Debug output on the console
//! - `-u, --upgrade` - Upgrade to the latest version (must be used alone)
//! - `-h, -?, --help` - Show help (must be used alone)
//! - `-r, --rank` - Rank previously generated crews for the goal
//! - `-a, --auto_run` - Run the generated scripts afterwards
//! - `-m, --multiple <N>` - Generate N alternative crews
//! - `[OVERALL_GOAL]` - Goal for the crew; prompted for when absent
//!
//! # Execution Order
//!
//! ```text
//! 1. Reject -u/-h combined with anything else (before touching the disk)
//! 2. Initialize logging (autocrew.log + console)
//! 3. Log the command line, check for a newer version, print the banner
//! 4. -u: run the upgrade workflow and exit
//!    -h: print help and exit
//! 5. Resolve the goal (argument or prompt)
//! 6. Rank existing crews, or generate N crews, or generate one
//! 7. -a: run each generated script
//! ```
//!
//! # Exit Codes
//!
//! `0` on success, help or a no-op upgrade; `1` on usage errors, a failed
//! upgrade, nothing to rank, or any other error.

pub mod goal;


use anyhow::Result;
use clap::{CommandFactory, Parser};
use semver::Version;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

use crate::config::{ConfigDocument, Settings};
use crate::constants::{AUTOCREW_VERSION, CONFIG_FILE, ISSUES_URL, LOG_FILE, SCRIPTS_DIR};
use crate::core::{AutocrewError, user_friendly_error};
use crate::crew::{CommandBackend, CrewBackend, ScriptCatalog, auto_run};
use crate::logging::Logger;
use crate::process::{CommandRunner, SystemCommandRunner};
use crate::upgrade::{
    FsInstaller, SourceFetcher, UpgradeCoordinator, UpgradeOutcome, VersionChecker, VersionStatus,
};
use goal::{GoalProvider, PromptGoal, ProvidedGoal};

/// Shown when `-u` or `-h` is combined with other arguments.
pub const EXCLUSIVE_CONFLICT_MESSAGE: &str =
    "Error: The '-u/--upgrade' and '-h/-?/--help' options cannot be used with other arguments.";

const EXCLUSIVE_FLAGS: &[&str] = &["-u", "--upgrade", "-h", "-?", "--help"];

/// Top-level arguments.
///
/// clap's own help flag is disabled so that `-h`, `-?` and `--help` are
/// ordinary flags subject to the same exclusivity rule as `--upgrade`.
#[derive(Parser, Debug)]
#[command(
    name = "autocrew",
    about = "CrewAI Autocrew Script",
    long_about = "Generate, rank and run CrewAI crews for an overall goal.",
    disable_help_flag = true
)]
pub struct Cli {
    /// Provide additional details during execution
    #[arg(short, long)]
    pub verbose: bool,

    /// Upgrade to the latest version of AutoCrew
    #[arg(short, long)]
    pub upgrade: bool,

    /// Show this help message and exit
    #[arg(short = 'h', long = "help", short_alias = '?')]
    pub help: bool,

    /// Rank the generated crews if multiple scripts are created
    #[arg(short, long)]
    pub rank: bool,

    /// Automatically run the scripts after generation
    #[arg(short, long = "auto_run")]
    pub auto_run: bool,

    /// Generate multiple alternative scripts
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub multiple: Option<u32>,

    /// The overall goal for the crew
    pub overall_goal: Option<String>,
}

/// Parse `args` (including the program name), run, and map the result to
/// an exit code.
pub async fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let user_args = args.get(1..).unwrap_or_default();

    if let Err(e) = detect_exclusive_conflict(user_args) {
        eprintln!("{}", Cli::command().render_usage());
        user_friendly_error(e.into()).display();
        return ExitCode::from(1);
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let command_line =
        user_args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ");
    ExitCode::from(cli.execute(Path::new("."), &command_line).await)
}

/// Reject `-u`/`-h` used together with any other argument.
///
/// Works on the raw arguments so the check happens before parsing, logging
/// or any other side effect. Bundled short flags (`-uv`) count as several
/// arguments.
pub fn detect_exclusive_conflict(args: &[OsString]) -> Result<(), AutocrewError> {
    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();

    let bundled = |arg: &str| arg.len() > 2 && arg.starts_with('-') && !arg.starts_with("--");
    let exclusive = |arg: &str| {
        EXCLUSIVE_FLAGS.contains(&arg)
            || (bundled(arg) && arg[1..].chars().any(|c| matches!(c, 'u' | 'h' | '?')))
    };

    if !args.iter().any(|a| exclusive(a)) {
        return Ok(());
    }
    if args.len() > 1 || args.iter().any(|a| bundled(a)) {
        return Err(AutocrewError::UsageConflict {
            message: EXCLUSIVE_CONFLICT_MESSAGE.to_string(),
        });
    }
    Ok(())
}

/// The startup banner, including the version-check notice.
#[must_use]
pub fn startup_banner(status: &VersionStatus) -> String {
    format!(
        "\nAutoCrew version: {AUTOCREW_VERSION}\n{}\n\n\
         Use the -? or -h command line options to display help information.\n\
         Settings can be modified within \"{CONFIG_FILE}\". Scripts are saved in the \"{SCRIPTS_DIR}\" subdirectory.\n\
         If you experience any errors, please create an issue on Github and attach \"{LOG_FILE}\":\n\
         {ISSUES_URL}\n",
        status.message()
    )
}

/// What to do with the crew once the goal is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrewRequest {
    pub rank: bool,
    pub auto_run: bool,
    pub multiple: Option<u32>,
    pub verbose: bool,
}

impl Cli {
    /// Execute with `root` as the installation directory and return the
    /// exit code.
    pub async fn execute(&self, root: &Path, command_line: &str) -> u8 {
        let (settings, document) = match Settings::load(&root.join(CONFIG_FILE)) {
            Ok(loaded) => loaded,
            Err(e) => {
                user_friendly_error(e).display();
                return 1;
            }
        };

        let logger = match Logger::init(self.verbose, settings.console_level, &root.join(LOG_FILE))
        {
            Ok(logger) => logger,
            Err(e) => {
                user_friendly_error(e).display();
                return 1;
            }
        };

        let code = match self.dispatch(root, command_line, &settings, &document).await {
            Ok(code) => code,
            Err(e) => {
                debug!("Unhandled error: {e:?}");
                user_friendly_error(e).display();
                1
            }
        };

        if let Err(e) = logger.shutdown() {
            eprintln!("{e:#}");
        }
        code
    }

    async fn dispatch(
        &self,
        root: &Path,
        command_line: &str,
        settings: &Settings,
        document: &ConfigDocument,
    ) -> Result<u8> {
        info!("Command-line arguments: {command_line}");

        let checker = VersionChecker::from_settings(settings)?;
        let status = checker.check().await;
        info!("{}", startup_banner(&status));

        if self.upgrade {
            return Ok(upgrade(root, settings, checker.current_version(), &status).await);
        }
        if self.help {
            Cli::command().print_help()?;
            println!();
            return Ok(0);
        }

        debug!("Configuration ({}):\n{}", CONFIG_FILE, document.redacted());

        let goal = match &self.overall_goal {
            Some(goal) => ProvidedGoal::new(goal.as_str()).goal()?,
            None => PromptGoal::stdio().goal()?,
        };
        debug!("Overall goal: {goal}");

        let runner = SystemCommandRunner;
        let backend = CommandBackend::from_settings(&runner, settings, root)?;
        let catalog = ScriptCatalog::new(root.join(SCRIPTS_DIR));
        let request = CrewRequest {
            rank: self.rank,
            auto_run: self.auto_run,
            multiple: self.multiple,
            verbose: self.verbose,
        };

        run_crew(&request, &goal, &backend, &catalog, &runner, &settings.python, root).await?;
        Ok(0)
    }
}

async fn upgrade(
    root: &Path,
    settings: &Settings,
    current: &Version,
    status: &VersionStatus,
) -> u8 {
    let runner = SystemCommandRunner;
    let fetcher = SourceFetcher::new(&runner, settings.repository_url.as_str());
    let coordinator = UpgradeCoordinator::new(
        fetcher,
        FsInstaller::new(PathBuf::from(root)),
        current.clone(),
    );

    let outcome = coordinator.run(status).await;
    let code = outcome.exit_code();
    match outcome {
        UpgradeOutcome::Done { .. } => {}
        UpgradeOutcome::Aborted { reason } => info!("{reason}"),
        UpgradeOutcome::Failed { state, error } => {
            debug!("Upgrade error: {error:?}");
            error!("Upgrade failed while {state}.");
            user_friendly_error(error).display();
        }
    }
    code
}

/// Rank existing crews for `goal`, or generate new ones and optionally run
/// them.
pub async fn run_crew<B: CrewBackend, R: CommandRunner>(
    request: &CrewRequest,
    goal: &str,
    backend: &B,
    catalog: &ScriptCatalog,
    runner: &R,
    python: &str,
    root: &Path,
) -> Result<()> {
    if request.rank {
        info!("Ranking process initiated.");
        let artifacts = catalog.find_for_goal(goal)?;
        if artifacts.is_empty() {
            error!("No existing scripts found to rank.");
            return Err(AutocrewError::NoArtifactsFound {
                goal: goal.to_string(),
            }
            .into());
        }
        let report = backend.rank(goal, &artifacts, request.verbose).await?;
        info!("{}", report.summary);
        info!("Ranking process completed.");
        return Ok(());
    }

    let count = request.multiple.unwrap_or(1);
    if count > 1 {
        info!("Generating {count} alternative scripts...");
    }
    let artifacts = backend.generate(goal, count, request.verbose).await?;

    if request.auto_run {
        let summary = auto_run(runner, python, &artifacts, root).await;
        debug!("Auto-run finished: {} succeeded, {} failed", summary.succeeded, summary.failed);
    }
    Ok(())
}
