//! Pay-check intake wizard.
//!
//! `paycheck run` walks the five wizard steps from `.paycheck/seed.json`, runs
//! the simulated agent pipeline on the configured timers, and writes the final
//! form data and a Markdown report under `.paycheck/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use paycheck::exit_codes;
use paycheck::io::config::load_config;
use paycheck::io::init::{InitOptions, PaycheckPaths, init_paycheck};
use paycheck::io::report::{render_report, write_outputs};
use paycheck::io::seed::load_seed;
use paycheck::logging;
use paycheck::session::{IntakeSession, SessionEnd};
use paycheck::views::{CliAnswers, CliView};

#[derive(Parser, Debug)]
#[command(
    name = "paycheck",
    version,
    about = "Pay-check intake wizard with a simulated agent pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.paycheck/` with the default config, demo seed and schema.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Check config and seed (schema + semantic checks).
    Validate,
    /// Walk the wizard and run the simulated check.
    Run {
        /// Employment contract to attach on the upload step.
        #[arg(long)]
        contract: Option<PathBuf>,
        /// Roster or timesheet to attach on the upload step.
        #[arg(long)]
        worksheet: Option<PathBuf>,
        /// Payslip to attach on the upload step.
        #[arg(long)]
        payslip: Option<PathBuf>,
        /// Override the seed's role title on the meta details step.
        #[arg(long)]
        role_title: Option<String>,
        /// Fail the check when the named stage starts running.
        #[arg(long, value_name = "STAGE")]
        fail_at: Option<String>,
        /// Suppress step headers and progress lines.
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = Path::new(".");
    match cli.command {
        Command::Init { force } => {
            let paths = init_paycheck(root, &InitOptions { force })?;
            info!(dir = %paths.paycheck_dir.display(), "initialized");
            Ok(exit_codes::OK)
        }
        Command::Validate => {
            let paths = PaycheckPaths::new(root);
            load_config(&paths.config_path)?;
            load_seed(&paths.schema_path, &paths.seed_path)?;
            Ok(exit_codes::OK)
        }
        Command::Run {
            contract,
            worksheet,
            payslip,
            role_title,
            fail_at,
            quiet,
        } => {
            let answers = CliAnswers {
                role_title,
                contract,
                worksheet,
                payslip,
                fail_at,
            };
            cmd_run(root, answers, quiet)
        }
    }
}

fn cmd_run(root: &Path, answers: CliAnswers, quiet: bool) -> Result<i32> {
    let paths = PaycheckPaths::new(root);
    let config = load_config(&paths.config_path)?;
    let seed = load_seed(&paths.schema_path, &paths.seed_path)
        .context("load seed (run `paycheck init` first)")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build tokio runtime")?;
    let mut view = CliView::new(answers, quiet);
    let end = runtime.block_on(IntakeSession::new(seed, config).run(&mut view))?;
    debug!(end = ?end, "session ended");

    write_outputs(&paths.result_path, &paths.report_path, end.data())?;
    let code = match &end {
        SessionEnd::Finished(data) => {
            if !quiet {
                println!("{}", render_report(data)?);
            }
            exit_codes::OK
        }
        SessionEnd::Cancelled { step, .. } => {
            eprintln!("check cancelled at {}", step.header());
            exit_codes::CANCELLED
        }
        SessionEnd::CheckFailed { failure, .. } => {
            eprintln!("check failed: {}: {}", failure.stage, failure.reason);
            exit_codes::CHECK_FAILED
        }
    };
    Ok(code)
}
