//! sqx-patcher - patch SQX XML templates with values from a YAML config

use clap::Parser;
use colored::Colorize;
use sqx_patch::anchors::DEFAULT_PARAM_CLASS;
use sqx_patch::PatchOptions;
use sqx_patcher::{RunOptions, RunOutcome, run};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SQX_PATCHER_LOG";

const DEFAULT_LOG_FILTER: &str = "sqx_patcher=info,sqx_patch=info";

#[derive(Parser)]
#[command(name = "sqx-patcher")]
#[command(about = "Patch SQX XML templates with values from YAML config")]
#[command(version)]
struct Cli {
    /// Path to the XML template file
    #[arg(long)]
    template: PathBuf,

    /// Path to the YAML configuration file
    #[arg(long)]
    cfg: PathBuf,

    /// Output path for the patched XML file [default: out/<template>_<timestamp>.xml]
    #[arg(long)]
    out: Option<PathBuf>,

    /// Validate the output file after patching
    #[arg(long)]
    validate: bool,

    /// Print summary and diff without writing files
    #[arg(long)]
    dry_run: bool,

    /// Class attribute for Param elements that have to be created
    #[arg(long, default_value = DEFAULT_PARAM_CLASS)]
    param_class: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the summary and diff
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let options = RunOptions {
        template: cli.template,
        config: cli.cfg,
        output: cli.out,
        validate: cli.validate,
        dry_run: cli.dry_run,
        patch: PatchOptions {
            default_param_class: cli.param_class,
        },
        temp_dir: None,
    };

    let mut stdout = std::io::stdout().lock();
    match run(&options, &mut stdout) {
        Ok(outcome) => {
            if let RunOutcome::VerificationFailed(mismatch) = &outcome {
                eprintln!("{} {mismatch}", "✗".red());
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red());
            ExitCode::FAILURE
        }
    }
}
