//! One patch run, from input files to written artifacts.

use crate::PatchError;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use colored::Colorize;
use sqx_config::PatchConfig;
use sqx_patch::{
    PatchOptions, PatchReport, VerificationMismatch, apply_patch, colorize, diff_bytes, summarize,
    verify,
};
use sqx_xml::XmlDocument;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory the patched template goes to when no output path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Extension of the diff file written next to the output.
pub const DIFF_EXTENSION: &str = "diff";

/// Inputs and switches for [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub template: PathBuf,
    pub config: PathBuf,

    /// Output path; [`default_output_path`] when `None`.
    pub output: Option<PathBuf>,

    /// Check the patched document against the configuration.
    pub validate: bool,

    /// Print the summary and diff instead of writing files.
    pub dry_run: bool,

    pub patch: PatchOptions,

    /// Where the dry-run temporary file is created; the system temporary
    /// directory when `None`.
    pub temp_dir: Option<PathBuf>,
}

/// How a run that did not fail ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The patched template and its diff were written.
    Written { output: PathBuf, diff: PathBuf },

    /// Dry run: summary and diff printed, nothing written.
    DryRun,

    /// Verification found a value that is not in the patched document.
    /// In commit mode the output and diff have already been written.
    VerificationFailed(VerificationMismatch),
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Written { .. } | RunOutcome::DryRun => 0,
            RunOutcome::VerificationFailed(_) => 1,
        }
    }
}

/// `out/<template stem>_<YYYY-MM-DDTHH-MM>.xml`.
pub fn default_output_path(template: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let stem = template
        .file_stem()
        .map_or(Cow::Borrowed("patched"), OsStr::to_string_lossy);
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{stem}_{}.xml", timestamp.format("%Y-%m-%dT%H-%M")))
}

/// The diff file belonging to an output path.
pub fn diff_path(output: &Path) -> PathBuf {
    output.with_extension(DIFF_EXTENSION)
}

/// Patch the template with the configuration.
///
/// Human-facing progress (summary, diff, written paths) goes to `out`;
/// diagnostics go through `tracing`.
///
/// # Errors
///
/// Fails with a [`PatchError`] when an input file is missing or cannot be
/// parsed, and when reading or writing a file fails. A verification
/// mismatch is not an error; it is reported as
/// [`RunOutcome::VerificationFailed`].
pub fn run(options: &RunOptions, out: &mut dyn Write) -> Result<RunOutcome> {
    if !options.template.exists() {
        return Err(PatchError::TemplateNotFound {
            path: options.template.clone(),
        }
        .into());
    }
    if !options.config.exists() {
        return Err(PatchError::ConfigNotFound {
            path: options.config.clone(),
        }
        .into());
    }

    let config = sqx_config::load_file(&options.config).map_err(|source| PatchError::Config {
        path: options.config.clone(),
        source,
    })?;
    for key in config.ignored_keys() {
        tracing::warn!(key = key.as_str(), "ignoring unrecognized config section");
    }

    let template_bytes = fs::read(&options.template).map_err(PatchError::io(&options.template))?;
    let mut document = sqx_xml::load_bytes(&template_bytes).map_err(|source| PatchError::Document {
        path: options.template.clone(),
        source,
    })?;
    tracing::info!(
        template = %options.template.display(),
        encoding = document.encoding.label(),
        "loaded template"
    );

    let report = apply_patch(&mut document, &config, &options.patch);
    log_report(&report);

    let output = match &options.output {
        Some(output) => output.clone(),
        None => default_output_path(&options.template, Local::now().naive_local()),
    };
    let inputs = Inputs {
        options,
        config: &config,
        document: &document,
        template_bytes: &template_bytes,
        output: &output,
    };
    if options.dry_run {
        dry_run(&inputs, out)
    } else {
        commit(&inputs, out)
    }
}

struct Inputs<'a> {
    options: &'a RunOptions,
    config: &'a PatchConfig,
    document: &'a XmlDocument,
    template_bytes: &'a [u8],
    output: &'a Path,
}

impl Inputs<'_> {
    fn diff_against(&self, patched: &[u8]) -> String {
        diff_bytes(
            self.template_bytes,
            patched,
            &file_name(&self.options.template),
            &file_name(self.output),
        )
    }
}

fn dry_run(inputs: &Inputs<'_>, out: &mut dyn Write) -> Result<RunOutcome> {
    let temp_dir = inputs.options.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
    let mut temp = tempfile::Builder::new()
        .prefix("sqx-patched-")
        .suffix(".xml")
        .tempfile_in(&temp_dir)
        .map_err(PatchError::io(&temp_dir))?;
    temp.write_all(&inputs.document.to_bytes())
        .map_err(PatchError::io(temp.path()))?;
    let patched = fs::read(temp.path()).map_err(PatchError::io(temp.path()))?;
    let temp_path = temp.path().to_path_buf();
    temp.close().map_err(PatchError::io(temp_path))?;

    let diff = inputs.diff_against(&patched);

    writeln!(out, "\n{}\n", "=== Summary of Changes ===".bold())?;
    writeln!(out, "{}", summarize(inputs.config))?;
    writeln!(out, "\n{}\n", "=== Diff Preview (Dry Run) ===".bold())?;
    writeln!(out, "{}", colorize(&diff))?;

    if inputs.options.validate {
        if let Err(mismatch) = verify(inputs.document, inputs.config) {
            return Ok(RunOutcome::VerificationFailed(mismatch));
        }
        writeln!(out, "\n{} Validation successful", "✓".green())?;
    }
    Ok(RunOutcome::DryRun)
}

fn commit(inputs: &Inputs<'_>, out: &mut dyn Write) -> Result<RunOutcome> {
    let output = inputs.output;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(PatchError::io(parent))?;
    }

    inputs
        .document
        .write_to(output)
        .with_context(|| format!("failed to write patched template to {}", output.display()))?;
    writeln!(out, "{} Patched file written to {}", "✓".green(), output.display())?;

    let written = fs::read(output).map_err(PatchError::io(output))?;
    let diff_file = diff_path(output);
    fs::write(&diff_file, inputs.diff_against(&written)).map_err(PatchError::io(&diff_file))?;
    writeln!(out, "{} Diff file written to {}", "✓".green(), diff_file.display())?;

    if inputs.options.validate {
        let reloaded = sqx_xml::load_file(output).map_err(|source| PatchError::Document {
            path: output.to_path_buf(),
            source,
        })?;
        if let Err(mismatch) = verify(&reloaded, inputs.config) {
            return Ok(RunOutcome::VerificationFailed(mismatch));
        }
        writeln!(out, "{} Validation successful", "✓".green())?;
    }

    Ok(RunOutcome::Written {
        output: output.to_path_buf(),
        diff: diff_file,
    })
}

fn log_report(report: &PatchReport) {
    for entry in report.skipped() {
        tracing::debug!(
            section = %entry.section,
            key = entry.key.as_str(),
            reason = %entry.action,
            "value not applied"
        );
    }
    tracing::info!(
        applied = report.applied_count(),
        skipped = report.skipped_count(),
        "patch applied"
    );
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
