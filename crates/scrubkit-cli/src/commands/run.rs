use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use scrubkit_core::io::write_table;
use scrubkit_core::pipeline::{
    Pipeline, PipelineReport, Stage, StageObserver, StageRecord, StageStatus,
};
use scrubkit_core::table::Table;

use crate::args::{ReportFormat, RunArgs};
use crate::report;

use super::{load_setup, load_table, resolve_input};

/// Output directory used when neither the flag nor scrubkit.toml names one.
const DEFAULT_OUTPUT_DIR: &str = "output";

pub fn run(args: &RunArgs) -> Result<()> {
    let setup = load_setup(args.config.as_deref())?;
    let input = resolve_input(args.input.as_deref(), setup.config.as_ref())?;
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| setup.config.as_ref().and_then(|c| c.output_dir()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let raw = load_table(&input, &setup.schema)?;
    eprintln!("Loaded {} rows from {}", raw.len(), input.display());

    let pipeline = Pipeline::new(setup.schema, setup.policies);
    let mut spinners = Spinners::default();
    let outcome = pipeline.run_with(&raw, &mut spinners)?;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    write_outputs(&output_dir, &outcome, args)?;

    eprintln!(
        "\n{} {} rows cleaned and masked -> {}",
        if outcome.is_clean() { "✓" } else { "!" },
        outcome.cleaned_table().len(),
        output_dir.display()
    );
    if !outcome.is_clean() {
        eprintln!(
            "  {} rows still fail validation after cleaning (see {})",
            outcome.clean_validation.fail_count,
            report::VALIDATION_REPORT
        );
    }
    Ok(())
}

/// One spinner per pipeline stage.
#[derive(Default)]
struct Spinners {
    current: Option<ProgressBar>,
}

impl StageObserver for Spinners {
    fn on_stage_start(&mut self, index: usize, stage: Stage) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{prefix}] {msg}")
                .unwrap(),
        );
        pb.set_prefix(format!("{}/{}", index, Stage::ALL.len()));
        pb.set_message(format!("{}...", stage_label(stage)));
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current = Some(pb);
    }

    fn on_stage_end(&mut self, record: &StageRecord) {
        if let Some(pb) = self.current.take() {
            let mark = match record.status {
                StageStatus::Ok => "✓",
                StageStatus::Issues => "!",
            };
            pb.finish_with_message(format!(
                "{}... {} {}",
                stage_label(record.stage),
                mark,
                record.detail
            ));
        }
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Profile => "Profiling",
        Stage::ValidateRaw => "Validating raw data",
        Stage::Clean => "Cleaning",
        Stage::ValidateClean => "Validating cleaned data",
        Stage::DetectPii => "Detecting PII",
        Stage::Mask => "Masking",
    }
}

fn write_outputs(dir: &Path, outcome: &PipelineReport, args: &RunArgs) -> Result<()> {
    write_csv(&dir.join(report::CLEANED_CSV), outcome.cleaned_table())?;
    write_csv(&dir.join(report::MASKED_CSV), outcome.masked_table())?;

    write_text(&dir.join(report::QUALITY_REPORT), &report::quality_report(&outcome.profile))?;
    write_text(
        &dir.join(report::VALIDATION_REPORT),
        &report::validation_report(&outcome.raw_validation, &outcome.clean_validation),
    )?;
    write_text(
        &dir.join(report::CLEANING_LOG),
        &report::cleaning_log(&outcome.cleaning, &outcome.convergence),
    )?;
    write_text(&dir.join(report::PII_REPORT), &report::pii_report(&outcome.pii))?;
    write_text(
        &dir.join(report::MASKED_SAMPLE),
        &report::masked_sample(outcome.cleaned_table(), outcome.masked_table(), args.sample_rows),
    )?;

    match args.format {
        ReportFormat::Text => write_text(
            &dir.join(report::EXECUTION_REPORT),
            &report::execution_report(outcome),
        ),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(outcome)
                .context("Failed to serialize pipeline report")?;
            write_text(&dir.join(report::JSON_REPORT), &json)
        }
    }
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_table(&mut writer, table).with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = table.len(), "wrote csv");
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote report");
    Ok(())
}
