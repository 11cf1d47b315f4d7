//! # Pipeline Orchestration
//!
//! Runs the stages in order (profile, validate raw, clean, validate cleaned,
//! classify PII, mask) over one in-memory table and collects every result
//! into a [`PipelineReport`]. A run always completes once the schema is
//! accepted; whether the data is "clean enough" is a reporting judgment.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::clean::{clean, CleanResult, Convergence, MissingPolicies};
use crate::error::Result;
use crate::mask::{mask, MaskedTable};
use crate::pii::{classify_pii, PiiResult};
use crate::profile::{profile, TableProfile};
use crate::schema::SchemaModel;
use crate::table::Table;
use crate::validate::{validate, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Profile,
    ValidateRaw,
    Clean,
    ValidateClean,
    DetectPii,
    Mask,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Profile,
        Stage::ValidateRaw,
        Stage::Clean,
        Stage::ValidateClean,
        Stage::DetectPii,
        Stage::Mask,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Profile => "PROFILE",
            Stage::ValidateRaw => "VALIDATE_RAW",
            Stage::Clean => "CLEAN",
            Stage::ValidateClean => "VALIDATE_CLEAN",
            Stage::DetectPii => "DETECT_PII",
            Stage::Mask => "MASK",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Ok,
    /// The stage ran but found problems in the data.
    Issues,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Ok => write!(f, "OK"),
            StageStatus::Issues => write!(f, "ISSUES"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub schema_fingerprint: String,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub stages: Vec<StageRecord>,
    pub profile: TableProfile,
    pub raw_validation: ValidationResult,
    pub cleaning: CleanResult,
    pub clean_validation: ValidationResult,
    pub convergence: Convergence,
    pub pii: PiiResult,
    pub masked: MaskedTable,
}

impl PipelineReport {
    /// No failing rows remain after cleaning.
    pub fn is_clean(&self) -> bool {
        self.clean_validation.is_clean()
    }

    pub fn cleaned_table(&self) -> &Table {
        &self.cleaning.table
    }

    pub fn masked_table(&self) -> &Table {
        &self.masked.table
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Stage-progress callback, called before each stage with its 1-based index.
pub trait StageObserver {
    fn on_stage_start(&mut self, _index: usize, _stage: Stage) {}
    fn on_stage_end(&mut self, _record: &StageRecord) {}
}

/// Observer that does nothing.
pub struct Silent;

impl StageObserver for Silent {}

pub struct Pipeline {
    schema: SchemaModel,
    policies: MissingPolicies,
}

impl Pipeline {
    pub fn new(schema: SchemaModel, policies: MissingPolicies) -> Self {
        Self { schema, policies }
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn policies(&self) -> &MissingPolicies {
        &self.policies
    }

    pub fn run(&self, raw: &Table) -> Result<PipelineReport> {
        self.run_with(raw, &mut Silent)
    }

    /// Run every stage over `raw`, reporting progress to `observer`.
    pub fn run_with(
        &self,
        raw: &Table,
        observer: &mut dyn StageObserver,
    ) -> Result<PipelineReport> {
        self.schema.check()?;
        self.policies.check(&self.schema)?;

        let started_at = Local::now();
        let run_start = Instant::now();
        let mut stages = Vec::with_capacity(Stage::ALL.len());
        let mut tracker = StageTracker {
            observer,
            stages: &mut stages,
        };

        let profile = tracker.run(Stage::Profile, || {
            let p = profile(raw, &self.schema);
            let detail = format!(
                "({} rows, {} columns, {} non-canonical values)",
                p.row_count,
                p.column_count,
                p.non_canonical_total()
            );
            Ok((p, StageStatus::Ok, detail))
        })?;

        let raw_validation = tracker.run(Stage::ValidateRaw, || {
            let v = validate(raw, &self.schema)?;
            Ok(validation_outcome(v))
        })?;

        let cleaning = tracker.run(Stage::Clean, || {
            let c = clean(raw, &self.schema, &self.policies)?;
            let status = if c.unresolved.is_empty() {
                StageStatus::Ok
            } else {
                StageStatus::Issues
            };
            let detail = format!(
                "({} rows, {} corrections, {} unresolved, {} dropped)",
                c.table.len(),
                c.corrections.len(),
                c.unresolved.len(),
                c.rows_dropped
            );
            Ok((c, status, detail))
        })?;

        let clean_validation = tracker.run(Stage::ValidateClean, || {
            let v = validate(&cleaning.table, &self.schema)?;
            Ok(validation_outcome(v))
        })?;

        let convergence = Convergence::between(&raw_validation, &clean_validation);
        if !convergence.converged() {
            tracing::warn!(
                before = convergence.before,
                after = convergence.after,
                "cleaning increased the number of failing rows"
            );
        }

        let pii = tracker.run(Stage::DetectPii, || {
            let p = classify_pii(&cleaning.table, &self.schema);
            let detail = format!(
                "({} matches, {} high-risk rows, risk {})",
                p.matches.len(),
                p.high_risk_rows.len(),
                p.risk
            );
            Ok((p, StageStatus::Ok, detail))
        })?;

        let masked = tracker.run(Stage::Mask, || {
            let m = mask(&cleaning.table, &pii);
            let detail = format!("({} rows masked, {} values)", m.table.len(), m.masked_values);
            Ok((m, StageStatus::Ok, detail))
        })?;

        let report = PipelineReport {
            schema_fingerprint: self.schema.fingerprint(),
            started_at,
            elapsed: run_start.elapsed(),
            stages,
            profile,
            raw_validation,
            cleaning,
            clean_validation,
            convergence,
            pii,
            masked,
        };

        tracing::info!(
            clean = report.is_clean(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline complete"
        );
        Ok(report)
    }
}

fn validation_outcome(v: ValidationResult) -> (ValidationResult, StageStatus, String) {
    let status = if v.is_clean() {
        StageStatus::Ok
    } else {
        StageStatus::Issues
    };
    let detail = format!("({} passed, {} issues)", v.pass_count, v.fail_count);
    (v, status, detail)
}

struct StageTracker<'a> {
    observer: &'a mut dyn StageObserver,
    stages: &'a mut Vec<StageRecord>,
}

impl StageTracker<'_> {
    fn run<T>(
        &mut self,
        stage: Stage,
        body: impl FnOnce() -> Result<(T, StageStatus, String)>,
    ) -> Result<T> {
        let index = self.stages.len() + 1;
        self.observer.on_stage_start(index, stage);
        let started_at = Local::now();
        let start = Instant::now();

        let (value, status, detail) = body()?;

        let record = StageRecord {
            stage,
            status,
            detail,
            started_at,
            elapsed: start.elapsed(),
        };
        tracing::info!(stage = %record.stage, status = %record.status, "{}", record.detail);
        self.observer.on_stage_end(&record);
        self.stages.push(record);
        Ok(value)
    }
}
