//! Plain-text renderings of the pipeline results.
//!
//! Each function is pure: it takes a result structure and returns the text
//! written to one report file.

use std::fmt::Write;

use scrubkit_core::clean::{CleanResult, Convergence, Outcome};
use scrubkit_core::pii::{ExposureRisk, PiiResult};
use scrubkit_core::pipeline::PipelineReport;
use scrubkit_core::profile::TableProfile;
use scrubkit_core::schema::{Constraint, PiiCategory};
use scrubkit_core::table::Table;
use scrubkit_core::validate::ValidationResult;

const RULE: &str = "----------------------------------------";

/// Violations listed per validation section before truncating.
const MAX_LISTED_ROWS: usize = 10;

pub const CLEANED_CSV: &str = "customers_cleaned.csv";
pub const MASKED_CSV: &str = "customers_masked.csv";
pub const QUALITY_REPORT: &str = "data_quality_report.txt";
pub const VALIDATION_REPORT: &str = "validation_results.txt";
pub const CLEANING_LOG: &str = "cleaning_log.txt";
pub const PII_REPORT: &str = "pii_detection_report.txt";
pub const MASKED_SAMPLE: &str = "masked_sample.txt";
pub const EXECUTION_REPORT: &str = "pipeline_execution_report.txt";
pub const JSON_REPORT: &str = "report.json";

/// Every file `scrubkit run` writes, with a one-line description.
pub const DELIVERABLES: &[(&str, &str)] = &[
    (QUALITY_REPORT, "Data profiling results"),
    (VALIDATION_REPORT, "Validation outcomes"),
    (CLEANING_LOG, "Cleaning actions applied"),
    (PII_REPORT, "PII exposure analysis"),
    (MASKED_SAMPLE, "Before/after comparison"),
    (CLEANED_CSV, "Cleaned dataset"),
    (MASKED_CSV, "Masked dataset"),
    (EXECUTION_REPORT, "This report"),
];

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}:", title);
    let _ = writeln!(out, "{}", RULE);
}

fn completeness_status(pct: f64) -> &'static str {
    if pct >= 80.0 {
        "[OK]"
    } else if pct >= 50.0 {
        "[WARN]"
    } else {
        "[FAIL]"
    }
}

pub fn quality_report(profile: &TableProfile) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA QUALITY PROFILE REPORT");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Rows: {}", profile.row_count);
    let _ = writeln!(out, "Total Columns: {}", profile.column_count);

    section(&mut out, "COMPLETENESS");
    for col in profile.columns.values() {
        let _ = writeln!(
            out,
            "  {} {}: {:.1}% ({}/{})",
            completeness_status(col.completeness),
            col.name,
            col.completeness,
            col.non_missing,
            profile.row_count
        );
    }

    section(&mut out, "DATA TYPES");
    for col in profile.columns.values() {
        let mismatched = col.non_missing - col.conforming;
        if mismatched == 0 {
            let _ = writeln!(out, "  [OK] {}: {}", col.name, col.logical_type);
        } else {
            let _ = writeln!(
                out,
                "  [FAIL] {}: {} values should be {}",
                col.name, mismatched, col.logical_type
            );
        }
    }

    section(&mut out, "UNIQUENESS AND RANGES");
    for col in profile.columns.values() {
        let _ = write!(
            out,
            "  {}: {} distinct, {} duplicates",
            col.name, col.distinct, col.duplicates
        );
        if let (Some(min), Some(max)) = (col.min, col.max) {
            let _ = write!(out, ", min {}, max {}", min, max);
        }
        let _ = writeln!(out);
    }

    section(&mut out, "FORMAT ISSUES");
    let mut any = false;
    for col in profile.columns.values().filter(|c| c.non_canonical > 0) {
        any = true;
        let _ = writeln!(
            out,
            "  {}: {} values not in canonical form",
            col.name, col.non_canonical
        );
    }
    if !any {
        let _ = writeln!(out, "  none");
    }
    let _ = writeln!(out, "  Total: {}", profile.non_canonical_total());
    out
}

fn validation_section(out: &mut String, title: &str, result: &ValidationResult, empty_note: &str) {
    section(out, title);
    let _ = writeln!(out, "Total rows: {}", result.total_rows);
    let _ = writeln!(out, "Passed: {}", result.pass_count);
    let _ = writeln!(out, "Failed: {}", result.fail_count);
    let _ = writeln!(out, "Pass rate: {:.1}%", result.pass_rate());

    if result.is_clean() {
        let _ = writeln!(out, "{}", empty_note);
        return;
    }

    let _ = writeln!(out);
    let mut rows: Vec<usize> = result.violations.iter().map(|v| v.row_index).collect();
    rows.dedup();
    for row in rows.iter().take(MAX_LISTED_ROWS) {
        let issues: Vec<String> = result
            .violations_for(*row)
            .map(|v| format!("{}: {}", v.column, v.reason))
            .collect();
        // Row numbers are 1-based in reports.
        let _ = writeln!(out, "  Row {}: {}", row + 1, issues.join(", "));
    }
    if rows.len() > MAX_LISTED_ROWS {
        let _ = writeln!(out, "  ... and {} more rows", rows.len() - MAX_LISTED_ROWS);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "By rule:");
    for (rule, count) in result.counts_by_rule() {
        let _ = writeln!(out, "  - {}: {}", rule, count);
    }
}

pub fn validation_report(raw: &ValidationResult, cleaned: &ValidationResult) -> String {
    let mut out = String::new();
    heading(&mut out, "VALIDATION RESULTS");
    validation_section(&mut out, "RAW DATA VALIDATION", raw, "No issues found.");
    validation_section(
        &mut out,
        "CLEANED DATA VALIDATION",
        cleaned,
        "All data validated successfully.",
    );
    out
}

pub fn cleaning_log(cleaning: &CleanResult, convergence: &Convergence) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA CLEANING LOG");
    let _ = writeln!(out);
    let processed = cleaning.table.len() + cleaning.rows_dropped;
    let _ = writeln!(out, "Processed: {} rows", processed);
    let _ = writeln!(out, "Rows dropped: {}", cleaning.rows_dropped);
    let _ = writeln!(out, "Output rows: {}", cleaning.table.len());

    section(&mut out, "ACTIONS TAKEN");
    let counts = cleaning.counts_by_rule();
    if counts.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for (rule, count) in &counts {
        let _ = writeln!(out, "  - {}: {} items affected", rule, count);
    }

    section(&mut out, "AUDIT TRAIL");
    for entry in cleaning.log() {
        let _ = writeln!(
            out,
            "  Row {} {} [{} {}]: '{}' -> '{}'",
            entry.row_index + 1,
            entry.column,
            entry.rule,
            entry.outcome,
            entry.original.render(),
            entry.new.render()
        );
    }

    let unresolved = cleaning
        .unresolved
        .iter()
        .filter(|c| c.outcome == Outcome::Unresolved)
        .count();
    section(&mut out, "VALIDATION AFTER CLEANING");
    let _ = writeln!(out, "Failing rows before: {}", convergence.before);
    let _ = writeln!(out, "Failing rows after: {}", convergence.after);
    let _ = writeln!(out, "Unresolved values: {}", unresolved);
    let _ = writeln!(out, "(See {} for details)", VALIDATION_REPORT);
    let _ = writeln!(out);
    let _ = writeln!(out, "Output: {}", CLEANED_CSV);
    let _ = writeln!(out, "  - Rows: {}", cleaning.table.len());
    let _ = writeln!(out, "  - Columns: {}", cleaning.table.column_count());
    out
}

fn category_label(category: PiiCategory) -> &'static str {
    match category {
        PiiCategory::Name => "Names",
        PiiCategory::Email => "Emails",
        PiiCategory::Phone => "Phone numbers",
        PiiCategory::Address => "Addresses",
        PiiCategory::DateOfBirth => "Dates of birth",
    }
}

pub fn pii_report(pii: &PiiResult) -> String {
    let mut out = String::new();
    heading(&mut out, "PII DETECTION REPORT");

    section(&mut out, "DETECTED PII");
    for (category, stats) in &pii.per_category {
        let _ = writeln!(
            out,
            "- {} found: {} ({:.1}%)",
            category_label(*category),
            stats.matched_count,
            stats.percentage
        );
    }
    let _ = writeln!(out, "- High-risk rows: {}", pii.high_risk_rows.len());

    section(&mut out, "COLUMNS");
    for (column, category) in &pii.columns {
        let _ = writeln!(out, "- {}: {}", column, category);
    }

    section(&mut out, "EXPOSURE RISK");
    let _ = writeln!(out, "Overall: {}", pii.risk);
    let exposure = |category: PiiCategory| pii.stats(category).percentage > 50.0;
    let _ = writeln!(out, "If this dataset were breached, attackers could:");
    let _ = writeln!(
        out,
        "{}",
        if exposure(PiiCategory::Email) {
            "- Phish customers (have emails)"
        } else {
            "- Limited phishing capability (few emails)"
        }
    );
    let _ = writeln!(
        out,
        "{}",
        if exposure(PiiCategory::Address) {
            "- Spoof identities (have names, dates of birth and addresses)"
        } else {
            "- Limited identity spoofing"
        }
    );
    let _ = writeln!(
        out,
        "{}",
        if exposure(PiiCategory::Phone) {
            "- Social engineer (have phone numbers)"
        } else {
            "- Limited social engineering"
        }
    );

    section(&mut out, "MITIGATION");
    if pii.risk == ExposureRisk::Low && pii.matches.is_empty() {
        let _ = writeln!(out, "[OK] No PII detected");
    } else {
        let _ = writeln!(out, "[OK] All detected PII masked in {}", MASKED_CSV);
    }
    out
}

fn csv_line(table: &Table, row: usize) -> String {
    table
        .columns()
        .iter()
        .map(|c| table.get(row, c).map(|v| v.render()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// First `rows` rows before and after masking, plus a summary of the rules.
pub fn masked_sample(before: &Table, after: &Table, rows: usize) -> String {
    let wide = "-".repeat(80);
    let mut out = String::new();

    for (label, table) in [("BEFORE", before), ("AFTER", after)] {
        let _ = writeln!(out, "{} MASKING (first {} rows):", label, rows);
        let _ = writeln!(out, "{}", wide);
        let _ = writeln!(out, "{}", table.columns().join(","));
        for row in 0..rows.min(table.len()) {
            let _ = writeln!(out, "{}", csv_line(table, row));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "ANALYSIS:");
    let _ = writeln!(out, "{}", wide);
    let _ = writeln!(
        out,
        "- Data structure preserved: {} rows x {} columns",
        after.len(),
        after.column_count()
    );
    let _ = writeln!(out, "- PII masked:");
    let _ = writeln!(out, "  * Names: first letter + *** (e.g. 'J*** D***')");
    let _ = writeln!(out, "  * Emails: first char + *** @ domain (e.g. 'j***@gmail.com')");
    let _ = writeln!(out, "  * Phones: ***-***-XXXX where XXXX is the last 4 digits");
    let _ = writeln!(out, "  * Addresses: [MASKED ADDRESS]");
    let _ = writeln!(out, "  * Dates of birth: YYYY-**-**");
    let _ = writeln!(out, "- Columns without a PII category are unchanged");
    out
}

pub fn execution_report(report: &PipelineReport) -> String {
    let mut out = String::new();
    heading(&mut out, "PIPELINE EXECUTION REPORT");
    let _ = writeln!(out, "Timestamp: {}", report.started_at.to_rfc3339());
    let _ = writeln!(out, "Schema: {}", &report.schema_fingerprint[..16]);
    let _ = writeln!(out);

    for record in &report.stages {
        let _ = writeln!(
            out,
            "[{}] {:<15} {:<7} {} ({} ms)",
            record.started_at.format("%H:%M:%S"),
            record.stage.to_string(),
            record.status.to_string(),
            record.detail,
            record.elapsed.as_millis()
        );
    }

    section(&mut out, "DELIVERABLES CREATED");
    for (file, description) in DELIVERABLES {
        let _ = writeln!(out, "[OK] {} - {}", file, description);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Duration: {:.2} seconds", report.elapsed.as_secs_f64());
    let status = if report.is_clean() {
        "SUCCESS"
    } else {
        "COMPLETED WITH ISSUES"
    };
    let _ = writeln!(out, "STATUS: {}", status);
    out
}

/// Short human form of a constraint, for the schema listing.
pub fn describe_constraint(constraint: &Constraint) -> String {
    fn bound<T: std::fmt::Display>(v: &Option<T>) -> String {
        v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "*".to_string())
    }
    match constraint {
        Constraint::Range { min, max } => format!("range {}..{}", bound(min), bound(max)),
        Constraint::Length { min, max } => format!("length {}..{}", bound(min), bound(max)),
        Constraint::Pattern(p) => format!("pattern {}", p),
        Constraint::CharClass(class) => format!("chars {}", class),
        Constraint::AllowedValues(values) => format!("one of {}", values.join("|")),
        Constraint::MaxAge { years } => format!("age <= {}y", years),
        Constraint::NotInFuture => "not in future".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrubkit_core::clean::MissingPolicies;
    use scrubkit_core::pipeline::Pipeline;
    use scrubkit_testutil::{pinned_customer_schema, sample_raw_table};

    fn sample_report() -> PipelineReport {
        let schema = pinned_customer_schema();
        let policies = MissingPolicies::defaults_for(&schema);
        Pipeline::new(schema, policies)
            .run(&sample_raw_table())
            .expect("pipeline runs on the sample table")
    }

    #[test]
    fn test_quality_report_lists_every_column() {
        let report = sample_report();
        let text = quality_report(&report.profile);
        assert!(text.starts_with("DATA QUALITY PROFILE REPORT\n"));
        assert!(text.contains("Total Rows: 5"));
        for col in report.profile.columns.keys() {
            assert!(text.contains(col.as_str()), "missing column {}", col);
        }
        assert!(text.contains("[WARN] first_name") || text.contains("[OK] first_name"));
    }

    #[test]
    fn test_validation_report_shows_both_passes() {
        let report = sample_report();
        let text = validation_report(&report.raw_validation, &report.clean_validation);
        assert!(text.contains("RAW DATA VALIDATION:"));
        assert!(text.contains("CLEANED DATA VALIDATION:"));
        assert!(text.contains("Total rows: 5"));
        // The unparseable date survives cleaning.
        assert!(text.contains("date_of_birth"), "expected the invalid date to be listed");
    }

    #[test]
    fn test_validation_report_clean_note() {
        let clean = ValidationResult {
            total_rows: 3,
            pass_count: 3,
            fail_count: 0,
            violations: Vec::new(),
        };
        let text = validation_report(&clean, &clean);
        assert!(text.contains("All data validated successfully."));
        assert!(text.contains("Pass rate: 100.0%"));
    }

    #[test]
    fn test_cleaning_log_has_audit_entries() {
        let report = sample_report();
        let text = cleaning_log(&report.cleaning, &report.convergence);
        assert!(text.contains("Processed: 5 rows"));
        assert!(text.contains("'(555) 234-5678' -> '555-234-5678'"));
        assert!(text.contains("Unresolved values: "));
    }

    #[test]
    fn test_pii_report_coverage_lines() {
        let report = sample_report();
        let text = pii_report(&report.pii);
        assert!(text.contains("- Emails found: 5 (100.0%)"));
        assert!(text.contains("- Phone numbers found: 5 (100.0%)"));
        assert!(text.contains("Phish customers"));
    }

    #[test]
    fn test_masked_sample_truncates_rows() {
        let report = sample_report();
        let text = masked_sample(report.cleaned_table(), report.masked_table(), 2);
        assert!(text.contains("BEFORE MASKING (first 2 rows):"));
        assert!(text.contains("AFTER MASKING (first 2 rows):"));
        assert!(text.contains("***-***-4567"));
        assert!(text.contains("5 rows x 10 columns"));
        assert!(!text.contains("***-***-5678"), "third row must not be shown");
    }

    #[test]
    fn test_execution_report_lists_stages_and_deliverables() {
        let report = sample_report();
        let text = execution_report(&report);
        for stage in ["PROFILE", "VALIDATE_RAW", "CLEAN", "VALIDATE_CLEAN", "DETECT_PII", "MASK"] {
            assert!(text.contains(stage), "missing stage {}", stage);
        }
        for (file, _) in DELIVERABLES {
            assert!(text.contains(file), "missing deliverable {}", file);
        }
        assert!(text.contains("STATUS: COMPLETED WITH ISSUES"));
    }

    #[test]
    fn test_describe_constraint() {
        assert_eq!(
            describe_constraint(&Constraint::Range {
                min: Some(0.0),
                max: None
            }),
            "range 0..*"
        );
        assert_eq!(describe_constraint(&Constraint::NotInFuture), "not in future");
        assert_eq!(
            describe_constraint(&Constraint::AllowedValues(vec![
                "a".to_string(),
                "b".to_string()
            ])),
            "one of a|b"
        );
    }
}
