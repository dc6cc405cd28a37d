//! CLI output formatting for every component.
//!
//! # Report layout
//!
//! Findings are grouped by severity, each attributed to a file (and line,
//! when known) with the offending snippet indented beneath it:
//!
//! ```text
//! ==> Hero images
//! Errors (1)
//!     components/Hero.tsx:2  Direct import of hero image 'hero-banner.png': ...
//!         > import banner from './hero-banner.png';
//! Warnings (1)
//!     components/Hero.tsx:14  <picture> sources have no sizes attribute
//!
//! Summary
//!     Files scanned: 3 (1 hero components)
//!     Responsive variant sets: 6/6 complete
//!     1 error, 1 warning: FAILED
//!
//! How to fix
//!     Serve hero images through <picture> with modern formats:
//!     ...
//! ```
//!
//! The "How to fix" block only appears on failure. `--format json` replaces
//! all of this with the serialized result.
//!
//! ## Optimizer progress
//!
//! ```text
//! Optimizing 3 images
//! 001 hero-banner.png
//!     source: 412.0 KiB -> 268.3 KiB (-35%)
//!     webp: created (96.1 KiB)
//!     avif: exists
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::ImageKind;
use crate::optimize::{FileReport, OptimizeEvent, OptimizeSummary, SourceOutcome, VariantOutcome};
use crate::types::{Issue, Stats, ValidationResult};
use serde::Serialize;

/// How reports are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
}

/// Longest snippet shown under an issue.
const MAX_SNIPPET: usize = 120;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// Human-readable byte count, e.g. `512.0 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

// ============================================================================
// Validation reports
// ============================================================================

/// One issue: `file:line  message`, plus the snippet if any.
fn issue_lines(issue: &Issue) -> Vec<String> {
    let location = match issue.line {
        Some(line) => format!("{}:{line}", issue.file),
        None => issue.file.clone(),
    };
    let mut lines = vec![format!("{}{location}  {}", indent(1), issue.message)];
    if let Some(code) = &issue.code {
        lines.push(format!("{}> {}", indent(2), truncate(code, MAX_SNIPPET)));
    }
    lines
}

/// Format a full report for one component run.
///
/// `remediation` is printed under "How to fix" when the run failed.
pub fn format_report<S: Stats>(
    title: &str,
    result: &ValidationResult<S>,
    remediation: &[&str],
) -> Vec<String> {
    let mut lines = vec![format!("==> {title}")];

    if !result.errors.is_empty() {
        lines.push(format!("Errors ({})", result.errors.len()));
        lines.extend(result.errors.iter().flat_map(issue_lines));
    }
    if !result.warnings.is_empty() {
        lines.push(format!("Warnings ({})", result.warnings.len()));
        lines.extend(result.warnings.iter().flat_map(issue_lines));
    }
    if !result.recommendations.is_empty() {
        lines.push("Recommendations".to_string());
        lines.extend(
            result
                .recommendations
                .iter()
                .map(|r| format!("{}- {r}", indent(1))),
        );
    }

    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.extend(result.stats.summary().iter().map(|s| format!("{}{s}", indent(1))));
    let verdict = if result.is_valid() { "passed" } else { "FAILED" };
    lines.push(format!(
        "{}{}, {}: {verdict}",
        indent(1),
        plural(result.errors.len(), "error"),
        plural(result.warnings.len(), "warning"),
    ));

    if !result.is_valid() && !remediation.is_empty() {
        lines.push(String::new());
        lines.push("How to fix".to_string());
        lines.extend(remediation.iter().map(|r| {
            if r.is_empty() {
                String::new()
            } else {
                format!("{}{r}", indent(1))
            }
        }));
    }
    lines
}

#[derive(Serialize)]
struct JsonReport<'a, S: Serialize> {
    component: &'a str,
    is_valid: bool,
    #[serde(flatten)]
    result: &'a ValidationResult<S>,
}

/// Serialize a result for machine consumption.
pub fn format_json<S: Serialize>(
    component: &str,
    result: &ValidationResult<S>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        component,
        is_valid: result.is_valid(),
        result,
    })
}

/// Print a report to stdout in the requested format.
pub fn print_report<S: Stats>(
    format: ReportFormat,
    title: &str,
    result: &ValidationResult<S>,
    remediation: &[&str],
) -> Result<(), serde_json::Error> {
    match format {
        ReportFormat::Human => print_lines(&format_report(title, result, remediation)),
        ReportFormat::Json => println!("{}", format_json(title, result)?),
    }
    Ok(())
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Optimizer progress
// ============================================================================

fn source_line(outcome: &SourceOutcome) -> String {
    match outcome {
        SourceOutcome::TooSmall { size } => {
            format!("skipped ({} is under the re-compression threshold)", format_bytes(*size))
        }
        SourceOutcome::Animated => "skipped (GIF, not re-encoded)".to_string(),
        SourceOutcome::Variant => "skipped (generated variant)".to_string(),
        SourceOutcome::AlreadyOptimized { quality } => {
            format!("skipped (already at quality {quality})")
        }
        SourceOutcome::Reduced { before, after } => {
            let pct = 100.0 * (*before - *after) as f64 / *before as f64;
            format!(
                "{} -> {} (-{pct:.0}%)",
                format_bytes(*before),
                format_bytes(*after)
            )
        }
        SourceOutcome::NotSmaller { .. } => "kept (re-encode did not save enough)".to_string(),
        SourceOutcome::Failed { reason } => format!("failed: {reason}"),
    }
}

fn variant_line(format: ImageKind, outcome: &VariantOutcome) -> String {
    let status = match outcome {
        VariantOutcome::Existing => "exists".to_string(),
        VariantOutcome::Created { size } => format!("created ({})", format_bytes(*size)),
        VariantOutcome::Failed { reason } => format!("failed: {reason}"),
    };
    format!("{}: {status}", format.extension())
}

fn file_report_lines(report: &FileReport) -> Vec<String> {
    let mut lines = vec![format!("{} {}", format_index(report.index), report.path)];
    lines.push(format!("{}source: {}", indent(1), source_line(&report.source)));
    for variant in &report.variants {
        lines.push(format!(
            "{}{}",
            indent(1),
            variant_line(variant.format, &variant.outcome)
        ));
    }
    lines
}

/// Format a single optimizer progress event as display lines.
pub fn format_optimize_event(event: &OptimizeEvent) -> Vec<String> {
    match event {
        OptimizeEvent::Started { total } => vec![format!("Optimizing {}", plural(*total, "image"))],
        OptimizeEvent::FileDone(report) => file_report_lines(report),
    }
}

pub fn format_optimize_summary(summary: &OptimizeSummary) -> Vec<String> {
    vec![
        String::new(),
        "Summary".to_string(),
        format!(
            "{}{} processed, {} re-compressed, {} saved",
            indent(1),
            plural(summary.files, "file"),
            summary.reduced,
            format_bytes(summary.bytes_saved)
        ),
        format!(
            "{}{} created, {}",
            indent(1),
            plural(summary.variants_created, "variant"),
            plural(summary.failures, "failure")
        ),
    ]
}

// ============================================================================
// Tests
// ============================================================================
