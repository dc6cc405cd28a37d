//! Generic image usage audit: every framework image needs explicit sizing.
//!
//! For each source file:
//!
//! - If it does not import the image component, every raw `<img>` is a
//!   warning (migrate to the component).
//! - Otherwise each `<Image ...>` usage (reassembled across up to 20 lines)
//!   needs `width` and `height`, or `fill`. `fill` without `sizes` is a
//!   warning, as is a hero/banner file whose image has no priority hint.
//!
//! Like the hero audit this is line-oriented pattern matching, not a JSX
//! parser.

use crate::config::UsageConfig;
use crate::types::{Issue, Stats, ValidationResult};
use crate::walk::{collect_sources, display_path};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

const SOURCE_EXTENSIONS: &[&str] = &["tsx", "jsx", "ts", "js"];
const TAG_WINDOW: usize = 20;

static RAW_IMG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img\b").expect("valid regex"));
static WIDTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bwidth=").expect("valid regex"));
static HEIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bheight=").expect("valid regex"));
static FILL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfill\b").expect("valid regex"));
static PRIORITY_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpriority\b|fetchPriority").expect("valid regex"));

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Invalid image module pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub files_scanned: usize,
    pub image_components: usize,
    pub raw_img_tags: usize,
}

impl Stats for UsageStats {
    fn summary(&self) -> Vec<String> {
        vec![format!(
            "Files scanned: {} ({} image components, {} raw <img> tags)",
            self.files_scanned, self.image_components, self.raw_img_tags
        )]
    }
}

pub const REMEDIATION: &[&str] = &[
    "Give every image explicit dimensions, or fill a sized container:",
    "",
    "    <Image src=\"/images/dashboard.png\" alt=\"Dashboard\" width={1200} height={800} />",
    "    <Image src=\"/images/kitchen.png\" alt=\"Kitchen\" fill sizes=\"(max-width: 768px) 100vw, 50vw\" />",
];

/// Paths that suggest above-the-fold content.
fn is_above_the_fold(rel: &str) -> bool {
    let lower = rel.to_ascii_lowercase();
    ["hero", "banner", "above-the-fold"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Scans source text for image component usage.
///
/// Built once per run from [`UsageConfig`]; the import pattern depends on
/// the configured module.
pub struct UsageAuditor {
    import: Regex,
}

impl UsageAuditor {
    pub fn new(config: &UsageConfig) -> Result<Self, UsageError> {
        let import = Regex::new(&format!(
            r#"import\s+(\w+)\s+from\s+['"]{}['"]"#,
            regex::escape(&config.image_module)
        ))?;
        Ok(Self { import })
    }

    /// Local name the image component is imported under, if any.
    fn component_name<'a>(&self, content: &'a str) -> Option<&'a str> {
        self.import
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Audit one file's text. `rel` is used for attribution and the
    /// above-the-fold heuristic.
    pub fn audit_source(&self, rel: &str, content: &str, stats: &mut UsageStats) -> Vec<Issue> {
        let lines: Vec<&str> = content.lines().collect();
        let Some(component) = self.component_name(content) else {
            return self.audit_raw_tags(rel, &lines, stats);
        };

        let opening = match Regex::new(&format!(r"<{}\b", regex::escape(component))) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("{rel}: cannot match component {component}: {e}");
                return Vec::new();
            }
        };
        let above_fold = is_above_the_fold(rel);
        let mut issues = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !opening.is_match(line) {
                continue;
            }
            stats.image_components += 1;
            let tag = tag_text(&lines, i);
            let line_no = i + 1;
            let sized = WIDTH.is_match(&tag) && HEIGHT.is_match(&tag);
            let fill = FILL.is_match(&tag);

            if !sized && !fill {
                issues.push(
                    Issue::error(
                        rel,
                        format!("<{component}> is missing width/height (or fill): causes layout shift"),
                    )
                    .at_line(line_no)
                    .with_code(line.trim()),
                );
            }
            if fill && !tag.contains("sizes=") {
                issues.push(
                    Issue::warning(
                        rel,
                        format!("<{component} fill> should set sizes so the browser picks the right candidate"),
                    )
                    .at_line(line_no)
                    .with_code(line.trim()),
                );
            }
            if above_fold && !PRIORITY_HINT.is_match(&tag) {
                issues.push(
                    Issue::warning(
                        rel,
                        format!("Above-the-fold <{component}> should set priority or fetchPriority"),
                    )
                    .at_line(line_no)
                    .with_code(line.trim()),
                );
            }
        }
        issues
    }

    fn audit_raw_tags(&self, rel: &str, lines: &[&str], stats: &mut UsageStats) -> Vec<Issue> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| RAW_IMG.is_match(line))
            .map(|(i, line)| {
                stats.raw_img_tags += 1;
                Issue::warning(rel, "Raw <img> tag: consider the framework Image component")
                    .at_line(i + 1)
                    .with_code(line.trim())
            })
            .collect()
    }
}

/// True when `line` ends the tag: a `/>`, or a trailing `>` that is not the
/// arrow of an inline handler such as `onLoad={() =>`.
fn closes_tag(line: &str) -> bool {
    let trimmed = line.trim_end();
    line.contains("/>") || (trimmed.ends_with('>') && !trimmed.ends_with("=>"))
}

/// The tag starting at `lines[start]`, up to the line that closes it.
fn tag_text(lines: &[&str], start: usize) -> String {
    let mut out = Vec::new();
    for line in lines.iter().skip(start).take(TAG_WINDOW) {
        out.push(*line);
        if closes_tag(line) {
            break;
        }
    }
    out.join("\n")
}

/// Audit every source file under `src_dir`.
pub fn validate_image_usage(
    src_dir: &Path,
    config: &UsageConfig,
) -> Result<ValidationResult<UsageStats>, UsageError> {
    if !src_dir.is_dir() {
        return Err(UsageError::SourceNotFound(src_dir.to_path_buf()));
    }
    let auditor = UsageAuditor::new(config)?;
    let mut result = ValidationResult::<UsageStats>::default();

    for path in collect_sources(src_dir, SOURCE_EXTENSIONS) {
        let rel = display_path(&path, src_dir);
        result.stats.files_scanned += 1;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let issues = auditor.audit_source(&rel, &content, &mut result.stats);
                result.extend(issues);
            }
            Err(e) => {
                tracing::warn!("cannot read {rel}: {e}");
                result.push(Issue::warning(rel, format!("Could not read file: {e}")));
            }
        }
    }
    Ok(result)
}
