//! Font file sanity check.
//!
//! One font file, checked in order: existence, permissions, size, naming.
//! If the HTML entry document exists, its `<link rel="preload">` wiring and
//! `font-display` rule are checked too. A fixed list of best-practice
//! recommendations is attached to every result.

use crate::config::FontConfig;
use crate::types::{Issue, Stats, ValidationResult};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

static LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid regex"));
static PRELOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)rel\s*=\s*["']preload["']"#).expect("valid regex"));
static CROSSORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcrossorigin\b").expect("valid regex"));
static FONT_DISPLAY_SWAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"font-display:\s*swap").expect("valid regex"));

/// Owner-read and world-read bits.
const READABLE_BITS: u32 = 0o404;

const RECOMMENDATIONS: &[&str] = &[
    "Serve fonts as WOFF2 only; every supported browser reads it.",
    "Preload the primary font: <link rel=\"preload\" href=\"/fonts/Inter-Variable.woff2\" as=\"font\" type=\"font/woff2\" crossorigin>",
    "Use font-display: swap so text renders before the font arrives.",
    "Subset the font to the scripts the site ships (Latin + Latin Extended covers en/es).",
    "Serve fonts with a long-lived immutable Cache-Control header.",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontStats {
    pub size_bytes: u64,
    /// Permission bits as an octal string, e.g. `"644"`. Unix only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub html_checked: bool,
}

impl Stats for FontStats {
    fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!("Font size: {}", crate::output::format_bytes(self.size_bytes))];
        if let Some(mode) = &self.mode {
            lines.push(format!("Permissions: {mode}"));
        }
        if !self.html_checked {
            lines.push("HTML preload wiring: not checked (no HTML file)".to_string());
        }
        lines
    }
}

pub const REMEDIATION: &[&str] = &[
    "Restore the font and make it readable:",
    "    chmod 644 public/fonts/Inter-Variable.woff2",
];

/// Validate the font at `font`, and its wiring in `html` if that file exists.
pub fn validate_font(font: &Path, html: &Path, config: &FontConfig) -> ValidationResult<FontStats> {
    let mut result = ValidationResult::<FontStats>::default();
    result.recommendations = RECOMMENDATIONS.iter().map(|r| r.to_string()).collect();
    let label = font.to_string_lossy().into_owned();

    let meta = match std::fs::metadata(font) {
        Ok(meta) => meta,
        Err(_) => {
            result.push(Issue::error(&label, "Font file not found"));
            return result;
        }
    };
    if !meta.is_file() {
        result.push(Issue::error(&label, "Font path exists but is not a regular file"));
        return result;
    }

    check_permissions(&meta, &label, config, &mut result);

    let size = meta.len();
    result.stats.size_bytes = size;
    if size == 0 {
        result.push(Issue::error(&label, "Font file is empty"));
    } else if size > config.max_bytes {
        result.push(Issue::warning(
            &label,
            format!(
                "Font file is large: {size} bytes (recommended under {})",
                config.max_bytes
            ),
        ));
    } else if size < config.min_bytes {
        result.push(Issue::warning(
            &label,
            format!("Font file is suspiciously small: {size} bytes (may be truncated)"),
        ));
    }

    let name = font
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !name.ends_with(".woff2") {
        result.push(Issue::warning(&label, "Font is not WOFF2: convert for best compression"));
    }
    if name.contains(' ') {
        result.push(Issue::warning(&label, "Font filename contains a space"));
    }

    if html.is_file() {
        match std::fs::read_to_string(html) {
            Ok(content) => {
                result.stats.html_checked = true;
                let html_label = html.to_string_lossy().into_owned();
                result.extend(check_html(&content, &name, &html_label));
            }
            Err(e) => tracing::warn!("cannot read {}: {e}", html.display()),
        }
    } else {
        tracing::debug!("no HTML at {}, skipping preload checks", html.display());
    }

    result
}

#[cfg(unix)]
fn check_permissions(
    meta: &std::fs::Metadata,
    label: &str,
    config: &FontConfig,
    result: &mut ValidationResult<FontStats>,
) {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode() & 0o777;
    result.stats.mode = Some(format!("{mode:o}"));
    if mode & READABLE_BITS != READABLE_BITS {
        result.push(Issue::error(
            label,
            format!("Font file is not readable by owner and others (mode {mode:o})"),
        ));
        return;
    }
    // Already range-checked by ToolsConfig::validate.
    let recommended = u32::from_str_radix(&config.recommended_mode, 8).unwrap_or(0o644);
    if mode != recommended {
        result.push(Issue::warning(
            label,
            format!(
                "Font permissions are {mode:o}, recommended {}",
                config.recommended_mode
            ),
        ));
    }
}

#[cfg(not(unix))]
fn check_permissions(
    _meta: &std::fs::Metadata,
    _label: &str,
    _config: &FontConfig,
    _result: &mut ValidationResult<FontStats>,
) {
}

/// Check the HTML document loads `font_name` early and with the right attributes.
pub fn check_html(html: &str, font_name: &str, label: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let preloads: Vec<&str> = LINK_TAG
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|tag| PRELOAD.is_match(tag) && tag.contains(font_name))
        .collect();

    if preloads.is_empty() {
        issues.push(Issue::warning(
            label,
            format!("No <link rel=\"preload\"> for {font_name}"),
        ));
    } else if !preloads.iter().any(|tag| CROSSORIGIN.is_match(tag)) {
        issues.push(Issue::warning(
            label,
            "Font preload link is missing the crossorigin attribute",
        ));
    }
    if !FONT_DISPLAY_SWAP.is_match(html) {
        issues.push(Issue::warning(label, "No font-display: swap rule found"));
    }
    issues
}
