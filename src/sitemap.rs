//! Sitemap validation by string inspection.
//!
//! The document is never parsed as XML. Structure is checked with marker
//! searches and open/close tag counts, which catches truncation and gross
//! copy-paste damage but not misnested elements. Entries are pulled out with
//! regexes over `<loc>`, `<lastmod>`, `<priority>` and `<changefreq>`.
//!
//! Checks:
//!
//! - **Structure**: `<?xml` declaration, `<urlset>` root, sitemap namespace,
//!   balanced `<url>` and `<urlset>` tags.
//! - **URLs**: at least one, no duplicates, parseable, HTTPS, under the base
//!   URL, no spaces, at most `max_url_length` characters.
//! - **Required pages**: each of `required_pages` appears bare or under `/es`.
//! - **Metadata**: valid and not-future `lastmod`, `priority` in `[0, 1]`,
//!   `changefreq` from the protocol's seven values.

use crate::config::SitemapConfig;
use crate::types::{Issue, Severity, Stats, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const CHANGEFREQ_VALUES: &[&str] = &[
    "always", "hourly", "daily", "weekly", "monthly", "yearly", "never",
];

/// Prefix of the localized copy of every page.
const LOCALE_PREFIX: &str = "/es";

fn element(name: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{name}>\s*(.*?)\s*</{name}>")).expect("valid regex")
}

static LOC: LazyLock<Regex> = LazyLock::new(|| element("loc"));
static LASTMOD: LazyLock<Regex> = LazyLock::new(|| element("lastmod"));
static PRIORITY: LazyLock<Regex> = LazyLock::new(|| element("priority"));
static CHANGEFREQ: LazyLock<Regex> = LazyLock::new(|| element("changefreq"));
static URL_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<url[\s>]").expect("valid regex"));
static URLSET_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<urlset[\s>]").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SitemapStats {
    pub total_urls: usize,
    pub unique_urls: usize,
    pub duplicates: usize,
    pub https_urls: usize,
    pub http_urls: usize,
    pub external_urls: usize,
}

impl Stats for SitemapStats {
    fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "URLs: {} ({} unique, {} duplicates)",
                self.total_urls, self.unique_urls, self.duplicates
            ),
            format!(
                "HTTPS: {}, HTTP: {}, external: {}",
                self.https_urls, self.http_urls, self.external_urls
            ),
        ]
    }
}

pub const REMEDIATION: &[&str] = &[
    "Each entry should look like:",
    "",
    "    <url>",
    "      <loc>https://rayapp.io/pricing</loc>",
    "      <lastmod>2024-05-01</lastmod>",
    "      <changefreq>monthly</changefreq>",
    "      <priority>0.8</priority>",
    "    </url>",
    "",
    "Regenerate the sitemap after adding or removing pages.",
];

/// Read and validate the sitemap at `path`.
pub fn validate_sitemap(path: &Path, config: &SitemapConfig) -> ValidationResult<SitemapStats> {
    let label = path.to_string_lossy().into_owned();
    match std::fs::read_to_string(path) {
        Ok(content) => validate_sitemap_content(&content, &label, config, Utc::now()),
        Err(e) => {
            tracing::debug!("cannot read {label}: {e}");
            let message = match e.kind() {
                std::io::ErrorKind::NotFound => "Sitemap file not found".to_string(),
                _ => format!("Could not read sitemap: {e}"),
            };
            let mut result = ValidationResult::default();
            result.push(Issue::error(label, message));
            result
        }
    }
}

/// Validate sitemap text. `now` decides what counts as a future `lastmod`.
pub fn validate_sitemap_content(
    content: &str,
    label: &str,
    config: &SitemapConfig,
    now: DateTime<Utc>,
) -> ValidationResult<SitemapStats> {
    let mut result = ValidationResult::<SitemapStats>::default();
    if content.is_empty() {
        result.push(Issue::error(label, "Sitemap file is empty"));
        return result;
    }

    check_structure(content, label, &mut result);
    let urls = check_urls(content, label, config, &mut result);
    check_required_pages(&urls, label, config, &mut result);
    check_metadata(content, label, now, &mut result);
    result
}

/// 1-based line of a byte offset.
fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

fn check_structure(content: &str, label: &str, result: &mut ValidationResult<SitemapStats>) {
    if !content.contains("<?xml") {
        result.push(Issue::error(label, "Missing XML declaration (<?xml ...?>)"));
    }
    if !content.contains("<urlset") {
        result.push(Issue::error(label, "Missing <urlset> root element"));
    }
    if !content.contains(SITEMAP_NAMESPACE) {
        result.push(Issue::warning(
            label,
            format!("Missing sitemap namespace {SITEMAP_NAMESPACE}"),
        ));
    }

    let url_open = URL_OPEN.find_iter(content).count();
    let url_close = content.matches("</url>").count();
    if url_open != url_close {
        result.push(Issue::error(
            label,
            format!("Mismatched <url> tags: {url_open} opening vs {url_close} closing"),
        ));
    }
    let set_open = URLSET_OPEN.find_iter(content).count();
    let set_close = content.matches("</urlset>").count();
    if set_open != set_close {
        result.push(Issue::error(
            label,
            format!("Mismatched <urlset> tags: {set_open} opening vs {set_close} closing"),
        ));
    }
}

/// Run per-URL checks; returns the unique URLs in document order.
fn check_urls(
    content: &str,
    label: &str,
    config: &SitemapConfig,
    result: &mut ValidationResult<SitemapStats>,
) -> Vec<String> {
    let locs: Vec<(usize, &str)> = LOC
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| (line_of(content, m.start()), m.as_str()))
        .collect();

    result.stats.total_urls = locs.len();
    if locs.is_empty() {
        result.push(Issue::error(label, "No URLs found in sitemap"));
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let unique: Vec<(usize, &str)> = locs
        .iter()
        .copied()
        .filter(|(_, url)| seen.insert(*url))
        .collect();
    result.stats.unique_urls = unique.len();
    result.stats.duplicates = locs.len() - unique.len();
    if result.stats.duplicates > 0 {
        result.push(Issue::error(
            label,
            format!("Duplicate URLs found: {}", result.stats.duplicates),
        ));
    }

    let base = config.base_url.trim_end_matches('/');
    for &(line, raw) in &unique {
        check_url(raw, line, label, base, config.max_url_length, result);
    }
    unique.into_iter().map(|(_, url)| url.to_string()).collect()
}

fn check_url(
    raw: &str,
    line: usize,
    label: &str,
    base: &str,
    max_len: usize,
    result: &mut ValidationResult<SitemapStats>,
) {
    let issue = |severity: Severity, message: String| {
        Issue::new(severity, label, message).at_line(line).with_code(raw)
    };

    if raw.contains(' ') {
        result.push(issue(Severity::Error, "URL contains spaces".to_string()));
    }
    if raw.chars().count() > max_len {
        result.push(issue(Severity::Warning, format!("URL exceeds {max_len} characters")));
    }

    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            result.push(issue(Severity::Error, format!("Invalid URL: {e}")));
            return;
        }
    };
    match parsed.scheme() {
        "https" => result.stats.https_urls += 1,
        "http" => {
            result.stats.http_urls += 1;
            result.push(issue(Severity::Warning, "Insecure HTTP URL".to_string()));
        }
        other => result.push(issue(Severity::Error, format!("Unsupported URL scheme: {other}"))),
    }
    if !raw.starts_with(base) {
        result.stats.external_urls += 1;
        result.push(issue(Severity::Warning, format!("External URL (not under {base})")));
    }
}

/// `/pricing/` and `/pricing` are the same page; the root stays `/`.
fn normalize_path(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn localized(page: &str) -> String {
    if page == "/" {
        LOCALE_PREFIX.to_string()
    } else {
        format!("{LOCALE_PREFIX}{page}")
    }
}

fn check_required_pages(
    urls: &[String],
    label: &str,
    config: &SitemapConfig,
    result: &mut ValidationResult<SitemapStats>,
) {
    let paths: HashSet<String> = urls
        .iter()
        .filter_map(|u| Url::parse(u).ok())
        .map(|u| normalize_path(u.path()).to_string())
        .collect();

    for page in &config.required_pages {
        let page = normalize_path(page);
        if !paths.contains(page) && !paths.contains(&localized(page)) {
            result.push(Issue::warning(label, format!("Missing important page: {page}")));
        }
    }
}

/// Parse a W3C datetime: a date, a date-time with offset, or a bare
/// date-time taken as UTC. Year-month is accepted as its first day.
pub fn parse_lastmod(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .ok()?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn check_metadata(
    content: &str,
    label: &str,
    now: DateTime<Utc>,
    result: &mut ValidationResult<SitemapStats>,
) {
    let values = |re: &Regex| -> Vec<(usize, String)> {
        re.captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| (line_of(content, m.start()), m.as_str().to_string()))
            .collect()
    };

    for (line, value) in values(&LASTMOD) {
        match parse_lastmod(&value) {
            None => result.push(
                Issue::error(label, format!("Invalid lastmod date: {value}")).at_line(line),
            ),
            Some(date) if date > now => result.push(
                Issue::warning(label, format!("Future lastmod date: {value}")).at_line(line),
            ),
            Some(_) => {}
        }
    }

    for (line, value) in values(&PRIORITY) {
        let valid = value
            .parse::<f64>()
            .is_ok_and(|p| (0.0..=1.0).contains(&p));
        if !valid {
            result.push(
                Issue::error(label, format!("Invalid priority value: {value}")).at_line(line),
            );
        }
    }

    for (line, value) in values(&CHANGEFREQ) {
        if !CHANGEFREQ_VALUES.contains(&value.as_str()) {
            result.push(
                Issue::error(label, format!("Invalid changefreq value: {value}")).at_line(line),
            );
        }
    }
}
