//! Hero image usage audit.
//!
//! A closed list of hero images (see [`HeroConfig::images`]) must be served
//! through `<picture>` with AVIF/WebP `srcSet`s, never as a bundled PNG/JPEG.
//! Two passes:
//!
//! - **Source scan**: hero and product components under the source tree are
//!   checked line by line for direct raster imports, raw `<Image src>` usage,
//!   and incomplete `<picture>` blocks.
//! - **Variant scan**: for each hero name, the public image directories must
//!   hold at least `min_variants` width-marked files (`hero-banner-640w.avif`)
//!   per format.
//!
//! Matching is regex-based and line-oriented. It recognizes the patterns the
//! site's components actually use; it does not parse JSX, so commented-out
//! markup is still reported and unusual formatting can slip through.

use crate::config::HeroConfig;
use crate::types::{Issue, Stats, ValidationResult};
use crate::walk::{collect_sources, display_path};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static RASTER_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+\w+\s+from\s+['"]([^'"]+)\.(png|jpe?g)['"]"#).expect("valid regex")
});

static IMAGE_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src=["']/images/([^"']+)\.(png|jpe?g)["']"#).expect("valid regex")
});

static PRIORITY_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpriority\b|fetchPriority").expect("valid regex"));

static WIDTH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+w\.").expect("valid regex"));

/// Lines scanned forward from `<picture` looking for `</picture>`.
const PICTURE_WINDOW: usize = 30;
/// Lines scanned forward from `<Image` looking for the end of the tag.
const IMAGE_WINDOW: usize = 10;

const SOURCE_EXTENSIONS: &[&str] = &["tsx", "jsx"];

#[derive(Error, Debug)]
pub enum HeroError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeroStats {
    pub files_scanned: usize,
    pub hero_components: usize,
    pub hero_images_checked: usize,
    pub complete_variant_sets: usize,
}

impl Stats for HeroStats {
    fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "Files scanned: {} ({} hero components)",
                self.files_scanned, self.hero_components
            ),
            format!(
                "Responsive variant sets: {}/{} complete",
                self.complete_variant_sets, self.hero_images_checked
            ),
        ]
    }
}

pub const REMEDIATION: &[&str] = &[
    "Serve hero images through <picture> with modern formats:",
    "",
    "    <picture>",
    "      <source type=\"image/avif\" srcSet=\"/images/hero-banner-640w.avif 640w, /images/hero-banner-1280w.avif 1280w, /images/hero-banner-1920w.avif 1920w\" sizes=\"100vw\" />",
    "      <source type=\"image/webp\" srcSet=\"/images/hero-banner-640w.webp 640w, /images/hero-banner-1280w.webp 1280w, /images/hero-banner-1920w.webp 1920w\" sizes=\"100vw\" />",
    "      <img src=\"/images/hero-banner.jpg\" alt=\"...\" fetchPriority=\"high\" />",
    "    </picture>",
];

/// Only hero and product components are scanned. `rel` is matched with a
/// leading slash so a top-level `product/` directory counts too.
fn is_scanned_path(rel: &str) -> bool {
    let rooted = format!("/{}", rel.trim_start_matches('/'));
    rooted.contains("Hero.tsx") || rooted.contains("/product/")
}

fn is_hero_component(rel: &str) -> bool {
    rel.rsplit('/').next().is_some_and(|name| name.contains("Hero"))
}

/// Last path segment of an import specifier, e.g. `../assets/hero-banner` -> `hero-banner`.
fn base_name(spec: &str) -> &str {
    spec.rsplit('/').next().unwrap_or(spec)
}

/// Join `lines[start..]` up to and including the first line containing
/// `end`, capped at `window` lines.
fn snippet(lines: &[&str], start: usize, end: &str, window: usize) -> String {
    let mut out = Vec::new();
    for line in lines.iter().skip(start).take(window) {
        out.push(*line);
        if line.contains(end) {
            break;
        }
    }
    out.join("\n")
}

/// Audit one source file. `rel` is its path relative to the source root.
///
/// Files that are neither hero nor product components yield nothing.
pub fn audit_source(rel: &str, content: &str, config: &HeroConfig) -> Vec<Issue> {
    if !is_scanned_path(rel) {
        return Vec::new();
    }
    let hero = is_hero_component(rel);
    let is_tracked = |name: &str| config.images.iter().any(|h| h == name);
    let lines: Vec<&str> = content.lines().collect();
    let mut issues = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;

        if let Some(caps) = RASTER_IMPORT.captures(line) {
            let name = base_name(&caps[1]);
            if is_tracked(name) {
                issues.push(
                    Issue::error(
                        rel,
                        format!(
                            "Direct import of hero image '{name}.{}': use <picture> with AVIF/WebP srcSet instead",
                            &caps[2]
                        ),
                    )
                    .at_line(line_no)
                    .with_code(line.trim()),
                );
            }
        }

        if line.contains("<Image") {
            let tag = snippet(&lines, i, "/>", IMAGE_WINDOW);
            let prioritized = PRIORITY_HINT.is_match(&tag);
            if let Some(caps) = IMAGE_SRC.captures(&tag) {
                let name = base_name(&caps[1]);
                if is_tracked(name) {
                    let issue = if prioritized {
                        Issue::error(
                            rel,
                            format!("High-priority hero image '{name}' served as unoptimized {}", &caps[2]),
                        )
                    } else {
                        Issue::warning(
                            rel,
                            format!("Hero image '{name}' served as {}: use <picture> with modern formats", &caps[2]),
                        )
                    };
                    issues.push(issue.at_line(line_no).with_code(line.trim()));
                }
            }
            if prioritized {
                issues.push(
                    Issue::warning(
                        rel,
                        "Image component with priority hint should be converted to <picture>",
                    )
                    .at_line(line_no)
                    .with_code(line.trim()),
                );
            }
        }

        if line.contains("<picture") {
            let block = snippet(&lines, i, "</picture>", PICTURE_WINDOW);
            issues.extend(
                check_picture(rel, &block, hero)
                    .into_iter()
                    .map(|issue| issue.at_line(line_no).with_code(line.trim())),
            );
        }
    }
    issues
}

fn check_picture(rel: &str, block: &str, hero: bool) -> Vec<Issue> {
    let mut issues = Vec::new();
    if !block.contains("image/avif") {
        issues.push(Issue::error(rel, "<picture> is missing an AVIF <source> (type=\"image/avif\")"));
    }
    if !block.contains("image/webp") {
        issues.push(Issue::warning(rel, "<picture> is missing a WebP <source> (type=\"image/webp\")"));
    }
    if !block.contains("srcSet=") {
        issues.push(Issue::error(rel, "<picture> sources have no srcSet"));
    }
    if !block.contains("sizes=") {
        issues.push(Issue::warning(rel, "<picture> sources have no sizes attribute"));
    }
    if hero && !block.contains("fetchPriority=\"high\"") {
        issues.push(Issue::warning(
            rel,
            "Hero <picture> should set fetchPriority=\"high\" on its <img>",
        ));
    }
    issues
}

/// Width-marked variant files found for one hero image.
#[derive(Debug, Default)]
struct VariantSet {
    avif: usize,
    webp: usize,
    found: Vec<String>,
}

fn find_variants(public: &Path, name: &str, config: &HeroConfig) -> VariantSet {
    let mut set = VariantSet::default();
    for dir in &config.variant_dirs {
        let Ok(entries) = std::fs::read_dir(public.join(dir)) else {
            continue;
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|f| f.starts_with(name) && WIDTH_MARKER.is_match(f))
            .collect();
        names.sort();
        for file in names {
            if file.ends_with(".avif") {
                set.avif += 1;
            } else if file.ends_with(".webp") {
                set.webp += 1;
            } else {
                continue;
            }
            set.found.push(format!("{dir}/{file}"));
        }
    }
    set
}

/// Check every tracked hero image has a complete responsive variant set.
pub fn check_variants(public: &Path, config: &HeroConfig, result: &mut ValidationResult<HeroStats>) {
    for name in &config.images {
        result.stats.hero_images_checked += 1;
        let set = find_variants(public, name, config);
        let min = config.min_variants;
        if set.avif >= min && set.webp >= min {
            result.stats.complete_variant_sets += 1;
            continue;
        }
        let found = if set.found.is_empty() {
            "none".to_string()
        } else {
            set.found.join(", ")
        };
        result.push(Issue::error(
            name.as_str(),
            format!(
                "Incomplete responsive variants: {} AVIF, {} WebP (need {min} of each). Found: {found}",
                set.avif, set.webp
            ),
        ));
    }
}

/// Run both passes: scan `src_dir` components and `public_dir` variants.
pub fn validate_hero_images(
    src_dir: &Path,
    public_dir: &Path,
    config: &HeroConfig,
) -> Result<ValidationResult<HeroStats>, HeroError> {
    if !src_dir.is_dir() {
        return Err(HeroError::SourceNotFound(src_dir.to_path_buf()));
    }
    let mut result = ValidationResult::<HeroStats>::default();

    for path in collect_sources(src_dir, SOURCE_EXTENSIONS) {
        let rel = display_path(&path, src_dir);
        if !is_scanned_path(&rel) {
            continue;
        }
        result.stats.files_scanned += 1;
        if is_hero_component(&rel) {
            result.stats.hero_components += 1;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => result.extend(audit_source(&rel, &content, config)),
            Err(e) => {
                tracing::warn!("cannot read {rel}: {e}");
                result.push(Issue::warning(rel, format!("Could not read file: {e}")));
            }
        }
    }

    check_variants(public_dir, config, &mut result);
    Ok(result)
}
