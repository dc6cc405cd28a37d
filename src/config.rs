//! Toolchain configuration.
//!
//! Every validator runs with fixed defaults; `site-assets.toml` at the project
//! root may override any of them. The file is sparse: override just the
//! values you want:
//!
//! ```toml
//! [sitemap]
//! base_url = "https://staging.rayapp.io"
//!
//! [hero]
//! min_variants = 4
//! ```
//!
//! Loading works in three steps: the stock defaults are serialized to a
//! `toml::Value`, the user file is merged over them key by key
//! ([`merge_toml`]), and the result is deserialized and range-checked.
//! Unknown keys are rejected to catch typos early.
//!
//! Run `site-assets gen-config` for a fully documented file.

use crate::imaging::QualityPresets;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default configuration file name, resolved against the project root.
pub const CONFIG_FILE: &str = "site-assets.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration for every component, loaded from `site-assets.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub images: ImagesConfig,
    pub hero: HeroConfig,
    pub usage: UsageConfig,
    pub font: FontConfig,
    pub sitemap: SitemapConfig,
    pub cta: CtaConfig,
}

impl ToolsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.images.quality;
        for (name, quality) in [("jpeg", q.jpeg), ("webp", q.webp), ("avif", q.avif)] {
            if !(1..=100).contains(&quality.value()) {
                return Err(ConfigError::Validation(format!(
                    "images.quality.{name} must be 1-100"
                )));
            }
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        if self.hero.images.is_empty() {
            return Err(ConfigError::Validation(
                "hero.images must not be empty".into(),
            ));
        }
        if self.hero.min_variants == 0 {
            return Err(ConfigError::Validation(
                "hero.min_variants must be at least 1".into(),
            ));
        }
        if self.font.min_bytes >= self.font.max_bytes {
            return Err(ConfigError::Validation(
                "font.min_bytes must be below font.max_bytes".into(),
            ));
        }
        if u32::from_str_radix(&self.font.recommended_mode, 8).is_err() {
            return Err(ConfigError::Validation(format!(
                "font.recommended_mode '{}' is not an octal mode",
                self.font.recommended_mode
            )));
        }
        if url::Url::parse(&self.sitemap.base_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "sitemap.base_url '{}' is not a valid URL",
                self.sitemap.base_url
            )));
        }
        if self.sitemap.max_url_length == 0 {
            return Err(ConfigError::Validation(
                "sitemap.max_url_length must be non-zero".into(),
            ));
        }
        if self.cta.min_target_px <= 0.0 {
            return Err(ConfigError::Validation(
                "cta.min_target_px must be positive".into(),
            ));
        }
        if self.cta.selectors.is_empty() {
            return Err(ConfigError::Validation(
                "cta.selectors must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Image optimizer and image validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Image tree, relative to the project root.
    pub root: String,
    /// Files smaller than this are never re-compressed.
    pub tiny_file_bytes: u64,
    /// Source images above this size get a warning.
    pub source_warn_bytes: u64,
    /// Either edge above this gets a warning.
    pub max_dimension: u32,
    /// Re-encode quality per format.
    pub quality: QualityPresets,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: "public/images".to_string(),
            tiny_file_bytes: 5 * 1024,
            source_warn_bytes: 500 * 1024,
            max_dimension: 3840,
            quality: QualityPresets::default(),
        }
    }
}

/// Hero image usage auditor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeroConfig {
    /// Source tree to scan, relative to the project root.
    pub src_dir: String,
    /// Public asset root, relative to the project root.
    pub public_dir: String,
    /// Base names of the tracked hero images. A closed list.
    pub images: Vec<String>,
    /// Subdirectories of `public_dir` searched for responsive variants.
    pub variant_dirs: Vec<String>,
    /// Width-marked variants required per format before a set counts as complete.
    pub min_variants: usize,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            src_dir: "src".to_string(),
            public_dir: "public".to_string(),
            images: [
                "hero-banner",
                "hero-dashboard",
                "hero-mobile",
                "pos-terminal",
                "kitchen-display",
                "restaurant-interior",
            ]
            .map(String::from)
            .to_vec(),
            variant_dirs: ["images", "images/hero", "images/product"]
                .map(String::from)
                .to_vec(),
            min_variants: 3,
        }
    }
}

/// Generic image usage auditor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsageConfig {
    pub src_dir: String,
    /// Module the framework image component is imported from.
    pub image_module: String,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            src_dir: "src".to_string(),
            image_module: "next/image".to_string(),
        }
    }
}

/// Font validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    pub path: String,
    /// HTML entry document checked for preload wiring.
    pub html: String,
    pub max_bytes: u64,
    pub min_bytes: u64,
    /// Octal permission string, e.g. `"644"`.
    pub recommended_mode: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: "public/fonts/Inter-Variable.woff2".to_string(),
            html: "index.html".to_string(),
            max_bytes: 100 * 1024,
            min_bytes: 10 * 1024,
            recommended_mode: "644".to_string(),
        }
    }
}

/// Sitemap validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub path: String,
    /// Overridden by `--base-url` / `SITE_URL`.
    pub base_url: String,
    /// Paths that must appear bare or under `/es`.
    pub required_pages: Vec<String>,
    pub max_url_length: usize,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            path: "public/sitemap.xml".to_string(),
            base_url: "https://rayapp.io".to_string(),
            required_pages: ["/", "/pricing", "/case-studies", "/about", "/contact"]
                .map(String::from)
                .to_vec(),
            max_url_length: 2048,
        }
    }
}

/// CTA / accessibility auditor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CtaConfig {
    /// The auditor does nothing unless this is set.
    pub development: bool,
    /// Minimum touch target edge, CSS pixels.
    pub min_target_px: f64,
    /// Wait after navigation before the first audit, for client rendering.
    pub settle_delay_ms: u64,
    /// How often the route is polled for changes while watching.
    pub poll_interval_ms: u64,
    pub selectors: Vec<String>,
    /// Elements carrying this attribute are skipped.
    pub ignore_attribute: String,
}

impl Default for CtaConfig {
    fn default() -> Self {
        Self {
            development: true,
            min_target_px: 44.0,
            settle_delay_ms: 1000,
            poll_interval_ms: 500,
            selectors: [
                "[data-cta]",
                "button",
                "a[href]",
                ".btn",
                ".cta-button",
                "[role=\"button\"]",
            ]
            .map(String::from)
            .to_vec(),
            ignore_attribute: "data-cta-ignore".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolsConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text over the stock defaults and validate it.
pub fn parse_config(content: &str) -> Result<ToolsConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: ToolsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<ToolsConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(ToolsConfig::default());
    }
    tracing::debug!("loading config from {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// A documented `site-assets.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# site-assets configuration
# All options are optional; the values below are the defaults.
# Paths are relative to the project root.

[images]
root = "public/images"
tiny_file_bytes = 5120        # never re-compress files smaller than this
source_warn_bytes = 512000    # warn on .jpg/.png originals above this
max_dimension = 3840          # warn when either edge exceeds this (4K)

[images.quality]               # PNG and TIFF are re-encoded losslessly
jpeg = 78                     # originals at or below this are not re-encoded
webp = 78
avif = 50

[hero]
src_dir = "src"
public_dir = "public"
images = [
    "hero-banner",
    "hero-dashboard",
    "hero-mobile",
    "pos-terminal",
    "kitchen-display",
    "restaurant-interior",
]
variant_dirs = ["images", "images/hero", "images/product"]
min_variants = 3              # width-marked files required per format (AVIF and WebP)

[usage]
src_dir = "src"
image_module = "next/image"

[font]
path = "public/fonts/Inter-Variable.woff2"
html = "index.html"
max_bytes = 102400
min_bytes = 10240
recommended_mode = "644"

[sitemap]
path = "public/sitemap.xml"
base_url = "https://rayapp.io" # SITE_URL or --base-url take precedence
required_pages = ["/", "/pricing", "/case-studies", "/about", "/contact"]
max_url_length = 2048

[cta]
development = true            # the auditor is a no-op when false
min_target_px = 44.0
settle_delay_ms = 1000
poll_interval_ms = 500
selectors = ["[data-cta]", "button", "a[href]", ".btn", ".cta-button", "[role=\"button\"]"]
ignore_attribute = "data-cta-ignore"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn stock_toml_matches_defaults() {
        let parsed = parse_config(stock_config_toml()).unwrap();
        assert_eq!(parsed, ToolsConfig::default());
    }

    #[test]
    fn default_config_passes_validation() {
        ToolsConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
            [sitemap]
            base_url = "https://staging.rayapp.io"
            "#,
        )
        .unwrap();
        assert_eq!(config.sitemap.base_url, "https://staging.rayapp.io");
        assert_eq!(config.sitemap.max_url_length, 2048);
        assert_eq!(config.hero.min_variants, 3);
    }

    #[test]
    fn nested_quality_override_keeps_siblings() {
        let config = parse_config(
            r#"
            [images.quality]
            avif = 40
            "#,
        )
        .unwrap();
        assert_eq!(config.images.quality.avif.value(), 40);
        assert_eq!(config.images.quality.jpeg.value(), 78);
    }

    #[test]
    fn unknown_key_rejected() {
        let result = parse_config(
            r#"
            [sitemap]
            base_uri = "typo"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn lossless_formats_have_no_quality_key() {
        for key in ["png", "tiff"] {
            let result = parse_config(&format!("[images.quality]\n{key} = 78"));
            assert!(matches!(result, Err(ConfigError::Toml(_))), "{key} accepted");
        }
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse_config("[imagez]\nroot = \"x\"").is_err());
    }

    #[test]
    fn validate_quality_out_of_range() {
        let result = parse_config("[images.quality]\njpeg = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        let result = parse_config("[images.quality]\navif = 101");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_empty_hero_list() {
        let result = parse_config("[hero]\nimages = []");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_min_variants() {
        let result = parse_config("[hero]\nmin_variants = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bad_base_url() {
        let result = parse_config("[sitemap]\nbase_url = \"not a url\"");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bad_mode() {
        let result = parse_config("[font]\nrecommended_mode = \"rw-r--r--\"");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, ToolsConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[cta]\ndevelopment = false\n").unwrap();
        let config = load_config(&path).unwrap();
        assert!(!config.cta.development);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "this is not [valid toml").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_arrays_replace_wholesale() {
        let base: toml::Value = toml::from_str("xs = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("xs = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["xs"].as_array().unwrap().len(), 1);
    }
}
