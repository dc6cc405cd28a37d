//! End-to-end tests for the `site-assets` binary: exit codes, report
//! channels, and config handling against throwaway project directories.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn site_assets(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_site-assets"))
        .arg("--project")
        .arg(project)
        .args(args)
        .env_remove("SITE_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run site-assets")
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn sitemap(urls: &[&str]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        out.push_str(&format!(
            "  <url>\n    <loc>{url}</loc>\n    <lastmod>2024-01-15</lastmod>\n  </url>\n"
        ));
    }
    out.push_str("</urlset>\n");
    out
}

const ALL_PAGES: &[&str] = &[
    "https://rayapp.io/",
    "https://rayapp.io/pricing",
    "https://rayapp.io/case-studies",
    "https://rayapp.io/about",
    "https://rayapp.io/contact",
];

// =========================================================================
// gen-config
// =========================================================================

#[test]
fn gen_config_prints_loadable_defaults() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["gen-config"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("[images]"));
    assert!(text.contains("[cta]"));
    let parsed = site_assets::config::parse_config(&text).unwrap();
    assert_eq!(parsed, site_assets::config::ToolsConfig::default());
}

#[test]
fn gen_config_ignores_a_broken_config() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site-assets.toml", "[images\n");
    assert!(site_assets(tmp.path(), &["gen-config"]).status.success());
}

// =========================================================================
// Config errors are fatal
// =========================================================================

#[test]
fn unknown_config_key_fails() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site-assets.toml", "[sitemap]\nbase_ulr = \"https://x.io\"\n");
    write(tmp.path(), "public/sitemap.xml", &sitemap(ALL_PAGES));

    let output = site_assets(tmp.path(), &["validate-sitemap"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error:"), "{}", stderr(&output));
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["--config", "nope.toml", "validate-sitemap"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config file not found"));
}

// =========================================================================
// Sitemap
// =========================================================================

#[test]
fn clean_sitemap_exits_zero() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "public/sitemap.xml", &sitemap(ALL_PAGES));

    let output = site_assets(tmp.path(), &["validate-sitemap"]);
    let text = stdout(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.starts_with("==> Sitemap"));
    assert!(text.contains("URLs: 5 (5 unique, 0 duplicates)"));
    assert!(!text.contains("How to fix"));
}

#[test]
fn duplicate_urls_exit_one_with_remediation() {
    let tmp = TempDir::new().unwrap();
    let mut urls = ALL_PAGES.to_vec();
    urls.push("https://rayapp.io/pricing");
    write(tmp.path(), "public/sitemap.xml", &sitemap(&urls));

    let output = site_assets(tmp.path(), &["validate-sitemap"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(text.contains("Duplicate URLs found: 1"));
    assert!(text.contains("How to fix"));
}

#[test]
fn base_url_comes_from_site_url_env() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "public/sitemap.xml",
        &sitemap(&["https://example.org/", "https://example.org/pricing"]),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_site-assets"))
        .arg("--project")
        .arg(tmp.path())
        .arg("validate-sitemap")
        .env("SITE_URL", "https://example.org")
        .output()
        .unwrap();
    let text = stdout(&output);
    assert!(output.status.success(), "{text}");
    assert!(!text.contains("External URL"));
}

#[test]
fn missing_sitemap_is_an_error_issue() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["validate-sitemap"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Sitemap file not found"));
}

#[test]
fn json_format_reports_validity() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "public/sitemap.xml", &sitemap(ALL_PAGES));

    let output = site_assets(tmp.path(), &["--format", "json", "validate-sitemap"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["component"], "Sitemap");
    assert_eq!(value["is_valid"], true);
    assert_eq!(value["stats"]["total_urls"], 5);
}

// =========================================================================
// Images
// =========================================================================

#[test]
fn missing_image_root_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["validate-images"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Image directory not found"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn missing_variants_fail_then_optimize_fixes_them() {
    let tmp = TempDir::new().unwrap();
    let img = image::RgbImage::from_fn(32, 24, |x, y| image::Rgb([(x * 8) as u8, (y * 10) as u8, 90]));
    let path = tmp.path().join("public/images/logo.png");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(&path).unwrap();

    let before = site_assets(tmp.path(), &["validate-images"]);
    assert_eq!(before.status.code(), Some(1));
    assert!(stdout(&before).contains("Missing WebP variant: logo.webp"));

    let optimized = site_assets(tmp.path(), &["optimize-images"]);
    assert!(optimized.status.success(), "{}", stderr(&optimized));
    assert!(stdout(&optimized).contains("001 logo.png"));
    assert!(tmp.path().join("public/images/logo.webp").exists());
    assert!(tmp.path().join("public/images/logo.avif").exists());

    let after = site_assets(tmp.path(), &["validate-images"]);
    assert!(after.status.success(), "{}", stdout(&after));
}

#[test]
fn root_flag_resolves_against_project() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("assets")).unwrap();
    let output = site_assets(tmp.path(), &["validate-images", "--root", "assets"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Images: 0"));
}

// =========================================================================
// Source auditors
// =========================================================================

#[test]
fn image_usage_flags_unsized_component() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/lib/util.ts", "export const x = 1;\n");
    let clean = site_assets(tmp.path(), &["validate-image-usage"]);
    assert!(clean.status.success(), "{}", stdout(&clean));

    write(
        tmp.path(),
        "src/components/Logo.jsx",
        "import Image from 'next/image';\nexport const Logo = () => <Image src=\"/logo.png\" alt=\"Logo\" />;\n",
    );
    let dirty = site_assets(tmp.path(), &["validate-image-usage"]);
    assert_eq!(dirty.status.code(), Some(1));
    assert!(stdout(&dirty).contains("components/Logo.jsx:2  <Image> is missing width/height"));
}

#[test]
fn missing_src_dir_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["validate-hero-images"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error:"));
}

// =========================================================================
// Font
// =========================================================================

#[test]
fn missing_font_fails() {
    let tmp = TempDir::new().unwrap();
    let output = site_assets(tmp.path(), &["validate-font"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Font file not found"));
}

// =========================================================================
// check + audit-cta
// =========================================================================

#[test]
fn check_runs_every_validator() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "public/sitemap.xml", &sitemap(ALL_PAGES));
    std::fs::create_dir_all(tmp.path().join("public/images")).unwrap();
    write(tmp.path(), "src/lib/util.ts", "export const x = 1;\n");

    let output = site_assets(tmp.path(), &["check"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(1));
    for title in ["==> Images", "==> Hero images", "==> Image usage", "==> Font", "==> Sitemap"] {
        assert!(text.contains(title), "missing {title} in:\n{text}");
    }
}

#[test]
fn cta_audit_outside_development_needs_no_browser() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site-assets.toml", "[cta]\ndevelopment = false\n");

    let output = site_assets(tmp.path(), &["audit-cta", "--url", "http://127.0.0.1:9/"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("CTA audit disabled"));
}
