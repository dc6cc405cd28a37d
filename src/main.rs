use clap::{Parser, Subcommand};
use site_assets::config::{self, ToolsConfig};
use site_assets::cta::{self, CtaAuditor};
use site_assets::imaging::RustCodec;
use site_assets::output::{self, ReportFormat};
use site_assets::types::{Stats, ValidationResult};
use site_assets::{font, hero, images, optimize, sitemap, usage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliResult = Result<bool, Box<dyn std::error::Error>>;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "site-assets")]
#[command(about = "Validate and optimize the static assets of a web project")]
#[command(long_about = "\
Validate and optimize the static assets of a web project

Each subcommand is one independent check. Validators print a report grouped
into errors and warnings and exit 1 if any error was found; warnings alone
never fail a run.

Default layout (every path is relative to --project):

  site-assets.toml                 # Optional config, see 'gen-config'
  index.html                       # Font preload / font-display checks
  src/                             # Components scanned for image markup
  └── components/Hero.tsx          # Hero components get stricter checks
  public/
  ├── fonts/Inter-Variable.woff2   # Self-hosted font
  ├── sitemap.xml
  └── images/
      ├── hero-banner.png          # Source original
      ├── hero-banner.webp         # Required variant
      └── hero-banner.avif         # Required variant

Run 'site-assets optimize-images' to create missing variants, then
'site-assets check' in CI to run every read-only validator at once.")]
#[command(version = version_string())]
struct Cli {
    /// Project root; every default path resolves against it
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Config file [default: <project>/site-assets.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Human, global = true)]
    format: ReportFormat,

    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-compress images in place and create missing WebP/AVIF variants
    OptimizeImages {
        /// Image directory [default: images.root]
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Check variants, sizes and dimensions of every image
    ValidateImages {
        /// Image directory [default: images.root]
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Check hero images are served responsively
    ValidateHeroImages {
        /// Component sources [default: hero.src_dir]
        #[arg(long)]
        src: Option<PathBuf>,
        /// Public assets [default: hero.public_dir]
        #[arg(long)]
        public: Option<PathBuf>,
    },
    /// Check image tags and components in source files
    ValidateImageUsage {
        /// Component sources [default: usage.src_dir]
        #[arg(long)]
        src: Option<PathBuf>,
    },
    /// Check the self-hosted font and its preload markup
    ValidateFont {
        /// Font file [default: font.path]
        #[arg(long)]
        font: Option<PathBuf>,
        /// HTML entry document [default: font.html]
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Check sitemap structure and URLs
    ValidateSitemap {
        /// Sitemap file [default: sitemap.path]
        #[arg(long)]
        sitemap: Option<PathBuf>,
        /// Canonical site origin [default: sitemap.base_url]
        #[arg(long, env = "SITE_URL")]
        base_url: Option<String>,
    },
    /// Audit call-to-action elements of a running page (needs Chrome)
    AuditCta {
        /// Page to audit, e.g. http://localhost:3000/
        #[arg(long)]
        url: String,
        /// Wait after navigation before auditing [default: cta.settle_delay_ms]
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Keep watching for client-side route changes this long
        #[arg(long, default_value_t = 0)]
        watch_secs: u64,
    },
    /// Run every read-only validator with one combined exit code
    Check,
    /// Print a stock site-assets.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays the report channel.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(cli: &Cli) -> Result<ToolsConfig, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(&cli.project.join(config::CONFIG_FILE))?),
    }
}

/// An explicit flag wins over the configured path; both resolve against the project.
fn resolve(project: &Path, flag: Option<PathBuf>, configured: &str) -> PathBuf {
    match flag {
        Some(path) => project.join(path),
        None => project.join(configured),
    }
}

/// Print one report; true when it has no errors.
fn report<S: Stats>(
    format: ReportFormat,
    title: &str,
    result: &ValidationResult<S>,
    remediation: &[&str],
) -> CliResult {
    output::print_report(format, title, result, remediation)?;
    Ok(result.is_valid())
}

fn run(cli: Cli) -> CliResult {
    // gen-config must work even when the current config is broken
    let mut cfg = match cli.command {
        Command::GenConfig => ToolsConfig::default(),
        _ => load(&cli)?,
    };
    let project = cli.project;
    let format = cli.format;

    match cli.command {
        Command::OptimizeImages { root } => {
            let root = resolve(&project, root, &cfg.images.root);
            run_optimize(&root, &cfg, format)
        }
        Command::ValidateImages { root } => {
            let root = resolve(&project, root, &cfg.images.root);
            run_images(&root, &cfg, format)
        }
        Command::ValidateHeroImages { src, public } => {
            let src = resolve(&project, src, &cfg.hero.src_dir);
            let public = resolve(&project, public, &cfg.hero.public_dir);
            run_hero(&src, &public, &cfg, format)
        }
        Command::ValidateImageUsage { src } => {
            let src = resolve(&project, src, &cfg.usage.src_dir);
            run_usage(&src, &cfg, format)
        }
        Command::ValidateFont { font, html } => {
            let font = resolve(&project, font, &cfg.font.path);
            let html = resolve(&project, html, &cfg.font.html);
            run_font(&font, &html, &cfg, format)
        }
        Command::ValidateSitemap { sitemap, base_url } => {
            let sitemap = resolve(&project, sitemap, &cfg.sitemap.path);
            if let Some(base_url) = base_url {
                cfg.sitemap.base_url = base_url;
            }
            run_sitemap(&sitemap, &cfg, format)
        }
        Command::AuditCta {
            url,
            settle_ms,
            watch_secs,
        } => {
            if let Some(settle) = settle_ms {
                cfg.cta.settle_delay_ms = settle;
            }
            run_cta(&url, cfg, Duration::from_secs(watch_secs), format)
        }
        Command::Check => {
            if let Ok(base_url) = std::env::var("SITE_URL") {
                cfg.sitemap.base_url = base_url;
            }
            run_check(&project, &cfg, format)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(true)
        }
    }
}

fn run_optimize(root: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let codec = RustCodec::new();
    // Per-file failures are logged warnings; only a missing root fails the run.
    match format {
        ReportFormat::Human => {
            println!("==> Optimizing {}", root.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_lines(&output::format_optimize_event(&event));
                }
            });
            let summary = optimize::optimize(root, &codec, &cfg.images, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_lines(&output::format_optimize_summary(&summary?));
        }
        ReportFormat::Json => {
            let summary = optimize::optimize(root, &codec, &cfg.images, None)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(true)
}

fn run_images(root: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let result = images::validate_images(root, &RustCodec::new(), &cfg.images)?;
    report(format, "Images", &result, images::REMEDIATION)
}

fn run_hero(src: &Path, public: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let result = hero::validate_hero_images(src, public, &cfg.hero)?;
    report(format, "Hero images", &result, hero::REMEDIATION)
}

fn run_usage(src: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let result = usage::validate_image_usage(src, &cfg.usage)?;
    report(format, "Image usage", &result, usage::REMEDIATION)
}

fn run_font(font: &Path, html: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let result = font::validate_font(font, html, &cfg.font);
    report(format, "Font", &result, font::REMEDIATION)
}

fn run_sitemap(sitemap: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let result = sitemap::validate_sitemap(sitemap, &cfg.sitemap);
    report(format, "Sitemap", &result, sitemap::REMEDIATION)
}

/// Advisory: findings never change the exit code.
fn run_cta(url: &str, cfg: ToolsConfig, watch: Duration, format: ReportFormat) -> CliResult {
    let auditor = CtaAuditor::new(cfg.cta);
    let mut print_failed = None;
    let audits = cta::browser::run(url, &auditor, watch, |result| {
        let title = format!("CTA audit {}", result.stats.route);
        if let Err(e) = output::print_report(format, title.trim(), result, cta::REMEDIATION) {
            print_failed = Some(e);
        }
    })?;
    if let Some(e) = print_failed {
        return Err(e.into());
    }
    tracing::debug!("{audits} CTA audits completed");
    Ok(true)
}

/// Every read-only validator in sequence, with configured paths. A fatal
/// failure in one component is reported and counted without stopping the rest.
fn run_check(project: &Path, cfg: &ToolsConfig, format: ReportFormat) -> CliResult {
    let path = |configured: &str| resolve(project, None, configured);
    let mut all_valid = true;
    let mut tally = |name: &str, outcome: CliResult| {
        match outcome {
            Ok(valid) => all_valid &= valid,
            Err(e) => {
                eprintln!("error: {name}: {e}");
                all_valid = false;
            }
        }
        if format == ReportFormat::Human {
            println!();
        }
    };

    tally("images", run_images(&path(&cfg.images.root), cfg, format));
    tally(
        "hero images",
        run_hero(&path(&cfg.hero.src_dir), &path(&cfg.hero.public_dir), cfg, format),
    );
    tally("image usage", run_usage(&path(&cfg.usage.src_dir), cfg, format));
    tally(
        "font",
        run_font(&path(&cfg.font.path), &path(&cfg.font.html), cfg, format),
    );
    tally("sitemap", run_sitemap(&path(&cfg.sitemap.path), cfg, format));
    Ok(all_valid)
}
