//! # Site Assets
//!
//! Build-time checks and fixes for the static assets of a web project:
//! raster images, the self-hosted font, the sitemap, the image markup in
//! component sources, and call-to-action accessibility in the rendered page.
//!
//! # Architecture: Walk, Inspect, Report
//!
//! Every component follows the same shape and none of them call each other:
//!
//! ```text
//! walk      root dir / file / DOM   →  candidate items
//! inspect   one item at a time      →  Issues (error | warning)
//! report    ValidationResult<S>     →  grouped report + exit code
//! ```
//!
//! Validators are library functions that return a [`types::ValidationResult`];
//! printing and exit codes live in the binary. This keeps every check testable
//! against a temp directory without capturing stdout.
//!
//! Only a missing root is fatal (`Err`). Everything else, including a file
//! that fails to decode, is an [`types::Issue`] and the walk continues.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`optimize`] | Re-compresses originals in place and creates missing WebP/AVIF siblings |
//! | [`images`] | Read-only audit: variants present, source sizes, decodable, dimensions |
//! | [`hero`] | Hero images: no direct raster imports, `<picture>` markup, responsive variant sets |
//! | [`usage`] | Every `<img>` and image component in source: explicit sizing, `sizes` with `fill`, priority hints |
//! | [`font`] | The self-hosted font: size, format, naming, permissions, preload wiring |
//! | [`sitemap`] | Sitemap structure, per-URL fields, duplicates, required pages |
//! | [`cta`] | CTA accessibility rules over DOM snapshots, plus the Chrome driver |
//! | [`config`] | `site-assets.toml` loading, merging over stock defaults, validation |
//! | [`imaging`] | The [`imaging::ImageCodec`] seam and its pure-Rust implementation |
//! | [`types`] | `Issue`, `Severity`, `ValidationResult` shared by every validator |
//! | [`output`] | CLI output formatting: grouped reports, JSON, optimizer progress |
//! | [`walk`] | Deterministic directory walking shared by the scanners |
//!
//! # Design Decisions
//!
//! ## Errors vs. Warnings
//!
//! Errors are structural problems that break the page or its tooling: a missing
//! variant, an unreadable image, a duplicate sitemap URL, a hero image imported
//! directly. Warnings are quality concerns: a large file, a missing `sizes`
//! attribute, a stale `lastmod`. Only errors fail the run, so CI can be strict
//! about the first without blocking on the second.
//!
//! ## Pattern Scans, Not Parsers
//!
//! The source auditors ([`hero`], [`usage`]) and the sitemap validator work on
//! text with regular expressions and fixed line windows. They do not build an
//! AST or an XML tree. This keeps them fast and dependency-light at the cost of
//! known blind spots (commented-out code still matches, misnested tags are not
//! detected). The tests pin those cases down.
//!
//! ## Sequential Image Work
//!
//! The optimizer and the image validator handle one file at a time, so at most
//! one decoded image is in memory however large the tree is.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding go through the `image` crate, with `avif-parse` and
//! `rav1d` for reading AVIF. No system libraries, no external binaries.

pub mod config;
pub mod cta;
pub mod font;
pub mod hero;
pub mod images;
pub mod imaging;
pub mod optimize;
pub mod output;
pub mod sitemap;
pub mod types;
pub mod usage;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
