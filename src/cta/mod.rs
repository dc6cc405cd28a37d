//! Call-to-action accessibility audit.
//!
//! The rules run over a [`DomSnapshot`]: one record per candidate element,
//! gathered in the page by a collector script (see [`browser`]). Keeping the
//! rules on plain data means they are tested without a browser.
//!
//! | Rule | Severity |
//! |---|---|
//! | interactive element nested inside the CTA | error |
//! | no accessible label (aria-label, aria-labelledby, text, image alt) | error |
//! | bounding box under the minimum touch target | warning |
//! | more than one click handler | warning |
//! | no focus style | warning |
//!
//! The audit is advisory and only runs when the auditor is constructed for
//! development; otherwise it returns an empty, disabled result.

pub mod browser;

use crate::config::CtaConfig;
use crate::types::{Issue, Stats, ValidationResult};
use serde::{Deserialize, Serialize};

/// One element matched by the CTA selectors, as measured in the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CtaCandidate {
    /// Short description for reports, e.g. `button#signup.cta-button`.
    pub selector: String,
    pub tag: String,
    /// Trimmed text content.
    pub text: String,
    pub aria_label: Option<String>,
    /// Text of the elements referenced by `aria-labelledby`.
    pub aria_labelledby: Option<String>,
    /// `alt` of the first descendant image.
    pub image_alt: Option<String>,
    pub width: f64,
    pub height: f64,
    /// Interactive descendants (links, buttons, form controls, tabbable nodes).
    pub nested_interactive: usize,
    /// Approximate: inline `onclick`, framework click props, and descendant handlers.
    pub click_handlers: usize,
    pub has_focus_style: bool,
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl CtaCandidate {
    /// Text counts as a label only if it has a letter or digit; a lone icon
    /// glyph like `→` does not.
    pub fn has_label(&self) -> bool {
        non_blank(&self.aria_label)
            || non_blank(&self.aria_labelledby)
            || non_blank(&self.image_alt)
            || self.text.chars().any(char::is_alphanumeric)
    }
}

/// Everything the collector saw on one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSnapshot {
    pub path: String,
    pub candidates: Vec<CtaCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CtaStats {
    pub enabled: bool,
    pub route: String,
    pub candidates: usize,
}

impl Stats for CtaStats {
    fn summary(&self) -> Vec<String> {
        if !self.enabled {
            return vec!["CTA audit disabled (not a development build)".to_string()];
        }
        vec![format!(
            "Route {}: {} CTA elements audited",
            self.route, self.candidates
        )]
    }
}

pub const REMEDIATION: &[&str] = &[
    "Keep one interactive element per CTA and give it a label:",
    "",
    "    <a href=\"/demo\" class=\"cta-button\" aria-label=\"Book a demo\">Book a demo</a>",
    "",
    "Make touch targets at least 44x44px and style :focus-visible.",
];

/// Applies the CTA rules to snapshots.
#[derive(Debug, Clone)]
pub struct CtaAuditor {
    config: CtaConfig,
}

impl CtaAuditor {
    pub fn new(config: CtaConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.development
    }

    pub fn config(&self) -> &CtaConfig {
        &self.config
    }

    pub fn audit(&self, snapshot: &DomSnapshot) -> ValidationResult<CtaStats> {
        let mut result = ValidationResult::new(CtaStats {
            enabled: self.enabled(),
            route: snapshot.path.clone(),
            candidates: 0,
        });
        if !self.enabled() {
            return result;
        }
        result.stats.candidates = snapshot.candidates.len();
        for candidate in &snapshot.candidates {
            result.extend(self.check(&snapshot.path, candidate));
        }
        result
    }

    fn check(&self, route: &str, c: &CtaCandidate) -> Vec<Issue> {
        let at = |issue: Issue| issue.with_code(c.selector.clone());
        let mut issues = Vec::new();
        let min = self.config.min_target_px;

        if c.nested_interactive > 0 {
            issues.push(at(Issue::error(
                route,
                format!(
                    "<{}> contains {} nested interactive element(s)",
                    c.tag, c.nested_interactive
                ),
            )));
        }
        if !c.has_label() {
            issues.push(at(Issue::error(
                route,
                format!("<{}> has no accessible label", c.tag),
            )));
        }
        if c.width < min || c.height < min {
            issues.push(at(Issue::warning(
                route,
                format!(
                    "Touch target too small: {:.0}x{:.0}px (minimum {min:.0}x{min:.0})",
                    c.width, c.height
                ),
            )));
        }
        if c.click_handlers > 1 {
            issues.push(at(Issue::warning(
                route,
                format!(
                    "{} click handlers attached: risk of duplicate firing",
                    c.click_handlers
                ),
            )));
        }
        if !c.has_focus_style {
            issues.push(at(Issue::warning(route, "No visible focus style")));
        }
        issues
    }
}

/// Tracks the route last audited so re-audits happen only on navigation.
#[derive(Debug, Default)]
pub struct RouteWatcher {
    last: Option<String>,
}

impl RouteWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`; true when it differs from the previously observed one.
    pub fn observe(&mut self, path: &str) -> bool {
        if self.last.as_deref() == Some(path) {
            return false;
        }
        self.last = Some(path.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn good() -> CtaCandidate {
        CtaCandidate {
            selector: "a.cta-button".into(),
            tag: "a".into(),
            text: "Book a demo".into(),
            width: 160.0,
            height: 48.0,
            click_handlers: 1,
            has_focus_style: true,
            ..CtaCandidate::default()
        }
    }

    fn audit(candidates: Vec<CtaCandidate>) -> ValidationResult<CtaStats> {
        let auditor = CtaAuditor::new(CtaConfig::default());
        auditor.audit(&DomSnapshot {
            path: "/pricing".into(),
            candidates,
        })
    }

    #[test]
    fn well_formed_cta_is_clean() {
        let result = audit(vec![good()]);
        assert_clean(&result);
        assert_eq!(result.stats.candidates, 1);
        assert!(result.stats.enabled);
    }

    #[test]
    fn nested_interactive_is_an_error() {
        let result = audit(vec![CtaCandidate {
            nested_interactive: 1,
            ..good()
        }]);
        let issue = find_issue(&result, "nested interactive");
        assert!(issue.is_error());
        assert_eq!(issue.file, "/pricing");
        assert_eq!(issue.code.as_deref(), Some("a.cta-button"));
    }

    #[test]
    fn small_target_is_a_warning() {
        let result = audit(vec![CtaCandidate {
            width: 120.0,
            height: 32.0,
            ..good()
        }]);
        assert!(result.is_valid());
        assert!(has_issue(&result, "Touch target too small: 120x32px (minimum 44x44)"));
    }

    #[test]
    fn exactly_minimum_size_passes() {
        let result = audit(vec![CtaCandidate {
            width: 44.0,
            height: 44.0,
            ..good()
        }]);
        assert_clean(&result);
    }

    #[test]
    fn label_sources() {
        let unlabeled = CtaCandidate {
            text: " → ".into(),
            ..good()
        };
        assert!(!unlabeled.has_label());
        assert!(find_issue(&audit(vec![unlabeled.clone()]), "no accessible label").is_error());

        for labeled in [
            CtaCandidate {
                aria_label: Some("Next".into()),
                ..unlabeled.clone()
            },
            CtaCandidate {
                aria_labelledby: Some("Pricing plans".into()),
                ..unlabeled.clone()
            },
            CtaCandidate {
                image_alt: Some("Download on the App Store".into()),
                ..unlabeled.clone()
            },
        ] {
            assert!(labeled.has_label());
        }

        let blank_aria = CtaCandidate {
            aria_label: Some("   ".into()),
            ..unlabeled
        };
        assert!(!blank_aria.has_label());
    }

    #[test]
    fn multiple_handlers_warn() {
        let result = audit(vec![CtaCandidate {
            click_handlers: 2,
            ..good()
        }]);
        assert!(result.is_valid());
        assert!(has_issue(&result, "2 click handlers"));
    }

    #[test]
    fn missing_focus_style_warns() {
        let result = audit(vec![CtaCandidate {
            has_focus_style: false,
            ..good()
        }]);
        assert!(!find_issue(&result, "focus style").is_error());
    }

    #[test]
    fn disabled_outside_development() {
        let auditor = CtaAuditor::new(CtaConfig {
            development: false,
            ..CtaConfig::default()
        });
        let result = auditor.audit(&DomSnapshot {
            path: "/".into(),
            candidates: vec![CtaCandidate {
                nested_interactive: 3,
                ..good()
            }],
        });
        assert_clean(&result);
        assert!(!result.stats.enabled);
        assert_eq!(result.stats.candidates, 0);
    }

    #[test]
    fn min_target_is_configurable() {
        let auditor = CtaAuditor::new(CtaConfig {
            min_target_px: 24.0,
            ..CtaConfig::default()
        });
        let result = auditor.audit(&DomSnapshot {
            path: "/".into(),
            candidates: vec![CtaCandidate {
                width: 30.0,
                height: 30.0,
                ..good()
            }],
        });
        assert_clean(&result);
    }

    #[test]
    fn snapshot_decodes_collector_json() {
        let json = r#"{
            "path": "/contact",
            "candidates": [{
                "selector": "button#send",
                "tag": "button",
                "text": "",
                "ariaLabel": null,
                "imageAlt": "Send",
                "width": 40.5,
                "height": 40.5,
                "nestedInteractive": 0,
                "clickHandlers": 1,
                "hasFocusStyle": true
            }]
        }"#;
        let snapshot: DomSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.candidates[0].image_alt.as_deref(), Some("Send"));
        assert_eq!(snapshot.candidates[0].aria_labelledby, None);
        assert!(snapshot.candidates[0].has_label());
    }

    #[test]
    fn route_watcher_fires_on_change_only() {
        let mut watcher = RouteWatcher::new();
        assert!(watcher.observe("/"));
        assert!(!watcher.observe("/"));
        assert!(watcher.observe("/pricing"));
        assert!(watcher.observe("/"));
        assert!(!watcher.observe("/"));
    }
}
