//! CTA collector tests in a real Chrome.
//!
//! A fixture page is served over a local HTTP server (client-side routing
//! with `history.pushState` needs an http origin) and the collector script is
//! evaluated in it.
//!
//! Run with: `cargo test --test browser_cta -- --ignored`

use headless_chrome::{Browser, LaunchOptions, Tab};
use site_assets::config::CtaConfig;
use site_assets::cta::browser::{collect_snapshot, run};
use site_assets::cta::{CtaAuditor, CtaCandidate, DomSnapshot};
use std::io::{Read as _, Write as _};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const FIXTURE: &str = r#"<!doctype html>
<html>
<head>
<style>
  .cta-button { display: inline-block; min-width: 160px; min-height: 48px; }
  .cta-button:focus-visible { outline: 2px solid #0a58ca; }
</style>
</head>
<body>
  <a href="/demo" class="cta-button" id="good">Book a demo</a>
  <button id="tiny" style="width: 20px; height: 20px; padding: 0">Go</button>
  <a href="/x" class="cta-button" id="nested"><button>Inner</button> Outer</a>
  <button id="icon" class="cta-button">&rarr;</button>
  <button id="labelled" class="cta-button" aria-labelledby="plan">&rarr;</button>
  <span id="plan">Pro plan</span>
  <button id="skipped" class="cta-button" data-cta-ignore>Skip</button>
  <button id="hidden" style="display: none">Hidden</button>
  <script>
    if (location.search === '?spa') {
      setTimeout(() => history.pushState({}, '', '/pricing'), 400);
    }
  </script>
</body>
</html>
"#;

// ===========================================================================
// Minimal HTTP server: every path serves the fixture
// ===========================================================================

struct TestServer {
    port: u16,
    _dir: TempDir,
    _stop: std::sync::mpsc::Sender<()>,
}

impl TestServer {
    fn start() -> Self {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, FIXTURE).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        thread::spawn(move || {
            listener.set_nonblocking(true).unwrap();
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _)) => {
                        let page = page.clone();
                        thread::spawn(move || serve_request(stream, page));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            port,
            _dir: dir,
            _stop: tx,
        }
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }
}

fn serve_request(mut stream: std::net::TcpStream, page: PathBuf) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 4096];
    if !matches!(stream.read(&mut buf), Ok(n) if n > 0) {
        return;
    }
    let body = std::fs::read(&page).unwrap_or_default();
    let header = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

// ===========================================================================
// Setup helpers
// ===========================================================================

fn browser() -> &'static Browser {
    static B: OnceLock<Browser> = OnceLock::new();
    B.get_or_init(|| {
        Browser::new(LaunchOptions {
            window_size: Some((390, 844)),
            ..Default::default()
        })
        .expect("failed to launch Chrome")
    })
}

fn open(server: &TestServer) -> Arc<Tab> {
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&server.url())
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    tab
}

fn snapshot() -> DomSnapshot {
    let server = TestServer::start();
    let tab = open(&server);
    collect_snapshot(&tab, &CtaConfig::default()).unwrap()
}

fn candidate<'a>(snapshot: &'a DomSnapshot, selector: &str) -> &'a CtaCandidate {
    snapshot
        .candidates
        .iter()
        .find(|c| c.selector == selector)
        .unwrap_or_else(|| {
            let seen: Vec<&str> = snapshot.candidates.iter().map(|c| c.selector.as_str()).collect();
            panic!("no candidate {selector}, got {seen:?}")
        })
}

// ===========================================================================
// Collector
// ===========================================================================

#[test]
#[ignore]
fn well_formed_cta_measures_clean() {
    let snap = snapshot();
    assert_eq!(snap.path, "/");
    let good = candidate(&snap, "a#good.cta-button");
    assert_eq!(good.text, "Book a demo");
    assert!(good.width >= 44.0 && good.height >= 44.0, "{good:?}");
    assert_eq!(good.nested_interactive, 0);
    assert!(good.has_focus_style);
}

#[test]
#[ignore]
fn nested_interactive_is_counted() {
    let snap = snapshot();
    assert_eq!(candidate(&snap, "a#nested.cta-button").nested_interactive, 1);
}

#[test]
#[ignore]
fn small_button_reports_its_box() {
    let snap = snapshot();
    let tiny = candidate(&snap, "button#tiny");
    assert!(tiny.width < 44.0, "{tiny:?}");
    assert!(!tiny.has_focus_style);
}

#[test]
#[ignore]
fn label_sources_are_resolved() {
    let snap = snapshot();
    assert!(!candidate(&snap, "button#icon.cta-button").has_label());
    let labelled = candidate(&snap, "button#labelled.cta-button");
    assert_eq!(labelled.aria_labelledby.as_deref(), Some("Pro plan"));
    assert!(labelled.has_label());
}

#[test]
#[ignore]
fn ignored_and_hidden_elements_are_skipped() {
    let snap = snapshot();
    assert!(snap.candidates.iter().all(|c| !c.selector.contains("skipped")));
    assert!(snap.candidates.iter().all(|c| !c.selector.contains("hidden")));
}

#[test]
#[ignore]
fn fixture_audit_fails_on_errors() {
    let snap = snapshot();
    let result = CtaAuditor::new(CtaConfig::default()).audit(&snap);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|i| i.message.contains("nested interactive")));
    assert!(result.errors.iter().any(|i| i.message.contains("no accessible label")));
}

// ===========================================================================
// Route watching
// ===========================================================================

#[test]
#[ignore]
fn route_change_triggers_a_second_audit() {
    let server = TestServer::start();
    let auditor = CtaAuditor::new(CtaConfig {
        settle_delay_ms: 100,
        poll_interval_ms: 100,
        ..CtaConfig::default()
    });
    let mut routes = Vec::new();
    let audits = run(
        &format!("{}?spa", server.url()),
        &auditor,
        Duration::from_secs(3),
        |result| routes.push(result.stats.route.clone()),
    )
    .unwrap();
    assert_eq!(audits, 2);
    assert_eq!(routes, vec!["/", "/pricing"]);
}
