//! End-to-end heal protocol tests: stub page, real HTTP service, orchestrator.

use std::sync::Arc;
use std::time::Duration;

use action_executor::{ActionRequest, ExecutorConfig, Submission};
use dom_bridge::{ClickEffect, StubElement, StubPage};
use heal_client::HealClient;
use heal_service::{build_router, ServiceState};
use postpilot_core_types::{SelectorDef, SelectorMap, SelectorSet, Version};
use selector_store::{MemoryStore, SelectorStore};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use postpilot_cli::{Orchestrator, OrchestratorConfig};

const TEXTAREA: &str = "[data-testid=\"tweetTextarea_0\"]";
const TWEET_BUTTON: &str = "[data-testid=\"tweetButton\"]";
const TOAST: &str = "[data-testid=\"toast\"]";

fn fast_executor_cfg() -> ExecutorConfig {
    ExecutorConfig {
        resolve_timeout: Duration::from_millis(150),
        soft_resolve_timeout: Duration::from_millis(40),
        poll_interval: Duration::from_millis(10),
        enable_timeout: Duration::from_millis(150),
        completion_timeout: Duration::from_millis(200),
        completion_poll: Duration::from_millis(10),
        preview_timeout: Duration::from_millis(40),
    }
}

async fn spawn_service(state: ServiceState) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

fn orchestrator(page: &Arc<StubPage>, base_url: &str) -> Orchestrator {
    Orchestrator::new(
        page.clone(),
        HealClient::new(base_url),
        fast_executor_cfg(),
        OrchestratorConfig::default(),
    )
}

fn post_request(text: &str) -> ActionRequest {
    ActionRequest::Post {
        text: text.to_string(),
        audience: None,
        media: vec![],
    }
}

/// Seed set whose postButton points at dead selectors.
fn set_with_post_button(primary: &str, fallback: &[&str]) -> SelectorSet {
    let mut selectors = SelectorMap::new();
    let composer = selectors.entry("composer".to_string()).or_default();
    composer.insert(
        "textArea".to_string(),
        SelectorDef::new(TEXTAREA).with_pattern("[data-testid=\"tweetTextarea_{index}\"]"),
    );
    let mut def = SelectorDef::new(primary);
    for f in fallback {
        def = def.with_fallback(*f);
    }
    composer.insert("postButton".to_string(), def);
    SelectorSet::new(Version::new(1, 0, 0)).with_selectors(selectors)
}

fn submit_button(selector: &str) -> StubElement {
    StubElement::new(selector)
        .on_click(ClickEffect::ClearText {
            selector: TEXTAREA.to_string(),
        })
        .on_click(ClickEffect::Insert(
            StubElement::new(TOAST).text("Your post was sent"),
        ))
}

#[tokio::test]
async fn fallback_resolution_succeeds_without_healing() {
    // v1.0.0: primary selector is gone from the page, fallback still works.
    let store = Arc::new(MemoryStore::seeded(set_with_post_button(
        "#btn-old",
        &["#btn-fallback"],
    )));
    let (base_url, _server) = spawn_service(ServiceState::new(store.clone())).await;

    let page = StubPage::shared();
    page.insert(StubElement::new(TEXTAREA));
    page.insert(submit_button("#btn-fallback"));

    let report = orchestrator(&page, &base_url).run(&post_request("hello")).await;

    assert!(report.success);
    assert_eq!(report.submission, Some(Submission::Confirmed));
    assert!(report.healed.is_empty());
    // Resolution succeeded (via fallback), so no healing was triggered and
    // the store never moved past the seeded version.
    let status = store.status().await;
    assert_eq!(status.current_version, Some(Version::new(1, 0, 0)));
    assert_eq!(status.versions_retained, 1);
}

#[tokio::test]
async fn heal_then_retry_succeeds() {
    // Every stored strategy for postButton is dead; the page has moved to
    // the selector the fallback table knows about.
    let store = Arc::new(MemoryStore::seeded(set_with_post_button(
        "#btn-old",
        &["#btn-dead"],
    )));
    let (base_url, _server) = spawn_service(ServiceState::new(store.clone())).await;

    let page = StubPage::shared();
    page.insert(StubElement::new(TEXTAREA));
    page.insert(submit_button(TWEET_BUTTON));

    let report = orchestrator(&page, &base_url).run(&post_request("hello")).await;

    assert!(report.success, "report: {:?}", report);
    assert_eq!(report.healed, vec!["postButton"]);
    assert_eq!(report.version, Some(Version::new(1, 0, 1)));
    assert!(report.failed_selectors.is_empty());
    assert_eq!(page.interaction_count("click", TWEET_BUTTON), 1);

    // Merged set persisted under both keys, history appended.
    let current = store.get_current().await.unwrap().unwrap();
    assert_eq!(current.version, Version::new(1, 0, 1));
    assert_eq!(
        current.get("composer", "postButton").unwrap().primary,
        TWEET_BUTTON
    );
    assert_eq!(current.healing_history.len(), 1);
    assert_eq!(current.healing_history[0].healed, vec!["postButton"]);
    assert_eq!(
        current.healing_history[0].previous_version,
        Some(Version::new(1, 0, 0))
    );
    assert!(store
        .get_version(&Version::new(1, 0, 1))
        .await
        .is_ok());
    // The captured snapshot became the new drift baseline.
    assert!(store.get_fingerprint().await.unwrap().is_some());
}

#[tokio::test]
async fn persistent_failure_stops_after_one_retry() {
    let store = Arc::new(MemoryStore::seeded(set_with_post_button("#btn-old", &[])));
    let (base_url, _server) = spawn_service(ServiceState::new(store.clone())).await;

    // The page never grows a post button, healed or not.
    let page = StubPage::shared();
    page.insert(StubElement::new(TEXTAREA));

    let report = orchestrator(&page, &base_url).run(&post_request("hello")).await;

    assert!(!report.success);
    assert_eq!(report.failed_selectors, vec!["postButton"]);
    assert_eq!(report.healed, vec!["postButton"]);
    assert_eq!(report.version, Some(Version::new(1, 0, 1)));
    // The action ran exactly twice: one heal, one retry, then terminal.
    assert_eq!(page.verb_count("set_text"), 2);
    assert_eq!(
        store.list_versions().await.unwrap(),
        vec![Version::new(1, 0, 0), Version::new(1, 0, 1)]
    );
}

#[tokio::test]
async fn missing_definition_heals_from_table() {
    // The set has no textArea entry at all: configuration absence, healed
    // the same way as drift.
    let mut selectors = SelectorMap::new();
    selectors.entry("composer".to_string()).or_default().insert(
        "postButton".to_string(),
        SelectorDef::new(TWEET_BUTTON),
    );
    let set = SelectorSet::new(Version::new(1, 0, 0)).with_selectors(selectors);
    let store = Arc::new(MemoryStore::seeded(set));
    let (base_url, _server) = spawn_service(ServiceState::new(store.clone())).await;

    let page = StubPage::shared();
    page.insert(StubElement::new(TEXTAREA));
    page.insert(submit_button(TWEET_BUTTON));

    let report = orchestrator(&page, &base_url).run(&post_request("hello")).await;

    assert!(report.success, "report: {:?}", report);
    assert_eq!(report.healed, vec!["textArea"]);
    let current = store.get_current().await.unwrap().unwrap();
    assert!(current.get("composer", "textArea").is_some());
}

#[tokio::test]
async fn unreachable_service_surfaces_original_failed_names() {
    let store = Arc::new(MemoryStore::seeded(set_with_post_button(
        "#btn-old",
        &["#btn-fallback"],
    )));
    let (base_url, server) = spawn_service(ServiceState::new(store)).await;

    let page = StubPage::shared();
    page.insert(StubElement::new(TEXTAREA));
    page.insert(submit_button("#btn-fallback"));

    let orchestrator = orchestrator(&page, &base_url);

    // First run initializes the registry and succeeds normally.
    let report = orchestrator.run(&post_request("hello")).await;
    assert!(report.success);

    // The service goes away and the page drifts past the fallback.
    server.abort();
    let _ = server.await;
    page.remove("#btn-fallback");

    let report = orchestrator.run(&post_request("again")).await;

    assert!(!report.success);
    assert_eq!(report.failed_selectors, vec!["postButton"]);
    assert!(report.healed.is_empty());
    assert!(report.error.unwrap().contains("healing failed"));
}
