//! Scriptable in-memory page.
//!
//! Selector matching is exact-string: an element matches a query when the
//! query string is one of its registered selectors. Click effects let a
//! fixture model the page's reaction to a submission (toast appearing,
//! composer clearing, dialog opening) without a browser.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::bridge::{DomBridge, ElementHandle, MediaFile, SearchScope};
use crate::errors::BridgeError;

/// State mutation applied when a scripted element is clicked.
#[derive(Clone, Debug)]
pub enum ClickEffect {
    ClearText { selector: String },
    SetText { selector: String, text: String },
    Insert(StubElement),
    Remove { selector: String },
    Enable { selector: String },
    OpenDialog,
    CloseDialog,
}

/// Builder for one stub element.
#[derive(Clone, Debug)]
pub struct StubElement {
    selectors: Vec<String>,
    text: String,
    enabled: bool,
    in_dialog: bool,
    html: Option<String>,
    on_click: Vec<ClickEffect>,
}

impl StubElement {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selectors: vec![selector.into()],
            text: String::new(),
            enabled: true,
            in_dialog: false,
            html: None,
            on_click: Vec::new(),
        }
    }

    /// Register an additional selector this element also matches.
    pub fn alias(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn in_dialog(mut self) -> Self {
        self.in_dialog = true;
        self
    }

    pub fn html(mut self, markup: impl Into<String>) -> Self {
        self.html = Some(markup.into());
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }
}

struct Node {
    id: u64,
    selectors: Vec<String>,
    text: String,
    enabled: bool,
    in_dialog: bool,
    html: Option<String>,
    files: usize,
    on_click: Vec<ClickEffect>,
}

impl Node {
    fn matches(&self, selector: &str, scope: SearchScope) -> bool {
        if scope == SearchScope::Dialog && !self.in_dialog {
            return false;
        }
        self.selectors.iter().any(|s| s == selector)
    }

    fn markup(&self) -> String {
        match &self.html {
            Some(html) => html.clone(),
            None => format!("<div>{}</div>", self.text),
        }
    }
}

#[derive(Default)]
struct PageState {
    next_id: u64,
    nodes: Vec<Node>,
    dialog_open: bool,
    body_html: Option<String>,
    interactions: Vec<(String, String)>,
}

impl PageState {
    fn insert(&mut self, element: StubElement) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.push(Node {
            id,
            selectors: element.selectors,
            text: element.text,
            enabled: element.enabled,
            in_dialog: element.in_dialog,
            html: element.html,
            files: 0,
            on_click: element.on_click,
        });
        id
    }

    fn find(&self, selector: &str, scope: SearchScope) -> Option<&Node> {
        self.nodes.iter().find(|n| n.matches(selector, scope))
    }

    fn find_mut(&mut self, selector: &str) -> Option<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.matches(selector, SearchScope::Document))
    }

    fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: u64) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn apply(&mut self, effect: ClickEffect) {
        match effect {
            ClickEffect::ClearText { selector } => {
                if let Some(node) = self.find_mut(&selector) {
                    node.text.clear();
                }
            }
            ClickEffect::SetText { selector, text } => {
                if let Some(node) = self.find_mut(&selector) {
                    node.text = text;
                }
            }
            ClickEffect::Insert(element) => {
                self.insert(element);
            }
            ClickEffect::Remove { selector } => {
                self.nodes
                    .retain(|n| !n.selectors.iter().any(|s| s == &selector));
            }
            ClickEffect::Enable { selector } => {
                if let Some(node) = self.find_mut(&selector) {
                    node.enabled = true;
                }
            }
            ClickEffect::OpenDialog => self.dialog_open = true,
            ClickEffect::CloseDialog => self.dialog_open = false,
        }
    }

    fn record(&mut self, verb: &str, id: u64) {
        let label = self
            .node(id)
            .and_then(|n| n.selectors.first().cloned())
            .unwrap_or_default();
        self.interactions.push((verb.to_string(), label));
    }
}

/// In-memory page shared between a fixture and the pipeline under test.
#[derive(Default)]
pub struct StubPage {
    state: RwLock<PageState>,
}

impl StubPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn insert(&self, element: StubElement) {
        self.state.write().insert(element);
    }

    /// Remove every element matching `selector`. Returns whether any matched.
    pub fn remove(&self, selector: &str) -> bool {
        let mut state = self.state.write();
        let before = state.nodes.len();
        state
            .nodes
            .retain(|n| !n.selectors.iter().any(|s| s == selector));
        state.nodes.len() != before
    }

    pub fn open_dialog(&self) {
        self.state.write().dialog_open = true;
    }

    pub fn close_dialog(&self) {
        self.state.write().dialog_open = false;
    }

    pub fn set_body_html(&self, html: impl Into<String>) {
        self.state.write().body_html = Some(html.into());
    }

    pub fn set_enabled(&self, selector: &str, enabled: bool) {
        if let Some(node) = self.state.write().find_mut(selector) {
            node.enabled = enabled;
        }
    }

    pub fn text_of(&self, selector: &str) -> Option<String> {
        self.state
            .read()
            .find(selector, SearchScope::Document)
            .map(|n| n.text.clone())
    }

    pub fn files_of(&self, selector: &str) -> Option<usize> {
        self.state
            .read()
            .find(selector, SearchScope::Document)
            .map(|n| n.files)
    }

    /// How many times `verb` was performed on an element whose first
    /// registered selector is `selector`.
    pub fn interaction_count(&self, verb: &str, selector: &str) -> usize {
        self.state
            .read()
            .interactions
            .iter()
            .filter(|(v, s)| v == verb && s == selector)
            .count()
    }

    /// Total interactions of a given verb across the whole page.
    pub fn verb_count(&self, verb: &str) -> usize {
        self.state
            .read()
            .interactions
            .iter()
            .filter(|(v, _)| v == verb)
            .count()
    }
}

#[async_trait]
impl DomBridge for StubPage {
    async fn query(&self, selector: &str, scope: SearchScope) -> Option<ElementHandle> {
        self.state
            .read()
            .find(selector, scope)
            .map(|n| ElementHandle(n.id))
    }

    async fn dialog_open(&self) -> bool {
        self.state.read().dialog_open
    }

    async fn is_attached(&self, handle: &ElementHandle) -> bool {
        self.state.read().node(handle.0).is_some()
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> bool {
        self.state
            .read()
            .node(handle.0)
            .map(|n| n.enabled)
            .unwrap_or(false)
    }

    async fn text_content(&self, handle: &ElementHandle) -> Option<String> {
        self.state.read().node(handle.0).map(|n| n.text.clone())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        let effects = match state.node(handle.0) {
            Some(node) => node.on_click.clone(),
            None => return Err(BridgeError::Detached(format!("node {}", handle.0))),
        };
        state.record("click", handle.0);
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }

    async fn focus(&self, handle: &ElementHandle) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        if state.node(handle.0).is_none() {
            return Err(BridgeError::Detached(format!("node {}", handle.0)));
        }
        state.record("focus", handle.0);
        Ok(())
    }

    async fn set_text(&self, handle: &ElementHandle, text: &str) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        state.record("set_text", handle.0);
        match state.node_mut(handle.0) {
            Some(node) => {
                node.text = text.to_string();
                Ok(())
            }
            None => Err(BridgeError::Detached(format!("node {}", handle.0))),
        }
    }

    async fn set_files(
        &self,
        handle: &ElementHandle,
        files: &[MediaFile],
    ) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        state.record("set_files", handle.0);
        match state.node_mut(handle.0) {
            Some(node) => {
                node.files = files.len();
                Ok(())
            }
            None => Err(BridgeError::Detached(format!("node {}", handle.0))),
        }
    }

    async fn select_value(&self, handle: &ElementHandle, value: &str) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        state.record("select_value", handle.0);
        match state.node_mut(handle.0) {
            Some(node) => {
                node.text = value.to_string();
                Ok(())
            }
            None => Err(BridgeError::Detached(format!("node {}", handle.0))),
        }
    }

    async fn capture_region(&self, selector: &str) -> Option<String> {
        self.state
            .read()
            .find(selector, SearchScope::Document)
            .map(|n| n.markup())
    }

    async fn capture_body(&self) -> String {
        let state = self.state.read();
        match &state.body_html {
            Some(html) => html.clone(),
            None => state
                .nodes
                .iter()
                .map(|n| n.markup())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_respects_dialog_scope() {
        let page = StubPage::new();
        page.insert(StubElement::new("#outer"));
        page.insert(StubElement::new("#inner").in_dialog());

        assert!(page.query("#outer", SearchScope::Document).await.is_some());
        assert!(page.query("#outer", SearchScope::Dialog).await.is_none());
        assert!(page.query("#inner", SearchScope::Dialog).await.is_some());
    }

    #[tokio::test]
    async fn click_effects_mutate_the_page() {
        let page = StubPage::new();
        page.insert(StubElement::new("#composer").text("hello"));
        page.insert(
            StubElement::new("#submit")
                .on_click(ClickEffect::ClearText {
                    selector: "#composer".to_string(),
                })
                .on_click(ClickEffect::Insert(
                    StubElement::new("[data-testid=\"toast\"]").text("Your post was sent"),
                )),
        );

        let submit = page.query("#submit", SearchScope::Document).await.unwrap();
        page.click(&submit).await.unwrap();

        assert_eq!(page.text_of("#composer").unwrap(), "");
        assert!(page
            .query("[data-testid=\"toast\"]", SearchScope::Document)
            .await
            .is_some());
        assert_eq!(page.interaction_count("click", "#submit"), 1);
    }

    #[tokio::test]
    async fn detached_handles_error_on_interaction() {
        let page = StubPage::new();
        page.insert(StubElement::new("#gone"));
        let handle = page.query("#gone", SearchScope::Document).await.unwrap();
        page.remove("#gone");

        assert!(!page.is_attached(&handle).await);
        assert!(page.click(&handle).await.is_err());
    }

    #[tokio::test]
    async fn body_capture_synthesizes_markup() {
        let page = StubPage::new();
        page.insert(StubElement::new("#a").html("<section>alpha</section>"));
        page.insert(StubElement::new("#b").text("beta"));
        let body = page.capture_body().await;
        assert!(body.contains("<section>alpha</section>"));
        assert!(body.contains("beta"));
    }
}
