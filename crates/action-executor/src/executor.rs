//! Action executor implementation

use std::sync::Arc;

use dom_bridge::{DomBridge, ElementHandle, MediaFile, SearchScope};
use element_resolver::{ElementResolver, ResolveOptions, Resolved};
use postpilot_core_types::SelectorDef;
use selector_registry::SelectorRegistry;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::types::{ActionOutcome, ActionRequest, Audience, ExecutorConfig, PollLength, Submission};

/// Confirmation toast shown after a successful submission.
const TOAST_SELECTOR: &str = "[data-testid=\"toast\"]";

/// Preview markers that appear once attached media finished uploading.
const PREVIEW_SELECTORS: [&str; 2] = ["[data-testid=\"attachments\"]", "[data-testid=\"tweetPhoto\"]"];

/// The reply-audience control, whichever restriction is currently active.
const AUDIENCE_BUTTON_SELECTORS: [&str; 4] = [
    "[aria-label=\"Everyone can reply\"]",
    "[aria-label=\"Accounts you follow can reply\"]",
    "[aria-label=\"Only people you mention can reply\"]",
    "[aria-label=\"Verified accounts can reply\"]",
];

/// Used when the selector set carries no pattern for the composer text area.
const DEFAULT_TEXTAREA_PATTERN: &str = "[data-testid=\"tweetTextarea_{index}\"]";

/// Used when the selector set carries no pattern for poll choice inputs.
/// Choice inputs are 1-based on the page.
const DEFAULT_POLL_CHOICE_PATTERN: &str = "input[name=\"Choice{index}\"]";

fn menu_item_selector(label: &str) -> String {
    format!("[role=\"menuitem\"]:has-text(\"{}\")", label)
}

/// Executes one user-level action against a page.
pub struct ActionExecutor {
    bridge: Arc<dyn DomBridge>,
    resolver: ElementResolver,
    cfg: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(bridge: Arc<dyn DomBridge>, cfg: ExecutorConfig) -> Self {
        let resolver = ElementResolver::new(bridge.clone());
        Self {
            bridge,
            resolver,
            cfg,
        }
    }

    /// Run one action to completion, collecting failed selector names.
    pub async fn execute(&self, registry: &SelectorRegistry, request: &ActionRequest) -> ActionOutcome {
        info!(kind = request.kind(), "action started");
        let outcome = match request {
            ActionRequest::Post {
                text,
                audience,
                media,
            } => self.run_post(registry, text, *audience, media).await,
            ActionRequest::ThreadPost {
                entries,
                audience,
                media,
            } => self.run_thread(registry, entries, *audience, media).await,
            ActionRequest::PollPost {
                text,
                options,
                length,
                audience,
            } => {
                self.run_poll(registry, text, options, *length, *audience)
                    .await
            }
        };
        if outcome.success {
            info!(kind = request.kind(), submission = ?outcome.submission, "action finished");
        } else {
            warn!(
                kind = request.kind(),
                error = outcome.error.as_deref().unwrap_or(""),
                failed = outcome.failed_selectors.len(),
                "action failed"
            );
        }
        outcome
    }

    async fn run_post(
        &self,
        registry: &SelectorRegistry,
        text: &str,
        audience: Option<Audience>,
        media: &[MediaFile],
    ) -> ActionOutcome {
        let mut failed = Vec::new();
        let scope = self.scope().await;

        let text_area = match self
            .resolve_required(registry, "composer", "textArea", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("post text area could not be located", failed)
            }
        };
        if let Err(outcome) = self.enter_text(&text_area.handle, text).await {
            return outcome;
        }

        if let Some(audience) = audience {
            if audience != Audience::Everyone {
                self.set_audience(audience).await;
            }
        }

        if !media.is_empty() {
            if let Err(outcome) = self.attach_media(registry, media, &mut failed).await {
                return outcome;
            }
        }

        let def = registry
            .get("composer", "postButtonInline")
            .or_else(|| registry.get("composer", "postButtonModal"))
            .or_else(|| registry.get("composer", "postButton"));
        let button = match self
            .resolve_with_def(def, "postButton", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("post button could not be located", failed)
            }
        };

        self.submit(registry, &button.handle, text, None).await
    }

    async fn run_thread(
        &self,
        registry: &SelectorRegistry,
        entries: &[String],
        audience: Option<Audience>,
        media: &[MediaFile],
    ) -> ActionOutcome {
        let entries: Vec<&String> = entries.iter().filter(|t| !t.trim().is_empty()).collect();
        if entries.is_empty() {
            return ActionOutcome::failed("thread contains no non-empty entries");
        }

        let mut failed = Vec::new();
        let text_area_def = indexed_def(
            registry.get("composer", "textArea"),
            "[data-testid=\"tweetTextarea_0\"]",
            DEFAULT_TEXTAREA_PATTERN,
        );

        let mut posted = 0usize;
        let last = entries.len() - 1;
        for (index, text) in entries.iter().enumerate() {
            let scope = self.scope().await;
            let opts = self.opts(self.cfg.resolve_timeout).scoped(scope);
            let area = match self
                .resolver
                .resolve_indexed("textArea", &text_area_def, index, &opts)
                .await
            {
                Ok(resolved) => resolved,
                Err(failure) => {
                    push_failed(&mut failed, &failure.name);
                    return ActionOutcome::failed_resolution(
                        format!("text area for thread entry {} could not be located", index + 1),
                        failed,
                    );
                }
            };
            if let Err(outcome) = self.enter_text(&area.handle, text).await {
                return outcome;
            }

            if index == 0 {
                if let Some(audience) = audience {
                    if audience != Audience::Everyone {
                        self.set_audience(audience).await;
                    }
                }
                if !media.is_empty() {
                    if let Err(outcome) = self.attach_media(registry, media, &mut failed).await {
                        return outcome;
                    }
                }
            }

            if index < last {
                self.click_thread_add(registry).await;
            }
            posted += 1;
        }

        let scope = self.scope().await;
        let def = registry
            .get("composer", "postButton")
            .or_else(|| registry.get("composer", "postButtonInline"))
            .or_else(|| registry.get("composer", "postButtonModal"));
        let button = match self
            .resolve_with_def(def, "postButton", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("post button could not be located", failed)
            }
        };

        let last_text = entries[last].as_str();
        self.submit(registry, &button.handle, last_text, Some(posted)).await
    }

    async fn run_poll(
        &self,
        registry: &SelectorRegistry,
        text: &str,
        options: &[String],
        length: Option<PollLength>,
        audience: Option<Audience>,
    ) -> ActionOutcome {
        if options.len() < 2 {
            return ActionOutcome::failed("a poll needs at least two options");
        }

        let mut failed = Vec::new();
        let scope = self.scope().await;

        let text_area = match self
            .resolve_required(registry, "composer", "textArea", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("post text area could not be located", failed)
            }
        };
        if !text.is_empty() {
            if let Err(outcome) = self.enter_text(&text_area.handle, text).await {
                return outcome;
            }
        }

        let poll_button = match self
            .resolve_required(registry, "options", "pollButton", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("poll button could not be located", failed)
            }
        };
        let _ = self.bridge.focus(&poll_button.handle).await;
        if let Err(err) = self.bridge.click(&poll_button.handle).await {
            return ActionOutcome::failed(format!("poll button interaction failed: {}", err));
        }

        // The poll form may have opened inside a dialog.
        let scope = self.scope().await;
        self.fill_poll_options(registry, options, scope).await;
        if let Some(length) = length {
            self.set_poll_length(registry, length, scope).await;
        }

        if let Some(audience) = audience {
            if audience != Audience::Everyone {
                self.set_audience(audience).await;
            }
        }

        let def = registry
            .get("composer", "postButton")
            .or_else(|| registry.get("composer", "postButtonInline"))
            .or_else(|| registry.get("composer", "postButtonModal"));
        let button = match self
            .resolve_with_def(def, "postButton", scope, &mut failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return ActionOutcome::failed_resolution("post button could not be located", failed)
            }
        };

        self.submit(registry, &button.handle, text, None).await
    }

    /// Wait-enabled precondition, click, completion wait. The enable wait is
    /// a hard action failure, never heal-eligible: the control was found, it
    /// just refused to arm.
    async fn submit(
        &self,
        registry: &SelectorRegistry,
        button: &ElementHandle,
        submitted_text: &str,
        posted: Option<usize>,
    ) -> ActionOutcome {
        if !self.wait_enabled(button).await {
            return ActionOutcome::failed("post control never became enabled");
        }
        if let Err(err) = self.bridge.click(button).await {
            return ActionOutcome::failed(format!("submit interaction failed: {}", err));
        }
        debug!("submit control clicked");
        let submission = self.wait_for_completion(registry, submitted_text).await;
        ActionOutcome::submitted(submission, posted)
    }

    /// Completion detection: bounded poll over two independent signals.
    /// Timeout is a soft outcome — absence of a signal does not reliably
    /// mean the submission failed.
    async fn wait_for_completion(&self, registry: &SelectorRegistry, submitted_text: &str) -> Submission {
        let primary = registry
            .get("composer", "textArea")
            .map(|def| def.primary)
            .unwrap_or_else(|| "[data-testid=\"tweetTextarea_0\"]".to_string());

        let initial = match self.bridge.query(&primary, SearchScope::Document).await {
            Some(handle) => self.bridge.text_content(&handle).await.unwrap_or_default(),
            None => submitted_text.to_string(),
        };

        let deadline = Instant::now() + self.cfg.completion_timeout;
        loop {
            if let Some(toast) = self.bridge.query(TOAST_SELECTOR, SearchScope::Document).await {
                let text = self.bridge.text_content(&toast).await.unwrap_or_default();
                if text.contains("sent") {
                    debug!("completion confirmed by toast");
                    return Submission::Confirmed;
                }
            }

            if !initial.is_empty() {
                if let Some(area) = self.bridge.query(&primary, SearchScope::Document).await {
                    let text = self.bridge.text_content(&area).await.unwrap_or_default();
                    if text != initial && text.is_empty() {
                        debug!("completion confirmed by cleared composer");
                        return Submission::Confirmed;
                    }
                }
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(self.cfg.completion_poll).await;
        }

        warn!("completion detection timed out, treating submission as unconfirmed");
        Submission::Unconfirmed
    }

    async fn wait_enabled(&self, handle: &ElementHandle) -> bool {
        let deadline = Instant::now() + self.cfg.enable_timeout;
        loop {
            if self.bridge.is_enabled(handle).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.cfg.poll_interval).await;
        }
    }

    /// click -> focus -> set text: the page only registers programmatic
    /// input on a focused, activated editor.
    async fn enter_text(&self, handle: &ElementHandle, text: &str) -> Result<(), ActionOutcome> {
        let steps = async {
            self.bridge.click(handle).await?;
            self.bridge.focus(handle).await?;
            self.bridge.set_text(handle, text).await
        };
        steps
            .await
            .map_err(|err| ActionOutcome::failed(format!("text entry failed: {}", err)))
    }

    /// Audience selection is best-effort: a missing control or menu item is
    /// logged and skipped, the post itself proceeds.
    async fn set_audience(&self, audience: Audience) {
        let mut button = None;
        for selector in AUDIENCE_BUTTON_SELECTORS {
            if let Some(handle) = self.bridge.query(selector, SearchScope::Document).await {
                button = Some(handle);
                break;
            }
        }
        let Some(button) = button else {
            warn!("audience control not found, keeping current audience");
            return;
        };
        if self.bridge.click(&button).await.is_err() {
            warn!("audience control refused the click");
            return;
        }

        let selector = menu_item_selector(audience.label());
        match self.bridge.query(&selector, SearchScope::Document).await {
            Some(item) => {
                if self.bridge.click(&item).await.is_ok() {
                    debug!(audience = audience.label(), "audience selected");
                } else {
                    warn!(audience = audience.label(), "audience menu item refused the click");
                }
            }
            None => warn!(audience = audience.label(), "audience menu item not found"),
        }
    }

    /// Attaching media is heal-eligible at the resolution step and soft at
    /// the preview-wait step.
    async fn attach_media(
        &self,
        registry: &SelectorRegistry,
        media: &[MediaFile],
        failed: &mut Vec<String>,
    ) -> Result<(), ActionOutcome> {
        let scope = self.scope().await;
        let input = match self
            .resolve_required(registry, "media", "fileInput", scope, failed)
            .await
        {
            Some(resolved) => resolved,
            None => {
                return Err(ActionOutcome::failed_resolution(
                    "media file input could not be located",
                    failed.clone(),
                ))
            }
        };
        if let Err(err) = self.bridge.set_files(&input.handle, media).await {
            return Err(ActionOutcome::failed(format!("media attach failed: {}", err)));
        }

        let deadline = Instant::now() + self.cfg.preview_timeout;
        loop {
            for selector in PREVIEW_SELECTORS {
                if self.bridge.query(selector, SearchScope::Document).await.is_some() {
                    debug!(count = media.len(), "media preview appeared");
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                warn!("media preview wait timed out, continuing");
                return Ok(());
            }
            sleep(self.cfg.completion_poll).await;
        }
    }

    /// The thread add button is best-effort; its absence downgrades the rest
    /// of the thread to whatever entries already have text areas.
    async fn click_thread_add(&self, registry: &SelectorRegistry) {
        let scope = self.scope().await;
        let def = registry.get("composer", "addButton");
        let opts = self.opts(self.cfg.soft_resolve_timeout).scoped(scope);
        match self.resolver.resolve_def("addButton", def.as_ref(), &opts).await {
            Ok(resolved) => {
                let _ = self.bridge.focus(&resolved.handle).await;
                if self.bridge.click(&resolved.handle).await.is_err() {
                    warn!("thread add button refused the click");
                }
            }
            Err(_) => warn!("thread add button not found, posting entries so far"),
        }
    }

    async fn fill_poll_options(&self, registry: &SelectorRegistry, options: &[String], scope: SearchScope) {
        let choice_def = indexed_def(
            registry.get("options", "pollChoice"),
            "input[name=\"Choice1\"]",
            DEFAULT_POLL_CHOICE_PATTERN,
        );
        let opts = self.opts(self.cfg.soft_resolve_timeout).scoped(scope);

        for (i, option) in options.iter().take(4).enumerate() {
            let index = i + 1;
            let mut input = self
                .resolver
                .resolve_indexed("pollChoice", &choice_def, index, &opts)
                .await
                .ok();

            // The 3rd and 4th choice inputs only exist after the add
            // control creates them.
            if input.is_none() && i >= 2 {
                if let Some(def) = registry.get("options", "addPollChoice") {
                    if let Ok(add) = self.resolver.resolve("addPollChoice", &def, &opts).await {
                        let _ = self.bridge.click(&add.handle).await;
                        input = self
                            .resolver
                            .resolve_indexed("pollChoice", &choice_def, index, &opts)
                            .await
                            .ok();
                    }
                }
            }

            match input {
                Some(resolved) => {
                    let _ = self.bridge.focus(&resolved.handle).await;
                    if self.bridge.set_text(&resolved.handle, option).await.is_ok() {
                        debug!(index, "poll choice filled");
                    } else {
                        warn!(index, "poll choice input refused the text");
                    }
                }
                None => warn!(index, "poll choice input not found"),
            }
        }
    }

    async fn set_poll_length(&self, registry: &SelectorRegistry, length: PollLength, scope: SearchScope) {
        let fields = [
            ("pollDays", length.days),
            ("pollHours", length.hours),
            ("pollMinutes", length.minutes),
        ];
        let opts = self.opts(self.cfg.soft_resolve_timeout).scoped(scope);
        for (name, value) in fields {
            let def = registry.get("options", name);
            match self.resolver.resolve_def(name, def.as_ref(), &opts).await {
                Ok(resolved) => {
                    if self
                        .bridge
                        .select_value(&resolved.handle, &value.to_string())
                        .await
                        .is_err()
                    {
                        warn!(name, "poll length select refused the value");
                    }
                }
                Err(_) => warn!(name, "poll length select not found"),
            }
        }
    }

    async fn resolve_required(
        &self,
        registry: &SelectorRegistry,
        category: &str,
        name: &str,
        scope: SearchScope,
        failed: &mut Vec<String>,
    ) -> Option<Resolved> {
        self.resolve_with_def(registry.get(category, name), name, scope, failed)
            .await
    }

    async fn resolve_with_def(
        &self,
        def: Option<SelectorDef>,
        name: &str,
        scope: SearchScope,
        failed: &mut Vec<String>,
    ) -> Option<Resolved> {
        let opts = self.opts(self.cfg.resolve_timeout).scoped(scope);
        match self.resolver.resolve_def(name, def.as_ref(), &opts).await {
            Ok(resolved) => Some(resolved),
            Err(failure) => {
                push_failed(failed, &failure.name);
                None
            }
        }
    }

    fn opts(&self, timeout: std::time::Duration) -> ResolveOptions {
        ResolveOptions::new(timeout, self.cfg.poll_interval)
    }

    async fn scope(&self) -> SearchScope {
        if self.bridge.dialog_open().await {
            SearchScope::Dialog
        } else {
            SearchScope::Document
        }
    }
}

fn push_failed(failed: &mut Vec<String>, name: &str) {
    if !failed.iter().any(|f| f == name) {
        failed.push(name.to_string());
    }
}

/// Definition used for indexed resolution, falling back to the well-known
/// default pattern when the stored definition carries none.
fn indexed_def(def: Option<SelectorDef>, default_primary: &str, default_pattern: &str) -> SelectorDef {
    match def {
        Some(def) if def.pattern.is_some() => def,
        Some(def) => def.with_pattern(default_pattern),
        None => SelectorDef::new(default_primary).with_pattern(default_pattern),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dom_bridge::{ClickEffect, StubElement, StubPage};
    use postpilot_core_types::{SelectorMap, SelectorSet, Version};

    use super::*;

    fn fast_cfg() -> ExecutorConfig {
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

    fn seed_registry() -> SelectorRegistry {
        let mut selectors = SelectorMap::new();
        let composer = selectors.entry("composer".to_string()).or_default();
        composer.insert(
            "textArea".to_string(),
            SelectorDef::new("[data-testid=\"tweetTextarea_0\"]")
                .with_fallback("[role=\"textbox\"]")
                .with_pattern(DEFAULT_TEXTAREA_PATTERN),
        );
        composer.insert(
            "postButton".to_string(),
            SelectorDef::new("[data-testid=\"tweetButton\"]"),
        );
        composer.insert(
            "addButton".to_string(),
            SelectorDef::new("[data-testid=\"addButton\"]"),
        );
        let options = selectors.entry("options".to_string()).or_default();
        options.insert(
            "pollButton".to_string(),
            SelectorDef::new("[data-testid=\"createPollButton\"]"),
        );
        options.insert(
            "pollChoice".to_string(),
            SelectorDef::new("input[name=\"Choice1\"]").with_pattern(DEFAULT_POLL_CHOICE_PATTERN),
        );
        options.insert(
            "addPollChoice".to_string(),
            SelectorDef::new("[data-testid=\"addPollChoice\"]"),
        );
        SelectorRegistry::with_set(
            SelectorSet::new(Version::new(1, 0, 0)).with_selectors(selectors),
        )
    }

    fn composer_page() -> Arc<StubPage> {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]"));
        page.insert(
            StubElement::new("[data-testid=\"tweetButton\"]")
                .on_click(ClickEffect::ClearText {
                    selector: "[data-testid=\"tweetTextarea_0\"]".to_string(),
                })
                .on_click(ClickEffect::Insert(
                    StubElement::new(TOAST_SELECTOR).text("Your post was sent"),
                )),
        );
        page
    }

    #[tokio::test]
    async fn post_happy_path_confirms_via_toast() {
        let page = composer_page();
        let executor = ActionExecutor::new(page.clone(), fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::Post {
            text: "hello world".to_string(),
            audience: None,
            media: vec![],
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(outcome.success);
        assert_eq!(outcome.submission, Some(Submission::Confirmed));
        assert!(outcome.failed_selectors.is_empty());
        assert_eq!(
            page.interaction_count("click", "[data-testid=\"tweetButton\"]"),
            1
        );
    }

    #[tokio::test]
    async fn missing_post_button_aggregates_failed_name() {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]"));
        let executor = ActionExecutor::new(page, fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::Post {
            text: "hello".to_string(),
            audience: None,
            media: vec![],
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(!outcome.success);
        assert!(outcome.is_resolution_failure());
        assert_eq!(outcome.failed_selectors, vec!["postButton"]);
    }

    #[tokio::test]
    async fn disabled_submit_is_a_hard_precondition_failure() {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]"));
        page.insert(StubElement::new("[data-testid=\"tweetButton\"]").disabled());
        let executor = ActionExecutor::new(page, fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::Post {
            text: "hello".to_string(),
            audience: None,
            media: vec![],
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(!outcome.success);
        // Not heal-eligible: the control resolved fine.
        assert!(outcome.failed_selectors.is_empty());
        assert!(outcome.error.unwrap().contains("enabled"));
    }

    #[tokio::test]
    async fn silent_page_yields_unconfirmed_success() {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]"));
        page.insert(StubElement::new("[data-testid=\"tweetButton\"]"));
        let executor = ActionExecutor::new(page, fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::Post {
            text: "quiet".to_string(),
            audience: None,
            media: vec![],
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(outcome.success);
        assert_eq!(outcome.submission, Some(Submission::Unconfirmed));
    }

    #[tokio::test]
    async fn thread_post_fills_each_indexed_entry() {
        let page = StubPage::shared();
        page.open_dialog();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]").in_dialog());
        page.insert(
            StubElement::new("[data-testid=\"addButton\"]")
                .in_dialog()
                .on_click(ClickEffect::Insert(
                    StubElement::new("[data-testid=\"tweetTextarea_1\"]").in_dialog(),
                )),
        );
        page.insert(
            StubElement::new("[data-testid=\"tweetButton\"]")
                .in_dialog()
                .on_click(ClickEffect::Insert(
                    StubElement::new(TOAST_SELECTOR).text("Your post was sent"),
                )),
        );
        let executor = ActionExecutor::new(page.clone(), fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::ThreadPost {
            entries: vec!["first".to_string(), "second".to_string()],
            audience: None,
            media: vec![],
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(outcome.success, "outcome: {:?}", outcome);
        assert_eq!(outcome.posted, Some(2));
        assert_eq!(
            page.text_of("[data-testid=\"tweetTextarea_0\"]").unwrap(),
            "first"
        );
        assert_eq!(
            page.text_of("[data-testid=\"tweetTextarea_1\"]").unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn poll_post_fills_choices_and_adds_third() {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_0\"]"));
        page.insert(StubElement::new("[data-testid=\"createPollButton\"]"));
        page.insert(StubElement::new("input[name=\"Choice1\"]"));
        page.insert(StubElement::new("input[name=\"Choice2\"]"));
        page.insert(
            StubElement::new("[data-testid=\"addPollChoice\"]").on_click(ClickEffect::Insert(
                StubElement::new("input[name=\"Choice3\"]"),
            )),
        );
        page.insert(
            StubElement::new("[data-testid=\"tweetButton\"]").on_click(ClickEffect::Insert(
                StubElement::new(TOAST_SELECTOR).text("Your post was sent"),
            )),
        );
        let executor = ActionExecutor::new(page.clone(), fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::PollPost {
            text: "favorite color?".to_string(),
            options: vec!["red".to_string(), "green".to_string(), "blue".to_string()],
            length: None,
            audience: None,
        };
        let outcome = executor.execute(&registry, &request).await;

        assert!(outcome.success, "outcome: {:?}", outcome);
        assert_eq!(page.text_of("input[name=\"Choice1\"]").unwrap(), "red");
        assert_eq!(page.text_of("input[name=\"Choice2\"]").unwrap(), "green");
        assert_eq!(page.text_of("input[name=\"Choice3\"]").unwrap(), "blue");
    }

    #[tokio::test]
    async fn poll_with_one_option_is_rejected_up_front() {
        let page = StubPage::shared();
        let executor = ActionExecutor::new(page, fast_cfg());
        let registry = seed_registry();

        let request = ActionRequest::PollPost {
            text: String::new(),
            options: vec!["only".to_string()],
            length: None,
            audience: None,
        };
        let outcome = executor.execute(&registry, &request).await;
        assert!(!outcome.success);
        assert!(outcome.failed_selectors.is_empty());
    }
}
