//! Polling resolver with fallback chain orchestration

use std::sync::Arc;

use dom_bridge::DomBridge;
use postpilot_core_types::{ResolutionFailure, SelectorDef};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::types::{ResolveOptions, Resolved};

/// Element resolver over a document bridge.
pub struct ElementResolver {
    bridge: Arc<dyn DomBridge>,
}

impl ElementResolver {
    pub fn new(bridge: Arc<dyn DomBridge>) -> Self {
        Self { bridge }
    }

    /// Resolve `def`, or fail immediately when no definition exists.
    ///
    /// Configuration absence is distinct from transient absence: there is
    /// no point polling for a definition that does not exist, so the
    /// missing case returns without touching the page.
    pub async fn resolve_def(
        &self,
        name: &str,
        def: Option<&SelectorDef>,
        opts: &ResolveOptions,
    ) -> Result<Resolved, ResolutionFailure> {
        match def {
            Some(def) => self.resolve(name, def, opts).await,
            None => {
                warn!(name, "selector definition missing");
                Err(ResolutionFailure::missing(name))
            }
        }
    }

    /// Resolve one element: primary first, then each fallback in order,
    /// every poll cycle, until the timeout elapses.
    pub async fn resolve(
        &self,
        name: &str,
        def: &SelectorDef,
        opts: &ResolveOptions,
    ) -> Result<Resolved, ResolutionFailure> {
        let deadline = Instant::now() + opts.timeout;

        loop {
            if let Some(handle) = self.try_selector(&def.primary, opts).await {
                debug!(name, selector = %def.primary, "element found (primary)");
                return Ok(Resolved {
                    name: name.to_string(),
                    handle,
                    selector: def.primary.clone(),
                    used_fallback: false,
                });
            }

            for fallback in &def.fallback {
                if let Some(handle) = self.try_selector(fallback, opts).await {
                    warn!(name, selector = %fallback, "element found via fallback");
                    return Ok(Resolved {
                        name: name.to_string(),
                        handle,
                        selector: fallback.clone(),
                        used_fallback: true,
                    });
                }
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(opts.poll_interval).await;
        }

        let mut tried = vec![def.primary.clone()];
        tried.extend(def.fallback.iter().cloned());
        debug!(name, strategies = tried.len(), "resolution timed out");
        Err(ResolutionFailure::timeout(name, tried))
    }

    /// Resolve the `index`-th occurrence of a repeated element via the
    /// definition's pattern. A definition without a pattern is treated as
    /// a missing definition: nothing to substitute into.
    pub async fn resolve_indexed(
        &self,
        name: &str,
        def: &SelectorDef,
        index: usize,
        opts: &ResolveOptions,
    ) -> Result<Resolved, ResolutionFailure> {
        let selector = match def.indexed(index) {
            Some(selector) => selector,
            None => {
                warn!(name, index, "no index pattern on selector definition");
                return Err(ResolutionFailure::missing(name));
            }
        };

        let deadline = Instant::now() + opts.timeout;
        loop {
            if let Some(handle) = self.try_selector(&selector, opts).await {
                debug!(name, index, selector = %selector, "indexed element found");
                return Ok(Resolved {
                    name: name.to_string(),
                    handle,
                    selector: selector.clone(),
                    used_fallback: false,
                });
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(opts.poll_interval).await;
        }

        debug!(name, index, selector = %selector, "indexed resolution timed out");
        Err(ResolutionFailure::timeout(name, vec![selector]))
    }

    async fn try_selector(
        &self,
        selector: &str,
        opts: &ResolveOptions,
    ) -> Option<dom_bridge::ElementHandle> {
        let handle = self.bridge.query(selector, opts.scope).await?;
        if self.bridge.is_attached(&handle).await {
            Some(handle)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dom_bridge::{SearchScope, StubElement, StubPage};

    use super::*;

    fn fast_opts() -> ResolveOptions {
        ResolveOptions::new(Duration::from_millis(120), Duration::from_millis(10))
    }

    fn resolver_on(page: Arc<StubPage>) -> ElementResolver {
        ElementResolver::new(page)
    }

    #[tokio::test]
    async fn primary_match_wins_without_fallback_flag() {
        let page = StubPage::shared();
        page.insert(StubElement::new("#btn"));
        let resolver = resolver_on(page);

        let def = SelectorDef::new("#btn").with_fallback("#other");
        let resolved = resolver.resolve("postButton", &def, &fast_opts()).await.unwrap();
        assert!(!resolved.used_fallback);
        assert_eq!(resolved.selector, "#btn");
    }

    #[tokio::test]
    async fn fallback_only_page_sets_used_fallback() {
        let page = StubPage::shared();
        page.insert(StubElement::new("#btn-fallback"));
        let resolver = resolver_on(page);

        let def = SelectorDef::new("#btn-old").with_fallback("#btn-fallback");
        let resolved = resolver.resolve("postButton", &def, &fast_opts()).await.unwrap();
        assert!(resolved.used_fallback);
        assert_eq!(resolved.selector, "#btn-fallback");
    }

    #[tokio::test]
    async fn exhausted_strategies_name_the_selector() {
        let page = StubPage::shared();
        let resolver = resolver_on(page);

        let def = SelectorDef::new("#a").with_fallback("#b").with_fallback("#c");
        let failure = resolver
            .resolve("textArea", &def, &fast_opts())
            .await
            .unwrap_err();
        assert_eq!(failure.name, "textArea");
        assert!(failure.timed_out);
        assert_eq!(failure.tried, vec!["#a", "#b", "#c"]);
    }

    #[tokio::test]
    async fn missing_definition_fails_without_polling() {
        let page = StubPage::shared();
        let resolver = resolver_on(page);

        let started = std::time::Instant::now();
        let failure = resolver
            .resolve_def("textArea", None, &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(failure.missing_definition);
        assert!(!failure.timed_out);
        // Immediate: nowhere near the 5s default window, not even one poll.
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn element_appearing_mid_poll_is_picked_up() {
        let page = StubPage::shared();
        let resolver = resolver_on(page.clone());

        let late = page.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            late.insert(StubElement::new("#late"));
        });

        let def = SelectorDef::new("#late");
        let opts = ResolveOptions::new(Duration::from_millis(500), Duration::from_millis(10));
        let resolved = resolver.resolve("lateButton", &def, &opts).await.unwrap();
        assert!(!resolved.used_fallback);
    }

    #[tokio::test]
    async fn indexed_resolution_substitutes_and_scopes() {
        let page = StubPage::shared();
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_1\"]").in_dialog());
        // Stale duplicate outside the dialog must not win under dialog scope.
        page.insert(StubElement::new("[data-testid=\"tweetTextarea_1\"]"));
        let resolver = resolver_on(page);

        let def = SelectorDef::new("[data-testid=\"tweetTextarea_0\"]")
            .with_pattern("[data-testid=\"tweetTextarea_{index}\"]");
        let opts = fast_opts().scoped(SearchScope::Dialog);
        let resolved = resolver
            .resolve_indexed("textArea", &def, 1, &opts)
            .await
            .unwrap();
        assert_eq!(resolved.selector, "[data-testid=\"tweetTextarea_1\"]");
    }

    #[tokio::test]
    async fn indexed_without_pattern_is_missing_definition() {
        let page = StubPage::shared();
        let resolver = resolver_on(page);

        let def = SelectorDef::new("#plain");
        let failure = resolver
            .resolve_indexed("textArea", &def, 2, &fast_opts())
            .await
            .unwrap_err();
        assert!(failure.missing_definition);
    }
}
