//! Resolution result and option types

use std::time::Duration;

use dom_bridge::{ElementHandle, SearchScope};

/// Default window a resolution may poll for.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Default pause between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Successful resolution.
///
/// `used_fallback` signals partial drift: the element was found, but not by
/// the primary strategy, so the definition is already degrading.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub name: String,
    pub handle: ElementHandle,
    pub selector: String,
    pub used_fallback: bool,
}

/// Per-call resolution options.
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub scope: SearchScope,
}

impl ResolveOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            scope: SearchScope::Document,
        }
    }

    pub fn scoped(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}
