//! Bundled initial selector set.
//!
//! Used by `postpilot selectors init` to seed a fresh store; the remote
//! service then owns the set through healing and administrative updates.

use postpilot_core_types::{SelectorDef, SelectorMap};

pub fn default_selector_set() -> SelectorMap {
    let mut selectors = SelectorMap::new();

    let composer = selectors.entry("composer".to_string()).or_default();
    composer.insert(
        "textArea".to_string(),
        SelectorDef::new("[data-testid=\"tweetTextarea_0\"]")
            .with_fallback("[role=\"textbox\"][aria-label=\"Post text\"]")
            .with_fallback("div[contenteditable=\"true\"]")
            .with_pattern("[data-testid=\"tweetTextarea_{index}\"]"),
    );
    composer.insert(
        "postButton".to_string(),
        SelectorDef::new("[data-testid=\"tweetButton\"]")
            .with_fallback("[data-testid=\"tweetButtonInline\"]")
            .with_fallback("button[type=\"submit\"]"),
    );
    composer.insert(
        "postButtonInline".to_string(),
        SelectorDef::new("[data-testid=\"tweetButtonInline\"]")
            .with_fallback("[data-testid=\"tweetButton\"]"),
    );
    composer.insert(
        "postButtonModal".to_string(),
        SelectorDef::new("[data-testid=\"tweetButton\"]"),
    );
    composer.insert(
        "addButton".to_string(),
        SelectorDef::new("[data-testid=\"addButton\"]").with_fallback("[aria-label=\"Add post\"]"),
    );

    let media = selectors.entry("media".to_string()).or_default();
    media.insert(
        "fileInput".to_string(),
        SelectorDef::new("[data-testid=\"fileInput\"]")
            .with_fallback("input[type=\"file\"][accept*=\"image\"]"),
    );

    let options = selectors.entry("options".to_string()).or_default();
    options.insert(
        "pollButton".to_string(),
        SelectorDef::new("[data-testid=\"createPollButton\"]")
            .with_fallback("[aria-label=\"Add poll\"]"),
    );
    options.insert(
        "addPollChoice".to_string(),
        SelectorDef::new("[data-testid=\"addPollChoice\"]"),
    );
    options.insert(
        "pollChoice".to_string(),
        SelectorDef::new("input[name=\"Choice1\"]").with_pattern("input[name=\"Choice{index}\"]"),
    );
    options.insert(
        "pollDays".to_string(),
        SelectorDef::new("[data-testid=\"selectPollDays\"]"),
    );
    options.insert(
        "pollHours".to_string(),
        SelectorDef::new("[data-testid=\"selectPollHours\"]"),
    );
    options.insert(
        "pollMinutes".to_string(),
        SelectorDef::new("[data-testid=\"selectPollMinutes\"]"),
    );
    options.insert(
        "gifButton".to_string(),
        SelectorDef::new("[data-testid=\"gifSearchButton\"]")
            .with_fallback("[aria-label=\"Add a GIF\"]"),
    );
    options.insert(
        "scheduleButton".to_string(),
        SelectorDef::new("[data-testid=\"scheduleOption\"]")
            .with_fallback("[aria-label=\"Schedule post\"]"),
    );

    selectors
}
