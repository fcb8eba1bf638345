//! Replacement-selector proposers.
//!
//! The generative proposer is consumed as an opaque "propose definitions
//! for these names given this snapshot" function; anything malformed it
//! returns is an error, and the deterministic table takes over.

use std::collections::BTreeMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use postpilot_core_types::{truncate_chars, SelectorDef, SelectorSet};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProposeError {
    /// Generative capability unreachable or not configured
    #[error("proposer unavailable: {0}")]
    Unavailable(String),

    /// Response did not contain a strict name -> definition mapping
    #[error("malformed proposal: {0}")]
    Malformed(String),
}

/// Everything a proposer gets to work with.
#[derive(Clone, Debug)]
pub struct ProposalContext {
    pub snapshot: String,
    pub failed: Vec<String>,
    pub previous: Option<SelectorSet>,
}

#[async_trait]
pub trait SelectorProposer: Send + Sync {
    async fn propose(
        &self,
        ctx: &ProposalContext,
    ) -> Result<BTreeMap<String, SelectorDef>, ProposeError>;
}

/// Well-known fallback definitions, keyed by element name.
///
/// Only these names can be healed without the generative step; anything
/// else is omitted from the proposal, a partial-success outcome.
static FALLBACK_TABLE: Lazy<BTreeMap<&'static str, SelectorDef>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    table.insert(
        "textArea",
        SelectorDef::new("[data-testid=\"tweetTextarea_0\"]")
            .with_fallback("[role=\"textbox\"][aria-label=\"Post text\"]")
            .with_fallback("div[contenteditable=\"true\"]"),
    );
    table.insert(
        "postButton",
        SelectorDef::new("[data-testid=\"tweetButton\"]")
            .with_fallback("[data-testid=\"tweetButtonInline\"]")
            .with_fallback("button[type=\"submit\"]"),
    );
    table.insert(
        "fileInput",
        SelectorDef::new("[data-testid=\"fileInput\"]")
            .with_fallback("input[type=\"file\"][accept*=\"image\"]"),
    );
    table.insert(
        "gifButton",
        SelectorDef::new("[data-testid=\"gifSearchButton\"]")
            .with_fallback("[aria-label=\"Add a GIF\"]"),
    );
    table.insert(
        "pollButton",
        SelectorDef::new("[data-testid=\"createPollButton\"]")
            .with_fallback("[aria-label=\"Add poll\"]"),
    );
    table.insert(
        "scheduleButton",
        SelectorDef::new("[data-testid=\"scheduleOption\"]")
            .with_fallback("[aria-label=\"Schedule post\"]"),
    );
    table
});

/// Deterministic proposer over the fallback table. Never fails; names
/// outside the table are simply left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticTableProposer;

#[async_trait]
impl SelectorProposer for StaticTableProposer {
    async fn propose(
        &self,
        ctx: &ProposalContext,
    ) -> Result<BTreeMap<String, SelectorDef>, ProposeError> {
        let mut proposal = BTreeMap::new();
        for name in &ctx.failed {
            if let Some(def) = FALLBACK_TABLE.get(name.as_str()) {
                proposal.insert(name.clone(), def.clone());
            } else {
                debug!(name, "no fallback table entry, leaving unresolved");
            }
        }
        Ok(proposal)
    }
}

/// Generative proposer talking to a completion endpoint.
///
/// The endpoint contract matches the worker binding this replaces: POST
/// `{model, prompt, max_tokens}`, response `{"response": "<completion>"}`.
pub struct LlmProposer {
    endpoint: String,
    model: String,
    http: reqwest::Client,
    /// Characters of the snapshot included in the prompt.
    dom_budget: usize,
    /// Characters of the previous definitions included in the prompt.
    context_budget: usize,
}

impl LlmProposer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            http: reqwest::Client::new(),
            dom_budget: 5_000,
            context_budget: 2_000,
        }
    }

    pub fn with_budgets(mut self, dom_budget: usize, context_budget: usize) -> Self {
        self.dom_budget = dom_budget;
        self.context_budget = context_budget;
        self
    }

    fn build_prompt(&self, ctx: &ProposalContext) -> String {
        let previous = ctx
            .previous
            .as_ref()
            .and_then(|set| serde_json::to_string_pretty(&set.selectors).ok())
            .unwrap_or_else(|| "{}".to_string());
        format!(
            "You are an expert at analyzing web page DOM structures.\n\n\
             TASK: propose CSS selectors locating the following elements on \
             the posting screen.\n\n\
             CURRENT DOM (excerpt):\n{dom}\n\n\
             ELEMENTS TO LOCATE:\n{names}\n\n\
             PREVIOUS SELECTORS (no longer working):\n{previous}\n\n\
             OUTPUT: return ONLY this JSON, nothing else:\n\
             {{\"selectors\": {{\"<element name>\": {{\"primary\": \"<selector>\", \
             \"fallback\": [\"<selector>\", \"<selector>\"]}}}}}}",
            dom = truncate_chars(&ctx.snapshot, self.dom_budget),
            names = ctx.failed.join(", "),
            previous = truncate_chars(&previous, self.context_budget),
        )
    }
}

#[async_trait]
impl SelectorProposer for LlmProposer {
    async fn propose(
        &self,
        ctx: &ProposalContext,
    ) -> Result<BTreeMap<String, SelectorDef>, ProposeError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": self.build_prompt(ctx),
            "max_tokens": 1000,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProposeError::Unavailable(err.to_string()))?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| ProposeError::Malformed(err.to_string()))?;
        let completion = payload
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProposeError::Malformed("no completion text".to_string()))?;

        let proposal = parse_proposal(completion)?;
        if proposal.is_empty() {
            warn!("generative proposal covered none of the failed names");
        }
        Ok(proposal)
    }
}

/// Extract the strict `{"selectors": {...}}` mapping from a completion that
/// may carry prose around the JSON block.
pub fn parse_proposal(completion: &str) -> Result<BTreeMap<String, SelectorDef>, ProposeError> {
    let start = completion
        .find('{')
        .ok_or_else(|| ProposeError::Malformed("no JSON object in completion".to_string()))?;
    let end = completion
        .rfind('}')
        .ok_or_else(|| ProposeError::Malformed("no JSON object in completion".to_string()))?;
    if end < start {
        return Err(ProposeError::Malformed("unbalanced JSON object".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(&completion[start..=end])
        .map_err(|err| ProposeError::Malformed(err.to_string()))?;
    let selectors = value
        .get("selectors")
        .cloned()
        .ok_or_else(|| ProposeError::Malformed("missing 'selectors' key".to_string()))?;
    serde_json::from_value(selectors).map_err(|err| ProposeError::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(failed: &[&str]) -> ProposalContext {
        ProposalContext {
            snapshot: "<div data-testid=\"primaryColumn\"></div>".to_string(),
            failed: failed.iter().map(|s| s.to_string()).collect(),
            previous: None,
        }
    }

    #[tokio::test]
    async fn static_table_covers_known_names_only() {
        let proposer = StaticTableProposer;
        let proposal = proposer
            .propose(&ctx(&["postButton", "mysteryWidget"]))
            .await
            .unwrap();
        assert_eq!(proposal.len(), 1);
        assert_eq!(
            proposal.get("postButton").unwrap().primary,
            "[data-testid=\"tweetButton\"]"
        );
        assert!(!proposal.contains_key("mysteryWidget"));
    }

    #[test]
    fn parse_proposal_strips_surrounding_prose() {
        let completion = r#"Sure, here you go:
{"selectors": {"textArea": {"primary": "[role=textbox]", "fallback": ["div.editor"]}}}
Hope that helps!"#;
        let proposal = parse_proposal(completion).unwrap();
        assert_eq!(proposal.get("textArea").unwrap().primary, "[role=textbox]");
        assert_eq!(proposal.get("textArea").unwrap().fallback, vec!["div.editor"]);
    }

    #[test]
    fn parse_proposal_rejects_missing_mapping() {
        assert!(parse_proposal("no json here").is_err());
        assert!(parse_proposal("{\"wrong\": 1}").is_err());
        assert!(parse_proposal("{\"selectors\": 42}").is_err());
    }
}
