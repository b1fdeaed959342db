// 🎟️ Allotment Lookup
// One registrar call per (company, PAN). No retry.

use crate::catalog::Envelope;
use crate::fetcher::{fetch_or_notify, JsonFetcher};
use crate::notice::Notifier;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Placeholder when the registrar omits a field.
pub const NOT_AVAILABLE: &str = "N/A";

/// What a registrar said about one PAN for one IPO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllotmentDecision {
    pub title: String,
    pub text: String,
}

pub struct AllotmentLookup {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
}

impl AllotmentLookup {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        AllotmentLookup { fetcher, base_url }
    }

    /// `<base>/<registrar>?company_id=<id>&pan=<pan>`, every component escaped.
    pub fn url_for(&self, registrar: &str, company_id: &str, pan: &str) -> String {
        format!(
            "{}/{}?company_id={}&pan={}",
            self.base_url,
            urlencoding::encode(registrar),
            urlencoding::encode(company_id),
            urlencoding::encode(pan),
        )
    }

    pub fn lookup<N: Notifier + ?Sized>(
        &self,
        registrar: &str,
        company_id: &str,
        pan: &str,
        notifier: &mut N,
    ) -> Option<AllotmentDecision> {
        let url = self.url_for(registrar, company_id, pan);
        let decision = fetch_or_notify(self.fetcher.as_ref(), &url, notifier).and_then(parse_decision);
        tracing::debug!(registrar, company_id, found = decision.is_some(), "allotment lookup");
        decision
    }
}

/// Pull `data.title` / `data.text` out of a successful response. A missing,
/// null or empty `data` object counts as no decision.
pub fn parse_decision(body: Value) -> Option<AllotmentDecision> {
    let envelope: Envelope<Map<String, Value>> = match serde_json::from_value(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "allotment response has unexpected shape");
            return None;
        }
    };

    match envelope {
        Envelope { status: true, data: Some(data) } if !data.is_empty() => Some(AllotmentDecision {
            title: field_or_na(&data, "title"),
            text: field_or_na(&data, "text"),
        }),
        _ => None,
    }
}

fn field_or_na(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(other) => other.to_string(),
    }
}
