// 📋 IPO Catalog Loader
// Fetches the list of open IPOs, memoized for a fixed window

use crate::cache::{Clock, TtlCache};
use crate::fetcher::{fetch_or_notify, JsonFetcher};
use crate::notice::Notifier;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Default memoization window for the catalog.
pub const DEFAULT_CATALOG_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipo {
    pub name: String,
    pub registrar: String,
    /// Opaque to us; the backend sends either a string or a number.
    /// Missing, null or zero ids become `""`, which never resolves.
    #[serde(default, deserialize_with = "company_id_as_string")]
    pub company_id: String,
}

fn company_id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "company_id must be a string or number, got {}",
            other
        ))),
    }
}

/// Wire envelope shared by both backends.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<T>,
}

/// Extract the IPO list from a catalog response, or an empty list when the
/// response is unsuccessful or malformed.
pub fn parse_catalog(body: Value) -> Vec<Ipo> {
    match serde_json::from_value::<Envelope<Vec<Ipo>>>(body) {
        Ok(Envelope { status: true, data: Some(ipos) }) => ipos,
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "catalog response has unexpected shape");
            Vec::new()
        }
    }
}

pub struct CatalogLoader {
    fetcher: Arc<dyn JsonFetcher>,
    url: String,
    cache: TtlCache<Vec<Ipo>>,
}

impl CatalogLoader {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, url: impl Into<String>, ttl: chrono::Duration) -> Self {
        CatalogLoader {
            fetcher,
            url: url.into(),
            cache: TtlCache::new(ttl),
        }
    }

    pub fn with_clock(
        fetcher: Arc<dyn JsonFetcher>,
        url: impl Into<String>,
        ttl: chrono::Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        CatalogLoader {
            fetcher,
            url: url.into(),
            cache: TtlCache::with_clock(ttl, clock),
        }
    }

    /// Active IPOs, possibly empty. Only hits the network when the cached
    /// list is older than the window.
    pub fn load<N: Notifier + ?Sized>(&mut self, notifier: &mut N) -> Vec<Ipo> {
        let fetcher = &self.fetcher;
        let url = &self.url;
        self.cache.get_or_refresh(|| {
            let ipos = fetch_or_notify(fetcher.as_ref(), url, notifier)
                .map(parse_catalog)
                .unwrap_or_default();
            tracing::info!(count = ipos.len(), "loaded IPO catalog");
            ipos
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;
    use crate::fetcher::testing::StubFetcher;
    use crate::notice::Notice;
    use chrono::Duration;
    use serde_json::json;

    const URL: &str = "http://catalog.test/ipos";

    fn loader(stub: &StubFetcher, clock: &ManualClock) -> CatalogLoader {
        CatalogLoader::with_clock(
            Arc::new(stub.clone()),
            URL,
            Duration::seconds(DEFAULT_CATALOG_TTL_SECS),
            Box::new(clock.clone()),
        )
    }

    #[test]
    fn test_parse_catalog_accepts_string_and_numeric_ids() {
        let ipos = parse_catalog(json!({
            "status": true,
            "data": [
                {"name": "Foo", "registrar": "R1", "company_id": "1"},
                {"name": "Bar", "registrar": "R2", "company_id": 42}
            ]
        }));

        assert_eq!(ipos.len(), 2);
        assert_eq!(ipos[0].company_id, "1");
        assert_eq!(ipos[1].company_id, "42");
        assert_eq!(ipos[1].registrar, "R2");
    }

    #[test]
    fn test_parse_catalog_keeps_records_without_usable_id() {
        let ipos = parse_catalog(json!({
            "status": true,
            "data": [
                {"name": "Foo", "registrar": "R1", "company_id": "1"},
                {"name": "Bar", "registrar": "R2"},
                {"name": "Baz", "registrar": "R3", "company_id": null},
                {"name": "Qux", "registrar": "R4", "company_id": 0}
            ]
        }));

        assert_eq!(ipos.len(), 4);
        assert_eq!(ipos[0].company_id, "1");
        assert!(ipos[1..].iter().all(|ipo| ipo.company_id.is_empty()));
        assert_eq!(crate::selection::company_id_for(&ipos, "Foo"), Some("1"));
        assert_eq!(crate::selection::company_id_for(&ipos, "Bar"), None);
        assert_eq!(crate::selection::company_id_for(&ipos, "Qux"), None);
    }

    #[test]
    fn test_parse_catalog_status_false_is_empty() {
        assert!(parse_catalog(json!({"status": false, "data": []})).is_empty());
        assert!(parse_catalog(json!({"data": [{"name": "Foo", "registrar": "R1", "company_id": "1"}]})).is_empty());
    }

    #[test]
    fn test_parse_catalog_malformed_is_empty() {
        assert!(parse_catalog(json!({"status": true})).is_empty());
        assert!(parse_catalog(json!({"status": true, "data": "nope"})).is_empty());
        assert!(parse_catalog(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_load_is_memoized_within_window() {
        let stub = StubFetcher::new();
        stub.respond(URL, json!({"status": true, "data": [{"name": "Foo", "registrar": "R1", "company_id": "1"}]}));
        let clock = ManualClock::new();
        let mut loader = loader(&stub, &clock);
        let mut notices: Vec<Notice> = Vec::new();

        let first = loader.load(&mut notices);
        clock.advance(Duration::minutes(5));
        let second = loader.load(&mut notices);

        assert_eq!(stub.call_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].name, "Foo");
    }

    #[test]
    fn test_load_refetches_after_window() {
        let stub = StubFetcher::new();
        stub.respond(URL, json!({"status": true, "data": []}));
        let clock = ManualClock::new();
        let mut loader = loader(&stub, &clock);
        let mut notices: Vec<Notice> = Vec::new();

        loader.load(&mut notices);
        clock.advance(Duration::minutes(11));
        loader.load(&mut notices);

        assert_eq!(stub.call_count(), 2);
    }

    #[test]
    fn test_load_failure_notifies_and_returns_empty() {
        let stub = StubFetcher::new();
        stub.fail(URL, 500);
        let clock = ManualClock::new();
        let mut loader = loader(&stub, &clock);
        let mut notices: Vec<Notice> = Vec::new();

        let ipos = loader.load(&mut notices);

        assert!(ipos.is_empty());
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains(URL));
    }
}
