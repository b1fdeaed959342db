// 🔍 Allotment Checker - orchestration
// passcode → catalog → validate batch → per PAN, per IPO lookup → report
//
// Everything runs sequentially on the caller's thread. Failures are turned into
// notices; only batch-level stops come back as `CheckError`.

use crate::allotment::AllotmentLookup;
use crate::cache::Clock;
use crate::catalog::{CatalogLoader, Ipo};
use crate::config::AppConfig;
use crate::fetcher::{FetchError, HttpFetcher, JsonFetcher};
use crate::notice::{Notice, Notifier};
use crate::pan::{invalid_identifiers, parse_identifiers};
use crate::presenter::{AllotmentResult, IdentifierReport};
use crate::selection::{company_id_for, IpoChoice, Selection};
use std::sync::Arc;

// ============================================================================
// OBSERVER
// ============================================================================

/// Receives everything the user should see while a check runs.
pub trait CheckObserver: Notifier {
    /// A blocking step is about to start.
    fn progress(&mut self, _message: &str) {}

    /// One identifier is fully processed. Called before the next one starts.
    fn report(&mut self, report: IdentifierReport);
}

/// Observer that keeps everything in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectingObserver {
    pub notices: Vec<Notice>,
    pub progress: Vec<String>,
    pub reports: Vec<IdentifierReport>,
}

impl Notifier for CollectingObserver {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

impl CheckObserver for CollectingObserver {
    fn progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
    }

    fn report(&mut self, report: IdentifierReport) {
        self.reports.push(report);
    }
}

// ============================================================================
// ERRORS & REQUESTS
// ============================================================================

/// Conditions that stop a request before any per-identifier work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("Incorrect passcode. Please try again.")]
    AccessDenied,
    #[error("Failed to fetch IPO data. Please try again later.")]
    CatalogUnavailable,
    #[error("Please enter at least one PAN number.")]
    NoIdentifiers,
    #[error("Invalid PAN numbers: {}. Please enter valid 10-character PANs.", .0.join(", "))]
    InvalidIdentifiers(Vec<String>),
}

/// Everything a one-shot front-end submits.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub passcode: String,
    pub selection: Selection,
    pub identifiers: String,
}

/// Proof that the passcode was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access(());

// ============================================================================
// CHECKER
// ============================================================================

pub struct AllotmentChecker {
    passcode: String,
    catalog: CatalogLoader,
    lookup: AllotmentLookup,
}

impl AllotmentChecker {
    pub fn new(config: &AppConfig, fetcher: Arc<dyn JsonFetcher>) -> Self {
        AllotmentChecker {
            passcode: config.passcode.clone(),
            catalog: CatalogLoader::new(fetcher.clone(), &config.catalog_url, config.catalog_ttl),
            lookup: AllotmentLookup::new(fetcher, &config.allotment_url),
        }
    }

    pub fn with_clock(config: &AppConfig, fetcher: Arc<dyn JsonFetcher>, clock: Box<dyn Clock>) -> Self {
        AllotmentChecker {
            passcode: config.passcode.clone(),
            catalog: CatalogLoader::with_clock(fetcher.clone(), &config.catalog_url, config.catalog_ttl, clock),
            lookup: AllotmentLookup::new(fetcher, &config.allotment_url),
        }
    }

    /// Production wiring: blocking HTTP with the configured timeout.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::with_timeout(config.timeout)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Fail closed: nothing else is reachable without an `Access`.
    pub fn unlock(&self, passcode: &str) -> Result<Access, CheckError> {
        if passcode == self.passcode {
            Ok(Access(()))
        } else {
            tracing::warn!("rejected passcode");
            Err(CheckError::AccessDenied)
        }
    }

    /// The (possibly cached) catalog. Empty means no IPOs are available.
    pub fn load_catalog(
        &mut self,
        _access: Access,
        observer: &mut dyn CheckObserver,
    ) -> Result<Vec<Ipo>, CheckError> {
        observer.progress("Fetching IPO data...");
        let ipos = self.catalog.load(observer);
        if ipos.is_empty() {
            let err = CheckError::CatalogUnavailable;
            observer.notify(Notice::error(err.to_string()));
            return Err(err);
        }
        Ok(ipos)
    }

    /// Validate the whole batch, then check each identifier in turn.
    ///
    /// Returns the number of identifiers reported.
    pub fn check(
        &self,
        _access: Access,
        catalog: &[Ipo],
        selection: &Selection,
        identifiers: &str,
        observer: &mut dyn CheckObserver,
    ) -> Result<usize, CheckError> {
        let pans = parse_identifiers(identifiers);
        if let Err(err) = validate_batch(&pans) {
            observer.notify(Notice::error(err.to_string()));
            return Err(err);
        }

        let choices = selection.resolve(catalog);
        tracing::info!(identifiers = pans.len(), ipos = choices.len(), "starting allotment check");

        for pan in &pans {
            let results = self.check_identifier(catalog, &choices, pan, observer);
            let report = IdentifierReport::build(pan, results);
            if let Some(table) = report.table() {
                tracing::debug!(pan = %pan, "allotment results\n{}", table.to_text());
            }
            observer.report(report);
        }

        Ok(pans.len())
    }

    /// Passcode, catalog and check in one call.
    pub fn run(&mut self, request: &CheckRequest, observer: &mut dyn CheckObserver) -> Result<usize, CheckError> {
        let access = match self.unlock(&request.passcode) {
            Ok(access) => access,
            Err(err) => {
                observer.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        };
        let catalog = self.load_catalog(access, observer)?;
        self.check(access, &catalog, &request.selection, &request.identifiers, observer)
    }

    fn check_identifier(
        &self,
        catalog: &[Ipo],
        choices: &[IpoChoice],
        pan: &str,
        observer: &mut dyn CheckObserver,
    ) -> Vec<AllotmentResult> {
        let mut results = Vec::new();

        for choice in choices {
            let Some(company_id) = company_id_for(catalog, &choice.name) else {
                observer.notify(Notice::error(format!("Company ID not found for {}.", choice.name)));
                continue;
            };

            observer.progress(&format!("Fetching data for {} (PAN: {})...", choice.name, pan));
            match self.lookup.lookup(&choice.registrar, company_id, pan, observer) {
                Some(decision) => results.push(AllotmentResult {
                    ipo_name: choice.name.clone(),
                    registrar: choice.registrar.clone(),
                    result_title: decision.title,
                    result_text: decision.text,
                }),
                None => observer.notify(Notice::warning(format!(
                    "No allotment data found for {} (PAN: {}).",
                    choice.name, pan
                ))),
            }
        }

        results
    }
}

fn validate_batch(pans: &[String]) -> Result<(), CheckError> {
    if pans.is_empty() {
        return Err(CheckError::NoIdentifiers);
    }
    let invalid = invalid_identifiers(pans);
    if !invalid.is_empty() {
        return Err(CheckError::InvalidIdentifiers(invalid));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;
    use crate::fetcher::testing::StubFetcher;
    use crate::notice::Level;
    use crate::presenter::{ReportOutcome, RowStyle};
    use serde_json::json;

    const CATALOG: &str = "http://catalog.test/ipos";
    const ALLOT: &str = "http://allot.test";
    const PASS: &str = "open-sesame";

    fn config() -> AppConfig {
        AppConfig::new(CATALOG, ALLOT, PASS)
    }

    fn checker(stub: &StubFetcher) -> AllotmentChecker {
        AllotmentChecker::with_clock(&config(), Arc::new(stub.clone()), Box::new(ManualClock::new()))
    }

    fn foo_catalog(stub: &StubFetcher) {
        stub.respond(
            CATALOG,
            json!({"status": true, "data": [{"name": "Foo", "registrar": "R1", "company_id": "1"}]}),
        );
    }

    fn request(identifiers: &str) -> CheckRequest {
        CheckRequest {
            passcode: PASS.to_string(),
            selection: Selection::All,
            identifiers: identifiers.to_string(),
        }
    }

    #[test]
    fn test_wrong_passcode_fetches_nothing() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let mut req = request("ABCDE1234F");
        req.passcode = "guess".to_string();
        let result = checker.run(&req, &mut observer);

        assert_eq!(result, Err(CheckError::AccessDenied));
        assert_eq!(stub.call_count(), 0);
        assert!(observer.reports.is_empty());
        assert_eq!(observer.notices, vec![Notice::error("Incorrect passcode. Please try again.")]);
    }

    #[test]
    fn test_empty_catalog_stops_request() {
        let stub = StubFetcher::new();
        stub.respond(CATALOG, json!({"status": false}));
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let result = checker.run(&request("ABCDE1234F"), &mut observer);

        assert_eq!(result, Err(CheckError::CatalogUnavailable));
        assert_eq!(stub.call_count(), 1);
        assert_eq!(
            observer.notices.last().map(|n| n.message.as_str()),
            Some("Failed to fetch IPO data. Please try again later.")
        );
    }

    #[test]
    fn test_allotted_row_is_styled() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        stub.respond(
            "http://allot.test/R1?company_id=1&pan=ABCDE1234F",
            json!({"status": true, "data": {"title": "Congratulations", "text": "You got it"}}),
        );
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let checked = checker.run(&request("ABCDE1234F"), &mut observer).unwrap();

        assert_eq!(checked, 1);
        assert!(observer.notices.is_empty());
        assert_eq!(observer.reports.len(), 1);
        let table = observer.reports[0].table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].index, 1);
        assert_eq!(table.rows[0].style, RowStyle::Allotted);
        assert_eq!(table.rows[0].result.cells(), ["Foo", "R1", "Congratulations", "You got it"]);
    }

    #[test]
    fn test_status_false_gives_no_rows_and_info() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        stub.respond("http://allot.test/R1?company_id=1&pan=ABCDE1234F", json!({"status": false}));
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        checker.run(&request("ABCDE1234F"), &mut observer).unwrap();

        assert_eq!(
            observer.notices,
            vec![Notice::warning("No allotment data found for Foo (PAN: ABCDE1234F).")]
        );
        assert_eq!(
            observer.reports[0].outcome,
            ReportOutcome::NoData {
                message: "No allotment data found for PAN: ABCDE1234F.".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_identifier_rejects_whole_batch() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let result = checker.run(&request("ABCDE1234F\nBAD"), &mut observer);

        assert_eq!(result, Err(CheckError::InvalidIdentifiers(vec!["BAD".to_string()])));
        assert_eq!(stub.calls(), vec![CATALOG.to_string()]);
        assert!(observer.reports.is_empty());
        assert_eq!(
            observer.notices,
            vec![Notice::error("Invalid PAN numbers: BAD. Please enter valid 10-character PANs.")]
        );
    }

    #[test]
    fn test_no_identifiers_is_an_error() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let result = checker.run(&request("  \n\n "), &mut observer);

        assert_eq!(result, Err(CheckError::NoIdentifiers));
        assert_eq!(observer.notices[0].message, "Please enter at least one PAN number.");
    }

    #[test]
    fn test_network_failure_for_one_identifier_does_not_block_next() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        stub.fail("http://allot.test/R1?company_id=1&pan=AAAAA1111A", 502);
        stub.respond(
            "http://allot.test/R1?company_id=1&pan=BBBBB2222B",
            json!({"status": true, "data": {"title": "Sorry", "text": "Not allotted"}}),
        );
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let checked = checker.run(&request("AAAAA1111A\nBBBBB2222B"), &mut observer).unwrap();

        assert_eq!(checked, 2);
        assert_eq!(observer.reports.len(), 2);
        assert_eq!(observer.reports[0].identifier, "AAAAA1111A");
        assert!(observer.reports[0].table().is_none());
        let table = observer.reports[1].table().unwrap();
        assert_eq!(table.rows[0].style, RowStyle::Plain);

        let levels: Vec<Level> = observer.notices.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![Level::Error, Level::Warning]);
    }

    #[test]
    fn test_unknown_company_is_skipped_not_fatal() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        stub.respond(
            "http://allot.test/R1?company_id=1&pan=ABCDE1234F",
            json!({"status": true, "data": {"title": "Allotted", "text": "10 shares"}}),
        );
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();
        let selection = Selection::Chosen(vec![
            IpoChoice { name: "Gone".to_string(), registrar: "R9".to_string() },
            IpoChoice { name: "Foo".to_string(), registrar: "R1".to_string() },
        ]);

        let access = checker.unlock(PASS).unwrap();
        let catalog = checker.load_catalog(access, &mut observer).unwrap();
        checker.check(access, &catalog, &selection, "ABCDE1234F", &mut observer).unwrap();

        assert_eq!(observer.notices, vec![Notice::error("Company ID not found for Gone.")]);
        assert_eq!(observer.reports[0].table().map(|t| t.len()), Some(1));
        assert_eq!(stub.call_count(), 2);
    }

    #[test]
    fn test_lookup_uses_selected_registrar() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();
        let selection = Selection::Chosen(vec![IpoChoice {
            name: "Foo".to_string(),
            registrar: "other".to_string(),
        }]);

        let access = checker.unlock(PASS).unwrap();
        let catalog = checker.load_catalog(access, &mut observer).unwrap();
        checker.check(access, &catalog, &selection, "ABCDE1234F", &mut observer).unwrap();

        assert_eq!(
            stub.calls().last().map(String::as_str),
            Some("http://allot.test/other?company_id=1&pan=ABCDE1234F")
        );
    }

    #[test]
    fn test_reports_arrive_per_identifier_after_progress() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        checker.run(&request("AAAAA1111A\nBBBBB2222B"), &mut observer).unwrap();

        assert_eq!(
            observer.progress,
            vec![
                "Fetching IPO data...",
                "Fetching data for Foo (PAN: AAAAA1111A)...",
                "Fetching data for Foo (PAN: BBBBB2222B)...",
            ]
        );
        let order: Vec<&str> = observer.reports.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, vec!["AAAAA1111A", "BBBBB2222B"]);
    }

    #[test]
    fn test_empty_selection_reports_no_data() {
        let stub = StubFetcher::new();
        foo_catalog(&stub);
        let mut checker = checker(&stub);
        let mut observer = CollectingObserver::default();

        let access = checker.unlock(PASS).unwrap();
        let catalog = checker.load_catalog(access, &mut observer).unwrap();
        checker
            .check(access, &catalog, &Selection::Chosen(vec![]), "ABCDE1234F", &mut observer)
            .unwrap();

        assert_eq!(stub.call_count(), 1);
        assert!(observer.reports[0].table().is_none());
    }
}
