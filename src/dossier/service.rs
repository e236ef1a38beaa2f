/// Cache-then-orchestrate lookup used by the dossier endpoints
use super::{DossierOrchestrator, DossierOutcome, ErrorResult};
use crate::{
    cache::{dossier_key, ResultCache},
    error::{ProxyError, ProxyResult},
    metrics,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a dossier lookup
#[derive(Debug, Clone, PartialEq)]
pub enum DossierLookup {
    /// Served from the cache; the orchestrator was not called
    Cached(Value),
    /// Freshly aggregated and now cached
    Fetched(Value),
    /// Aggregation stopped early; nothing was cached
    Failed(ErrorResult),
}

/// Dossier lookup service
#[derive(Clone)]
pub struct DossierService {
    cache: Arc<ResultCache>,
    orchestrator: DossierOrchestrator,
}

impl DossierService {
    pub fn new(cache: Arc<ResultCache>, orchestrator: DossierOrchestrator) -> Self {
        Self {
            cache,
            orchestrator,
        }
    }

    /// Look up a dossier by jurisdiction and case number
    pub async fn lookup(&self, jurisdiction_id: &str, dossier_id: &str) -> ProxyResult<DossierLookup> {
        if jurisdiction_id.trim().is_empty() {
            return Err(ProxyError::Validation("Jurisdiction id cannot be empty".to_string()));
        }
        if dossier_id.trim().is_empty() {
            return Err(ProxyError::Validation("Dossier id cannot be empty".to_string()));
        }

        let key = dossier_key(jurisdiction_id, dossier_id);
        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "Dossier served from cache");
            metrics::record_dossier_lookup("cache");
            return Ok(DossierLookup::Cached(cached));
        }

        // A key rotation during the fetch clears the cache; a result built
        // under the old keys must not land in the flushed cache
        let generation = self.cache.generation();

        match self.orchestrator.fetch_dossier(jurisdiction_id, dossier_id).await? {
            DossierOutcome::Found(record) => {
                let value = serde_json::to_value(&record)
                    .map_err(|e| ProxyError::Internal(format!("Failed to serialize dossier: {}", e)))?;
                self.cache.put_if_generation(&key, value.clone(), generation);
                metrics::record_dossier_lookup("api");
                Ok(DossierLookup::Fetched(value))
            }
            DossierOutcome::Failed(err) => {
                metrics::record_dossier_lookup("error");
                Ok(DossierLookup::Failed(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{ManualClock, ResultCache},
        crypto::{CryptoKeyPair, KeyStore},
        dossier::ErrorKind,
        upstream::{mock::MockTransport, Endpoint, UpstreamClient, UpstreamError, UpstreamTransport},
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    struct Harness {
        service: DossierService,
        transport: Arc<MockTransport>,
        cache: Arc<ResultCache>,
        keys: Arc<KeyStore>,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
        let cache = Arc::new(ResultCache::with_clock(Arc::new(clock.clone())));
        let keys = Arc::new(KeyStore::new(CryptoKeyPair::default(), Arc::clone(&cache)));
        let transport = Arc::new(MockTransport::new());
        let client = UpstreamClient::new(transport.clone(), "http://mahakim.test/middleware/api");
        let orchestrator = DossierOrchestrator::new(client, Arc::clone(&keys));

        Harness {
            service: DossierService::new(Arc::clone(&cache), orchestrator),
            transport,
            cache,
            keys,
            clock,
        }
    }

    fn stub_dossier(transport: &MockTransport) {
        transport.respond(
            Endpoint::CarteDossier,
            json!({"idDossierCivil": 42, "affaire": "DC", "numero": "202512025555"}),
        );
        transport.respond(Endpoint::Decisions, json!([{"id": 1}]));
        transport.respond(Endpoint::Parties, json!([{"id": 2}]));
        transport.respond(Endpoint::Expertises, json!([{"id": 3}]));
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let h = harness();
        stub_dossier(&h.transport);

        let first = h.service.lookup("13", "202512025555").await.unwrap();
        let DossierLookup::Fetched(data) = first else {
            panic!("expected a fetched dossier");
        };
        assert_eq!(data["carte"]["idDossierCivil"], 42);
        assert_eq!(h.transport.call_count(), 4);

        h.clock.advance(Duration::hours(23));
        let second = h.service.lookup("13", "202512025555").await.unwrap();
        assert_eq!(second, DossierLookup::Cached(data));
        assert_eq!(h.transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let h = harness();
        stub_dossier(&h.transport);

        h.service.lookup("13", "202512025555").await.unwrap();
        h.clock.advance(Duration::hours(24) + Duration::seconds(1));

        let again = h.service.lookup("13", "202512025555").await.unwrap();
        assert!(matches!(again, DossierLookup::Fetched(_)));
        assert_eq!(h.transport.call_count(), 8);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let h = harness();
        h.transport.respond(Endpoint::CarteDossier, json!({"message": "introuvable"}));

        let outcome = h.service.lookup("13", "999").await.unwrap();
        let DossierLookup::Failed(err) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(h.cache.stats().total, 0);

        h.service.lookup("13", "999").await.unwrap();
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_is_still_cached() {
        let h = harness();
        stub_dossier(&h.transport);
        h.transport.fail_with_status(Endpoint::Decisions, 502);

        let outcome = h.service.lookup("13", "202512025555").await.unwrap();
        let DossierLookup::Fetched(data) = outcome else {
            panic!("expected a fetched dossier");
        };
        assert_eq!(data["decisions"]["error"], "upstream_error");
        assert_eq!(data["parties"], json!([{"id": 2}]));
        assert_eq!(h.cache.stats().total, 1);
    }

    #[tokio::test]
    async fn test_key_rotation_forces_refetch() {
        let h = harness();
        stub_dossier(&h.transport);

        h.service.lookup("13", "202512025555").await.unwrap();
        h.keys.set(CryptoKeyPair::new([4u8; 32], [4u8; 16]));
        assert_eq!(h.cache.stats().total, 0);

        let again = h.service.lookup("13", "202512025555").await.unwrap();
        assert!(matches!(again, DossierLookup::Fetched(_)));
        assert_eq!(h.transport.call_count(), 8);
    }

    /// Holds the primary lookup until released
    struct GatedTransport {
        inner: MockTransport,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl UpstreamTransport for GatedTransport {
        async fn get_json(&self, url: &str, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
            if url.ends_with(Endpoint::CarteDossier.path()) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.get_json(url, params).await
        }
    }

    #[tokio::test]
    async fn test_rotation_during_fetch_keeps_old_result_out_of_cache() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
        let cache = Arc::new(ResultCache::with_clock(Arc::new(clock)));
        let keys = Arc::new(KeyStore::new(CryptoKeyPair::default(), Arc::clone(&cache)));
        let inner = MockTransport::new();
        stub_dossier(&inner);
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = Arc::new(GatedTransport {
            inner: inner.clone(),
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        let client = UpstreamClient::new(transport, "http://mahakim.test/middleware/api");
        let service = DossierService::new(
            Arc::clone(&cache),
            DossierOrchestrator::new(client, Arc::clone(&keys)),
        );

        let lookup = {
            let service = service.clone();
            tokio::spawn(async move { service.lookup("13", "202512025555").await })
        };

        entered.notified().await;
        keys.set(CryptoKeyPair::new([4u8; 32], [4u8; 16]));
        release.notify_one();

        let outcome = lookup.await.unwrap().unwrap();
        assert!(matches!(outcome, DossierLookup::Fetched(_)));
        assert_eq!(cache.stats().total, 0);

        // The next lookup fetches again under the new keys and is cached
        release.notify_one();
        service.lookup("13", "202512025555").await.unwrap();
        assert_eq!(cache.stats().total, 1);
        assert_eq!(inner.calls_to(Endpoint::CarteDossier).len(), 2);
    }

    #[tokio::test]
    async fn test_blank_identifiers_are_rejected() {
        let h = harness();

        let err = h.service.lookup("  ", "1").await.unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
        let err = h.service.lookup("13", "").await.unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
        assert_eq!(h.transport.call_count(), 0);
    }
}
