/// Dossier orchestrator - sequences the primary and dependent lookups
use super::{DossierOutcome, DossierRecord, ErrorResult};
use crate::{
    crypto::{encrypt, CryptoKeyPair, KeyStore},
    error::ProxyResult,
    upstream::{Endpoint, UpstreamClient, UpstreamError},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fields that may hold the internal dossier id, in priority order.
/// Civil dossiers use `idDossierCivil`, criminal ones `id`.
pub const INTERNAL_ID_FIELDS: &[&str] = &["idDossierCivil", "id"];

/// Field holding the case-type code
pub const CASE_TYPE_FIELD: &str = "affaire";

/// Case type assumed when the primary result carries none
pub const DEFAULT_CASE_TYPE: &str = "DC";

/// Runs the four-call lookup for one dossier
#[derive(Clone)]
pub struct DossierOrchestrator {
    client: UpstreamClient,
    keys: Arc<KeyStore>,
}

impl DossierOrchestrator {
    pub fn new(client: UpstreamClient, keys: Arc<KeyStore>) -> Self {
        Self { client, keys }
    }

    /// Fetch and assemble a dossier.
    ///
    /// Only a failing primary lookup stops the run. Each dependent lookup
    /// that fails is recorded in its slot as a diagnostic object.
    pub async fn fetch_dossier(
        &self,
        jurisdiction_id: &str,
        dossier_id: &str,
    ) -> ProxyResult<DossierOutcome> {
        // One snapshot for the whole run, so a concurrent rotation can't
        // split encryption and decryption across two key pairs
        let keys = self.keys.get();
        let token = correlation_token();

        let params = Endpoint::primary_params(
            encrypt(dossier_id, &keys)?,
            encrypt(jurisdiction_id, &keys)?,
            &token,
        );

        let carte = match self.client.fetch(Endpoint::CarteDossier, &params, &keys).await {
            Ok(carte) => carte,
            Err(e) => {
                warn!(jurisdiction = %jurisdiction_id, dossier = %dossier_id, error = %e, "Primary lookup failed");
                return Ok(DossierOutcome::Failed(ErrorResult::fetch_error(format!(
                    "Unable to fetch dossier: {}",
                    e
                ))));
            }
        };

        if !carte.is_object() || carte.get("error").is_some() {
            info!(jurisdiction = %jurisdiction_id, dossier = %dossier_id, "Dossier not found");
            let partial = if carte.is_object() { carte } else { json!({}) };
            return Ok(DossierOutcome::Failed(ErrorResult::not_found(
                "The dossier number or jurisdiction is invalid",
                partial,
            )));
        }

        let Some(internal_id) = extract_internal_id(&carte) else {
            info!(jurisdiction = %jurisdiction_id, dossier = %dossier_id, "No internal id in primary result");
            return Ok(DossierOutcome::Failed(ErrorResult::not_found(
                "Unable to extract the internal dossier id",
                carte,
            )));
        };
        let case_type = extract_case_type(&carte);
        debug!(internal_id = %internal_id, case_type = %case_type, "Resolved internal dossier id");

        let internal_id_enc = encrypt(&internal_id, &keys)?;
        let case_type_enc = encrypt(&case_type, &keys)?;

        let (decisions, parties, expertises) = tokio::join!(
            self.fetch_dependent(Endpoint::Decisions, &internal_id_enc, &case_type_enc, &token, &keys),
            self.fetch_dependent(Endpoint::Parties, &internal_id_enc, &case_type_enc, &token, &keys),
            self.fetch_dependent(Endpoint::Expertises, &internal_id_enc, &case_type_enc, &token, &keys),
        );

        Ok(DossierOutcome::Found(DossierRecord {
            carte,
            decisions,
            parties,
            expertises,
            timestamp: Utc::now().to_rfc3339(),
        }))
    }

    async fn fetch_dependent(
        &self,
        endpoint: Endpoint,
        internal_id_enc: &str,
        case_type_enc: &str,
        token: &str,
        keys: &CryptoKeyPair,
    ) -> Value {
        let params = endpoint.dependent_params(internal_id_enc, case_type_enc, token);
        match self.client.fetch(endpoint, &params, keys).await {
            Ok(value) => value,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Dependent lookup failed");
                dependent_failure(endpoint, &e)
            }
        }
    }
}

/// Placeholder stored in a dependent slot when its lookup fails
pub fn dependent_failure(endpoint: Endpoint, error: &UpstreamError) -> Value {
    json!({
        "error": "upstream_error",
        "endpoint": endpoint.path(),
        "message": error.to_string(),
    })
}

/// First non-empty candidate from [`INTERNAL_ID_FIELDS`], as text.
/// Null, `false`, `0` and `""` count as absent.
pub fn extract_internal_id(carte: &Value) -> Option<String> {
    INTERNAL_ID_FIELDS
        .iter()
        .filter_map(|field| carte.get(*field))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        })
}

/// Case-type code, defaulting to [`DEFAULT_CASE_TYPE`]
pub fn extract_case_type(carte: &Value) -> String {
    carte
        .get(CASE_TYPE_FIELD)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_CASE_TYPE)
        .to_string()
}

/// Random 32-hex-character token sent as `csrt`
pub fn correlation_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
