/// Dossier aggregation
///
/// A dossier is assembled from four middleware lookups: the primary
/// `CarteDossier` call, then decisions, parties and expertises keyed by the
/// internal id found in the primary result.

pub mod orchestrator;
pub mod service;

pub use orchestrator::DossierOrchestrator;
pub use service::{DossierLookup, DossierService};

use serde::Serialize;
use serde_json::Value;

/// Aggregated dossier, as cached and returned under `data`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DossierRecord {
    pub carte: Value,
    pub decisions: Value,
    pub parties: Value,
    pub expertises: Value,
    /// RFC 3339 time of assembly
    pub timestamp: String,
}

/// Why an aggregation stopped after the primary lookup
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The primary lookup answered, but without a usable internal id
    NotFound,
    /// The primary lookup itself failed (transport, timeout, HTTP status)
    FetchError,
}

/// Orchestration-level failure, returned to callers rather than raised
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResult {
    pub kind: ErrorKind,
    pub message: String,
    /// Whatever the primary lookup returned, `{}` if nothing usable
    pub partial_carte: Value,
}

impl ErrorResult {
    pub fn not_found(message: impl Into<String>, partial_carte: Value) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
            partial_carte,
        }
    }

    pub fn fetch_error(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::FetchError,
            message: message.into(),
            partial_carte: Value::Object(Default::default()),
        }
    }
}

/// Result of one orchestration run
#[derive(Debug, Clone, PartialEq)]
pub enum DossierOutcome {
    Found(DossierRecord),
    Failed(ErrorResult),
}
