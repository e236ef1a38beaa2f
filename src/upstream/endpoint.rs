/// Mahakim `SuiviDossiers` endpoints and their wire parameter names
use std::fmt;

/// Query parameter carrying the encrypted jurisdiction id
pub const JURISDICTION_PARAM: &str = "idjuridiction";
/// Query parameter carrying the encrypted case-type code
pub const CASE_TYPE_PARAM: &str = "typeaffaire";
/// Query parameter carrying the per-request correlation token
pub const TOKEN_PARAM: &str = "csrt";

/// Query parameters as sent on the wire
pub type QueryParams = Vec<(&'static str, String)>;

/// The four lookups behind a dossier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Primary lookup by external dossier number
    CarteDossier,
    Decisions,
    Parties,
    Expertises,
}

impl Endpoint {
    /// The three lookups keyed by the internal dossier id
    #[cfg(test)]
    pub const DEPENDENT: [Endpoint; 3] = [Endpoint::Decisions, Endpoint::Parties, Endpoint::Expertises];

    /// Path segment under `/SuiviDossiers` (spelling matches the middleware)
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CarteDossier => "CarteDossier",
            Endpoint::Decisions => "ListeDicisions",
            Endpoint::Parties => "ListeParties",
            Endpoint::Expertises => "ListeExpertisesJudiciaire",
        }
    }

    /// Name of the parameter carrying the encrypted dossier id
    pub fn dossier_param(&self) -> &'static str {
        match self {
            Endpoint::CarteDossier => "numeroCompletDossier",
            Endpoint::Parties => "idDoss",
            Endpoint::Decisions | Endpoint::Expertises => "idDossiers",
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/SuiviDossiers/{}", base_url.trim_end_matches('/'), self.path())
    }

    /// Parameters for the primary lookup
    pub fn primary_params(dossier_enc: String, jurisdiction_enc: String, token: &str) -> QueryParams {
        vec![
            (Endpoint::CarteDossier.dossier_param(), dossier_enc),
            (JURISDICTION_PARAM, jurisdiction_enc),
            (TOKEN_PARAM, token.to_string()),
        ]
    }

    /// Parameters for a dependent lookup
    pub fn dependent_params(&self, internal_id_enc: &str, case_type_enc: &str, token: &str) -> QueryParams {
        vec![
            (self.dossier_param(), internal_id_enc.to_string()),
            (CASE_TYPE_PARAM, case_type_enc.to_string()),
            (TOKEN_PARAM, token.to_string()),
        ]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
