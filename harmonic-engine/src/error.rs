use harmonic_db::error::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),

    /// Aucun candidat n'a passé les filtres dans la limite d'essais.
    #[error("Génération épuisée après {attempts} essais")]
    GenerationExhausted { attempts: usize },

    /// Le worker Monte Carlo a échoué. Récupéré localement, jamais remonté par `rank`.
    #[error("Échec du worker Monte Carlo : {0}")]
    WorkerFailure(String),

    #[error("Requête invalide : {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn is_stats_not_generated(&self) -> bool {
        matches!(self, EngineError::Data(DataError::StatsNotGenerated))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
