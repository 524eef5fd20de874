use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// Historique absent et impossible à synthétiser.
    #[error("Données historiques indisponibles : {0}")]
    DataUnavailable(String),

    /// Aucun instantané d'analyse n'a encore été écrit.
    #[error("Statistiques non générées : lancez d'abord l'analyse")]
    StatsNotGenerated,

    #[error("Tirage invalide : {0}")]
    InvalidDraw(String),

    #[error("Erreur d'entrée/sortie sur {path:?} : {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Erreur CSV : {0}")]
    Csv(#[from] csv::Error),

    #[error("Erreur JSON : {0}")]
    Json(#[from] serde_json::Error),
}

impl DataError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type DataResult<T> = Result<T, DataError>;
