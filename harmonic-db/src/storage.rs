use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DataError, DataResult};

/// Écrit via un fichier temporaire puis `rename`, pour qu'un lecteur ne voie jamais d'écriture partielle.
pub fn write_atomic(path: &Path, contents: &[u8]) -> DataResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| DataError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| DataError::io(path, e))?;
    Ok(())
}

pub fn read_file(path: &Path) -> DataResult<Vec<u8>> {
    fs::read(path).map_err(|e| DataError::io(path, e))
}
