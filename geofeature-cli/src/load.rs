//! Input validation and store loading shared by the subcommands.

use camino::{Utf8Path, Utf8PathBuf};
use geofeature_data::FileFeatureDataStore;

use crate::{ARG_FILES, CliError};

/// Fail unless every path names an existing regular file.
pub(crate) fn validate_files(files: &[Utf8PathBuf]) -> Result<(), CliError> {
    files
        .iter()
        .try_for_each(|path| require_existing(path, ARG_FILES))
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match geofeature_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load `files` into a fresh GeoJSON-backed store. Repeated paths are
/// loaded once.
pub(crate) fn load_store(files: &[Utf8PathBuf]) -> Result<FileFeatureDataStore, CliError> {
    let store = FileFeatureDataStore::geojson();
    for path in files {
        if store.contains_file(path) {
            continue;
        }
        store
            .add_file(path)
            .map_err(|source| CliError::LoadFile {
                path: path.clone(),
                source,
            })?;
    }
    Ok(store)
}
