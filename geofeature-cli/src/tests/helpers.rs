//! Test helpers for writing GeoJSON inputs.

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary directory holding GeoJSON inputs.
pub(super) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(super) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub(super) fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf()).expect("utf-8 workspace")
    }

    /// Write a collection named `set` holding `features` as
    /// `(name, geometry JSON)` pairs.
    pub(super) fn collection(&self, file: &str, set: &str, features: &[(&str, &str)]) -> Utf8PathBuf {
        let body: Vec<String> = features
            .iter()
            .map(|(name, geometry)| {
                format!(
                    r#"{{"type":"Feature","geometry":{geometry},"properties":{{"name":"{name}"}}}}"#
                )
            })
            .collect();
        let text = format!(
            r#"{{"type":"FeatureCollection","name":"{set}","features":[{}]}}"#,
            body.join(",")
        );
        let path = self.root().join(file);
        write_utf8(&path, text.as_bytes());
        path
    }

    /// Harbours in the English Channel plus one ferry route.
    pub(super) fn channel(&self) -> Utf8PathBuf {
        self.collection(
            "channel.geojson",
            "Channel",
            &[
                ("Dover", r#"{"type":"Point","coordinates":[1.31,51.12]}"#),
                ("Calais", r#"{"type":"Point","coordinates":[1.85,50.95]}"#),
                ("Dunkirk", r#"{"type":"Point","coordinates":[2.37,51.03]}"#),
                (
                    "Dover-Calais",
                    r#"{"type":"LineString","coordinates":[[1.31,51.12],[1.85,50.95]]}"#,
                ),
            ],
        )
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path, contents).expect("write fixture");
}
