//! Test helpers for seeding area stores and export fixtures on disk.

use camino::{Utf8Path, Utf8PathBuf};
use geo::line_string;
use sensitivity_core::test_support::square;
use sensitivity_core::{
    AreaStoreMut, Practice, SensitiveArea, Species, SpeciesCategory, SqliteStore, Srid, Trek,
};
use std::fs;
use tempfile::TempDir;

const X: f64 = 700_000.0;
const Y: f64 = 6_600_000.0;

/// Temporary directory addressed through UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write file");
}

/// Identifiers of the records written by [`seed_database`].
#[derive(Debug, Clone, Copy)]
pub(super) struct Seeded {
    /// Published area practising climbing, crossed by the public trek.
    pub(super) crossed: u64,
    /// Published area practising hiking, away from every trek.
    pub(super) remote: u64,
    pub(super) public_trek: u64,
    pub(super) hidden_trek: u64,
}

/// Write two published areas, one draft and two treks into `path`.
pub(super) fn seed_database(path: &Utf8Path) -> Seeded {
    let mut store = SqliteStore::open(path, Srid::Lambert93).expect("open store");
    let climbing = store
        .insert_species(
            Species::new(0, "Aquila chrysaetos", SpeciesCategory::Species)
                .with_practices([Practice::new(0, "Climbing")]),
        )
        .expect("insert species");
    let hiking = store
        .insert_species(
            Species::new(0, "Tetrao urogallus", SpeciesCategory::Species)
                .with_practices([Practice::new(0, "Hiking")]),
        )
        .expect("insert species");
    let mut insert = |species: &Species, x: f64, published: bool| {
        store
            .insert_area(
                SensitiveArea::new(0, species.clone(), square(X + x, Y, 100.0), Srid::Lambert93, 1)
                    .with_published(published),
            )
            .expect("insert area")
            .id
    };
    let crossed = insert(&climbing, 0.0, true);
    let remote = insert(&hiking, 500.0, true);
    insert(&climbing, 80.0, false);
    let path = line_string![(x: X - 50.0, y: Y + 50.0), (x: X + 150.0, y: Y + 50.0)];
    let public_trek = store
        .insert_trek(Trek::new(0, "Crest", path.clone(), Srid::Lambert93).with_published(true))
        .expect("insert trek")
        .id;
    let hidden_trek = store
        .insert_trek(Trek::new(0, "Draft", path, Srid::Lambert93))
        .expect("insert trek")
        .id;
    Seeded {
        crossed,
        remote,
        public_trek,
        hidden_trek,
    }
}

/// Feature identifiers of a printed GeoJSON feature collection.
pub(super) fn printed_ids(stdout: &[u8]) -> Vec<u64> {
    let value: serde_json::Value = serde_json::from_slice(stdout).expect("JSON output");
    assert_eq!(value["type"], "FeatureCollection");
    value["features"]
        .as_array()
        .expect("features array")
        .iter()
        .map(|feature| feature["id"].as_u64().expect("numeric id"))
        .collect()
}

/// Builder handing out a shared recording command.
#[derive(Debug, Default)]
pub(super) struct RecordingBuilder {
    pub(super) command: std::sync::Arc<sensitivity_tasks::test_support::RecordingCommand>,
}

impl crate::sync_rando::ExportCommandBuilder for RecordingBuilder {
    fn build(
        &self,
        _config: &crate::sync_rando::SyncRandoConfig,
    ) -> std::sync::Arc<dyn sensitivity_tasks::ExportCommand> {
        self.command.clone()
    }
}
