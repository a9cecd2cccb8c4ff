//! Data access traits for sensitive areas and treks.
//!
//! The traits stand in for the persistence layer: [`AreaStore`] answers
//! [`AreaQuery`] selections, [`AreaStoreMut`] records edits, and [`TrekStore`]
//! resolves treks. The provided methods implement the reference semantics
//! in memory; backends may override them to push criteria down.

use geo::LineString;
use thiserror::Error;

use crate::{AreaQuery, Practice, SensitiveArea, Species, Srid, Trek, UnknownCategory};

mod spatial_index;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use spatial_index::AreaIndex;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteStore;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic SQLite error when reading or writing rows.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    /// A stored geometry payload could not be encoded or decoded.
    #[cfg(feature = "serde")]
    #[error("invalid geometry for {kind} {id}: {source}")]
    Geometry {
        /// Kind of record holding the geometry.
        kind: &'static str,
        /// Identifier of the record.
        id: u64,
        /// JSON failure.
        #[source]
        source: serde_json::Error,
    },
    /// A sensitive area references a species that does not exist.
    #[error("sensitive area {area} references missing species {species}")]
    MissingSpecies {
        /// Identifier of the area.
        area: u64,
        /// Identifier of the missing species.
        species: u64,
    },
    /// A record to update or delete does not exist.
    #[error("{kind} {id} does not exist")]
    NotFound {
        /// Kind of record.
        kind: &'static str,
        /// Identifier that was looked up.
        id: u64,
    },
    /// A stored category identifier is not recognised.
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    /// A row identifier could not be represented as `u64`.
    #[error("row identifier {0} is out of range")]
    RowId(i64),
}

/// Read access to sensitive areas and their species.
pub trait AreaStore {
    /// Reference system stored geometries are expressed in.
    fn srid(&self) -> Srid;

    /// Every record, deleted ones included.
    fn areas(&self) -> Result<Vec<SensitiveArea>, StoreError>;

    /// Look up a record by identifier, deleted ones included.
    fn area(&self, id: u64) -> Result<Option<SensitiveArea>, StoreError> {
        Ok(self.areas()?.into_iter().find(|area| area.id == id))
    }

    /// Look up a species.
    fn species(&self, id: u64) -> Result<Option<Species>, StoreError>;

    /// Known practices, ordered by name.
    fn practices(&self) -> Result<Vec<Practice>, StoreError>;

    /// Evaluate `query`.
    fn select(&self, query: &AreaQuery) -> Result<Vec<SensitiveArea>, StoreError> {
        Ok(query.apply(self.areas()?))
    }

    /// Records selected by `query` whose footprint intersects `path`.
    ///
    /// `path` is expressed in `srid`. The query's transform, if any, applies
    /// to the returned records only.
    fn intersecting(
        &self,
        path: &LineString<f64>,
        srid: Srid,
        query: &AreaQuery,
    ) -> Result<Vec<SensitiveArea>, StoreError> {
        let candidates = self.select(&query.untransformed())?;
        let index = AreaIndex::new(candidates, srid);
        Ok(query.finish(index.intersecting(path)))
    }
}

/// Write access to sensitive areas and species.
pub trait AreaStoreMut: AreaStore {
    /// Persist a new species and return it with its assigned identifiers.
    ///
    /// Practices are matched by name; unknown names are created.
    fn insert_species(&mut self, species: Species) -> Result<Species, StoreError>;

    /// Overwrite an existing species.
    fn update_species(&mut self, species: &Species) -> Result<(), StoreError>;

    /// Persist a new area and return it with its assigned identifier.
    fn insert_area(&mut self, area: SensitiveArea) -> Result<SensitiveArea, StoreError>;

    /// Overwrite an existing area.
    fn update_area(&mut self, area: &SensitiveArea) -> Result<(), StoreError>;

    /// Soft-delete an area; it stays stored but leaves every existing query.
    fn delete_area(&mut self, id: u64) -> Result<(), StoreError>;
}

/// Read access to treks.
pub trait TrekStore {
    /// Look up a trek, deleted ones included.
    fn trek(&self, id: u64) -> Result<Option<Trek>, StoreError>;

    /// Look up a trek that has not been soft-deleted.
    fn existing_trek(&self, id: u64) -> Result<Option<Trek>, StoreError> {
        Ok(self.trek(id)?.filter(Trek::is_existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, sample_species, square};
    use geo::line_string;

    #[test]
    fn intersecting_selects_crossed_areas_only() {
        let crossed = SensitiveArea::new(
            1,
            sample_species(1, &["Hiking"]),
            square(0.0, 0.0, 10.0),
            Srid::Lambert93,
            1,
        )
        .with_published(true);
        let distant = SensitiveArea::new(
            2,
            sample_species(2, &["Hiking"]),
            square(100.0, 100.0, 10.0),
            Srid::Lambert93,
            1,
        )
        .with_published(true);
        let store = MemoryStore::new(Srid::Lambert93).with_areas([crossed, distant]);
        let path = line_string![(x: -5.0, y: 5.0), (x: 5.0, y: 5.0)];

        let hits = store
            .intersecting(&path, Srid::Lambert93, &AreaQuery::existing())
            .expect("query succeeds");

        assert_eq!(hits.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn existing_trek_hides_deleted_treks() {
        let mut trek = Trek::new(
            1,
            "Loop",
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
            Srid::Lambert93,
        );
        trek.lifecycle = crate::Lifecycle::Deleted;
        let store = MemoryStore::new(Srid::Lambert93).with_treks([trek]);
        assert!(store.trek(1).expect("lookup").is_some());
        assert!(store.existing_trek(1).expect("lookup").is_none());
    }
}
