//! SQLite-backed store for sensitive areas, species and treks.
//!
//! Geometries are stored as JSON payloads in the store's reference system.
//! Selection criteria are pushed down into SQL; reprojection happens after
//! rows are decoded.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use geo::LineString;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

use crate::{
    AreaGeometry, AreaQuery, Lifecycle, Period, Practice, SensitiveArea, Species, SpeciesCategory,
    Srid, Trek,
};

use super::{AreaStore, AreaStoreMut, StoreError, TrekStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS practices (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS species (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        category INTEGER NOT NULL,
        period INTEGER NOT NULL,
        url TEXT,
        radius INTEGER
    );
    CREATE TABLE IF NOT EXISTS species_practices (
        species_id INTEGER NOT NULL REFERENCES species(id),
        practice_id INTEGER NOT NULL REFERENCES practices(id),
        PRIMARY KEY (species_id, practice_id)
    );
    CREATE TABLE IF NOT EXISTS sensitive_areas (
        id INTEGER PRIMARY KEY,
        species_id INTEGER NOT NULL REFERENCES species(id),
        structure_id INTEGER NOT NULL,
        published INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT '',
        contact TEXT NOT NULL DEFAULT '',
        geom TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS treks (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        structure_id INTEGER NOT NULL,
        published INTEGER NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0,
        geom TEXT NOT NULL
    );
";

const AREA_COLUMNS: &str =
    "id, species_id, structure_id, published, deleted, description, contact, geom";

/// Read-write store backed by a single SQLite database.
pub struct SqliteStore {
    connection: Connection,
    srid: Srid,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("srid", &self.srid)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`; geometries live in `srid`.
    pub fn open<P>(path: P, srid: Srid) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(connection, srid)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(srid: Srid) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, srid)
    }

    fn with_connection(connection: Connection, srid: Srid) -> Result<Self, StoreError> {
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self { connection, srid })
    }

    /// Persist a new trek and return it with its assigned identifier.
    pub fn insert_trek(&mut self, mut trek: Trek) -> Result<Trek, StoreError> {
        let geom = encode_json("trek", trek.id, &trek.path)?;
        self.connection.execute(
            "INSERT INTO treks (name, structure_id, published, deleted, geom)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                trek.name,
                trek.structure,
                trek.published,
                matches!(trek.lifecycle, Lifecycle::Deleted),
                geom
            ],
        )?;
        trek.id = row_id(self.connection.last_insert_rowid())?;
        trek.srid = self.srid;
        Ok(trek)
    }

    fn load_species(&self) -> Result<HashMap<u64, Species>, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT id, name, category, period, url, radius FROM species")?;
        let mut rows = statement.query([])?;
        let mut species = HashMap::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let category: i64 = row.get(2)?;
            species.insert(
                id,
                Species {
                    id,
                    name: row.get(1)?,
                    category: SpeciesCategory::from_id(category)?,
                    practices: BTreeSet::new(),
                    period: Period::from_bits(row.get(3)?),
                    url: row.get(4)?,
                    radius: row.get(5)?,
                },
            );
        }

        let mut statement = self.connection.prepare(
            "SELECT sp.species_id, p.id, p.name
             FROM species_practices AS sp
             JOIN practices AS p ON p.id = sp.practice_id",
        )?;
        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let species_id: u64 = row.get(0)?;
            if let Some(entry) = species.get_mut(&species_id) {
                entry
                    .practices
                    .insert(Practice::new(row.get(1)?, row.get::<_, String>(2)?));
            }
        }
        Ok(species)
    }

    fn decode_area(
        &self,
        row: &Row<'_>,
        species: &HashMap<u64, Species>,
    ) -> Result<SensitiveArea, StoreError> {
        let id: u64 = row.get(0)?;
        let species_id: u64 = row.get(1)?;
        let geom: String = row.get(7)?;
        let deleted: bool = row.get(4)?;
        let geometry: AreaGeometry = serde_json::from_str(&geom).map_err(|source| {
            StoreError::Geometry {
                kind: "sensitive area",
                id,
                source,
            }
        })?;
        let species = species
            .get(&species_id)
            .cloned()
            .ok_or(StoreError::MissingSpecies {
                area: id,
                species: species_id,
            })?;
        Ok(SensitiveArea {
            id,
            species,
            geometry,
            srid: self.srid,
            published: row.get(3)?,
            structure: row.get(2)?,
            lifecycle: if deleted {
                Lifecycle::Deleted
            } else {
                Lifecycle::Existing
            },
            description: row.get(5)?,
            contact: row.get(6)?,
        })
    }

    fn query_areas<P>(&self, sql: &str, params: P) -> Result<Vec<SensitiveArea>, StoreError>
    where
        P: rusqlite::Params,
    {
        let species = self.load_species()?;
        let mut statement = self.connection.prepare(sql)?;
        let mut rows = statement.query(params)?;
        let mut areas = Vec::new();
        while let Some(row) = rows.next()? {
            areas.push(self.decode_area(row, &species)?);
        }
        Ok(areas)
    }
}

fn encode_json<T>(kind: &'static str, id: u64, value: &T) -> Result<String, StoreError>
where
    T: serde::Serialize,
{
    serde_json::to_string(value).map_err(|source| StoreError::Geometry { kind, id, source })
}

fn row_id(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw).map_err(|_| StoreError::RowId(raw))
}

fn practice_id(tx: &Transaction<'_>, name: &str) -> Result<u64, StoreError> {
    tx.execute(
        "INSERT INTO practices (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = tx.query_row(
        "SELECT id FROM practices WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn link_practices(
    tx: &Transaction<'_>,
    species: &mut Species,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM species_practices WHERE species_id = ?1",
        params![species.id],
    )?;
    let mut linked = BTreeSet::new();
    for practice in std::mem::take(&mut species.practices) {
        let id = practice_id(tx, &practice.name)?;
        tx.execute(
            "INSERT OR IGNORE INTO species_practices (species_id, practice_id) VALUES (?1, ?2)",
            params![species.id, id],
        )?;
        linked.insert(Practice::new(id, practice.name));
    }
    species.practices = linked;
    Ok(())
}

impl AreaStore for SqliteStore {
    fn srid(&self) -> Srid {
        self.srid
    }

    fn areas(&self) -> Result<Vec<SensitiveArea>, StoreError> {
        self.query_areas(
            &format!("SELECT {AREA_COLUMNS} FROM sensitive_areas ORDER BY id"),
            [],
        )
    }

    fn area(&self, id: u64) -> Result<Option<SensitiveArea>, StoreError> {
        let mut found = self.query_areas(
            &format!("SELECT {AREA_COLUMNS} FROM sensitive_areas WHERE id = ?1"),
            params![id],
        )?;
        Ok(found.pop())
    }

    fn species(&self, id: u64) -> Result<Option<Species>, StoreError> {
        Ok(self.load_species()?.remove(&id))
    }

    fn practices(&self) -> Result<Vec<Practice>, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT id, name FROM practices ORDER BY name")?;
        let practices = statement
            .query_map([], |row| Ok(Practice::new(row.get(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(practices)
    }

    fn select(&self, query: &AreaQuery) -> Result<Vec<SensitiveArea>, StoreError> {
        let mut sql = format!("SELECT {AREA_COLUMNS} FROM sensitive_areas WHERE 1 = 1");
        let mut names: Vec<&str> = Vec::new();
        if query.requires_existing() {
            sql.push_str(" AND deleted = 0");
        }
        if query.requires_published() {
            sql.push_str(" AND published = 1");
        }
        if let Some(filter) = query.practice_filter() {
            names.extend(filter.names());
            if names.is_empty() {
                sql.push_str(" AND 0");
            } else {
                let placeholders = vec!["?"; names.len()].join(", ");
                sql.push_str(&format!(
                    " AND EXISTS (
                        SELECT 1 FROM species_practices AS sp
                        JOIN practices AS p ON p.id = sp.practice_id
                        WHERE sp.species_id = sensitive_areas.species_id
                          AND p.name IN ({placeholders})
                    )"
                ));
            }
        }
        sql.push_str(" ORDER BY id");
        let areas = self.query_areas(&sql, params_from_iter(names.iter()))?;
        Ok(query.finish(areas))
    }
}

impl AreaStoreMut for SqliteStore {
    fn insert_species(&mut self, mut species: Species) -> Result<Species, StoreError> {
        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT INTO species (name, category, period, url, radius) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                species.name,
                species.category.id(),
                species.period.bits(),
                species.url,
                species.radius
            ],
        )?;
        species.id = row_id(tx.last_insert_rowid())?;
        link_practices(&tx, &mut species)?;
        tx.commit()?;
        Ok(species)
    }

    fn update_species(&mut self, species: &Species) -> Result<(), StoreError> {
        let tx = self.connection.transaction()?;
        let changed = tx.execute(
            "UPDATE species SET name = ?1, category = ?2, period = ?3, url = ?4, radius = ?5
             WHERE id = ?6",
            params![
                species.name,
                species.category.id(),
                species.period.bits(),
                species.url,
                species.radius,
                species.id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "species",
                id: species.id,
            });
        }
        let mut species = species.clone();
        link_practices(&tx, &mut species)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_area(&mut self, mut area: SensitiveArea) -> Result<SensitiveArea, StoreError> {
        let known: Option<u64> = self
            .connection
            .query_row(
                "SELECT id FROM species WHERE id = ?1",
                params![area.species.id],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(StoreError::MissingSpecies {
                area: area.id,
                species: area.species.id,
            });
        }
        let geometry = area.geometry.reproject(area.srid, self.srid);
        let geom = encode_json("sensitive area", area.id, &geometry)?;
        self.connection.execute(
            "INSERT INTO sensitive_areas
                (species_id, structure_id, published, deleted, description, contact, geom)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                area.species.id,
                area.structure,
                area.published,
                !area.is_existing(),
                area.description,
                area.contact,
                geom
            ],
        )?;
        area.id = row_id(self.connection.last_insert_rowid())?;
        area.geometry = geometry;
        area.srid = self.srid;
        Ok(area)
    }

    fn update_area(&mut self, area: &SensitiveArea) -> Result<(), StoreError> {
        let geometry = area.geometry.reproject(area.srid, self.srid);
        let geom = encode_json("sensitive area", area.id, &geometry)?;
        let changed = self.connection.execute(
            "UPDATE sensitive_areas
             SET species_id = ?1, structure_id = ?2, published = ?3, deleted = ?4,
                 description = ?5, contact = ?6, geom = ?7
             WHERE id = ?8",
            params![
                area.species.id,
                area.structure,
                area.published,
                !area.is_existing(),
                area.description,
                area.contact,
                geom,
                area.id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "sensitive area",
                id: area.id,
            });
        }
        Ok(())
    }

    fn delete_area(&mut self, id: u64) -> Result<(), StoreError> {
        let changed = self.connection.execute(
            "UPDATE sensitive_areas SET deleted = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "sensitive area",
                id,
            });
        }
        Ok(())
    }
}

impl TrekStore for SqliteStore {
    fn trek(&self, id: u64) -> Result<Option<Trek>, StoreError> {
        let row = self
            .connection
            .query_row(
                "SELECT id, name, structure_id, published, deleted, geom FROM treks WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, u64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, name, structure, published, deleted, geom)) = row else {
            return Ok(None);
        };
        let path: LineString<f64> =
            serde_json::from_str(&geom).map_err(|source| StoreError::Geometry {
                kind: "trek",
                id,
                source,
            })?;
        Ok(Some(Trek {
            id,
            name,
            path,
            srid: self.srid,
            published,
            structure,
            lifecycle: if deleted {
                Lifecycle::Deleted
            } else {
                Lifecycle::Existing
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PracticeFilter;
    use crate::test_support::{MemoryStore, sample_species, square};
    use geo::line_string;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    fn area(species: Species, x: f64, published: bool) -> SensitiveArea {
        SensitiveArea::new(0, species, square(x, 0.0, 10.0), Srid::Lambert93, 1)
            .with_published(published)
    }

    #[fixture]
    fn populated() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory(Srid::Lambert93).expect("open store");
        let climbing = store
            .insert_species(sample_species(0, &["Climbing"]))
            .expect("insert species");
        let flying = store
            .insert_species(sample_species(0, &["Flying", "Hiking"]))
            .expect("insert species");
        store
            .insert_area(area(climbing.clone(), 0.0, true))
            .expect("insert area");
        store
            .insert_area(area(flying, 20.0, true))
            .expect("insert area");
        store
            .insert_area(area(climbing.clone(), 40.0, false))
            .expect("insert area");
        let deleted = store
            .insert_area(area(climbing, 60.0, true))
            .expect("insert area");
        store.delete_area(deleted.id).expect("delete area");
        store
    }

    fn ids(areas: &[SensitiveArea]) -> Vec<u64> {
        areas.iter().map(|area| area.id).collect()
    }

    #[rstest]
    #[case(AreaQuery::all())]
    #[case(AreaQuery::existing())]
    #[case(AreaQuery::existing().published())]
    #[case(AreaQuery::existing().published().practices(PracticeFilter::parse("Climbing")))]
    #[case(AreaQuery::existing().practices(PracticeFilter::parse("Hiking,Climbing")))]
    #[case(AreaQuery::existing().practices(PracticeFilter::parse("Swimming")))]
    #[case(AreaQuery::existing().practices(PracticeFilter::from_names(Vec::<String>::new())))]
    fn pushdown_agrees_with_memory_evaluation(populated: SqliteStore, #[case] query: AreaQuery) {
        let in_memory = MemoryStore::new(Srid::Lambert93)
            .with_areas(populated.areas().expect("load areas"));
        let pushed = populated.select(&query).expect("select");
        let reference = in_memory.select(&query).expect("select");
        assert_eq!(ids(&pushed), ids(&reference));
    }

    #[rstest]
    fn select_applies_transform(populated: SqliteStore) {
        let selected = populated
            .select(&AreaQuery::existing().published().transform(Srid::Wgs84))
            .expect("select");
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|area| area.srid == Srid::Wgs84));
    }

    #[rstest]
    fn soft_deleted_area_is_still_stored(populated: SqliteStore) {
        let all = populated.areas().expect("areas");
        assert_eq!(all.len(), 4);
        assert_eq!(all.iter().filter(|a| !a.is_existing()).count(), 1);
    }

    #[rstest]
    fn practices_are_shared_between_species(populated: SqliteStore) {
        let names: Vec<_> = populated
            .practices()
            .expect("practices")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Climbing", "Flying", "Hiking"]);
    }

    #[rstest]
    fn insert_area_requires_known_species() {
        let mut store = SqliteStore::open_in_memory(Srid::Lambert93).expect("open store");
        let error = store
            .insert_area(area(sample_species(42, &[]), 0.0, true))
            .expect_err("unknown species should fail");
        assert!(matches!(error, StoreError::MissingSpecies { species: 42, .. }));
    }

    #[rstest]
    fn treks_round_trip_through_disk() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("sensitivity.db");
        let trek = {
            let mut store = SqliteStore::open(&path, Srid::Lambert93).expect("open store");
            store
                .insert_trek(
                    Trek::new(0, "Ridge", line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0)], Srid::Lambert93)
                        .with_published(true),
                )
                .expect("insert trek")
        };
        let store = SqliteStore::open(&path, Srid::Lambert93).expect("reopen store");
        assert_eq!(store.trek(trek.id).expect("lookup"), Some(trek.clone()));
        assert_eq!(store.trek(trek.id + 1).expect("lookup"), None);
    }

    #[rstest]
    fn update_missing_area_fails(populated: SqliteStore) {
        let mut store = populated;
        let mut ghost = store.areas().expect("areas").remove(0);
        ghost.id = 999;
        assert!(matches!(
            store.update_area(&ghost),
            Err(StoreError::NotFound { id: 999, .. })
        ));
    }
}
