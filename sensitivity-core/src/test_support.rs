//! In-memory store and fixture helpers used by unit and behaviour tests.
//!
//! Available under `cfg(test)` and to other crates through the
//! `test-support` feature.

use std::collections::BTreeMap;

use geo::{Coord, Rect};

use crate::{
    AreaGeometry, AreaStore, AreaStoreMut, Practice, SensitiveArea, Species, SpeciesCategory,
    Srid, StoreError, Trek, TrekStore,
};

/// In-memory store implementing every store trait.
///
/// Selections perform a linear scan and are intended only for small datasets.
#[derive(Debug)]
pub struct MemoryStore {
    srid: Srid,
    areas: BTreeMap<u64, SensitiveArea>,
    species: BTreeMap<u64, Species>,
    practices: BTreeMap<String, Practice>,
    treks: BTreeMap<u64, Trek>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store whose geometries live in `srid`.
    pub const fn new(srid: Srid) -> Self {
        Self {
            srid,
            areas: BTreeMap::new(),
            species: BTreeMap::new(),
            practices: BTreeMap::new(),
            treks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Add areas as-is, registering their species and practices.
    #[must_use]
    pub fn with_areas<I>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = SensitiveArea>,
    {
        for area in areas {
            self.register_species(&area.species);
            self.bump(area.id);
            self.areas.insert(area.id, area);
        }
        self
    }

    /// Add species as-is.
    #[must_use]
    pub fn with_species<I>(mut self, species: I) -> Self
    where
        I: IntoIterator<Item = Species>,
    {
        for entry in species {
            self.register_species(&entry);
        }
        self
    }

    /// Add treks as-is.
    #[must_use]
    pub fn with_treks<I>(mut self, treks: I) -> Self
    where
        I: IntoIterator<Item = Trek>,
    {
        for trek in treks {
            self.bump(trek.id);
            self.treks.insert(trek.id, trek);
        }
        self
    }

    fn register_species(&mut self, species: &Species) {
        for practice in &species.practices {
            self.bump(practice.id);
            self.practices
                .entry(practice.name.clone())
                .or_insert_with(|| practice.clone());
        }
        self.bump(species.id);
        self.species.insert(species.id, species.clone());
    }

    fn bump(&mut self, id: u64) {
        self.next_id = self.next_id.max(id.saturating_add(1));
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn resolve_practices(&mut self, species: &mut Species) {
        let resolved = std::mem::take(&mut species.practices)
            .into_iter()
            .map(|practice| match self.practices.get(&practice.name) {
                Some(known) => known.clone(),
                None => {
                    let created = Practice::new(self.allocate(), practice.name);
                    self.practices.insert(created.name.clone(), created.clone());
                    created
                }
            })
            .collect();
        species.practices = resolved;
    }
}

impl AreaStore for MemoryStore {
    fn srid(&self) -> Srid {
        self.srid
    }

    fn areas(&self) -> Result<Vec<SensitiveArea>, StoreError> {
        Ok(self
            .areas
            .values()
            .cloned()
            .map(|mut area| {
                if let Some(species) = self.species.get(&area.species.id) {
                    area.species = species.clone();
                }
                area
            })
            .collect())
    }

    fn species(&self, id: u64) -> Result<Option<Species>, StoreError> {
        Ok(self.species.get(&id).cloned())
    }

    fn practices(&self) -> Result<Vec<Practice>, StoreError> {
        Ok(self.practices.values().cloned().collect())
    }
}

impl AreaStoreMut for MemoryStore {
    fn insert_species(&mut self, mut species: Species) -> Result<Species, StoreError> {
        species.id = self.allocate();
        self.resolve_practices(&mut species);
        self.species.insert(species.id, species.clone());
        Ok(species)
    }

    fn update_species(&mut self, species: &Species) -> Result<(), StoreError> {
        if !self.species.contains_key(&species.id) {
            return Err(StoreError::NotFound {
                kind: "species",
                id: species.id,
            });
        }
        let mut species = species.clone();
        self.resolve_practices(&mut species);
        self.species.insert(species.id, species);
        Ok(())
    }

    fn insert_area(&mut self, mut area: SensitiveArea) -> Result<SensitiveArea, StoreError> {
        let Some(species) = self.species.get(&area.species.id) else {
            return Err(StoreError::MissingSpecies {
                area: area.id,
                species: area.species.id,
            });
        };
        area.species = species.clone();
        area.id = self.allocate();
        self.areas.insert(area.id, area.clone());
        Ok(area)
    }

    fn update_area(&mut self, area: &SensitiveArea) -> Result<(), StoreError> {
        if !self.species.contains_key(&area.species.id) {
            return Err(StoreError::MissingSpecies {
                area: area.id,
                species: area.species.id,
            });
        }
        match self.areas.get_mut(&area.id) {
            Some(slot) => {
                *slot = area.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "sensitive area",
                id: area.id,
            }),
        }
    }

    fn delete_area(&mut self, id: u64) -> Result<(), StoreError> {
        self.areas
            .get_mut(&id)
            .map(SensitiveArea::soft_delete)
            .ok_or(StoreError::NotFound {
                kind: "sensitive area",
                id,
            })
    }
}

impl TrekStore for MemoryStore {
    fn trek(&self, id: u64) -> Result<Option<Trek>, StoreError> {
        Ok(self.treks.get(&id).cloned())
    }
}

/// Species of the standard category carrying the named practices.
///
/// Practice identifiers are derived from the practice name so fixtures
/// sharing a name share a practice.
pub fn sample_species(id: u64, practices: &[&str]) -> Species {
    Species::new(id, format!("species-{id}"), SpeciesCategory::Species).with_practices(
        practices
            .iter()
            .map(|name| Practice::new(practice_id(name), *name)),
    )
}

/// Regulatory species carrying the named practices.
pub fn regulatory_species(id: u64, practices: &[&str]) -> Species {
    Species {
        category: SpeciesCategory::Regulatory,
        ..sample_species(id, practices)
    }
}

fn practice_id(name: &str) -> u64 {
    let hash = name
        .bytes()
        .fold(7_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)));
    1_000 + hash % 1_000
}

/// Axis-aligned square polygon with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> AreaGeometry {
    let rect = Rect::new(Coord { x, y }, Coord { x: x + size, y: y + size });
    AreaGeometry::polygon(rect.to_polygon())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_species_reuse_known_practices() {
        let mut store =
            MemoryStore::new(Srid::Lambert93).with_species([sample_species(1, &["Climbing"])]);
        let created = store
            .insert_species(sample_species(0, &["Climbing", "Paragliding"]))
            .expect("insert species");
        let known = store.practices().expect("practices");
        assert_eq!(known.len(), 2);
        assert!(created.practices.iter().all(|p| known.contains(p)));
        assert_ne!(created.id, 1);
    }

    #[test]
    fn delete_missing_area_fails() {
        let mut store = MemoryStore::new(Srid::Lambert93);
        assert!(matches!(
            store.delete_area(9),
            Err(StoreError::NotFound { id: 9, .. })
        ));
    }
}
