//! Create and update forms for sensitive areas.
//!
//! Two form variants exist. The standard form attaches an area to an
//! existing species; the regulatory form describes a regulation zone and
//! owns a dedicated regulatory species carrying the regulation metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use sensitivity_core::{
    AreaGeometry, AreaStore, AreaStoreMut, DEFAULT_BUFFER_RADIUS, Period, Practice,
    SensitiveArea, Species, SpeciesCategory, Srid, StoreError,
};

use url::Url;

use crate::geojson::{GeoJsonError, SubmittedGeometry, decode_geometry, encode_geometry};

/// Query parameter selecting the form variant on creation.
pub const CATEGORY_PARAM: &str = "category";

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice.";
const INVALID_URL: &str = "Enter a valid URL.";
const INVALID_RADIUS: &str = "Enter a positive whole number.";

/// Form variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Area attached to an existing species.
    Standard,
    /// Regulation zone with its own metadata.
    Regulatory,
}

impl FormKind {
    /// Variant used by the create view.
    ///
    /// Only the exact regulatory category identifier selects the regulatory
    /// form; anything else, including no parameter, selects the standard one.
    pub fn for_create(category: Option<&str>) -> Self {
        match category.map(str::parse::<SpeciesCategory>) {
            Some(Ok(SpeciesCategory::Regulatory)) => Self::Regulatory,
            _ => Self::Standard,
        }
    }

    /// Variant used to edit an area protecting `species`.
    pub const fn for_species(species: &Species) -> Self {
        if species.is_regulatory() {
            Self::Regulatory
        } else {
            Self::Standard
        }
    }
}

/// Raw submitted or initial form values, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: BTreeMap<String, String>,
}

impl FormData {
    /// Empty form data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Trimmed value of `key`; blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Whether a checkbox-style field is ticked.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| matches!(value, "on" | "true" | "1" | "yes"))
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Validation errors keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid form")?;
        let mut separator = ": ";
        for (field, messages) in &self.fields {
            for message in messages {
                write!(f, "{separator}{field}: {message}")?;
                separator = "; ";
            }
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

impl FormErrors {
    /// Record `message` against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Whether no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded against `field`.
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    /// Fields carrying errors, in name order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn into_result<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, Self> {
        match value() {
            Some(value) if self.is_empty() => Ok(value),
            _ => Err(self),
        }
    }
}

/// Fields shared by both variants, already cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonFields {
    /// Geometry expressed in the store's reference system.
    pub geometry: AreaGeometry,
    pub published: bool,
    pub description: String,
    pub contact: String,
}

/// Cleaned standard form.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardForm {
    /// Protected species; always of the standard category.
    pub species: Species,
    pub common: CommonFields,
}

/// Cleaned regulatory form.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulatoryForm {
    pub name: String,
    /// At least one practice name.
    pub practices: BTreeSet<String>,
    pub period: Period,
    pub url: Option<String>,
    /// Buffer radius in metres for point geometries.
    pub radius: Option<u32>,
    pub common: CommonFields,
}

/// A validated form, tagged by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaForm {
    Standard(StandardForm),
    Regulatory(RegulatoryForm),
}

impl AreaForm {
    /// Validate `data` against the schema of `kind`.
    ///
    /// Submitted geometries are expressed in `input_srid` and are converted
    /// into the store's reference system.
    pub fn validate<S>(
        kind: FormKind,
        data: &FormData,
        store: &S,
        input_srid: Srid,
    ) -> Result<Self, FormErrors>
    where
        S: AreaStore + ?Sized,
    {
        match kind {
            FormKind::Standard => validate_standard(data, store, input_srid).map(Self::Standard),
            FormKind::Regulatory => {
                validate_regulatory(data, store.srid(), input_srid).map(Self::Regulatory)
            }
        }
    }

    /// Variant of this form.
    pub const fn kind(&self) -> FormKind {
        match self {
            Self::Standard(_) => FormKind::Standard,
            Self::Regulatory(_) => FormKind::Regulatory,
        }
    }

    /// Initial values for editing `area`, with its geometry in `output_srid`.
    pub fn initial(area: &SensitiveArea, output_srid: Srid) -> Result<FormData, GeoJsonError> {
        let geometry = area.geometry.reproject(area.srid, output_srid);
        let mut data = FormData::new()
            .with("geom", encode_geometry(&geometry, output_srid)?)
            .with("description", area.description.as_str())
            .with("contact", area.contact.as_str());
        if area.published {
            data.insert("published", "on");
        }
        let species = &area.species;
        match FormKind::for_species(species) {
            FormKind::Standard => data.insert("species", species.id.to_string()),
            FormKind::Regulatory => {
                data.insert("name", species.name.as_str());
                data.insert("practices", species.practice_names().join(","));
                for (month, on) in (1..).zip(species.period.months()) {
                    if on {
                        data.insert(period_field(month), "on");
                    }
                }
                if let Some(url) = &species.url {
                    data.insert("url", url.as_str());
                }
                if let Some(radius) = species.radius {
                    data.insert("radius", radius.to_string());
                }
            }
        }
        Ok(data)
    }

    /// Persist the form.
    ///
    /// Creates a new area owned by `structure` when `existing` is `None`,
    /// otherwise updates `existing` in place. Regulatory forms create or
    /// update the area's dedicated regulatory species first.
    pub fn save<S>(
        self,
        store: &mut S,
        existing: Option<&SensitiveArea>,
        structure: u64,
    ) -> Result<SensitiveArea, StoreError>
    where
        S: AreaStoreMut + ?Sized,
    {
        let (species, common) = match self {
            Self::Standard(form) => (form.species, form.common),
            Self::Regulatory(form) => {
                let previous = existing
                    .map(|area| &area.species)
                    .filter(|species| species.is_regulatory());
                let species = save_regulatory_species(store, &form, previous)?;
                (species, form.common)
            }
        };
        let srid = store.srid();
        match existing {
            Some(area) => {
                let mut updated = area.clone();
                updated.species = species;
                updated.geometry = common.geometry;
                updated.srid = srid;
                updated.published = common.published;
                updated.description = common.description;
                updated.contact = common.contact;
                store.update_area(&updated)?;
                Ok(updated)
            }
            None => {
                let mut area = SensitiveArea::new(0, species, common.geometry, srid, structure)
                    .with_published(common.published);
                area.description = common.description;
                area.contact = common.contact;
                store.insert_area(area)
            }
        }
    }
}

fn save_regulatory_species<S>(
    store: &mut S,
    form: &RegulatoryForm,
    previous: Option<&Species>,
) -> Result<Species, StoreError>
where
    S: AreaStoreMut + ?Sized,
{
    let mut species = Species::new(0, form.name.as_str(), SpeciesCategory::Regulatory)
        .with_practices(
            form.practices
                .iter()
                .map(|name| Practice::new(0, name.as_str())),
        );
    species.period = form.period;
    species.url.clone_from(&form.url);
    species.radius = form.radius;
    match previous {
        Some(previous) => {
            species.id = previous.id;
            store.update_species(&species)?;
            store.species(species.id)?.ok_or(StoreError::NotFound {
                kind: "species",
                id: species.id,
            })
        }
        None => store.insert_species(species),
    }
}

/// Absolute `http` or `https` URL with a host.
fn is_web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

fn period_field(month: u8) -> String {
    format!("period{month:02}")
}

fn validate_common(
    data: &FormData,
    errors: &mut FormErrors,
    input_srid: Srid,
    store_srid: Srid,
    radius: u32,
) -> Option<CommonFields> {
    let geometry = match data.get("geom") {
        None => {
            errors.add("geom", REQUIRED);
            None
        }
        Some(raw) => match decode_geometry(raw) {
            Ok(submitted) => Some(area_geometry(submitted, input_srid, store_srid, radius)),
            Err(err) => {
                errors.add("geom", err.to_string());
                None
            }
        },
    };
    geometry.map(|geometry| CommonFields {
        geometry,
        published: data.flag("published"),
        description: data.get("description").unwrap_or_default().to_owned(),
        contact: data.get("contact").unwrap_or_default().to_owned(),
    })
}

fn area_geometry(
    submitted: SubmittedGeometry,
    input_srid: Srid,
    store_srid: Srid,
    radius: u32,
) -> AreaGeometry {
    match submitted {
        SubmittedGeometry::Polygons(polygons) => AreaGeometry::Polygon {
            polygons: input_srid.transform(store_srid, &polygons),
        },
        SubmittedGeometry::Point(centre) => AreaGeometry::BufferedPoint {
            centre: input_srid.transform(store_srid, &centre),
            radius: f64::from(radius),
        },
    }
}

fn validate_standard<S>(
    data: &FormData,
    store: &S,
    input_srid: Srid,
) -> Result<StandardForm, FormErrors>
where
    S: AreaStore + ?Sized,
{
    let mut errors = FormErrors::default();
    let species = match data.get("species") {
        None => {
            errors.add("species", REQUIRED);
            None
        }
        Some(raw) => {
            let found = match raw.parse::<u64>() {
                Ok(id) => store.species(id).map_err(|err| {
                    errors.add("species", err.to_string());
                }),
                Err(_) => Ok(None),
            };
            match found {
                Ok(Some(species)) if !species.is_regulatory() => Some(species),
                Ok(_) => {
                    errors.add("species", INVALID_CHOICE);
                    None
                }
                Err(()) => None,
            }
        }
    };
    let radius = species
        .as_ref()
        .and_then(|species| species.radius)
        .unwrap_or(DEFAULT_BUFFER_RADIUS);
    let common = validate_common(data, &mut errors, input_srid, store.srid(), radius);
    errors.into_result(|| Some(StandardForm { species: species?, common: common? }))
}

fn validate_regulatory(
    data: &FormData,
    store_srid: Srid,
    input_srid: Srid,
) -> Result<RegulatoryForm, FormErrors> {
    let mut errors = FormErrors::default();
    let name = data.get("name").map(str::to_owned);
    if name.is_none() {
        errors.add("name", REQUIRED);
    }

    let practices: BTreeSet<String> = data
        .get("practices")
        .into_iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();
    if practices.is_empty() {
        errors.add("practices", REQUIRED);
    }

    let mut months = [false; 12];
    for (month, slot) in (1..).zip(months.iter_mut()) {
        *slot = data.flag(&period_field(month));
    }

    let url = data.get("url").map(str::to_owned);
    if url.as_deref().is_some_and(|url| !is_web_url(url)) {
        errors.add("url", INVALID_URL);
    }

    let radius = match data.get("radius").map(str::parse::<u32>) {
        None => None,
        Some(Ok(radius)) if radius > 0 => Some(radius),
        Some(_) => {
            errors.add("radius", INVALID_RADIUS);
            None
        }
    };

    let common = validate_common(
        data,
        &mut errors,
        input_srid,
        store_srid,
        radius.unwrap_or(DEFAULT_BUFFER_RADIUS),
    );
    errors.into_result(|| {
        Some(RegulatoryForm {
            name: name?,
            practices,
            period: Period::from_months(months),
            url,
            radius,
            common: common?,
        })
    })
}
