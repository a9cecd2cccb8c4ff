//! Presentation views over sensitive areas.
//!
//! Every view requires an authenticated actor holding the model permission
//! it maps to. Update and delete additionally go through the same-structure
//! guard, which sends the caller back to the detail view instead of failing.

use std::fmt;
use std::str::FromStr;

use geo::Rect;
use log::info;
use thiserror::Error;

use sensitivity_core::{
    Actor, AreaIndex, AreaQuery, AreaStore, AreaStoreMut, Permission, SensitiveArea, Srid, StoreError,
};

use crate::forms::{AreaForm, FormData, FormErrors, FormKind};
use crate::geojson::{
    FeatureCollection, GeoJsonError, api_properties, encode_csv, feature_collection,
    layer_properties,
};
use crate::guard::{ACCESS_DENIED, Decision, check_area};

/// Errors raised by the views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The actor lacks the model permission the view requires.
    #[error("permission {permission:?} required")]
    PermissionDenied {
        /// Missing permission.
        permission: Permission,
    },
    /// No existing area carries this identifier.
    #[error("sensitive area {id} not found")]
    NotFound {
        /// Requested identifier.
        id: u64,
    },
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Encoding an export failed.
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
    /// A geometry could not be written as GeoJSON.
    #[error(transparent)]
    GeoJson(#[from] GeoJsonError),
}

/// Named destinations views redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Area list.
    List,
    /// Detail of an area.
    Detail(u64),
}

/// What a mutating view asks the caller to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// Render the form of `kind` with `data`, and `errors` after a failed
    /// submission.
    Form {
        /// Form variant to render.
        kind: FormKind,
        /// Initial or submitted values.
        data: FormData,
        /// Validation errors of a rejected submission.
        errors: Option<FormErrors>,
    },
    /// Ask for confirmation before deleting `id`.
    ConfirmDelete {
        /// Area awaiting confirmation.
        id: u64,
    },
    /// Redirect, optionally flashing `message`.
    Redirect {
        /// Destination view.
        to: Route,
        /// Flash message shown after the redirect.
        message: Option<&'static str>,
    },
}

impl ViewOutcome {
    const fn redirect(to: Route) -> Self {
        Self::Redirect { to, message: None }
    }

    const fn access_denied(id: u64) -> Self {
        Self::Redirect {
            to: Route::Detail(id),
            message: Some(ACCESS_DENIED),
        }
    }
}

/// Optional filters of the list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFilter {
    /// Keep areas protecting this species.
    pub species: Option<u64>,
    /// Keep areas owned by this structure.
    pub structure: Option<u64>,
}

impl ListFilter {
    fn matches(self, area: &SensitiveArea) -> bool {
        self.species.is_none_or(|id| area.species.id == id)
            && self.structure.is_none_or(|id| area.structure == id)
    }
}

/// One row of the list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRow {
    /// Area identifier.
    pub id: u64,
    /// Species name.
    pub species: String,
}

/// Detail view payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaDetail {
    /// Displayed area.
    pub area: SensitiveArea,
    /// Whether the actor may update or delete the area.
    pub can_edit: bool,
}

/// Export formats of the format list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated `id,species` rows.
    Csv,
    /// Feature collection with the public API properties.
    GeoJson,
}

/// Error returned for an unknown export format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown export format {0:?}")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "geojson" | "json" => Ok(Self::GeoJson),
            _ => Err(UnknownFormat(raw.to_owned())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl ExportFormat {
    /// MIME type of the encoded body.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::GeoJson => "application/geo+json",
        }
    }

    /// File name extension.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::GeoJson => "geojson",
        }
    }
}

/// Encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Encoding of `body`.
    pub format: ExportFormat,
    /// Encoded list.
    pub body: String,
}

fn require(actor: &Actor, permission: Permission) -> Result<(), ViewError> {
    if actor.has_permission(permission) {
        Ok(())
    } else {
        Err(ViewError::PermissionDenied { permission })
    }
}

fn existing_area<S>(store: &S, id: u64) -> Result<SensitiveArea, ViewError>
where
    S: AreaStore + ?Sized,
{
    store
        .area(id)?
        .filter(SensitiveArea::is_existing)
        .ok_or(ViewError::NotFound { id })
}

fn listed<S>(store: &S, filter: ListFilter) -> Result<Vec<SensitiveArea>, ViewError>
where
    S: AreaStore + ?Sized,
{
    let mut areas = store.select(&AreaQuery::existing())?;
    areas.retain(|area| filter.matches(area));
    Ok(areas)
}

/// Map layer: existing areas in `api_srid`, optionally within `bbox`.
///
/// `bbox` is expressed in `api_srid`. Features carry only the species name
/// and the publication flag.
pub fn layer<S>(
    store: &S,
    actor: &Actor,
    api_srid: Srid,
    bbox: Option<&Rect<f64>>,
) -> Result<FeatureCollection, ViewError>
where
    S: AreaStore + ?Sized,
{
    require(actor, Permission::Read)?;
    let areas = match bbox {
        Some(bbox) => {
            let index = AreaIndex::new(store.select(&AreaQuery::existing())?, api_srid);
            AreaQuery::existing()
                .transform(api_srid)
                .finish(index.within_bbox(bbox))
        }
        None => store.select(&AreaQuery::existing().transform(api_srid))?,
    };
    Ok(feature_collection(&areas, layer_properties)?)
}

/// List view rows `{id, species}`.
pub fn list<S>(store: &S, actor: &Actor, filter: ListFilter) -> Result<Vec<AreaRow>, ViewError>
where
    S: AreaStore + ?Sized,
{
    require(actor, Permission::Read)?;
    Ok(listed(store, filter)?
        .into_iter()
        .map(|area| AreaRow {
            id: area.id,
            species: area.species.name,
        })
        .collect())
}

/// The list view exported as CSV or GeoJSON.
pub fn format_list<S>(
    store: &S,
    actor: &Actor,
    filter: ListFilter,
    format: ExportFormat,
    api_srid: Srid,
) -> Result<Export, ViewError>
where
    S: AreaStore + ?Sized,
{
    require(actor, Permission::Read)?;
    let areas = listed(store, filter)?;
    let body = match format {
        ExportFormat::Csv => {
            let ids: Vec<String> = areas.iter().map(|area| area.id.to_string()).collect();
            encode_csv(
                &["id", "species"],
                ids.iter()
                    .zip(&areas)
                    .map(|(id, area)| vec![id.as_str(), area.species.name.as_str()]),
            )
        }
        ExportFormat::GeoJson => {
            let areas = AreaQuery::existing().transform(api_srid).finish(areas);
            serde_json::to_string(&feature_collection(&areas, api_properties)?)?
        }
    };
    Ok(Export { format, body })
}

/// Detail view with the `can_edit` flag.
pub fn detail<S>(store: &S, actor: &Actor, id: u64) -> Result<AreaDetail, ViewError>
where
    S: AreaStore + ?Sized,
{
    require(actor, Permission::Read)?;
    let area = existing_area(store, id)?;
    let can_edit = actor.same_structure(area.structure);
    Ok(AreaDetail { area, can_edit })
}

/// Create view.
///
/// `category` is the raw query parameter selecting the form variant. Without
/// a submission the empty form is returned; a valid submission creates an
/// area owned by the actor's structure and redirects to its detail.
pub fn create<S>(
    store: &mut S,
    actor: &Actor,
    category: Option<&str>,
    submission: Option<&FormData>,
    api_srid: Srid,
) -> Result<ViewOutcome, ViewError>
where
    S: AreaStoreMut + ?Sized,
{
    require(actor, Permission::Add)?;
    let kind = FormKind::for_create(category);
    let Some(data) = submission else {
        return Ok(ViewOutcome::Form {
            kind,
            data: FormData::new(),
            errors: None,
        });
    };
    let form = match AreaForm::validate(kind, data, &*store, api_srid) {
        Ok(form) => form,
        Err(errors) => {
            return Ok(ViewOutcome::Form {
                kind,
                data: data.clone(),
                errors: Some(errors),
            });
        }
    };
    let structure = actor
        .user()
        .map(|user| user.structure)
        .ok_or(ViewError::PermissionDenied {
            permission: Permission::Add,
        })?;
    let area = form.save(store, None, structure)?;
    info!("created sensitive area {} ({:?} form)", area.id, kind);
    Ok(ViewOutcome::redirect(Route::Detail(area.id)))
}

/// Update view.
///
/// The form variant follows the existing area's species category; request
/// parameters play no part.
pub fn update<S>(
    store: &mut S,
    actor: &Actor,
    id: u64,
    submission: Option<&FormData>,
    api_srid: Srid,
) -> Result<ViewOutcome, ViewError>
where
    S: AreaStoreMut + ?Sized,
{
    require(actor, Permission::Change)?;
    let area = existing_area(&*store, id)?;
    if check_area(actor, &area) == Decision::Deny {
        return Ok(ViewOutcome::access_denied(id));
    }
    let kind = FormKind::for_species(&area.species);
    let Some(data) = submission else {
        return Ok(ViewOutcome::Form {
            kind,
            data: AreaForm::initial(&area, api_srid)?,
            errors: None,
        });
    };
    match AreaForm::validate(kind, data, &*store, api_srid) {
        Ok(form) => {
            form.save(store, Some(&area), area.structure)?;
            info!("updated sensitive area {id}");
            Ok(ViewOutcome::redirect(Route::Detail(id)))
        }
        Err(errors) => Ok(ViewOutcome::Form {
            kind,
            data: data.clone(),
            errors: Some(errors),
        }),
    }
}

/// Delete view; soft-deletes once `confirmed`.
pub fn delete<S>(
    store: &mut S,
    actor: &Actor,
    id: u64,
    confirmed: bool,
) -> Result<ViewOutcome, ViewError>
where
    S: AreaStoreMut + ?Sized,
{
    require(actor, Permission::Delete)?;
    let area = existing_area(&*store, id)?;
    if check_area(actor, &area) == Decision::Deny {
        return Ok(ViewOutcome::access_denied(id));
    }
    if !confirmed {
        return Ok(ViewOutcome::ConfirmDelete { id });
    }
    store.delete_area(id)?;
    info!("deleted sensitive area {id}");
    Ok(ViewOutcome::redirect(Route::List))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use sensitivity_core::User;
    use sensitivity_core::test_support::{MemoryStore, regulatory_species, sample_species, square};

    const SQUARE: &str =
        r#"{"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}"#;

    fn ranger(structure: u64) -> Actor {
        User::new(1, "ranger", structure).with_all_permissions().into()
    }

    #[fixture]
    fn store() -> MemoryStore {
        let mut deleted = SensitiveArea::new(3, sample_species(1, &[]), square(40.0, 0.0, 10.0), Srid::Lambert93, 1);
        deleted.soft_delete();
        MemoryStore::new(Srid::Lambert93).with_areas([
            SensitiveArea::new(1, sample_species(1, &[]), square(0.0, 0.0, 10.0), Srid::Lambert93, 1)
                .with_published(true),
            SensitiveArea::new(2, regulatory_species(2, &["Hiking"]), square(20.0, 0.0, 10.0), Srid::Lambert93, 2),
            deleted,
        ])
    }

    #[rstest]
    fn views_require_model_permissions(mut store: MemoryStore) {
        let bare: Actor = User::new(1, "bare", 1).into();
        assert!(matches!(
            list(&store, &Actor::Anonymous, ListFilter::default()),
            Err(ViewError::PermissionDenied { permission: Permission::Read })
        ));
        assert!(matches!(
            delete(&mut store, &bare, 1, true),
            Err(ViewError::PermissionDenied { permission: Permission::Delete })
        ));
    }

    #[rstest]
    fn list_hides_deleted_and_filters(store: MemoryStore) {
        let rows = list(&store, &ranger(1), ListFilter::default()).expect("list");
        assert_eq!(rows.iter().map(|row| row.id).collect::<Vec<_>>(), vec![1, 2]);
        let filtered = list(
            &store,
            &ranger(1),
            ListFilter { structure: Some(2), ..ListFilter::default() },
        )
        .expect("list");
        assert_eq!(filtered, vec![AreaRow { id: 2, species: "species-2".into() }]);
    }

    #[rstest]
    fn csv_export_has_id_and_species_columns(store: MemoryStore) {
        let export = format_list(&store, &ranger(1), ListFilter::default(), ExportFormat::Csv, Srid::Wgs84)
            .expect("export");
        assert_eq!(export.body, "id,species\r\n1,species-1\r\n2,species-2\r\n");
        assert_eq!(export.format.content_type(), "text/csv");
    }

    #[rstest]
    fn layer_keeps_two_properties_and_honours_bbox(store: MemoryStore) {
        let all = layer(&store, &ranger(1), Srid::Lambert93, None).expect("layer");
        assert_eq!(all.ids(), vec![1, 2]);
        let feature = all.features.first().expect("feature");
        assert_eq!(feature.properties.len(), 2);

        let bbox = Rect::new(Coord { x: 15.0, y: 0.0 }, Coord { x: 25.0, y: 5.0 });
        let clipped = layer(&store, &ranger(1), Srid::Lambert93, Some(&bbox)).expect("layer");
        assert_eq!(clipped.ids(), vec![2]);
    }

    #[rstest]
    #[case(1, true)]
    #[case(2, false)]
    fn detail_reports_can_edit(store: MemoryStore, #[case] structure: u64, #[case] can_edit: bool) {
        let detail = detail(&store, &ranger(structure), 1).expect("detail");
        assert_eq!(detail.can_edit, can_edit);
    }

    #[rstest]
    fn deleted_area_has_no_detail(store: MemoryStore) {
        assert!(matches!(
            detail(&store, &ranger(1), 3),
            Err(ViewError::NotFound { id: 3 })
        ));
    }

    #[rstest]
    fn create_redirects_to_new_detail(mut store: MemoryStore) {
        let data = FormData::new().with("species", "1").with("geom", SQUARE);
        let outcome = create(&mut store, &ranger(5), None, Some(&data), Srid::Lambert93).expect("create");
        let ViewOutcome::Redirect { to: Route::Detail(id), message: None } = outcome else {
            panic!("expected a redirect to the detail view, got {outcome:?}");
        };
        let created = store.area(id).expect("lookup").expect("area exists");
        assert_eq!(created.structure, 5);
    }

    #[rstest]
    fn update_uses_the_existing_category(mut store: MemoryStore) {
        let outcome = update(&mut store, &ranger(2), 2, None, Srid::Lambert93).expect("update");
        let ViewOutcome::Form { kind, data, errors } = outcome else {
            panic!("expected the form, got {outcome:?}");
        };
        assert_eq!(kind, FormKind::Regulatory);
        assert_eq!(data.get("practices"), Some("Hiking"));
        assert!(errors.is_none());
    }

    #[rstest]
    fn guard_redirects_other_structures_to_detail(mut store: MemoryStore) {
        let data = FormData::new().with("species", "1").with("geom", SQUARE);
        let outcome = update(&mut store, &ranger(9), 1, Some(&data), Srid::Lambert93).expect("update");
        assert_eq!(outcome, ViewOutcome::access_denied(1));
        let outcome = delete(&mut store, &ranger(9), 1, true).expect("delete");
        assert_eq!(outcome, ViewOutcome::access_denied(1));
        assert!(store.area(1).expect("lookup").is_some_and(|area| area.is_existing()));
    }

    #[rstest]
    fn delete_asks_for_confirmation_then_soft_deletes(mut store: MemoryStore) {
        assert_eq!(
            delete(&mut store, &ranger(1), 1, false).expect("delete"),
            ViewOutcome::ConfirmDelete { id: 1 }
        );
        assert_eq!(
            delete(&mut store, &ranger(1), 1, true).expect("delete"),
            ViewOutcome::redirect(Route::List)
        );
        let stored = store.area(1).expect("lookup").expect("still stored");
        assert!(!stored.is_existing());
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("GeoJSON", ExportFormat::GeoJson)]
    fn export_formats_parse(#[case] raw: &str, #[case] expected: ExportFormat) {
        assert_eq!(raw.parse::<ExportFormat>(), Ok(expected));
    }
}
