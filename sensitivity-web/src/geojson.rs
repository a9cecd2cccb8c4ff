//! GeoJSON and CSV encodings of sensitive areas.
//!
//! Only the subset of GeoJSON the views exchange is supported: `Point`,
//! `Polygon` and `MultiPolygon` geometries, and features carrying a numeric
//! identifier.

use geo::{Geometry, MultiPolygon, Point, Polygon};
use geozero::error::GeozeroError;
use geozero::geojson::GeoJson;
use geozero::{ToGeo, ToJson};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use sensitivity_core::{AreaGeometry, SensitiveArea, Srid};

/// Positions a closed ring needs at minimum.
const MIN_RING_POSITIONS: usize = 4;

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    /// Identifier of the encoded record.
    pub id: u64,
    /// GeoJSON geometry object.
    pub geometry: Value,
    /// Feature properties.
    pub properties: Map<String, Value>,
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    /// Member features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Identifiers of the member features, in order.
    pub fn ids(&self) -> Vec<u64> {
        self.features.iter().map(|feature| feature.id).collect()
    }
}

/// Errors raised while converting geometries to or from GeoJSON.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// The payload is not a valid GeoJSON geometry.
    #[error("geometry is not valid GeoJSON: {0}")]
    Parse(#[source] GeozeroError),
    /// The geometry type is not accepted by the forms.
    #[error("unsupported geometry type {0:?}")]
    UnsupportedType(&'static str),
    /// A polygon has no exterior ring or too few vertices.
    #[error("polygon rings need at least four positions")]
    DegenerateRing,
    /// Writing a geometry as GeoJSON failed.
    #[error("failed to write geometry as GeoJSON: {0}")]
    Write(#[source] GeozeroError),
    /// The written GeoJSON could not be embedded in a feature.
    #[error("failed to embed geometry in a feature: {0}")]
    Embed(#[from] serde_json::Error),
}

/// Geometry submitted through a form, before buffering.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmittedGeometry {
    /// One or more polygons.
    Polygons(MultiPolygon<f64>),
    /// A single point, to be buffered.
    Point(Point<f64>),
}

/// Encode an area geometry expressed in `srid` as GeoJSON text.
///
/// Buffered points are emitted as their circular footprint.
pub fn encode_geometry(geometry: &AreaGeometry, srid: Srid) -> Result<String, GeoJsonError> {
    let mut footprint = geometry.footprint(srid);
    let geometry = if footprint.0.len() == 1 {
        Geometry::Polygon(footprint.0.remove(0))
    } else {
        Geometry::MultiPolygon(footprint)
    };
    geometry.to_json().map_err(GeoJsonError::Write)
}

fn geometry_value(geometry: &AreaGeometry, srid: Srid) -> Result<Value, GeoJsonError> {
    Ok(serde_json::from_str(&encode_geometry(geometry, srid)?)?)
}

/// Decode a GeoJSON geometry object.
///
/// Positions may carry an elevation, which is dropped.
pub fn decode_geometry(raw: &str) -> Result<SubmittedGeometry, GeoJsonError> {
    match GeoJson(raw).to_geo().map_err(GeoJsonError::Parse)? {
        Geometry::Point(point) => Ok(SubmittedGeometry::Point(point)),
        Geometry::Polygon(polygon) => {
            check_rings(&polygon)?;
            Ok(SubmittedGeometry::Polygons(MultiPolygon::new(vec![polygon])))
        }
        Geometry::MultiPolygon(polygons) => {
            if polygons.0.is_empty() {
                return Err(GeoJsonError::DegenerateRing);
            }
            polygons.iter().try_for_each(check_rings)?;
            Ok(SubmittedGeometry::Polygons(polygons))
        }
        other => Err(GeoJsonError::UnsupportedType(type_name(&other))),
    }
}

fn check_rings(polygon: &Polygon<f64>) -> Result<(), GeoJsonError> {
    let degenerate = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .any(|ring| ring.0.len() < MIN_RING_POSITIONS);
    if degenerate {
        Err(GeoJsonError::DegenerateRing)
    } else {
        Ok(())
    }
}

const fn type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) | Geometry::Triangle(_) => "Polygon",
    }
}

/// Properties exposed by the public API.
pub fn api_properties(area: &SensitiveArea) -> Map<String, Value> {
    let species = &area.species;
    let mut properties = Map::new();
    properties.insert("id".into(), json!(area.id));
    properties.insert("species".into(), json!(species.name));
    properties.insert("category".into(), json!(species.category.id()));
    properties.insert("practices".into(), json!(species.practice_names()));
    properties.insert("period".into(), json!(species.period.months()));
    properties.insert("url".into(), json!(species.url));
    properties.insert("radius".into(), json!(species.radius));
    properties.insert("description".into(), json!(area.description));
    properties.insert("contact".into(), json!(area.contact));
    properties.insert("published".into(), json!(area.published));
    properties
}

/// Properties carried by the map layer.
pub fn layer_properties(area: &SensitiveArea) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("species".into(), json!(area.species.name));
    properties.insert("published".into(), json!(area.published));
    properties
}

/// Encode areas as a feature collection using `properties` for each one.
pub fn feature_collection<'a, I, F>(areas: I, properties: F) -> Result<FeatureCollection, GeoJsonError>
where
    I: IntoIterator<Item = &'a SensitiveArea>,
    F: Fn(&SensitiveArea) -> Map<String, Value>,
{
    let features = areas
        .into_iter()
        .map(|area| {
            Ok(Feature {
                id: area.id,
                geometry: geometry_value(&area.geometry, area.srid)?,
                properties: properties(area),
            })
        })
        .collect::<Result<_, GeoJsonError>>()?;
    Ok(FeatureCollection { features })
}

/// Encode rows as CSV with a header line, quoting fields when needed.
pub fn encode_csv<'a, R>(header: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<&'a str>>,
{
    let mut out = String::new();
    push_record(&mut out, header.iter().copied());
    for row in rows {
        push_record(&mut out, row);
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (position, field) in fields.into_iter().enumerate() {
        if position > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}
