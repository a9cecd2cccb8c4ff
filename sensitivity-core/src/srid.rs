//! Spatial reference systems and coordinate reprojection.
//!
//! Only the reference systems the application deals with are supported.
//! Parsing an EPSG code is the single fallible step: once a [`Srid`] exists,
//! every reprojection between supported systems is total.
//!
//! # Examples
//! ```
//! use geo::Coord;
//! use sensitivity_core::Srid;
//!
//! let origin = Coord { x: 3.0, y: 46.5 };
//! let projected = Srid::Wgs84.transform_coord(Srid::Lambert93, origin);
//! assert!((projected.x - 700_000.0).abs() < 1e-3);
//! assert!((projected.y - 6_600_000.0).abs() < 1e-3);
//! ```

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::sync::LazyLock;

use geo::{Coord, MapCoords};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semi-major axis shared by WGS84 and GRS80, in metres.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// GRS80 inverse flattening (the difference with WGS84 is sub-millimetric).
const INVERSE_FLATTENING: f64 = 298.257_222_101;
/// Web Mercator latitude limit in degrees.
const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Iterations of the Lambert inverse latitude series.
const LAMBERT_MAX_ITERATIONS: usize = 16;
const LAMBERT_TOLERANCE: f64 = 1e-12;

/// Supported spatial reference systems, identified by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub enum Srid {
    /// EPSG:4326, longitude/latitude in degrees.
    Wgs84,
    /// EPSG:3857, spherical Web Mercator in metres.
    WebMercator,
    /// EPSG:2154, RGF93 / Lambert-93 in metres.
    Lambert93,
}

/// Error returned for EPSG codes without a known projection.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unsupported spatial reference system EPSG:{0}")]
pub struct SridError(pub u32);

impl Srid {
    /// Resolve an EPSG code.
    pub const fn from_code(code: u32) -> Result<Self, SridError> {
        match code {
            4326 => Ok(Self::Wgs84),
            3857 => Ok(Self::WebMercator),
            2154 => Ok(Self::Lambert93),
            other => Err(SridError(other)),
        }
    }

    /// EPSG code.
    pub const fn code(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
            Self::Lambert93 => 2154,
        }
    }

    /// Reproject a single coordinate from `self` into `target`.
    pub fn transform_coord(self, target: Self, coord: Coord<f64>) -> Coord<f64> {
        if self == target {
            return coord;
        }
        target.from_wgs84(self.to_wgs84(coord))
    }

    /// Reproject any geometry from `self` into `target`.
    pub fn transform<G>(self, target: Self, geometry: &G) -> G
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.map_coords(|coord| self.transform_coord(target, coord))
    }

    fn to_wgs84(self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Wgs84 => coord,
            Self::WebMercator => mercator_inverse(coord),
            Self::Lambert93 => LAMBERT_93.inverse(coord),
        }
    }

    fn from_wgs84(self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Wgs84 => coord,
            Self::WebMercator => mercator_forward(coord),
            Self::Lambert93 => LAMBERT_93.forward(coord),
        }
    }
}

impl TryFrom<u32> for Srid {
    type Error = SridError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<Srid> for u32 {
    fn from(srid: Srid) -> Self {
        srid.code()
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.code())
    }
}

fn mercator_forward(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MERCATOR_MAX_LATITUDE, MERCATOR_MAX_LATITUDE);
    Coord {
        x: SEMI_MAJOR_AXIS * coord.x.to_radians(),
        y: SEMI_MAJOR_AXIS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
    }
}

fn mercator_inverse(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / SEMI_MAJOR_AXIS).to_degrees(),
        y: (2.0 * (coord.y / SEMI_MAJOR_AXIS).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

static LAMBERT_93: LazyLock<LambertConicConformal> = LazyLock::new(|| {
    LambertConicConformal::new(LambertParameters {
        standard_parallel_1: 49.0,
        standard_parallel_2: 44.0,
        latitude_of_origin: 46.5,
        central_meridian: 3.0,
        false_easting: 700_000.0,
        false_northing: 6_600_000.0,
    })
});

struct LambertParameters {
    standard_parallel_1: f64,
    standard_parallel_2: f64,
    latitude_of_origin: f64,
    central_meridian: f64,
    false_easting: f64,
    false_northing: f64,
}

/// Lambert conformal conic projection with two standard parallels on the
/// GRS80 ellipsoid.
struct LambertConicConformal {
    eccentricity: f64,
    n: f64,
    scaled_f: f64,
    rho_origin: f64,
    central_meridian: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertConicConformal {
    fn new(params: LambertParameters) -> Self {
        let flattening = 1.0 / INVERSE_FLATTENING;
        let eccentricity = (2.0 * flattening - flattening * flattening).sqrt();
        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        let phi0 = params.latitude_of_origin.to_radians();

        let m1 = Self::m(eccentricity, phi1);
        let m2 = Self::m(eccentricity, phi2);
        let t0 = Self::t(eccentricity, phi0);
        let t1 = Self::t(eccentricity, phi1);
        let t2 = Self::t(eccentricity, phi2);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let f = m1 / (n * t1.powf(n));
        let scaled_f = SEMI_MAJOR_AXIS * f;

        Self {
            eccentricity,
            n,
            scaled_f,
            rho_origin: scaled_f * t0.powf(n),
            central_meridian: params.central_meridian.to_radians(),
            false_easting: params.false_easting,
            false_northing: params.false_northing,
        }
    }

    fn m(e: f64, phi: f64) -> f64 {
        let sin = phi.sin();
        phi.cos() / (1.0 - e * e * sin * sin).sqrt()
    }

    fn t(e: f64, phi: f64) -> f64 {
        let sin = phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * sin) / (1.0 + e * sin)).powf(e / 2.0)
    }

    fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        let phi = coord.y.to_radians();
        let lambda = coord.x.to_radians();
        let rho = self.scaled_f * Self::t(self.eccentricity, phi).powf(self.n);
        let theta = self.n * (lambda - self.central_meridian);
        Coord {
            x: self.false_easting + rho * theta.sin(),
            y: self.false_northing + self.rho_origin - rho * theta.cos(),
        }
    }

    fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        let dx = coord.x - self.false_easting;
        let dy = self.rho_origin - (coord.y - self.false_northing);
        let rho = self.n.signum() * dx.hypot(dy);
        let t = (rho / self.scaled_f).powf(1.0 / self.n);
        let theta = if self.n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };
        let lambda = theta / self.n + self.central_meridian;

        let e = self.eccentricity;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..LAMBERT_MAX_ITERATIONS {
            let sin = phi.sin();
            let next =
                FRAC_PI_2 - 2.0 * (t * ((1.0 - e * sin) / (1.0 + e * sin)).powf(e / 2.0)).atan();
            let converged = (next - phi).abs() < LAMBERT_TOLERANCE;
            phi = next;
            if converged {
                break;
            }
        }

        Coord {
            x: lambda.to_degrees(),
            y: phi.to_degrees(),
        }
    }
}
