//! Geolocation: coordinates, the location token sent with each search, and
//! resolution of the coordinate a harvest runs from.

use std::collections::HashMap;
use std::f64::consts::PI;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::Location;
use crate::{Result, SearchError};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Accuracy radius written into the location token.
const UULE_RADIUS: i64 = 65_000;

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Point reached by travelling `distance` meters along `bearing` radians.
    fn destination(&self, distance: f64, bearing: f64) -> Coordinate {
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();
        let delta = distance / EARTH_RADIUS_M;

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
        let lng2 = lng1
            + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        // normalize to [-180, 180)
        let lng2 = (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
        Coordinate::new(lat2.to_degrees(), lng2)
    }
}

/// Encodes a coordinate as the `UULE` location token.
///
/// The token is `a+` followed by the base64 of a text location descriptor.
/// It carries no timestamp, so equal coordinates give equal tokens.
pub fn encode_uule(coordinate: &Coordinate) -> String {
    let lat_e7 = (coordinate.lat * 1e7).round() as i64;
    let lng_e7 = (coordinate.lng * 1e7).round() as i64;
    let descriptor = format!(
        "role: CURRENT_LOCATION\nproducer: DEVICE_LOCATION\nradius: {}\nlatlng <\n  latitude_e7: {}\n  longitude_e7: {}\n>",
        UULE_RADIUS, lat_e7, lng_e7
    );
    format!("a+{}", STANDARD.encode(descriptor))
}

/// Draws a point uniformly distributed over the ring between `min_distance`
/// and `max_distance` meters around `center`.
pub fn random_annulus_point<R: Rng>(
    center: &Coordinate,
    min_distance: f64,
    max_distance: f64,
    rng: &mut R,
) -> Result<Coordinate> {
    check_distances(min_distance, max_distance)?;

    let u: f64 = rng.random();
    let distance =
        (u * (max_distance.powi(2) - min_distance.powi(2)) + min_distance.powi(2)).sqrt();
    let bearing = rng.random::<f64>() * 2.0 * PI;

    Ok(center.destination(distance, bearing))
}

/// Distances must be finite, non-negative and ordered.
fn check_distances(min_distance: f64, max_distance: f64) -> Result<()> {
    for distance in [min_distance, max_distance] {
        if !distance.is_finite() || distance < 0.0 {
            return Err(SearchError::Configuration(format!(
                "distances must be finite and non-negative (min {}, max {})",
                min_distance, max_distance
            )));
        }
    }
    if min_distance > max_distance {
        return Err(SearchError::Configuration(format!(
            "min distance {} exceeds max distance {}",
            min_distance, max_distance
        )));
    }
    Ok(())
}

fn sample_ring(center: &Coordinate, min_distance: f64, max_distance: f64) -> Result<Coordinate> {
    let mut rng = rand::rng();
    random_annulus_point(center, min_distance, max_distance, &mut rng)
}

/// Options passed to a geotarget lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeotargetOptions {
    /// Ask for a random point inside the target instead of its center only.
    pub random_coordinates: bool,
}

/// A named location as returned by a [`GeoDataset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geotarget {
    pub name: Option<String>,
    pub center: Option<Coordinate>,
    pub random_coordinates: Option<Coordinate>,
}

/// External capability resolving location names to coordinates.
#[async_trait]
pub trait GeoDataset: Send + Sync {
    /// Looks up a location by name.
    async fn get_geotarget(&self, location: &str, options: &GeotargetOptions) -> Result<Geotarget>;
}

/// Entry of a [`StaticGeoDataset`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeotargetArea {
    pub center: Coordinate,
    /// Radius in meters that random coordinates are drawn from.
    #[serde(default)]
    pub radius: f64,
}

/// In-memory geotarget table keyed by case-insensitive location name.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoDataset {
    areas: HashMap<String, GeotargetArea>,
}

impl StaticGeoDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a location.
    pub fn with_area(mut self, name: &str, center: Coordinate, radius: f64) -> Self {
        self.areas
            .insert(name.to_lowercase(), GeotargetArea { center, radius });
        self
    }

    /// Loads a table of the form `{"Berlin": {"center": {"lat": .., "lng": ..}, "radius": 5000}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let areas: HashMap<String, GeotargetArea> = serde_json::from_str(json)
            .map_err(|e| SearchError::Parse(format!("invalid geotarget table: {}", e)))?;
        Ok(Self {
            areas: areas
                .into_iter()
                .map(|(name, area)| (name.to_lowercase(), area))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

#[async_trait]
impl GeoDataset for StaticGeoDataset {
    async fn get_geotarget(&self, location: &str, options: &GeotargetOptions) -> Result<Geotarget> {
        let Some(area) = self.areas.get(&location.to_lowercase()) else {
            return Ok(Geotarget::default());
        };

        let random_coordinates = if options.random_coordinates {
            Some(sample_ring(&area.center, 0.0, area.radius.max(0.0))?)
        } else {
            None
        };

        Ok(Geotarget {
            name: Some(location.to_string()),
            center: Some(area.center),
            random_coordinates,
        })
    }
}

/// Resolves the coordinate a harvest runs from.
///
/// Named locations go through `dataset`; explicit coordinates are used as
/// given, or displaced into the `[min_distance, max_distance]` ring when a
/// positive max distance is set. Unset distances count as zero, and invalid
/// ones are rejected even when no displacement happens.
pub async fn resolve_coordinate(
    location: &Location,
    min_distance: Option<f64>,
    max_distance: Option<f64>,
    dataset: Option<&dyn GeoDataset>,
) -> Result<Coordinate> {
    match location {
        Location::Named(name) => {
            let dataset = dataset.ok_or_else(|| {
                SearchError::Configuration(format!(
                    "no geo dataset configured to resolve location '{}'",
                    name
                ))
            })?;
            let options = GeotargetOptions {
                random_coordinates: true,
            };
            let geotarget = dataset.get_geotarget(name, &options).await?;
            let coordinate = geotarget.random_coordinates.ok_or_else(|| {
                SearchError::Configuration(format!(
                    "Unable to get random coordinates for location '{}'",
                    name
                ))
            })?;
            debug!("Resolved location '{}' to {:?}", name, coordinate);
            Ok(coordinate)
        }
        Location::Coordinate(center) => {
            let min = min_distance.unwrap_or(0.0);
            let max = max_distance.unwrap_or(0.0);
            check_distances(min, max)?;
            if max > 0.0 {
                sample_ring(center, min, max)
            } else {
                Ok(*center)
            }
        }
    }
}
