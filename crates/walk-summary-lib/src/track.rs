//! Track storage and GPX normalization
//!
//! This module provides the `Track` struct, a flat, ordered list of validated points built by
//! merging every segment of every track and route in a GPX file, and `WalkMetadata`, the
//! descriptive fields carried over into the summary.

use crate::{Result, WalkError, polyline};
use std::collections::BTreeSet;

/// Earth's mean radius in meters
const EARTH_RADIUS_M: f64 = 6371000.0;

/// Creator attribute written into normalized GPX files
const GPX_CREATOR: &str = "walk-summary-lib";

/// A single validated geographic point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
}

impl GeoPoint {
    /// Create a point without elevation
    ///
    /// Fails if the coordinate is not finite or outside WGS84 bounds.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(WalkError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
            elevation: None,
        })
    }

    /// Create a point carrying an elevation in meters
    pub fn with_elevation_m(latitude: f64, longitude: f64, elevation: f64) -> Result<Self> {
        Ok(Self::new(latitude, longitude)?.with_elevation(Some(elevation)))
    }

    /// Build a point from a GPX waypoint, ignoring any embedded elevation or timestamp
    pub fn from_waypoint(waypoint: &gpx::Waypoint) -> Result<Self> {
        let point = waypoint.point();
        Self::new(point.y(), point.x())
    }

    /// Return a copy of this point with the given elevation
    #[inline]
    pub fn with_elevation(self, elevation: Option<f64>) -> Self {
        Self {
            elevation: elevation.filter(|e| e.is_finite()),
            ..self
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[inline]
    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }

    /// Convert to a GPX waypoint (no timestamp)
    pub fn to_waypoint(&self) -> gpx::Waypoint {
        let mut waypoint = gpx::Waypoint::new(geo::Point::new(self.longitude, self.latitude));
        waypoint.elevation = self.elevation;
        waypoint
    }

    /// Calculate the Haversine distance to another point in meters
    #[inline]
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

/// Encode the horizontal coordinates of `points` as a `(lat, lon)` polyline
pub fn encode_points(points: &[GeoPoint]) -> String {
    let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.latitude, p.longitude]).collect();
    polyline::encode(&coords)
}

/// Sum of Haversine distances between consecutive points
pub fn path_length_m(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
}

/// Descriptive fields of a walk, taken from the GPX metadata block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Trimmed, deduplicated and lexicographically sorted keywords
    pub tags: Vec<String>,
}

impl WalkMetadata {
    /// Extract metadata from a parsed GPX document
    pub fn from_gpx(gpx: &gpx::Gpx) -> Self {
        let Some(metadata) = gpx.metadata.as_ref() else {
            return Self::default();
        };

        Self {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            author: metadata.author.as_ref().and_then(|a| a.name.clone()),
            tags: metadata
                .keywords
                .as_deref()
                .map(parse_tags)
                .unwrap_or_default(),
        }
    }

    /// Keywords string as written back to normalized files
    pub fn keywords(&self) -> Option<String> {
        (!self.tags.is_empty()).then(|| self.tags.join(", "))
    }
}

/// Split a comma-separated keyword string into a sorted set of trimmed tags
pub fn parse_tags(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// An ordered, non-empty sequence of points for one walk
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    points: Vec<GeoPoint>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Track {
    /// Create a track from points in traversal order
    ///
    /// # Returns
    /// The track, or `WalkError::EmptyTrack` if there are no points
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(WalkError::EmptyTrack);
        }
        Ok(Self { points })
    }

    /// Merge every track segment and then every route of a GPX document into one track
    ///
    /// Timestamps and embedded elevations are dropped; elevation is expected to be
    /// re-annotated from a consistent source afterwards.
    pub fn from_gpx(gpx: &gpx::Gpx) -> Result<Self> {
        let track_points = gpx
            .tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .flat_map(|s| s.points.iter());
        let route_points = gpx.routes.iter().flat_map(|r| r.points.iter());

        let points = track_points
            .chain(route_points)
            .map(GeoPoint::from_waypoint)
            .collect::<Result<Vec<_>>>()?;

        Self::new(points)
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false, tracks cannot be constructed empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total Haversine length in meters
    pub fn length_m(&self) -> f64 {
        path_length_m(&self.points)
    }

    /// Encoded polyline of the full, unsimplified geometry
    pub fn encoded_polyline(&self) -> String {
        encode_points(&self.points)
    }

    /// Replace per-point elevations, keeping the geometry
    ///
    /// `elevations` must have one entry per point.
    pub fn with_elevations(self, elevations: &[Option<f64>]) -> Self {
        debug_assert_eq!(elevations.len(), self.points.len());
        let points = self
            .points
            .into_iter()
            .zip(elevations.iter())
            .map(|(p, e)| p.with_elevation(*e))
            .collect();
        Self { points }
    }

    /// Build the normalized GPX 1.1 document: a single route, no tracks, no timestamps
    pub fn to_gpx(&self, metadata: &WalkMetadata) -> gpx::Gpx {
        let gpx_metadata = gpx::Metadata {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            author: metadata.author.as_ref().map(|name| gpx::Person {
                name: Some(name.clone()),
                ..Default::default()
            }),
            keywords: metadata.keywords(),
            ..Default::default()
        };

        let route = gpx::Route {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            points: self.points.iter().map(GeoPoint::to_waypoint).collect(),
            ..Default::default()
        };

        gpx::Gpx {
            version: gpx::GpxVersion::Gpx11,
            creator: Some(GPX_CREATOR.to_string()),
            metadata: Some(gpx_metadata),
            routes: vec![route],
            ..Default::default()
        }
    }
}
