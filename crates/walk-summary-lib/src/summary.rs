//! The persisted per-walk summary record

use crate::{ElevationProfile, Result, WalkId, WalkMetadata};
use serde::{Deserialize, Serialize};

/// Compact summary of one walk, as served to map clients
///
/// Serialized as a flat JSON object with the fields in declaration order. Built once with
/// [`WalkSummary::new`] and read through accessors afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    id: WalkId,
    filename: String,
    name: Option<String>,
    description: Option<String>,
    author: Option<String>,
    tags: Vec<String>,
    /// Length of the route in meters
    length: u64,
    /// Total ascent of the route in meters
    ascent: u64,
    /// Encoded polyline of the simplified lat/long geometry
    polyline: String,
    /// Encoded polyline of scaled (distance, elevation) pairs
    ele: String,
}

impl WalkSummary {
    /// Assemble a summary from every computed part
    ///
    /// Length and ascent are rounded to whole meters here and nowhere earlier.
    pub fn new(
        id: WalkId,
        filename: String,
        metadata: WalkMetadata,
        length_m: f64,
        polyline: String,
        profile: &ElevationProfile,
    ) -> Self {
        Self {
            id,
            filename,
            name: metadata.name,
            description: metadata.description,
            author: metadata.author,
            tags: metadata.tags,
            length: round_meters(length_m),
            ascent: round_meters(profile.ascent_m),
            polyline,
            ele: profile.encoded.clone(),
        }
    }

    /// Compact JSON representation written to the summary record file
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a summary record
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[inline]
    pub fn id(&self) -> &WalkId {
        &self.id
    }

    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    #[inline]
    pub fn ascent(&self) -> u64 {
        self.ascent
    }

    #[inline]
    pub fn polyline(&self) -> &str {
        &self.polyline
    }

    #[inline]
    pub fn ele(&self) -> &str {
        &self.ele
    }
}

/// Round to whole non-negative meters
#[inline]
fn round_meters(value: f64) -> u64 {
    // `as` saturates, NaN becomes 0
    value.max(0.0).round() as u64
}
