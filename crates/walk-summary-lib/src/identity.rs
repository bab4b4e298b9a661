//! Content identifiers for compiled walks

use crate::{Result, WalkError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters kept from the digest (24 bits)
pub const WALK_ID_LEN: usize = 6;

/// Short identifier derived from a walk's full route geometry
///
/// The id is the first 6 hex characters of the SHA-1 digest of the JSON string literal of the
/// unsimplified encoded polyline. It therefore only changes when the geometry changes, not
/// when simplification or elevation sampling settings do.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalkId(String);

impl WalkId {
    /// Derive the id from the full, unsimplified encoded polyline
    pub fn from_geometry(full_polyline: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(json_string_literal(full_polyline).as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(WALK_ID_LEN);
        for byte in digest.iter().take(WALK_ID_LEN.div_ceil(2)) {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex.truncate(WALK_ID_LEN);
        Self(hex)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem shared by the normalized track and the summary record
    pub fn file_stem(&self) -> String {
        format!("route_{}", self.0)
    }

    /// Parse an id out of an artifact file name such as `route_1a2b3c.json`
    pub fn from_file_name(file_name: &str, extension: &str) -> Option<Self> {
        file_name
            .strip_prefix("route_")?
            .strip_suffix(extension)?
            .strip_suffix('.')?
            .parse()
            .ok()
    }
}

/// JSON encoding of a string, quotes included
fn json_string_literal(value: &str) -> String {
    // Serializing a &str cannot fail
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

impl FromStr for WalkId {
    type Err = WalkError;

    fn from_str(s: &str) -> Result<Self> {
        let valid = s.len() == WALK_ID_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(WalkError::InvalidWalkId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for WalkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for WalkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WalkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_short_lowercase_hex() {
        let id = WalkId::from_geometry("_p~iF~ps|U_ulLnnqC_mqNvxq`@");
        assert_eq!(id.as_str().len(), WALK_ID_LEN);
        assert!(id.as_str().parse::<WalkId>().is_ok());
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = WalkId::from_geometry("_p~iF~ps|U");
        let b = WalkId::from_geometry("_p~iF~ps|U");
        let c = WalkId::from_geometry("_p~iF~ps|V");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_digest_covers_json_literal() {
        let digest = Sha1::digest(b"\"\"");
        let expected: String = digest[..3].iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(WalkId::from_geometry("").as_str(), expected);
    }

    #[test]
    fn test_backslashes_are_escaped() {
        assert_eq!(json_string_literal(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!("abc".parse::<WalkId>().is_err());
        assert!("ABCDEF".parse::<WalkId>().is_err());
        assert!("12345g".parse::<WalkId>().is_err());
        assert!("0a1b2c".parse::<WalkId>().is_ok());
    }

    #[test]
    fn test_file_names() {
        let id: WalkId = "0a1b2c".parse().unwrap();
        assert_eq!(id.file_stem(), "route_0a1b2c");
        assert_eq!(WalkId::from_file_name("route_0a1b2c.json", "json"), Some(id));
        assert_eq!(WalkId::from_file_name("route_0a1b2c.gpx", "json"), None);
        assert_eq!(WalkId::from_file_name("walk_0a1b2c.json", "json"), None);
        assert_eq!(WalkId::from_file_name("route_0a1b2c.json.tmp", "json"), None);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: WalkId = "0a1b2c".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0a1b2c\"");
        assert!(serde_json::from_str::<WalkId>("\"nothex\"").is_err());
    }
}
