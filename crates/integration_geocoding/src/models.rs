//! Geocoding result types and upstream response normalization
//!
//! Nominatim returns loosely typed JSON: coordinates and importance may be
//! strings or numbers, the city may be reported as `town` or `village`, and
//! blank strings stand in for missing fields. Everything is decoded into
//! raw wire structs and normalized here, so the rest of the crate only sees
//! [`GeoResult`] and [`ReverseResult`].

use domain::{AddressParts, BoundingBox, GeoLocation, format_address, format_short_address};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GeocodingError;

/// A forward geocoding match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Full human-readable name from the upstream
    pub display_name: String,
    /// Structured address
    pub address: AddressParts,
    /// OSM place type, e.g. "house" or "residential"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Relevance in [0, 1]
    pub importance: f64,
    /// Upstream place identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Extent of the matched place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl GeoResult {
    /// The matched coordinates
    ///
    /// Coordinates are validated during normalization.
    #[must_use]
    pub const fn location(&self) -> GeoLocation {
        GeoLocation::new_unchecked(self.lat, self.lng)
    }

    /// Address formatted for display
    #[must_use]
    pub fn formatted(&self) -> String {
        format_address(&self.address, Some(&self.display_name))
    }
}

/// A reverse geocoding result
///
/// Address components are flattened next to the echoed coordinates when
/// serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseResult {
    /// Full human-readable name from the upstream, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Structured address
    #[serde(flatten)]
    pub address: AddressParts,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl ReverseResult {
    /// Address formatted for display
    #[must_use]
    pub fn formatted(&self) -> String {
        format_address(&self.address, self.display_name.as_deref())
    }

    /// Street and city only
    #[must_use]
    pub fn formatted_short(&self) -> String {
        format_short_address(&self.address, self.display_name.as_deref())
    }
}

/// A number that the upstream may encode as a JSON string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|n| n.is_finite())
    }
}

/// Raw Nominatim place, shared by the search and reverse endpoints
#[derive(Debug, Deserialize)]
struct RawPlace {
    lat: Option<Numeric>,
    lon: Option<Numeric>,
    display_name: Option<String>,
    address: Option<RawAddress>,
    #[serde(rename = "type")]
    kind: Option<String>,
    importance: Option<Numeric>,
    place_id: Option<serde_json::Value>,
    boundingbox: Option<Vec<Numeric>>,
    error: Option<serde_json::Value>,
}

/// Raw Nominatim address details (`addressdetails=1`)
#[derive(Debug, Default, Deserialize)]
struct RawAddress {
    road: Option<String>,
    house_number: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postcode: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RawAddress> for AddressParts {
    fn from(raw: RawAddress) -> Self {
        Self {
            road: present(raw.road),
            house_number: present(raw.house_number),
            neighbourhood: present(raw.neighbourhood),
            suburb: present(raw.suburb),
            city: present(raw.city)
                .or_else(|| present(raw.town))
                .or_else(|| present(raw.village)),
            state: present(raw.state),
            country: present(raw.country),
            postal_code: present(raw.postcode),
        }
    }
}

fn place_id_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => present(Some(s)),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GeocodingError> {
    serde_json::from_str(body)
        .map_err(|e| GeocodingError::processing("invalid JSON from geocoding service", e))
}

fn normalize_search_item(raw: RawPlace) -> Result<GeoResult, GeocodingError> {
    let lat = raw.lat.as_ref().and_then(Numeric::value);
    let lng = raw.lon.as_ref().and_then(Numeric::value);
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(GeocodingError::processing(
            "search result without coordinates",
            format!("place {:?}", raw.display_name),
        ));
    };
    let location = GeoLocation::new(lat, lng)
        .map_err(|e| GeocodingError::processing("search result with invalid coordinates", e))?;

    let address = AddressParts::from(raw.address.unwrap_or_default());
    let display_name =
        present(raw.display_name).unwrap_or_else(|| format_address(&address, None));
    let importance = raw
        .importance
        .as_ref()
        .and_then(Numeric::value)
        .map_or(0.0, |i| i.clamp(0.0, 1.0));
    let bounding_box = raw.boundingbox.and_then(|values| {
        let values: Option<Vec<f64>> = values.iter().map(Numeric::value).collect();
        values.as_deref().and_then(BoundingBox::from_osm_slice)
    });

    Ok(GeoResult {
        lat: location.latitude(),
        lng: location.longitude(),
        display_name,
        address,
        kind: present(raw.kind),
        importance,
        place_id: raw.place_id.and_then(place_id_string),
        bounding_box,
    })
}

/// Decode a `/search` response body into results sorted by importance
///
/// Malformed items are skipped with a warning as long as at least one item
/// is usable.
///
/// # Errors
///
/// `NoResults` for an empty array, `ProcessingError` for a malformed body
/// or when no item is usable.
pub fn decode_search(body: &str, query: &str) -> Result<Vec<GeoResult>, GeocodingError> {
    let raw: Vec<RawPlace> = parse_body(body)?;
    if raw.is_empty() {
        return Err(GeocodingError::NoResults {
            query: query.to_string(),
        });
    }

    let mut results = Vec::with_capacity(raw.len());
    let mut first_error = None;
    for item in raw {
        match normalize_search_item(item) {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(error = %e, "Skipping malformed search result");
                first_error.get_or_insert(e);
            },
        }
    }
    if results.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    // Stable: equal importance keeps upstream order
    results.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(results)
}

/// Decode a `/reverse` response body
///
/// Coordinates missing from the body fall back to the requested location.
///
/// # Errors
///
/// `ReverseGeocodeFailed` when the body carries an `error` marker,
/// `ProcessingError` for malformed bodies.
pub fn decode_reverse(body: &str, requested: GeoLocation) -> Result<ReverseResult, GeocodingError> {
    let raw: Option<RawPlace> = parse_body(body)?;
    let Some(raw) = raw else {
        return Err(GeocodingError::ReverseGeocodeFailed(
            "empty response".to_string(),
        ));
    };

    if let Some(error) = raw.error {
        let message = match error {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(GeocodingError::ReverseGeocodeFailed(message));
    }

    let lat = raw.lat.as_ref().and_then(Numeric::value);
    let lng = raw.lon.as_ref().and_then(Numeric::value);
    let location = match (lat, lng) {
        (Some(lat), Some(lng)) => GeoLocation::new(lat, lng).unwrap_or(requested),
        _ => requested,
    };

    Ok(ReverseResult {
        display_name: present(raw.display_name),
        address: raw.address.unwrap_or_default().into(),
        lat: location.latitude(),
        lng: location.longitude(),
    })
}
