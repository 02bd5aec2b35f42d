//! Structured postal address and human-readable formatting

use serde::{Deserialize, Serialize};

/// Fallback label when nothing is known about a location
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Structured address components
///
/// Every component is optional. An absent component means "unknown";
/// empty strings are never used as placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    /// Street name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    /// House or building number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    /// Neighbourhood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbourhood: Option<String>,
    /// Suburb or sector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    /// City, town or village
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Country name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Postal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl AddressParts {
    /// Returns true if no component is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.road,
            &self.house_number,
            &self.neighbourhood,
            &self.suburb,
            &self.city,
            &self.state,
            &self.country,
            &self.postal_code,
        ]
        .iter()
        .all(|part| non_blank(part).is_none())
    }

    /// Street with house number, e.g. "Av. Alemania 1450"
    #[must_use]
    pub fn street(&self) -> Option<String> {
        let road = non_blank(&self.road)?;
        Some(match non_blank(&self.house_number) {
            Some(number) => format!("{road} {number}"),
            None => road.to_string(),
        })
    }

    /// Neighbourhood, falling back to the suburb
    #[must_use]
    pub fn district(&self) -> Option<&str> {
        non_blank(&self.neighbourhood).or_else(|| non_blank(&self.suburb))
    }

    fn short_parts(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(4);
        parts.extend(self.street());
        parts.extend(self.district().map(str::to_string));
        parts.extend(non_blank(&self.city).map(str::to_string));
        parts
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn fallback(display_name: Option<&str>) -> String {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_LOCATION)
        .to_string()
}

/// Format an address for display: street, district, city and state
///
/// The state is only appended when at least one finer component is known.
/// Falls back to `display_name`, then to [`UNKNOWN_LOCATION`].
#[must_use]
pub fn format_address(address: &AddressParts, display_name: Option<&str>) -> String {
    let mut parts = address.short_parts();
    if parts.is_empty() {
        return fallback(display_name);
    }
    parts.extend(non_blank(&address.state).map(str::to_string));
    parts.join(", ")
}

/// Format an address without the state, for compact UI elements
#[must_use]
pub fn format_short_address(address: &AddressParts, display_name: Option<&str>) -> String {
    let parts = address.short_parts();
    if parts.is_empty() {
        return fallback(display_name);
    }
    parts.join(", ")
}
