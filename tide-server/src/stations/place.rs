//! Place names, province codes and time zones for Canadian stations.

use chrono_tz::{America, Tz};

/// Canadian province and territory codes.
pub const PROVINCE_CODES: [&str; 13] = [
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

/// Extract a trailing province code from an official name.
///
/// The code follows the last comma, in any case and with any spacing.
///
/// # Examples
///
/// ```
/// use tide_server::stations::province_from_name;
///
/// assert_eq!(province_from_name("Halifax, NS"), Some("NS"));
/// assert_eq!(province_from_name("Halifax,ns"), Some("NS"));
/// assert_eq!(province_from_name("Vancouver"), None);
/// assert_eq!(province_from_name("Somewhere, XX"), None);
/// ```
pub fn province_from_name(name: &str) -> Option<&'static str> {
    let (_, suffix) = name.rsplit_once(',')?;
    let suffix = suffix.trim().to_ascii_uppercase();
    PROVINCE_CODES.iter().copied().find(|code| *code == suffix)
}

/// The civil time zone of a province or territory.
///
/// Provinces spanning several zones get the one most of their coastline
/// keeps.
pub fn province_time_zone(code: &str) -> Option<Tz> {
    let zone = match code.trim().to_ascii_uppercase().as_str() {
        "BC" => America::Vancouver,
        "YT" => America::Whitehorse,
        "AB" | "NT" => America::Edmonton,
        "SK" => America::Regina,
        "MB" => America::Winnipeg,
        "NU" => America::Iqaluit,
        "ON" | "QC" => America::Toronto,
        "NB" | "NS" | "PE" => America::Halifax,
        "NL" => America::St_Johns,
        _ => return None,
    };
    Some(zone)
}

/// Guess a province from coordinates.
///
/// Coarse longitude bands, good enough to label a station when the
/// listing omits the province.
pub fn province_from_coordinates(latitude: f64, longitude: f64) -> &'static str {
    if longitude < -120.0 {
        "BC"
    } else if longitude < -95.0 {
        "MB"
    } else if latitude > 50.0 {
        "NT"
    } else if longitude < -60.0 {
        "QC"
    } else {
        "NL"
    }
}

/// Build the display name and region for a listed station.
///
/// Names that already end in a province code are kept as they are.
/// Otherwise the province is inferred from coordinates, when known, and
/// appended.
pub fn place_name(
    official_name: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> (String, Option<String>) {
    let official_name = official_name.trim();

    if let Some(code) = province_from_name(official_name) {
        return (official_name.to_string(), Some(code.to_string()));
    }

    match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            let code = province_from_coordinates(lat, lon);
            (format!("{official_name}, {code}"), Some(code.to_string()))
        }
        _ => (official_name.to_string(), None),
    }
}
