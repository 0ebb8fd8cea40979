//! Geo point encoding.
//!
//! A point is stored in a single long: the quantized latitude in the high
//! 32 bits and the quantized longitude in the low 32 bits. Each coordinate is
//! scaled onto the full `i32` range, which gives roughly centimetre precision.

use crate::error::ValueError;

const LAT_DECODE: f64 = 180.0 / 4_294_967_296.0;
const LON_DECODE: f64 = 360.0 / 4_294_967_296.0;

/// Quantizes a latitude in `[-90, 90]`.
///
/// # Errors
///
/// Returns `Malformed` if the latitude is out of range or not finite.
pub fn encode_latitude(latitude: f64) -> Result<i32, ValueError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValueError::Malformed {
            target: "latitude",
            value: latitude.to_string(),
        });
    }
    // 90 itself would overflow i32
    let latitude = if latitude == 90.0 {
        f64::from_bits(latitude.to_bits() - 1)
    } else {
        latitude
    };
    Ok((latitude / LAT_DECODE).floor() as i32)
}

/// Quantizes a longitude in `[-180, 180]`.
///
/// # Errors
///
/// Returns `Malformed` if the longitude is out of range or not finite.
pub fn encode_longitude(longitude: f64) -> Result<i32, ValueError> {
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValueError::Malformed {
            target: "longitude",
            value: longitude.to_string(),
        });
    }
    let longitude = if longitude == 180.0 {
        f64::from_bits(longitude.to_bits() - 1)
    } else {
        longitude
    };
    Ok((longitude / LON_DECODE).floor() as i32)
}

/// Decodes a quantized latitude.
#[must_use]
pub fn decode_latitude(encoded: i32) -> f64 {
    f64::from(encoded) * LAT_DECODE
}

/// Decodes a quantized longitude.
#[must_use]
pub fn decode_longitude(encoded: i32) -> f64 {
    f64::from(encoded) * LON_DECODE
}

/// Packs a point (x = longitude, y = latitude) into a long.
///
/// # Errors
///
/// Returns `Malformed` if either coordinate is out of range.
pub fn point_as_long(x: f64, y: f64) -> Result<i64, ValueError> {
    let lat = encode_latitude(y)?;
    let lon = encode_longitude(x)?;
    Ok((i64::from(lat) << 32) | (i64::from(lon) & 0xFFFF_FFFF))
}

/// Unpacks a long into `(x, y)` = `(longitude, latitude)`.
#[must_use]
pub fn long_as_point(encoded: i64) -> (f64, f64) {
    let lat = (encoded >> 32) as i32;
    let lon = encoded as i32;
    (decode_longitude(lon), decode_latitude(lat))
}

/// Parses WKT `POINT (x y)` into the packed representation.
///
/// # Errors
///
/// Returns `Malformed` for anything other than a well-formed in-range point.
pub fn parse_wkt_point(raw: &[u8]) -> Result<i64, ValueError> {
    let malformed = || ValueError::malformed("geo_point", raw);
    let text = std::str::from_utf8(raw).map_err(|_| malformed())?.trim();

    let keyword_len = "POINT".len();
    let is_point = text
        .get(..keyword_len)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("POINT"));
    if !is_point {
        return Err(malformed());
    }
    let body = text[keyword_len..]
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(malformed)?;

    let mut coords = body.split_whitespace();
    let (Some(x), Some(y), None) = (coords.next(), coords.next(), coords.next()) else {
        return Err(malformed());
    };
    let x: f64 = x.parse().map_err(|_| malformed())?;
    let y: f64 = y.parse().map_err(|_| malformed())?;
    point_as_long(x, y).map_err(|_| malformed())
}

/// Formats a packed point as WKT with seven fractional digits.
#[must_use]
pub fn format_wkt_point(encoded: i64) -> String {
    let (x, y) = long_as_point(encoded);
    format!("POINT ({x:.7} {y:.7})")
}
