use serde::Serialize;

use super::rational::Rational;

/// A latitude/longitude pair in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Returns `None` unless latitude is in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self { latitude, longitude })
    }
}

/// The four GPS IFD values written for a coordinate.
///
/// Degrees carry all the precision; minutes and seconds are always `0/1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsTagSet {
    pub latitude_ref: char,
    pub latitude: [Rational; 3],
    pub longitude_ref: char,
    pub longitude: [Rational; 3],
}

impl GpsTagSet {
    pub fn from_coordinate(coordinate: Coordinate, max_denominator: u64) -> Self {
        let lat = coordinate.latitude;
        let lon = coordinate.longitude;

        Self {
            latitude_ref: if lat >= 0.0 { 'N' } else { 'S' },
            latitude: degrees_only(lat, max_denominator),
            longitude_ref: if lon >= 0.0 { 'E' } else { 'W' },
            longitude: degrees_only(lon, max_denominator),
        }
    }

    /// Signed decimal latitude encoded by this set.
    pub fn latitude_degrees(&self) -> f64 {
        signed_degrees(&self.latitude, self.latitude_ref == 'S')
    }

    /// Signed decimal longitude encoded by this set.
    pub fn longitude_degrees(&self) -> f64 {
        signed_degrees(&self.longitude, self.longitude_ref == 'W')
    }
}

fn degrees_only(value: f64, max_denominator: u64) -> [Rational; 3] {
    // A validated coordinate is finite and at most 180, so approximation always succeeds;
    // a zero bound is the only way to get None here.
    let degrees = Rational::approximate(value.abs(), max_denominator.max(1)).unwrap_or(Rational::ZERO);
    [degrees, Rational::ZERO, Rational::ZERO]
}

fn signed_degrees(dms: &[Rational; 3], negative: bool) -> f64 {
    let value = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;
    if negative { -value } else { value }
}
