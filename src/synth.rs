//! Generators for the fabricated values written into each image.
//!
//! Both generators take the random source as an argument so callers decide how
//! it is seeded.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::exif::Coordinate;

/// Literal written to the Software tag unless configured otherwise.
pub const DEFAULT_SOFTWARE: &str = "RandomSoftware";

/// Manufacturer names the make is drawn from.
pub const CAMERA_MAKES: [&str; 10] = [
    "Canon",
    "Nikon",
    "Sony",
    "Fujifilm",
    "Olympus",
    "Panasonic",
    "Leica",
    "Pentax",
    "Sigma",
    "Hasselblad",
];

/// Model names the model is drawn from, independently of the make.
pub const CAMERA_MODELS: [&str; 10] = [
    "EOS 5D Mark IV",
    "D850",
    "Alpha 7R IV",
    "X-T4",
    "OM-D E-M1 Mark III",
    "Lumix GH5",
    "Q2",
    "K-3 III",
    "fp L",
    "X1D II 50C",
];

/// Device identity written to the 0th IFD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityTagSet {
    pub make: String,
    pub model: String,
    pub software: String,
}

/// Uniformly random position anywhere on the globe.
pub fn random_coordinate<R: Rng + ?Sized>(rng: &mut R) -> Coordinate {
    Coordinate {
        latitude: rng.gen_range(-90.0..=90.0),
        longitude: rng.gen_range(-180.0..=180.0),
    }
}

/// Random make and model from the catalogs, paired with `software`.
pub fn random_identity<R: Rng + ?Sized>(rng: &mut R, software: &str) -> IdentityTagSet {
    // Both catalogs are non-empty constants.
    let make = CAMERA_MAKES.choose(rng).copied().unwrap_or(CAMERA_MAKES[0]);
    let model = CAMERA_MODELS.choose(rng).copied().unwrap_or(CAMERA_MODELS[0]);

    IdentityTagSet {
        make: make.to_string(),
        model: model.to_string(),
        software: software.to_string(),
    }
}
