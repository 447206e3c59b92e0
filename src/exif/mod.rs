//! EXIF synthesis, serialization and read-back.
//!
//! - [`Rational::approximate`]: bounded-denominator rational for a coordinate
//! - [`GpsTagSet::from_coordinate`]: GPS IFD values for a position
//! - [`ExifTree::assemble`]: 0th/Exif/GPS directories for one image
//! - [`serialize`]: TIFF byte layout of a tree, ready for a JPEG APP1 segment
//! - [`embed_in_jpeg`]: swap the metadata of an encoded JPEG
//! - [`read_exif`]: decode what was written, for display and verification

mod gps;
mod rational;
mod reader;
mod tree;
mod writer;

pub use gps::{Coordinate, GpsTagSet};
pub use rational::{DEFAULT_MAX_DENOMINATOR, Rational};
pub use reader::{ExifData, read_exif, read_exif_bytes};
pub use tree::*;
pub use writer::{Endian, embed_in_jpeg, serialize};
