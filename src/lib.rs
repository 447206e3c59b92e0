//! # exif-scramble
//!
//! Metadata obfuscation for images. Every input is re-encoded as a JPEG whose
//! EXIF block names a random camera and places the shot at a random GPS
//! position, so the published file says nothing true about its origin.
//!
//! ## Quick Start
//!
//! The batch pipeline handles the full decode → synthesize → serialize → write
//! flow:
//!
//! ```rust,no_run
//! use exif_scramble::config::Config;
//! use exif_scramble::pipeline::{collect_images, process_batch};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use std::path::{Path, PathBuf};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("exif-scramble.json".as_ref()))?;
//!     let mut rng = StdRng::from_entropy();
//!
//!     // Collect candidate images from files or directories
//!     let images = collect_images(&[PathBuf::from("./uploads")], &config.filter);
//!
//!     let report = process_batch(&images, Path::new("processed"), &mut rng, &config);
//!     for result in &report.results {
//!         if let Some(ref failure) = result.failure {
//!             eprintln!("{}: {}", result.path.display(), failure.message);
//!         }
//!     }
//!     println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The pieces can be used on their own, e.g. to build an EXIF block for an
//! already-encoded JPEG:
//!
//! ```rust,no_run
//! use exif_scramble::exif::{Endian, ExifTree, GpsTagSet, embed_in_jpeg, read_exif_bytes, serialize};
//! use exif_scramble::synth::{DEFAULT_SOFTWARE, random_coordinate, random_identity};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut rng = rand::thread_rng();
//!     let identity = random_identity(&mut rng, DEFAULT_SOFTWARE);
//!     let gps = GpsTagSet::from_coordinate(random_coordinate(&mut rng), 1_000_000);
//!
//!     let tiff = serialize(&ExifTree::assemble(&identity, &gps), Endian::Big)?;
//!     let jpeg = embed_in_jpeg(std::fs::read("photo.jpg")?, &tiff)?;
//!
//!     let back = read_exif_bytes(&jpeg)?;
//!     println!("Camera: {:?} {:?}", back.make, back.model);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration types and loading/saving
//! - [`error`]: Per-image error type and its classification
//! - [`exif`]: Rational approximation, GPS tags, TIFF serialization, read-back
//! - [`pipeline`]: File collection, single-image scrambling and batch processing
//! - [`synth`]: Random coordinates and camera identities
//! - `upload`: HTTP upload front end (feature `server`)

pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod synth;
#[cfg(feature = "server")]
pub mod upload;

pub use error::{ErrorKind, Result, ScrambleError};
