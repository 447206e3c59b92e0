use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, FilterConfig};
use crate::error::{ErrorKind, Result, ScrambleError};
use crate::exif::{self, Coordinate, ExifTree, GpsTagSet};
use crate::synth::{self, IdentityTagSet};

/// What was written into one output image.
///
/// # Example
///
/// ```rust,no_run
/// use exif_scramble::config::Config;
/// use exif_scramble::pipeline::scramble_image;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use std::path::Path;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let outcome = scramble_image(
///     Path::new("photo.png"),
///     Path::new("processed/photo.png"),
///     &mut rng,
///     &Config::default(),
/// )?;
/// println!("{} {} at {:?}", outcome.identity.make, outcome.identity.model, outcome.coordinate);
/// # Ok::<(), exif_scramble::ScrambleError>(())
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ScrambleOutcome {
    pub output: PathBuf,
    pub coordinate: Coordinate,
    pub identity: IdentityTagSet,
    pub gps: GpsTagSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Succeeded,
    /// Directory or extension not on the allow-list; nothing was read.
    Skipped,
    Failed,
}

/// A per-file error captured at the batch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ScrambleError> for Failure {
    fn from(err: &ScrambleError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// The result of running one path through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub status: ProcessStatus,
    /// Present when `status` is `Succeeded`.
    pub outcome: Option<ScrambleOutcome>,
    /// Present when `status` is `Failed`.
    pub failure: Option<Failure>,
}

impl ProcessResult {
    fn skipped(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: ProcessStatus::Skipped,
            outcome: None,
            failure: None,
        }
    }
}

/// Per-file results of a batch, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<ProcessResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(ProcessStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(ProcessStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ProcessStatus::Skipped)
    }

    fn count(&self, status: ProcessStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Check a file name against the extension allow-list (case-insensitive).
///
/// ```rust
/// use exif_scramble::config::FilterConfig;
/// use exif_scramble::pipeline::is_allowed;
/// use std::path::Path;
///
/// let filter = FilterConfig::default();
/// assert!(is_allowed(Path::new("photo.JPG"), &filter));
/// assert!(!is_allowed(Path::new("notes.txt"), &filter));
/// assert!(!is_allowed(Path::new("noextension"), &filter));
/// ```
pub fn is_allowed(path: &Path, filter: &FilterConfig) -> bool {
    filter.allows(path)
}

/// Collect candidate image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are listed one
/// level deep unless `filter.recursive` is set; entries come back sorted by
/// file name. Files without an allowed extension are skipped with a warning.
pub fn collect_images(paths: &[PathBuf], filter: &FilterConfig) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_allowed(path, filter) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            match list_dir(path, filter.recursive) {
                Ok(files) => {
                    for file in files {
                        if is_allowed(&file, filter) {
                            images.push(file);
                        } else {
                            log::debug!("Skipping unsupported file: {}", file.display());
                        }
                    }
                }
                Err(e) => log::warn!("Failed to list {}: {e}", path.display()),
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Regular files under `dir`, sorted by file name within each directory.
///
/// An unreadable `dir` is an error; unreadable subdirectories of a recursive
/// walk are logged and left out.
fn list_dir(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(ScrambleError::Io(io::Error::from(e))),
            Err(e) => log::warn!("Skipping unreadable entry: {e}"),
        }
    }
    Ok(files)
}

/// Rewrite one image as a JPEG carrying fabricated camera and GPS metadata.
///
/// 1. **Decode**: any format the `image` crate reads; alpha is dropped
/// 2. **Synthesize**: random coordinate and catalog identity from `rng`
/// 3. **Serialize**: 0th/Exif/GPS directories as TIFF bytes
/// 4. **Write**: JPEG at `config.output.jpeg_quality` with the EXIF APP1
///    segment, written through a temporary file that is renamed onto `output`
///
/// Inputs whose extension is not on `config.filter` fail with
/// `UnsupportedFormat` before anything is read. The parent of `output` is
/// created if needed. Errors are returned as-is.
pub fn scramble_image<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    rng: &mut R,
    config: &Config,
) -> Result<ScrambleOutcome> {
    if !is_allowed(input, &config.filter) {
        return Err(ScrambleError::UnsupportedFormat(format!(
            "{} does not have an allowed extension",
            input.display()
        )));
    }
    let bytes = fs::read(input)?;
    let image = flatten_alpha(decode_image(&bytes)?)?;

    let coordinate = synth::random_coordinate(rng);
    let identity = synth::random_identity(rng, &config.metadata.software);
    let gps = GpsTagSet::from_coordinate(coordinate, config.metadata.max_denominator);
    log::debug!(
        "{}: {} {} at ({:.6}, {:.6})",
        input.display(),
        identity.make,
        identity.model,
        coordinate.latitude,
        coordinate.longitude
    );

    let tree = ExifTree::assemble(&identity, &gps);
    let tiff = exif::serialize(&tree, config.metadata.byte_order)?;
    let jpeg = encode_jpeg(&image, config.output.jpeg_quality)?;
    let jpeg = exif::embed_in_jpeg(jpeg, &tiff)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_atomic(output, &jpeg)?;

    Ok(ScrambleOutcome {
        output: output.to_path_buf(),
        coordinate,
        identity,
        gps,
    })
}

/// Run one path through the pipeline, writing `output_dir/<file name>`.
///
/// Never fails: directories and disallowed extensions come back `Skipped`,
/// errors come back as a [`Failure`].
pub fn process_image<R: Rng + ?Sized>(
    input: &Path,
    output_dir: &Path,
    rng: &mut R,
    config: &Config,
) -> ProcessResult {
    if input.is_dir() || !is_allowed(input, &config.filter) {
        log::warn!("Skipping unsupported file: {}", input.display());
        return ProcessResult::skipped(input);
    }
    let Some(file_name) = input.file_name() else {
        return ProcessResult::skipped(input);
    };

    let output = output_dir.join(file_name);
    match scramble_image(input, &output, rng, config) {
        Ok(outcome) => ProcessResult {
            path: input.to_path_buf(),
            status: ProcessStatus::Succeeded,
            outcome: Some(outcome),
            failure: None,
        },
        Err(e) => ProcessResult {
            path: input.to_path_buf(),
            status: ProcessStatus::Failed,
            outcome: None,
            failure: Some(Failure::from(&e)),
        },
    }
}

/// Process `paths` in order. One file failing never stops the others.
pub fn process_batch<R: Rng + ?Sized>(
    paths: &[PathBuf],
    output_dir: &Path,
    rng: &mut R,
    config: &Config,
) -> BatchReport {
    let total = paths.len();
    let mut report = BatchReport::default();

    for (i, path) in paths.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, path.display());
        let result = process_image(path, output_dir, rng, config);

        if let Some(ref failure) = result.failure {
            log::error!("{}: {} ({})", path.display(), failure.message, failure.kind);
        }
        report.results.push(result);
    }

    log::info!(
        "Done: {} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    report
}

/// List `input_dir` and process every file in it.
///
/// Only the listing itself can fail; per-file errors land in the report.
pub fn process_folder<R: Rng + ?Sized>(
    input_dir: &Path,
    output_dir: &Path,
    rng: &mut R,
    config: &Config,
) -> Result<BatchReport> {
    let files = list_dir(input_dir, config.filter.recursive)?;
    Ok(process_batch(&files, output_dir, rng, config))
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes)
        .map_err(|_| ScrambleError::Decode("unrecognized image data".into()))?;
    Ok(image::load_from_memory_with_format(bytes, format)?)
}

/// Reduce the pixel layout to one baseline JPEG can store.
fn flatten_alpha(image: DynamicImage) -> Result<DynamicImage> {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Ok(image),
        DynamicImage::ImageRgba8(_) => Ok(DynamicImage::ImageRgb8(image.to_rgb8())),
        DynamicImage::ImageLumaA8(_) => Ok(DynamicImage::ImageLuma8(image.to_luma8())),
        other => Err(ScrambleError::UnsupportedFormat(format!(
            "{:?} pixels cannot be stored as 8-bit JPEG",
            other.color()
        ))),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    image.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Write through a sibling temp file and rename it onto `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let written = fs::write(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, LumaA, Rgb, Rgba};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn write_png(path: &Path) {
        let img = ImageBuffer::from_fn(16, 12, |x, y| Rgba([(x * 15) as u8, (y * 20) as u8, 90, 128]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    fn write_jpeg(path: &Path) {
        let img = ImageBuffer::from_fn(8, 8, |x, _| Rgb([x as u8 * 30, 60, 200]));
        img.save_with_format(path, ImageFormat::Jpeg).unwrap();
    }

    // ── is_allowed ───────────────────────────────────────────────────

    #[test]
    fn allowed_extensions() {
        let filter = FilterConfig::default();
        assert!(is_allowed(Path::new("photo.JPG"), &filter));
        assert!(is_allowed(Path::new("photo.jpg"), &filter));
        assert!(is_allowed(Path::new("image.png"), &filter));
        assert!(is_allowed(Path::new("anim.GIF"), &filter));
        assert!(!is_allowed(Path::new("notes.txt"), &filter));
        assert!(!is_allowed(Path::new("noextension"), &filter));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()], &FilterConfig::default());
        assert_eq!(images, vec![jpg]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();

        assert!(collect_images(&[txt], &FilterConfig::default()).is_empty());
    }

    #[test]
    fn collect_images_one_level_by_default() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("b.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("a.png"), b"fake").unwrap();
        fs::write(sub.join("c.png"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()], &FilterConfig::default());
        assert_eq!(images, vec![dir.path().join("a.png"), dir.path().join("b.jpg")]);
    }

    #[test]
    fn collect_images_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let filter = FilterConfig {
            recursive: true,
            ..FilterConfig::default()
        };
        let images = collect_images(&[dir.path().to_path_buf()], &filter);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")], &FilterConfig::default());
        assert!(images.is_empty());
    }

    // ── scramble_image ───────────────────────────────────────────────

    #[test]
    fn scramble_png_writes_jpeg_with_exif() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.png");
        write_png(&input);
        let output = dir.path().join("out").join("in.png");

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = scramble_image(&input, &output, &mut rng, &Config::default()).unwrap();
        assert_eq!(outcome.output, output);

        let bytes = fs::read(&output).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));

        let exif = exif::read_exif_bytes(&bytes).unwrap();
        assert_eq!(exif.make.as_deref(), Some(outcome.identity.make.as_str()));
        assert_eq!(exif.model.as_deref(), Some(outcome.identity.model.as_str()));
        assert_eq!(exif.software.as_deref(), Some("RandomSoftware"));
        assert!(exif.has_gps);
    }

    #[test]
    fn scramble_replaces_existing_jpeg() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg(&input);

        let mut rng = StdRng::seed_from_u64(2);
        scramble_image(&input, &input, &mut rng, &Config::default()).unwrap();

        let exif = exif::read_exif(&input).unwrap();
        assert!(exif.make.is_some());
        assert!(!dir.path().join(".photo.jpg.tmp").exists());
    }

    #[test]
    fn scramble_is_deterministic_for_a_seed() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.png");
        write_png(&input);

        let mut config = Config::default();
        config.metadata.byte_order = exif::Endian::Little;
        let a = scramble_image(&input, &dir.path().join("a.jpg"), &mut StdRng::seed_from_u64(9), &config).unwrap();
        let b = scramble_image(&input, &dir.path().join("b.jpg"), &mut StdRng::seed_from_u64(9), &config).unwrap();
        assert_eq!(a.coordinate, b.coordinate);
        assert_eq!(a.identity, b.identity);
        assert_eq!(
            fs::read(dir.path().join("a.jpg")).unwrap(),
            fs::read(dir.path().join("b.jpg")).unwrap()
        );
    }

    #[test]
    fn scramble_corrupt_input_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.jpg");
        fs::write(&input, b"definitely not an image").unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let err = scramble_image(&input, &dir.path().join("o.jpg"), &mut rng, &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(!dir.path().join("o.jpg").exists());
    }

    #[test]
    fn scramble_missing_input_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let err = scramble_image(&dir.path().join("nope.png"), &dir.path().join("o.jpg"), &mut rng, &Config::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn scramble_rejects_disallowed_extensions() {
        let dir = TempDir::new().unwrap();
        let tiff = dir.path().join("scan.tiff");
        ImageBuffer::from_pixel(4, 4, Rgb([10u8, 20, 30]))
            .save_with_format(&tiff, ImageFormat::Tiff)
            .unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        for input in [&tiff, &txt] {
            let output = dir.path().join("out").join(input.file_name().unwrap());
            let err = scramble_image(input, &output, &mut rng, &Config::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat, "{}", input.display());
            assert!(!output.exists());
        }

        let mut config = Config::default();
        config.filter.allowed_extensions.push("tiff".into());
        let output = dir.path().join("out").join("scan.tiff");
        scramble_image(&tiff, &output, &mut rng, &config).unwrap();
        assert!(output.exists());
    }

    // ── write_atomic ─────────────────────────────────────────────────

    #[test]
    fn write_atomic_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.jpg");
        fs::write(&target, b"old").unwrap();

        write_atomic(&target, b"new").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!dir.path().join(".out.jpg.tmp").exists());
    }

    #[test]
    fn write_atomic_failure_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory at the target makes the rename fail.
        let target = dir.path().join("taken.jpg");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        assert!(write_atomic(&target, b"data").is_err());
        assert!(!dir.path().join(".taken.jpg.tmp").exists());
        assert!(target.join("keep").exists());
    }

    // ── flatten_alpha ────────────────────────────────────────────────

    #[test]
    fn flatten_alpha_layouts() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        assert!(matches!(flatten_alpha(rgba).unwrap(), DynamicImage::ImageRgb8(_)));

        let la = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(2, 2, LumaA([7, 8])));
        assert!(matches!(flatten_alpha(la).unwrap(), DynamicImage::ImageLuma8(_)));

        let wide = DynamicImage::ImageRgb16(ImageBuffer::new(2, 2));
        assert_eq!(flatten_alpha(wide).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }

    // ── process_image / process_batch ────────────────────────────────

    #[test]
    fn process_image_skips_disallowed() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        let mut rng = StdRng::seed_from_u64(4);
        let result = process_image(&txt, &dir.path().join("out"), &mut rng, &Config::default());
        assert_eq!(result.status, ProcessStatus::Skipped);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn batch_continues_past_failures() {
        let dir = TempDir::new().unwrap();
        let good_a = dir.path().join("a.png");
        let bad = dir.path().join("b.jpg");
        let good_c = dir.path().join("c.png");
        write_png(&good_a);
        fs::write(&bad, b"corrupt").unwrap();
        write_png(&good_c);
        let out = dir.path().join("processed");

        let mut rng = StdRng::seed_from_u64(5);
        let report = process_batch(&[good_a, bad.clone(), good_c], &out, &mut rng, &Config::default());

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.results[1].path, bad);
        assert_eq!(report.results[1].failure.as_ref().unwrap().kind, ErrorKind::Decode);
        assert!(out.join("a.png").exists());
        assert!(!out.join("b.jpg").exists());
        assert!(out.join("c.png").exists());
    }

    #[test]
    fn process_folder_counts_skips() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        write_png(&input.join("one.png"));
        fs::write(input.join("readme.txt"), b"x").unwrap();

        let mut rng = StdRng::seed_from_u64(6);
        let report = process_folder(&input, &dir.path().join("out"), &mut rng, &Config::default()).unwrap();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn process_folder_missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let err = process_folder(&dir.path().join("absent"), dir.path(), &mut rng, &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
