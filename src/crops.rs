use crate::config::CropSize;
use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// All derived images are encoded at the same fixed JPEG quality.
pub const JPEG_QUALITY: u8 = 80;

/// One named crop target, e.g. banner 1024x256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl CropSpec {
    pub fn new(name: &str, size: CropSize) -> Self {
        CropSpec {
            name: name.to_string(),
            width: size.width,
            height: size.height,
        }
    }

    /// Canonical file name of this crop for a scene.
    pub fn file_name(&self, scene: &str) -> String {
        format!("{}-{}.jpg", scene, self.name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CropOutcome {
    Written(PathBuf),
    Skipped(PathBuf),
}

/// Derives one fixed-size image from a scene's panorama: crops a full-width
/// band matching the target aspect ratio out of the vertical center, then
/// resizes it to the exact target dimensions.
///
/// Idempotent by path existence: when the destination file is already there
/// and `force` is false, nothing is derived and no dimension check is made
/// against the existing file.
pub fn produce_crop(
    scene: &str,
    source: &Path,
    spec: &CropSpec,
    sizes_dir: &Path,
    force: bool,
) -> Result<CropOutcome, AppError> {
    // the skip takes precedence: an already-derived image stays valid even
    // when its source panorama has since gone away
    let dest = sizes_dir.join(spec.file_name(scene));
    if dest.is_file() && !force {
        log::info!("skipping creation of {}", dest.display());
        return Ok(CropOutcome::Skipped(dest));
    }

    if !source.is_file() {
        return Err(AppError::SourceNotFound(source.to_path_buf()));
    }
    std::fs::create_dir_all(sizes_dir)?;

    let pano = image::open(source)?;
    let (pano_width, pano_height) = pano.dimensions();

    let scale = pano_width as f64 / spec.width as f64;
    let band_height =
        ((spec.height as f64 * scale).round() as u32).clamp(1, pano_height);
    let upper = (0.5 * (pano_height - band_height) as f64).round() as u32;

    let cropped = pano.crop_imm(0, upper, pano_width, band_height);
    let resized = cropped.resize_exact(spec.width, spec.height, FilterType::Lanczos3);
    save_jpeg(&resized, &dest)?;

    log::debug!(
        "wrote {} ({}x{})",
        dest.display(),
        spec.width,
        spec.height
    );
    Ok(CropOutcome::Written(dest))
}

pub(crate) fn save_jpeg(image: &DynamicImage, path: &Path) -> Result<(), AppError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    encoder.encode_image(&image.to_rgb8())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CropSize;

    fn icon_spec() -> CropSpec {
        CropSpec::new(
            "icon",
            CropSize {
                width: 150,
                height: 50,
            },
        )
    }

    fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("plaza.jpg");
        let pano = image::RgbImage::from_pixel(600, 300, image::Rgb([120, 140, 160]));
        pano.save(&path).unwrap();
        path
    }

    #[test]
    fn crop_has_exact_target_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path());
        let sizes = dir.path().join("sizes");

        let outcome = produce_crop("plaza", &source, &icon_spec(), &sizes, false).unwrap();
        let dest = match outcome {
            CropOutcome::Written(path) => path,
            CropOutcome::Skipped(_) => panic!("first derivation must write"),
        };

        assert_eq!(dest.file_name().unwrap(), "plaza-icon.jpg");
        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!((w, h), (150, 50));
    }

    #[test]
    fn second_call_is_a_no_op_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path());
        let sizes = dir.path().join("sizes");
        let spec = icon_spec();

        let first = produce_crop("plaza", &source, &spec, &sizes, false).unwrap();
        assert!(matches!(first, CropOutcome::Written(_)));

        let second = produce_crop("plaza", &source, &spec, &sizes, false).unwrap();
        assert!(matches!(second, CropOutcome::Skipped(_)));
    }

    #[test]
    fn force_always_rederives() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path());
        let sizes = dir.path().join("sizes");
        let spec = icon_spec();

        produce_crop("plaza", &source, &spec, &sizes, false).unwrap();
        let again = produce_crop("plaza", &source, &spec, &sizes, true).unwrap();
        assert!(matches!(again, CropOutcome::Written(_)));
    }

    #[test]
    fn missing_source_is_a_reported_error() {
        let dir = tempfile::tempdir().unwrap();
        let sizes = dir.path().join("sizes");
        let missing = dir.path().join("nowhere.jpg");

        let err = produce_crop("plaza", &missing, &icon_spec(), &sizes, false).unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound(_)));
        assert!(!sizes.join("plaza-icon.jpg").exists());
    }

    #[test]
    fn existing_crop_is_kept_when_source_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let sizes = dir.path().join("sizes");
        std::fs::create_dir_all(&sizes).unwrap();
        std::fs::write(sizes.join("plaza-icon.jpg"), b"already derived").unwrap();

        let missing = dir.path().join("gone.jpg");
        let outcome = produce_crop("plaza", &missing, &icon_spec(), &sizes, false).unwrap();
        assert!(matches!(outcome, CropOutcome::Skipped(_)));

        // a forced re-derivation still needs the source
        let err = produce_crop("plaza", &missing, &icon_spec(), &sizes, true).unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound(_)));
    }

    #[test]
    fn band_height_is_clamped_for_short_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.jpg");
        // source shorter than the crop band the aspect ratio asks for
        let pano = image::RgbImage::from_pixel(600, 100, image::Rgb([5, 5, 5]));
        pano.save(&path).unwrap();

        let sizes = dir.path().join("sizes");
        let spec = CropSpec::new(
            "banner",
            CropSize {
                width: 300,
                height: 120,
            },
        );
        let outcome = produce_crop("short", &path, &spec, &sizes, false).unwrap();
        assert!(matches!(outcome, CropOutcome::Written(_)));
        let (w, h) = image::image_dimensions(sizes.join("short-banner.jpg")).unwrap();
        assert_eq!((w, h), (300, 120));
    }
}
