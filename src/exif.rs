use crate::coords::GeoCoordinate;
use crate::error::AppError;
use exif::{In, Reader, Tag, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Metadata extracted once per source panorama.
#[derive(Debug, Clone)]
pub struct SceneExif {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub coordinate: Option<GeoCoordinate>,
}

/// Scene id to metadata lookup, built once per run from the panorama
/// source directory. Read-only after construction.
#[derive(Debug, Default)]
pub struct ExifIndex {
    entries: HashMap<String, SceneExif>,
}

impl ExifIndex {
    pub fn build(panorama_dir: &Path) -> Result<Self, AppError> {
        let mut entries = HashMap::new();

        if !panorama_dir.is_dir() {
            log::warn!("{} does not exist", panorama_dir.display());
            return Ok(ExifIndex { entries });
        }

        log::info!("Scanning panoramas in {}", panorama_dir.display());
        for entry in WalkDir::new(panorama_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
                .unwrap_or(false);
            if !is_jpeg {
                log::trace!("Skipping non-panorama file {}", path.display());
                continue;
            }
            let scene_id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };

            let (width, height) = match image::image_dimensions(path) {
                Ok(dims) => dims,
                Err(e) => {
                    log::warn!("Could not read dimensions of {}: {}", path.display(), e);
                    continue;
                }
            };

            let coordinate = read_gps(path);
            if coordinate.is_none() {
                log::debug!("No GPS data in {}", path.display());
            }

            entries.insert(
                scene_id,
                SceneExif {
                    path: path.to_path_buf(),
                    width,
                    height,
                    coordinate,
                },
            );
        }

        log::info!("Indexed {} panoramas", entries.len());
        Ok(ExifIndex { entries })
    }

    pub fn get(&self, scene_id: &str) -> Option<&SceneExif> {
        self.entries.get(scene_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads the GPS position from a JPEG, combining the degree/minute/second
/// rationals and signing by the hemisphere reference tags. Any missing or
/// malformed field yields `None`; coordinates are optional throughout.
fn read_gps(path: &Path) -> Option<GeoCoordinate> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    let lat = axis_value(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let lng = axis_value(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;
    Some(GeoCoordinate::new(lat, lng))
}

fn axis_value(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: char,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let degrees = match &field.value {
        Value::Rational(parts) => rationals_to_degrees(parts)?,
        _ => return None,
    };

    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string())
        .unwrap_or_default();

    if reference.starts_with(negative_ref) {
        Some(-degrees)
    } else {
        Some(degrees)
    }
}

fn rationals_to_degrees(parts: &[exif::Rational]) -> Option<f64> {
    let degrees = parts.first()?.to_f64();
    let minutes = parts.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
    let seconds = parts.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}
