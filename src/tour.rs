use crate::config::AppConfig;
use crate::coords::GeoCoordinate;
use crate::crops::save_jpeg;
use crate::error::AppError;
use crate::exif::ExifIndex;
use image::imageops::FilterType;
use image::GenericImageView;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Edge length of one pyramid tile in pixels.
pub const TILE_SIZE: u32 = 512;

/// Viewer-facing settings shared by all scenes of a tour.
#[derive(Debug, Clone)]
pub struct TourSettings {
    /// URL-ish prefix the viewer prepends to reach the tile tree,
    /// e.g. `../tiles`.
    pub base_path: String,
    pub auto_rotate: f64,
    pub scene_fade_duration: u64,
}

impl TourSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        TourSettings {
            base_path: format!("{}{}", config.tile_base_path, config.tile_folder),
            auto_rotate: config.auto_rotate,
            scene_fade_duration: config.scene_fade_duration,
        }
    }
}

/// One panorama that is a member of a tour, as resolved by the generator.
#[derive(Debug, Clone)]
pub struct TourMember {
    pub id: String,
    pub source: PathBuf,
    pub title: String,
}

/// One scene of a tour with everything needed to tile it and to describe
/// it to the viewer.
#[derive(Debug)]
pub struct SubScene {
    pub id: String,
    pub title: String,
    source: PathBuf,
    width: u32,
    height: u32,
    coordinate: Option<GeoCoordinate>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TileOutcome {
    /// Number of tiles written across all levels.
    Written(u32),
    Skipped,
}

impl SubScene {
    /// Writes this scene's multi-resolution pyramid under
    /// `<tile_dir>/<scene>/<level>/<x>_<y>.jpg`. The deepest level holds
    /// the full-resolution image; each shallower level halves it until one
    /// tile suffices. Skipped entirely when the scene's tile directory
    /// already exists and `force` is false.
    pub fn tile(&self, tile_dir: &Path, force: bool) -> Result<TileOutcome, AppError> {
        let scene_dir = tile_dir.join(&self.id);
        if scene_dir.is_dir() && !force {
            log::info!("skipping tiling of {}", self.id);
            return Ok(TileOutcome::Skipped);
        }
        if !self.source.is_file() {
            return Err(AppError::SourceNotFound(self.source.clone()));
        }

        let mut current = image::open(&self.source)?;
        let levels = level_count(self.width, self.height);
        let mut written = 0;
        for level in (1..=levels).rev() {
            let level_dir = scene_dir.join(level.to_string());
            std::fs::create_dir_all(&level_dir)?;
            written += write_level(&current, &level_dir)?;
            if level > 1 {
                let (w, h) = current.dimensions();
                current = current.resize_exact(
                    ((w + 1) / 2).max(1),
                    ((h + 1) / 2).max(1),
                    FilterType::Triangle,
                );
            }
        }

        log::info!(
            "tiled {}: {} tiles over {} levels",
            self.id,
            written,
            levels
        );
        Ok(TileOutcome::Written(written))
    }
}

/// Number of pyramid levels for a source of the given dimensions: one
/// level per halving until both dimensions fit a single tile.
pub fn level_count(width: u32, height: u32) -> u32 {
    let mut levels = 1;
    let (mut w, mut h) = (width, height);
    while w > TILE_SIZE || h > TILE_SIZE {
        w = (w + 1) / 2;
        h = (h + 1) / 2;
        levels += 1;
    }
    levels
}

fn write_level(image: &image::DynamicImage, level_dir: &Path) -> Result<u32, AppError> {
    let (width, height) = image.dimensions();
    let columns = width.div_ceil(TILE_SIZE);
    let rows = height.div_ceil(TILE_SIZE);

    let mut written = 0;
    for y in 0..rows {
        for x in 0..columns {
            let tile_width = TILE_SIZE.min(width - x * TILE_SIZE);
            let tile_height = TILE_SIZE.min(height - y * TILE_SIZE);
            let tile = image.crop_imm(x * TILE_SIZE, y * TILE_SIZE, tile_width, tile_height);
            save_jpeg(&tile, &level_dir.join(format!("{}_{}.jpg", x, y)))?;
            written += 1;
        }
    }
    Ok(written)
}

/// An ordered group of scenes sharing navigation links. Constructed once
/// per article; callers tile every sub-scene and then serialize the
/// viewer description.
#[derive(Debug)]
pub struct Tour {
    first_scene: String,
    settings: TourSettings,
    pub scenes: Vec<SubScene>,
}

impl Tour {
    pub fn new(
        settings: TourSettings,
        first_scene: &str,
        members: &[TourMember],
        exif: &ExifIndex,
    ) -> Result<Self, AppError> {
        let mut scenes = Vec::with_capacity(members.len());
        for member in members {
            let (width, height, coordinate) = match exif.get(&member.id) {
                Some(entry) => (entry.width, entry.height, entry.coordinate),
                // preview fallbacks are not in the index; read dimensions
                // from the resolved source instead
                None => {
                    let (w, h) = image::image_dimensions(&member.source)?;
                    (w, h, None)
                }
            };
            scenes.push(SubScene {
                id: member.id.clone(),
                title: member.title.clone(),
                source: member.source.clone(),
                width,
                height,
                coordinate,
            });
        }

        Ok(Tour {
            first_scene: first_scene.to_string(),
            settings,
            scenes,
        })
    }

    /// The serializable viewer configuration: a `default` block plus one
    /// entry per scene, with prev/next hot spots linking tour neighbors.
    pub fn description(&self) -> TourDescription {
        let mut scenes = BTreeMap::new();
        for (index, scene) in self.scenes.iter().enumerate() {
            let mut hot_spots = Vec::new();
            if index > 0 {
                hot_spots.push(HotSpot::to_scene(&self.scenes[index - 1], -90.0));
            }
            if index + 1 < self.scenes.len() {
                hot_spots.push(HotSpot::to_scene(&self.scenes[index + 1], 90.0));
            }

            scenes.insert(
                scene.id.clone(),
                SceneDescription {
                    title: scene.title.clone(),
                    scene_type: "multires".to_string(),
                    latitude: scene.coordinate.map(|c| c.lat),
                    longitude: scene.coordinate.map(|c| c.lng),
                    position: scene.coordinate.map(|c| c.sexagesimal(0)),
                    multi_res: MultiRes {
                        base_path: format!("{}/{}", self.settings.base_path, scene.id),
                        path: "/%l/%x_%y".to_string(),
                        extension: "jpg".to_string(),
                        tile_resolution: TILE_SIZE,
                        max_level: level_count(scene.width, scene.height),
                        width: scene.width,
                        height: scene.height,
                    },
                    hot_spots,
                },
            );
        }

        TourDescription {
            defaults: DefaultConfig {
                first_scene: self.first_scene.clone(),
                auto_rotate: self.settings.auto_rotate,
                scene_fade_duration: self.settings.scene_fade_duration,
            },
            scenes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TourDescription {
    #[serde(rename = "default")]
    pub defaults: DefaultConfig,
    pub scenes: BTreeMap<String, SceneDescription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfig {
    pub first_scene: String,
    pub auto_rotate: f64,
    pub scene_fade_duration: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescription {
    pub title: String,
    #[serde(rename = "type")]
    pub scene_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Human-readable sexagesimal position shown by the viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub multi_res: MultiRes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hot_spots: Vec<HotSpot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRes {
    pub base_path: String,
    pub path: String,
    pub extension: String,
    pub tile_resolution: u32,
    pub max_level: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotSpot {
    pub pitch: f64,
    pub yaw: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub scene_id: String,
}

impl HotSpot {
    fn to_scene(target: &SubScene, yaw: f64) -> Self {
        HotSpot {
            pitch: 0.0,
            yaw,
            kind: "scene".to_string(),
            text: target.title.clone(),
            scene_id: target.id.clone(),
        }
    }
}
