use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pixel dimensions of one named crop target.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CropSize {
    pub width: u32,
    pub height: u32,
}

/// Immutable run configuration, assembled once at startup and passed
/// explicitly to every component.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_content_directory")]
    pub content_directory: String,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    /// Sub-directory of the content tree holding one `<scene>.jpg` per scene.
    #[serde(default = "default_fullsize_panoramas")]
    pub fullsize_panoramas: String,
    /// Optional lower-resolution fallbacks, same naming convention.
    #[serde(default)]
    pub preview_panoramas: Option<String>,
    #[serde(default = "default_tile_folder")]
    pub tile_folder: String,
    #[serde(default = "default_sizes_folder")]
    pub sizes_folder: String,
    #[serde(default = "default_json_folder")]
    pub json_folder: String,
    #[serde(default)]
    pub site_url: String,
    /// Pretty-printed JSON output when set, compact otherwise.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_auto_rotate")]
    pub auto_rotate: f64,
    /// Cross-fade duration between scenes, in milliseconds.
    #[serde(default = "default_scene_fade_duration")]
    pub scene_fade_duration: u64,
    /// Path prefix the viewer uses to reach the tile tree.
    #[serde(default = "default_tile_base_path")]
    pub tile_base_path: String,
    /// Named crop targets derived from every scene's panorama.
    #[serde(default = "default_crop_specs")]
    pub crop_specs: BTreeMap<String, CropSize>,
    #[serde(default = "default_articles_manifest")]
    pub articles_manifest: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_content_directory() -> String {
    "content".to_string()
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_fullsize_panoramas() -> String {
    "panoramas".to_string()
}

fn default_tile_folder() -> String {
    "tiles".to_string()
}

fn default_sizes_folder() -> String {
    "sizes".to_string()
}

fn default_json_folder() -> String {
    "json".to_string()
}

fn default_auto_rotate() -> f64 {
    -2.0
}

fn default_scene_fade_duration() -> u64 {
    1000
}

fn default_tile_base_path() -> String {
    "../".to_string()
}

fn default_crop_specs() -> BTreeMap<String, CropSize> {
    BTreeMap::from([
        (
            "banner".to_string(),
            CropSize {
                width: 1024,
                height: 256,
            },
        ),
        (
            "preview".to_string(),
            CropSize {
                width: 600,
                height: 200,
            },
        ),
        (
            "icon".to_string(),
            CropSize {
                width: 150,
                height: 50,
            },
        ),
    ])
}

fn default_articles_manifest() -> String {
    "content/articles.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn new(config_dir: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join("local")).required(false))
            .build()?;

        s.try_deserialize()
    }

    pub fn fullsize_dir(&self) -> PathBuf {
        Path::new(&self.content_directory).join(&self.fullsize_panoramas)
    }

    pub fn preview_dir(&self) -> Option<PathBuf> {
        self.preview_panoramas
            .as_ref()
            .map(|p| Path::new(&self.content_directory).join(p))
    }

    /// Tile trees live inside the content tree so the host pipeline
    /// publishes them alongside the articles.
    pub fn tile_dir(&self) -> PathBuf {
        Path::new(&self.content_directory).join(&self.tile_folder)
    }

    pub fn sizes_dir(&self) -> PathBuf {
        Path::new(&self.content_directory).join(&self.sizes_folder)
    }

    pub fn json_dir(&self) -> PathBuf {
        Path::new(&self.output_directory).join(&self.json_folder)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_directory)
    }
}
