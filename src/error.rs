use exif::Error as ExifError;
use serde_json::Error as SerdeJsonError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("source image not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("scene group not found: {0}")]
    SceneGroupNotFound(String),
}
