use crate::articles::{discover, Article, SceneArticle};
use crate::config::AppConfig;
use crate::crops::{produce_crop, CropOutcome, CropSpec};
use crate::error::AppError;
use crate::exif::ExifIndex;
use crate::tour::{TileOutcome, Tour, TourMember, TourSettings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One entry of the world map index, keyed by scene id. Coordinate
/// fields are omitted when the panorama carries no GPS data.
#[derive(Debug, Clone, Serialize)]
pub struct SceneEntry {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

pub type WorldMap = BTreeMap<String, SceneEntry>;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub scenes: usize,
    pub tours_written: usize,
    pub tiles_written: u32,
    pub crops_written: usize,
    pub crops_skipped: usize,
    pub errors: usize,
}

/// Runs one full generation pass over the content tree: world map,
/// helper script, and per-article tiles, crops, tour and location JSON.
/// Scene-local failures are logged and counted; the run continues.
pub struct Generator {
    config: AppConfig,
    exif: ExifIndex,
    force: bool,
}

impl Generator {
    pub fn new(config: AppConfig, force: bool) -> Result<Self, AppError> {
        let exif = ExifIndex::build(&config.fullsize_dir())?;
        if exif.is_empty() {
            log::warn!("no panoramas found in {}", config.fullsize_dir().display());
        } else {
            log::debug!("EXIF index holds {} scenes", exif.len());
        }
        Ok(Generator {
            config,
            exif,
            force,
        })
    }

    pub fn run(&self, articles: &[Article]) -> Result<RunSummary, AppError> {
        let discovery = discover(articles)?;
        if let Some(latest) = &discovery.latest {
            log::debug!("latest scene: {}", latest);
        }
        let worldmap = self.build_worldmap(&discovery.scene_articles);

        fs::create_dir_all(self.config.json_dir())?;
        fs::create_dir_all(self.config.tile_dir())?;

        self.write_json(&self.config.output_dir().join("worldmap.json"), &worldmap)?;
        self.write_helper()?;

        let mut summary = RunSummary {
            scenes: discovery.scene_articles.len(),
            ..RunSummary::default()
        };
        for article in &discovery.scene_articles {
            if let Err(e) = self.process_article(article, &worldmap, &mut summary) {
                log::error!("skipping scene {}: {}", article.scene, e);
                summary.errors += 1;
            }
            if let Err(e) = self.write_locations(article, &worldmap) {
                log::error!("could not write loc.json for {}: {}", article.url, e);
                summary.errors += 1;
            }
        }

        Ok(summary)
    }

    fn build_worldmap(&self, scene_articles: &[SceneArticle]) -> WorldMap {
        let mut map = WorldMap::new();
        for article in scene_articles {
            let coordinate = self.exif.get(&article.scene).and_then(|e| e.coordinate);
            map.insert(
                article.scene.clone(),
                SceneEntry {
                    url: article.url.clone(),
                    title: article.title.clone(),
                    lat: coordinate.map(|c| c.lat),
                    lng: coordinate.map(|c| c.lng),
                },
            );
        }
        map
    }

    /// Locates a scene's source image, falling back to the preview
    /// directory when the full-size panorama is absent.
    fn resolve_source(&self, scene: &str) -> Result<PathBuf, AppError> {
        let name = format!("{}.jpg", scene);
        let fullsize = self.config.fullsize_dir().join(&name);
        if fullsize.is_file() {
            return Ok(fullsize);
        }
        if let Some(preview_dir) = self.config.preview_dir() {
            let preview = preview_dir.join(&name);
            if preview.is_file() {
                log::warn!(
                    "{} does not exist, using preview panorama",
                    fullsize.display()
                );
                return Ok(preview);
            }
        }
        Err(AppError::SourceNotFound(fullsize))
    }

    fn process_article(
        &self,
        article: &SceneArticle,
        worldmap: &WorldMap,
        summary: &mut RunSummary,
    ) -> Result<(), AppError> {
        let source = self.resolve_source(&article.scene)?;

        let mut members = Vec::with_capacity(article.scenes.len());
        for scene_id in &article.scenes {
            match self.resolve_source(scene_id) {
                Ok(path) => {
                    let title = worldmap
                        .get(scene_id)
                        .map(|e| e.title.clone())
                        .unwrap_or_else(|| scene_id.clone());
                    members.push(TourMember {
                        id: scene_id.clone(),
                        source: path,
                        title,
                    });
                }
                Err(e) => {
                    log::error!("tour member {} dropped: {}", scene_id, e);
                    summary.errors += 1;
                }
            }
        }

        let settings = TourSettings::from_config(&self.config);
        let tour = Tour::new(settings, &article.scene, &members, &self.exif)?;
        for scene in &tour.scenes {
            match scene.tile(&self.config.tile_dir(), self.force) {
                Ok(TileOutcome::Written(tiles)) => summary.tiles_written += tiles,
                Ok(TileOutcome::Skipped) => {}
                Err(e) => {
                    log::error!("could not tile {}: {}", scene.id, e);
                    summary.errors += 1;
                }
            }
        }

        let sizes_dir = self.config.sizes_dir().join(&article.scene);
        for (name, size) in &self.config.crop_specs {
            let spec = CropSpec::new(name, *size);
            match produce_crop(&article.scene, &source, &spec, &sizes_dir, self.force) {
                Ok(CropOutcome::Written(_)) => summary.crops_written += 1,
                Ok(CropOutcome::Skipped(_)) => summary.crops_skipped += 1,
                Err(e) => {
                    log::error!("could not derive {} of {}: {}", name, article.scene, e);
                    summary.errors += 1;
                }
            }
        }

        let scene_tile_dir = self.config.tile_dir().join(&article.scene);
        fs::create_dir_all(&scene_tile_dir)?;
        let tour_json = scene_tile_dir.join("tour.json");
        self.write_json(&tour_json, &tour.description())?;
        log::info!("[ok] writing {}", tour_json.display());
        summary.tours_written += 1;

        Ok(())
    }

    fn write_locations(&self, article: &SceneArticle, worldmap: &WorldMap) -> Result<(), AppError> {
        let dir = self.config.output_dir().join(&article.url);
        fs::create_dir_all(&dir)?;

        let locations: WorldMap = article
            .scenes
            .iter()
            .filter_map(|id| worldmap.get(id).map(|e| (id.clone(), e.clone())))
            .collect();
        self.write_json(&dir.join("loc.json"), &locations)
    }

    /// `helper.js` exposes the site's base URL as a script global.
    fn write_helper(&self) -> Result<(), AppError> {
        let path = self.config.output_dir().join("helper.js");
        fs::write(&path, format!("var site_url='{}';", self.config.site_url))?;
        Ok(())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), AppError> {
        let payload = if self.config.debug {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        fs::write(path, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CropSize;
    use std::collections::BTreeMap;

    fn test_config(root: &Path) -> AppConfig {
        AppConfig {
            content_directory: root.join("content").to_string_lossy().to_string(),
            output_directory: root.join("output").to_string_lossy().to_string(),
            fullsize_panoramas: "panoramas".to_string(),
            preview_panoramas: Some("previews".to_string()),
            tile_folder: "tiles".to_string(),
            sizes_folder: "sizes".to_string(),
            json_folder: "json".to_string(),
            site_url: "https://example.org".to_string(),
            debug: false,
            auto_rotate: -2.0,
            scene_fade_duration: 1000,
            tile_base_path: "../".to_string(),
            crop_specs: BTreeMap::from([(
                "icon".to_string(),
                CropSize {
                    width: 150,
                    height: 50,
                },
            )]),
            articles_manifest: "content/articles.json".to_string(),
            log_level: "info".to_string(),
        }
    }

    fn write_pano(config: &AppConfig, scene: &str) {
        let dir = config.fullsize_dir();
        fs::create_dir_all(&dir).unwrap();
        let pano = image::RgbImage::from_pixel(600, 300, image::Rgb([70, 80, 90]));
        pano.save(dir.join(format!("{}.jpg", scene))).unwrap();
    }

    fn article(url: &str, scene: &str) -> Article {
        Article {
            url: url.to_string(),
            title: format!("Title of {}", scene),
            scene: Some(scene.to_string()),
            tour: None,
        }
    }

    #[test]
    fn run_writes_the_whole_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_pano(&config, "plaza");

        let generator = Generator::new(config.clone(), false).unwrap();
        let summary = generator.run(&[article("pano/plaza/", "plaza")]).unwrap();

        assert_eq!(summary.scenes, 1);
        assert_eq!(summary.tours_written, 1);
        assert_eq!(summary.crops_written, 1);
        assert_eq!(summary.errors, 0);

        let helper = fs::read_to_string(config.output_dir().join("helper.js")).unwrap();
        assert_eq!(helper, "var site_url='https://example.org';");

        let worldmap: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config.output_dir().join("worldmap.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(worldmap["plaza"]["url"], "pano/plaza/");
        assert_eq!(worldmap["plaza"]["title"], "Title of plaza");
        // no GPS data in the synthetic panorama
        assert!(worldmap["plaza"].get("lat").is_none());

        let tour: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config.tile_dir().join("plaza/tour.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(tour["default"]["firstScene"], "plaza");

        assert!(config.tile_dir().join("plaza/1/0_0.jpg").is_file());
        let icon = config.sizes_dir().join("plaza/plaza-icon.jpg");
        assert_eq!(image::image_dimensions(icon).unwrap(), (150, 50));

        let loc = config.output_dir().join("pano/plaza/loc.json");
        let locations: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(loc).unwrap()).unwrap();
        assert_eq!(locations["plaza"]["url"], "pano/plaza/");
    }

    #[test]
    fn missing_panorama_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_pano(&config, "real");

        let generator = Generator::new(config.clone(), false).unwrap();
        let summary = generator
            .run(&[article("a/", "ghost"), article("b/", "real")])
            .unwrap();

        assert_eq!(summary.scenes, 2);
        assert_eq!(summary.tours_written, 1);
        assert!(summary.errors >= 1);
        // the intact scene still went through
        assert!(config.tile_dir().join("real/tour.json").is_file());
    }

    #[test]
    fn preview_panorama_is_used_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(config.fullsize_dir()).unwrap();

        let preview_dir = config.preview_dir().unwrap();
        fs::create_dir_all(&preview_dir).unwrap();
        let pano = image::RgbImage::from_pixel(600, 300, image::Rgb([1, 2, 3]));
        pano.save(preview_dir.join("plaza.jpg")).unwrap();

        let generator = Generator::new(config.clone(), false).unwrap();
        let summary = generator.run(&[article("pano/", "plaza")]).unwrap();

        assert_eq!(summary.tours_written, 1);
        assert_eq!(summary.errors, 0);
        assert!(config.tile_dir().join("plaza/tour.json").is_file());
    }

    #[test]
    fn debug_config_pretty_prints_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.debug = true;
        write_pano(&config, "plaza");

        let generator = Generator::new(config.clone(), false).unwrap();
        generator.run(&[article("pano/", "plaza")]).unwrap();

        let raw = fs::read_to_string(config.output_dir().join("worldmap.json")).unwrap();
        assert!(raw.contains('\n'));

        config.debug = false;
        let generator = Generator::new(config.clone(), true).unwrap();
        generator.run(&[article("pano/", "plaza")]).unwrap();
        let raw = fs::read_to_string(config.output_dir().join("worldmap.json")).unwrap();
        assert!(!raw.contains('\n'));
    }
}
