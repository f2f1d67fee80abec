use crate::error::AppError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One content item handed over by the host pipeline. Scene and tour
/// membership are explicit optional fields, resolved once during the
/// discovery pass.
#[derive(Debug, Deserialize, Clone)]
pub struct Article {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub tour: Option<String>,
}

/// An article that carries a panorama, with its scene list resolved:
/// all members of its tour when it belongs to one, otherwise just its
/// own scene.
#[derive(Debug, Clone)]
pub struct SceneArticle {
    pub url: String,
    pub title: String,
    pub scene: String,
    pub scenes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub scene_articles: Vec<SceneArticle>,
    /// The first scene-bearing article of the run, displayed as the
    /// homepage banner by the site templates.
    pub latest: Option<String>,
}

pub fn load_manifest(path: &Path) -> Result<Vec<Article>, AppError> {
    let file = File::open(path)?;
    let articles = serde_json::from_reader(BufReader::new(file))?;
    Ok(articles)
}

/// Resolves scene and tour membership for the whole run in one pass.
pub fn discover(articles: &[Article]) -> Result<Discovery, AppError> {
    let mut tours: HashMap<String, Vec<String>> = HashMap::new();
    for article in articles {
        if let (Some(scene), Some(tour)) = (&article.scene, &article.tour) {
            tours.entry(tour.clone()).or_default().push(scene.clone());
        }
    }

    let mut discovery = Discovery::default();
    for article in articles {
        let scene = match &article.scene {
            Some(scene) => scene.clone(),
            None => continue,
        };

        if discovery.latest.is_none() {
            discovery.latest = Some(scene.clone());
        }

        let scenes = match &article.tour {
            // the table is keyed by the same scene+tour predicate, so a miss
            // can only mean a malformed grouping; report it, don't index
            Some(tour) => tours
                .get(tour)
                .cloned()
                .ok_or_else(|| AppError::SceneGroupNotFound(tour.clone()))?,
            None => vec![scene.clone()],
        };

        discovery.scene_articles.push(SceneArticle {
            url: article.url.clone(),
            title: article.title.clone(),
            scene,
            scenes,
        });
    }

    Ok(discovery)
}
