use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ImagineError, Result};
use crate::models::GeneratedImage;
use crate::ui::Ui;

#[derive(Default)]
struct GalleryState {
    images: Vec<GeneratedImage>,
    seeded: bool,
}

/// Ordered results, newest generations first. Order drives both the grid and
/// preview navigation.
#[derive(Clone)]
pub struct ResultsGallery {
    state: Arc<Mutex<GalleryState>>,
    ui: Arc<dyn Ui>,
}

impl ResultsGallery {
    pub fn new(ui: Arc<dyn Ui>) -> Self {
        Self {
            state: Arc::new(Mutex::new(GalleryState::default())),
            ui,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GalleryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seeds the gallery with persisted images, in the order received. Only
    /// the first call has any effect.
    pub fn load_initial(&self, images: Vec<GeneratedImage>) {
        let snapshot = {
            let mut state = self.lock();
            if state.seeded {
                log::warn!("Gallery already seeded, ignoring {} image(s)", images.len());
                return;
            }
            state.seeded = true;
            state.images.extend(images);
            state.images.clone()
        };
        log::info!("Loaded {} saved image(s)", snapshot.len());
        self.ui.render_gallery(&snapshot);
    }

    /// Puts a fresh batch in front of everything, batch order intact.
    pub fn prepend(&self, batch: Vec<GeneratedImage>) {
        if batch.is_empty() {
            return;
        }
        let snapshot = {
            let mut state = self.lock();
            let count = batch.len();
            state.images.splice(0..0, batch);
            log::debug!("Gallery grew by {} to {}", count, state.images.len());
            state.images.clone()
        };
        self.ui.render_gallery(&snapshot);
    }

    pub fn find_index_by_url(&self, url: &str) -> Option<usize> {
        self.lock().images.iter().position(|image| image.url == url)
    }

    pub fn get(&self, index: usize) -> Option<GeneratedImage> {
        self.lock().images.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<GeneratedImage> {
        self.lock().images.clone()
    }

    /// One caption line per grid cell.
    pub fn thumbnails(&self) -> Vec<String> {
        self.lock()
            .images
            .iter()
            .enumerate()
            .map(|(i, image)| thumbnail_caption(i, image))
            .collect()
    }
}

pub fn thumbnail_caption(index: usize, image: &GeneratedImage) -> String {
    let prompt: String = image.prompt.chars().take(48).collect();
    let ellipsis = if image.prompt.chars().count() > 48 { "…" } else { "" };
    let seed = image
        .seed
        .map(|s| format!(" seed:{}", s))
        .unwrap_or_default();
    let source = if image.source_image.is_some() { " [img2img]" } else { "" };
    format!(
        "{:>3}. {}{} ({}x{}{}){}",
        index + 1,
        prompt,
        ellipsis,
        image.width,
        image.height,
        seed,
        source
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SavedImages {
    List(Vec<GeneratedImage>),
    Page { saved_images: Vec<GeneratedImage> },
}

/// Parses the page's `saved_images` data: either the bare array or an object
/// holding it under `saved_images`.
pub fn parse_saved_images(json: &str) -> Result<Vec<GeneratedImage>> {
    let saved: SavedImages = serde_json::from_str(json)
        .map_err(|e| ImagineError::SerializationError(format!("saved images: {}", e)))?;
    Ok(match saved {
        SavedImages::List(images) => images,
        SavedImages::Page { saved_images } => saved_images,
    })
}

pub async fn read_saved_images(path: impl AsRef<Path>) -> Result<Vec<GeneratedImage>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ImagineError::IoError(format!("{}: {}", path.display(), e)))?;
    parse_saved_images(&json)
}
