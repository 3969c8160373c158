//! Composition root: one explicitly constructed object owning all session
//! state.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::ImagineBackend;
use crate::config::ImagineConfig;
use crate::controllers::{
    read_saved_images, GenerationController, PreviewModal, ProgressEstimator, ResultsGallery,
    SettingsStore, UploadController,
};
use crate::error::{ImagineError, Result};
use crate::events::{EventBus, Key};
use crate::models::GeneratedImage;
use crate::ui::Ui;

type PreviewSlot = Arc<Mutex<Option<PreviewModal>>>;

#[derive(Clone)]
pub struct ImagineApp {
    config: ImagineConfig,
    backend: Arc<dyn ImagineBackend>,
    ui: Arc<dyn Ui>,
    settings: SettingsStore,
    upload: UploadController,
    progress: ProgressEstimator,
    gallery: ResultsGallery,
    generation: GenerationController,
    keys: EventBus<Key>,
    preview: PreviewSlot,
}

fn lock_slot(slot: &Mutex<Option<PreviewModal>>) -> MutexGuard<'_, Option<PreviewModal>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Last path component of a server-supplied filename, so a download always
/// lands directly inside the output directory.
fn output_file_name(filename: &str) -> Result<&OsStr> {
    match Path::new(filename).file_name() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ImagineError::ValidationError(format!(
            "cannot save image with filename '{}'",
            filename
        ))),
    }
}

impl ImagineApp {
    pub fn new(config: ImagineConfig, backend: Arc<dyn ImagineBackend>, ui: Arc<dyn Ui>) -> Self {
        let settings =
            SettingsStore::new(config.max_batch_size).with_model(config.default_model.clone());
        let upload = UploadController::new(Arc::clone(&backend), Arc::clone(&ui));
        let progress = ProgressEstimator::new(config.progress.clone(), Arc::clone(&ui));
        let gallery = ResultsGallery::new(Arc::clone(&ui));
        let generation = GenerationController::new(
            Arc::clone(&backend),
            settings.clone(),
            upload.clone(),
            progress.clone(),
            gallery.clone(),
            Arc::clone(&ui),
            config.display_delay,
        );

        Self {
            config,
            backend,
            ui,
            settings,
            upload,
            progress,
            gallery,
            generation,
            keys: EventBus::new(),
            preview: Arc::new(Mutex::new(None)),
        }
    }

    /// Page-load work: ask the backend which model is active and seed the
    /// gallery. Neither failure is fatal.
    pub async fn start(&self, saved_images: Vec<GeneratedImage>) {
        match self.backend.model_info().await {
            Ok(info) => {
                log::info!("Active model: {}", info.model);
                self.settings.set_model_name(info.model);
            }
            Err(e) => log::warn!(
                "Could not fetch model info, keeping '{}': {}",
                self.settings.current().model_name,
                e
            ),
        }
        self.gallery.load_initial(saved_images);
        self.ui.set_generate_enabled(true);
    }

    /// Saved images from the configured file, or none.
    pub async fn saved_images(&self) -> Vec<GeneratedImage> {
        let Some(path) = &self.config.saved_images_path else {
            return Vec::new();
        };
        match read_saved_images(path).await {
            Ok(images) => images,
            Err(e) => {
                log::error!("Saved images unavailable: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<usize> {
        self.generation.generate(prompt).await
    }

    /// Opens the viewer at a gallery position. Returns whether it opened.
    pub fn open_preview(&self, index: usize) -> bool {
        let images = self.gallery.snapshot();
        if index >= images.len() {
            log::error!("No image at position {}", index);
            return false;
        }

        let slot = Arc::downgrade(&self.preview);
        let ui = Arc::clone(&self.ui);
        let modal = PreviewModal::mount(&self.keys, images, index, Arc::clone(&self.ui), move || {
            if let Some(slot) = slot.upgrade() {
                lock_slot(&slot).take();
            }
            ui.close_preview();
        });
        // Replacing an open modal drops it, which unsubscribes its listener.
        *lock_slot(&self.preview) = Some(modal);
        true
    }

    /// Thumbnail click. Unknown URLs are ignored.
    pub fn open_preview_by_url(&self, url: &str) -> bool {
        match self.gallery.find_index_by_url(url) {
            Some(index) => self.open_preview(index),
            None => {
                log::debug!("Click on unknown image {}", url);
                false
            }
        }
    }

    pub fn close_preview(&self) {
        if lock_slot(&self.preview).take().is_some() {
            self.ui.close_preview();
        }
    }

    pub fn is_preview_open(&self) -> bool {
        lock_slot(&self.preview).is_some()
    }

    pub fn preview_index(&self) -> Option<usize> {
        lock_slot(&self.preview).as_ref().map(|m| m.index())
    }

    /// Feeds a key press to whatever is listening.
    pub fn key(&self, key: Key) {
        self.keys.emit(&key);
    }

    /// Downloads a gallery image into the output directory.
    pub async fn save_image(&self, index: usize) -> Result<PathBuf> {
        let image = self.gallery.get(index).ok_or_else(|| {
            ImagineError::ValidationError(format!("no image at position {}", index + 1))
        })?;
        let name = output_file_name(&image.filename)?;
        let bytes = self.backend.fetch_image(&image.url).await?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = self.config.output_dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        log::info!("Saved {}", path.display());
        Ok(path)
    }

    pub fn config(&self) -> &ImagineConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn upload(&self) -> &UploadController {
        &self.upload
    }

    pub fn progress(&self) -> &ProgressEstimator {
        &self.progress
    }

    pub fn gallery(&self) -> &ResultsGallery {
        &self.gallery
    }

    pub fn generation(&self) -> &GenerationController {
        &self.generation
    }

    pub fn keys(&self) -> &EventBus<Key> {
        &self.keys
    }
}
