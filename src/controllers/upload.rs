use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::ImagineBackend;
use crate::error::{ImagineError, Result};
use crate::logger::timer;
use crate::models::{SourceImage, UploadFile};
use crate::ui::Ui;

const GENERIC_UPLOAD_ERROR: &str = "Error uploading image. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Empty,
    Uploading,
    Attached(SourceImage),
}

struct UploadSlot {
    state: UploadState,
    /// Bumped by every attach and clear; an upload resolving under an older
    /// epoch was superseded and is dropped.
    epoch: u64,
}

/// Lifecycle of the optional image prompt.
#[derive(Clone)]
pub struct UploadController {
    slot: Arc<Mutex<UploadSlot>>,
    backend: Arc<dyn ImagineBackend>,
    ui: Arc<dyn Ui>,
}

impl UploadController {
    pub fn new(backend: Arc<dyn ImagineBackend>, ui: Arc<dyn Ui>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(UploadSlot {
                state: UploadState::Empty,
                epoch: 0,
            })),
            backend,
            ui,
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadSlot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Uploads `file` and attaches it as the image prompt. A newer `attach`
    /// or a `clear` issued before this one resolves wins.
    pub async fn attach(&self, file: UploadFile) -> Result<SourceImage> {
        let epoch = {
            let mut slot = self.lock();
            slot.epoch += 1;
            slot.state = UploadState::Uploading;
            slot.epoch
        };

        let _timer = timer("upload");
        let outcome = match self.backend.upload(file.clone()).await {
            Ok(response) if response.success => match response.filename {
                Some(filename) if !filename.is_empty() => Ok(SourceImage {
                    filename,
                    local_preview_data_url: file.data_url(),
                }),
                _ => Err(ImagineError::ResponseError(
                    "upload response carried no filename".into(),
                )),
            },
            Ok(response) => Err(ImagineError::UploadError(
                response
                    .error
                    .unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string()),
            )),
            Err(e) => Err(e),
        };

        let mut slot = self.lock();
        if slot.epoch != epoch {
            log::debug!("Discarding superseded upload of {}", file.name);
            return Err(ImagineError::UploadError(
                "upload superseded by a newer selection".into(),
            ));
        }

        match outcome {
            Ok(source) => {
                slot.state = UploadState::Attached(source.clone());
                drop(slot);
                log::info!("Attached {} as {}", file.name, source.filename);
                self.ui.show_source_preview(&source);
                Ok(source)
            }
            Err(e) => {
                slot.state = UploadState::Empty;
                drop(slot);
                log::error!("Upload of {} failed: {}", file.name, e);
                self.ui.clear_source_preview();
                self.ui.reset_file_picker();
                self.ui.alert(&e.user_message(GENERIC_UPLOAD_ERROR));
                Err(e)
            }
        }
    }

    /// Reads a file from disk and attaches it. Non-image files are refused
    /// before anything is sent.
    pub async fn attach_path(&self, path: impl AsRef<Path>) -> Result<SourceImage> {
        let file = match UploadFile::from_path(path).await {
            Ok(file) => file,
            Err(e) => {
                self.ui.alert(&e.to_string());
                return Err(e);
            }
        };
        if !file.is_image() {
            let e = ImagineError::ValidationError(format!(
                "{} is not an image ({})",
                file.name, file.mime
            ));
            self.ui.alert(&e.user_message(GENERIC_UPLOAD_ERROR));
            return Err(e);
        }
        self.attach(file).await
    }

    /// Detaches the image prompt. Safe to call in any state.
    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.epoch += 1;
        if slot.state == UploadState::Empty {
            return;
        }
        slot.state = UploadState::Empty;
        drop(slot);
        self.cleared();
    }

    /// Detaches the image prompt only if `filename` is still the attached
    /// one. Returns whether anything was cleared.
    pub fn clear_if(&self, filename: &str) -> bool {
        let mut slot = self.lock();
        match &slot.state {
            UploadState::Attached(source) if source.filename == filename => {}
            _ => return false,
        }
        slot.epoch += 1;
        slot.state = UploadState::Empty;
        drop(slot);
        self.cleared();
        true
    }

    fn cleared(&self) {
        log::debug!("Source image cleared");
        self.ui.clear_source_preview();
        self.ui.reset_file_picker();
    }

    pub fn state(&self) -> UploadState {
        self.lock().state.clone()
    }

    pub fn source(&self) -> Option<SourceImage> {
        match &self.lock().state {
            UploadState::Attached(source) => Some(source.clone()),
            _ => None,
        }
    }

    pub fn source_filename(&self) -> Option<String> {
        self.source().map(|s| s.filename)
    }

    pub fn has_image(&self) -> bool {
        matches!(self.lock().state, UploadState::Attached(_))
    }

    pub fn is_uploading(&self) -> bool {
        self.lock().state == UploadState::Uploading
    }
}
