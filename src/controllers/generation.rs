use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::ImagineBackend;
use crate::controllers::{ProgressEstimator, ResultsGallery, SettingsStore, UploadController};
use crate::error::{ImagineError, Result};
use crate::logger::timer;
use crate::models::{GenerateRequest, GeneratedImage, GenerationSettings};
use crate::ui::Ui;

const GENERIC_GENERATION_ERROR: &str = "Error generating images. Please try again.";
const EMPTY_PROMPT: &str = "Please enter a prompt.";

/// Clears the busy flag and re-enables the submit control however the
/// request ends.
struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
    ui: &'a dyn Ui,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.ui.set_generate_enabled(true);
    }
}

/// Drives one generation request at a time from prompt to gallery.
#[derive(Clone)]
pub struct GenerationController {
    backend: Arc<dyn ImagineBackend>,
    settings: SettingsStore,
    upload: UploadController,
    progress: ProgressEstimator,
    gallery: ResultsGallery,
    ui: Arc<dyn Ui>,
    is_generating: Arc<AtomicBool>,
    display_delay: Duration,
}

impl GenerationController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<dyn ImagineBackend>,
        settings: SettingsStore,
        upload: UploadController,
        progress: ProgressEstimator,
        gallery: ResultsGallery,
        ui: Arc<dyn Ui>,
        display_delay: Duration,
    ) -> Self {
        Self {
            backend,
            settings,
            upload,
            progress,
            gallery,
            ui,
            is_generating: Arc::new(AtomicBool::new(false)),
            display_delay,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating.load(Ordering::SeqCst)
    }

    /// Submits `prompt` with the current settings and attached image.
    /// Returns how many images were added to the gallery.
    pub async fn generate(&self, prompt: &str) -> Result<usize> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.ui.alert(EMPTY_PROMPT);
            return Err(ImagineError::ValidationError(EMPTY_PROMPT.into()));
        }

        if self
            .is_generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Generation already in progress, ignoring submit");
            return Err(ImagineError::Busy);
        }
        self.ui.set_generate_enabled(false);
        let _guard = SubmitGuard {
            flag: &self.is_generating,
            ui: self.ui.as_ref(),
        };

        let settings = self.settings.current();
        let source = self.upload.source_filename();
        let request = GenerateRequest::new(prompt, &settings, source);

        self.progress
            .start(self.progress.estimate(settings.batch_size, settings.step_count));

        let _timer = timer("generate");
        match self.submit(&request, &settings).await {
            Ok(images) => {
                self.progress.stop().await;
                tokio::time::sleep(self.display_delay).await;

                let count = images.len();
                self.gallery.prepend(images);
                // Only the image that went out with this request is spent.
                if let Some(filename) = &request.image {
                    self.upload.clear_if(filename);
                }
                log::info!("Generated {} image(s) for '{}'", count, prompt);
                Ok(count)
            }
            Err(e) => {
                self.progress.cancel();
                log::error!("Generation failed: {}", e);
                self.ui.alert(&e.user_message(GENERIC_GENERATION_ERROR));
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        request: &GenerateRequest,
        settings: &GenerationSettings,
    ) -> Result<Vec<GeneratedImage>> {
        let response = self.backend.generate(request).await?;

        if !response.success {
            return Err(ImagineError::GenerationError(
                response
                    .error
                    .unwrap_or_else(|| GENERIC_GENERATION_ERROR.to_string()),
            ));
        }
        let images = response.images.ok_or_else(|| {
            ImagineError::ResponseError("generate response carried no images".into())
        })?;

        Ok(images
            .into_iter()
            .map(|image| image.into_generated(request, settings))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgressConfig;
    use crate::models::{GenerateResponse, SettingsUpdate, UploadResponse};
    use crate::testing::{image, png, returned, MockBackend, RecordingUi, UiEvent};

    struct Harness {
        backend: Arc<MockBackend>,
        ui: Arc<RecordingUi>,
        settings: SettingsStore,
        upload: UploadController,
        gallery: ResultsGallery,
        progress: ProgressEstimator,
        generation: GenerationController,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MockBackend::default());
        let ui = Arc::new(RecordingUi::default());
        let settings = SettingsStore::default().with_model("qwen-image");
        let upload = UploadController::new(backend.clone(), ui.clone());
        let gallery = ResultsGallery::new(ui.clone());
        let progress = ProgressEstimator::new(ProgressConfig::default(), ui.clone());
        let generation = GenerationController::new(
            backend.clone(),
            settings.clone(),
            upload.clone(),
            progress.clone(),
            gallery.clone(),
            ui.clone(),
            Duration::from_millis(500),
        );
        Harness {
            backend,
            ui,
            settings,
            upload,
            gallery,
            progress,
            generation,
        }
    }

    fn success(images: Vec<crate::models::ReturnedImage>) -> GenerateResponse {
        GenerateResponse {
            success: true,
            images: Some(images),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_blank_prompt_never_hits_network() {
        let h = harness();
        for prompt in ["", "   ", "\n\t"] {
            let err = h.generation.generate(prompt).await.unwrap_err();
            assert!(matches!(err, ImagineError::ValidationError(_)));
        }
        assert_eq!(h.backend.generate_calls(), 0);
        assert_eq!(h.ui.alerts().len(), 3);
        assert!(!h.generation.is_generating());
        // The submit control never toggles for a rejected prompt.
        assert!(!h
            .ui
            .events()
            .iter()
            .any(|e| matches!(e, UiEvent::GenerateEnabled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_red_fox_batch_prepends_before_saved() {
        let h = harness();
        h.gallery.load_initial(vec![image("saved1"), image("saved2")]);
        h.settings
            .update(SettingsUpdate::new().batch_size("2").seed("42"));
        h.backend.push_generate(Ok(success(vec![
            returned("fox1", "a red fox", 42),
            returned("fox2", "a red fox", 42),
        ])));

        let added = h.generation.generate("a red fox").await.unwrap();
        assert_eq!(added, 2);

        let images = h.gallery.snapshot();
        assert_eq!(images.len(), 4);
        assert_eq!(images[0].url, "/generated/fox1.png");
        assert_eq!(images[1].url, "/generated/fox2.png");
        assert_eq!(images[2].url, "/generated/saved1.png");
        for fresh in &images[..2] {
            assert_eq!(fresh.seed, Some(42));
            assert_eq!(fresh.prompt, "a red fox");
            assert_eq!(fresh.model, "qwen-image");
            assert_eq!(fresh.settings.as_ref().map(|s| s.batch_size), Some(2));
        }

        let request = h.backend.last_generate().unwrap();
        assert_eq!(request.batch_size, 2);
        assert_eq!(request.seed, Some(42));
        assert_eq!(request.model, "qwen-image");
        assert!(request.image.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_completes_before_images_show() {
        let h = harness();
        h.backend
            .push_generate(Ok(success(vec![returned("one", "lake", 7)])));

        h.generation.generate("lake").await.unwrap();

        let events = h.ui.events();
        let full = events.iter().position(|e| *e == UiEvent::Progress(100)).unwrap();
        let hidden = events.iter().position(|e| *e == UiEvent::ProgressHidden).unwrap();
        let shown = events.iter().position(|e| *e == UiEvent::Gallery(1)).unwrap();
        assert!(full < hidden && hidden < shown);
        assert_eq!(events.first(), Some(&UiEvent::GenerateEnabled(false)));
        assert_eq!(events.last(), Some(&UiEvent::GenerateEnabled(true)));
        assert!(!h.progress.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_surfaces_and_returns_idle() {
        let h = harness();
        h.gallery.load_initial(vec![image("saved")]);
        h.backend.push_generate(Ok(GenerateResponse {
            success: false,
            images: None,
            error: Some("error=CUDA out of memory".into()),
        }));

        let err = h.generation.generate("a castle").await.unwrap_err();
        assert!(matches!(err, ImagineError::GenerationError(_)));
        assert_eq!(h.ui.alerts(), vec!["error=CUDA out of memory".to_string()]);
        assert_eq!(h.gallery.len(), 1);
        assert!(!h.generation.is_generating());
        assert!(!h.ui.events().contains(&UiEvent::Progress(100)));
        assert_eq!(h.ui.events().last(), Some(&UiEvent::GenerateEnabled(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_and_malformed_failures() {
        let h = harness();
        h.backend
            .push_generate(Err(ImagineError::RequestError("connection reset".into())));
        h.backend.push_generate(Ok(GenerateResponse {
            success: true,
            images: None,
            error: None,
        }));

        assert!(h.generation.generate("one").await.is_err());
        assert!(h.generation.generate("two").await.is_err());
        assert_eq!(
            h.ui.alerts(),
            vec![GENERIC_GENERATION_ERROR.to_string(), GENERIC_GENERATION_ERROR.to_string()]
        );
        assert_eq!(h.backend.generate_calls(), 2);
        assert!(h.gallery.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submit_rejected() {
        let h = harness();
        h.backend.push_generate_delayed(
            Duration::from_secs(5),
            Ok(success(vec![returned("slow", "slow", 1)])),
        );

        let (first, second) = tokio::join!(h.generation.generate("slow"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(h.generation.is_generating());
            h.generation.generate("impatient").await
        });

        assert_eq!(first.unwrap(), 1);
        assert!(matches!(second, Err(ImagineError::Busy)));
        assert_eq!(h.backend.generate_calls(), 1);
        assert!(h.ui.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_image_sent_then_cleared() {
        let h = harness();
        h.backend.push_upload(Ok(UploadResponse {
            success: true,
            filename: Some("cat-src.png".into()),
            error: None,
        }));
        h.backend
            .push_generate(Ok(success(vec![returned("cat", "cat in a hat", 0)])));

        h.upload.attach(png("cat.png")).await.unwrap();
        h.generation.generate("cat in a hat").await.unwrap();

        let request = h.backend.last_generate().unwrap();
        assert_eq!(request.image.as_deref(), Some("cat-src.png"));
        assert!(!h.upload.has_image());
        assert_eq!(
            h.gallery.get(0).and_then(|i| i.source_image),
            Some("cat-src.png".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_generation_keeps_source_image() {
        let h = harness();
        h.backend.push_upload(Ok(UploadResponse {
            success: true,
            filename: Some("keep.png".into()),
            error: None,
        }));
        h.backend.push_generate(Ok(GenerateResponse {
            success: false,
            images: None,
            error: None,
        }));

        h.upload.attach(png("keep.png")).await.unwrap();
        assert!(h.generation.generate("retry me").await.is_err());
        assert!(h.upload.has_image());
        assert_eq!(h.ui.alerts(), vec![GENERIC_GENERATION_ERROR.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_attached_mid_generation_survives() {
        let h = harness();
        h.backend.push_upload(Ok(UploadResponse {
            success: true,
            filename: Some("first.png".into()),
            error: None,
        }));
        h.backend.push_upload(Ok(UploadResponse {
            success: true,
            filename: Some("second.png".into()),
            error: None,
        }));
        h.backend.push_generate_delayed(
            Duration::from_secs(5),
            Ok(success(vec![returned("edit", "edit", 3)])),
        );

        h.upload.attach(png("first.png")).await.unwrap();
        let (generated, _) = tokio::join!(h.generation.generate("edit"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.upload.attach(png("second.png")).await.unwrap();
        });

        assert_eq!(generated.unwrap(), 1);
        let request = h.backend.last_generate().unwrap();
        assert_eq!(request.image.as_deref(), Some("first.png"));
        assert_eq!(h.upload.source_filename().as_deref(), Some("second.png"));
    }
}
