use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{EventBus, Key, Subscription};
use crate::models::GeneratedImage;
use crate::ui::Ui;

/// What the viewer shows for the current position.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    pub index: usize,
    pub total: usize,
    pub image: GeneratedImage,
    pub source_image_url: Option<String>,
}

struct PreviewState {
    images: Vec<GeneratedImage>,
    index: usize,
}

impl PreviewState {
    fn frame(&self) -> Option<PreviewFrame> {
        if self.images.is_empty() {
            log::error!("Preview opened without images");
            return None;
        }
        let Some(image) = self.images.get(self.index) else {
            log::error!(
                "Preview index {} out of range for {} image(s)",
                self.index,
                self.images.len()
            );
            return None;
        };
        Some(PreviewFrame {
            index: self.index,
            total: self.images.len(),
            image: image.clone(),
            source_image_url: image.source_image_url(),
        })
    }

    fn previous(&mut self) {
        if self.images.is_empty() {
            return;
        }
        self.index = if self.index == 0 || self.index >= self.images.len() {
            self.images.len() - 1
        } else {
            self.index - 1
        };
    }

    fn next(&mut self) {
        if self.images.is_empty() {
            return;
        }
        self.index = if self.index + 1 >= self.images.len() {
            0
        } else {
            self.index + 1
        };
    }
}

/// Full-screen viewer over an externally owned image list.
///
/// The modal listens for keys only while it exists: mounting subscribes to
/// the key bus, dropping the modal unsubscribes. Closing is the owner's job;
/// `Escape` just calls `on_close`.
pub struct PreviewModal {
    state: Arc<Mutex<PreviewState>>,
    ui: Arc<dyn Ui>,
    _keys: Subscription,
}

fn lock(state: &Mutex<PreviewState>) -> MutexGuard<'_, PreviewState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl PreviewModal {
    pub fn mount<F>(
        keys: &EventBus<Key>,
        images: Vec<GeneratedImage>,
        index: usize,
        ui: Arc<dyn Ui>,
        on_close: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(PreviewState { images, index }));

        let listener_state = Arc::clone(&state);
        let listener_ui = Arc::clone(&ui);
        let subscription = keys.subscribe(move |key| {
            let frame = {
                let mut state = lock(&listener_state);
                match key {
                    Key::ArrowLeft => state.previous(),
                    Key::ArrowRight => state.next(),
                    Key::Escape => {
                        drop(state);
                        on_close();
                        return;
                    }
                    Key::Other(_) => return,
                }
                state.frame()
            };
            if let Some(frame) = frame {
                listener_ui.render_preview(&frame);
            }
        });

        let modal = Self {
            state,
            ui,
            _keys: subscription,
        };
        modal.render();
        modal
    }

    /// Current frame, or `None` (logged) when there is nothing valid to show.
    pub fn frame(&self) -> Option<PreviewFrame> {
        lock(&self.state).frame()
    }

    pub fn render(&self) -> Option<PreviewFrame> {
        let frame = self.frame()?;
        self.ui.render_preview(&frame);
        Some(frame)
    }

    pub fn index(&self) -> usize {
        lock(&self.state).index
    }
}
