//! The host surface controllers draw on.
//!
//! A browser page, a terminal or a test recorder implements [`Ui`]; the
//! controllers never know which. Everything except [`Ui::alert`] has a no-op
//! default so a host only overrides what it can actually show.

use crate::controllers::PreviewFrame;
use crate::models::{GeneratedImage, SourceImage};

pub trait Ui: Send + Sync {
    /// Blocking, user-facing error or validation message.
    fn alert(&self, message: &str);

    fn set_generate_enabled(&self, _enabled: bool) {}

    /// Percent in `0..=100`. It is an estimate, not backend progress.
    fn show_progress(&self, _percent: u8) {}

    fn hide_progress(&self) {}

    /// Drop zone switches to its has-image state.
    fn show_source_preview(&self, _image: &SourceImage) {}

    fn clear_source_preview(&self) {}

    /// Lets the same file be picked again.
    fn reset_file_picker(&self) {}

    fn render_gallery(&self, _images: &[GeneratedImage]) {}

    fn render_preview(&self, _frame: &PreviewFrame) {}

    fn close_preview(&self) {}
}

/// Logs alerts and ignores everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUi;

impl Ui for LogUi {
    fn alert(&self, message: &str) {
        log::warn!("{}", message);
    }
}
