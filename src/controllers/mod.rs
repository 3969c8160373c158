pub mod gallery;
pub mod generation;
pub mod preview;
pub mod progress;
pub mod settings;
pub mod upload;

pub use gallery::{parse_saved_images, read_saved_images, ResultsGallery};
pub use generation::GenerationController;
pub use preview::{PreviewFrame, PreviewModal};
pub use progress::ProgressEstimator;
pub use settings::SettingsStore;
pub use upload::{UploadController, UploadState};
