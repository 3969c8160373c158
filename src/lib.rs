//! Client for the imagine text-to-image backend.
//!
//! The crate owns the client-side state of a generation session: settings,
//! an optional image prompt, a simulated progress bar, the results gallery
//! and a keyboard-driven preview. Rendering goes through the [`Ui`] trait and
//! the backend through [`ImagineBackend`], so any host (a page, a terminal,
//! a test) can drive the same controllers.

pub mod app;
pub mod client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod events;
pub mod logger;
pub mod models;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use app::ImagineApp;
pub use client::{ImagineBackend, ImagineClient};
pub use config::{ImagineConfig, ProgressConfig};
pub use controllers::{
    GenerationController, PreviewFrame, PreviewModal, ProgressEstimator, ResultsGallery,
    SettingsStore, UploadController, UploadState,
};
pub use error::{ImagineError, Result};
pub use events::{EventBus, Key, Subscription};
pub use models::*;
pub use ui::{LogUi, Ui};
