pub mod common;
pub mod image;
pub mod settings;
pub mod upload;

pub use common::*;
pub use image::*;
pub use settings::*;
pub use upload::*;
