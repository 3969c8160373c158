use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{DEFAULT_MAX_BATCH_SIZE, MAX_BATCH_SIZE_LIMIT};

/// Timing knobs for the simulated progress bar.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Seconds a single-image, 50-step generation is expected to take.
    pub base_seconds: f32,
    pub tick: Duration,
    /// How long the bar sits at 100% before it is hidden.
    pub completion_hold: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            base_seconds: 20.0,
            tick: Duration::from_millis(100),
            completion_hold: Duration::from_millis(500),
        }
    }
}

impl ProgressConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_seconds(mut self, seconds: f32) -> Self {
        self.base_seconds = seconds;
        self
    }

    pub fn with_completion_hold(mut self, hold: Duration) -> Self {
        self.completion_hold = hold;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ImagineConfig {
    pub base_url: String,
    /// Model name used until `/model-info` answers.
    pub default_model: String,
    pub max_batch_size: u32,
    pub progress: ProgressConfig,
    /// Pause between the bar completing and the new images showing up.
    pub display_delay: Duration,
    pub saved_images_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub log_level: Option<String>,
    /// `development` or `production` logger preset.
    pub log_profile: Option<String>,
    pub log_json: Option<bool>,
    pub log_file: Option<String>,
}

impl Default for ImagineConfig {
    fn default() -> Self {
        ImagineConfig {
            base_url: "http://127.0.0.1:5000".to_string(),
            default_model: "qwen-image".to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            progress: ProgressConfig::default(),
            display_delay: Duration::from_millis(500),
            saved_images_path: None,
            output_dir: PathBuf::from("downloads"),
            log_level: None,
            log_profile: None,
            log_json: None,
            log_file: None,
        }
    }
}

impl ImagineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("IMAGINE_BASE_URL").unwrap_or(defaults.base_url);
        let default_model = env::var("IMAGINE_MODEL").unwrap_or(defaults.default_model);
        let max_batch_size = env::var("IMAGINE_MAX_BATCH")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(defaults.max_batch_size, |n: u32| {
                n.clamp(1, MAX_BATCH_SIZE_LIMIT)
            });
        let base_seconds = env::var("IMAGINE_ESTIMATE_BASE_SECS")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(defaults.progress.base_seconds);
        let saved_images_path = env::var("IMAGINE_SAVED_IMAGES").ok().map(PathBuf::from);
        let output_dir = env::var("IMAGINE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let log_level = env::var("IMAGINE_LOG_LEVEL").ok();
        let log_profile = env::var("IMAGINE_LOG_PROFILE").ok();
        let log_json = env::var("IMAGINE_LOG_JSON").ok().and_then(|s| parse_flag(&s));
        let log_file = env::var("IMAGINE_LOG_FILE").ok().filter(|s| !s.trim().is_empty());

        ImagineConfig {
            base_url,
            default_model,
            max_batch_size,
            progress: defaults.progress.with_base_seconds(base_seconds),
            display_delay: defaults.display_delay,
            saved_images_path,
            output_dir,
            log_level,
            log_profile,
            log_json,
            log_file,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_max_batch_size(mut self, max: u32) -> Self {
        self.max_batch_size = max.clamp(1, MAX_BATCH_SIZE_LIMIT);
        self
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_display_delay(mut self, delay: Duration) -> Self {
        self.display_delay = delay;
        self
    }

    pub fn with_saved_images(mut self, path: impl Into<PathBuf>) -> Self {
        self.saved_images_path = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
