use std::sync::{Arc, RwLock};

use crate::models::{
    coerce_batch_size, coerce_guidance, coerce_positive, coerce_seed, GenerationSettings,
    SettingsField, SettingsUpdate, DEFAULT_DIMENSION, DEFAULT_MAX_BATCH_SIZE, DEFAULT_STEP_COUNT,
};

/// Current generation parameters, shared between the settings panel and the
/// generation controller.
#[derive(Clone)]
pub struct SettingsStore {
    settings: Arc<RwLock<GenerationSettings>>,
    max_batch_size: u32,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCH_SIZE)
    }
}

impl SettingsStore {
    pub fn new(max_batch_size: u32) -> Self {
        Self {
            settings: Arc::new(RwLock::new(GenerationSettings::default())),
            max_batch_size,
        }
    }

    pub fn with_model(self, model_name: impl Into<String>) -> Self {
        self.set_model_name(model_name);
        self
    }

    pub fn max_batch_size(&self) -> u32 {
        self.max_batch_size
    }

    /// Merges the provided fields. Numbers that do not parse fall back to the
    /// field default; nothing here fails.
    pub fn update(&self, update: SettingsUpdate) {
        let mut settings = match self.settings.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(raw) = update.batch_size {
            settings.batch_size = coerce_batch_size(&raw, self.max_batch_size);
        }
        if let Some(raw) = update.seed {
            settings.seed = coerce_seed(&raw);
        }
        if let Some(raw) = update.guidance_scale {
            settings.guidance_scale = coerce_guidance(&raw);
        }
        if let Some(raw) = update.step_count {
            settings.step_count = coerce_positive(&raw, DEFAULT_STEP_COUNT);
        }
        if let Some(raw) = update.negative_prompt {
            settings.negative_prompt = raw;
        }
        if let Some(raw) = update.width {
            settings.width = coerce_positive(&raw, DEFAULT_DIMENSION);
        }
        if let Some(raw) = update.height {
            settings.height = coerce_positive(&raw, DEFAULT_DIMENSION);
        }
        if let Some(raw) = update.model_name {
            let name = raw.trim();
            if !name.is_empty() {
                settings.model_name = name.to_string();
            }
        }

        log::debug!("Settings now: {:?}", *settings);
    }

    pub fn set(&self, field: SettingsField, raw: impl Into<String>) {
        self.update(SettingsUpdate::field(field, raw));
    }

    pub fn set_model_name(&self, model_name: impl Into<String>) {
        self.update(SettingsUpdate::new().model_name(model_name));
    }

    /// Snapshot taken right before a request is built.
    pub fn current(&self) -> GenerationSettings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Back to defaults, keeping the active model.
    pub fn reset(&self) {
        let mut settings = match self.settings.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let model_name = std::mem::take(&mut settings.model_name);
        *settings = GenerationSettings {
            model_name,
            ..GenerationSettings::default()
        };
    }
}
