use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_BATCH_SIZE: u32 = 1;
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 4;
/// Upper bound any UI may raise the batch range to.
pub const MAX_BATCH_SIZE_LIMIT: u32 = 8;
pub const DEFAULT_GUIDANCE_SCALE: f32 = 4.0;
pub const DEFAULT_STEP_COUNT: u32 = 50;
pub const DEFAULT_DIMENSION: u32 = 1024;

/// Parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub batch_size: u32,
    pub seed: Option<i64>,
    pub guidance_scale: f32,
    pub step_count: u32,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub model_name: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            step_count: DEFAULT_STEP_COUNT,
            negative_prompt: String::new(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            model_name: String::new(),
        }
    }
}

/// Raw, not yet coerced field values as they come out of form inputs.
/// `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub batch_size: Option<String>,
    pub seed: Option<String>,
    pub guidance_scale: Option<String>,
    pub step_count: Option<String>,
    pub negative_prompt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub model_name: Option<String>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, raw: impl Into<String>) -> Self {
        self.batch_size = Some(raw.into());
        self
    }

    pub fn seed(mut self, raw: impl Into<String>) -> Self {
        self.seed = Some(raw.into());
        self
    }

    pub fn guidance_scale(mut self, raw: impl Into<String>) -> Self {
        self.guidance_scale = Some(raw.into());
        self
    }

    pub fn step_count(mut self, raw: impl Into<String>) -> Self {
        self.step_count = Some(raw.into());
        self
    }

    pub fn negative_prompt(mut self, raw: impl Into<String>) -> Self {
        self.negative_prompt = Some(raw.into());
        self
    }

    pub fn width(mut self, raw: impl Into<String>) -> Self {
        self.width = Some(raw.into());
        self
    }

    pub fn height(mut self, raw: impl Into<String>) -> Self {
        self.height = Some(raw.into());
        self
    }

    pub fn model_name(mut self, raw: impl Into<String>) -> Self {
        self.model_name = Some(raw.into());
        self
    }

    /// Update touching a single field.
    pub fn field(field: SettingsField, raw: impl Into<String>) -> Self {
        let update = Self::new();
        match field {
            SettingsField::BatchSize => update.batch_size(raw),
            SettingsField::Seed => update.seed(raw),
            SettingsField::GuidanceScale => update.guidance_scale(raw),
            SettingsField::StepCount => update.step_count(raw),
            SettingsField::NegativePrompt => update.negative_prompt(raw),
            SettingsField::Width => update.width(raw),
            SettingsField::Height => update.height(raw),
            SettingsField::ModelName => update.model_name(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    BatchSize,
    Seed,
    GuidanceScale,
    StepCount,
    NegativePrompt,
    Width,
    Height,
    ModelName,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[
            SettingsField::BatchSize,
            SettingsField::Seed,
            SettingsField::GuidanceScale,
            SettingsField::StepCount,
            SettingsField::NegativePrompt,
            SettingsField::Width,
            SettingsField::Height,
            SettingsField::ModelName,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsField::BatchSize => "batch",
            SettingsField::Seed => "seed",
            SettingsField::GuidanceScale => "guidance",
            SettingsField::StepCount => "steps",
            SettingsField::NegativePrompt => "negative",
            SettingsField::Width => "width",
            SettingsField::Height => "height",
            SettingsField::ModelName => "model",
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" | "batch_size" | "batch-size" => Ok(SettingsField::BatchSize),
            "seed" => Ok(SettingsField::Seed),
            "guidance" | "guidance_scale" | "cfg" => Ok(SettingsField::GuidanceScale),
            "steps" | "num_inference_steps" => Ok(SettingsField::StepCount),
            "negative" | "negative_prompt" => Ok(SettingsField::NegativePrompt),
            "width" => Ok(SettingsField::Width),
            "height" => Ok(SettingsField::Height),
            "model" => Ok(SettingsField::ModelName),
            other => Err(format!("unknown setting '{}'", other)),
        }
    }
}

/// Integer coercion in the spirit of a form's `parseInt`: leading sign and
/// digits count, a fractional part is truncated, anything else is rejected.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

pub fn coerce_batch_size(raw: &str, max: u32) -> u32 {
    let max = max.clamp(1, MAX_BATCH_SIZE_LIMIT);
    match parse_integer(raw) {
        Some(n) => n.clamp(1, max as i64) as u32,
        None => DEFAULT_BATCH_SIZE,
    }
}

/// Positive integer or the field default.
pub fn coerce_positive(raw: &str, default: u32) -> u32 {
    parse_integer(raw)
        .filter(|n| *n >= 1 && *n <= u32::MAX as i64)
        .map_or(default, |n| n as u32)
}

pub fn coerce_guidance(raw: &str) -> f32 {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|g| g.is_finite())
        .unwrap_or(DEFAULT_GUIDANCE_SCALE)
}

/// An empty or unparseable seed means "random"; so does 0, which the
/// backend treats as unset.
pub fn coerce_seed(raw: &str) -> Option<i64> {
    parse_integer(raw).filter(|seed| *seed != 0)
}
