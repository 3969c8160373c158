use serde::{Deserialize, Serialize};

use super::common::null_as_default;
use super::settings::{GenerationSettings, DEFAULT_DIMENSION};

/// Body of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub batch_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub negative_prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    /// Filename of an uploaded source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl GenerateRequest {
    pub fn new(
        prompt: impl Into<String>,
        settings: &GenerationSettings,
        source_image: Option<String>,
    ) -> Self {
        GenerateRequest {
            prompt: prompt.into(),
            batch_size: settings.batch_size,
            seed: settings.seed.filter(|seed| *seed != 0),
            guidance_scale: settings.guidance_scale,
            num_inference_steps: settings.step_count,
            negative_prompt: settings.negative_prompt.clone(),
            model: settings.model_name.clone(),
            width: settings.width,
            height: settings.height,
            image: source_image,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub success: bool,
    pub images: Option<Vec<ReturnedImage>>,
    pub error: Option<String>,
}

/// One entry of a `/generate` response. The backend echoes its whole
/// settings payload; only what the gallery needs is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnedImage {
    pub url: String,
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub source_image: Option<String>,
}

impl ReturnedImage {
    /// Tags the backend record with the request it answered.
    pub fn into_generated(
        self,
        request: &GenerateRequest,
        settings: &GenerationSettings,
    ) -> GeneratedImage {
        let prompt = if self.prompt.is_empty() {
            request.prompt.clone()
        } else {
            self.prompt
        };
        GeneratedImage {
            url: self.url,
            filename: self.filename,
            prompt,
            seed: self.seed.or(request.seed),
            model: settings.model_name.clone(),
            width: self.width.unwrap_or(request.width),
            height: self.height.unwrap_or(request.height),
            source_image: self.source_image.or_else(|| request.image.clone()),
            settings: Some(settings.clone()),
        }
    }
}

fn default_dimension() -> u32 {
    DEFAULT_DIMENSION
}

/// A gallery entry. Records persisted by earlier sessions carry no settings
/// snapshot and may miss model and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub settings: Option<GenerationSettings>,
}

impl GeneratedImage {
    /// Where the source image of an image-prompted generation is served.
    pub fn source_image_url(&self) -> Option<String> {
        self.source_image
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| format!("/uploads/{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            batch_size: 2,
            seed: Some(42),
            model_name: "qwen-image".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let mut s = settings();
        s.seed = Some(0);
        let body = serde_json::to_value(GenerateRequest::new("a red fox", &s, None)).unwrap();
        assert_eq!(body.get("seed"), None);
        assert_eq!(body.get("image"), None);
        assert_eq!(body["batch_size"], 2);
        assert_eq!(body["num_inference_steps"], 50);
        assert_eq!(body["model"], "qwen-image");
    }

    #[test]
    fn test_request_carries_seed_and_source() {
        let body = serde_json::to_value(GenerateRequest::new(
            "a red fox",
            &settings(),
            Some("abc.png".into()),
        ))
        .unwrap();
        assert_eq!(body["seed"], 42);
        assert_eq!(body["image"], "abc.png");
        assert_eq!(body["width"], 1024);
    }

    #[test]
    fn test_error_response_defaults_success() {
        let response: GenerateResponse =
            serde_json::from_value(json!({"error": "No inputs provided."})).unwrap();
        assert!(!response.success);
        assert!(response.images.is_none());
        assert_eq!(response.error.as_deref(), Some("No inputs provided."));
    }

    #[test]
    fn test_returned_image_tagged_with_settings() {
        let s = settings();
        let request = GenerateRequest::new("a red fox", &s, None);
        let returned: ReturnedImage = serde_json::from_value(json!({
            "url": "/generated/a_red_fox_1234.png",
            "filename": "a_red_fox_1234.png",
            "prompt": "a red fox",
            "seed": 42,
            "batch": 2,
            "settings": {"prompt": "a red fox"}
        }))
        .unwrap();
        let image = returned.into_generated(&request, &s);
        assert_eq!(image.model, "qwen-image");
        assert_eq!(image.width, 1024);
        assert_eq!(image.settings, Some(s));
        assert_eq!(image.source_image_url(), None);
    }

    #[test]
    fn test_saved_record_tolerates_nulls() {
        let image: GeneratedImage = serde_json::from_value(json!({
            "filename": "x.png",
            "filepath": "/srv/outputs/generated/x.png",
            "url": "/generated/x.png",
            "prompt": null,
            "seed": null,
            "source_image": "up.png"
        }))
        .unwrap();
        assert_eq!(image.prompt, "");
        assert_eq!(image.height, 1024);
        assert!(image.settings.is_none());
        assert_eq!(image.source_image_url().as_deref(), Some("/uploads/up.png"));
    }
}
