pub mod image_client;
pub mod model_client;
pub mod traits;
pub mod upload_client;

use crate::{
    config::ImagineConfig,
    error::{ImagineError, Result},
    models::{GenerateRequest, GenerateResponse, ModelInfo, UploadFile, UploadResponse},
};
use async_trait::async_trait;
use reqwest::{Client, Url};

pub use image_client::ImageClient;
pub use model_client::ModelClient;
pub use traits::ImagineBackend;
pub use upload_client::UploadClient;

#[derive(Clone)]
pub struct ImagineClient {
    base_url: Url,
    image_client: ImageClient,
    upload_client: UploadClient,
    model_client: ModelClient,
}

impl ImagineClient {
    pub fn new(config: &ImagineConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .user_agent(concat!("imagine-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImagineError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            image_client: ImageClient::new(client.clone(), base_url.clone()),
            upload_client: UploadClient::new(client.clone(), base_url.clone()),
            model_client: ModelClient::new(client, base_url.clone()),
            base_url,
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn upload(&self) -> &UploadClient {
        &self.upload_client
    }

    pub fn model(&self) -> &ModelClient {
        &self.model_client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves backend paths like `/generated/x.png` against the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        resolve_url(&self.base_url, url)
    }
}

#[async_trait]
impl ImagineBackend for ImagineClient {
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        self.upload_client.upload(file).await
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.image_client.generate(request).await
    }

    async fn model_info(&self) -> Result<ModelInfo> {
        self.model_client.info().await
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.image_client.fetch(url).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // A base without a trailing slash would have its last segment replaced
    // by `join`.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ImagineError::ConfigError(format!("invalid base URL '{}': {}", raw, e)))
}

pub(crate) fn resolve_url(base: &Url, url: &str) -> Result<Url> {
    if let Ok(absolute) = Url::parse(url) {
        return Ok(absolute);
    }
    base.join(url.trim_start_matches('/'))
        .map_err(|e| ImagineError::RequestError(format!("invalid URL '{}': {}", url, e)))
}
