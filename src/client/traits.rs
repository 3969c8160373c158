use crate::{
    error::Result,
    models::{GenerateRequest, GenerateResponse, ModelInfo, UploadFile, UploadResponse},
};
use async_trait::async_trait;

/// The REST surface of the imagine backend.
#[async_trait]
pub trait ImagineBackend: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse>;
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
    async fn model_info(&self) -> Result<ModelInfo>;

    /// Downloads a served asset, either an absolute URL or a backend path
    /// such as `/generated/<filename>`.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}
