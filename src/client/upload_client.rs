use crate::{
    client::resolve_url,
    error::{ImagineError, Result},
    models::{UploadFile, UploadResponse},
};
use reqwest::{
    multipart::{Form, Part},
    Client, Url,
};

#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    base_url: Url,
}

impl UploadClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        let url = resolve_url(&self.base_url, "/upload")?;
        log::info!("Uploading {} ({} bytes)", file.name, file.bytes.len());

        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime)
            .map_err(|e| ImagineError::RequestError(format!("invalid MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImagineError::RequestError(format!("upload request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ImagineError::ResponseError(e.to_string()))?;

        serde_json::from_str::<UploadResponse>(&body).map_err(|e| {
            ImagineError::ResponseError(format!("malformed upload response ({}): {}", status, e))
        })
    }
}
