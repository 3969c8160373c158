use crate::{
    client::resolve_url,
    error::{ImagineError, Result},
    models::{GenerateRequest, GenerateResponse},
};
use reqwest::{Client, Url};

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    base_url: Url,
}

impl ImageClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = resolve_url(&self.base_url, "/generate")?;

        log::info!(
            "Requesting {} image(s) from model: {}",
            request.batch_size,
            request.model
        );
        log::debug!(
            "Generate payload: {}",
            serde_json::to_string(request).unwrap_or_default()
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ImagineError::RequestError(format!("generate request failed: {}", e)))?;

        // Error statuses still carry a JSON `{error}` body worth surfacing.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ImagineError::ResponseError(e.to_string()))?;

        serde_json::from_str::<GenerateResponse>(&body).map_err(|e| {
            log::debug!("Unparseable generate response ({}): {}", status, body);
            ImagineError::ResponseError(format!("malformed generate response ({}): {}", status, e))
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = resolve_url(&self.base_url, url)?;
        log::debug!("Fetching image: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ImagineError::RequestError(format!("fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ImagineError::ResponseError(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImagineError::ResponseError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
