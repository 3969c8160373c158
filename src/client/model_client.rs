use crate::{
    client::resolve_url,
    error::{ImagineError, Result},
    models::ModelInfo,
};
use reqwest::{Client, Url};

#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    base_url: Url,
}

impl ModelClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Name of the model the backend currently routes requests to.
    pub async fn info(&self) -> Result<ModelInfo> {
        let url = resolve_url(&self.base_url, "/model-info")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImagineError::RequestError(format!("model-info request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ImagineError::ResponseError(format!(
                "model-info answered {}",
                response.status()
            )));
        }

        response
            .json::<ModelInfo>()
            .await
            .map_err(|e| ImagineError::ResponseError(format!("malformed model info: {}", e)))
    }
}
