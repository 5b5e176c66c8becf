//! HTTP client wrapper for the extraction service.
//!
//! Every tool forwards through here. The wrapper normalizes outcomes: a 2xx
//! response yields the body text, a non-2xx response or transport failure
//! yields a `ToolError` that the registry flattens into tool-result text.
//! No retries — failed calls surface to the model as-is.

use parley_core::error::ToolError;
use tracing::debug;

/// One shared client per registry; cheap to clone.
#[derive(Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a path with query parameters, returning the response body text.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "extraction service GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        Self::read_body(response).await
    }

    /// POST a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "extraction service POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        Self::read_body(response).await
    }

    /// POST with query parameters only (e.g. `file_url` uploads).
    pub async fn post_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "extraction service POST");

        let response = self
            .client
            .post(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        Self::read_body(response).await
    }

    /// POST a file as a multipart part named `file`.
    pub async fn post_multipart(
        &self,
        path: &str,
        query: &[(&str, String)],
        filename: String,
        data: Vec<u8>,
    ) -> Result<String, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, %filename, bytes = data.len(), "extraction service multipart POST");

        let part = reqwest::multipart::Part::bytes(data).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .query(query)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        Self::read_body(response).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str) -> Result<String, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "extraction service DELETE");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ToolError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ToolError::Upstream { status, body });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ServiceClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
