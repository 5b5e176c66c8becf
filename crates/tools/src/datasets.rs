//! Dataset-side tools: sheet extraction triggers and dataset lookups.

use crate::args::{optional_str, FileSource};
use crate::service_client::ServiceClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parley_core::error::ToolError;
use parley_core::tool::Tool;

/// `extract_sheet` — POST /extract-sheet.
pub struct ExtractSheetTool {
    client: ServiceClient,
}

impl ExtractSheetTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ExtractSheetTool {
    fn name(&self) -> &str {
        "extract_sheet"
    }

    fn description(&self) -> &str {
        "Start an asynchronous sheet extraction from CSV, Excel, or PDF tables. Provide \
         exactly one file source: file_path, file_url, or file_base64 with filename. \
         Returns immediately with the dataset id and status 'processing'; poll \
         get_dataset for completion."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path to a local file to upload" },
                "file_url": { "type": "string", "description": "URL the service should download the file from" },
                "file_base64": { "type": "string", "description": "Base64-encoded file bytes" },
                "filename": { "type": "string", "description": "Original filename, required with file_base64" },
                "config": { "type": "string", "description": "Extraction config name (service default applies)" },
                "ocr_provider": {
                    "type": "string",
                    "description": "OCR provider for PDF input",
                    "enum": ["docling", "mistral_ocr", "smol_docling"]
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let source = FileSource::from_args(&arguments)?;

        let mut query = Vec::new();
        if let Some(config) = optional_str(&arguments, "config") {
            query.push(("config", config.to_string()));
        }
        if let Some(provider) = optional_str(&arguments, "ocr_provider") {
            query.push(("ocr_provider", provider.to_string()));
        }

        let (filename, data) = match source {
            FileSource::Url(url) => {
                query.push(("file_url", url));
                return self.client.post_query("/extract-sheet", &query).await;
            }
            FileSource::Path(path) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    ToolError::InvalidArguments(format!("cannot read file '{path}': {e}"))
                })?;
                let filename = std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload.bin".into());
                (filename, data)
            }
            FileSource::Inline {
                filename,
                data_base64,
            } => {
                let data = BASE64.decode(data_base64.as_bytes()).map_err(|e| {
                    ToolError::InvalidArguments(format!("file_base64 is not valid base64: {e}"))
                })?;
                (filename, data)
            }
        };

        self.client
            .post_multipart("/extract-sheet", &query, filename, data)
            .await
    }
}

/// `list_datasets` — GET /datasets.
pub struct ListDatasetsTool {
    client: ServiceClient,
}

impl ListDatasetsTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListDatasetsTool {
    fn name(&self) -> &str {
        "list_datasets"
    }

    fn description(&self) -> &str {
        "List all extracted datasets as summaries (id, status, source file, row count)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        self.client.get("/datasets", &[]).await
    }
}

/// `get_dataset` — GET /datasets/{id}.
pub struct GetDatasetTool {
    client: ServiceClient,
}

impl GetDatasetTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDatasetTool {
    fn name(&self) -> &str {
        "get_dataset"
    }

    fn description(&self) -> &str {
        "Fetch one extracted dataset by id, including its schema and status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Dataset id" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let id = crate::args::required_str(&arguments, "id")?;
        self.client.get(&format!("/datasets/{id}"), &[]).await
    }
}

/// `get_dataset_rows` — GET /datasets/{id}/rows.
pub struct GetDatasetRowsTool {
    client: ServiceClient,
}

impl GetDatasetRowsTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDatasetRowsTool {
    fn name(&self) -> &str {
        "get_dataset_rows"
    }

    fn description(&self) -> &str {
        "Fetch the rows of an extracted dataset by dataset id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Dataset id" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let id = crate::args::required_str(&arguments, "id")?;
        self.client.get(&format!("/datasets/{id}/rows"), &[]).await
    }
}
