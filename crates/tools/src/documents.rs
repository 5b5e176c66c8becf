//! Document-side tools: listing extractions, fetching trees and content,
//! and triggering new document extractions.

use crate::args::{optional_bool, optional_str, optional_u64, FileSource};
use crate::service_client::ServiceClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parley_core::error::ToolError;
use parley_core::tool::Tool;

/// `list_documents` — GET /extractions.
pub struct ListDocumentsTool {
    client: ServiceClient,
}

impl ListDocumentsTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListDocumentsTool {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List all extracted documents as lightweight summaries (id, status, source file, \
         page count). Optionally filter by readable_id substring."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "readable_id": {
                    "type": "string",
                    "description": "Case-insensitive substring filter on the document's readable id"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let mut query = Vec::new();
        if let Some(filter) = optional_str(&arguments, "readable_id") {
            query.push(("readable_id", filter.to_string()));
        }
        self.client.get("/extractions", &query).await
    }
}

/// `get_document` — GET /extractions/{id}.
pub struct GetDocumentTool {
    client: ServiceClient,
}

impl GetDocumentTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDocumentTool {
    fn name(&self) -> &str {
        "get_document"
    }

    fn description(&self) -> &str {
        "Fetch one extracted document by id, including its full node tree and status. \
         Use list_documents first to find ids."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Extraction id" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let id = crate::args::required_str(&arguments, "id")?;
        self.client.get(&format!("/extractions/{id}"), &[]).await
    }
}

/// `get_document_node` — GET /extractions/{id}/node/{node_id}.
pub struct GetDocumentNodeTool {
    client: ServiceClient,
}

impl GetDocumentNodeTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDocumentNodeTool {
    fn name(&self) -> &str {
        "get_document_node"
    }

    fn description(&self) -> &str {
        "Fetch a single node from an extracted document's tree by node id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Extraction id" },
                "node_id": { "type": "string", "description": "Node id within the document tree" }
            },
            "required": ["id", "node_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let id = crate::args::required_str(&arguments, "id")?;
        let node_id = crate::args::required_str(&arguments, "node_id")?;
        self.client
            .get(&format!("/extractions/{id}/node/{node_id}"), &[])
            .await
    }
}

/// `get_document_snapshot` — GET /extractions/{id}/snapshot.
pub struct GetDocumentSnapshotTool {
    client: ServiceClient,
}

impl GetDocumentSnapshotTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDocumentSnapshotTool {
    fn name(&self) -> &str {
        "get_document_snapshot"
    }

    fn description(&self) -> &str {
        "Fetch an extracted document's full tree in one call, without raw \
         content text. Includes a content index (node id, content ref, char \
         count) for lazy-loading content via get_content; pass \
         include_content_meta=false to omit it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Extraction id" },
                "include_content_meta": {
                    "type": "boolean",
                    "description": "Include the per-node content index (default true)"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let id = crate::args::required_str(&arguments, "id")?;
        let mut query = Vec::new();
        if let Some(include) = optional_bool(&arguments, "include_content_meta") {
            query.push(("include_content_meta", include.to_string()));
        }
        self.client
            .get(&format!("/extractions/{id}/snapshot"), &query)
            .await
    }
}

/// `get_content` — GET /content/{ref}.
pub struct GetContentTool {
    client: ServiceClient,
}

impl GetContentTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetContentTool {
    fn name(&self) -> &str {
        "get_content"
    }

    fn description(&self) -> &str {
        "Fetch a page of raw content behind a content reference from a document node. \
         Paged: pass offset and limit to read long content in chunks."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content_ref": {
                    "type": "string",
                    "description": "Content reference path as found on a document node"
                },
                "offset": { "type": "integer", "description": "Character offset to start from (default 0)" },
                "limit": { "type": "integer", "description": "Maximum characters to return (default 4000)" }
            },
            "required": ["content_ref"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let content_ref = crate::args::required_str(&arguments, "content_ref")?;
        let content_ref = content_ref.strip_prefix("content://").unwrap_or(content_ref);

        let mut query = Vec::new();
        if let Some(offset) = optional_u64(&arguments, "offset") {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = optional_u64(&arguments, "limit") {
            query.push(("limit", limit.to_string()));
        }
        self.client
            .get(&format!("/content/{content_ref}"), &query)
            .await
    }
}

/// `extract_document` — POST /extract.
pub struct ExtractDocumentTool {
    client: ServiceClient,
}

impl ExtractDocumentTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ExtractDocumentTool {
    fn name(&self) -> &str {
        "extract_document"
    }

    fn description(&self) -> &str {
        "Start an asynchronous document extraction (OCR + structured parsing). Provide \
         exactly one file source: file_path (server-local), file_url, or file_base64 with \
         filename. Returns immediately with the extraction id and status 'processing'; \
         poll get_document for completion."
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
                    "description": "OCR provider to use",
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

        match source {
            FileSource::Url(url) => {
                query.push(("file_url", url));
                self.client.post_query("/extract", &query).await
            }
            FileSource::Path(path) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    ToolError::InvalidArguments(format!("cannot read file '{path}': {e}"))
                })?;
                let filename = std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload.bin".into());
                self.client
                    .post_multipart("/extract", &query, filename, data)
                    .await
            }
            FileSource::Inline {
                filename,
                data_base64,
            } => {
                let data = BASE64.decode(data_base64.as_bytes()).map_err(|e| {
                    ToolError::InvalidArguments(format!("file_base64 is not valid base64: {e}"))
                })?;
                self.client
                    .post_multipart("/extract", &query, filename, data)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ServiceClient {
        ServiceClient::new("http://localhost:3000")
    }

    #[test]
    fn schemas_declare_required_fields() {
        let get_doc = GetDocumentTool::new(client());
        assert_eq!(
            get_doc.parameters_schema()["required"],
            serde_json::json!(["id"])
        );

        let get_node = GetDocumentNodeTool::new(client());
        assert_eq!(
            get_node.parameters_schema()["required"],
            serde_json::json!(["id", "node_id"])
        );
    }

    #[tokio::test]
    async fn snapshot_missing_id_is_argument_error() {
        let tool = GetDocumentSnapshotTool::new(client());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn snapshot_content_meta_flag_is_optional() {
        let tool = GetDocumentSnapshotTool::new(client());
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["id"]));
        assert_eq!(
            schema["properties"]["include_content_meta"]["type"],
            "boolean"
        );
    }

    #[tokio::test]
    async fn get_document_missing_id_is_argument_error() {
        let tool = GetDocumentTool::new(client());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn extract_requires_exactly_one_source() {
        let tool = ExtractDocumentTool::new(client());

        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("exactly one"));

        let err = tool
            .execute(serde_json::json!({
                "file_path": "/tmp/a.pdf",
                "file_url": "https://cdn/x.pdf"
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[tokio::test]
    async fn extract_invalid_base64_is_argument_error() {
        let tool = ExtractDocumentTool::new(client());
        let err = tool
            .execute(serde_json::json!({
                "file_base64": "not base64 at all!!!",
                "filename": "x.pdf"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn extract_unreadable_path_is_argument_error() {
        let tool = ExtractDocumentTool::new(client());
        let err = tool
            .execute(serde_json::json!({"file_path": "/no/such/file.pdf"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn content_ref_prefix_is_normalized() {
        // the tool strips the content:// scheme before building the path
        let raw = "content://abc/def";
        assert_eq!(raw.strip_prefix("content://").unwrap(), "abc/def");
    }
}
