//! The closed tool catalogue for Parley.
//!
//! Every tool forwards to the external extraction service over HTTP and
//! normalizes the result to text. Failures never propagate as errors out of
//! dispatch — the registry flattens them to tool-result text so the model
//! can self-correct within the same turn.

pub mod args;
pub mod configs;
pub mod datasets;
pub mod documents;
pub mod service_client;

pub use service_client::ServiceClient;

use parley_core::tool::ToolRegistry;

/// Create the default tool registry wired to one extraction service.
pub fn default_registry(base_url: impl Into<String>) -> ToolRegistry {
    let client = ServiceClient::new(base_url);
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(documents::ListDocumentsTool::new(client.clone())));
    registry.register(Box::new(documents::GetDocumentTool::new(client.clone())));
    registry.register(Box::new(documents::GetDocumentNodeTool::new(
        client.clone(),
    )));
    registry.register(Box::new(documents::GetDocumentSnapshotTool::new(
        client.clone(),
    )));
    registry.register(Box::new(documents::GetContentTool::new(client.clone())));
    registry.register(Box::new(documents::ExtractDocumentTool::new(
        client.clone(),
    )));
    registry.register(Box::new(datasets::ExtractSheetTool::new(client.clone())));
    registry.register(Box::new(datasets::ListDatasetsTool::new(client.clone())));
    registry.register(Box::new(datasets::GetDatasetTool::new(client.clone())));
    registry.register(Box::new(datasets::GetDatasetRowsTool::new(client.clone())));
    registry.register(Box::new(configs::ListConfigsTool::new(client.clone())));
    registry.register(Box::new(configs::GetConfigTool::new(client.clone())));
    registry.register(Box::new(configs::CreateConfigTool::new(client.clone())));
    registry.register(Box::new(configs::DeleteConfigTool::new(client)));

    registry
}
