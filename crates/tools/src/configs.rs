//! Extraction-config CRUD tools.

use crate::args::required_str;
use crate::service_client::ServiceClient;
use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;

/// `list_configs` — GET /configs.
pub struct ListConfigsTool {
    client: ServiceClient,
}

impl ListConfigsTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListConfigsTool {
    fn name(&self) -> &str {
        "list_configs"
    }

    fn description(&self) -> &str {
        "List the names of all available extraction configs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        self.client.get("/configs", &[]).await
    }
}

/// `get_config` — GET /configs/{name}.
pub struct GetConfigTool {
    client: ServiceClient,
}

impl GetConfigTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetConfigTool {
    fn name(&self) -> &str {
        "get_config"
    }

    fn description(&self) -> &str {
        "Fetch one extraction config by name, including its field definitions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Config name" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let name = required_str(&arguments, "name")?;
        self.client.get(&format!("/configs/{name}"), &[]).await
    }
}

/// `create_config` — POST /configs.
pub struct CreateConfigTool {
    client: ServiceClient,
}

impl CreateConfigTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateConfigTool {
    fn name(&self) -> &str {
        "create_config"
    }

    fn description(&self) -> &str {
        "Create or replace an extraction config. Pass the config name and the full \
         config object (field definitions, prompts, output schema)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Config name" },
                "config": { "type": "object", "description": "The full config object" }
            },
            "required": ["name", "config"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let name = required_str(&arguments, "name")?;
        let config = arguments
            .get("config")
            .filter(|c| c.is_object())
            .ok_or_else(|| {
                ToolError::InvalidArguments("missing required object argument 'config'".into())
            })?;

        let body = serde_json::json!({ "name": name, "config": config });
        self.client.post_json("/configs", &body).await
    }
}

/// `delete_config` — DELETE /configs/{name}.
pub struct DeleteConfigTool {
    client: ServiceClient,
}

impl DeleteConfigTool {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for DeleteConfigTool {
    fn name(&self) -> &str {
        "delete_config"
    }

    fn description(&self) -> &str {
        "Delete an extraction config by name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Config name" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let name = required_str(&arguments, "name")?;
        self.client.delete(&format!("/configs/{name}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ServiceClient {
        ServiceClient::new("http://localhost:3000")
    }

    #[tokio::test]
    async fn get_config_requires_name() {
        let tool = GetConfigTool::new(client());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn create_config_requires_object_body() {
        let tool = CreateConfigTool::new(client());

        let err = tool
            .execute(serde_json::json!({"name": "legal_br"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'config'"));

        // a string where an object is expected is also rejected
        let err = tool
            .execute(serde_json::json!({"name": "legal_br", "config": "not-an-object"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn delete_config_requires_name() {
        let tool = DeleteConfigTool::new(client());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
