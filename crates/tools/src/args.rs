//! Argument decoding helpers shared by the tool implementations.

use parley_core::error::ToolError;
use serde_json::Value;

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required argument '{key}'")))
}

/// Fetch an optional string argument.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Fetch an optional integer argument.
pub fn optional_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

/// Fetch an optional boolean argument.
pub fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

/// The mutually exclusive file source for extraction triggers.
///
/// Exactly one of `file_path`, `file_url`, `file_base64` must be present;
/// `file_base64` additionally requires `filename`.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Path(String),
    Url(String),
    Inline { filename: String, data_base64: String },
}

impl FileSource {
    pub fn from_args(args: &Value) -> Result<Self, ToolError> {
        let path = optional_str(args, "file_path");
        let url = optional_str(args, "file_url");
        let inline = optional_str(args, "file_base64");

        let provided = [path.is_some(), url.is_some(), inline.is_some()]
            .iter()
            .filter(|p| **p)
            .count();
        if provided != 1 {
            return Err(ToolError::InvalidArguments(
                "provide exactly one of 'file_path', 'file_url', 'file_base64' as the file source"
                    .into(),
            ));
        }

        if let Some(p) = path {
            return Ok(FileSource::Path(p.to_string()));
        }
        if let Some(u) = url {
            return Ok(FileSource::Url(u.to_string()));
        }
        let filename = required_str(args, "filename").map_err(|_| {
            ToolError::InvalidArguments("'filename' is required with 'file_base64'".into())
        })?;
        Ok(FileSource::Inline {
            filename: filename.to_string(),
            data_base64: inline.unwrap_or_default().to_string(),
        })
    }
}
