//! BrowserTool — client for the sandbox browser automation service.
//!
//! The browser itself runs inside the sandbox as a separate HTTP service;
//! this tool validates the action vocabulary and forwards requests.

use async_trait::async_trait;
use deskhand_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{Tool, ToolContext, ToolSchema};

const ACTIONS: &[&str] = &[
    "navigate_to",
    "go_back",
    "wait",
    "click_element",
    "input_text",
    "send_keys",
    "switch_tab",
    "close_tab",
    "scroll_down",
    "scroll_up",
    "scroll_to_text",
    "get_dropdown_options",
    "select_dropdown_option",
    "click_coordinates",
    "drag_drop",
];

pub struct BrowserTool;

#[async_trait]
impl Tool for BrowserTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "browser",
            description: "Control the sandbox web browser: navigate, click and fill indexed page elements, send keys, scroll, manage tabs, read dropdowns, and drag-and-drop.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ACTIONS,
                        "description": "The browser action to perform"
                    },
                    "url": { "type": "string", "description": "(navigate_to) URL to open" },
                    "seconds": { "type": "integer", "description": "(wait) Seconds to wait for load" },
                    "index": {
                        "type": "integer",
                        "description": "Element index for click_element/input_text/get_dropdown_options/select_dropdown_option"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text for input_text/scroll_to_text/select_dropdown_option"
                    },
                    "keys": { "type": "string", "description": "(send_keys) Keys to send, e.g. 'Enter'" },
                    "page_id": { "type": "integer", "description": "(switch_tab) Tab ID to switch to" },
                    "amount": { "type": "integer", "description": "(scroll_down/scroll_up) Pixel amount, defaults to one page" },
                    "x": { "type": "integer", "description": "(click_coordinates) X coordinate" },
                    "y": { "type": "integer", "description": "(click_coordinates) Y coordinate" },
                    "element_source": { "type": "string", "description": "(drag_drop) Source element" },
                    "element_target": { "type": "string", "description": "(drag_drop) Target element" },
                    "coord_source_x": { "type": "integer", "description": "(drag_drop) Source X if dragging by coordinates" },
                    "coord_source_y": { "type": "integer", "description": "(drag_drop) Source Y if dragging by coordinates" },
                    "coord_target_x": { "type": "integer", "description": "(drag_drop) Target X if dragging by coordinates" },
                    "coord_target_y": { "type": "integer", "description": "(drag_drop) Target Y if dragging by coordinates" }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let action = params
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: action".to_string()))?;
        if !ACTIONS.contains(&action) {
            return Err(Error::Validation(format!(
                "Invalid action '{}'. Valid: {:?}",
                action, ACTIONS
            )));
        }

        let require_str = |field: &str| -> Result<()> {
            if params.get(field).and_then(|v| v.as_str()).is_none() {
                return Err(Error::Validation(format!(
                    "'{}' is required for '{}'",
                    field, action
                )));
            }
            Ok(())
        };
        let require_int = |field: &str| -> Result<()> {
            if params.get(field).and_then(|v| v.as_i64()).is_none() {
                return Err(Error::Validation(format!(
                    "'{}' is required for '{}'",
                    field, action
                )));
            }
            Ok(())
        };

        match action {
            "navigate_to" => require_str("url")?,
            "wait" => require_int("seconds")?,
            "click_element" | "get_dropdown_options" => require_int("index")?,
            "input_text" | "select_dropdown_option" => {
                require_int("index")?;
                require_str("text")?;
            }
            "send_keys" => require_str("keys")?,
            "switch_tab" => require_int("page_id")?,
            "scroll_to_text" => require_str("text")?,
            "click_coordinates" => {
                require_int("x")?;
                require_int("y")?;
            }
            "drag_drop" => {
                let by_element = params.get("element_source").and_then(|v| v.as_str()).is_some()
                    && params.get("element_target").and_then(|v| v.as_str()).is_some();
                let by_coords = ["coord_source_x", "coord_source_y", "coord_target_x", "coord_target_y"]
                    .iter()
                    .all(|f| params.get(*f).and_then(|v| v.as_i64()).is_some());
                if !by_element && !by_coords {
                    return Err(Error::Validation(
                        "drag_drop requires element_source/element_target or all four coord_* fields"
                            .to_string(),
                    ));
                }
            }
            // go_back, close_tab, scroll_down, scroll_up take no required fields
            _ => {}
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params["action"].as_str().unwrap_or("");
        let base_url = ctx.config.browser.base_url.trim_end_matches('/').to_string();

        let mut forwarded = params.clone();
        if let Some(obj) = forwarded.as_object_mut() {
            obj.remove("action");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(ctx.config.browser.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        debug!(action = %action, base_url = %base_url, "browser request");
        let response = client
            .post(format!("{}/action", base_url))
            .json(&json!({ "action": action, "params": forwarded }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("Browser service unreachable: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({ "error": "non-JSON response from browser service" }));

        if !status.is_success() {
            return Err(Error::Http(format!(
                "Browser service returned {}: {}",
                status, body
            )));
        }

        Ok(json!({
            "action": action,
            "result": body
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = BrowserTool;
        let schema = tool.schema();
        assert_eq!(schema.name, "browser");
        assert_eq!(
            schema.parameters["properties"]["action"]["enum"]
                .as_array()
                .unwrap()
                .len(),
            ACTIONS.len()
        );
    }

    #[test]
    fn test_validate_required_fields() {
        let tool = BrowserTool;
        assert!(tool
            .validate(&json!({"action": "navigate_to", "url": "https://example.com"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "navigate_to"})).is_err());
        assert!(tool.validate(&json!({"action": "wait", "seconds": 3})).is_ok());
        assert!(tool.validate(&json!({"action": "click_element", "index": 2})).is_ok());
        assert!(tool.validate(&json!({"action": "click_element"})).is_err());
        assert!(tool
            .validate(&json!({"action": "input_text", "index": 1, "text": "hi"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "input_text", "index": 1})).is_err());
        assert!(tool
            .validate(&json!({"action": "click_coordinates", "x": 10, "y": 20}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "click_coordinates", "x": 10})).is_err());
    }

    #[test]
    fn test_validate_parameterless_actions() {
        let tool = BrowserTool;
        for action in ["go_back", "close_tab", "scroll_down", "scroll_up"] {
            assert!(tool.validate(&json!({ "action": action })).is_ok());
        }
    }

    #[test]
    fn test_validate_drag_drop() {
        let tool = BrowserTool;
        assert!(tool
            .validate(&json!({
                "action": "drag_drop",
                "element_source": "#a",
                "element_target": "#b"
            }))
            .is_ok());
        assert!(tool
            .validate(&json!({
                "action": "drag_drop",
                "coord_source_x": 0, "coord_source_y": 0,
                "coord_target_x": 100, "coord_target_y": 50
            }))
            .is_ok());
        assert!(tool.validate(&json!({"action": "drag_drop"})).is_err());
        assert!(tool
            .validate(&json!({"action": "drag_drop", "element_source": "#a"}))
            .is_err());
    }

    #[test]
    fn test_validate_unknown_action() {
        let tool = BrowserTool;
        assert!(tool.validate(&json!({"action": "download_internet"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }
}
