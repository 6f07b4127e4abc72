//! ComputerTool — mouse/keyboard/screenshot passthrough for the sandbox
//! desktop, driven through `xdotool` and `scrot` on the configured X display.

use async_trait::async_trait;
use base64::Engine as _;
use deskhand_core::{Error, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{Tool, ToolContext, ToolSchema};

const KEYBOARD_KEYS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    "enter", "esc", "backspace", "tab", "space", "delete", "ctrl", "alt", "shift", "win",
    "up", "down", "left", "right", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9",
    "f10", "f11", "f12",
];

const HOT_KEYS: &[&str] = &[
    "ctrl+c", "ctrl+v", "ctrl+x", "ctrl+z", "ctrl+a", "ctrl+s", "alt+tab", "alt+f4",
    "ctrl+alt+delete",
];

pub struct ComputerTool;

#[async_trait]
impl Tool for ComputerTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "computer",
            description: "Desktop automation for the sandbox display: move and click the mouse, scroll, type text, press keys and hotkey combos, drag, wait, and take screenshots.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": [
                            "move_to", "click", "scroll", "typing", "press", "hotkey",
                            "mouse_down", "mouse_up", "drag_to", "wait", "screenshot"
                        ],
                        "description": "The desktop action to perform"
                    },
                    "x": { "type": "integer", "description": "X coordinate for mouse actions" },
                    "y": { "type": "integer", "description": "Y coordinate for mouse actions" },
                    "button": {
                        "type": "string",
                        "enum": ["left", "right", "middle"],
                        "description": "Mouse button for click/press/release actions, default left"
                    },
                    "num_clicks": {
                        "type": "integer",
                        "enum": [1, 2],
                        "description": "(click) Single or double click, default 1"
                    },
                    "amount": {
                        "type": "integer",
                        "description": "(scroll) Scroll amount, -10..=10; positive scrolls up"
                    },
                    "text": { "type": "string", "description": "(typing) Text to type" },
                    "key": { "type": "string", "description": "(press) Key to press (e.g. 'enter', 'tab', 'f5')" },
                    "keys": { "type": "string", "description": "(hotkey) Key combination (e.g. 'ctrl+c', 'alt+tab')" },
                    "seconds": { "type": "integer", "description": "(wait) Seconds to wait" }
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

        match action {
            "move_to" | "drag_to" => {
                if params.get("x").and_then(|v| v.as_i64()).is_none()
                    || params.get("y").and_then(|v| v.as_i64()).is_none()
                {
                    return Err(Error::Validation(format!(
                        "'x' and 'y' are required for '{}'",
                        action
                    )));
                }
            }
            "click" => {
                let n = params.get("num_clicks").and_then(|v| v.as_i64()).unwrap_or(1);
                if n != 1 && n != 2 {
                    return Err(Error::Validation("num_clicks must be 1 or 2".to_string()));
                }
                validate_button(params)?;
            }
            "mouse_down" | "mouse_up" => validate_button(params)?,
            "scroll" => {
                let amount = params
                    .get("amount")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| Error::Validation("'amount' is required for scroll".to_string()))?;
                if !(-10..=10).contains(&amount) {
                    return Err(Error::Validation("scroll amount must be in -10..=10".to_string()));
                }
            }
            "typing" => {
                if params.get("text").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("'text' is required for typing".to_string()));
                }
            }
            "press" => {
                let key = params
                    .get("key")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::Validation("'key' is required for press".to_string()))?;
                if !KEYBOARD_KEYS.contains(&key) {
                    return Err(Error::Validation(format!("Key '{}' is not allowed", key)));
                }
            }
            "hotkey" => {
                let keys = params
                    .get("keys")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::Validation("'keys' is required for hotkey".to_string()))?;
                if !HOT_KEYS.contains(&keys) {
                    return Err(Error::Validation(format!(
                        "Hotkey '{}' is not allowed. Valid: {:?}",
                        keys, HOT_KEYS
                    )));
                }
            }
            "wait" => {
                if params.get("seconds").and_then(|v| v.as_u64()).is_none() {
                    return Err(Error::Validation("'seconds' is required for wait".to_string()));
                }
            }
            "screenshot" => {}
            _ => {
                return Err(Error::Validation(format!("Unknown action: {}", action)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params["action"].as_str().unwrap_or("");
        let display = ctx.config.desktop.display.clone();

        match action {
            "move_to" => {
                let (x, y) = coords(&params);
                xdotool(&display, &["mousemove", &x.to_string(), &y.to_string()]).await?;
                done(action)
            }
            "click" => {
                if params.get("x").is_some() && params.get("y").is_some() {
                    let (x, y) = coords(&params);
                    xdotool(&display, &["mousemove", &x.to_string(), &y.to_string()]).await?;
                }
                let button = button_number(&params);
                let n = params.get("num_clicks").and_then(|v| v.as_i64()).unwrap_or(1);
                if n == 2 {
                    xdotool(
                        &display,
                        &["click", "--repeat", "2", "--delay", "100", &button],
                    )
                    .await?;
                } else {
                    xdotool(&display, &["click", &button]).await?;
                }
                done(action)
            }
            "scroll" => {
                let amount = params["amount"].as_i64().unwrap_or(0);
                // X buttons 4/5 are one wheel notch up/down
                let button = if amount >= 0 { "4" } else { "5" };
                let repeat = amount.unsigned_abs().to_string();
                if amount != 0 {
                    xdotool(&display, &["click", "--repeat", &repeat, button]).await?;
                }
                done(action)
            }
            "typing" => {
                let text = params["text"].as_str().unwrap_or("");
                xdotool(&display, &["type", "--delay", "12", "--", text]).await?;
                done(action)
            }
            "press" => {
                let key = params["key"].as_str().unwrap_or("");
                xdotool(&display, &["key", &keysym(key)]).await?;
                done(action)
            }
            "hotkey" => {
                let keys = params["keys"].as_str().unwrap_or("");
                let combo: Vec<String> = keys.split('+').map(keysym).collect();
                xdotool(&display, &["key", &combo.join("+")]).await?;
                done(action)
            }
            "mouse_down" => {
                if params.get("x").is_some() && params.get("y").is_some() {
                    let (x, y) = coords(&params);
                    xdotool(&display, &["mousemove", &x.to_string(), &y.to_string()]).await?;
                }
                xdotool(&display, &["mousedown", &button_number(&params)]).await?;
                done(action)
            }
            "mouse_up" => {
                if params.get("x").is_some() && params.get("y").is_some() {
                    let (x, y) = coords(&params);
                    xdotool(&display, &["mousemove", &x.to_string(), &y.to_string()]).await?;
                }
                xdotool(&display, &["mouseup", &button_number(&params)]).await?;
                done(action)
            }
            "drag_to" => {
                let (x, y) = coords(&params);
                xdotool(&display, &["mousedown", "1"]).await?;
                xdotool(&display, &["mousemove", "--sync", &x.to_string(), &y.to_string()])
                    .await?;
                xdotool(&display, &["mouseup", "1"]).await?;
                done(action)
            }
            "wait" => {
                let seconds = params["seconds"].as_u64().unwrap_or(1);
                sleep(Duration::from_secs(seconds)).await;
                Ok(json!({ "action": "wait", "waited_secs": seconds }))
            }
            "screenshot" => action_screenshot(&ctx, &display).await,
            _ => Err(Error::Tool(format!("Unknown action: {}", action))),
        }
    }
}

fn done(action: &str) -> Result<Value> {
    Ok(json!({ "action": action, "success": true }))
}

fn coords(params: &Value) -> (i64, i64) {
    (
        params.get("x").and_then(|v| v.as_i64()).unwrap_or(0),
        params.get("y").and_then(|v| v.as_i64()).unwrap_or(0),
    )
}

fn validate_button(params: &Value) -> Result<()> {
    if let Some(button) = params.get("button").and_then(|v| v.as_str()) {
        if !["left", "right", "middle"].contains(&button) {
            return Err(Error::Validation(format!(
                "Invalid button '{}'. Valid: left, right, middle",
                button
            )));
        }
    }
    Ok(())
}

/// xdotool button numbers: 1 left, 2 middle, 3 right.
fn button_number(params: &Value) -> String {
    match params.get("button").and_then(|v| v.as_str()) {
        Some("right") => "3",
        Some("middle") => "2",
        _ => "1",
    }
    .to_string()
}

/// Map the tool's key vocabulary onto X keysyms.
fn keysym(key: &str) -> String {
    match key {
        "enter" => "Return",
        "esc" => "Escape",
        "backspace" => "BackSpace",
        "tab" => "Tab",
        "space" => "space",
        "delete" => "Delete",
        "win" => "super",
        "up" => "Up",
        "down" => "Down",
        "left" => "Left",
        "right" => "Right",
        k if k.starts_with('f') && k.len() > 1 && k[1..].chars().all(|c| c.is_ascii_digit()) => {
            return k.to_uppercase();
        }
        k => k,
    }
    .to_string()
}

async fn xdotool(display: &str, args: &[&str]) -> Result<String> {
    which::which("xdotool")
        .map_err(|_| Error::Tool("xdotool not found; install it in the sandbox image".to_string()))?;
    // `display` as a bare identifier inside the macro resolves to
    // `tracing::field::display`, so rebind it first.
    let disp = display;
    debug!(args = ?args, display = %disp, "xdotool");
    let output = Command::new("xdotool")
        .env("DISPLAY", display)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Tool(format!("Failed to run xdotool: {}", e)))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(Error::Tool(format!("xdotool error: {}", stderr)))
    }
}

/// Capture the whole display with scrot into the media dir and return the
/// PNG as base64.
async fn action_screenshot(ctx: &ToolContext, display: &str) -> Result<Value> {
    which::which("scrot")
        .map_err(|_| Error::Tool("scrot not found; install it in the sandbox image".to_string()))?;

    let media_dir = ctx.workspace.join("media");
    tokio::fs::create_dir_all(&media_dir).await?;
    let path = media_dir.join(format!(
        "screen_{}.png",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let path_str = path.to_string_lossy().to_string();

    info!(path = %path_str, "taking screenshot");
    let output = Command::new("scrot")
        .env("DISPLAY", display)
        .args(["-o", &path_str])
        .output()
        .await
        .map_err(|e| Error::Tool(format!("Failed to run scrot: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::Tool(format!("scrot error: {}", stderr)));
    }

    let bytes = tokio::fs::read(&path).await?;
    Ok(json!({
        "action": "screenshot",
        "path": path_str,
        "mime_type": "image/png",
        "base64": base64::engine::general_purpose::STANDARD.encode(&bytes)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = ComputerTool;
        let schema = tool.schema();
        assert_eq!(schema.name, "computer");
        assert!(schema.parameters["properties"]["action"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "screenshot"));
    }

    #[test]
    fn test_validate_coordinates() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "move_to", "x": 10, "y": 20})).is_ok());
        assert!(tool.validate(&json!({"action": "move_to", "x": 10})).is_err());
        assert!(tool.validate(&json!({"action": "drag_to", "y": 5})).is_err());
    }

    #[test]
    fn test_validate_click() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "click"})).is_ok());
        assert!(tool
            .validate(&json!({"action": "click", "button": "middle", "num_clicks": 2}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "click", "num_clicks": 3})).is_err());
        assert!(tool.validate(&json!({"action": "click", "button": "side"})).is_err());
    }

    #[test]
    fn test_validate_scroll_range() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "scroll", "amount": -10})).is_ok());
        assert!(tool.validate(&json!({"action": "scroll", "amount": 11})).is_err());
        assert!(tool.validate(&json!({"action": "scroll"})).is_err());
    }

    #[test]
    fn test_validate_key_allowlist() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "press", "key": "enter"})).is_ok());
        assert!(tool.validate(&json!({"action": "press", "key": "f12"})).is_ok());
        assert!(tool.validate(&json!({"action": "press", "key": "sysrq"})).is_err());
    }

    #[test]
    fn test_validate_hotkey_allowlist() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "hotkey", "keys": "ctrl+c"})).is_ok());
        assert!(tool.validate(&json!({"action": "hotkey", "keys": "ctrl+alt+t"})).is_err());
        assert!(tool.validate(&json!({"action": "hotkey"})).is_err());
    }

    #[test]
    fn test_validate_unknown_action() {
        let tool = ComputerTool;
        assert!(tool.validate(&json!({"action": "format_disk"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_keysym_mapping() {
        assert_eq!(keysym("enter"), "Return");
        assert_eq!(keysym("esc"), "Escape");
        assert_eq!(keysym("backspace"), "BackSpace");
        assert_eq!(keysym("win"), "super");
        assert_eq!(keysym("f5"), "F5");
        assert_eq!(keysym("a"), "a");
        assert_eq!(keysym("ctrl"), "ctrl");
    }

    #[test]
    fn test_button_number() {
        assert_eq!(button_number(&json!({"button": "left"})), "1");
        assert_eq!(button_number(&json!({"button": "middle"})), "2");
        assert_eq!(button_number(&json!({"button": "right"})), "3");
        assert_eq!(button_number(&json!({})), "1");
    }
}
