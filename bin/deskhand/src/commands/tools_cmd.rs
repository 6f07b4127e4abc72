use deskhand_core::{Config, Paths};
use deskhand_tools::{ToolContext, ToolRegistry};
use serde_json::Value;

fn schema_function(schema: &Value) -> &Value {
    schema.get("function").unwrap_or(schema)
}

/// List all registered tools.
pub async fn list() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let schemas = registry.get_tool_schemas();

    println!();
    println!("🔧 Registered tools ({} total)", schemas.len());
    println!();

    let mut sorted: Vec<&Value> = schemas.iter().collect();
    sorted.sort_by_key(|s| schema_function(s)["name"].as_str().unwrap_or("").to_string());

    for schema in sorted {
        let func = schema_function(schema);
        let name = func["name"].as_str().unwrap_or("");
        let desc = func["description"].as_str().unwrap_or("");
        let short_desc: String = desc.chars().take(70).collect();
        let ellipsis = if desc.chars().count() > 70 { "..." } else { "" };
        println!("  {:<12} {}{}", name, short_desc, ellipsis);
    }
    println!();

    Ok(())
}

/// Show detailed info for a specific tool.
pub async fn info(tool_name: &str) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let schemas = registry.get_tool_schemas();

    let schema = schemas
        .iter()
        .find(|s: &&Value| schema_function(s)["name"].as_str() == Some(tool_name));

    match schema {
        Some(s) => {
            let func = schema_function(s);
            println!();
            println!("🔧 {}", func["name"].as_str().unwrap_or(""));
            println!();
            println!("  Description: {}", func["description"].as_str().unwrap_or(""));
            println!();

            if let Some(params) = func.get("parameters") {
                println!("  Parameters:");
                if let Some(obj) = params.get("properties").and_then(|p| p.as_object()) {
                    let required: Vec<&str> = params
                        .get("required")
                        .and_then(|r: &Value| r.as_array())
                        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect::<Vec<&str>>())
                        .unwrap_or_default();

                    for (key, val) in obj {
                        let typ = val.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                        let desc = val.get("description").and_then(|d| d.as_str()).unwrap_or("");
                        let req = if required.contains(&key.as_str()) { " (required)" } else { "" };

                        let enum_str = match val.get("enum").and_then(|e| e.as_array()) {
                            Some(arr) => {
                                let vals: Vec<String> =
                                    arr.iter().map(|v| v.to_string()).collect();
                                format!(" [{}]", vals.join("|"))
                            }
                            None => String::new(),
                        };

                        println!("    {:<16} {:<8}{}{}", key, typ, req, enum_str);
                        if !desc.is_empty() {
                            let short: String = desc.chars().take(80).collect();
                            println!("      {}", short);
                            if desc.chars().count() > 80 {
                                let rest: String = desc.chars().skip(80).take(80).collect();
                                println!("      {}", rest);
                            }
                        }
                    }
                }
            }
            println!();
        }
        None => {
            eprintln!("Tool '{}' not found.", tool_name);
            eprintln!();
            eprintln!("Use `deskhand tools list` to see all available tools.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Call a tool directly with JSON params.
pub async fn call(tool_name: &str, params_json: &str) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let workspace = config.workspace_root(&paths);

    let tool = registry
        .get(tool_name)
        .ok_or_else(|| anyhow::anyhow!("Tool '{}' not found", tool_name))?;

    let params: Value = serde_json::from_str(params_json)
        .map_err(|e| anyhow::anyhow!("Failed to parse JSON params: {}", e))?;

    if let Err(e) = tool.validate(&params) {
        eprintln!("❌ Parameter validation failed: {}", e);
        std::process::exit(1);
    }

    let ctx = ToolContext { workspace, config };

    println!("⏳ Executing {} ...", tool_name);
    match tool.execute(ctx, params).await {
        Ok(value) => {
            println!("✅ Result:");
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Err(e) => {
            eprintln!("❌ Execution failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
