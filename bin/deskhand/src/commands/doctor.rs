use deskhand_core::{Config, Paths};
use deskhand_tools::ToolRegistry;
use std::process::Command;
use std::time::Duration;

/// Run full environment diagnostics.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("🩺 deskhand doctor — Environment Diagnostics");
    println!("================================");
    println!();

    let mut ok_count = 0u32;
    let mut warn_count = 0u32;
    let mut err_count = 0u32;

    // --- 1. Config ---
    println!("📋 Configuration");
    if paths.config_file().exists() {
        print_ok("Config file exists", &paths.config_file().display().to_string());
        ok_count += 1;
    } else {
        print_err("Config file not found", "Run `deskhand onboard` to initialize");
        err_count += 1;
    }
    let config = Config::load_or_default(&paths)?;
    println!();

    // --- 2. Workspace ---
    println!("📁 Workspace");
    let ws = config.workspace_root(&paths);
    if ws.exists() {
        print_ok("Workspace directory exists", &ws.display().to_string());
        ok_count += 1;

        let test_file = ws.join(".doctor_test");
        match std::fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_file);
                print_ok("Workspace writable", "");
                ok_count += 1;
            }
            Err(e) => {
                print_err("Workspace not writable", &e.to_string());
                err_count += 1;
            }
        }
    } else {
        print_err("Workspace directory not found", "Run `deskhand onboard` to initialize");
        err_count += 1;
    }
    println!();

    // --- 3. Tools ---
    println!("🔧 Tools");
    let registry = ToolRegistry::with_defaults();
    print_ok(&format!("{} tools registered", registry.tool_names().len()), "");
    ok_count += 1;
    println!();

    // --- 4. Shell sessions ---
    println!("🖥️  Shell Sessions");
    check_command(
        "tmux",
        &["-V"],
        "tmux",
        "Required for the shell tool's persistent sessions",
        &mut ok_count,
        &mut warn_count,
    );
    println!();

    // --- 5. Desktop automation ---
    println!("🖱️  Desktop Automation");
    check_command(
        "xdotool",
        &["--version"],
        "xdotool",
        "Required for computer mouse/keyboard actions",
        &mut ok_count,
        &mut warn_count,
    );
    check_command(
        "scrot",
        &["--version"],
        "scrot",
        "Required for computer screenshots",
        &mut ok_count,
        &mut warn_count,
    );
    println!("  Display: {}", config.desktop.display);
    println!();

    // --- 6. Browser service ---
    println!("🌐 Browser Service");
    let base_url = config.browser.base_url.trim_end_matches('/');
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;
    match client.get(base_url).send().await {
        Ok(resp) => {
            print_ok("Browser service reachable", &format!("{} ({})", base_url, resp.status()));
            ok_count += 1;
        }
        Err(_) => {
            print_warn(
                "Browser service unreachable",
                &format!("{} — browser tool calls will fail", base_url),
            );
            warn_count += 1;
        }
    }
    println!();

    // --- Summary ---
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "  ✅ {} passed  ⚠️  {} warnings  ❌ {} errors",
        ok_count, warn_count, err_count
    );

    if err_count > 0 {
        println!();
        println!("  {} error(s) must be fixed before normal use.", err_count);
    } else if warn_count > 0 {
        println!();
        println!("  Core features OK. Some optional features not ready.");
    } else {
        println!();
        println!("  🎉 All good!");
    }
    println!();

    Ok(())
}

fn print_ok(label: &str, detail: &str) {
    if detail.is_empty() {
        println!("  ✅ {}", label);
    } else {
        println!("  ✅ {} — {}", label, detail);
    }
}

fn print_warn(label: &str, hint: &str) {
    if hint.is_empty() {
        println!("  ⚠️  {}", label);
    } else {
        println!("  ⚠️  {} — {}", label, hint);
    }
}

fn print_err(label: &str, hint: &str) {
    if hint.is_empty() {
        println!("  ❌ {}", label);
    } else {
        println!("  ❌ {} — {}", label, hint);
    }
}

fn check_command(cmd: &str, args: &[&str], label: &str, purpose: &str, ok: &mut u32, warn: &mut u32) {
    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            let ver_line = version.lines().next().unwrap_or("").trim().to_string();
            let short: String = ver_line.chars().take(40).collect();
            print_ok(label, &short);
            *ok += 1;
        }
        _ => {
            print_warn(&format!("{} not found", label), purpose);
            *warn += 1;
        }
    }
}
