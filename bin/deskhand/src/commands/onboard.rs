use deskhand_core::{Config, Paths};

/// Create the base directories and write the default configuration.
pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("deskhand onboard");
    println!("================");
    println!();

    paths.ensure_dirs()?;
    println!("✓ Base directory:  {}", paths.base.display());
    println!("✓ Workspace:       {}", paths.workspace().display());
    println!("✓ Media directory: {}", paths.media_dir().display());

    let config_path = paths.config_file();
    if config_path.exists() && !force {
        println!();
        println!("Config already exists: {}", config_path.display());
        println!("Use `deskhand onboard --force` to overwrite it with defaults.");
        return Ok(());
    }

    let config = Config::default();
    config.save(&config_path)?;
    println!("✓ Config written:  {}", config_path.display());

    println!();
    println!("Done. Run `deskhand doctor` to verify the environment.");
    Ok(())
}
