use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        if let Ok(base) = std::env::var("DESKHAND_HOME") {
            if !base.trim().is_empty() {
                return Self { base: PathBuf::from(base) };
            }
        }
        let base = dirs::home_dir()
            .map(|h| h.join(".deskhand"))
            .unwrap_or_else(|| PathBuf::from(".deskhand"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn workspace(&self) -> PathBuf {
        self.base.join("workspace")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.workspace().join("media")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.workspace())?;
        std::fs::create_dir_all(self.media_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
