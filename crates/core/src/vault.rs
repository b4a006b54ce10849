use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolved vault directories. Everything the pipeline writes lands under one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultLayout {
    pub root: PathBuf,
    pub inbox: PathBuf,
    pub processed: PathBuf,
    pub actions: PathBuf,
    pub logs: PathBuf,
}

impl VaultLayout {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            inbox: root.join("inbox"),
            processed: root.join("processed"),
            actions: root.join("actions"),
            logs: root.join("logs"),
            root,
        }
    }

    pub fn directories(&self) -> [(&'static str, &Path); 4] {
        [
            ("inbox", self.inbox.as_path()),
            ("processed", self.processed.as_path()),
            ("actions", self.actions.as_path()),
            ("logs", self.logs.as_path()),
        ]
    }

    /// Creates every vault directory that does not exist yet.
    pub fn ensure(&self) -> io::Result<()> {
        for (_, dir) in self.directories() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::VaultLayout;

    #[test]
    fn ensure_creates_all_directories() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let layout = VaultLayout::under(dir.path().join("vault"));

        layout.ensure().map_err(|err| err.to_string())?;
        layout.ensure().map_err(|err| err.to_string())?;

        for (name, path) in layout.directories() {
            if !path.is_dir() {
                return Err(format!("{name} directory was not created"));
            }
        }
        Ok(())
    }
}
