//! Opening anonymous files in an editor.

use std::io;
use std::path::Path;
use std::process::Command;

/// Something that can show a file to the user and returns once the file has
/// been closed again. Implement this to hook anonymous files into an editor.
pub trait Launcher {
    fn edit(&self, path: &Path) -> io::Result<()>;
}

/// Runs `$VISUAL`, `$EDITOR` or `vi` and waits for it to exit
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_env() -> Self {
        let command = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Launcher for ExternalEditor {
    fn edit(&self, path: &Path) -> io::Result<()> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty editor command"))?;

        log::debug!("Running {} on {}", self.command, path.display());
        let status = Command::new(program).args(parts).arg(path).status()?;

        match status.success() {
            true => Ok(()),
            false => Err(io::Error::other(format!(
                "{} exited with {}",
                self.command, status
            ))),
        }
    }
}
