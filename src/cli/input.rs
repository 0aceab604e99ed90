// Line input for the interactive session
//
// Wraps rustyline with persistent history at ~/.cmdsage/history.txt.
// Ctrl+C and Ctrl+D both read as end-of-session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct InputHandler {
    editor: DefaultEditor,
    history_path: PathBuf,
}

impl InputHandler {
    pub fn new() -> Result<Self> {
        let path = dirs::home_dir()
            .context("could not determine home directory")?
            .join(".cmdsage")
            .join("history.txt");
        Self::at_path(path)
    }

    /// Handler with history at an explicit path.
    pub fn at_path(history_path: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new().context("could not initialize line editor")?;
        if history_path.exists() {
            // A stale or unreadable history file is not worth failing over
            let _ = editor.load_history(&history_path);
        }
        Ok(Self {
            editor,
            history_path,
        })
    }

    /// One line of input, trimmed. `None` means the user ended the session
    /// with Ctrl+C or Ctrl+D.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if !line.is_empty() {
                    let _ = self.editor.add_history_entry(&line);
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e).context("could not read input"),
        }
    }

    pub fn save_history(&mut self) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        self.editor
            .save_history(&self.history_path)
            .with_context(|| format!("failed to write {}", self.history_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_history_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.txt");

        let mut input = InputHandler::at_path(path.clone()).unwrap();
        input
            .editor
            .add_history_entry("how do I list files")
            .unwrap();
        input.save_history().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_existing_history_loads_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        std::fs::write(&path, "first question\nsecond question\n").unwrap();

        InputHandler::at_path(path).unwrap();
    }
}
