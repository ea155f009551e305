//! Line-editing console for terminal sessions.

use std::io;
use std::path::PathBuf;

use frozenrun_runtime::Console;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HISTORY_FILE: &str = ".frozenrun_history";

pub struct EditorConsole {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl EditorConsole {
    pub fn new(home: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let history = home.map(|h| h.join(HISTORY_FILE));
        if let Some(path) = &history {
            let _ = editor.load_history(path);
        }
        Ok(Self { editor, history })
    }
}

impl Console for EditorConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the current line
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }
}

impl Drop for EditorConsole {
    fn drop(&mut self) {
        if let Some(path) = &self.history {
            if let Err(err) = self.editor.save_history(path) {
                tracing::debug!(error = %err, path = %path.display(), "could not save history");
            }
        }
    }
}
