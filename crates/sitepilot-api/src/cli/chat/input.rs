//! Async line input for the chat loop, wrapping `rustyline_async`.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug)]
pub enum InputEvent {
    Message(String),
    /// Ctrl+D.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Returns the input handler and a writer that prints above the prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }

    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    self.rl.add_history_entry(trimmed.clone());
                }
                InputEvent::Message(trimmed)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(_) => InputEvent::Eof,
        }
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Restore the terminal before exit.
    pub fn flush(&mut self) {
        let _ = self.rl.flush();
    }
}
