use std::{thread, time::Duration};

use anyhow::anyhow;
use log::error;
use rustyline::{error::ReadlineError, Editor};

/// Source of player input. `Ok(None)` means the player wants to leave (Ctrl-C or end of input).
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

pub struct CommandReader {
    editor: Editor<()>,
}

impl CommandReader {
    pub fn new(editor: Editor<()>) -> Self {
        Self { editor }
    }
}

impl LineSource for CommandReader {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        let mut error_count = 0;

        loop {
            match self.editor.readline(prompt) {
                Ok(input) => {
                    if !input.trim().is_empty() {
                        self.editor.add_history_entry(input.as_str());
                    }

                    return Ok(Some(input));
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
                // Do nothing
                Err(ReadlineError::WindowResized) => (),
                Err(error) => {
                    error!("Unexpected error when reading CLI input: {error:?}");
                    error_count += 1;

                    if error_count > 3 {
                        return Err(anyhow!("Maximum retries exceeded, aborting CLI"));
                    }

                    thread::sleep(Duration::from_secs(3u64.pow(error_count)));
                }
            }
        }
    }
}
