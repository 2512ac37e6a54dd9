//! Prompt input state
//!
//! Owns the edit buffer, the input mode requested by the server, and the
//! history of submitted lines with its browse cursor.
//!
//! # History browsing
//!
//! ```text
//! history:  [ "north", "look", "say hi" ]
//!                             ^ cursor after one scroll_backward()
//! ```
//!
//! While the cursor is set the buffer mirrors the selected entry. Any manual
//! edit detaches the cursor; the history itself is never rewritten.

/// How the prompt collects input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Text,
    /// Rendered masked, never recorded in history
    Password,
}

impl InputMode {
    /// Parse the value carried by a `prompt_type` negotiation signal
    pub fn from_signal_value(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(InputMode::Text),
            "password" => Some(InputMode::Password),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Text => "text",
            InputMode::Password => "password",
        }
    }
}

/// Edit buffer + history ring
#[derive(Clone, Debug, Default)]
pub struct InputState {
    mode: InputMode,
    current_text: String,
    /// Submitted lines (newest last)
    history: Vec<String>,
    /// Index into `history` while browsing
    cursor: Option<usize>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn history_cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Whether the buffer currently shows a recalled history entry
    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Switch mode, keeping any half-typed text
    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        self.cursor = None;
    }

    /// Replace the buffer (a manual edit)
    pub fn set_current_text(&mut self, text: impl Into<String>) {
        self.current_text = text.into();
        self.cursor = None;
    }

    /// Recall the previous (older) history entry. Text mode only.
    pub fn scroll_backward(&mut self) {
        if self.mode != InputMode::Text || self.history.is_empty() {
            return;
        }

        let index = match self.cursor {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.recall(index);
    }

    /// Recall the next (newer) history entry, or return to an empty
    /// buffer when moving past the newest one. Text mode only.
    pub fn scroll_forward(&mut self) {
        if self.mode != InputMode::Text {
            return;
        }

        let Some(i) = self.cursor else {
            return;
        };

        if i + 1 < self.history.len() {
            self.recall(i + 1);
        } else {
            self.cursor = None;
            self.current_text.clear();
        }
    }

    /// Take the buffer for transmission.
    ///
    /// Non-empty Text-mode lines are appended to history; Password-mode
    /// lines never are. The buffer and cursor are reset either way.
    pub fn submit(&mut self) -> String {
        let line = std::mem::take(&mut self.current_text);
        self.cursor = None;

        if self.mode == InputMode::Text && !line.is_empty() {
            self.history.push(line.clone());
        }

        line
    }

    fn recall(&mut self, index: usize) {
        self.cursor = Some(index);
        self.current_text.clone_from(&self.history[index]);
    }
}
