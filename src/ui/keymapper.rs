//! Key mapping for the prompt
//!
//! Converts key events to prompt actions.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// What a key press asks the client to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptAction {
    Insert(char),
    Backspace,
    ClearLine,
    Submit,
    HistoryBack,
    HistoryForward,
    Paste,
    PageUp,
    PageDown,
    Quit,
}

/// Key mapper for converting key events to prompt actions
pub struct KeyMapper;

impl KeyMapper {
    pub fn map(event: &KeyEvent) -> Option<PromptAction> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) if mods.contains(Modifiers::CTRL) => match ch.to_ascii_lowercase() {
                'c' | 'd' => Some(PromptAction::Quit),
                'v' => Some(PromptAction::Paste),
                'u' => Some(PromptAction::ClearLine),
                _ => None,
            },
            KeyCode::Char(ch) => Some(PromptAction::Insert(ch)),
            KeyCode::Enter => Some(PromptAction::Submit),
            KeyCode::Backspace => Some(PromptAction::Backspace),
            KeyCode::Esc => Some(PromptAction::ClearLine),
            KeyCode::Up => Some(PromptAction::HistoryBack),
            KeyCode::Down => Some(PromptAction::HistoryForward),
            KeyCode::PageUp => Some(PromptAction::PageUp),
            KeyCode::PageDown => Some(PromptAction::PageDown),
            _ => None,
        }
    }
}
