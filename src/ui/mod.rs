//! Console frontend: screen painting and key mapping

pub mod keymapper;
pub mod renderer;

pub use keymapper::{KeyMapper, PromptAction};
pub use renderer::Renderer;
