//! Core session components.
//!
//! This module contains the render-agnostic client logic:
//!
//! - **ansi**: ANSI escape sequence decoder for transcript text
//! - **variables**: Latest value per structured-data key
//! - **input**: Prompt buffer, input mode and line history
//! - **gauge**: Gauge definitions and their projection from variables
//! - **protocol**: Play channel event names and frame classification
//! - **session**: Session engine tying the above to a transport
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Transport (join / push / leave)
//! ├── transcript (raw chunks, decoded on read by ansi)
//! ├── VariableStore ──read by──▶ gauge::project
//! └── InputState (mode, buffer, history)
//! ```

pub mod ansi;
pub mod gauge;
pub mod input;
pub mod protocol;
pub mod session;
pub mod variables;
