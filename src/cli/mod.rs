// CLI module
// Public interface for the interactive session and its collaborators

mod commands;
mod conversation;
mod input;
mod render;
mod session;

pub use commands::Command;
pub use conversation::{ConversationHistory, MAX_TURNS};
pub use input::InputHandler;
pub use render::render_answer;
pub use session::{ask_once, Session};
