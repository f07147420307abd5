//! groupkeeper library.
//!
//! Telegram group bot building blocks: admin status resolution, command gates,
//! moderation commands and a web-grounded Gemini relay.

pub mod ai;
pub mod bot;
pub mod cli;
pub mod config;
pub mod error;
pub mod gates;
pub mod moderation;
pub mod permissions;
pub mod platform;
pub mod relay;
pub mod target;
pub mod usage;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use gates::{CommandHandler, Gate, Gated, Rejection};
pub use permissions::AdminResolver;
pub use platform::{ChatPlatform, IncomingMessage};
pub use relay::GeminiRelay;
