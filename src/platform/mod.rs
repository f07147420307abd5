//! Chat platform abstraction layer.
//!
//! Provides a trait-based abstraction over the chat platform's membership and
//! messaging API so permission checks and command handlers can run against
//! Telegram in production and an in-memory fake in tests.

mod types;

pub mod telegram;

pub use types::{
    ChatKind, ChatRef, IncomingMessage, Member, MemberStatus, MemberSubject, Privileges,
    SentMessage, UserRef,
};

use crate::error::PlatformError;
use async_trait::async_trait;
use teloxide::types::{ChatId, UserId};

/// Abstraction over the chat platform client.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Look up a chat.
    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRef, PlatformError>;

    /// Look up the membership of a user (or of the bot itself) in a chat.
    ///
    /// Fails with [`PlatformError::NotAdminSubject`] when the platform refuses
    /// to treat the user as a participant for admin purposes.
    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        subject: MemberSubject,
    ) -> Result<Member, PlatformError>;

    /// List every owner and administrator of a chat.
    async fn get_chat_administrators(&self, chat_id: ChatId) -> Result<Vec<Member>, PlatformError>;

    /// Reply to a message.
    async fn reply(
        &self,
        message: &IncomingMessage,
        text: &str,
    ) -> Result<SentMessage, PlatformError>;

    /// Delete a message the bot sent earlier.
    async fn delete_message(&self, message: SentMessage) -> Result<(), PlatformError>;

    /// Ban a user from a chat.
    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError>;

    /// Lift a ban. Does nothing for users who are not banned.
    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError>;

    /// Revoke (`muted = true`) or restore the right to send messages.
    async fn restrict_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        muted: bool,
    ) -> Result<(), PlatformError>;
}
