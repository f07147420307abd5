//! Shared types for chat platform implementations.

use std::collections::BTreeSet;
use std::fmt;
use teloxide::types::{ChatId, MessageId, UserId};

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// One-to-one chats have no admin concept.
    pub fn is_private(self) -> bool {
        matches!(self, ChatKind::Private)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }
}

/// A chat as seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRef {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub display_name: String,
}

impl UserRef {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.display_name, self.id)
        }
    }
}

/// Membership status of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// Owners and administrators.
    pub fn is_privileged(self) -> bool {
        matches!(self, MemberStatus::Owner | MemberStatus::Administrator)
    }
}

/// Named admin privileges granted to a member.
///
/// Names follow the Telegram Bot API (`can_restrict_members`,
/// `can_delete_messages`, ...). A name that was never granted reads as false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Privileges {
    granted: BTreeSet<String>,
}

impl Privileges {
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from `(name, granted)` pairs, keeping only the granted ones.
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        Self {
            granted: flags
                .into_iter()
                .filter(|(_, on)| *on)
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.granted.contains(name)
    }
}

/// Membership record of a user in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user: UserRef,
    pub status: MemberStatus,
    /// Only meaningful for administrators.
    pub privileges: Privileges,
}

/// Whose membership to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSubject {
    /// The bot itself.
    Me,
    User(UserId),
}

/// An inbound command message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub chat: ChatRef,
    /// `None` for anonymous admins and channel posts.
    pub sender: Option<UserRef>,
    pub text: String,
    /// Sender of the message this one replies to, if any.
    pub reply_to_sender: Option<UserRef>,
    /// Users referenced through text-mention entities, in message order.
    pub mentioned_users: Vec<UserRef>,
}

impl IncomingMessage {
    /// Command arguments: everything after the first whitespace-separated token.
    pub fn arguments(&self) -> &str {
        let text = self.text.trim_start();
        match text.find(char::is_whitespace) {
            Some(idx) => text[idx..].trim(),
            None => "",
        }
    }
}

/// Handle to a message the bot sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub id: MessageId,
}
