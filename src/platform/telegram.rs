//! Telegram platform implementation.
//!
//! Implements the ChatPlatform trait on top of a teloxide `Bot`.

use super::{
    ChatKind, ChatPlatform, ChatRef, IncomingMessage, Member, MemberStatus, MemberSubject,
    Privileges, SentMessage, UserRef,
};
use crate::error::PlatformError;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    Administrator, Chat, ChatMember, ChatMemberKind, ChatPermissions, MessageEntityKind,
    ReplyParameters, User,
};
use teloxide::RequestError;

/// Bot API description for a user that can't be inspected as an admin.
const NOT_ADMIN_SUBJECT_MARKER: &str = "USER_ADMIN_INVALID";

/// Telegram chat platform.
pub struct TelegramPlatform {
    bot: Bot,
    me: UserId,
    username: String,
}

impl TelegramPlatform {
    /// Create a platform client, resolving the bot's own identity with `getMe`.
    pub async fn connect(bot: Bot) -> Result<Self, PlatformError> {
        let me = bot.get_me().await?;
        Ok(Self {
            me: me.user.id,
            username: me.username().to_string(),
            bot,
        })
    }

    /// The bot's @username, without the `@`.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn subject_id(&self, subject: MemberSubject) -> UserId {
        match subject {
            MemberSubject::Me => self.me,
            MemberSubject::User(id) => id,
        }
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRef, PlatformError> {
        let chat = self.bot.get_chat(chat_id).await?;
        Ok(chat_ref(&chat))
    }

    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        subject: MemberSubject,
    ) -> Result<Member, PlatformError> {
        let member = self
            .bot
            .get_chat_member(chat_id, self.subject_id(subject))
            .await
            .map_err(classify_member_error)?;
        Ok(member_from_telegram(&member))
    }

    async fn get_chat_administrators(&self, chat_id: ChatId) -> Result<Vec<Member>, PlatformError> {
        let admins = self.bot.get_chat_administrators(chat_id).await?;
        Ok(admins.iter().map(member_from_telegram).collect())
    }

    async fn reply(
        &self,
        message: &IncomingMessage,
        text: &str,
    ) -> Result<SentMessage, PlatformError> {
        let sent = self
            .bot
            .send_message(message.chat.id, text)
            .reply_parameters(ReplyParameters::new(message.id))
            .await?;
        Ok(SentMessage {
            chat_id: sent.chat.id,
            id: sent.id,
        })
    }

    async fn delete_message(&self, message: SentMessage) -> Result<(), PlatformError> {
        self.bot.delete_message(message.chat_id, message.id).await?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        self.bot.ban_chat_member(chat_id, user_id).await?;
        Ok(())
    }

    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        self.bot
            .unban_chat_member(chat_id, user_id)
            .only_if_banned(true)
            .await?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        muted: bool,
    ) -> Result<(), PlatformError> {
        let permissions = if muted {
            ChatPermissions::empty()
        } else {
            ChatPermissions::all()
        };
        self.bot
            .restrict_chat_member(chat_id, user_id, permissions)
            .await?;
        Ok(())
    }
}

/// Map a membership lookup failure, singling out "not an admin subject".
fn classify_member_error(err: RequestError) -> PlatformError {
    if let RequestError::Api(api) = &err {
        let description = api.to_string();
        if description.contains(NOT_ADMIN_SUBJECT_MARKER) {
            return PlatformError::NotAdminSubject(description);
        }
    }
    PlatformError::Telegram(err)
}

fn chat_ref(chat: &Chat) -> ChatRef {
    let kind = if chat.is_private() {
        ChatKind::Private
    } else if chat.is_group() {
        ChatKind::Group
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Supergroup
    };
    ChatRef {
        id: chat.id,
        kind,
        title: chat.title().map(str::to_string),
    }
}

fn user_ref(user: &User) -> UserRef {
    UserRef::new(user.id, user.full_name())
}

fn member_from_telegram(member: &ChatMember) -> Member {
    let (status, privileges) = match &member.kind {
        ChatMemberKind::Owner(_) => (MemberStatus::Owner, Privileges::none()),
        ChatMemberKind::Administrator(admin) => {
            (MemberStatus::Administrator, administrator_privileges(admin))
        }
        ChatMemberKind::Member => (MemberStatus::Member, Privileges::none()),
        ChatMemberKind::Restricted(_) => (MemberStatus::Restricted, Privileges::none()),
        ChatMemberKind::Left => (MemberStatus::Left, Privileges::none()),
        ChatMemberKind::Banned(_) => (MemberStatus::Banned, Privileges::none()),
    };

    Member {
        user: user_ref(&member.user),
        status,
        privileges,
    }
}

fn administrator_privileges(admin: &Administrator) -> Privileges {
    Privileges::from_flags([
        ("can_manage_chat", admin.can_manage_chat),
        ("can_change_info", admin.can_change_info),
        ("can_post_messages", admin.can_post_messages),
        ("can_edit_messages", admin.can_edit_messages),
        ("can_delete_messages", admin.can_delete_messages),
        ("can_post_stories", admin.can_post_stories),
        ("can_edit_stories", admin.can_edit_stories),
        ("can_delete_stories", admin.can_delete_stories),
        ("can_manage_video_chats", admin.can_manage_video_chats),
        ("can_invite_users", admin.can_invite_users),
        ("can_restrict_members", admin.can_restrict_members),
        ("can_pin_messages", admin.can_pin_messages),
        ("can_manage_topics", admin.can_manage_topics),
        ("can_promote_members", admin.can_promote_members),
    ])
}

impl IncomingMessage {
    /// Convert a teloxide message into the platform-neutral form.
    pub fn from_telegram(msg: &Message) -> Self {
        let mentioned_users = msg
            .entities()
            .unwrap_or_default()
            .iter()
            .filter_map(|entity| match &entity.kind {
                MessageEntityKind::TextMention { user } => Some(user_ref(user)),
                _ => None,
            })
            .collect();

        Self {
            id: msg.id,
            chat: chat_ref(&msg.chat),
            sender: msg.from.as_ref().map(user_ref),
            text: msg.text().unwrap_or_default().to_string(),
            reply_to_sender: msg
                .reply_to_message()
                .and_then(|reply| reply.from.as_ref())
                .map(user_ref),
            mentioned_users,
        }
    }
}
