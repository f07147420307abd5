//! In-memory fakes shared by the unit tests.

use crate::error::{AiError, PlatformError};
use crate::ai::{Completion, CompletionRequest, GenerativeBackend};
use crate::platform::{
    ChatKind, ChatPlatform, ChatRef, IncomingMessage, Member, MemberStatus, MemberSubject,
    Privileges, SentMessage, UserRef,
};
use crate::usage::UsageLog;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use teloxide::types::{ChatId, MessageId, UserId};
use teloxide::{ApiError, RequestError};

pub const CHAT: ChatId = ChatId(-100_123);
pub const BOT_ID: UserId = UserId(999);

pub fn member(id: UserId, status: MemberStatus) -> Member {
    Member {
        user: UserRef::new(id, format!("user{}", id.0)),
        status,
        privileges: Privileges::none(),
    }
}

pub fn owner(id: UserId) -> Member {
    member(id, MemberStatus::Owner)
}

pub fn admin(id: UserId, privileges: &[&str]) -> Member {
    Member {
        privileges: Privileges::from_flags(privileges.iter().map(|p| (*p, true))),
        ..member(id, MemberStatus::Administrator)
    }
}

pub fn message(kind: ChatKind, sender: UserId, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(1),
        chat: ChatRef {
            id: CHAT,
            kind,
            title: Some("Test chat".to_string()),
        },
        sender: Some(UserRef::new(sender, format!("user{}", sender.0))),
        text: text.to_string(),
        reply_to_sender: None,
        mentioned_users: Vec::new(),
    }
}

/// A Bot API failure with the given description.
pub fn api_error(description: &str) -> PlatformError {
    PlatformError::Telegram(RequestError::Api(ApiError::Unknown(description.to_string())))
}

#[derive(Debug, Clone, Copy)]
pub enum LookupFailure {
    Transient,
    NotAdminSubject,
}

impl LookupFailure {
    fn error(self) -> PlatformError {
        match self {
            LookupFailure::Transient => api_error("flood wait"),
            LookupFailure::NotAdminSubject => {
                PlatformError::NotAdminSubject("USER_ADMIN_INVALID".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ban(UserId),
    Unban(UserId),
    Mute(UserId),
    Unmute(UserId),
}

enum AdminList {
    /// Privileged entries of the member table.
    Derived,
    Explicit(Vec<Member>),
    Failing,
}

#[derive(Default)]
struct Recorded {
    member_lookups: Vec<MemberSubject>,
    administrator_list_lookups: usize,
    replies: Vec<String>,
    deleted: Vec<MessageId>,
    actions: Vec<Action>,
    next_message_id: i32,
}

/// Scriptable chat platform.
pub struct FakePlatform {
    chat_kind: ChatKind,
    chat_lookup_fails: bool,
    bot: Option<Member>,
    members: HashMap<UserId, Member>,
    member_failure: Option<LookupFailure>,
    administrators: AdminList,
    actions_fail: bool,
    recorded: Mutex<Recorded>,
}

impl FakePlatform {
    pub fn new(chat_kind: ChatKind) -> Self {
        Self {
            chat_kind,
            chat_lookup_fails: false,
            bot: Some(admin(BOT_ID, &["can_restrict_members", "can_delete_messages"])),
            members: HashMap::new(),
            member_failure: None,
            administrators: AdminList::Derived,
            actions_fail: false,
            recorded: Mutex::new(Recorded {
                next_message_id: 100,
                ..Recorded::default()
            }),
        }
    }

    pub fn with_bot_status(mut self, status: MemberStatus) -> Self {
        self.bot = Some(member(BOT_ID, status));
        self
    }

    pub fn failing_bot_lookup(mut self) -> Self {
        self.bot = None;
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.insert(member.user.id, member);
        self
    }

    pub fn failing_member_lookup(mut self, failure: LookupFailure) -> Self {
        self.member_failure = Some(failure);
        self
    }

    pub fn with_administrators(mut self, admins: Vec<Member>) -> Self {
        self.administrators = AdminList::Explicit(admins);
        self
    }

    pub fn failing_administrator_list(mut self) -> Self {
        self.administrators = AdminList::Failing;
        self
    }

    pub fn failing_chat_lookup(mut self) -> Self {
        self.chat_lookup_fails = true;
        self
    }

    pub fn failing_actions(mut self) -> Self {
        self.actions_fail = true;
        self
    }

    pub fn replies(&self) -> Vec<String> {
        self.recorded.lock().unwrap().replies.clone()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.recorded.lock().unwrap().deleted.clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.recorded.lock().unwrap().actions.clone()
    }

    pub fn membership_lookups(&self) -> usize {
        self.recorded.lock().unwrap().member_lookups.len()
    }

    pub fn lookups_for(&self, user_id: UserId) -> usize {
        self.recorded
            .lock()
            .unwrap()
            .member_lookups
            .iter()
            .filter(|s| **s == MemberSubject::User(user_id))
            .count()
    }

    pub fn administrator_list_lookups(&self) -> usize {
        self.recorded.lock().unwrap().administrator_list_lookups
    }

    fn act(&self, action: Action) -> Result<(), PlatformError> {
        if self.actions_fail {
            return Err(api_error("not enough rights"));
        }
        self.recorded.lock().unwrap().actions.push(action);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRef, PlatformError> {
        if self.chat_lookup_fails {
            return Err(api_error("chat not found"));
        }
        Ok(ChatRef {
            id: chat_id,
            kind: self.chat_kind,
            title: Some("Test chat".to_string()),
        })
    }

    async fn get_chat_member(
        &self,
        _chat_id: ChatId,
        subject: MemberSubject,
    ) -> Result<Member, PlatformError> {
        self.recorded.lock().unwrap().member_lookups.push(subject);
        match subject {
            MemberSubject::Me => self
                .bot
                .clone()
                .ok_or_else(|| api_error("bot lookup failed")),
            MemberSubject::User(id) => {
                if let Some(failure) = self.member_failure {
                    return Err(failure.error());
                }
                Ok(self
                    .members
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| member(id, MemberStatus::Left)))
            }
        }
    }

    async fn get_chat_administrators(&self, _chat_id: ChatId) -> Result<Vec<Member>, PlatformError> {
        self.recorded.lock().unwrap().administrator_list_lookups += 1;
        match &self.administrators {
            AdminList::Derived => Ok(self
                .members
                .values()
                .filter(|m| m.status.is_privileged())
                .cloned()
                .collect()),
            AdminList::Explicit(admins) => Ok(admins.clone()),
            AdminList::Failing => Err(api_error("admin list unavailable")),
        }
    }

    async fn reply(
        &self,
        message: &IncomingMessage,
        text: &str,
    ) -> Result<SentMessage, PlatformError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.replies.push(text.to_string());
        recorded.next_message_id += 1;
        Ok(SentMessage {
            chat_id: message.chat.id,
            id: MessageId(recorded.next_message_id),
        })
    }

    async fn delete_message(&self, message: SentMessage) -> Result<(), PlatformError> {
        self.recorded.lock().unwrap().deleted.push(message.id);
        Ok(())
    }

    async fn ban_member(&self, _chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        self.act(Action::Ban(user_id))
    }

    async fn unban_member(&self, _chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        self.act(Action::Unban(user_id))
    }

    async fn restrict_member(
        &self,
        _chat_id: ChatId,
        user_id: UserId,
        muted: bool,
    ) -> Result<(), PlatformError> {
        self.act(if muted {
            Action::Mute(user_id)
        } else {
            Action::Unmute(user_id)
        })
    }
}

/// Generative backend returning a canned answer or failure.
pub struct FakeBackend {
    answer: Result<String, String>,
    requests: Mutex<Vec<(String, String, bool)>>,
}

impl FakeBackend {
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            answer: Ok(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `(model, prompt, search_grounding)` of each request.
    pub fn requests(&self) -> Vec<(String, String, bool)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion, AiError> {
        self.requests.lock().unwrap().push((
            request.model.to_string(),
            request.prompt.to_string(),
            request.search_grounding,
        ));
        match &self.answer {
            Ok(text) => Ok(Completion { text: text.clone() }),
            Err(message) => Err(AiError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

/// Usage log that keeps records in memory.
#[derive(Default)]
pub struct RecordingUsageLog {
    records: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingUsageLog {
    pub fn records(&self) -> Vec<(ChatId, String)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageLog for RecordingUsageLog {
    async fn record(&self, chat: &ChatRef, feature: &str) {
        self.records
            .lock()
            .unwrap()
            .push((chat.id, feature.to_string()));
    }
}
