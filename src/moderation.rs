//! Moderation commands: ban, unban, kick, mute, unmute.
//!
//! The bodies here assume they run behind the admin gates; see
//! [`ModerationCommand::gated`] for the standard pipeline.

use crate::gates::{CommandHandler, Gated};
use crate::platform::{ChatPlatform, IncomingMessage, UserRef};
use crate::target::TargetExtractor;
use crate::usage::UsageLog;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Privilege required for every moderation action.
pub const RESTRICT_PRIVILEGE: &str = "can_restrict_members";

pub const NO_TARGET_MESSAGE: &str =
    "❌ I can't find that user. Reply to one of their messages or pass their user ID.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Ban,
    Unban,
    Kick,
    Mute,
    Unmute,
}

impl ModerationAction {
    pub fn name(self) -> &'static str {
        match self {
            ModerationAction::Ban => "ban",
            ModerationAction::Unban => "unban",
            ModerationAction::Kick => "kick",
            ModerationAction::Mute => "mute",
            ModerationAction::Unmute => "unmute",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            ModerationAction::Ban => "Banned",
            ModerationAction::Unban => "Unbanned",
            ModerationAction::Kick => "Kicked",
            ModerationAction::Mute => "Muted",
            ModerationAction::Unmute => "Unmuted",
        }
    }

    /// Whether the target must not be the invoker or an admin.
    fn protects_admins(self) -> bool {
        !matches!(self, ModerationAction::Unban)
    }

    async fn apply(
        self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
        target: &UserRef,
    ) -> Result<(), crate::error::PlatformError> {
        let chat_id = message.chat.id;
        match self {
            ModerationAction::Ban => platform.ban_member(chat_id, target.id).await,
            ModerationAction::Unban => platform.unban_member(chat_id, target.id).await,
            ModerationAction::Kick => {
                platform.ban_member(chat_id, target.id).await?;
                platform.unban_member(chat_id, target.id).await
            }
            ModerationAction::Mute => platform.restrict_member(chat_id, target.id, true).await,
            ModerationAction::Unmute => platform.restrict_member(chat_id, target.id, false).await,
        }
    }
}

/// Body of a moderation command.
pub struct ModerationCommand {
    action: ModerationAction,
    extractor: Arc<dyn TargetExtractor>,
    usage: Arc<dyn UsageLog>,
}

impl ModerationCommand {
    pub fn new(
        action: ModerationAction,
        extractor: Arc<dyn TargetExtractor>,
        usage: Arc<dyn UsageLog>,
    ) -> Self {
        Self {
            action,
            extractor,
            usage,
        }
    }

    /// Wrap the command in `admin_only`, `protect_admins` (except for unban)
    /// and `require_permission("can_restrict_members")`, in that order.
    pub fn gated(self) -> Gated<Self> {
        let protects_admins = self.action.protects_admins();
        let extractor = Arc::clone(&self.extractor);
        let gated = Gated::new(self).admin_only();
        let gated = if protects_admins {
            gated.protect_admins(extractor)
        } else {
            gated
        };
        gated.require_permission(RESTRICT_PRIVILEGE)
    }
}

#[async_trait]
impl CommandHandler for ModerationCommand {
    async fn handle(&self, platform: &dyn ChatPlatform, message: &IncomingMessage) {
        let (target, reason) = self.extractor.extract(platform, message).await;
        let Some(target) = target else {
            if let Err(e) = platform.reply(message, NO_TARGET_MESSAGE).await {
                warn!(error = %e, "Failed to send reply");
            }
            return;
        };

        self.usage.record(&message.chat, self.action.name()).await;

        let reply = match self.action.apply(platform, message, &target).await {
            Ok(()) => {
                info!(
                    chat_id = %message.chat.id,
                    target = %target.id,
                    action = self.action.name(),
                    "Moderation action applied"
                );
                confirmation(self.action, &target, &reason)
            }
            Err(e) => {
                warn!(
                    chat_id = %message.chat.id,
                    target = %target.id,
                    action = self.action.name(),
                    error = %e,
                    "Moderation action failed"
                );
                format!("❌ Failed to {} {}: {}", self.action.name(), target, e)
            }
        };

        if let Err(e) = platform.reply(message, &reply).await {
            warn!(error = %e, "Failed to send reply");
        }
    }
}

fn confirmation(action: ModerationAction, target: &UserRef, reason: &str) -> String {
    if reason.is_empty() {
        format!("✅ {} {}.", action.past_tense(), target)
    } else {
        format!("✅ {} {}.\nReason: {}", action.past_tense(), target, reason)
    }
}
