//! Command gates.
//!
//! A gate is an authorization check that runs before a command body. Gates
//! are composed with [`Gated`], which evaluates them in order and stops at
//! the first rejection after sending its reply.

use crate::permissions::{lookup_member, AdminResolver, MemberLookup};
use crate::platform::{ChatPlatform, IncomingMessage, MemberStatus, MemberSubject};
use crate::target::TargetExtractor;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A command body.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command message. All effects are replies and platform actions.
    async fn handle(&self, platform: &dyn ChatPlatform, message: &IncomingMessage);
}

#[async_trait]
impl<H: CommandHandler + ?Sized> CommandHandler for Arc<H> {
    async fn handle(&self, platform: &dyn ChatPlatform, message: &IncomingMessage) {
        (**self).handle(platform, message).await
    }
}

/// Why a gate stopped a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BotNotAdmin,
    BotStatusUnknown,
    NotAdmin,
    SelfTarget,
    TargetIsAdmin,
    MissingPrivilege(String),
    Unverified,
    CheckFailed,
}

impl Rejection {
    /// User-facing reply for this rejection.
    pub fn message(&self) -> String {
        match self {
            Rejection::BotNotAdmin => {
                "❌ I need administrator permissions to execute admin commands.".to_string()
            }
            Rejection::BotStatusUnknown => "❌ Unable to verify bot permissions.".to_string(),
            Rejection::NotAdmin => {
                "❌ This command is only available to administrators.".to_string()
            }
            Rejection::SelfTarget => "❌ You cannot perform this action on yourself.".to_string(),
            Rejection::TargetIsAdmin => {
                "❌ You cannot use this command on an administrator.".to_string()
            }
            Rejection::MissingPrivilege(name) => {
                format!("❌ You need the `{}` permission to use this command.", name)
            }
            Rejection::Unverified => "❌ Unable to verify your permissions.".to_string(),
            Rejection::CheckFailed => {
                "❌ An error occurred while checking permissions.".to_string()
            }
        }
    }
}

/// Outcome of evaluating one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Reject(Rejection),
}

/// An authorization check placed in front of a command.
#[derive(Clone)]
pub enum Gate {
    /// Only owners and administrators may run the command.
    AdminOnly,
    /// The command's target must not be the invoker or an administrator.
    ProtectAdmins(Arc<dyn TargetExtractor>),
    /// The invoker must be the owner or an administrator holding the named privilege.
    RequirePermission(String),
}

impl Gate {
    pub async fn evaluate(
        &self,
        resolver: &AdminResolver,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
    ) -> GateDecision {
        if message.chat.kind.is_private() {
            return GateDecision::Proceed;
        }
        let outcome = match self {
            Gate::AdminOnly => admin_only(resolver, platform, message).await,
            Gate::ProtectAdmins(extractor) => {
                protect_admins(resolver, extractor.as_ref(), platform, message).await
            }
            Gate::RequirePermission(name) => require_permission(name, platform, message).await,
        };
        match outcome {
            Ok(()) => GateDecision::Proceed,
            Err(rejection) => GateDecision::Reject(rejection),
        }
    }
}

/// Bot-side check shared by `AdminOnly` and `RequirePermission`.
async fn ensure_bot_is_admin(
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> Result<(), Rejection> {
    match platform
        .get_chat_member(message.chat.id, MemberSubject::Me)
        .await
    {
        Ok(bot) if bot.status.is_privileged() => Ok(()),
        Ok(_) => Err(Rejection::BotNotAdmin),
        Err(e) => {
            error!(chat_id = %message.chat.id, error = %e, "Could not check bot admin status");
            Err(Rejection::BotStatusUnknown)
        }
    }
}

async fn admin_only(
    resolver: &AdminResolver,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> Result<(), Rejection> {
    ensure_bot_is_admin(platform, message).await?;
    let sender = message.sender.as_ref().ok_or(Rejection::Unverified)?;
    if resolver.is_admin(platform, message.chat.id, sender.id).await {
        Ok(())
    } else {
        Err(Rejection::NotAdmin)
    }
}

async fn protect_admins(
    resolver: &AdminResolver,
    extractor: &dyn TargetExtractor,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> Result<(), Rejection> {
    let (target, _) = extractor.extract(platform, message).await;
    // The command body reports a missing target itself.
    let Some(target) = target else {
        return Ok(());
    };

    let sender = message.sender.as_ref().ok_or(Rejection::Unverified)?;
    if target.id == sender.id {
        return Err(Rejection::SelfTarget);
    }
    if resolver.is_admin(platform, message.chat.id, target.id).await {
        info!(chat_id = %message.chat.id, target = %target.id, "Refusing to target an administrator");
        return Err(Rejection::TargetIsAdmin);
    }
    Ok(())
}

async fn require_permission(
    permission: &str,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> Result<(), Rejection> {
    ensure_bot_is_admin(platform, message).await?;
    let sender = message.sender.as_ref().ok_or(Rejection::Unverified)?;

    match lookup_member(platform, message.chat.id, sender.id).await {
        MemberLookup::Found(member) => match member.status {
            MemberStatus::Owner => Ok(()),
            MemberStatus::Administrator if member.privileges.has(permission) => Ok(()),
            MemberStatus::Administrator => {
                Err(Rejection::MissingPrivilege(permission.to_string()))
            }
            _ => Err(Rejection::NotAdmin),
        },
        MemberLookup::NotAdministrator => Err(Rejection::NotAdmin),
        MemberLookup::NotAdminSubject => Err(Rejection::Unverified),
        MemberLookup::Failed(e) => {
            error!(%permission, error = %e, "Fallback permission check failed");
            Err(Rejection::CheckFailed)
        }
    }
}

/// A command body behind an ordered gate pipeline.
pub struct Gated<H> {
    gates: Vec<Gate>,
    resolver: AdminResolver,
    inner: H,
}

impl<H: CommandHandler> Gated<H> {
    pub fn new(inner: H) -> Self {
        Self {
            gates: Vec::new(),
            resolver: AdminResolver::default(),
            inner,
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.gates.push(Gate::AdminOnly);
        self
    }

    /// Meant to follow [`Gated::admin_only`].
    pub fn protect_admins(mut self, extractor: Arc<dyn TargetExtractor>) -> Self {
        self.gates.push(Gate::ProtectAdmins(extractor));
        self
    }

    pub fn require_permission(mut self, name: impl Into<String>) -> Self {
        self.gates.push(Gate::RequirePermission(name.into()));
        self
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }
}

#[async_trait]
impl<H: CommandHandler> CommandHandler for Gated<H> {
    async fn handle(&self, platform: &dyn ChatPlatform, message: &IncomingMessage) {
        for gate in &self.gates {
            if let GateDecision::Reject(rejection) =
                gate.evaluate(&self.resolver, platform, message).await
            {
                info!(
                    chat_id = %message.chat.id,
                    user_id = ?message.sender.as_ref().map(|u| u.id),
                    ?rejection,
                    "Command rejected"
                );
                if let Err(e) = platform.reply(message, &rejection.message()).await {
                    warn!(error = %e, "Failed to send rejection reply");
                }
                return;
            }
        }
        self.inner.handle(platform, message).await
    }
}
