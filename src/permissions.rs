//! Admin status resolution.
//!
//! `AdminResolver` answers "is this user an owner or administrator here?" by
//! walking an ordered list of strategies until one gives a definitive
//! verdict. Every failure degrades to a conservative answer, so callers never
//! see an error.

use crate::error::PlatformError;
use crate::platform::{ChatPlatform, Member, MemberSubject};
use teloxide::types::{ChatId, UserId};
use tracing::{debug, info, warn};

/// Outcome of a single strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admin,
    NotAdmin,
    /// No definitive answer; defer to the next strategy.
    Undecided,
}

/// One way of deciding admin status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Everyone counts as admin in a one-to-one chat.
    PrivateChat,
    /// A bot that is not admin itself cannot vouch for anybody.
    BotMembership,
    /// Direct per-user membership lookup.
    DirectLookup,
    /// Scan the full administrator list.
    AdministratorList,
}

impl Strategy {
    pub async fn evaluate(
        self,
        platform: &dyn ChatPlatform,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Verdict {
        match self {
            Strategy::PrivateChat => match platform.get_chat(chat_id).await {
                Ok(chat) if chat.kind.is_private() => {
                    info!(%chat_id, %user_id, "Private chat, allowing");
                    Verdict::Admin
                }
                Ok(chat) => {
                    debug!(%chat_id, kind = chat.kind.as_str(), "Checking admin permissions");
                    Verdict::Undecided
                }
                Err(e) => {
                    warn!(%chat_id, error = %e, "Could not look up chat");
                    Verdict::NotAdmin
                }
            },
            Strategy::BotMembership => {
                match platform.get_chat_member(chat_id, MemberSubject::Me).await {
                    Ok(bot) if bot.status.is_privileged() => Verdict::Undecided,
                    Ok(bot) => {
                        warn!(%chat_id, status = ?bot.status, "Bot is not an admin in this chat");
                        Verdict::NotAdmin
                    }
                    Err(e) => {
                        warn!(%chat_id, error = %e, "Could not check bot admin status");
                        Verdict::Undecided
                    }
                }
            }
            Strategy::DirectLookup => {
                match platform
                    .get_chat_member(chat_id, MemberSubject::User(user_id))
                    .await
                {
                    Ok(member) => {
                        debug!(%chat_id, %user_id, status = ?member.status, "Member status");
                        if member.status.is_privileged() {
                            Verdict::Admin
                        } else {
                            Verdict::NotAdmin
                        }
                    }
                    Err(e) if e.is_not_admin_subject() => {
                        warn!(%chat_id, %user_id, error = %e, "Not an admin subject");
                        Verdict::NotAdmin
                    }
                    Err(e) => {
                        warn!(%chat_id, %user_id, error = %e, "Member lookup failed");
                        Verdict::Undecided
                    }
                }
            }
            Strategy::AdministratorList => match platform.get_chat_administrators(chat_id).await {
                Ok(admins) => {
                    debug!(%chat_id, count = admins.len(), "Scanning administrators list");
                    if admins.iter().any(|admin| admin.user.id == user_id) {
                        Verdict::Admin
                    } else {
                        Verdict::NotAdmin
                    }
                }
                Err(e) => {
                    warn!(%chat_id, error = %e, "Administrators list lookup failed");
                    Verdict::NotAdmin
                }
            },
        }
    }
}

/// Strategy order used by [`AdminResolver::default`].
pub const DEFAULT_STRATEGIES: [Strategy; 4] = [
    Strategy::PrivateChat,
    Strategy::BotMembership,
    Strategy::DirectLookup,
    Strategy::AdministratorList,
];

/// Resolves admin status through an ordered strategy list.
#[derive(Debug, Clone)]
pub struct AdminResolver {
    strategies: Vec<Strategy>,
}

impl Default for AdminResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGIES.to_vec())
    }
}

impl AdminResolver {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Whether `user_id` is an owner or administrator of `chat_id`.
    ///
    /// Returns false when no strategy reaches a verdict.
    pub async fn is_admin(
        &self,
        platform: &dyn ChatPlatform,
        chat_id: ChatId,
        user_id: UserId,
    ) -> bool {
        for strategy in &self.strategies {
            match strategy.evaluate(platform, chat_id, user_id).await {
                Verdict::Admin => return true,
                Verdict::NotAdmin => return false,
                Verdict::Undecided => continue,
            }
        }
        info!(%chat_id, %user_id, "No strategy reached a verdict, denying");
        false
    }
}

/// Result of [`lookup_member`].
#[derive(Debug)]
pub enum MemberLookup {
    /// Membership record, from the direct lookup or the administrators list.
    Found(Member),
    /// The direct lookup failed and the user is not in the administrators list.
    NotAdministrator,
    /// The platform refused to treat the user as an admin subject.
    NotAdminSubject,
    /// Both the direct lookup and the administrators list failed.
    Failed(PlatformError),
}

/// Fetch a member record, falling back to the administrators list when the
/// direct lookup fails for a reason other than "not an admin subject".
pub async fn lookup_member(
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    user_id: UserId,
) -> MemberLookup {
    let err = match platform
        .get_chat_member(chat_id, MemberSubject::User(user_id))
        .await
    {
        Ok(member) => return MemberLookup::Found(member),
        Err(e) if e.is_not_admin_subject() => return MemberLookup::NotAdminSubject,
        Err(e) => e,
    };

    warn!(%chat_id, %user_id, error = %err, "Member lookup failed, checking administrators list");
    match platform.get_chat_administrators(chat_id).await {
        Ok(admins) => admins
            .into_iter()
            .find(|admin| admin.user.id == user_id)
            .map(MemberLookup::Found)
            .unwrap_or(MemberLookup::NotAdministrator),
        Err(e) => MemberLookup::Failed(e),
    }
}
