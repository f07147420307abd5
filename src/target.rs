//! Target user extraction for moderation commands.

use crate::platform::{ChatPlatform, IncomingMessage, MemberSubject, UserRef};
use async_trait::async_trait;
use teloxide::types::UserId;
use tracing::debug;

/// Finds the user a command is aimed at, plus the free-text reason.
#[async_trait]
pub trait TargetExtractor: Send + Sync {
    async fn extract(
        &self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
    ) -> (Option<UserRef>, String);
}

/// Default extractor.
///
/// Looks, in order, at the replied-to message's sender, a text mention, and a
/// numeric user id given as the first argument. `@username` arguments are not
/// resolvable through the Bot API and yield no target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyOrArgumentExtractor;

#[async_trait]
impl TargetExtractor for ReplyOrArgumentExtractor {
    async fn extract(
        &self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
    ) -> (Option<UserRef>, String) {
        let args = message.arguments();

        if let Some(user) = &message.reply_to_sender {
            return (Some(user.clone()), args.to_string());
        }

        let (first, rest) = split_first_token(args);

        if let Some(user) = message.mentioned_users.first() {
            return (Some(user.clone()), rest.to_string());
        }

        let Ok(raw_id) = first.parse::<u64>() else {
            return (None, args.to_string());
        };
        let user_id = UserId(raw_id);

        // Best effort: a failed lookup still yields a usable target.
        let user = match platform
            .get_chat_member(message.chat.id, MemberSubject::User(user_id))
            .await
        {
            Ok(member) => member.user,
            Err(e) => {
                debug!(%user_id, error = %e, "Could not resolve target name");
                UserRef::new(user_id, String::new())
            }
        };
        (Some(user), rest.to_string())
    }
}

fn split_first_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChatKind, MemberStatus};
    use crate::testing::{member, message, FakePlatform, LookupFailure};

    #[tokio::test]
    async fn test_reply_target_takes_all_arguments_as_reason() {
        let platform = FakePlatform::new(ChatKind::Supergroup);
        let mut msg = message(ChatKind::Supergroup, UserId(1), "/ban spamming links");
        msg.reply_to_sender = Some(UserRef::new(UserId(7), "Spammer"));

        let (target, reason) = ReplyOrArgumentExtractor.extract(&platform, &msg).await;
        assert_eq!(target.map(|u| u.id), Some(UserId(7)));
        assert_eq!(reason, "spamming links");
    }

    #[tokio::test]
    async fn test_text_mention_target() {
        let platform = FakePlatform::new(ChatKind::Supergroup);
        let mut msg = message(ChatKind::Supergroup, UserId(1), "/mute Bob flooding");
        msg.mentioned_users = vec![UserRef::new(UserId(8), "Bob")];

        let (target, reason) = ReplyOrArgumentExtractor.extract(&platform, &msg).await;
        assert_eq!(target.map(|u| u.id), Some(UserId(8)));
        assert_eq!(reason, "flooding");
    }

    #[tokio::test]
    async fn test_numeric_id_resolves_name() {
        let platform = FakePlatform::new(ChatKind::Supergroup)
            .with_member(member(UserId(55), MemberStatus::Member));
        let msg = message(ChatKind::Supergroup, UserId(1), "/kick 55 off topic");

        let (target, reason) = ReplyOrArgumentExtractor.extract(&platform, &msg).await;
        let target = target.unwrap();
        assert_eq!(target.id, UserId(55));
        assert_eq!(target.display_name, "user55");
        assert_eq!(reason, "off topic");
    }

    #[tokio::test]
    async fn test_numeric_id_survives_failed_lookup() {
        let platform = FakePlatform::new(ChatKind::Supergroup)
            .failing_member_lookup(LookupFailure::Transient);
        let msg = message(ChatKind::Supergroup, UserId(1), "/ban 55");

        let (target, reason) = ReplyOrArgumentExtractor.extract(&platform, &msg).await;
        assert_eq!(target.map(|u| u.id), Some(UserId(55)));
        assert!(reason.is_empty());
    }

    #[tokio::test]
    async fn test_no_target() {
        let platform = FakePlatform::new(ChatKind::Supergroup);
        for text in ["/ban", "/ban @someone rude"] {
            let msg = message(ChatKind::Supergroup, UserId(1), text);
            let (target, _) = ReplyOrArgumentExtractor.extract(&platform, &msg).await;
            assert!(target.is_none(), "{text}");
        }
    }
}
