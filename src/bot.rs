//! Long-running Telegram bot.
//!
//! Routes commands to their handlers. Moderation commands run behind the
//! admin gates; `/gemini` runs the relay.

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::gates::CommandHandler;
use crate::moderation::{ModerationAction, ModerationCommand};
use crate::platform::telegram::TelegramPlatform;
use crate::platform::IncomingMessage;
use crate::relay::GeminiRelay;
use crate::target::{ReplyOrArgumentExtractor, TargetExtractor};
use crate::usage::{JsonlUsageLog, UsageLog};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Available bot commands.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Say hello")]
    Start,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Ask Gemini, with answers grounded in web search")]
    Gemini(String),
    #[command(description = "Ban a user (reply to them or pass their ID)")]
    Ban(String),
    #[command(description = "Lift a ban")]
    Unban(String),
    #[command(description = "Remove a user without banning them")]
    Kick(String),
    #[command(description = "Stop a user from sending messages")]
    Mute(String),
    #[command(description = "Let a muted user talk again")]
    Unmute(String),
}

/// Command handlers, shared across updates.
#[derive(Clone)]
struct Handlers {
    gemini: Arc<dyn CommandHandler>,
    ban: Arc<dyn CommandHandler>,
    unban: Arc<dyn CommandHandler>,
    kick: Arc<dyn CommandHandler>,
    mute: Arc<dyn CommandHandler>,
    unmute: Arc<dyn CommandHandler>,
}

impl Handlers {
    fn new(relay: GeminiRelay, usage: Arc<dyn UsageLog>) -> Self {
        let extractor: Arc<dyn TargetExtractor> = Arc::new(ReplyOrArgumentExtractor);
        let moderation = |action| -> Arc<dyn CommandHandler> {
            Arc::new(ModerationCommand::new(action, Arc::clone(&extractor), Arc::clone(&usage)).gated())
        };

        Self {
            gemini: Arc::new(relay),
            ban: moderation(ModerationAction::Ban),
            unban: moderation(ModerationAction::Unban),
            kick: moderation(ModerationAction::Kick),
            mute: moderation(ModerationAction::Mute),
            unmute: moderation(ModerationAction::Unmute),
        }
    }

    fn route(&self, command: &Command) -> Option<&Arc<dyn CommandHandler>> {
        match command {
            Command::Start | Command::Help => None,
            Command::Gemini(_) => Some(&self.gemini),
            Command::Ban(_) => Some(&self.ban),
            Command::Unban(_) => Some(&self.unban),
            Command::Kick(_) => Some(&self.kick),
            Command::Mute(_) => Some(&self.mute),
            Command::Unmute(_) => Some(&self.unmute),
        }
    }
}

/// Handle the /start command.
async fn start_handler(bot: Bot, msg: Message) -> ResponseResult<()> {
    let text = "👋 Hi! Add me to a group and make me an administrator to use the moderation \
                commands, or ask me anything with /gemini.\n\nSend /help for the command list.";
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Handle the /help command.
async fn help_handler(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Route a parsed command.
///
/// Handlers run on their own task: the dispatcher serializes updates per
/// chat, and a relay request must not hold back the next update of its chat.
async fn dispatch(
    bot: Bot,
    msg: Message,
    cmd: Command,
    platform: Arc<TelegramPlatform>,
    handlers: Handlers,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => start_handler(bot, msg).await,
        Command::Help => help_handler(bot, msg).await,
        ref command => {
            if let Some(handler) = handlers.route(command) {
                let handler = Arc::clone(handler);
                let incoming = IncomingMessage::from_telegram(&msg);
                tracing::debug!(chat_id = %incoming.chat.id, ?command, "Dispatching command");
                tokio::spawn(async move {
                    handler.handle(platform.as_ref(), &incoming).await;
                });
            }
            Ok(())
        }
    }
}

/// Main entry point for the bot.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path)?;

    let bot = Bot::new(&config.telegram.bot_token);

    tracing::info!("Starting groupkeeper bot...");

    let platform = Arc::new(TelegramPlatform::connect(bot.clone()).await?);
    let bot_username = config
        .telegram
        .bot_username
        .clone()
        .unwrap_or_else(|| platform.username().to_string());
    tracing::info!(username = %bot_username, model = %config.gemini.model, "Bot identity resolved");

    let usage: Arc<dyn UsageLog> =
        Arc::new(JsonlUsageLog::new(Some(config.usage_log_path.clone())));
    let backend = Arc::new(
        GeminiClient::new(
            config.gemini.api_key.clone(),
            Duration::from_secs(config.gemini.timeout_seconds),
        )
        .context("Failed to build Gemini HTTP client")?,
    );
    let relay = GeminiRelay::new(backend, Arc::clone(&usage), config.gemini.model.clone(), bot_username);
    let handlers = Handlers::new(relay, usage);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint({
            let platform = Arc::clone(&platform);
            move |bot: Bot, msg: Message, cmd: Command| {
                let platform = Arc::clone(&platform);
                let handlers = handlers.clone();
                async move { dispatch(bot, msg, cmd, platform, handlers).await }
            }
        });

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, RecordingUsageLog};

    fn handlers() -> Handlers {
        let usage: Arc<dyn UsageLog> = Arc::new(RecordingUsageLog::default());
        let relay = GeminiRelay::new(
            Arc::new(FakeBackend::answering("ok")),
            Arc::clone(&usage),
            "gemini-2.5-flash",
            "keeper_bot",
        );
        Handlers::new(relay, usage)
    }

    #[test]
    fn test_parse_commands() {
        let cmd = Command::parse("/gemini what is rust", "keeper_bot").unwrap();
        assert!(matches!(cmd, Command::Gemini(ref p) if p == "what is rust"));

        let cmd = Command::parse("/ban@keeper_bot spam", "keeper_bot").unwrap();
        assert!(matches!(cmd, Command::Ban(ref r) if r == "spam"));

        assert!(matches!(Command::parse("/help", "keeper_bot"), Ok(Command::Help)));
    }

    #[test]
    fn test_route() {
        let handlers = handlers();
        assert!(handlers.route(&Command::Start).is_none());
        assert!(handlers.route(&Command::Help).is_none());
        assert!(Arc::ptr_eq(
            handlers.route(&Command::Gemini(String::new())).unwrap(),
            &handlers.gemini
        ));
        assert!(Arc::ptr_eq(
            handlers.route(&Command::Kick(String::new())).unwrap(),
            &handlers.kick
        ));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = Command::descriptions().to_string();
        for name in ["/gemini", "/ban", "/unban", "/kick", "/mute", "/unmute"] {
            assert!(help.contains(name), "{name} missing from help");
        }
    }
}
