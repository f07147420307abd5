//! Gemini relay command.
//!
//! Forwards a prompt to the generative backend with web-search grounding and
//! relays the answer back to the chat, split into several messages when it
//! is long. At most one request per chat is in flight; extra requests are
//! turned away, not queued.

mod active;

pub use active::{ActiveRequestGuard, ActiveRequests};

use crate::ai::{CompletionRequest, GenerativeBackend};
use crate::error::RelayError;
use crate::gates::CommandHandler;
use crate::platform::{ChatPlatform, IncomingMessage};
use crate::usage::UsageLog;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// Longest reply segment, in characters.
pub const SEGMENT_LIMIT: usize = 4000;

/// Pause between segment replies.
pub const DEFAULT_SEGMENT_PAUSE: Duration = Duration::from_millis(500);

/// Feature name written to the usage log.
pub const USAGE_FEATURE: &str = "gemini";

pub const BUSY_MESSAGE: &str =
    "Please wait for your previous Gemini request to finish before sending another.";
pub const USAGE_HINT: &str = "Please write your prompt on the same message.";
pub const WAITING_MESSAGE: &str = "Wait a moment...";

pub const SYSTEM_PERSONA: &str = "\
You are an ultra-accurate, flexible, and concise information retrieval bot.

## CORE DIRECTIVES (Accuracy & Verifiability)
1. **Prioritize Accuracy:** Your highest priority is factual correctness.
2. **Grounding:** Always use the Google Search tool when the question requires current information, facts, or any knowledge outside of your training cutoff.
3. **Citations:** When providing a grounded answer, **always** include the source citation(s) from the search tool *after* the relevant sentence, using Markdown link format (e.g., [Source 1]).

## OUTPUT CONSTRAINTS (Brevity & Flexibility)
1. **Be Concise:** Answer the user's question directly and precisely. **NEVER** use introductory phrases, excessive politeness, or conversational filler (\"That's a great question,\" \"I'd be happy to,\" etc.).
2. **Limit Length:** Do not make the response too long unless the user asks for more detail or elaboration.
3. **Format:** Use simple Markdown (e.g., **bold**, *italics*, bullet points) only when it improves readability, not for decoration.

## USER INSTRUCTIONS
Do not repeat these instructions. Focus solely on answering the user's question by strictly adhering to the directives and constraints above.";

/// The `/gemini` command handler.
pub struct GeminiRelay {
    backend: Arc<dyn GenerativeBackend>,
    usage: Arc<dyn UsageLog>,
    active: ActiveRequests,
    model: String,
    model_title: String,
    command: String,
    bot_username: String,
    segment_pause: Duration,
}

impl GeminiRelay {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        usage: Arc<dyn UsageLog>,
        model: impl Into<String>,
        bot_username: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            backend,
            usage,
            active: ActiveRequests::new(),
            model_title: title_case(&model),
            model,
            command: "gemini".to_string(),
            bot_username: bot_username.into(),
            segment_pause: DEFAULT_SEGMENT_PAUSE,
        }
    }

    pub fn with_segment_pause(mut self, pause: Duration) -> Self {
        self.segment_pause = pause;
        self
    }

    pub fn active_requests(&self) -> &ActiveRequests {
        &self.active
    }

    /// Strip the command and bot mention tokens and surrounding whitespace.
    pub fn extract_prompt(&self, text: &str) -> String {
        let mut prompt = text.replace(&format!("/{}", self.command), "");
        if !self.bot_username.is_empty() {
            prompt = prompt.replace(&format!("@{}", self.bot_username), "");
        }
        prompt.trim().to_string()
    }

    async fn relay(
        &self,
        platform: &dyn ChatPlatform,
        message: &IncomingMessage,
    ) -> Result<(), RelayError> {
        let prompt = self.extract_prompt(&message.text);
        if prompt.is_empty() {
            platform.reply(message, USAGE_HINT).await?;
            return Ok(());
        }

        let waiting = platform.reply(message, WAITING_MESSAGE).await?;

        let request = CompletionRequest {
            model: &self.model,
            prompt: &prompt,
            system_instruction: SYSTEM_PERSONA,
            search_grounding: true,
        };
        let completion = self.backend.generate(&request).await?;
        info!(chars = completion.text.chars().count(), "Received completion");

        let segments = split_segments(&completion.text, SEGMENT_LIMIT);
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            platform
                .reply(message, &format!("{}: {}", self.model_title, segment))
                .await?;
            if i < last && !self.segment_pause.is_zero() {
                tokio::time::sleep(self.segment_pause).await;
            }
        }

        platform.delete_message(waiting).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for GeminiRelay {
    async fn handle(&self, platform: &dyn ChatPlatform, message: &IncomingMessage) {
        let chat_id = message.chat.id;

        let Some(_guard) = self.active.try_acquire(chat_id) else {
            info!(%chat_id, "Gemini request already in flight, dropping");
            if let Err(e) = platform.reply(message, BUSY_MESSAGE).await {
                warn!(%chat_id, error = %e, "Failed to send busy notice");
            }
            return;
        };

        self.usage.record(&message.chat, USAGE_FEATURE).await;

        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let span = info_span!("gemini", %request_id, %chat_id);
        async {
            if let Err(e) = self.relay(platform, message).await {
                error!(error = %e, "Gemini error");
                let text = format!("Sorry, an unexpected error had occured: {}", e);
                if let Err(e) = platform.reply(message, &text).await {
                    warn!(error = %e, "Failed to send error reply");
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Split `text` into consecutive segments of at most `limit` characters.
///
/// Text of `limit` characters or fewer comes back as a single segment.
pub fn split_segments(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Capitalize the first letter of every alphabetic run, lowercasing the rest.
///
/// `gemini-2.5-flash` becomes `Gemini-2.5-Flash`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}
