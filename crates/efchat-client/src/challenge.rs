//! Captcha challenge sub-protocol.
//!
//! The server interrupts chat with a `cap` frame carrying an inline image
//! link to a captcha. The session hands the resolved URL to an externally
//! supplied [`ChallengeResolver`] (a blocking stdin prompt by default) and
//! sends the answer back as a plain chat frame. Each challenge is handled
//! in its own task with a bounded timeout, so the receive loop keeps
//! processing other frames while an answer is pending.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use efchat_model::{ClientFrame, Message, Segment};

use crate::session::Session;

/// How long a challenge waits for resolution before being abandoned.
pub const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Base URL the captcha image path is resolved against.
pub const SITE_BASE: &str = "https://efchat.melon.fish/";

/// Supplies answers to server captcha challenges.
#[async_trait]
pub trait ChallengeResolver: Send + Sync {
    /// Resolves the challenge at `url`; `None` abandons it.
    async fn resolve(&self, url: &str) -> Option<String>;
}

/// Default resolver: prints the captcha URL and reads the answer from
/// stdin on a blocking thread.
pub struct StdinResolver;

#[async_trait]
impl ChallengeResolver for StdinResolver {
    async fn resolve(&self, url: &str) -> Option<String> {
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            print!("captcha at {url}\nanswer: ");
            io::stdout().flush().ok()?;
            io::stdin().lock().read_line(&mut line).ok()?;
            let answer = line.trim().to_string();
            (!answer.is_empty()).then_some(answer)
        })
        .await
        .ok()
        .flatten()
    }
}

/// Extracts the challenge URL from the frame body.
///
/// The body usually embeds the captcha as an inline image link; its path
/// is resolved against [`SITE_BASE`]. When no image token is present the
/// raw text is returned as-is.
pub fn challenge_url(text: &str) -> String {
    Message::decode(text)
        .segments()
        .iter()
        .find_map(|segment| match segment {
            Segment::Image(image) => Some(format!("{SITE_BASE}{}", image.url)),
            _ => None,
        })
        .unwrap_or_else(|| text.to_string())
}

/// Handles one challenge frame: resolve within the timeout, then answer
/// with a single chat frame. One-shot; a timeout simply abandons the
/// challenge until the server re-prompts or drops the connection.
pub(crate) async fn run_challenge(session: Arc<Session>, text: String) {
    let url = challenge_url(&text);
    warn!(bot_id = %session.key(), %url, "captcha challenge received");

    let resolver = Arc::clone(session.resolver());
    match tokio::time::timeout(CHALLENGE_TIMEOUT, resolver.resolve(&url)).await {
        Ok(Some(answer)) => {
            info!(bot_id = %session.key(), "submitting captcha answer");
            if let Err(err) = session
                .send(&ClientFrame::chat(answer, true, session.head().to_string()))
                .await
            {
                warn!(bot_id = %session.key(), error = %err, "failed to submit captcha answer");
            }
        }
        Ok(None) => {
            warn!(bot_id = %session.key(), "challenge resolver returned no answer");
        }
        Err(_) => {
            warn!(bot_id = %session.key(), "challenge timed out");
        }
    }
}
