//! Title summarization.
//!
//! After a completed turn the session title is regenerated from the early
//! transcript, but only while the log is short; established conversations
//! keep their title. Failures are swallowed so a title hiccup never affects
//! the turn that triggered it.

use tracing::{debug, warn};

use parley_core::Message;
use parley_llm::ModelClient;

/// Title reported before summarization has produced one.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Summarize only while the log holds this many messages.
const TITLE_WINDOW: std::ops::RangeInclusive<usize> = 2..=6;

/// Whether the log is in the window where titles are (re)generated.
#[must_use]
pub fn in_window(message_count: usize) -> bool {
    TITLE_WINDOW.contains(&message_count)
}

/// Generate a title from the transcript, or `None` when the log is outside
/// the window or the model call fails.
pub async fn generate(model: &dyn ModelClient, messages: &[Message]) -> Option<String> {
    if !in_window(messages.len()) {
        return None;
    }

    let transcript = messages
        .iter()
        .map(|m| {
            let role = match m.role {
                parley_core::Role::User => "user",
                parley_core::Role::Assistant => "assistant",
                parley_core::Role::System => "system",
            };
            format!("- {role}: {}", m.text())
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Summarize the following conversation in a short and descriptive title, \
like a chat topic label.\n\n\
Do not include quotes or punctuation around the title\n\n\
Keep it under 8 words, clear and relevant:\n\n{transcript}\n"
    );

    match model.complete(&prompt).await {
        Ok(title) => {
            let title = title.trim().to_owned();
            if title.is_empty() {
                None
            } else {
                debug!(title, "generated session title");
                Some(title)
            }
        }
        Err(e) => {
            warn!(error = %e, "title generation failed, keeping previous title");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testsupport::StubModel;

    use super::*;

    fn log(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {i}"))
                } else {
                    Message::assistant(format!("answer {i}"))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn window_boundaries() {
        assert!(!in_window(1));
        assert!(in_window(2));
        assert!(in_window(6));
        assert!(!in_window(7));
    }

    #[tokio::test]
    async fn single_message_log_is_skipped() {
        let model = StubModel::new().with_completion("Weather Chat");
        assert!(generate(&model, &log(1)).await.is_none());
        assert_eq!(model.completions(), 0);
    }

    #[tokio::test]
    async fn generates_within_window() {
        let model = StubModel::new().with_completion("  Weather In Boston \n");
        let title = generate(&model, &log(2)).await;
        assert_eq!(title.as_deref(), Some("Weather In Boston"));
        assert_eq!(model.completions(), 1);
    }

    #[tokio::test]
    async fn long_log_is_skipped() {
        let model = StubModel::new().with_completion("Too Late");
        assert!(generate(&model, &log(7)).await.is_none());
        assert_eq!(model.completions(), 0);
    }

    #[tokio::test]
    async fn model_failure_is_swallowed() {
        let model = StubModel::new().with_failing_completion();
        assert!(generate(&model, &log(3)).await.is_none());
    }

    #[tokio::test]
    async fn prompt_contains_transcript() {
        let model = StubModel::new().with_completion("Topic");
        let messages = vec![Message::user("what is rust"), Message::assistant("a language")];
        let _ = generate(&model, &messages).await;

        let prompt = model.last_completion_prompt().unwrap();
        assert!(prompt.contains("- user: what is rust"));
        assert!(prompt.contains("- assistant: a language"));
        assert!(prompt.contains("under 8 words"));
    }
}
