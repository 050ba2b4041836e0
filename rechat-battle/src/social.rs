//! Social client interface and announcement composition
//!
//! Battles are fought in public: the challenge and its acceptance are
//! announced on the social feed so spectators can find, watch, and vote.
//! Posting goes through an injected [`SocialClient`]; message text is
//! composed here so every implementation announces battles the same way.

use async_trait::async_trait;
use rechat_common::model::{Verse, MAX_LYRICS_CHARS};
use serde::{Deserialize, Serialize};

/// Platform limit for one post (characters)
pub const MAX_POST_CHARS: usize = 280;

/// Result of a successful post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceipt {
    /// Platform post id, used for reply threading
    pub post_id: String,
    /// Public post URL
    pub post_url: String,
}

/// Public feed access for battle announcements
///
/// Implementations own authentication, media upload, and rate limits.
/// Hashtags arrive bare (no `#`); attaching them is platform-specific.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Announce a new challenge
    async fn post_challenge(
        &self,
        defender_handle: &str,
        message: &str,
        hashtags: &[String],
        media_ref: &str,
        window_hours: u64,
    ) -> anyhow::Result<PostReceipt>;

    /// Announce an acceptance, reply-threaded to the challenge post when
    /// `in_reply_to` carries its id
    async fn post_response(
        &self,
        battle_id: u64,
        message: &str,
        hashtags: &[String],
        media_ref: &str,
        in_reply_to: Option<&str>,
    ) -> anyhow::Result<PostReceipt>;
}

// ========================================
// Message composition
// ========================================

/// Compose the challenge announcement text
///
/// Mention line, first-verse preview (clipped to the caption limit),
/// stake and response-window lines. The whole message stays within
/// [`MAX_POST_CHARS`].
pub fn compose_challenge_message(
    defender_handle: &str,
    stake_amount: u64,
    verses: &[Verse],
    window_hours: u64,
) -> String {
    let mut message = format!("@{defender_handle} you have been challenged to a rap battle!\n");
    if let Some(first) = verses.first() {
        message.push_str(&format!("\"{}\"\n", clip(&first.lyrics, MAX_LYRICS_CHARS)));
    }
    message.push_str(&format!("Stake: {stake_amount}\n"));
    message.push_str(&format!("Respond within {window_hours}h or forfeit."));
    clip(&message, MAX_POST_CHARS)
}

/// Compose the acceptance announcement text
pub fn compose_response_message(battle_id: u64, verses: &[Verse]) -> String {
    let mut message = format!("Challenge accepted. Battle #{battle_id} is on!\n");
    if let Some(first) = verses.first() {
        message.push_str(&format!("\"{}\"\n", clip(&first.lyrics, MAX_LYRICS_CHARS)));
    }
    message.push_str("Verses drop when both sides reveal.");
    clip(&message, MAX_POST_CHARS)
}

/// Pull the numeric post id out of a status URL
///
/// Handles trailing query strings and path segments
/// (`…/status/123?s=20`, `…/status/123/photo/1`). `None` when the URL
/// carries no `/status/<digits>` part.
pub fn extract_post_id(url: &str) -> Option<String> {
    let (_, tail) = url.split_once("/status/")?;
    let id: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Clip to `limit` characters, ending in an ellipsis when cut
fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(lyrics: &str) -> Verse {
        Verse::new(1, lyrics, 0, 2000, 90)
    }

    #[test]
    fn test_challenge_message_carries_the_essentials() {
        let message = compose_challenge_message(
            "rhyme_king",
            1_000_000,
            &[verse("yo check the flow")],
            24,
        );

        assert!(message.starts_with("@rhyme_king"));
        assert!(message.contains("\"yo check the flow\""));
        assert!(message.contains("Stake: 1000000"));
        assert!(message.contains("24h"));
    }

    #[test]
    fn test_challenge_message_without_verses_skips_preview() {
        let message = compose_challenge_message("rhyme_king", 500, &[], 24);
        assert!(!message.contains('"'));
        assert!(message.contains("Stake: 500"));
    }

    #[test]
    fn test_long_preview_clipped_to_caption_limit() {
        let long_lyrics = "bar ".repeat(60);
        let message = compose_challenge_message("rhyme_king", 500, &[verse(&long_lyrics)], 24);

        let quoted: &str = message
            .split('"')
            .nth(1)
            .expect("preview should be quoted");
        assert_eq!(quoted.chars().count(), MAX_LYRICS_CHARS);
        assert!(quoted.ends_with("..."));
    }

    #[test]
    fn test_message_never_exceeds_post_limit() {
        let handle = "h".repeat(200);
        let message =
            compose_challenge_message(&handle, u64::MAX, &[verse(&"x".repeat(139))], 24);

        assert!(message.chars().count() <= MAX_POST_CHARS);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_response_message_names_the_battle() {
        let message = compose_response_message(42, &[verse("counter bars")]);
        assert!(message.contains("Battle #42"));
        assert!(message.contains("\"counter bars\""));
    }

    #[test]
    fn test_extract_post_id_plain_url() {
        assert_eq!(
            extract_post_id("https://x.com/mc_flow/status/1234567890").as_deref(),
            Some("1234567890")
        );
    }

    #[test]
    fn test_extract_post_id_strips_query_and_path() {
        assert_eq!(
            extract_post_id("https://x.com/mc_flow/status/123?s=20&t=abc").as_deref(),
            Some("123")
        );
        assert_eq!(
            extract_post_id("https://x.com/mc_flow/status/123/photo/1").as_deref(),
            Some("123")
        );
    }

    #[test]
    fn test_extract_post_id_absent() {
        assert_eq!(extract_post_id("https://x.com/mc_flow"), None);
        assert_eq!(extract_post_id("https://x.com/mc_flow/status/"), None);
        assert_eq!(extract_post_id("https://x.com/status/abc123"), None);
        assert_eq!(extract_post_id(""), None);
    }
}
