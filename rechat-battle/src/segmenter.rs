//! Verse segmentation from timed transcripts
//!
//! Turns the word-level transcript of a recorded performance into the
//! verses that get committed on chain. Segmentation is deterministic and
//! trusts input order; it never reorders or re-times words. The same
//! transcript always yields the same verses, which is what makes the
//! commitment reproducible at reveal time.

use async_trait::async_trait;
use rechat_common::error::{Error, Result};
use rechat_common::model::{
    Verse, WordTimestamp, MAX_LYRICS_CHARS, MAX_VERSES_PER_ENTRY, MIN_VERSES_PER_ENTRY,
};
use tracing::debug;

/// A verse closes once this many words accumulate without a sentence end
pub const MAX_WORDS_PER_VERSE: usize = 20;

/// Characters that end a sentence and close the current verse
const SENTENCE_TERMINALS: &[char] = &['.', '!', '?'];

// ========================================
// Segmentation
// ========================================

/// Segment an ordered word transcript into verses
///
/// Words accumulate in order into the current verse. The verse closes
/// when the word count reaches [`MAX_WORDS_PER_VERSE`] or the current
/// word ends with `.`, `!` or `?`; any words left at end of input form
/// a final verse. Empty-text words are skipped.
///
/// Each verse carries the words joined by single spaces (punctuation
/// retained), the first word's start and last word's end, and the
/// rounded mean word confidence scaled to 0-100.
pub fn segment_transcript(words: &[WordTimestamp]) -> Vec<Verse> {
    let mut verses: Vec<Verse> = Vec::new();
    let mut current: Vec<&WordTimestamp> = Vec::new();

    for word in words {
        if word.word.trim().is_empty() {
            continue;
        }
        current.push(word);

        let sentence_end = word.word.trim_end().ends_with(SENTENCE_TERMINALS);
        if current.len() >= MAX_WORDS_PER_VERSE || sentence_end {
            verses.push(close_verse(verses.len() as u32 + 1, &current));
            current.clear();
        }
    }

    if !current.is_empty() {
        verses.push(close_verse(verses.len() as u32 + 1, &current));
    }

    verses
}

/// Build one verse from the accumulated words
///
/// Callers guarantee `words` is non-empty. Confidence is averaged in f64
/// so long verses don't lose precision to repeated f32 addition.
fn close_verse(verse_number: u32, words: &[&WordTimestamp]) -> Verse {
    let lyrics = words
        .iter()
        .map(|w| w.word.trim())
        .collect::<Vec<_>>()
        .join(" ");

    let scaled_sum: f64 = words.iter().map(|w| f64::from(w.confidence) * 100.0).sum();
    let confidence = (scaled_sum / words.len() as f64).round().clamp(0.0, 100.0) as u8;

    Verse::new(
        verse_number,
        lyrics,
        words[0].start_ms,
        words[words.len() - 1].end_ms,
        confidence,
    )
}

// ========================================
// Entry validation
// ========================================

/// Validate a verse set as one battle entry
///
/// An entry is what a participant commits: 1-4 structurally valid verses
/// numbered sequentially from 1. Violations name the offending verse.
pub fn validate_entry(verses: &[Verse]) -> Result<()> {
    if verses.len() < MIN_VERSES_PER_ENTRY {
        return Err(Error::Validation(String::from("entry contains no verses")));
    }
    if verses.len() > MAX_VERSES_PER_ENTRY {
        return Err(Error::Validation(format!(
            "entry contains {} verses, maximum is {}",
            verses.len(),
            MAX_VERSES_PER_ENTRY
        )));
    }

    for (position, verse) in verses.iter().enumerate() {
        let expected = position as u32 + 1;
        if verse.verse_number != expected {
            return Err(Error::Validation(format!(
                "verse numbering must be sequential from 1: expected {expected}, found {}",
                verse.verse_number
            )));
        }
        if let Some(issue) = verse_issue(verse) {
            return Err(Error::Validation(format!(
                "verse {}: {issue}",
                verse.verse_number
            )));
        }
    }

    Ok(())
}

/// The first structural problem with a verse, if any
fn verse_issue(verse: &Verse) -> Option<String> {
    if verse.lyrics.trim().is_empty() {
        return Some(String::from("lyrics are empty"));
    }
    let chars = verse.lyrics.chars().count();
    if chars > MAX_LYRICS_CHARS {
        return Some(format!(
            "lyrics run {chars} characters, caption limit is {MAX_LYRICS_CHARS}"
        ));
    }
    if verse.start_ms >= verse.end_ms {
        return Some(format!(
            "time span is empty ({}ms..{}ms)",
            verse.start_ms, verse.end_ms
        ));
    }
    if verse.confidence > 100 {
        return Some(format!("confidence {} exceeds 100", verse.confidence));
    }
    None
}

// ========================================
// Transcript source collaborator
// ========================================

/// Source of word-level transcripts for recorded performances
///
/// Speech-to-text lives behind this trait; the engine never transcribes.
/// Implementations own their I/O and retries.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Produce the ordered word sequence for a recording reference
    async fn transcribe(&self, recording_ref: &str) -> anyhow::Result<Vec<WordTimestamp>>;
}

/// Transcribe a recording and segment the result into verses
pub async fn verses_from_recording(
    source: &dyn TranscriptSource,
    recording_ref: &str,
) -> Result<Vec<Verse>> {
    let words = source
        .transcribe(recording_ref)
        .await
        .map_err(|e| Error::Transcription(format!("{e:#}")))?;
    debug!(
        recording_ref = %recording_ref,
        words = words.len(),
        "transcript received"
    );
    Ok(segment_transcript(&words))
}
