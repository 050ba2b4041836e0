//! Domain model for the battle protocol
//!
//! Shared between the protocol engine and embedding applications:
//! transcript words, segmented verses, battle lifecycle status, vote
//! choices, and the battle record as read back from the chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform caption limit for a single verse clip (characters)
pub const MAX_LYRICS_CHARS: usize = 140;

/// Minimum verses in one battle entry
pub const MIN_VERSES_PER_ENTRY: usize = 1;

/// Maximum verses in one battle entry
pub const MAX_VERSES_PER_ENTRY: usize = 4;

// ========================================
// Transcript words and verses
// ========================================

/// One transcribed word with its position on the recording timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    /// Word text as transcribed (terminal punctuation retained)
    pub word: String,
    /// Start offset into the recording (milliseconds)
    pub start_ms: u64,
    /// End offset into the recording (milliseconds)
    pub end_ms: u64,
    /// Transcription confidence (0.0-1.0)
    pub confidence: f32,
    /// Language tag reported by the transcriber
    pub language: String,
}

impl WordTimestamp {
    /// Create a word timestamp with the default language tag
    pub fn new(word: impl Into<String>, start_ms: u64, end_ms: u64, confidence: f32) -> Self {
        Self {
            word: word.into(),
            start_ms,
            end_ms,
            confidence,
            language: String::from("en"),
        }
    }

    /// Word duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// One segmented verse of a battle entry
///
/// Verses are the unit of commitment: lyrics plus the time span they
/// occupy on the recording. Confidence is the rounded mean of the word
/// confidences, scaled to 0-100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// 1-based position within the entry
    pub verse_number: u32,
    /// Words joined by single spaces, punctuation retained
    pub lyrics: String,
    /// First word's start offset (milliseconds)
    pub start_ms: u64,
    /// Last word's end offset (milliseconds)
    pub end_ms: u64,
    /// Mean word confidence scaled to 0-100
    pub confidence: u8,
}

impl Verse {
    pub fn new(
        verse_number: u32,
        lyrics: impl Into<String>,
        start_ms: u64,
        end_ms: u64,
        confidence: u8,
    ) -> Self {
        Self {
            verse_number,
            lyrics: lyrics.into(),
            start_ms,
            end_ms,
            confidence,
        }
    }

    /// Verse duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Structural validity for commitment and posting
    ///
    /// Valid means: non-empty trimmed lyrics, lyrics within the platform
    /// caption limit, a positive time span, and confidence within 0-100.
    pub fn is_valid(&self) -> bool {
        !self.lyrics.trim().is_empty()
            && self.lyrics.chars().count() <= MAX_LYRICS_CHARS
            && self.start_ms < self.end_ms
            && self.confidence <= 100
    }
}

// ========================================
// Battle lifecycle
// ========================================

/// Battle lifecycle status
///
/// Statuses advance monotonically along the lifecycle axis; a remote
/// observation may legally skip intermediate stages (a poll can miss
/// them). CANCELLED is reachable from any non-terminal status. COMPLETED
/// and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    /// Challenge assembled locally, nothing on chain yet
    Created,
    /// Commitment on chain, waiting for the defender
    PendingAcceptance,
    /// Both commitments on chain, reveal window open
    Matched,
    /// Battle marked live by the chain
    Active,
    /// This participant's entry revealed and verified
    Revealed,
    /// Public voting open
    VotingPhase,
    /// Outcome settled by the chain
    Completed,
    /// Abandoned, expired, or withdrawn
    Cancelled,
}

impl BattleStatus {
    /// Position on the forward lifecycle axis
    fn rank(self) -> u8 {
        match self {
            BattleStatus::Created => 0,
            BattleStatus::PendingAcceptance => 1,
            BattleStatus::Matched => 2,
            BattleStatus::Active => 3,
            BattleStatus::Revealed => 4,
            BattleStatus::VotingPhase => 5,
            BattleStatus::Completed => 6,
            BattleStatus::Cancelled => 7,
        }
    }

    /// Whether this status ends the lifecycle
    pub fn is_terminal(self) -> bool {
        matches!(self, BattleStatus::Completed | BattleStatus::Cancelled)
    }

    /// Whether a transition from `self` to `next` is legal
    ///
    /// Legal means strictly forward from a non-terminal status, or into
    /// CANCELLED from any non-terminal status. Self-transitions are not
    /// transitions.
    pub fn can_advance_to(self, next: BattleStatus) -> bool {
        if self.is_terminal() || next == self {
            return false;
        }
        if next == BattleStatus::Cancelled {
            return true;
        }
        next.rank() > self.rank()
    }

    /// Status name in wire form (SCREAMING_SNAKE_CASE)
    pub fn as_str(self) -> &'static str {
        match self {
            BattleStatus::Created => "CREATED",
            BattleStatus::PendingAcceptance => "PENDING_ACCEPTANCE",
            BattleStatus::Matched => "MATCHED",
            BattleStatus::Active => "ACTIVE",
            BattleStatus::Revealed => "REVEALED",
            BattleStatus::VotingPhase => "VOTING_PHASE",
            BattleStatus::Completed => "COMPLETED",
            BattleStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the battle this session holds, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleRole {
    Challenger,
    Defender,
}

impl fmt::Display for BattleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleRole::Challenger => f.write_str("CHALLENGER"),
            BattleRole::Defender => f.write_str("DEFENDER"),
        }
    }
}

// ========================================
// Voting
// ========================================

/// Voting options for a settled battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteChoice {
    Challenger,
    Defender,
    Tie,
}

impl VoteChoice {
    /// Wire encoding expected by the chain program (0, 1, 2)
    pub fn code(self) -> u8 {
        match self {
            VoteChoice::Challenger => 0,
            VoteChoice::Defender => 1,
            VoteChoice::Tie => 2,
        }
    }
}

// ========================================
// Chain records
// ========================================

/// Battle state as read back from the chain
///
/// The chain is the source of truth for matchmaking and settlement; the
/// record is what `fetch_battle_record` returns and what discovery feeds
/// list. The defender handle and context URL are empty until known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    pub battle_id: u64,
    /// Challenger handle or address
    pub challenger: String,
    /// Defender handle or address (empty until accepted)
    #[serde(default)]
    pub defender: String,
    pub stake_amount: u64,
    pub status: BattleStatus,
    /// URL of the public challenge announcement, if posted
    #[serde(default)]
    pub context_url: String,
}
