//! # Re-Chat Battle Engine
//!
//! Coordination library for turn-based rap battles fought over a public
//! social feed with an append-only chain as arbiter. Each participant
//! records a verse performance, commits to it on chain as a salted hash,
//! and reveals the content later for public verification and voting.
//!
//! The crate owns:
//! - Verse segmentation from timed transcripts (`segmenter`)
//! - Commitment construction and verification (`commitment`)
//! - Battle session lifecycle and storage (`session`, `store`)
//! - Coordination of chain and social side effects (`coordinator`)
//! - Background status monitoring (`monitor`)
//! - Announcement composition and hashtags (`social`, `hashtags`)
//!
//! It never performs network I/O itself: chain access, posting, and
//! transcription live behind the injected [`ChainClient`],
//! [`SocialClient`] and [`TranscriptSource`] collaborators.

pub mod chain;
pub mod commitment;
pub mod config;
pub mod coordinator;
pub mod hashtags;
pub mod monitor;
pub mod segmenter;
pub mod session;
pub mod social;
pub mod store;

pub use chain::ChainClient;
pub use config::BattleConfig;
pub use coordinator::{
    AcceptOutcome, BattleCoordinator, ChallengeOutcome, ChallengeParams, RevealOutcome,
    SocialOutcome,
};
pub use monitor::MonitorHandle;
pub use segmenter::TranscriptSource;
pub use session::{BattleSession, SessionSnapshot, StatusTransition};
pub use social::{PostReceipt, SocialClient};
pub use store::{SessionHandle, SessionStore};
