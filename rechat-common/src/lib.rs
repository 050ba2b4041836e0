//! # Re-Chat Common Library
//!
//! Shared code for the Re-Chat battle services including:
//! - Domain model (word timestamps, verses, battle status, vote choices)
//! - Event types (BattleEvent enum) and EventBus
//! - Error taxonomy
//! - Timestamp utilities

pub mod error;
pub mod events;
pub mod model;
pub mod time;

pub use error::{Error, Result};
pub use model::{BattleRecord, BattleRole, BattleStatus, Verse, VoteChoice, WordTimestamp};
