//! Event types for the battle event system
//!
//! Provides the shared event definitions and EventBus used by the battle
//! coordinator and any embedding application (UI, bots, archivers).

use crate::model::{BattleStatus, VoteChoice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Battle protocol events
///
/// Events are broadcast via EventBus and can be serialized for relaying
/// to clients. Commitment nonces never appear in events; a nonce becomes
/// public only through the chain reveal itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BattleEvent {
    /// Challenge committed on chain and stored locally
    ///
    /// Triggers:
    /// - UI: Show outgoing challenge card
    /// - Monitor: Eligible once the chain assigns the battle id
    ChallengeCreated {
        /// Local session UUID
        session_id: Uuid,
        /// Chain battle id (0 until assigned)
        battle_id: u64,
        /// Defender handle the challenge targets
        defender: String,
        /// Stake in base units
        stake_amount: u64,
        /// Commitment hash submitted to the chain
        commit_hash: String,
        /// Chain transaction reference
        tx_ref: String,
        /// When the challenge was created
        timestamp: DateTime<Utc>,
    },

    /// Acceptance committed on chain by this participant
    ///
    /// Triggers:
    /// - UI: Show matched battle
    /// - Monitor: Start watching the battle
    ChallengeAccepted {
        /// Chain battle id
        battle_id: u64,
        /// Local session UUID
        session_id: Uuid,
        /// Chain transaction reference
        tx_ref: String,
        /// When the acceptance was submitted
        timestamp: DateTime<Utc>,
    },

    /// Chain assigned a battle id to a pending challenge
    BattleIdAssigned {
        /// Local session UUID
        session_id: Uuid,
        /// Newly assigned chain battle id
        battle_id: u64,
        /// When the assignment was observed
        timestamp: DateTime<Utc>,
    },

    /// Local session status changed
    ///
    /// Triggers:
    /// - UI: Update battle card
    /// - Monitor: Stop on terminal status
    StatusChanged {
        /// Chain battle id
        battle_id: u64,
        /// Status before the change
        old_status: BattleStatus,
        /// Status after the change
        new_status: BattleStatus,
        /// When the status changed
        timestamp: DateTime<Utc>,
    },

    /// This participant's entry revealed on chain
    EntryRevealed {
        /// Chain battle id
        battle_id: u64,
        /// Chain transaction reference
        tx_ref: String,
        /// When the reveal was submitted
        timestamp: DateTime<Utc>,
    },

    /// Vote forwarded to the chain
    VoteSubmitted {
        /// Chain battle id
        battle_id: u64,
        /// Side the vote backs
        choice: VoteChoice,
        /// Stake in base units
        stake_amount: u64,
        /// Chain transaction reference
        tx_ref: String,
        /// When the vote was submitted
        timestamp: DateTime<Utc>,
    },

    /// Reveal window elapsed before the entry was revealed
    ///
    /// Triggers:
    /// - UI: Show expiry notice
    /// - Session: Cancelled locally
    BattleExpired {
        /// Chain battle id
        battle_id: u64,
        /// Deadline that passed
        reveal_deadline: DateTime<Utc>,
        /// When the expiry was observed
        timestamp: DateTime<Utc>,
    },

    /// Battle settled by the chain
    BattleCompleted {
        /// Chain battle id
        battle_id: u64,
        /// When completion was observed
        timestamp: DateTime<Utc>,
    },

    /// Public announcement posted to the social feed
    SocialPostPublished {
        /// Chain battle id (0 until assigned)
        battle_id: u64,
        /// Platform post id
        post_id: String,
        /// Public post URL
        post_url: String,
        /// When the post succeeded
        timestamp: DateTime<Utc>,
    },

    /// Announcement post failed after the chain already accepted the commitment
    ///
    /// The battle stands; only the social side effect is missing.
    SocialPostFailed {
        /// Chain battle id (0 until assigned)
        battle_id: u64,
        /// Error message from the social client
        error: String,
        /// When the post failed
        timestamp: DateTime<Utc>,
    },

    /// A coordinator operation failed
    ///
    /// Triggers:
    /// - Error logging
    /// - UI: Show error notification
    BattleFailed {
        /// Chain battle id, if one was involved
        battle_id: Option<u64>,
        /// Operation that failed
        operation: String,
        /// Error message
        error: String,
        /// When the failure occurred
        timestamp: DateTime<Utc>,
    },
}

impl BattleEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            BattleEvent::ChallengeCreated { .. } => "ChallengeCreated",
            BattleEvent::ChallengeAccepted { .. } => "ChallengeAccepted",
            BattleEvent::BattleIdAssigned { .. } => "BattleIdAssigned",
            BattleEvent::StatusChanged { .. } => "StatusChanged",
            BattleEvent::EntryRevealed { .. } => "EntryRevealed",
            BattleEvent::VoteSubmitted { .. } => "VoteSubmitted",
            BattleEvent::BattleExpired { .. } => "BattleExpired",
            BattleEvent::BattleCompleted { .. } => "BattleCompleted",
            BattleEvent::SocialPostPublished { .. } => "SocialPostPublished",
            BattleEvent::SocialPostFailed { .. } => "SocialPostFailed",
            BattleEvent::BattleFailed { .. } => "BattleFailed",
        }
    }

    /// Chain battle id the event concerns, when it carries one
    pub fn battle_id(&self) -> Option<u64> {
        match self {
            BattleEvent::ChallengeCreated { battle_id, .. }
            | BattleEvent::ChallengeAccepted { battle_id, .. }
            | BattleEvent::BattleIdAssigned { battle_id, .. }
            | BattleEvent::StatusChanged { battle_id, .. }
            | BattleEvent::EntryRevealed { battle_id, .. }
            | BattleEvent::VoteSubmitted { battle_id, .. }
            | BattleEvent::BattleExpired { battle_id, .. }
            | BattleEvent::BattleCompleted { battle_id, .. }
            | BattleEvent::SocialPostPublished { battle_id, .. }
            | BattleEvent::SocialPostFailed { battle_id, .. } => Some(*battle_id),
            BattleEvent::BattleFailed { battle_id, .. } => *battle_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for battle events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use rechat_common::events::{BattleEvent, EventBus};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(128));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(BattleEvent::BattleCompleted {
///     battle_id: 42,
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BattleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BattleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BattleEvent,
    ) -> Result<usize, broadcast::error::SendError<BattleEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for fire-and-forget notification paths where it's acceptable
    /// if no component is currently listening.
    pub fn emit_lossy(&self, event: BattleEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
