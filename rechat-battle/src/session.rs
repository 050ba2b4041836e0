//! Battle session state
//!
//! One `BattleSession` per participant per battle: the local record of
//! what was committed, when it must be revealed, and where the lifecycle
//! stands. The commitment nonce lives here as a private field; it leaves
//! the session only through the chain reveal, and snapshots expose it
//! only after that reveal has completed.

use chrono::{DateTime, Utc};
use rechat_common::error::{Error, Result};
use rechat_common::model::{BattleRole, BattleStatus, Verse};
use rechat_common::time;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one applied status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub battle_id: u64,
    pub session_id: Uuid,
    pub old_status: BattleStatus,
    pub new_status: BattleStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Public read view of a session
///
/// Everything an embedding application may display. `nonce` is `None`
/// until the session's own reveal has completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub battle_id: u64,
    pub role: BattleRole,
    pub status: BattleStatus,
    pub opponent: Option<String>,
    pub stake_amount: u64,
    pub hashtags: Vec<String>,
    pub verses: Vec<Verse>,
    pub recording_ref: String,
    pub commit_hash: String,
    /// Commitment nonce, withheld until revealed on chain
    pub nonce: Option<u64>,
    pub creation_tx: Option<String>,
    pub acceptance_tx: Option<String>,
    pub reveal_tx: Option<String>,
    pub social_post_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reveal_deadline: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Local state for one side of a battle
///
/// Deliberately not serializable: the nonce must not escape through a
/// stray `to_string`. Persist [`SessionSnapshot`] instead if an embedding
/// application needs to display history.
#[derive(Debug, Clone)]
pub struct BattleSession {
    /// Local identity, independent of the chain battle id
    pub session_id: Uuid,
    /// Chain battle id; 0 until the chain assigns one
    pub battle_id: u64,
    pub role: BattleRole,
    status: BattleStatus,
    /// Opponent handle, when known at creation
    pub opponent: Option<String>,
    pub stake_amount: u64,
    /// Bare hashtags (no `#` prefix) attached to announcements
    pub hashtags: Vec<String>,
    /// The committed verse set
    pub verses: Vec<Verse>,
    pub recording_ref: String,
    /// Commitment salt; private until reveal
    nonce: u64,
    nonce_disclosed: bool,
    pub commit_hash: String,
    pub creation_tx: Option<String>,
    pub acceptance_tx: Option<String>,
    pub reveal_tx: Option<String>,
    pub social_post_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reveal_deadline: DateTime<Utc>,
    /// Set on entering a terminal status
    pub ended_at: Option<DateTime<Utc>>,
}

impl BattleSession {
    /// Create the challenger-side session for a new challenge
    ///
    /// Starts at CREATED with battle id 0; the id arrives later via
    /// `bind_battle_id` once the chain assigns one.
    #[allow(clippy::too_many_arguments)]
    pub fn new_challenger(
        opponent: Option<String>,
        stake_amount: u64,
        hashtags: Vec<String>,
        verses: Vec<Verse>,
        recording_ref: impl Into<String>,
        nonce: u64,
        commit_hash: String,
        reveal_deadline: DateTime<Utc>,
    ) -> Self {
        Self::new(
            0,
            BattleRole::Challenger,
            opponent,
            stake_amount,
            hashtags,
            verses,
            recording_ref.into(),
            nonce,
            commit_hash,
            reveal_deadline,
        )
    }

    /// Create the defender-side session for an accepted challenge
    #[allow(clippy::too_many_arguments)]
    pub fn new_defender(
        battle_id: u64,
        opponent: Option<String>,
        stake_amount: u64,
        hashtags: Vec<String>,
        verses: Vec<Verse>,
        recording_ref: impl Into<String>,
        nonce: u64,
        commit_hash: String,
        reveal_deadline: DateTime<Utc>,
    ) -> Self {
        Self::new(
            battle_id,
            BattleRole::Defender,
            opponent,
            stake_amount,
            hashtags,
            verses,
            recording_ref.into(),
            nonce,
            commit_hash,
            reveal_deadline,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        battle_id: u64,
        role: BattleRole,
        opponent: Option<String>,
        stake_amount: u64,
        hashtags: Vec<String>,
        verses: Vec<Verse>,
        recording_ref: String,
        nonce: u64,
        commit_hash: String,
        reveal_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            battle_id,
            role,
            status: BattleStatus::Created,
            opponent,
            stake_amount,
            hashtags,
            verses,
            recording_ref,
            nonce,
            nonce_disclosed: false,
            commit_hash,
            creation_tx: None,
            acceptance_tx: None,
            reveal_tx: None,
            social_post_url: None,
            created_at: time::now(),
            reveal_deadline,
            ended_at: None,
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> BattleStatus {
        self.status
    }

    /// Apply a status transition
    ///
    /// Legality comes from [`BattleStatus::can_advance_to`]: monotonic
    /// forward, CANCELLED from any non-terminal, terminal states frozen.
    /// Entering a terminal status stamps `ended_at`.
    pub fn transition_to(&mut self, new_status: BattleStatus) -> Result<StatusTransition> {
        let old_status = self.status;
        if !old_status.can_advance_to(new_status) {
            return Err(Error::IllegalState {
                battle_id: self.battle_id,
                reason: format!("cannot transition from {old_status} to {new_status}"),
            });
        }

        self.status = new_status;
        let transitioned_at = time::now();
        if new_status.is_terminal() {
            self.ended_at = Some(transitioned_at);
        }

        Ok(StatusTransition {
            battle_id: self.battle_id,
            session_id: self.session_id,
            old_status,
            new_status,
            transitioned_at,
        })
    }

    /// Whether this session may reveal right now
    ///
    /// True only while both commitments are matched on chain (MATCHED or
    /// ACTIVE) and the reveal window is still open.
    pub fn can_reveal(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            BattleStatus::Matched | BattleStatus::Active
        ) && now < self.reveal_deadline
    }

    /// Whether the reveal window elapsed before this entry was revealed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reveal_deadline
            && matches!(
                self.status,
                BattleStatus::Created
                    | BattleStatus::PendingAcceptance
                    | BattleStatus::Matched
                    | BattleStatus::Active
            )
    }

    /// The commitment nonce, for reveal submission and self-checks
    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record that the nonce is now public via a completed chain reveal
    pub fn mark_nonce_disclosed(&mut self) {
        self.nonce_disclosed = true;
    }

    /// The nonce once disclosed, `None` while still secret
    pub fn disclosed_nonce(&self) -> Option<u64> {
        self.nonce_disclosed.then_some(self.nonce)
    }

    /// Public read view of this session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            battle_id: self.battle_id,
            role: self.role,
            status: self.status,
            opponent: self.opponent.clone(),
            stake_amount: self.stake_amount,
            hashtags: self.hashtags.clone(),
            verses: self.verses.clone(),
            recording_ref: self.recording_ref.clone(),
            commit_hash: self.commit_hash.clone(),
            nonce: self.disclosed_nonce(),
            creation_tx: self.creation_tx.clone(),
            acceptance_tx: self.acceptance_tx.clone(),
            reveal_tx: self.reveal_tx.clone(),
            social_post_url: self.social_post_url.clone(),
            created_at: self.created_at,
            reveal_deadline: self.reveal_deadline,
            ended_at: self.ended_at,
        }
    }
}
