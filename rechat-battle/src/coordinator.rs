//! Battle coordination
//!
//! The coordinator is the single entry point for battle operations: it
//! validates input, drives the commitment engine, applies session state,
//! and sequences the chain and social side effects. The chain commitment
//! is the operation; the social announcement is reporting. A failed
//! chain call leaves nothing stored, while a failed post after a chain
//! success is reported and the battle stands.
//!
//! Locking: session locks are taken briefly and never held across a
//! chain, social, or transcript await. Events are emitted after locks
//! are released.

use crate::chain::ChainClient;
use crate::commitment;
use crate::config::BattleConfig;
use crate::hashtags;
use crate::monitor::{self, MonitorHandle};
use crate::segmenter::{self, TranscriptSource};
use crate::session::{BattleSession, SessionSnapshot, StatusTransition};
use crate::social::{self, PostReceipt, SocialClient};
use crate::store::{SessionHandle, SessionStore};
use rechat_common::error::{Error, Result};
use rechat_common::events::{BattleEvent, EventBus};
use rechat_common::model::{BattleRecord, BattleStatus, Verse, VoteChoice};
use rechat_common::time;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ========================================
// Operation inputs and outcomes
// ========================================

/// Inputs for [`BattleCoordinator::create_challenge`]
#[derive(Debug, Clone)]
pub struct ChallengeParams {
    /// Handle of the participant being called out
    pub defender_handle: String,
    /// URL giving the challenge its public context (profile, prior post)
    pub context_url: String,
    /// Stake in base units, escrowed by the chain
    pub stake_amount: u64,
    /// The verse set to commit
    pub verses: Vec<Verse>,
    /// Reference to the recorded performance (storage URI)
    pub recording_ref: String,
    /// Announcement text override; composed from the verses when `None`
    pub message: Option<String>,
    /// Additional hashtags beyond defaults and lyric-derived ones
    pub extra_hashtags: Vec<String>,
}

/// How the announcement side effect went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialOutcome {
    Posted { post_id: String, post_url: String },
    /// Post failed after the chain commitment succeeded; battle stands
    Failed { error: String },
}

/// Result of a created challenge
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    pub session: SessionSnapshot,
    pub chain_tx: String,
    pub social: SocialOutcome,
}

/// Result of an accepted challenge
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub session: SessionSnapshot,
    pub chain_tx: String,
    pub social: SocialOutcome,
}

/// Result of a completed reveal
#[derive(Debug, Clone)]
pub struct RevealOutcome {
    pub session: SessionSnapshot,
    pub chain_tx: String,
}

// ========================================
// Coordinator
// ========================================

/// Drives battle sessions through the commit-reveal lifecycle
pub struct BattleCoordinator {
    store: Arc<SessionStore>,
    chain: Arc<dyn ChainClient>,
    social: Arc<dyn SocialClient>,
    transcript: Option<Arc<dyn TranscriptSource>>,
    bus: EventBus,
    config: BattleConfig,
    /// Cancellation tokens of spawned monitors, by battle id
    monitors: Mutex<HashMap<u64, CancellationToken>>,
}

impl BattleCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        chain: Arc<dyn ChainClient>,
        social: Arc<dyn SocialClient>,
        config: BattleConfig,
    ) -> Self {
        let bus = EventBus::new(config.event_capacity);
        Self {
            store,
            chain,
            social,
            transcript: None,
            bus,
            config,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a transcript source for [`verses_from_recording`]
    ///
    /// [`verses_from_recording`]: BattleCoordinator::verses_from_recording
    pub fn with_transcript_source(mut self, source: Arc<dyn TranscriptSource>) -> Self {
        self.transcript = Some(source);
        self
    }

    /// Subscribe to battle events
    pub fn subscribe(&self) -> broadcast::Receiver<BattleEvent> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    // ========================================
    // Challenge creation
    // ========================================

    /// Commit a new challenge on chain and announce it
    ///
    /// The challenger session starts at battle id 0 until the chain
    /// assigns one (see [`bind_battle_id`](Self::bind_battle_id)).
    pub async fn create_challenge(&self, params: ChallengeParams) -> Result<ChallengeOutcome> {
        match self.create_challenge_inner(params).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.fail(None, "create_challenge", err)),
        }
    }

    async fn create_challenge_inner(&self, params: ChallengeParams) -> Result<ChallengeOutcome> {
        let defender = params.defender_handle.trim();
        if defender.is_empty() {
            return Err(Error::Validation(String::from("defender handle is empty")));
        }
        if params.stake_amount == 0 {
            return Err(Error::Validation(String::from(
                "stake amount must be positive",
            )));
        }
        segmenter::validate_entry(&params.verses)?;
        if self.store.get(0).await.is_some() {
            return Err(Error::IllegalState {
                battle_id: 0,
                reason: String::from("a pending challenge is already awaiting id assignment"),
            });
        }

        let nonce = commitment::generate_nonce();
        let commit_hash = commitment::commit_hash(&params.verses, &params.recording_ref, nonce);
        let derived = hashtags::hashtags_from_lyrics(&params.verses);
        let tags = hashtags::merge_hashtags(
            &self.config.default_hashtags,
            &derived,
            &params.extra_hashtags,
        );

        let chain_tx = self
            .chain
            .submit_challenge(
                defender,
                &params.context_url,
                params.stake_amount,
                &tags,
                &commit_hash,
            )
            .await
            .map_err(chain_err)?;

        info!(
            defender = %defender,
            stake = params.stake_amount,
            commit_hash = %commit_hash,
            tx = %chain_tx,
            "challenge committed on chain"
        );

        let deadline = time::hours_after(time::now(), self.config.reveal_window_hours);
        let mut session = BattleSession::new_challenger(
            Some(defender.to_string()),
            params.stake_amount,
            tags.clone(),
            params.verses.clone(),
            params.recording_ref.clone(),
            nonce,
            commit_hash.clone(),
            deadline,
        );
        session.creation_tx = Some(chain_tx.clone());
        session.transition_to(BattleStatus::PendingAcceptance)?;
        let session_id = session.session_id;

        let handle = self.store.insert(session).await?;

        self.bus.emit_lossy(BattleEvent::ChallengeCreated {
            session_id,
            battle_id: 0,
            defender: defender.to_string(),
            stake_amount: params.stake_amount,
            commit_hash,
            tx_ref: chain_tx.clone(),
            timestamp: time::now(),
        });

        let message = params.message.clone().unwrap_or_else(|| {
            social::compose_challenge_message(
                defender,
                params.stake_amount,
                &params.verses,
                self.config.reveal_window_hours,
            )
        });
        let post = self
            .social
            .post_challenge(
                defender,
                &message,
                &tags,
                &params.recording_ref,
                self.config.reveal_window_hours,
            )
            .await;
        let social_outcome = self.record_post_result(&handle, 0, post).await;

        let snapshot = handle.read().await.snapshot();
        Ok(ChallengeOutcome {
            session: snapshot,
            chain_tx,
            social: social_outcome,
        })
    }

    /// Rekey the pending challenge once the chain assigns its battle id
    ///
    /// Emits `BattleIdAssigned`, then refreshes against the chain record
    /// so an already-accepted challenge advances immediately. A failed
    /// post-rekey refresh does not unwind the rekey; the monitor catches
    /// up on its next tick.
    pub async fn bind_battle_id(&self, battle_id: u64) -> Result<Option<StatusTransition>> {
        if battle_id == 0 {
            return Err(Error::Validation(String::from("cannot bind battle id 0")));
        }

        let handle = match self.store.rebind(0, battle_id).await {
            Ok(handle) => handle,
            Err(Error::NotFound(_)) => {
                return Err(Error::IllegalState {
                    battle_id,
                    reason: String::from("no pending challenge awaiting id assignment"),
                });
            }
            Err(err) => return Err(err),
        };

        let session_id = handle.read().await.session_id;
        info!(battle_id, session_id = %session_id, "battle id assigned");
        self.bus.emit_lossy(BattleEvent::BattleIdAssigned {
            session_id,
            battle_id,
            timestamp: time::now(),
        });

        match self.refresh_status(battle_id).await {
            Ok(transition) => Ok(transition),
            Err(err) => {
                warn!(battle_id, error = %err, "post-bind refresh failed, monitor will catch up");
                Ok(None)
            }
        }
    }

    // ========================================
    // Challenge acceptance
    // ========================================

    /// Accept an open challenge as the defender
    ///
    /// Fetches the chain record, commits the defender's entry against
    /// it, and announces the acceptance threaded onto the challenge post
    /// when its id is recoverable.
    pub async fn accept_challenge(
        &self,
        battle_id: u64,
        verses: Vec<Verse>,
        response_ref: &str,
    ) -> Result<AcceptOutcome> {
        match self
            .accept_challenge_inner(battle_id, verses, response_ref)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.fail(Some(battle_id), "accept_challenge", err)),
        }
    }

    async fn accept_challenge_inner(
        &self,
        battle_id: u64,
        verses: Vec<Verse>,
        response_ref: &str,
    ) -> Result<AcceptOutcome> {
        if battle_id == 0 {
            return Err(Error::Validation(String::from(
                "battle id 0 is reserved for pending challenges",
            )));
        }
        segmenter::validate_entry(&verses)?;
        if self.store.get(battle_id).await.is_some() {
            return Err(Error::IllegalState {
                battle_id,
                reason: String::from("a session already exists for this battle"),
            });
        }

        let record = self
            .chain
            .fetch_battle_record(battle_id)
            .await
            .map_err(chain_err)?
            .ok_or(Error::NotFound(battle_id))?;

        if record.status != BattleStatus::PendingAcceptance {
            return Err(Error::IllegalState {
                battle_id,
                reason: format!(
                    "challenge is {} on chain, not open for acceptance",
                    record.status
                ),
            });
        }

        let nonce = commitment::generate_nonce();
        let commit_hash = commitment::commit_hash(&verses, response_ref, nonce);
        let derived = hashtags::hashtags_from_lyrics(&verses);
        let tags = hashtags::merge_hashtags(&self.config.default_hashtags, &derived, &[]);

        let chain_tx = self
            .chain
            .submit_acceptance(battle_id, response_ref, &commit_hash)
            .await
            .map_err(chain_err)?;

        info!(
            battle_id,
            challenger = %record.challenger,
            tx = %chain_tx,
            "acceptance committed on chain"
        );

        let deadline = time::hours_after(time::now(), self.config.reveal_window_hours);
        let mut session = BattleSession::new_defender(
            battle_id,
            Some(record.challenger.clone()),
            record.stake_amount,
            tags.clone(),
            verses.clone(),
            response_ref,
            nonce,
            commit_hash,
            deadline,
        );
        session.acceptance_tx = Some(chain_tx.clone());
        session.transition_to(BattleStatus::Matched)?;
        let session_id = session.session_id;

        let handle = self.store.insert(session).await?;

        self.bus.emit_lossy(BattleEvent::ChallengeAccepted {
            battle_id,
            session_id,
            tx_ref: chain_tx.clone(),
            timestamp: time::now(),
        });

        let message = social::compose_response_message(battle_id, &verses);
        let in_reply_to = social::extract_post_id(&record.context_url);
        let post = self
            .social
            .post_response(
                battle_id,
                &message,
                &tags,
                response_ref,
                in_reply_to.as_deref(),
            )
            .await;
        let social_outcome = self.record_post_result(&handle, battle_id, post).await;

        let snapshot = handle.read().await.snapshot();
        Ok(AcceptOutcome {
            session: snapshot,
            chain_tx,
            social: social_outcome,
        })
    }

    // ========================================
    // Reveal
    // ========================================

    /// Reveal this participant's committed entry
    ///
    /// Self-checks the stored commitment before submitting; a mismatch
    /// means the session is corrupted and nothing goes out. An expired
    /// session is cancelled here rather than revealed late.
    pub async fn reveal(&self, battle_id: u64) -> Result<RevealOutcome> {
        match self.reveal_inner(battle_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.fail(Some(battle_id), "reveal", err)),
        }
    }

    async fn reveal_inner(&self, battle_id: u64) -> Result<RevealOutcome> {
        let handle = self
            .store
            .get(battle_id)
            .await
            .ok_or(Error::NotFound(battle_id))?;

        let (verses, recording_ref, nonce, commit_hash) = {
            let mut session = handle.write().await;
            let now = time::now();

            if session.is_expired(now) {
                let deadline = session.reveal_deadline;
                session.transition_to(BattleStatus::Cancelled)?;
                drop(session);
                warn!(battle_id, deadline = %deadline, "reveal window expired, battle cancelled");
                self.bus.emit_lossy(BattleEvent::BattleExpired {
                    battle_id,
                    reveal_deadline: deadline,
                    timestamp: time::now(),
                });
                return Err(Error::Expired {
                    battle_id,
                    deadline,
                });
            }
            if !session.can_reveal(now) {
                return Err(Error::IllegalState {
                    battle_id,
                    reason: format!("cannot reveal while {}", session.status()),
                });
            }

            (
                session.verses.clone(),
                session.recording_ref.clone(),
                session.nonce(),
                session.commit_hash.clone(),
            )
        };

        if !commitment::verify_reveal(&verses, &recording_ref, nonce, &commit_hash) {
            return Err(Error::Internal(format!(
                "stored commitment does not match session content for battle {battle_id}"
            )));
        }

        let chain_tx = self
            .chain
            .submit_reveal(battle_id, &verses, &recording_ref, nonce)
            .await
            .map_err(chain_err)?;

        let snapshot = {
            let mut session = handle.write().await;
            // A poll may have observed the reveal before this lock was
            // reacquired; the transition is then already applied.
            if session.status().can_advance_to(BattleStatus::Revealed) {
                session.transition_to(BattleStatus::Revealed)?;
            }
            session.reveal_tx = Some(chain_tx.clone());
            session.mark_nonce_disclosed();
            session.snapshot()
        };

        info!(battle_id, tx = %chain_tx, "entry revealed on chain");
        self.bus.emit_lossy(BattleEvent::EntryRevealed {
            battle_id,
            tx_ref: chain_tx.clone(),
            timestamp: time::now(),
        });

        Ok(RevealOutcome {
            session: snapshot,
            chain_tx,
        })
    }

    // ========================================
    // Voting
    // ========================================

    /// Forward a spectator vote to the chain
    ///
    /// Voting needs no local session: spectators vote on discovered
    /// battles and the chain arbitrates eligibility and tallying.
    pub async fn submit_vote(
        &self,
        battle_id: u64,
        choice: VoteChoice,
        stake_amount: u64,
    ) -> Result<String> {
        match self.submit_vote_inner(battle_id, choice, stake_amount).await {
            Ok(tx) => Ok(tx),
            Err(err) => Err(self.fail(Some(battle_id), "submit_vote", err)),
        }
    }

    async fn submit_vote_inner(
        &self,
        battle_id: u64,
        choice: VoteChoice,
        stake_amount: u64,
    ) -> Result<String> {
        let chain_tx = self
            .chain
            .submit_vote(battle_id, choice.code(), stake_amount)
            .await
            .map_err(chain_err)?;

        info!(battle_id, choice = ?choice, stake = stake_amount, tx = %chain_tx, "vote submitted");
        self.bus.emit_lossy(BattleEvent::VoteSubmitted {
            battle_id,
            choice,
            stake_amount,
            tx_ref: chain_tx.clone(),
            timestamp: time::now(),
        });
        Ok(chain_tx)
    }

    // ========================================
    // Status refresh and expiry
    // ========================================

    /// Reconcile the local session with the chain record, one shot
    ///
    /// Applies a legal forward transition and emits `StatusChanged`
    /// (plus `BattleCompleted` on settlement). Returns `None` when the
    /// chain shows nothing new. Backward remote statuses are logged and
    /// ignored; the chain may legally be ahead, never behind.
    pub async fn refresh_status(&self, battle_id: u64) -> Result<Option<StatusTransition>> {
        let handle = self
            .store
            .get(battle_id)
            .await
            .ok_or(Error::NotFound(battle_id))?;

        let record = self
            .chain
            .fetch_battle_record(battle_id)
            .await
            .map_err(chain_err)?
            .ok_or(Error::NotFound(battle_id))?;

        let transition = {
            let mut session = handle.write().await;
            let local = session.status();
            if record.status == local {
                return Ok(None);
            }
            if !local.can_advance_to(record.status) {
                warn!(
                    battle_id,
                    local = %local,
                    remote = %record.status,
                    "ignoring non-forward remote status"
                );
                return Ok(None);
            }

            let transition = session.transition_to(record.status)?;
            if record.status == BattleStatus::Matched {
                // Both commitments are on chain: the reveal window opens
                // from the match, not from challenge creation
                session.reveal_deadline =
                    time::hours_after(transition.transitioned_at, self.config.reveal_window_hours);
            }
            transition
        };

        info!(
            battle_id,
            old = %transition.old_status,
            new = %transition.new_status,
            "battle status advanced"
        );
        self.bus.emit_lossy(BattleEvent::StatusChanged {
            battle_id,
            old_status: transition.old_status,
            new_status: transition.new_status,
            timestamp: transition.transitioned_at,
        });
        if transition.new_status == BattleStatus::Completed {
            self.bus.emit_lossy(BattleEvent::BattleCompleted {
                battle_id,
                timestamp: transition.transitioned_at,
            });
        }

        Ok(Some(transition))
    }

    /// Cancel the battle if its reveal window has lapsed
    ///
    /// Returns whether a cancellation was applied. The expiry check and
    /// the transition happen under one session lock, so concurrent
    /// callers cancel exactly once.
    pub async fn cancel_if_expired(&self, battle_id: u64) -> Result<bool> {
        let handle = self
            .store
            .get(battle_id)
            .await
            .ok_or(Error::NotFound(battle_id))?;

        let deadline = {
            let mut session = handle.write().await;
            if !session.is_expired(time::now()) {
                return Ok(false);
            }
            let deadline = session.reveal_deadline;
            session.transition_to(BattleStatus::Cancelled)?;
            deadline
        };

        warn!(battle_id, deadline = %deadline, "reveal window expired, battle cancelled");
        self.bus.emit_lossy(BattleEvent::BattleExpired {
            battle_id,
            reveal_deadline: deadline,
            timestamp: time::now(),
        });
        Ok(true)
    }

    // ========================================
    // Monitoring
    // ========================================

    /// Start the polling monitor for a battle
    ///
    /// At most one live monitor per battle id; a finished one may be
    /// replaced. The monitor polls at the configured interval and stops
    /// itself on terminal status.
    pub async fn start_monitor(self: &Arc<Self>, battle_id: u64) -> Result<MonitorHandle> {
        if self.store.get(battle_id).await.is_none() {
            return Err(Error::NotFound(battle_id));
        }

        let token = {
            let mut monitors = self.monitors.lock().await;
            if let Some(existing) = monitors.get(&battle_id) {
                if !existing.is_cancelled() {
                    return Err(Error::IllegalState {
                        battle_id,
                        reason: String::from("a monitor is already watching this battle"),
                    });
                }
            }
            let token = CancellationToken::new();
            monitors.insert(battle_id, token.clone());
            token
        };

        info!(
            battle_id,
            interval_ms = self.config.poll_interval_ms,
            "monitor started"
        );
        Ok(monitor::spawn(
            Arc::clone(self),
            battle_id,
            self.config.poll_interval(),
            token,
        ))
    }

    /// Cancel every running monitor
    ///
    /// Call before dropping the coordinator in an embedding application;
    /// detached monitor tasks hold coordinator references until their
    /// tokens fire.
    pub async fn shutdown(&self) {
        let mut monitors = self.monitors.lock().await;
        let count = monitors.len();
        for (_, token) in monitors.drain() {
            token.cancel();
        }
        info!(monitors = count, "battle coordinator shut down");
    }

    // ========================================
    // Discovery and read paths
    // ========================================

    /// List battles in a discovery category
    pub async fn discover_battles(&self, category: &str) -> Result<Vec<BattleRecord>> {
        let records = self
            .chain
            .fetch_battles_by_category(category)
            .await
            .map_err(chain_err)?;
        debug!(category = %category, count = records.len(), "battles discovered");
        Ok(records)
    }

    /// Segment the transcript of a recording into committable verses
    pub async fn verses_from_recording(&self, recording_ref: &str) -> Result<Vec<Verse>> {
        let source = self.transcript.as_ref().ok_or_else(|| {
            Error::Transcription(String::from("no transcript source configured"))
        })?;
        segmenter::verses_from_recording(source.as_ref(), recording_ref).await
    }

    /// Read view of one session
    pub async fn session_snapshot(&self, battle_id: u64) -> Option<SessionSnapshot> {
        self.store.snapshot(battle_id).await
    }

    /// Read views of all non-terminal sessions, oldest first
    pub async fn active_sessions(&self) -> Vec<SessionSnapshot> {
        self.store.active_snapshots().await
    }

    /// Whether any battle is still in flight
    pub async fn has_active_battle(&self) -> bool {
        !self.store.active_snapshots().await.is_empty()
    }

    /// Destroy a session explicitly, stopping its monitor
    pub async fn remove_session(&self, battle_id: u64) -> Option<SessionSnapshot> {
        if let Some(token) = self.monitors.lock().await.remove(&battle_id) {
            token.cancel();
        }
        let handle = self.store.remove(battle_id).await?;
        let snapshot = handle.read().await.snapshot();
        info!(battle_id, "session removed");
        Some(snapshot)
    }

    // ========================================
    // Internal helpers
    // ========================================

    /// Report a failed mutating operation and pass the error through
    fn fail(&self, battle_id: Option<u64>, operation: &str, err: Error) -> Error {
        error!(
            operation = operation,
            battle_id = ?battle_id,
            error = %err,
            "battle operation failed"
        );
        self.bus.emit_lossy(BattleEvent::BattleFailed {
            battle_id,
            operation: operation.to_string(),
            error: err.to_string(),
            timestamp: time::now(),
        });
        err
    }

    /// Store and report the outcome of an announcement post
    async fn record_post_result(
        &self,
        handle: &SessionHandle,
        battle_id: u64,
        result: anyhow::Result<PostReceipt>,
    ) -> SocialOutcome {
        match result {
            Ok(receipt) => {
                {
                    let mut session = handle.write().await;
                    session.social_post_url = Some(receipt.post_url.clone());
                }
                info!(battle_id, post_id = %receipt.post_id, "announcement posted");
                self.bus.emit_lossy(BattleEvent::SocialPostPublished {
                    battle_id,
                    post_id: receipt.post_id.clone(),
                    post_url: receipt.post_url.clone(),
                    timestamp: time::now(),
                });
                SocialOutcome::Posted {
                    post_id: receipt.post_id,
                    post_url: receipt.post_url,
                }
            }
            Err(err) => {
                let error = format!("{err:#}");
                warn!(battle_id, error = %error, "announcement post failed, battle stands");
                self.bus.emit_lossy(BattleEvent::SocialPostFailed {
                    battle_id,
                    error: error.clone(),
                    timestamp: time::now(),
                });
                SocialOutcome::Failed { error }
            }
        }
    }
}

/// Wrap a chain client failure, message preserved verbatim
fn chain_err(err: anyhow::Error) -> Error {
    Error::Chain(format!("{err:#}"))
}
