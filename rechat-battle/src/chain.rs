//! Chain client interface
//!
//! The chain is the arbiter: it holds commitments, matches the two
//! sides, verifies reveals, and settles votes. This crate never talks to
//! it directly; an injected [`ChainClient`] owns the RPC plumbing,
//! wallet signing, and any retry policy. Every method returns the chain
//! transaction reference on success.

use async_trait::async_trait;
use rechat_common::model::{BattleRecord, Verse};

/// On-chain battle program access
///
/// Implementations are `Send + Sync` and injected into the coordinator.
/// Errors pass through `anyhow` and surface verbatim inside the
/// `Chain` error variant; the engine never retries.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a challenge commitment
    ///
    /// Registers the challenger's commit hash against the defender
    /// handle with the stake escrowed. The chain assigns the battle id
    /// asynchronously; only the transaction reference comes back here.
    async fn submit_challenge(
        &self,
        defender_handle: &str,
        context_url: &str,
        stake_amount: u64,
        hashtags: &[String],
        commit_hash: &str,
    ) -> anyhow::Result<String>;

    /// Submit the defender's acceptance commitment for an open challenge
    async fn submit_acceptance(
        &self,
        battle_id: u64,
        response_url: &str,
        commit_hash: &str,
    ) -> anyhow::Result<String>;

    /// Reveal a committed entry
    ///
    /// Discloses the verses, recording reference and nonce so the chain
    /// can recompute the commitment and verify it against the stored
    /// hash.
    async fn submit_reveal(
        &self,
        battle_id: u64,
        verses: &[Verse],
        recording_ref: &str,
        nonce: u64,
    ) -> anyhow::Result<String>;

    /// Cast a vote on a revealed battle
    ///
    /// `vote_code` uses the wire encoding from
    /// [`VoteChoice::code`](rechat_common::model::VoteChoice::code).
    async fn submit_vote(
        &self,
        battle_id: u64,
        vote_code: u8,
        stake_amount: u64,
    ) -> anyhow::Result<String>;

    /// Read the current battle record; `None` when no such battle exists
    async fn fetch_battle_record(&self, battle_id: u64) -> anyhow::Result<Option<BattleRecord>>;

    /// List battles in a discovery category
    async fn fetch_battles_by_category(&self, category: &str) -> anyhow::Result<Vec<BattleRecord>>;
}
