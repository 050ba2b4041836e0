//! Scripted collaborator mocks
//!
//! `MockChain` keeps an in-memory battle ledger and records every call;
//! `MockSocial` records posts and mints receipts. Both support one-shot
//! failure injection. Test code drives remote lifecycle progress through
//! `set_status`, the way the real chain would advance battles.

use async_trait::async_trait;
use rechat_battle::chain::ChainClient;
use rechat_battle::segmenter::TranscriptSource;
use rechat_battle::social::{PostReceipt, SocialClient};
use rechat_common::model::{BattleRecord, BattleStatus, Verse, WordTimestamp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ========================================
// Chain mock
// ========================================

#[derive(Debug, Clone)]
pub struct ChallengeCall {
    pub battle_id: u64,
    pub defender_handle: String,
    pub context_url: String,
    pub stake_amount: u64,
    pub hashtags: Vec<String>,
    pub commit_hash: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone)]
pub struct AcceptanceCall {
    pub battle_id: u64,
    pub response_url: String,
    pub commit_hash: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone)]
pub struct RevealCall {
    pub battle_id: u64,
    pub verses: Vec<Verse>,
    pub recording_ref: String,
    pub nonce: u64,
    pub tx_ref: String,
}

#[derive(Debug, Clone)]
pub struct VoteCall {
    pub battle_id: u64,
    pub vote_code: u8,
    pub stake_amount: u64,
    pub tx_ref: String,
}

/// In-memory battle ledger posing as the chain
pub struct MockChain {
    operator: String,
    next_battle_id: AtomicU64,
    tx_counter: AtomicU64,
    records: Mutex<HashMap<u64, BattleRecord>>,
    categories: Mutex<HashMap<String, Vec<BattleRecord>>>,
    challenges: Mutex<Vec<ChallengeCall>>,
    acceptances: Mutex<Vec<AcceptanceCall>>,
    reveals: Mutex<Vec<RevealCall>>,
    votes: Mutex<Vec<VoteCall>>,
    fail_next: Mutex<Option<String>>,
}

impl MockChain {
    /// `operator` is the handle battles created through this mock carry
    /// as challenger
    pub fn new(operator: &str) -> Self {
        Self {
            operator: operator.to_string(),
            next_battle_id: AtomicU64::new(1),
            tx_counter: AtomicU64::new(0),
            records: Mutex::new(HashMap::new()),
            categories: Mutex::new(HashMap::new()),
            challenges: Mutex::new(Vec::new()),
            acceptances: Mutex::new(Vec::new()),
            reveals: Mutex::new(Vec::new()),
            votes: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    /// Make the next chain call fail with this message
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    /// Script a remote status change
    pub fn set_status(&self, battle_id: u64, status: BattleStatus) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&battle_id)
            .unwrap_or_else(|| panic!("no record for battle {battle_id}"));
        record.status = status;
    }

    /// Insert a record directly, as if another participant created it
    pub fn seed_record(&self, record: BattleRecord) {
        self.records.lock().unwrap().insert(record.battle_id, record);
    }

    /// Script a discovery feed
    pub fn set_category(&self, category: &str, records: Vec<BattleRecord>) {
        self.categories
            .lock()
            .unwrap()
            .insert(category.to_string(), records);
    }

    /// The battle id assigned to the most recent challenge
    pub fn last_battle_id(&self) -> u64 {
        self.next_battle_id.load(Ordering::SeqCst) - 1
    }

    pub fn record(&self, battle_id: u64) -> Option<BattleRecord> {
        self.records.lock().unwrap().get(&battle_id).cloned()
    }

    pub fn challenge_calls(&self) -> Vec<ChallengeCall> {
        self.challenges.lock().unwrap().clone()
    }

    pub fn acceptance_calls(&self) -> Vec<AcceptanceCall> {
        self.acceptances.lock().unwrap().clone()
    }

    pub fn reveal_calls(&self) -> Vec<RevealCall> {
        self.reveals.lock().unwrap().clone()
    }

    pub fn vote_calls(&self) -> Vec<VoteCall> {
        self.votes.lock().unwrap().clone()
    }

    fn next_tx(&self) -> String {
        format!("tx-{}", self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn take_failure(&self) -> anyhow::Result<()> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            anyhow::bail!(message);
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn submit_challenge(
        &self,
        defender_handle: &str,
        context_url: &str,
        stake_amount: u64,
        hashtags: &[String],
        commit_hash: &str,
    ) -> anyhow::Result<String> {
        self.take_failure()?;
        let battle_id = self.next_battle_id.fetch_add(1, Ordering::SeqCst);
        let tx_ref = self.next_tx();

        self.records.lock().unwrap().insert(
            battle_id,
            BattleRecord {
                battle_id,
                challenger: self.operator.clone(),
                defender: defender_handle.to_string(),
                stake_amount,
                status: BattleStatus::PendingAcceptance,
                context_url: context_url.to_string(),
            },
        );
        self.challenges.lock().unwrap().push(ChallengeCall {
            battle_id,
            defender_handle: defender_handle.to_string(),
            context_url: context_url.to_string(),
            stake_amount,
            hashtags: hashtags.to_vec(),
            commit_hash: commit_hash.to_string(),
            tx_ref: tx_ref.clone(),
        });
        Ok(tx_ref)
    }

    async fn submit_acceptance(
        &self,
        battle_id: u64,
        response_url: &str,
        commit_hash: &str,
    ) -> anyhow::Result<String> {
        self.take_failure()?;
        let tx_ref = self.next_tx();

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&battle_id)
            .ok_or_else(|| anyhow::anyhow!("no battle {battle_id} on chain"))?;
        record.status = BattleStatus::Matched;
        drop(records);

        self.acceptances.lock().unwrap().push(AcceptanceCall {
            battle_id,
            response_url: response_url.to_string(),
            commit_hash: commit_hash.to_string(),
            tx_ref: tx_ref.clone(),
        });
        Ok(tx_ref)
    }

    async fn submit_reveal(
        &self,
        battle_id: u64,
        verses: &[Verse],
        recording_ref: &str,
        nonce: u64,
    ) -> anyhow::Result<String> {
        self.take_failure()?;
        let tx_ref = self.next_tx();
        self.reveals.lock().unwrap().push(RevealCall {
            battle_id,
            verses: verses.to_vec(),
            recording_ref: recording_ref.to_string(),
            nonce,
            tx_ref: tx_ref.clone(),
        });
        Ok(tx_ref)
    }

    async fn submit_vote(
        &self,
        battle_id: u64,
        vote_code: u8,
        stake_amount: u64,
    ) -> anyhow::Result<String> {
        self.take_failure()?;
        let tx_ref = self.next_tx();
        self.votes.lock().unwrap().push(VoteCall {
            battle_id,
            vote_code,
            stake_amount,
            tx_ref: tx_ref.clone(),
        });
        Ok(tx_ref)
    }

    async fn fetch_battle_record(&self, battle_id: u64) -> anyhow::Result<Option<BattleRecord>> {
        self.take_failure()?;
        Ok(self.records.lock().unwrap().get(&battle_id).cloned())
    }

    async fn fetch_battles_by_category(
        &self,
        category: &str,
    ) -> anyhow::Result<Vec<BattleRecord>> {
        self.take_failure()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .get(category)
            .cloned()
            .unwrap_or_default())
    }
}

// ========================================
// Social mock
// ========================================

#[derive(Debug, Clone)]
pub struct ChallengePost {
    pub defender_handle: String,
    pub message: String,
    pub hashtags: Vec<String>,
    pub media_ref: String,
    pub window_hours: u64,
    pub receipt: PostReceipt,
}

#[derive(Debug, Clone)]
pub struct ResponsePost {
    pub battle_id: u64,
    pub message: String,
    pub hashtags: Vec<String>,
    pub media_ref: String,
    pub in_reply_to: Option<String>,
    pub receipt: PostReceipt,
}

/// Post recorder posing as the social platform
#[derive(Default)]
pub struct MockSocial {
    post_counter: AtomicU64,
    challenge_posts: Mutex<Vec<ChallengePost>>,
    response_posts: Mutex<Vec<ResponsePost>>,
    fail_next: Mutex<Option<String>>,
}

impl MockSocial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next post fail with this message
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn challenge_posts(&self) -> Vec<ChallengePost> {
        self.challenge_posts.lock().unwrap().clone()
    }

    pub fn response_posts(&self) -> Vec<ResponsePost> {
        self.response_posts.lock().unwrap().clone()
    }

    fn next_receipt(&self) -> PostReceipt {
        let id = 1000 + self.post_counter.fetch_add(1, Ordering::SeqCst);
        PostReceipt {
            post_id: id.to_string(),
            post_url: format!("https://x.com/rechat/status/{id}"),
        }
    }

    fn take_failure(&self) -> anyhow::Result<()> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            anyhow::bail!(message);
        }
        Ok(())
    }
}

#[async_trait]
impl SocialClient for MockSocial {
    async fn post_challenge(
        &self,
        defender_handle: &str,
        message: &str,
        hashtags: &[String],
        media_ref: &str,
        window_hours: u64,
    ) -> anyhow::Result<PostReceipt> {
        self.take_failure()?;
        let receipt = self.next_receipt();
        self.challenge_posts.lock().unwrap().push(ChallengePost {
            defender_handle: defender_handle.to_string(),
            message: message.to_string(),
            hashtags: hashtags.to_vec(),
            media_ref: media_ref.to_string(),
            window_hours,
            receipt: receipt.clone(),
        });
        Ok(receipt)
    }

    async fn post_response(
        &self,
        battle_id: u64,
        message: &str,
        hashtags: &[String],
        media_ref: &str,
        in_reply_to: Option<&str>,
    ) -> anyhow::Result<PostReceipt> {
        self.take_failure()?;
        let receipt = self.next_receipt();
        self.response_posts.lock().unwrap().push(ResponsePost {
            battle_id,
            message: message.to_string(),
            hashtags: hashtags.to_vec(),
            media_ref: media_ref.to_string(),
            in_reply_to: in_reply_to.map(str::to_string),
            receipt: receipt.clone(),
        });
        Ok(receipt)
    }
}

// ========================================
// Transcript mock
// ========================================

/// Fixed transcript for any recording reference
pub struct ScriptedTranscript {
    words: Vec<WordTimestamp>,
}

impl ScriptedTranscript {
    pub fn new(words: Vec<WordTimestamp>) -> Self {
        Self { words }
    }
}

#[async_trait]
impl TranscriptSource for ScriptedTranscript {
    async fn transcribe(&self, _recording_ref: &str) -> anyhow::Result<Vec<WordTimestamp>> {
        Ok(self.words.clone())
    }
}
