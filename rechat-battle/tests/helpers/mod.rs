//! Shared test infrastructure for the battle engine suites
//!
//! Provides scripted collaborator mocks, a preassembled coordinator rig,
//! verse fixtures, and event-stream helpers.
#![allow(dead_code)]

pub mod mocks;

pub use mocks::{MockChain, MockSocial, ScriptedTranscript};

use rechat_battle::config::BattleConfig;
use rechat_battle::coordinator::{BattleCoordinator, ChallengeParams};
use rechat_battle::monitor::MonitorHandle;
use rechat_battle::store::SessionStore;
use rechat_common::events::BattleEvent;
use rechat_common::model::{BattleRecord, BattleStatus, Verse, WordTimestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Opt-in log output: run with `RUST_LOG=debug cargo test -- --nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config tuned so the monitor polls in real milliseconds
pub fn fast_config() -> BattleConfig {
    BattleConfig {
        poll_interval_ms: 25,
        ..BattleConfig::default()
    }
}

/// A coordinator wired to scripted collaborators
pub struct TestRig {
    pub coordinator: Arc<BattleCoordinator>,
    pub chain: Arc<MockChain>,
    pub social: Arc<MockSocial>,
    pub store: Arc<SessionStore>,
}

pub fn rig() -> TestRig {
    rig_with_config(fast_config())
}

pub fn rig_with_config(config: BattleConfig) -> TestRig {
    let store = Arc::new(SessionStore::new());
    let chain = Arc::new(MockChain::new("mc_flow"));
    let social = Arc::new(MockSocial::new());
    let coordinator = Arc::new(BattleCoordinator::new(
        Arc::clone(&store),
        chain.clone(),
        social.clone(),
        config,
    ));
    TestRig {
        coordinator,
        chain,
        social,
        store,
    }
}

/// Numbered verses from lyric lines, spaced along the timeline
pub fn entry(lines: &[&str]) -> Vec<Verse> {
    lines
        .iter()
        .enumerate()
        .map(|(i, lyrics)| {
            let start = i as u64 * 3000;
            Verse::new(i as u32 + 1, *lyrics, start, start + 2500, 88)
        })
        .collect()
}

/// Word timestamps spaced 500ms apart with uniform confidence
pub fn words(texts: &[&str]) -> Vec<WordTimestamp> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as u64 * 500;
            WordTimestamp::new(*text, start, start + 400, 0.875)
        })
        .collect()
}

/// Canonical create_challenge input
pub fn challenge_params() -> ChallengeParams {
    ChallengeParams {
        defender_handle: String::from("rhyme_king"),
        context_url: String::from("https://x.com/mc_flow/status/111222333"),
        stake_amount: 1_000_000,
        verses: entry(&[
            "yo check the mic one two.",
            "my rhymes hit harder than you knew.",
        ]),
        recording_ref: String::from("ipfs://bafychallenge"),
        message: None,
        extra_hashtags: Vec::new(),
    }
}

/// Seed an open challenge from another participant and accept it
///
/// Leaves the rig holding a MATCHED defender session under `battle_id`.
pub async fn accepted_battle(rig: &TestRig, battle_id: u64) {
    rig.chain.seed_record(BattleRecord {
        battle_id,
        challenger: String::from("mc_flow"),
        defender: String::from("rhyme_king"),
        stake_amount: 500,
        status: BattleStatus::PendingAcceptance,
        context_url: String::from("https://x.com/mc_flow/status/111222333"),
    });
    rig.coordinator
        .accept_challenge(
            battle_id,
            entry(&["counter bars strike back."]),
            "ipfs://bafyresponse",
        )
        .await
        .expect("acceptance should succeed");
}

/// Wait for the next event of the given type, skipping others
///
/// Panics after five seconds; lagged gaps are skipped.
pub async fn next_event_of(
    rx: &mut broadcast::Receiver<BattleEvent>,
    event_type: &str,
) -> BattleEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if event.event_type() == event_type => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    panic!("event bus closed while waiting for {event_type}")
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {event_type} event"))
}

/// Wait for a monitor loop to exit on its own
pub async fn wait_until_finished(handle: &MonitorHandle) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("monitor should stop on its own");
}

/// Assert no already-emitted event of the given type is pending
pub fn assert_no_event_of(rx: &mut broadcast::Receiver<BattleEvent>, event_type: &str) {
    loop {
        match rx.try_recv() {
            Ok(event) => assert_ne!(
                event.event_type(),
                event_type,
                "unexpected {event_type} event"
            ),
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => return,
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
        }
    }
}
