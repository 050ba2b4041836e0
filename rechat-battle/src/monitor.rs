//! Background battle monitoring
//!
//! One polling loop per watched battle: each tick refreshes the local
//! session against the chain record and cancels the battle if the
//! reveal window has lapsed. The loop stops on its own once the session
//! reaches a terminal status or disappears from the store; transient
//! poll failures only log and the loop keeps going.

use crate::coordinator::BattleCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to one running monitor loop
///
/// Dropping the handle detaches the loop; it still stops on terminal
/// status and still honors [`BattleCoordinator::shutdown`], which holds
/// a clone of the same cancellation token.
#[derive(Debug)]
pub struct MonitorHandle {
    battle_id: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// The battle this monitor watches
    pub fn battle_id(&self) -> u64 {
        self.battle_id
    }

    /// Whether the loop has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Outcome of one poll tick
#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Continue,
    Stop,
}

/// Spawn the polling loop for one battle
///
/// The token is shared with the coordinator's monitor registry; the
/// loop cancels it on natural exit so the registry can tell a finished
/// monitor from a live one.
pub(crate) fn spawn(
    coordinator: Arc<BattleCoordinator>,
    battle_id: u64,
    interval: Duration,
    cancel: CancellationToken,
) -> MonitorHandle {
    let loop_token = cancel.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if tick(&coordinator, battle_id).await == Tick::Stop {
                break;
            }
        }
        loop_token.cancel();
        debug!(battle_id, "monitor stopped");
    });

    MonitorHandle {
        battle_id,
        cancel,
        task,
    }
}

async fn tick(coordinator: &BattleCoordinator, battle_id: u64) -> Tick {
    let Some(snapshot) = coordinator.session_snapshot(battle_id).await else {
        debug!(battle_id, "session gone, monitor stopping");
        return Tick::Stop;
    };
    if snapshot.status.is_terminal() {
        return Tick::Stop;
    }

    debug!(battle_id, status = %snapshot.status, "polling battle status");
    if let Err(err) = coordinator.refresh_status(battle_id).await {
        warn!(battle_id, error = %err, "status poll failed, will retry");
    }

    match coordinator.cancel_if_expired(battle_id).await {
        Ok(true) => return Tick::Stop,
        Ok(false) => {}
        Err(err) => {
            warn!(battle_id, error = %err, "expiry check failed, will retry");
        }
    }

    match coordinator.session_snapshot(battle_id).await {
        Some(snapshot) if !snapshot.status.is_terminal() => Tick::Continue,
        _ => Tick::Stop,
    }
}
