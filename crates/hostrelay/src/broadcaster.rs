//! Pushes a `GameStateUpdate` to every running game, 64 times a second.

use std::sync::Arc;

use hostrelay_game::GameAuthority;
use hostrelay_protocol::{Codec, JsonCodec};
use hostrelay_tick::{TickConfig, TickScheduler};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::groups::GroupRegistry;

/// Snapshot rate of the broadcaster. Fixed; clients interpolate against it.
pub const BROADCAST_TICK_RATE_HZ: u32 = 64;

/// Reads every game under the lock, then fans the snapshots out to the
/// game-channel groups with the lock released.
pub struct TickBroadcaster {
    games: Arc<Mutex<GameAuthority>>,
    groups: Arc<Mutex<GroupRegistry>>,
    codec: JsonCodec,
}

impl TickBroadcaster {
    pub fn new(games: Arc<Mutex<GameAuthority>>, groups: Arc<Mutex<GroupRegistry>>) -> Self {
        Self {
            games,
            groups,
            codec: JsonCodec,
        }
    }

    /// Broadcasts one round of snapshots. Returns how many frames were
    /// queued across all groups.
    pub async fn tick_once(&self) -> usize {
        let snapshots = self.games.lock().await.snapshots();
        if snapshots.is_empty() {
            return 0;
        }

        let mut frames = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let lobby_id = snapshot.lobby_id;
            match self.codec.encode(&snapshot.into_message()) {
                Ok(bytes) => frames.push((lobby_id, Arc::<[u8]>::from(bytes))),
                Err(e) => tracing::error!(%lobby_id, error = %e, "failed to encode snapshot"),
            }
        }

        let groups = self.groups.lock().await;
        frames
            .iter()
            .map(|(lobby_id, frame)| groups.broadcast(*lobby_id, frame))
            .sum()
    }

    /// Ticks until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut scheduler = TickScheduler::new(TickConfig::with_rate(BROADCAST_TICK_RATE_HZ));
        tracing::info!(rate_hz = scheduler.tick_rate_hz(), "tick broadcaster started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                info = scheduler.wait_for_tick() => {
                    let sent = self.tick_once().await;
                    scheduler.record_tick_end();
                    tracing::trace!(tick = info.tick, sent, "snapshots broadcast");
                }
            }
        }

        let metrics = scheduler.metrics();
        tracing::info!(
            ticks = metrics.total_ticks,
            overruns = metrics.total_overruns,
            skipped = metrics.total_skipped,
            "tick broadcaster stopped"
        );
    }
}
