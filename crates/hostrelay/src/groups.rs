//! Lobby-keyed connection groups.
//!
//! Both realtime channels address clients by lobby: "everyone in lobby 7"
//! or "the host of lobby 7". A [`GroupRegistry`] maps each lobby to the
//! outbound queues of its open connections. Queues are unbounded, so a
//! send never waits on a slow client, and a dead queue only affects its
//! own connection.

use std::collections::HashMap;
use std::sync::Arc;

use hostrelay_protocol::{LobbyId, UserId};
use hostrelay_transport::ConnectionId;
use tokio::sync::mpsc;

/// Sending half of a connection's outbound queue. Frames are shared so a
/// broadcast encodes once and every member gets a cheap clone.
pub type Outbound = mpsc::UnboundedSender<Arc<[u8]>>;

#[derive(Debug)]
struct Member {
    user_id: UserId,
    tx: Outbound,
}

/// Connections grouped by lobby.
///
/// NOT thread-safe by itself; the server keeps one per channel behind a
/// `tokio::sync::Mutex`.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<LobbyId, HashMap<ConnectionId, Member>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a lobby's group. A user may hold several
    /// connections (e.g. two browser tabs); each is tracked separately.
    pub fn add(&mut self, lobby_id: LobbyId, conn_id: ConnectionId, user_id: UserId, tx: Outbound) {
        self.groups
            .entry(lobby_id)
            .or_default()
            .insert(conn_id, Member { user_id, tx });
        tracing::debug!(%lobby_id, %conn_id, %user_id, "joined group");
    }

    /// Removes a connection. Empty groups are dropped. Returns `false` if
    /// the connection wasn't in the group.
    pub fn remove(&mut self, lobby_id: LobbyId, conn_id: ConnectionId) -> bool {
        let Some(group) = self.groups.get_mut(&lobby_id) else {
            return false;
        };
        let removed = group.remove(&conn_id).is_some();
        if group.is_empty() {
            self.groups.remove(&lobby_id);
        }
        if removed {
            tracing::debug!(%lobby_id, %conn_id, "left group");
        }
        removed
    }

    /// Queues `frame` for every connection in the group. Returns how many
    /// queues accepted it.
    pub fn broadcast(&self, lobby_id: LobbyId, frame: &Arc<[u8]>) -> usize {
        self.deliver(lobby_id, frame, |_| true)
    }

    /// Queues `frame` for every connection `user_id` holds in the group.
    pub fn send_to_user(&self, lobby_id: LobbyId, user_id: UserId, frame: &Arc<[u8]>) -> usize {
        self.deliver(lobby_id, frame, |member| member.user_id == user_id)
    }

    fn deliver(
        &self,
        lobby_id: LobbyId,
        frame: &Arc<[u8]>,
        filter: impl Fn(&Member) -> bool,
    ) -> usize {
        let Some(group) = self.groups.get(&lobby_id) else {
            return 0;
        };
        group
            .iter()
            .filter(|(_, member)| filter(member))
            .filter(|(conn_id, member)| {
                let sent = member.tx.send(Arc::clone(frame)).is_ok();
                if !sent {
                    tracing::trace!(%lobby_id, %conn_id, "outbound queue closed, skipping");
                }
                sent
            })
            .count()
    }

    pub fn member_count(&self, lobby_id: LobbyId) -> usize {
        self.groups.get(&lobby_id).map_or(0, HashMap::len)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
