//! Persistence seam for lobbies.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use hostrelay_protocol::{LobbyId, UserId};
use hostrelay_session::StoreError;
use tokio::sync::Mutex;

use crate::{JoinCode, Lobby, LobbyStatus};

/// Lobby persistence. Each call is atomic on its own.
pub trait LobbyStore: Send + Sync + 'static {
    /// Inserts an Open lobby with `host_id` as its only member.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] if a live lobby already uses `join_code`.
    fn insert_lobby(
        &self,
        join_code: JoinCode,
        host_id: UserId,
    ) -> impl Future<Output = Result<Lobby, StoreError>> + Send;

    fn lobby_by_id(
        &self,
        id: LobbyId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    fn lobby_by_code(
        &self,
        code: &JoinCode,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    fn lobby_by_member(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    /// Replaces the stored lobby with the same id. Returns `false` if it
    /// no longer exists.
    fn update_lobby(
        &self,
        lobby: Lobby,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes a lobby, returning it if it existed.
    fn delete_lobby(
        &self,
        id: LobbyId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// InMemoryLobbyStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LobbyTables {
    lobbies: BTreeMap<LobbyId, Lobby>,
    codes: HashMap<JoinCode, LobbyId>,
    /// Reverse index: member -> lobby.
    members: HashMap<UserId, LobbyId>,
    last_id: u64,
}

impl LobbyTables {
    fn unindex(&mut self, lobby: &Lobby) {
        self.codes.remove(&lobby.join_code);
        for member in &lobby.members {
            if self.members.get(member) == Some(&lobby.id) {
                self.members.remove(member);
            }
        }
    }

    fn index(&mut self, lobby: &Lobby) {
        self.codes.insert(lobby.join_code.clone(), lobby.id);
        for member in &lobby.members {
            self.members.insert(*member, lobby.id);
        }
    }
}

/// [`LobbyStore`] over in-process maps, guarded by one mutex.
#[derive(Default)]
pub struct InMemoryLobbyStore {
    tables: Mutex<LobbyTables>,
}

impl InMemoryLobbyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.lock().await.lobbies.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl LobbyStore for InMemoryLobbyStore {
    async fn insert_lobby(&self, join_code: JoinCode, host_id: UserId) -> Result<Lobby, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.codes.contains_key(&join_code) {
            return Err(StoreError::Conflict(format!("join code {join_code}")));
        }

        tables.last_id += 1;
        let lobby = Lobby {
            id: LobbyId(tables.last_id),
            join_code,
            host_id,
            status: LobbyStatus::Open,
            members: vec![host_id],
        };
        tables.index(&lobby);
        tables.lobbies.insert(lobby.id, lobby.clone());
        Ok(lobby)
    }

    async fn lobby_by_id(&self, id: LobbyId) -> Result<Option<Lobby>, StoreError> {
        Ok(self.tables.lock().await.lobbies.get(&id).cloned())
    }

    async fn lobby_by_code(&self, code: &JoinCode) -> Result<Option<Lobby>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.lobbies.get(id))
            .cloned())
    }

    async fn lobby_by_member(&self, user_id: UserId) -> Result<Option<Lobby>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .members
            .get(&user_id)
            .and_then(|id| tables.lobbies.get(id))
            .cloned())
    }

    async fn update_lobby(&self, lobby: Lobby) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(old) = tables.lobbies.remove(&lobby.id) else {
            return Ok(false);
        };
        tables.unindex(&old);
        tables.index(&lobby);
        tables.lobbies.insert(lobby.id, lobby);
        Ok(true)
    }

    async fn delete_lobby(&self, id: LobbyId) -> Result<Option<Lobby>, StoreError> {
        let mut tables = self.tables.lock().await;
        let removed = tables.lobbies.remove(&id);
        if let Some(lobby) = &removed {
            tables.unindex(lobby);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> JoinCode {
        JoinCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_lobby_duplicate_code_returns_conflict() {
        let store = InMemoryLobbyStore::new();
        store.insert_lobby(code("AAAAAA"), UserId(1)).await.unwrap();

        let result = store.insert_lobby(code("AAAAAA"), UserId(2)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_lobby_frees_code_and_members() {
        let store = InMemoryLobbyStore::new();
        let lobby = store.insert_lobby(code("AAAAAA"), UserId(1)).await.unwrap();

        store.delete_lobby(lobby.id).await.unwrap();

        assert!(store.lobby_by_member(UserId(1)).await.unwrap().is_none());
        assert!(store.insert_lobby(code("AAAAAA"), UserId(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_lobby_reindexes_members() {
        let store = InMemoryLobbyStore::new();
        let mut lobby = store.insert_lobby(code("AAAAAA"), UserId(1)).await.unwrap();

        lobby.members = vec![UserId(2)];
        assert!(store.update_lobby(lobby.clone()).await.unwrap());

        assert!(store.lobby_by_member(UserId(1)).await.unwrap().is_none());
        assert_eq!(
            store.lobby_by_member(UserId(2)).await.unwrap().map(|l| l.id),
            Some(lobby.id)
        );
    }
}
