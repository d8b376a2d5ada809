//! The lobby authority: membership and the Open / InGame machine.

use hostrelay_protocol::{LobbyId, UserId};
use hostrelay_session::StoreError;
use tokio::sync::Mutex;

use crate::{JoinCode, Lobby, LobbyError, LobbyStatus, LobbyStore};

/// How many fresh codes `create_lobby` draws before giving up.
pub const MAX_JOIN_CODE_ATTEMPTS: usize = 8;

/// Owns every lobby mutation.
///
/// Each individual store call is atomic, but operations like "check the
/// user is in no lobby, then insert" span several calls. A single
/// process-wide `writes` mutex serializes those read-check-write sequences
/// so the one-lobby-per-user invariant holds under concurrent requests.
/// Plain reads skip the mutex.
pub struct LobbyAuthority<L> {
    store: L,
    writes: Mutex<()>,
}

impl<L: LobbyStore> LobbyAuthority<L> {
    pub fn new(store: L) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    /// Creates an Open lobby hosted by `host_id`.
    ///
    /// # Errors
    /// - [`LobbyError::AlreadyExists`] if the user is already in a lobby
    /// - [`LobbyError::Store`] with a conflict if no unique code was found
    ///   in [`MAX_JOIN_CODE_ATTEMPTS`] draws
    pub async fn create_lobby(&self, host_id: UserId) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        if self.store.lobby_by_member(host_id).await?.is_some() {
            return Err(LobbyError::AlreadyExists(host_id));
        }

        for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
            match self.store.insert_lobby(JoinCode::generate(), host_id).await {
                Ok(lobby) => {
                    tracing::info!(
                        lobby_id = %lobby.id,
                        %host_id,
                        join_code = %lobby.join_code,
                        "lobby created"
                    );
                    return Ok(lobby);
                }
                Err(StoreError::Conflict(_)) => {
                    tracing::debug!(attempt, "join code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Conflict("no free join code".into()).into())
    }

    /// Adds `user_id` to the lobby with `code`.
    ///
    /// # Errors
    /// - [`LobbyError::InvalidJoinCode`] if the code is malformed
    /// - [`LobbyError::AlreadyExists`] if the user is in any lobby
    /// - [`LobbyError::NotFound`] if no lobby has the code
    /// - [`LobbyError::LobbyClosed`] if the lobby is in game
    pub async fn join_lobby(&self, user_id: UserId, code: &str) -> Result<Lobby, LobbyError> {
        let code = JoinCode::parse(code)?;
        let _guard = self.writes.lock().await;

        if self.store.lobby_by_member(user_id).await?.is_some() {
            return Err(LobbyError::AlreadyExists(user_id));
        }

        let mut lobby = self
            .store
            .lobby_by_code(&code)
            .await?
            .ok_or(LobbyError::NotFound)?;

        if !lobby.status.is_joinable() {
            return Err(LobbyError::LobbyClosed(lobby.id));
        }

        lobby.add_member(user_id);
        self.save(&lobby).await?;

        tracing::info!(lobby_id = %lobby.id, %user_id, "user joined lobby");
        Ok(lobby)
    }

    /// Removes `user_id` from their lobby and returns the lobby as it is
    /// now. The result may be empty or hostless; the caller decides whether
    /// to disband.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if the user is in no lobby.
    pub async fn leave_lobby(&self, user_id: UserId) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        let mut lobby = self
            .store
            .lobby_by_member(user_id)
            .await?
            .ok_or(LobbyError::NotFound)?;

        lobby.remove_member(user_id);
        self.save(&lobby).await?;

        tracing::info!(lobby_id = %lobby.id, %user_id, "user left lobby");
        Ok(lobby)
    }

    /// Removes `user_id` from the lobby `lobby_id` specifically. Unlike
    /// [`leave_lobby`](Self::leave_lobby) the membership check and the
    /// removal happen under one guard, so a user who has just moved to
    /// another lobby is left alone.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if the lobby is gone or the user isn't in it.
    pub async fn remove_member(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
    ) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        let mut lobby = self
            .store
            .lobby_by_id(lobby_id)
            .await?
            .filter(|lobby| lobby.is_member(user_id))
            .ok_or(LobbyError::NotFound)?;

        lobby.remove_member(user_id);
        self.save(&lobby).await?;

        tracing::info!(%lobby_id, %user_id, "member removed from lobby");
        Ok(lobby)
    }

    /// Deletes a lobby and returns what it was.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if it is already gone. Disbanding twice is
    /// harmless.
    pub async fn disband_lobby(&self, lobby_id: LobbyId) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        let lobby = self
            .store
            .delete_lobby(lobby_id)
            .await?
            .ok_or(LobbyError::NotFound)?;

        tracing::info!(%lobby_id, "lobby disbanded");
        Ok(lobby)
    }

    /// Moves the caller's lobby to InGame.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`] if the user is in no lobby
    /// - [`LobbyError::Forbidden`] if the user isn't the host
    /// - [`LobbyError::LobbyClosed`] if the lobby is already in game
    pub async fn start_game(&self, host_id: UserId) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        let mut lobby = self
            .store
            .lobby_by_member(host_id)
            .await?
            .ok_or(LobbyError::NotFound)?;

        if !lobby.is_host(host_id) {
            return Err(LobbyError::Forbidden(host_id));
        }
        if lobby.status != LobbyStatus::Open {
            return Err(LobbyError::LobbyClosed(lobby.id));
        }

        lobby.status = LobbyStatus::InGame;
        self.save(&lobby).await?;

        tracing::info!(lobby_id = %lobby.id, %host_id, "lobby in game");
        Ok(lobby)
    }

    /// Puts a lobby back to Open after its game ends.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if the lobby is gone.
    pub async fn open_lobby(&self, lobby_id: LobbyId) -> Result<Lobby, LobbyError> {
        let _guard = self.writes.lock().await;

        let mut lobby = self
            .store
            .lobby_by_id(lobby_id)
            .await?
            .ok_or(LobbyError::NotFound)?;

        lobby.status = LobbyStatus::Open;
        self.save(&lobby).await?;

        tracing::info!(%lobby_id, "lobby reopened");
        Ok(lobby)
    }

    // -- Reads --------------------------------------------------------------

    /// # Errors
    /// [`LobbyError::NotFound`] if there is no such lobby.
    pub async fn get_lobby(&self, lobby_id: LobbyId) -> Result<Lobby, LobbyError> {
        self.store
            .lobby_by_id(lobby_id)
            .await?
            .ok_or(LobbyError::NotFound)
    }

    /// Looks a lobby up by code. A malformed code simply matches nothing.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Lobby>, LobbyError> {
        match JoinCode::parse(code) {
            Ok(code) => Ok(self.store.lobby_by_code(&code).await?),
            Err(_) => Ok(None),
        }
    }

    pub async fn lobby_of_user(&self, user_id: UserId) -> Result<Option<Lobby>, LobbyError> {
        Ok(self.store.lobby_by_member(user_id).await?)
    }

    async fn save(&self, lobby: &Lobby) -> Result<(), LobbyError> {
        if self.store.update_lobby(lobby.clone()).await? {
            Ok(())
        } else {
            Err(LobbyError::NotFound)
        }
    }
}
