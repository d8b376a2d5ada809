//! Host-authoritative game state for Hostrelay.
//!
//! The server does no simulation. It stores what clients report (each
//! player's own pose, and the host's view of every world object) and
//! hands out snapshots for the tick broadcaster to fan out.

mod authority;
mod error;
mod state;

pub use authority::GameAuthority;
pub use error::GameError;
pub use state::{GameSnapshot, GameState};
