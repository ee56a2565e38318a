//! Purpose: Define the stable public Rust API boundary for muster.
//! Exports: Core types and roster operations needed by the CLI, server, and tests.
//! Role: Public, additive-only surface; storage internals stay behind it.
//! Invariants: This module is the only public path to roster operations.

mod remote;
mod roster;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::page::{DEFAULT_PAGE_SIZE, PageSpec};
pub use crate::core::player::{NewPlayer, Player, PlayerOrder, PlayerPatch, Profession, Race};
pub use crate::core::query::Criteria;
pub use crate::core::store::{FileStore, MemoryStore, PlayerStore};
pub use remote::RemoteRoster;
pub use roster::LocalRoster;
