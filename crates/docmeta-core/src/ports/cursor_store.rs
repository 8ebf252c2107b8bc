//! Cursor store port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific and
//!   the engine treats them all the same way (the run fails).
//! - `load` distinguishes "no cursor yet" (`Ok(None)`) from a broken store.

use crate::domain::CursorState;

/// Persists the delta cursor between runs
#[async_trait::async_trait]
pub trait ICursorStore: Send + Sync {
    /// Loads the last saved cursor, `None` on first run
    async fn load(&self) -> anyhow::Result<Option<CursorState>>;

    /// Replaces the saved cursor
    async fn save(&self, state: &CursorState) -> anyhow::Result<()>;
}
