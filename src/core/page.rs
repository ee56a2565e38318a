//! Purpose: Slice an ordered result sequence into one bounded page.
//! Exports: `PageSpec`, `paginate`, `DEFAULT_PAGE_SIZE`.
//! Role: Last stage of the list pipeline; count bypasses it.
//! Invariants: Zero-based page numbers; a page past the end is empty, never
//! an error. Index arithmetic saturates instead of overflowing.

use crate::core::player::Player;

pub const DEFAULT_PAGE_SIZE: u32 = 3;

/// Requested page. `None` fields take the defaults: page 0, size 3.
#[derive(Clone, Copy, Debug, Default)]
pub struct PageSpec {
    pub number: Option<u32>,
    pub size: Option<u32>,
}

pub fn paginate(players: Vec<Player>, page: &PageSpec) -> Vec<Player> {
    let number = page.number.unwrap_or(0) as usize;
    let size = page.size.unwrap_or(DEFAULT_PAGE_SIZE) as usize;
    let from = number.saturating_mul(size);
    players.into_iter().skip(from).take(size).collect()
}
