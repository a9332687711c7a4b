// IPS patch format implementation.
//
// # Modules
//
// - `header` — `PATCH` magic and the optional `EOF` trailer
// - `hunk`   — Hunk record model and its wire codec
// - `diff`   — Greedy single-pass diff producing Hunks
// - `create` — Patch creation pipeline (header + diffed hunks)
// - `apply`  — Patch reader and in-place application

pub mod apply;
pub mod create;
pub mod diff;
pub mod header;
pub mod hunk;

/// Largest offset the 3-byte IPS offset field can hold.
pub const MAX_OFFSET: u64 = 0xFF_FFFF;

/// Largest literal length / RLE count the 2-byte fields can hold.
pub const MAX_HUNK_LEN: usize = u16::MAX as usize;

// Re-export key types for convenience.
pub use apply::{ApplyOptions, ApplySummary, Applied, PatchReader, apply_all};
pub use create::{CreateOptions, CreateSummary, create_all};
pub use diff::{DiffEngine, Run};
pub use header::{EOF_MARKER, IPS_MAGIC};
pub use hunk::{Hunk, HunkBody, OverflowPolicy};
