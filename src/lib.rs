//! PropQuest - progression engine for a real-estate platform
//!
//! PropQuest tracks the gamification state behind the platform's user
//! experience: XP grants with derived levels, consecutive-day activity
//! streaks, an idempotency-guarded daily check-in bonus, a data-driven
//! badge catalog, and recomputed-on-read leaderboards.
//!
//! The engine is consumed two ways:
//!
//! 1. **Library**: [`progression::ProgressionManager`] exposes every
//!    operation as plain serde-serializable data, so any front end can
//!    sit on top.
//!
//! 2. **Local API**: `propquest serve` runs a small JSON-over-HTTP
//!    server for presentation-layer clients.

pub mod config;
pub mod progression;
pub mod server;

pub use progression::ProgressionManager;
