//! # Bracket Manager
//!
//! A tournament bracket lifecycle library: generate the complete match
//! graph for a stage, accept score updates, propagate winners and losers
//! through dependent matches, and report standings.
//!
//! ## Architecture
//!
//! - **Stage generation** builds single elimination, double elimination and
//!   round-robin layouts from a seeded participant list, honoring seeding
//!   methods, BYE placement, group counts, consolation finals and
//!   grand-final variants.
//! - **The progression engine** recomputes a match's status on every update
//!   and pushes participants into successor slots, including BYE
//!   auto-advance, forfeits and idempotent reversal on reset.
//! - **Best-of series** aggregate child-game outcomes into the parent
//!   match under win-threshold semantics.
//!
//! The match graph is never persisted as edges: successor and predecessor
//! relations are recomputed from positional identity, so storage stays a
//! plain set of CRUD tables behind the [`storage::Storage`] trait.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bracket_manager::{BracketManager, MemoryStorage};
//! use bracket_manager::model::{CreateStageInput, StageType};
//!
//! # async fn run() -> bracket_manager::Result<()> {
//! let manager = BracketManager::new(Arc::new(MemoryStorage::new()));
//! let tournament_id = manager.create_tournament("Winter Cup").await?;
//! let stage = manager
//!     .create_stage(CreateStageInput {
//!         tournament_id,
//!         name: "Main bracket".into(),
//!         stage_type: StageType::SingleElimination,
//!         seeding: Some(vec![
//!             Some("Ada".into()),
//!             Some("Grace".into()),
//!             Some("Edsger".into()),
//!             Some("Barbara".into()),
//!         ]),
//!         settings: Default::default(),
//!     })
//!     .await?;
//! let matches = manager.get_current_matches(stage.id).await?;
//! assert_eq!(matches.len(), 2);
//! # Ok(())
//! # }
//! ```

/// Error types shared by every operation.
pub mod errors;
pub use errors::{Error, Result, StorageError};

/// Persisted entities, settings and operation inputs.
pub mod model;

/// Seed ordering methods.
pub mod ordering;

/// Derived match-graph navigation.
pub mod graph;

/// The storage contract and the in-memory backend.
pub mod storage;
pub use storage::{MemoryStorage, Storage};

/// The public operation surface.
pub mod manager;
pub use manager::BracketManager;

mod progression;
mod stage;
