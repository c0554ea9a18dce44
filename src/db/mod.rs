//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed row structs returned by repositories.
//! - `repo`: SQL-only functions that map rows into those structs.
//!
//! The database carries operational state only (sessions and staged
//! images); published content belongs to the content store. External
//! modules should import from `pitchboard::db` — we re-export the
//! repository API and the row models for convenience.

pub mod model;
pub mod repo;

// Re-export the repository API at `crate::db::*`.
pub use repo::*;

pub use model::{SessionRow, StagedImageRow};
