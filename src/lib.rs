//! Workspace placeholder crate.
//!
//! Exposes the sync service behind the `desktop-shims` feature so a host
//! binary can depend on `marketplace-sync-workspace` without wiring each
//! workspace crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
