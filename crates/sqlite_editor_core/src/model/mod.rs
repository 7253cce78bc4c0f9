//! Schema descriptor model.
//!
//! # Responsibility
//! - Define the desired-schema structures the editor hands to the migrator.
//! - Keep validation rules next to the data they guard.
//!
//! # Invariants
//! - Descriptors are plain values; nothing here touches the engine.

pub mod field;
