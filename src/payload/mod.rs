//! New-session payload storage and region extraction.
//!
//! The raw capability document is written once into a [`PayloadStore`] and
//! re-read from there for every candidate encoding. Small documents stay in
//! memory; large ones spill to an unnamed temp file that disappears when
//! the store drops. [`CapabilityReader`] pulls the individual capability
//! regions (`desiredCapabilities`, `capabilities.alwaysMatch`,
//! `capabilities.firstMatch`) out of a read pass without materializing the
//! rest of the document.

pub mod reader;
pub mod store;

pub use reader::CapabilityReader;
pub use store::{PayloadStore, DEFAULT_SPILL_THRESHOLD};
