//! Storage (C5): raw zone, canonical zone, and the dataset registry that
//! ties them together under one append-only publish log.

pub mod canonical_zone;
pub mod raw_zone;
pub mod registry;

pub use canonical_zone::{CanonicalZone, PublishedSnapshot};
pub use raw_zone::RawZone;
pub use registry::{DatasetRegistry, RegistryEntry};
