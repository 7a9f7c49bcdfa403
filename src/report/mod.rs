//! Report assembly & lineage (spec §4.11): ties the pricing, risk, and
//! stress subsystems' outputs together into one canonical-JSON artifact,
//! linked by the same portfolio snapshot hash and request/bundle hashes
//! each subsystem already carries in its own lineage fields. This module
//! adds no new numbers — it only assembles and serializes what the other
//! engines already computed.

pub mod assembly;
pub mod lineage;

pub use assembly::AnalyticsReport;
pub use lineage::ReportLineage;
