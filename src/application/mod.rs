//! Application layer - Use cases that coordinate domain services.
//!
//! Use cases reach the network only through [`MetadataRepository`] and
//! [`ExternalResolver`], and run their requests through a [`BurstLimiter`].
//!
//! [`MetadataRepository`]: crate::node::MetadataRepository
//! [`ExternalResolver`]: crate::resolve::ExternalResolver
//! [`BurstLimiter`]: crate::burst::BurstLimiter

mod check;
mod collect;
mod fetch;
mod repair;
mod resolve;
mod sysmeta_info;

pub use check::{InternalReport, check_internal, compare_with_catalog, cross_check, select_records};
pub use collect::{collect_chains, extract_metadata_pid};
pub use fetch::fetch_snapshot;
pub use repair::{IdentifierLocks, RepairOutcome, RepairStatus, RepairSummary, Repairer};
pub use resolve::{ResolutionSummary, resolve_unresolved};
pub use sysmeta_info::{observed_links, read_identifier_list};
