//! Access to DataONE member and coordinating nodes.

mod catalog;
mod client;

pub use catalog::RevisionCatalog;
pub use client::{MemberNode, MetadataRepository, NodeType};

#[cfg(test)]
pub use client::MockMetadataRepository;
