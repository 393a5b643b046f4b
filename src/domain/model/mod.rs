pub mod chain;
pub mod finding;
pub mod identifier;
pub mod link;
pub mod snapshot;

pub use chain::*;
pub use finding::*;
pub use identifier::*;
pub use link::*;
pub use snapshot::*;
