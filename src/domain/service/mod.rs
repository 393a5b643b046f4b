pub mod cross_check;
pub use cross_check::*;

pub mod internal_check;
pub use internal_check::*;

pub mod repair;
pub use repair::*;

pub mod sysmeta;
pub use sysmeta::*;
