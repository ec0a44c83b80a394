pub mod groups;
pub mod segment;

pub use groups::*;
pub use segment::*;
