pub mod annotate;
pub mod merge;
pub mod punctuate;

pub use annotate::*;
pub use merge::*;
pub use punctuate::*;
