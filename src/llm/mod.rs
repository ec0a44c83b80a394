pub mod anthropic;
pub mod client;
pub mod prompts;
pub mod retry;
pub mod validation;

#[cfg(test)]
pub mod stub;

pub use anthropic::*;
pub use client::*;
pub use prompts::*;
pub use retry::*;
pub use validation::*;
