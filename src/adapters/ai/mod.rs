//! AI backends for delegated threat assessment and planning.

pub mod anthropic;
pub mod mock;

pub use anthropic::{AnthropicAnalyst, AnthropicConfig};
pub use mock::MockAnalyst;
