pub mod agent_selector;
pub mod keyword_classifier;

pub use agent_selector::*;
pub use keyword_classifier::*;
