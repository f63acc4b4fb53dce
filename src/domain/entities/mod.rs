pub mod agent;
pub mod assignment;
pub mod chat_flow;
pub mod conversation;

pub use agent::*;
pub use assignment::*;
pub use chat_flow::*;
pub use conversation::*;
