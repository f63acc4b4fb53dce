#![allow(dead_code, unused_imports)]
pub mod livetalk_helpers;
pub mod test_db;

pub use livetalk_helpers::*;
pub use test_db::*;
