pub mod config;
pub mod exchange;
pub mod frontend;
pub mod link;
pub mod worker;
