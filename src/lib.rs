pub mod config;
pub mod fetch;
pub mod logging;
pub mod mail;
pub mod store;
pub mod table;
pub mod workflow;
