pub mod broker;
pub mod command;
pub mod engine;
pub mod logging;
pub mod market;
