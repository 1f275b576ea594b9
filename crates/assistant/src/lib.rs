pub mod agents;
pub mod engine;
pub mod errors;
pub mod models;
pub mod processors;
pub mod registry;
pub mod runner;
pub mod service;
pub mod trace;
