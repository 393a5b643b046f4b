pub mod application;
pub mod burst;
pub mod commands;
pub mod domain;
pub mod error;
pub mod export;
pub mod http;
pub mod node;
pub mod resolve;
pub mod runtime;
