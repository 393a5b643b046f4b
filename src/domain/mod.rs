//! Chain consistency and repair engine.
//!
//! `model` holds the data types; `service` holds the pure checking and
//! planning logic. Nothing in here performs I/O.

pub mod model;
pub mod service;
