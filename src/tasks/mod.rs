//! Background Tasks Module
//!
//! Contains background tasks started alongside the server.
//!
//! # Tasks
//! - Initialization: opens the cache store, retrying until it succeeds

mod init;

pub use init::spawn_initialize_task;
