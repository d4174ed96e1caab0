//! Support Buddy core library.
//!
//! Message analysis, reply selection, mood trends and the per-session actor
//! system. `main.rs` is a terminal front end over this API.

pub mod actors;
pub mod brain;
pub mod clock;
pub mod config;
pub mod error;
pub mod fs_manager;
pub mod models;
pub mod session;

#[cfg(test)]
mod tests;
