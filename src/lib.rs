//! Multivision - multi-camera segment buffering player
//!
//! This library crate exposes the player core for the CLI and integration tests.

pub mod bootstrap;
pub mod buffer;
pub mod config;
pub mod fetcher;
pub mod playback;
pub mod player;
pub mod sim;
pub mod source;
