pub mod config;
pub mod delays;
pub mod error;
pub mod playback;
pub mod sink;
