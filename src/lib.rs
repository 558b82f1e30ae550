//! Nalcast - play live H.264 NAL queues through libVLC
//!
//! This library crate exposes configuration and the file feeder for the
//! `nalcast` binary and its integration tests.

pub mod config;
pub mod feeder;
