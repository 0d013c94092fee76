//! Library crate for the escape-room client, exposing modules for the binary and integration tests.

pub mod config;
pub mod dto;
pub mod error;
pub mod puzzles;
pub mod services;
pub mod state;
pub mod transport;
pub mod view;
