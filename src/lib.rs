//! Prabodha · HTML/CSS challenge trainer backend.
//!
//! Core pieces:
//!   - `rotation`: per-level challenge selection without immediate repeats
//!   - `gate`: static checks on user markup before it reaches the preview sandbox
//!   - `editor`: run / live re-validation state machine and the edit debouncer
//!   - `progress`: XP, ranks, streaks and the progress store
//!
//! `routes` exposes all of it over HTTP and WebSocket.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod editor;
pub mod error;
pub mod gate;
pub mod logic;
pub mod mentor;
pub mod progress;
pub mod protocol;
pub mod rotation;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod util;
