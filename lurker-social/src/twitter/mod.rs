//! Twitter/X guest-session pipeline.
//!
//! [`auth`] scrapes the public web client for its application bearer and
//! exchanges it for a guest token, [`client`] lists a user's recent posts with
//! those credentials, and [`extract`] normalizes whatever JSON came back.
pub mod auth;
pub mod client;
pub mod extract;
pub mod types;

pub use auth::{GuestSession, GuestToken, GuestTokenProvider, GuestTokenSource, SessionState};
pub use client::TimelineApi;
