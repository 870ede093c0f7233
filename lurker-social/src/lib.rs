//! Social platform clients, extractors, and the post cache used by Lurker.
//!
//! Only the Twitter/X pipeline is implemented: anonymous guest sessions
//! ([`twitter::auth`]), the timeline listing client ([`twitter::client`]), and
//! the shape-agnostic JSON helpers ([`twitter::extract`]) that feed fetched
//! posts into the deduplicating [`cache::ResponseCache`].
pub mod cache;
pub mod error;
pub mod twitter;

pub use cache::ResponseCache;
pub use error::{Result, ScrapeStage, SocialError};
