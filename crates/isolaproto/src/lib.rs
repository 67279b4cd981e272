//! `isolaproto`: the wire contract between the isola backend and its clients.
//!
//! The push side is deliberately payload-free: whenever authoritative state
//! mutates, every connected client receives [`UPDATE_SIGNAL`] and re-fetches
//! its own record. No diffs, no payload versioning; a burst of signals just
//! causes redundant (idempotent) re-fetches.
//!
//! The command grammar lives in [`command`]: operator input is tokenized and
//! rejected before dispatch, so malformed commands never reach a handler.

pub mod command;

/// The invalidation signal. Opaque to clients; its only meaning is
/// "your cached state may be stale; re-fetch".
pub const UPDATE_SIGNAL: &[u8] = b"update";
