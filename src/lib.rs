//! # driveport – Google Drive port bridge
//!
//! Bridges a sandboxed, message-port-only application frontend to Google
//! Drive: establishes a delegated OAuth session, lets the user pick or
//! save a file in Drive, and relays outcomes back to the embedding peer
//! as plain data messages.
//!
//! ## Features
//!
//! - **Token lifecycle** – silent vs. consent issuance, single live
//!   session, server-side revocation
//! - **SDK readiness gates** – awaitable per-SDK load signals; operations
//!   never race an unloaded SDK
//! - **File picking** – JSON-filtered docs view, first-document selection,
//!   media content fetch
//! - **Uploads** – dated `routes_<date>.json` naming, two-part multipart
//!   body, `supportsAllDrives` upload endpoint
//! - **Port relay** – typed command/result messages over channels,
//!   case-insensitive dispatch, uniform failure reporting

pub mod types;
pub mod client;
pub mod sdk;
pub mod auth;
pub mod picker;
pub mod uploads;
pub mod relay;
pub mod service;
