//! # Wireboard - Collaborative Whiteboard Server
//!
//! Wireboard is a multi-client collaborative drawing session server. Clients
//! connect over TCP, attach to named whiteboards, draw line strokes, and see
//! each other's strokes in near-real time through server broadcasts.
//!
//! ## Features
//!
//! - **Line Protocol**: Newline-delimited UTF-8 commands (`HELLO`, `JOIN`,
//!   `CREATE`, `DRAW`, `QUIT`), easy to drive from any client or from netcat.
//! - **Shared Canvases**: Each board owns a fixed-size ARGB raster; new
//!   members receive a base64 snapshot and incremental strokes after that.
//! - **Uniqueness Guarantees**: Usernames and board names are globally
//!   unique for the life of the process.
//! - **Async Design**: Built with Tokio; one task per connection plus a
//!   dedicated writer task per session, so broadcasts never block on a slow
//!   receiver.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wireboard::board::WhiteboardServer;
//! use wireboard::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = WhiteboardServer::bind(&config).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`board`] - Core server functionality: protocol, sessions, boards, registry
//! - [`config`] - Configuration loading and defaults
//! - [`logutil`] - Log sanitization for client-supplied strings

pub mod board;
pub mod config;
pub mod logutil;
