//! Core whiteboard server functionality.
//!
//! ## Components
//!
//! - [`protocol`] - the line-oriented wire grammar and message formatting
//! - [`session`] - per-connection protocol state machine and socket I/O
//! - [`whiteboard`] - a named canvas plus its member sessions and broadcasts
//! - [`registry`] - the process-wide board-name and username directory
//! - [`raster`] - the pixel buffer boards draw into
//! - [`server`] - the TCP accept loop
//!
//! ## Control flow
//!
//! ```text
//! WhiteboardServer ── accept ──> Session (one task per connection)
//!        Session ── commands ──> Registry ── vends ──> Whiteboard
//!        Whiteboard ── broadcasts ──> member sessions' outbound queues
//! ```
//!
//! Shared state is split into three lock domains: the registry mutex (both
//! namespaces), one mutex per whiteboard (raster + membership), and one
//! outbound queue per session. The registry lock is always taken before a
//! board lock, and no lock is ever held across socket I/O because outbound
//! delivery is a channel push.

pub mod protocol;
pub mod raster;
pub mod registry;
pub mod server;
pub mod session;
pub mod whiteboard;

pub use protocol::{ClientCommand, ClientError, LineSegment, ServerMessage};
pub use registry::Registry;
pub use server::WhiteboardServer;
pub use session::{Session, SessionHandle, SessionState};
pub use whiteboard::Whiteboard;
