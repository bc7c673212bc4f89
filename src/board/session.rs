//! Per-connection session handling.
//!
//! Each accepted connection gets one [`Session`] driven by its own Tokio
//! task. The task owns the read side of the socket and blocks on it between
//! commands; the write side is owned by a companion writer task fed through
//! an unbounded channel. Anything that wants to push a line to this client
//! (a broadcast from another session's task, the registry's `CREATED`
//! fan-out, or this session's own replies) enqueues on that channel, which
//! gives every session a single serialized output path with no interleaved
//! partial writes.
//!
//! A slow reader therefore never stalls a broadcasting sender; its backlog
//! accumulates in the queue instead. That trade (memory growth on a
//! pathological receiver rather than sender back-pressure) is deliberate.
//!
//! ## State machine
//!
//! ```text
//! UNREGISTERED --HELLO--> REGISTERED --JOIN/CREATE--> ON_BOARD
//!      any state --QUIT or EOF or I/O error--> CLOSED
//! ```
//!
//! Per-command failures become `ERROR <message>` replies and leave the
//! connection open; they never corrupt registry or board state.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::protocol::{ClientCommand, ClientError, LineSegment, ServerMessage};
use super::registry::Registry;
use super::whiteboard::Whiteboard;
use crate::logutil::escape_log;

/// A cloneable sending handle for one session's outbound queue.
///
/// This is what the registry and whiteboards hold: the username plus the
/// channel into the session's writer task. Sending never blocks; if the
/// session is already gone the line is silently dropped and the membership
/// cleanup catches up shortly after.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    username: String,
    tx: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn new(username: impl Into<String>, tx: mpsc::UnboundedSender<String>) -> Self {
        SessionHandle {
            username: username.into(),
            tx,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Enqueue one protocol line (without trailing newline) for this session.
    pub fn send(&self, line: String) {
        if self.tx.send(line).is_err() {
            debug!("dropping message for departed session '{}'", escape_log(&self.username));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unregistered,
    Registered,
    OnBoard,
    Closed,
}

/// Server-side state for one connected client.
pub struct Session {
    peer: SocketAddr,
    registry: Arc<Registry>,
    tx: mpsc::UnboundedSender<String>,
    username: Option<String>,
    board: Option<Arc<Whiteboard>>,
    state: SessionState,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(peer: SocketAddr, registry: Arc<Registry>, tx: mpsc::UnboundedSender<String>) -> Self {
        let now = Utc::now();
        Session {
            peer,
            registry,
            tx,
            username: None,
            board: None,
            state: SessionState::Unregistered,
            connected_at: now,
            last_activity: now,
        }
    }

    /// Drive one connection to completion: read lines until QUIT, EOF or an
    /// I/O error, then clean up registry and board membership.
    pub async fn run(stream: TcpStream, peer: SocketAddr, registry: Arc<Registry>) {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_outbound(write_half, rx));

        let mut session = Session::new(peer, registry, tx);
        debug!("{}: connected", peer);

        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    session.process_line(&line);
                    if session.state == SessionState::Closed {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("{}: read error: {}", peer, e);
                    break;
                }
            }
        }

        // Dropping the session releases the last senders into the writer
        // queue, so the writer drains any pending GOODBYE/ERROR lines and
        // closes the socket.
        session.finish();
        let _ = writer.await;
    }

    /// Parse and execute one line. Recoverable failures become `ERROR`
    /// replies here and go no further.
    fn process_line(&mut self, line: &str) {
        self.last_activity = Utc::now();
        let outcome = match ClientCommand::parse(line) {
            Ok(None) => return,
            Ok(Some(command)) => self.handle_command(command),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(Some(reply)) => self.send(reply),
            Ok(None) => {}
            Err(err) => self.send(ServerMessage::Error {
                message: err.to_string(),
            }),
        }
    }

    fn handle_command(
        &mut self,
        command: ClientCommand,
    ) -> Result<Option<ServerMessage>, ClientError> {
        match command {
            ClientCommand::Hello { username } => self.handle_hello(username),
            ClientCommand::Quit => self.handle_quit(),
            ClientCommand::Join { board } => self.handle_join(&board),
            ClientCommand::Create { board } => self.handle_create(&board),
            ClientCommand::Draw {
                seq,
                color,
                width,
                segments,
            } => self.handle_draw(seq, color, width, &segments),
            ClientCommand::Unknown { keyword } => Ok(Some(ServerMessage::Error {
                message: format!("{} not recognised.", keyword),
            })),
        }
    }

    fn handle_hello(&mut self, username: String) -> Result<Option<ServerMessage>, ClientError> {
        if self.username.is_some() {
            return Err(ClientError::new("Already said hello."));
        }
        // Registration and the board listing happen under one registry lock,
        // so a concurrent CREATE shows up either in this reply or as a
        // CREATED notice, not both.
        let boards = self
            .registry
            .add_session(SessionHandle::new(&username, self.tx.clone()))?;
        info!("{}: registered as '{}'", self.peer, escape_log(&username));
        self.username = Some(username);
        self.state = SessionState::Registered;
        Ok(Some(ServerMessage::Hello { boards }))
    }

    fn handle_quit(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        self.state = SessionState::Closed;
        Ok(Some(ServerMessage::Goodbye))
    }

    fn handle_join(&mut self, name: &str) -> Result<Option<ServerMessage>, ClientError> {
        let username = self.require_registered()?;
        let board = self
            .registry
            .get_whiteboard(name)
            .ok_or_else(|| ClientError::new("No such whiteboard."))?;
        let reply = self.attach(board, username);
        Ok(Some(reply))
    }

    fn handle_create(&mut self, name: &str) -> Result<Option<ServerMessage>, ClientError> {
        let username = self.require_registered()?;
        let board = self.registry.create_whiteboard(name)?;
        let reply = self.attach(board, username);
        Ok(Some(reply))
    }

    fn handle_draw(
        &mut self,
        seq: u64,
        color: i32,
        width: f32,
        segments: &[LineSegment],
    ) -> Result<Option<ServerMessage>, ClientError> {
        let username = self.require_registered()?;
        let board = self
            .board
            .as_ref()
            .ok_or_else(|| ClientError::new("Not on any whiteboard."))?;
        board.draw(color, width, segments, &username);
        Ok(Some(ServerMessage::Ack { seq }))
    }

    /// Leave any current board, then join `board` and build the `WHITEBOARD`
    /// reply from the snapshot and pre-join membership.
    fn attach(&mut self, board: Arc<Whiteboard>, username: String) -> ServerMessage {
        self.leave_board();
        let (snapshot, users) = board.add_user(SessionHandle::new(&username, self.tx.clone()));
        let reply = ServerMessage::Whiteboard {
            name: board.name().to_string(),
            snapshot,
            users,
        };
        self.board = Some(board);
        self.state = SessionState::OnBoard;
        reply
    }

    fn leave_board(&mut self) {
        if let Some(board) = self.board.take() {
            if let Some(username) = self.username.as_deref() {
                board.remove_user(username);
            }
            if self.state == SessionState::OnBoard {
                self.state = SessionState::Registered;
            }
        }
    }

    fn require_registered(&self) -> Result<String, ClientError> {
        self.username
            .clone()
            .ok_or_else(|| ClientError::new("Must register before using command."))
    }

    fn send(&self, message: ServerMessage) {
        if self.tx.send(message.to_string()).is_err() {
            debug!("{}: outbound queue closed", self.peer);
        }
    }

    /// Tear down: leave the board (with its PART broadcast) and release the
    /// username. Called for QUIT and for abrupt disconnects alike; only QUIT
    /// will have queued a GOODBYE beforehand.
    fn finish(mut self) {
        self.leave_board();
        if let Some(username) = self.username.take() {
            self.registry.remove_session(&username);
            let seconds = (self.last_activity - self.connected_at).num_seconds();
            info!(
                "{}: '{}' disconnected after {}s",
                self.peer,
                escape_log(&username),
                seconds
            );
        } else {
            debug!("{}: disconnected before registering", self.peer);
        }
    }
}

/// Writer half of a session: drains the outbound queue to the socket, one
/// newline-terminated line per message, and shuts the stream down when every
/// sender is gone.
async fn write_outbound(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if write_half.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
