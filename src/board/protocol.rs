//! Wire protocol for the whiteboard line format.
//!
//! The protocol is newline-delimited UTF-8 text, one command per line, fields
//! separated by runs of whitespace. Command keywords are case-insensitive;
//! arguments (usernames, board names) are case-sensitive. Blank lines are
//! ignored.
//!
//! Client to server:
//!
//! ```text
//! HELLO <username>
//! QUIT
//! JOIN <boardname>
//! CREATE <boardname>
//! DRAW <seq> <color> <width> (x1 y1 x2 y2)+
//! ```
//!
//! Server to client: see [`ServerMessage`]. Color is a signed 32-bit ARGB
//! integer in decimal, width a decimal float, coordinates integers in raster
//! pixel space.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A straight stroke between two points, in raster pixel coordinates.
///
/// Segments always travel in ordered groups that share one color and one
/// stroke width; the group is applied and broadcast as a single draw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        LineSegment { x1, y1, x2, y2 }
    }
}

/// A recoverable, client-caused failure.
///
/// Carried up to the session loop and rendered as an `ERROR <message>` line;
/// the connection stays open and no server-side state is corrupted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        ClientError {
            message: message.into(),
        }
    }
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Hello {
        username: String,
    },
    Quit,
    Join {
        board: String,
    },
    Create {
        board: String,
    },
    Draw {
        seq: u64,
        color: i32,
        width: f32,
        segments: Vec<LineSegment>,
    },
    /// Keyword the grammar does not know. Kept as data rather than an error:
    /// the reply is `ERROR <keyword> not recognised.` but the session treats
    /// it as an ordinary response, not a raised failure.
    Unknown {
        keyword: String,
    },
}

fn parse_number<T: FromStr>(token: &str) -> Result<T, ClientError> {
    token
        .parse::<T>()
        .map_err(|_| ClientError::new(format!("Malformed number '{}'.", token)))
}

impl ClientCommand {
    /// Parse one protocol line. Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<ClientCommand>, ClientError> {
        let mut fields = line.split_whitespace();
        let keyword = match fields.next() {
            Some(k) => k,
            None => return Ok(None),
        };
        let args: Vec<&str> = fields.collect();

        let command = match keyword.to_ascii_lowercase().as_str() {
            "hello" => {
                let username = args
                    .first()
                    .ok_or_else(|| ClientError::new("Must provide a username to HELLO."))?;
                ClientCommand::Hello {
                    username: username.to_string(),
                }
            }
            "quit" => ClientCommand::Quit,
            "join" => {
                let board = args
                    .first()
                    .ok_or_else(|| ClientError::new("Must provide whiteboard to join."))?;
                ClientCommand::Join {
                    board: board.to_string(),
                }
            }
            "create" => {
                let board = args
                    .first()
                    .ok_or_else(|| ClientError::new("Must specify a whiteboard name."))?;
                ClientCommand::Create {
                    board: board.to_string(),
                }
            }
            "draw" => Self::parse_draw(&args)?,
            _ => ClientCommand::Unknown {
                keyword: keyword.to_string(),
            },
        };
        Ok(Some(command))
    }

    fn parse_draw(args: &[&str]) -> Result<ClientCommand, ClientError> {
        if args.len() < 3 {
            return Err(ClientError::new(
                "Must specify a sequence number, colour and stroke size.",
            ));
        }
        let coords = &args[3..];
        if coords.is_empty() || coords.len() % 4 != 0 {
            return Err(ClientError::new(
                "Must specify a set of start/end coordinate pairs",
            ));
        }
        let seq: u64 = parse_number(args[0])?;
        let color: i32 = parse_number(args[1])?;
        let width: f32 = parse_number(args[2])?;
        let mut segments = Vec::with_capacity(coords.len() / 4);
        for quad in coords.chunks_exact(4) {
            segments.push(LineSegment::new(
                parse_number(quad[0])?,
                parse_number(quad[1])?,
                parse_number(quad[2])?,
                parse_number(quad[3])?,
            ));
        }
        Ok(ClientCommand::Draw {
            seq,
            color,
            width,
            segments,
        })
    }
}

/// A server-to-client message, rendered to one protocol line via `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Reply to HELLO: all known board names, alphabetically sorted.
    Hello { boards: Vec<String> },
    /// Reply to JOIN/CREATE: board identity, raster snapshot, and the members
    /// present before the join took effect (the receiver is not listed).
    Whiteboard {
        name: String,
        snapshot: String,
        users: Vec<String>,
    },
    /// Broadcast to a board's existing members when someone attaches.
    Join { username: String },
    /// Broadcast to a board's remaining members when someone detaches.
    Part { username: String },
    /// Broadcast to every registered session when a board is created.
    Created { name: String },
    /// Broadcast to a board's other members when anyone draws.
    Draw {
        color: i32,
        width: f32,
        segments: Vec<LineSegment>,
    },
    /// Unicast to the drawing session once its draw is applied and broadcast.
    Ack { seq: u64 },
    /// Unicast to the offending session; the connection stays open.
    Error { message: String },
    /// Reply to QUIT, after which the connection closes.
    Goodbye,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Hello { boards } => {
                write!(f, "HELLO")?;
                for name in boards {
                    write!(f, " {}", name)?;
                }
                Ok(())
            }
            ServerMessage::Whiteboard {
                name,
                snapshot,
                users,
            } => {
                write!(f, "WHITEBOARD {} {}", name, snapshot)?;
                for user in users {
                    write!(f, " {}", user)?;
                }
                Ok(())
            }
            ServerMessage::Join { username } => write!(f, "JOIN {}", username),
            ServerMessage::Part { username } => write!(f, "PART {}", username),
            ServerMessage::Created { name } => write!(f, "CREATED {}", name),
            ServerMessage::Draw {
                color,
                width,
                segments,
            } => {
                // {:?} keeps a trailing ".0" on whole floats, so a width of
                // 2 round-trips as "2.0" exactly as clients sent it.
                write!(f, "DRAW {} {:?}", color, width)?;
                for seg in segments {
                    write!(f, " {} {} {} {}", seg.x1, seg.y1, seg.x2, seg.y2)?;
                }
                Ok(())
            }
            ServerMessage::Ack { seq } => write!(f, "ACK {}", seq),
            ServerMessage::Error { message } => write!(f, "ERROR {}", message),
            ServerMessage::Goodbye => write!(f, "GOODBYE"),
        }
    }
}
