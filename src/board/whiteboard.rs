//! A named shared canvas plus the set of sessions attached to it.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::debug;

use super::protocol::{LineSegment, ServerMessage};
use super::raster::Raster;
use super::session::SessionHandle;
use crate::logutil::escape_log;

/// One whiteboard: an immutable name and lock-guarded mutable state.
///
/// All raster and membership mutation happens under the single board mutex,
/// which makes each method an atomic unit. Members are keyed by username in a
/// `BTreeMap`, so iteration (and therefore broadcast and listing order) is
/// username sort order. Boards are never destroyed once created.
///
/// Lock discipline: a board lock is only ever taken after the registry lock
/// in call chains that hold both, and outbound sends from under the lock are
/// non-blocking channel pushes, so no board lock is held across I/O.
#[derive(Debug)]
pub struct Whiteboard {
    name: String,
    state: Mutex<BoardState>,
}

#[derive(Debug)]
struct BoardState {
    raster: Raster,
    members: BTreeMap<String, SessionHandle>,
}

impl Whiteboard {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Whiteboard {
            name: name.into(),
            state: Mutex::new(BoardState {
                raster: Raster::new(width, height),
                members: BTreeMap::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply a draw event: composite every segment onto the raster, then
    /// broadcast the `DRAW` line to all members except the sender. The sender
    /// relies on local echo and gets an `ACK` from its session instead.
    pub fn draw(&self, color: i32, stroke_width: f32, segments: &[LineSegment], sender: &str) {
        let mut state = self.state.lock().expect("board lock poisoned");
        for segment in segments {
            state.raster.draw_segment(color, stroke_width, segment);
        }
        let message = ServerMessage::Draw {
            color,
            width: stroke_width,
            segments: segments.to_vec(),
        }
        .to_string();
        for (username, member) in &state.members {
            if username != sender {
                member.send(message.clone());
            }
        }
        debug!(
            "board {}: {} drew {} segment(s)",
            escape_log(&self.name),
            escape_log(sender),
            segments.len()
        );
    }

    /// Attach a session. The `JOIN` notice goes to the members present before
    /// the insert, so the joining session never sees its own join. Returns
    /// the raster snapshot and those pre-join member names, both taken under
    /// the same lock acquisition, for the `WHITEBOARD` reply.
    pub fn add_user(&self, handle: SessionHandle) -> (String, Vec<String>) {
        let mut state = self.state.lock().expect("board lock poisoned");
        let existing: Vec<String> = state.members.keys().cloned().collect();
        let notice = ServerMessage::Join {
            username: handle.username().to_string(),
        }
        .to_string();
        for member in state.members.values() {
            member.send(notice.clone());
        }
        let snapshot = state.raster.to_base64();
        state.members.insert(handle.username().to_string(), handle);
        (snapshot, existing)
    }

    /// Detach a session and tell the remaining members. A no-op if the
    /// username was not a member (e.g. a disconnect racing a QUIT).
    pub fn remove_user(&self, username: &str) {
        let mut state = self.state.lock().expect("board lock poisoned");
        if state.members.remove(username).is_none() {
            return;
        }
        let notice = ServerMessage::Part {
            username: username.to_string(),
        }
        .to_string();
        for member in state.members.values() {
            member.send(notice.clone());
        }
    }

    /// Base64 snapshot of the current raster, taken atomically.
    pub fn snapshot_base64(&self) -> String {
        self.state.lock().expect("board lock poisoned").raster.to_base64()
    }

    /// Current member usernames in sort order.
    pub fn member_names(&self) -> Vec<String> {
        let state = self.state.lock().expect("board lock poisoned");
        state.members.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member(name: &str) -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionHandle::new(name, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(line);
        }
        out
    }

    #[test]
    fn join_notice_goes_to_existing_members_only() {
        let board = Whiteboard::new("b", 8, 8);
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");

        board.add_user(alice);
        assert_eq!(drain(&mut alice_rx), Vec::<String>::new());

        let (_, users) = board.add_user(bob);
        assert_eq!(users, vec!["alice".to_string()]);
        assert_eq!(drain(&mut alice_rx), vec!["JOIN bob".to_string()]);
        assert_eq!(drain(&mut bob_rx), Vec::<String>::new());
    }

    #[test]
    fn part_notice_goes_to_remaining_members_only() {
        let board = Whiteboard::new("b", 8, 8);
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        board.add_user(alice);
        board.add_user(bob);
        drain(&mut alice_rx);

        board.remove_user("bob");
        assert_eq!(drain(&mut alice_rx), vec!["PART bob".to_string()]);
        assert_eq!(drain(&mut bob_rx), Vec::<String>::new());
        assert_eq!(board.member_names(), vec!["alice".to_string()]);
    }

    #[test]
    fn add_then_remove_restores_membership() {
        let board = Whiteboard::new("b", 8, 8);
        let (alice, _alice_rx) = member("alice");
        board.add_user(alice);
        let before = board.member_names();

        let (carol, _carol_rx) = member("carol");
        board.add_user(carol);
        board.remove_user("carol");
        assert_eq!(board.member_names(), before);
    }

    #[test]
    fn removing_a_non_member_broadcasts_nothing() {
        let board = Whiteboard::new("b", 8, 8);
        let (alice, mut alice_rx) = member("alice");
        board.add_user(alice);

        board.remove_user("ghost");
        assert_eq!(drain(&mut alice_rx), Vec::<String>::new());
    }

    #[test]
    fn draw_broadcasts_to_everyone_but_the_sender() {
        let board = Whiteboard::new("b", 16, 16);
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        board.add_user(alice);
        board.add_user(bob);
        drain(&mut alice_rx);

        let blank = board.snapshot_base64();
        board.draw(-65536, 2.0, &[LineSegment::new(0, 0, 10, 10)], "alice");

        assert_eq!(drain(&mut alice_rx), Vec::<String>::new());
        assert_eq!(drain(&mut bob_rx), vec!["DRAW -65536 2.0 0 0 10 10".to_string()]);
        assert_ne!(board.snapshot_base64(), blank, "raster must change");
    }

    #[test]
    fn extreme_draw_coordinates_leave_the_board_usable() {
        let board = Whiteboard::new("b", 16, 12);
        let (alice, _alice_rx) = member("alice");
        board.add_user(alice);
        let blank = board.snapshot_base64();

        board.draw(-65536, 2.0, &[LineSegment::new(0, 0, i32::MAX, 0)], "alice");
        assert_ne!(board.snapshot_base64(), blank);
        assert_eq!(board.member_names(), vec!["alice".to_string()]);
    }

    #[test]
    fn member_names_are_sorted() {
        let board = Whiteboard::new("b", 8, 8);
        for name in ["zoe", "alice", "mallory"] {
            let (h, _rx) = member(name);
            board.add_user(h);
        }
        assert_eq!(
            board.member_names(),
            vec!["alice".to_string(), "mallory".to_string(), "zoe".to_string()]
        );
    }
}
