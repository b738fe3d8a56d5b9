use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::ws::ReceiveMessage;

const ROOM_CAPACITY: usize = 64;

/// Explicitly owned map from room token to that room's broadcast group.
/// Lives in `AppState`; every realtime session joins and publishes through
/// it instead of any ambient server-wide channel.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, broadcast::Sender<ReceiveMessage>>>>,
}

impl RoomRegistry {
    /// Subscribe the calling session to a room, creating the broadcast group
    /// on first join.
    pub fn join(&self, room_id: &str) -> broadcast::Receiver<ReceiveMessage> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room_id.to_owned())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Fan a message out to everyone currently subscribed. Returns the
    /// subscriber count at broadcast time; rooms nobody listens to anymore
    /// are dropped on the way.
    pub fn publish(&self, room_id: &str, message: ReceiveMessage) -> usize {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(tx) = rooms.get(room_id) else {
            return 0;
        };

        match tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                rooms.remove(room_id);
                0
            }
        }
    }
}
