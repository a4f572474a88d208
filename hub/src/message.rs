use events::Event;

/// Transport-neutral unit exchanged with a subscriber connection.
///
/// The hub only speaks in frames; the web layer maps them onto the real
/// WebSocket message type, which keeps the pumps testable over plain channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A JSON encoded event.
    Text(String),
    Binary(Vec<u8>),
    /// Keepalive probe.
    Ping,
    /// Keepalive acknowledgment, the only frame that refreshes the read deadline.
    Pong,
    Close,
}

impl Frame {
    /// Serializes an event into the wire shape subscribers receive.
    pub fn event(event: &Event) -> Result<Self, serde_json::Error> {
        serde_json::to_string(event).map(Frame::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_event_frame_is_json_text() {
        let frame = Frame::event(&Event::created(json!({"id": 1, "name": "X"}))).unwrap();

        let text = match frame {
            Frame::Text(text) => text,
            other => panic!("expected a text frame, got {other:?}"),
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "create");
        assert_eq!(value["payload"], json!({"id": 1, "name": "X"}));
        assert!(value["timestamp"].is_string());
    }
}
