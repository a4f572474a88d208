use crate::message::Frame;
use crate::Hub;
use events::Event;
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::*;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Unique identifier for a subscriber connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The registry's side of one subscriber: the producing end of its mailbox
/// plus the token that tears its connection down.
///
/// Dropping a `Client` closes its mailbox, which tells the write pump to
/// drain what is left, close the connection and exit.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    mailbox: mpsc::Sender<Arc<Event>>,
    shutdown: CancellationToken,
}

impl Client {
    pub(crate) fn new(capacity: usize, shutdown: CancellationToken) -> (Self, Mailbox) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = ClientId::new();

        (
            Self {
                id: id.clone(),
                mailbox: tx,
                shutdown,
            },
            Mailbox { id, receiver: rx },
        )
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Never waits: a full mailbox is reported back to the dispatch loop.
    pub(crate) fn try_deliver(&self, event: &Arc<Event>) -> Result<(), TrySendError<Arc<Event>>> {
        self.mailbox.try_send(Arc::clone(event))
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Forcibly ends the client: its connection is closed without draining.
    pub(crate) fn terminate(self) {
        self.shutdown.cancel();
    }
}

/// The consuming end of a client's bounded event queue.
#[derive(Debug)]
pub struct Mailbox {
    id: ClientId,
    receiver: mpsc::Receiver<Arc<Event>>,
}

impl Mailbox {
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Next queued event, or `None` once the hub has closed the mailbox and
    /// everything buffered before that has been taken.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Arc<Event>, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Sole writer of a connection.
///
/// Forwards mailbox events as text frames and pings the peer every
/// `ping_period`. Exits when the mailbox is closed (after an orderly close),
/// when the client is shut down, or on the first failed or timed out write.
pub(crate) async fn write_pump<S>(
    hub: Hub,
    sink: S,
    mut mailbox: Mailbox,
    shutdown: CancellationToken,
) where
    S: Sink<Frame>,
    S::Error: fmt::Display,
{
    let id = mailbox.id().clone();
    let config = hub.config().clone();
    let mut sink = Box::pin(sink);
    let mut ticker = time::interval_at(Instant::now() + config.ping_period, config.ping_period);
    let mut connection_usable = true;

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Client {id} shut down, closing connection");
                break;
            }
            item = mailbox.recv() => match item {
                Some(event) => match Frame::event(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Failed to serialize {} event for client {id}: {e}", event.kind());
                        continue;
                    }
                },
                None => {
                    debug!("Mailbox for client {id} closed by hub");
                    break;
                }
            },
            _ = ticker.tick() => Frame::Ping,
        };

        match time::timeout(config.write_wait, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write to client {id} failed: {e}");
                connection_usable = false;
                break;
            }
            Err(_) => {
                debug!("Write to client {id} timed out after {:?}", config.write_wait);
                connection_usable = false;
                break;
            }
        }
    }

    if connection_usable {
        if let Ok(Err(e)) = time::timeout(config.write_wait, sink.send(Frame::Close)).await {
            debug!("Close handshake with client {id} failed: {e}");
        }
    }
    let _ = time::timeout(config.write_wait, sink.close()).await;

    shutdown.cancel();
    hub.unregister(&id);
}

/// Sole reader of a connection.
///
/// Only watches liveness: the read deadline moves forward on every pong, and
/// any error, timeout, close frame or end of stream unregisters the client.
/// Other inbound frames are ignored.
pub(crate) async fn read_pump<R, E>(hub: Hub, id: ClientId, stream: R, shutdown: CancellationToken)
where
    R: Stream<Item = Result<Frame, E>>,
    E: fmt::Display,
{
    let pong_wait = hub.config().pong_wait;
    let mut stream = Box::pin(stream);
    let deadline = time::sleep(pong_wait);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut deadline => {
                debug!("Client {id} missed its keepalive window of {pong_wait:?}");
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Frame::Pong)) => deadline.as_mut().reset(Instant::now() + pong_wait),
                Some(Ok(Frame::Close)) | None => {
                    debug!("Client {id} closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read from client {id} failed: {e}");
                    break;
                }
            },
        }
    }

    hub.unregister(&id);
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HubConfig;
    use futures::channel::mpsc as transport;
    use serde_json::json;
    use std::time::Duration;

    type Inbound = transport::UnboundedSender<Result<Frame, String>>;
    type Outbound = transport::Receiver<Frame>;

    fn test_config() -> HubConfig {
        HubConfig {
            ping_period: Duration::from_secs(5),
            pong_wait: Duration::from_secs(10),
            write_wait: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Admits a client over in-memory channels, returning the peer's ends.
    fn connect(hub: &Hub) -> (ClientId, Inbound, Outbound) {
        let (out_tx, out_rx) = transport::channel(64);
        let (in_tx, in_rx) = transport::unbounded();
        let id = hub.admit(out_tx, in_rx);
        (id, in_tx, out_rx)
    }

    async fn wait_for_clients(hub: &Hub, expected: usize) {
        time::timeout(Duration::from_secs(5), async {
            while hub.client_count() != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("client count never reached the expected value");
    }

    async fn next_text(outbound: &mut Outbound) -> serde_json::Value {
        loop {
            match outbound.next().await {
                Some(Frame::Text(text)) => return serde_json::from_str(&text).unwrap(),
                Some(Frame::Ping) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_client_ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[tokio::test]
    async fn test_write_pump_forwards_events_in_publish_order() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, _inbound, mut outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        for n in 0..5 {
            hub.publish(Event::updated(json!({ "id": n })));
        }

        for n in 0..5 {
            let value = next_text(&mut outbound).await;
            assert_eq!(value["type"], "update");
            assert_eq!(value["payload"]["id"], n);
        }

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_unregister_drains_mailbox_then_closes_once() {
        let hub = Hub::new(test_config());
        hub.run();
        let (id, _inbound, mut outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        hub.publish(Event::created(json!({"id": 1})));
        hub.unregister(&id);
        wait_for_clients(&hub, 0).await;

        let mut frames = Vec::new();
        while let Some(frame) = outbound.next().await {
            frames.push(frame);
        }
        let closes = frames.iter().filter(|f| **f == Frame::Close).count();
        assert_eq!(closes, 1);
        assert_eq!(frames.last(), Some(&Frame::Close));
        assert!(frames.iter().any(|f| matches!(f, Frame::Text(_))));

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_slow_peer_is_evicted_and_its_connection_closed() {
        let hub = Hub::new(HubConfig {
            mailbox_capacity: 4,
            ..test_config()
        });
        hub.run();
        // A zero-buffer transport stalls the write pump until the peer reads.
        let (out_tx, mut outbound) = transport::channel(0);
        let (_inbound, in_rx) = transport::unbounded::<Result<Frame, String>>();
        let id = hub.admit(out_tx, in_rx);
        wait_for_clients(&hub, 1).await;

        // The pump holds at most two events while stalled, so ten overflow
        // a mailbox of four.
        for n in 0..10 {
            hub.publish(Event::created(json!({ "id": n })));
        }
        wait_for_clients(&hub, 0).await;
        assert!(!hub.is_registered(&id));

        hub.publish(Event::created(json!({"id": 99})));

        let mut frames = Vec::new();
        while let Some(frame) = outbound.next().await {
            frames.push(frame);
        }
        let texts = frames
            .iter()
            .filter(|f| matches!(f, Frame::Text(_)))
            .count();
        assert!(texts < 10);
        assert_eq!(frames.last(), Some(&Frame::Close));
        assert!(!frames
            .iter()
            .any(|f| matches!(f, Frame::Text(text) if text.contains("\"id\":99"))));

        hub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_pings_on_keepalive_interval() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, inbound, mut outbound) = connect(&hub);

        assert_eq!(outbound.next().await, Some(Frame::Ping));
        inbound.unbounded_send(Ok(Frame::Pong)).unwrap();
        assert_eq!(outbound.next().await, Some(Frame::Ping));

        hub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pongs_keep_a_client_registered() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, inbound, mut outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        // Answer three pings; together they span well past a single pong wait.
        for _ in 0..3 {
            assert_eq!(outbound.next().await, Some(Frame::Ping));
            inbound.unbounded_send(Ok(Frame::Pong)).unwrap();
        }

        assert_eq!(hub.client_count(), 1);
        hub.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pong_unregisters_and_closes() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, _inbound, mut outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        time::sleep(Duration::from_secs(11)).await;
        wait_for_clients(&hub, 0).await;

        let mut frames = Vec::new();
        while let Some(frame) = outbound.next().await {
            frames.push(frame);
        }
        assert_eq!(frames.last(), Some(&Frame::Close));

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_remote_close_unregisters_client() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, inbound, _outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        inbound.unbounded_send(Ok(Frame::Close)).unwrap();

        wait_for_clients(&hub, 0).await;
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_error_unregisters_client() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, inbound, _outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        inbound
            .unbounded_send(Err("connection reset".to_string()))
            .unwrap();

        wait_for_clients(&hub, 0).await;
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_inbound_data_frames_are_ignored() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, inbound, _outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        inbound
            .unbounded_send(Ok(Frame::Text("hello".to_string())))
            .unwrap();
        inbound.unbounded_send(Ok(Frame::Ping)).unwrap();
        tokio::task::yield_now().await;

        assert_eq!(hub.client_count(), 1);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_write_failure_unregisters_client() {
        let hub = Hub::new(test_config());
        hub.run();
        let (_id, _inbound, outbound) = connect(&hub);
        wait_for_clients(&hub, 1).await;

        // The peer is gone; the next write fails.
        drop(outbound);
        hub.publish(Event::created(json!({"id": 1})));

        wait_for_clients(&hub, 0).await;
        hub.shutdown().await;
    }
}
