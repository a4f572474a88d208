use crate::config::HubConfig;
use crate::connection::{read_pump, write_pump, Client, ClientId, Mailbox};
use crate::message::Frame;
use dashmap::DashSet;
use events::{Event, EventKind};
use futures::{Sink, Stream};
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle of a [`Hub`]: `Idle -> Running -> Closed`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HubState {
    Idle,
    Running,
    Closed,
}

impl HubState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            IDLE => HubState::Idle,
            RUNNING => HubState::Running,
            _ => HubState::Closed,
        }
    }
}

impl fmt::Display for HubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubState::Idle => write!(f, "idle"),
            HubState::Running => write!(f, "running"),
            HubState::Closed => write!(f, "closed"),
        }
    }
}

/// The dispatch loop's ends of the hub channels, held until the loop starts.
struct Receivers {
    register: mpsc::UnboundedReceiver<Client>,
    unregister: mpsc::UnboundedReceiver<ClientId>,
    publish: mpsc::Receiver<Arc<Event>>,
}

struct Inner {
    config: HubConfig,
    state: AtomicU8,
    register_tx: mpsc::UnboundedSender<Client>,
    unregister_tx: mpsc::UnboundedSender<ClientId>,
    publish_tx: mpsc::Sender<Arc<Event>>,
    receivers: Mutex<Option<Receivers>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    /// Parent of every client's shutdown token.
    shutdown: CancellationToken,
    /// Read-only shadow of the registry for diagnostics.
    clients_view: Arc<DashSet<ClientId>>,
}

/// Process-wide fan-out of entity change events to live subscribers.
///
/// All registry mutation happens on a single dispatch task fed through
/// channels, so the registry itself is never locked. `Hub` is a cheap handle;
/// clone it freely.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        let config = config.validated();
        let (register_tx, register) = mpsc::unbounded_channel();
        let (unregister_tx, unregister) = mpsc::unbounded_channel();
        let (publish_tx, publish) = mpsc::channel(config.publish_buffer);

        Self {
            inner: Arc::new(Inner {
                config,
                state: AtomicU8::new(IDLE),
                register_tx,
                unregister_tx,
                publish_tx,
                receivers: Mutex::new(Some(Receivers {
                    register,
                    unregister,
                    publish,
                })),
                dispatcher: Mutex::new(None),
                shutdown: CancellationToken::new(),
                clients_view: Arc::new(DashSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn state(&self) -> HubState {
        HubState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state() == HubState::Closed
    }

    /// Number of registered clients, read from the diagnostic shadow view.
    pub fn client_count(&self) -> usize {
        self.inner.clients_view.len()
    }

    pub fn is_registered(&self, id: &ClientId) -> bool {
        self.inner.clients_view.contains(id)
    }

    /// Spawns the dispatch loop. Must be called from within a tokio runtime.
    /// Only the first call on an idle hub has an effect.
    pub fn run(&self) {
        if self
            .inner
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Hub is {}, not starting dispatch loop", self.state());
            return;
        }

        let Some(receivers) = self.take_receivers() else {
            return;
        };

        let handle = tokio::spawn(dispatch(
            receivers,
            self.inner.shutdown.clone(),
            Arc::clone(&self.inner.clients_view),
        ));

        if let Ok(mut dispatcher) = self.inner.dispatcher.lock() {
            *dispatcher = Some(handle);
        }
        info!("Hub dispatch loop started");
    }

    /// Creates a client bound to this hub, not yet registered.
    ///
    /// The client's connection is shut down with the hub.
    pub fn client(&self) -> (Client, Mailbox) {
        Client::new(
            self.inner.config.mailbox_capacity,
            self.inner.shutdown.child_token(),
        )
    }

    /// Hands a client to the dispatch loop. After close the client is
    /// terminated on the spot instead.
    pub fn register(&self, client: Client) {
        if self.is_closed() {
            debug!("Hub closed, rejecting client {}", client.id());
            client.terminate();
            return;
        }

        if let Err(mpsc::error::SendError(client)) = self.inner.register_tx.send(client) {
            debug!("Hub dispatch loop gone, rejecting client {}", client.id());
            client.terminate();
        }
    }

    /// Removes a client and closes its mailbox. Safe to call any number of
    /// times, for clients that were never registered, and after close.
    pub fn unregister(&self, id: &ClientId) {
        if self.is_closed() {
            return;
        }
        // A send error means the loop already stopped and cleared the registry.
        let _ = self.inner.unregister_tx.send(id.clone());
    }

    /// Queues an event for every registered client.
    ///
    /// Never blocks and never fails: when the publish queue is full the event
    /// is dropped, and after close it is discarded.
    pub fn publish(&self, event: Event) {
        if self.is_closed() {
            return;
        }

        match self.inner.publish_tx.try_send(Arc::new(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Hub publish queue full, dropping {} event",
                    event.kind()
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Hub dispatch loop gone, discarding event");
            }
        }
    }

    /// Builds and publishes an event stamped with the current time.
    pub fn publish_change(&self, kind: EventKind, entity: Value) {
        self.publish(Event::new(kind, entity));
    }

    /// Registers a new subscriber connection and starts its two pumps.
    ///
    /// `sink` carries frames to the peer and `stream` yields what the peer
    /// sends. Returns the id of the new client.
    pub fn admit<S, R, E>(&self, sink: S, stream: R) -> ClientId
    where
        S: Sink<Frame> + Send + 'static,
        S::Error: fmt::Display + Send,
        R: Stream<Item = Result<Frame, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let (client, mailbox) = self.client();
        let id = client.id().clone();
        let shutdown = client.shutdown_token();

        self.register(client);

        tokio::spawn(write_pump(self.clone(), sink, mailbox, shutdown.clone()));
        tokio::spawn(read_pump(self.clone(), id.clone(), stream, shutdown));

        id
    }

    /// Moves the hub to `Closed`: every client connection is shut down, the
    /// registry is emptied and the dispatch loop stops. Idempotent.
    pub fn close(&self) {
        if self.inner.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return;
        }
        info!("Closing hub with {} client(s)", self.client_count());

        self.inner.shutdown.cancel();
        // Never started: drop the queued requests, terminating pending clients.
        drop(self.take_receivers());
        self.inner.clients_view.clear();
    }

    /// Closes the hub and waits for the dispatch loop to finish.
    pub async fn shutdown(&self) {
        self.close();

        let handle = self
            .inner
            .dispatcher
            .lock()
            .ok()
            .and_then(|mut dispatcher| dispatcher.take());

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Hub dispatch loop ended abnormally: {e}");
            }
        }
    }

    fn take_receivers(&self) -> Option<Receivers> {
        self.inner
            .receivers
            .lock()
            .ok()
            .and_then(|mut receivers| receivers.take())
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("state", &self.state())
            .field("clients", &self.client_count())
            .finish()
    }
}

enum Command {
    Register(Client),
    Unregister(ClientId),
    Publish(Arc<Event>),
}

/// The only writer of the registry.
async fn dispatch(
    mut receivers: Receivers,
    shutdown: CancellationToken,
    clients_view: Arc<DashSet<ClientId>>,
) {
    let mut clients: HashMap<ClientId, Client> = HashMap::new();

    loop {
        let command = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            Some(client) = receivers.register.recv() => Command::Register(client),
            Some(id) = receivers.unregister.recv() => Command::Unregister(id),
            Some(event) = receivers.publish.recv() => Command::Publish(event),
            else => break,
        };

        match command {
            Command::Register(client) => {
                clients_view.insert(client.id().clone());
                clients.insert(client.id().clone(), client);
                info!("Client registered. Total clients: {}", clients.len());
            }
            Command::Unregister(id) => {
                // Events queued before the unregister still reach the client.
                while let Ok(event) = receivers.publish.try_recv() {
                    broadcast(&mut clients, &clients_view, &event);
                }
                // Dropping the client closes its mailbox.
                if clients.remove(&id).is_some() {
                    clients_view.remove(&id);
                    info!("Client {id} unregistered. Total clients: {}", clients.len());
                }
            }
            Command::Publish(event) => broadcast(&mut clients, &clients_view, &event),
        }
    }

    for (_, client) in clients.drain() {
        client.terminate();
    }
    clients_view.clear();
    info!("Hub dispatch loop stopped");
}

/// Offers the event to every mailbox without waiting. Clients whose mailbox
/// is full (or already gone) are evicted on the spot.
fn broadcast(
    clients: &mut HashMap<ClientId, Client>,
    clients_view: &DashSet<ClientId>,
    event: &Arc<Event>,
) {
    let mut evicted = Vec::new();

    for (id, client) in clients.iter() {
        match client.try_deliver(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Client {id} is not keeping up, evicting it");
                evicted.push(id.clone());
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Client {id} stopped reading its mailbox, removing it");
                evicted.push(id.clone());
            }
        }
    }

    for id in evicted {
        clients.remove(&id);
        clients_view.remove(&id);
    }
}
