//! Real-time event broadcast hub.
//!
//! Pushes create/update/delete notifications to every live WebSocket
//! subscriber.
//!
//! # Architecture
//!
//! - **Single dispatch loop**: register, unregister and publish requests
//!   arrive on channels and are applied by one task, the only writer of the
//!   client registry. Diagnostics read a separate `DashSet` shadow view.
//! - **Two pumps per connection**: the write pump is the only writer of a
//!   connection and drains the client's bounded mailbox, pinging the peer on
//!   an interval. The read pump is the only reader and exists to notice when
//!   the peer goes away (missed pong, error, close).
//! - **Drop on full**: a full publish queue drops the event, a full mailbox
//!   evicts the client. Publishing never blocks and never fails.
//! - **Ephemeral messages**: a subscriber that is not connected misses the
//!   event; there is no replay.
//!
//! # Message Flow
//!
//! 1. A subscriber opens `/ws`; the web layer calls [`Hub::admit`]
//! 2. The dispatch loop adds the client to the registry, its pumps start
//! 3. The domain layer mutates a record and publishes an [`events::Event`]
//! 4. [`HubEventHandler`] calls [`Hub::publish`], the dispatch loop offers the
//!    shared event to every mailbox
//! 5. Each write pump serializes the event to
//!    `{"type", "payload", "timestamp"}` and writes it as a text frame
//!
//! # Modules
//!
//! - `config`: keepalive timings and queue capacities
//! - `connection`: `ClientId`, `Client`, `Mailbox` and the two pumps
//! - `event_handler`: bridge from the event publisher into the hub
//! - `hub`: the hub handle and its dispatch loop
//! - `message`: transport-neutral frames

pub mod config;
pub mod connection;
pub mod event_handler;
pub mod hub;
pub mod message;

pub use config::HubConfig;
pub use connection::{Client, ClientId, Mailbox};
pub use event_handler::HubEventHandler;
pub use hub::{Hub, HubState};
pub use message::Frame;
