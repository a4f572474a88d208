use config::Config;
use domain::Store;
use events::EventPublisher;
use hub::{Hub, HubEventHandler};
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub hub: Hub,
    pub event_publisher: Arc<EventPublisher>,
}

impl AppState {
    /// Wires an empty store to a new hub: every todo mutation published through
    /// `event_publisher` is broadcast to the hub's subscribers.
    ///
    /// The hub is created idle; call [`AppState::start_hub`] from within the runtime.
    pub fn new(app_config: Config) -> Self {
        let hub_config = app_config.hub_config();
        info!(
            "Hub config: mailbox_capacity={}, publish_buffer={}, ping_period={:?}, \
             pong_wait={:?}, write_wait={:?}",
            hub_config.mailbox_capacity,
            hub_config.publish_buffer,
            hub_config.ping_period,
            hub_config.pong_wait,
            hub_config.write_wait,
        );

        let hub = Hub::new(hub_config);
        let event_publisher =
            EventPublisher::new().with_handler(Arc::new(HubEventHandler::new(hub.clone())));

        Self {
            config: app_config,
            store: Arc::new(Store::new()),
            hub,
            event_publisher: Arc::new(event_publisher),
        }
    }

    pub fn store_ref(&self) -> &Store {
        self.store.as_ref()
    }

    pub fn start_hub(&self) {
        self.hub.run();
    }
}
