use crate::Hub;
use async_trait::async_trait;
use events::{Event, EventHandler};
use log::*;

/// Forwards domain events to every connected subscriber.
///
/// The hub's publish never waits, so producers going through the event
/// publisher are never held up by subscribers.
pub struct HubEventHandler {
    hub: Hub,
}

impl HubEventHandler {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventHandler for HubEventHandler {
    async fn handle(&self, event: &Event) {
        debug!(
            "Broadcasting {} event from {} to {} client(s)",
            event.kind(),
            event.occurred_at(),
            self.hub.client_count()
        );
        self.hub.publish(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HubConfig;
    use events::EventPublisher;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_published_domain_events_reach_hub_clients() {
        let hub = Hub::new(HubConfig::default());
        hub.run();
        let (client, mut mailbox) = hub.client();
        hub.register(client);
        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.client_count() != 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let publisher =
            EventPublisher::new().with_handler(Arc::new(HubEventHandler::new(hub.clone())));
        publisher
            .publish(Event::created(json!({"id": 9, "name": "write docs"})))
            .await;

        let event = mailbox.recv().await.unwrap();
        assert_eq!(event.entity()["name"], "write docs");
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_handler_on_closed_hub_does_not_panic() {
        let hub = Hub::new(HubConfig::default());
        hub.close();

        HubEventHandler::new(hub).handle(&Event::deleted(1)).await;
    }
}
