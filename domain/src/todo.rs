//! Todo operations. Every successful mutation is published as an event.
use crate::error::Error;
use crate::query::{filter_and_sort, ListOptions};
use crate::store::Store;
use crate::todos::Model;
use crate::Id;
use chrono::{Duration, Utc};
use events::{Event, EventPublisher};
use log::*;

pub async fn create(
    store: &Store,
    event_publisher: &EventPublisher,
    mut model: Model,
) -> Result<Model, Error> {
    debug!("New Todo Model to be inserted: {model:?}");

    validate(&model)?;
    if model.due_date.is_none() {
        model.due_date = Some(Utc::now() + Duration::hours(24));
    }

    let todo = store.insert(model).await;

    event_publisher
        .publish(Event::created(serde_json::to_value(&todo)?))
        .await;

    Ok(todo)
}

pub async fn find_by_id(store: &Store, id: Id) -> Result<Model, Error> {
    store.get(id).await.ok_or_else(Error::not_found)
}

pub async fn find_by(store: &Store, options: ListOptions) -> Result<Vec<Model>, Error> {
    Ok(filter_and_sort(store.all().await, &options))
}

/// Replaces the todo stored under `id` with `model`. The id in the path wins
/// over any id in the body.
///
/// The replacement is validated like a new todo, so an update can never
/// blank out a todo's name; a nameless body is rejected as invalid.
pub async fn update(
    store: &Store,
    event_publisher: &EventPublisher,
    id: Id,
    mut model: Model,
) -> Result<Model, Error> {
    validate(&model)?;
    model.id = id;

    let todo = match store.replace(model).await {
        Some(todo) => todo,
        None => {
            error!("Todo with id {id} not found");
            return Err(Error::not_found());
        }
    };

    event_publisher
        .publish(Event::updated(serde_json::to_value(&todo)?))
        .await;

    Ok(todo)
}

pub async fn delete(store: &Store, event_publisher: &EventPublisher, id: Id) -> Result<(), Error> {
    if store.remove(id).await.is_none() {
        error!("Todo with id {id} not found");
        return Err(Error::not_found());
    }

    event_publisher.publish(Event::deleted(id)).await;

    Ok(())
}

fn validate(model: &Model) -> Result<(), Error> {
    if model.name.trim().is_empty() {
        return Err(Error::invalid("name is required"));
    }
    Ok(())
}
