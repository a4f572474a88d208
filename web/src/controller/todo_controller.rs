use crate::controller::ApiResponse;
use crate::params::todo::IndexParams;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::todo as TodoApi;
use domain::{todos::Model, Id};

use log::*;

/// POST create a new Todo
#[utoipa::path(
    post,
    path = "/todos",
    request_body = domain::todos::Model,
    responses(
        (status = 201, description = "Successfully Created a New Todo", body = domain::todos::Model),
        (status = 422, description = "Unprocessable Entity"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(todo_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Todo from: {todo_model:?}");

    let todo = TodoApi::create(
        app_state.store_ref(),
        app_state.event_publisher.as_ref(),
        todo_model,
    )
    .await?;

    debug!("New Todo: {todo:?}");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED, todo)),
    ))
}

/// GET a particular Todo specified by its id.
#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(
        ("id" = i64, Path, description = "Todo id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved a specific Todo by its id", body = domain::todos::Model),
        (status = 404, description = "Todo not found")
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Todo by id: {id}");

    let todo = TodoApi::find_by_id(app_state.store_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK, todo)))
}

/// PUT replace a Todo; broadcast to subscribers as an `update` event.
#[utoipa::path(
    put,
    path = "/todos/{id}",
    params(
        ("id" = i64, Path, description = "Id of the Todo to update"),
    ),
    request_body = domain::todos::Model,
    responses(
        (status = 200, description = "Successfully Updated Todo", body = domain::todos::Model),
        (status = 404, description = "Todo not found"),
        (status = 422, description = "Unprocessable Entity")
    )
)]
pub async fn update(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(todo_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Update Todo with id: {id}");

    let todo = TodoApi::update(
        app_state.store_ref(),
        app_state.event_publisher.as_ref(),
        id,
        todo_model,
    )
    .await?;

    debug!("Updated Todo: {todo:?}");

    Ok(Json(ApiResponse::new(StatusCode::OK, todo)))
}

#[utoipa::path(
    get,
    path = "/todos",
    params(IndexParams),
    responses(
        (status = 200, description = "Successfully retrieved all Todos", body = [domain::todos::Model]),
        (status = 400, description = "Bad Request")
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET all Todos");
    debug!("Filter Params: {params:?}");

    let todos = TodoApi::find_by(app_state.store_ref(), params.into()).await?;

    debug!("Found {} Todos", todos.len());

    Ok(Json(ApiResponse::new(StatusCode::OK, todos)))
}

/// DELETE a Todo; broadcast to subscribers as a `delete` event carrying its id.
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(
        ("id" = i64, Path, description = "Id of the Todo to delete"),
    ),
    responses(
        (status = 200, description = "Successfully Deleted Todo"),
        (status = 404, description = "Todo not found")
    )
)]
pub async fn delete(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("DELETE Todo by id: {id}");

    TodoApi::delete(
        app_state.store_ref(),
        app_state.event_publisher.as_ref(),
        id,
    )
    .await?;

    Ok(Json(ApiResponse::no_content()))
}
