use crate::controller::{health_check_controller, hub_controller, todo_controller};
use crate::{ws, AppState};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use log::*;
use tower_http::cors::{AllowOrigin, CorsLayer};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Todo Hub API"
        ),
        paths(
            health_check_controller::health_check,
            hub_controller::stats,
            todo_controller::create,
            todo_controller::update,
            todo_controller::index,
            todo_controller::read,
            todo_controller::delete,
        ),
        components(
            schemas(
                domain::todos::Model,
                domain::todos::Status,
                hub_controller::HubStats,
            )
        ),
        tags(
            (name = "todo_hub", description = "Todo API with real-time change broadcast")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .merge(health_routes())
        .merge(todo_routes(app_state.clone()))
        .merge(hub_routes(app_state.clone()))
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(cors)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn todo_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/todos",
            post(todo_controller::create).get(todo_controller::index),
        )
        .route(
            "/todos/:id",
            get(todo_controller::read)
                .put(todo_controller::update)
                .delete(todo_controller::delete),
        )
        .with_state(app_state)
}

fn hub_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/hub/stats", get(hub_controller::stats))
        .with_state(app_state)
}

fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::handler::ws_handler))
        .with_state(app_state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
