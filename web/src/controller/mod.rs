use axum::http::StatusCode;
use serde::Serialize;

pub(crate) mod health_check_controller;
pub(crate) mod hub_controller;
pub(crate) mod todo_controller;

/// Envelope for every JSON body the API returns.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn no_content() -> Self {
        Self {
            status_code: StatusCode::NO_CONTENT.as_u16(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::todos::Model;
    use serde_json::json;

    #[test]
    fn test_serialize_api_response_with_todo() {
        let mut todo = Model::new("X");
        todo.id = 1;

        let value = serde_json::to_value(ApiResponse::new(StatusCode::CREATED, todo)).unwrap();

        assert_eq!(value["status_code"], 201);
        assert_eq!(value["data"]["name"], "X");
    }

    #[test]
    fn test_serialize_api_response_without_data() {
        let serialized = serde_json::to_string(&ApiResponse::no_content()).unwrap();

        assert_eq!(serialized, json!({"status_code": 204}).to_string());
    }
}
