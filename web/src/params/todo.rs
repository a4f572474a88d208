use domain::todos::Status;
use domain::{ListOptions, SortField, SortOrder};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query string accepted by `GET /todos`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct IndexParams {
    /// Only list todos with this status
    pub(crate) status: Option<Status>,
    /// Field to sort by, defaults to `id`
    pub(crate) sort_by: Option<SortField>,
    /// Sort direction, defaults to `asc`
    pub(crate) sort_order: Option<SortOrder>,
}

impl From<IndexParams> for ListOptions {
    fn from(params: IndexParams) -> Self {
        ListOptions {
            status: params.status,
            sort_by: params.sort_by,
            sort_order: params.sort_order,
        }
    }
}
