use crate::todos::{Model, Status};
use serde::Deserialize;
use std::cmp::Ordering;
use utoipa::ToSchema;

/// Sortable fields for todos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[schema(example = "due_date")]
pub enum SortField {
    #[default]
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "due_date")]
    DueDate,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "name")]
    Name,
}

/// Common sort order values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[schema(example = "desc")]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Filtering and ordering for listing todos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub status: Option<Status>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

/// Keeps the todos matching `options.status` and orders them by
/// `options.sort_by`. The sort is stable, so ties keep their incoming order.
pub fn filter_and_sort(todos: Vec<Model>, options: &ListOptions) -> Vec<Model> {
    let mut out: Vec<Model> = todos
        .into_iter()
        .filter(|todo| options.status.map_or(true, |status| todo.status == status))
        .collect();

    let field = options.sort_by.unwrap_or_default();
    let order = options.sort_order.unwrap_or_default();

    out.sort_by(|a, b| {
        let ordering = compare(a, b, field);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    out
}

fn compare(a: &Model, b: &Model, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        // Todos without a due date sort last.
        SortField::DueDate => match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::Status => a.status.to_string().cmp(&b.status.to_string()),
        SortField::Name => a.name.cmp(&b.name),
    }
}
