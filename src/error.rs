use sea_orm::DbErr;

#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("malformed form_data in form_responses row {row_id} (farmer {farmer_id}): {source}")]
    MalformedFormData {
        row_id: i32,
        farmer_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed coordinates in field_boundaries row {row_id}: {source}")]
    MalformedCoordinates {
        row_id: i32,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

pub type LinkResult<T> = Result<T, LinkError>;
