use thiserror::Error;

/// Errors raised while loading orders, building figures and serving them
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Reading the data file or writing an output file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or parsed
    #[cfg(feature = "web")]
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// The CSV file could not be read or written
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The requested sheet is not part of the workbook
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    /// A required column is absent from the header row
    #[error("required column '{0}' not found in header row")]
    MissingColumn(String),

    /// A cell could not be converted to the column's type
    #[error("row {row}, column '{column}': {reason}")]
    InvalidCell {
        row: usize,
        column: String,
        reason: String,
    },

    /// The data file extension has no reader
    #[error("unsupported data file format: {0}")]
    UnsupportedFormat(String),

    /// No chart is registered under the slug
    #[error("unknown chart '{0}'")]
    UnknownChart(String),

    /// A query parameter carries a value the route does not accept
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Drawing or encoding a chart failed
    #[error("render error: {0}")]
    Render(String),

    /// Building an export file failed
    #[error("export error: {0}")]
    Export(String),

    /// Command-line or environment configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(feature = "web")]
mod response {
    use super::DashboardError;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use serde_json::json;

    impl DashboardError {
        /// HTTP status a handler answers with for this error
        pub fn status_code(&self) -> StatusCode {
            match self {
                DashboardError::UnknownChart(_) => StatusCode::NOT_FOUND,
                DashboardError::BadRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for DashboardError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                log::error!("{}", self);
            }
            (status, Json(json!({ "error": self.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_cell_message_names_row_and_column() {
        let err = DashboardError::InvalidCell {
            row: 7,
            column: "Sales".to_string(),
            reason: "expected a number, found 'abc'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "row 7, column 'Sales': expected a number, found 'abc'"
        );
    }

    #[cfg(feature = "web")]
    #[test]
    fn status_codes_follow_error_kind() {
        use axum::http::StatusCode;

        assert_eq!(
            DashboardError::UnknownChart("pie".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DashboardError::BadRequest("format".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DashboardError::Render("font".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
