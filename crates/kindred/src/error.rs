use crate::config::ConfigError;
use crate::matching::{MatchError, RosterImportError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Matching(MatchError),
    Roster(RosterImportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Matching(err) => write!(f, "matching error: {}", err),
            AppError::Roster(err) => write!(f, "roster import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Matching(err) => Some(err),
            AppError::Roster(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Matching(MatchError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Matching(
                MatchError::InvalidScore(_) | MatchError::EmptyTopic | MatchError::EmptyGroupName,
            )
            | AppError::Roster(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Matching(
                MatchError::KindConflict { .. } | MatchError::AlreadyExists { .. },
            ) => StatusCode::CONFLICT,
            AppError::Matching(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<MatchError> for AppError {
    fn from(value: MatchError) -> Self {
        Self::Matching(value)
    }
}

impl From<RosterImportError> for AppError {
    fn from(value: RosterImportError) -> Self {
        Self::Roster(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{StoreEntity, TopicKind};

    fn status_of(error: impl Into<AppError>) -> StatusCode {
        error.into().into_response().status()
    }

    #[test]
    fn matching_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(MatchError::NotFound {
                entity: StoreEntity::Group,
                id: "g9".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(MatchError::EmptyGroupName), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_of(MatchError::AlreadyExists {
                entity: StoreEntity::Group,
                id: "g1".to_string(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(MatchError::KindConflict {
                word: "music".to_string(),
                existing: TopicKind::Interest,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn roster_errors_are_unprocessable() {
        let error = RosterImportError::MissingScore {
            line: 2,
            word: "chess".to_string(),
        };
        assert_eq!(status_of(error), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
