use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use communal_collab::{AuthError, RegistrationError};
use communal_core::StoreError;
use log::error;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    /// The store is down, distinct from anything the user did wrong
    #[error("{0}")]
    Unavailable(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Unknown(message) = &self {
            error!("Request failed: {message}");
        }

        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            e @ (AuthError::InvalidCredentials
            | AuthError::InvalidEmail
            | AuthError::WeakPassword(_)) => Self::BadRequest(e.to_string()),
            e @ AuthError::EmailInUse => Self::Conflict(e.to_string()),
            e @ (AuthError::InvalidSession | AuthError::SessionExpired) => {
                Self::Unauthorized(e.to_string())
            }
            AuthError::Store(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<RegistrationError> for ServerError {
    fn from(value: RegistrationError) -> Self {
        match value {
            e @ RegistrationError::InvalidName(_) => Self::BadRequest(e.to_string()),
            e @ RegistrationError::Unauthenticated => Self::Unauthorized(e.to_string()),
            e @ (RegistrationError::NameTaken(_) | RegistrationError::ConflictRetryable) => {
                Self::Conflict(e.to_string())
            }
            e @ RegistrationError::StoreUnavailable(_) => Self::Unavailable(e.to_string()),
            RegistrationError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(value: StoreError) -> Self {
        match value {
            e @ StoreError::Unavailable(_) => Self::Unavailable(e.to_string()),
            e @ StoreError::Conflict => Self::Conflict(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use communal_collab::{AuthError, CommunityName, InvalidName, RegistrationError};
    use communal_core::StoreError;

    use super::ServerError;

    fn status(error: impl Into<ServerError>) -> StatusCode {
        error.into().as_status_code()
    }

    #[test]
    fn registration_errors() {
        let name = CommunityName::parse("rust").unwrap();

        assert_eq!(
            status(RegistrationError::InvalidName(InvalidName::TooShort { length: 1 })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RegistrationError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(RegistrationError::NameTaken(name)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(RegistrationError::ConflictRetryable),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(RegistrationError::StoreUnavailable("offline".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn auth_errors() {
        assert_eq!(
            status(AuthError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AuthError::EmailInUse), StatusCode::CONFLICT);
        assert_eq!(status(AuthError::SessionExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AuthError::Store(StoreError::Unavailable("offline".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(AuthError::HashError("bad".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn taken_names_keep_their_message() {
        let error: ServerError =
            RegistrationError::NameTaken(CommunityName::parse("rust").unwrap()).into();

        assert_eq!(error.to_string(), "Sorry, r/rust is taken. Try another!");
    }
}
