use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json,
};
use communal_collab::{Credentials, IdentityProvider, NewAccount, SessionData, UserId};

use crate::{
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router, ServerContext, ServerError, ServerResult,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    pub fn data(&self) -> &SessionData {
        &self.0
    }
}

impl IdentityProvider for Session {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.current_user_id()
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let session = state.collab.auth.session(&token).await?;

        Ok(Self(session))
    }
}

/// A session if the request carries an authorization header, or none if it doesn't.
///
/// Unlike `Option<Session>`, a header that is present but can't be resolved is an error,
/// so a store outage during the lookup isn't mistaken for a signed out request.
pub struct OptionalSession(Option<SessionData>);

impl IdentityProvider for OptionalSession {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.current_user_id()
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for OptionalSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Self(None));
        }

        let Session(session) = Session::from_request_parts(parts, state).await?;

        Ok(Self(Some(session)))
    }
}

fn bearer_token(parts: &Parts) -> ServerResult<String> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|x| x.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("Missing authorization".to_string()))?;

    let parts: Vec<_> = header.split_ascii_whitespace().collect();

    // Auth schemes are case insensitive
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("Bearer") => Ok(token.to_string()),
        _ => Err(ServerError::BadRequest(
            "Authorization must be Bearer".to_string(),
        )),
    }
}

async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .auth
        .register(NewAccount {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .sign_in_with_email_and_password(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

async fn logout(State(context): State<ServerContext>, session: Session) -> ServerResult<StatusCode> {
    context.collab.auth.sign_out(&session.data().token).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn user(session: Session) -> Json<User> {
    Json(session.data().user.to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(user))
}

#[cfg(test)]
mod test {
    use axum::http::{header, Request};

    use super::bearer_token;
    use crate::ServerError;

    fn token(value: &str) -> Result<String, ServerError> {
        let (parts, _) = Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap()
            .into_parts();

        bearer_token(&parts)
    }

    #[test]
    fn bearer_scheme_ignores_case() {
        assert_eq!(token("Bearer abc").unwrap(), "abc");
        assert_eq!(token("bearer abc").unwrap(), "abc");
        assert_eq!(token("BEARER abc").unwrap(), "abc");

        assert!(matches!(token("Basic abc"), Err(ServerError::BadRequest(_))));
        assert!(matches!(token("Bearer"), Err(ServerError::BadRequest(_))));
    }
}
