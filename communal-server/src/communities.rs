use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use communal_collab::CommunityName;

use crate::{
    auth::OptionalSession,
    schemas::{NewCommunitySchema, ValidatedJson},
    serialized::{Community, ToSerialized},
    Router, ServerContext, ServerError, ServerResult,
};

/// Requests without a session still reach the registrar, which rejects them as unauthenticated
async fn create_community(
    State(context): State<ServerContext>,
    session: OptionalSession,
    ValidatedJson(body): ValidatedJson<NewCommunitySchema>,
) -> ServerResult<Json<Community>> {
    let community = context
        .collab
        .communities
        .register_as(&session, &body.name, body.privacy_type)
        .await?;

    Ok(Json(community.to_serialized()))
}

async fn community(
    State(context): State<ServerContext>,
    Path(name): Path<String>,
) -> ServerResult<Json<Community>> {
    let not_found = || ServerError::NotFound(format!("r/{name}"));

    // An invalid name can't belong to any community
    let parsed = CommunityName::parse(&name).map_err(|_| not_found())?;

    let community = context
        .collab
        .communities
        .community(&parsed)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(community.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_community))
        .route("/:name", get(community))
}
