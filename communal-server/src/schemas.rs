use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use communal_collab::PrivacyType;
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::ServerError;

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 320))]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email, length(max = 320))]
    pub email: String,
    #[validate(length(min = 6, max = 64))]
    pub password: String,
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCommunitySchema {
    /// Checked by the registrar, this only bounds the request size
    #[validate(length(max = 128))]
    pub name: String,
    #[serde(default)]
    pub privacy_type: PrivacyType,
}

/// JSON body that is validated before reaching the handler
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::BadRequest(format!("JSON parse failed: {}", e.body_text())))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::BadRequest(format!("Request body is invalid: {e}")))?;

        Ok(Self(extracted_json.0))
    }
}
