use crate::{error::AppError, visibility::Viewer};
use axum::{
    async_trait,
    extract::{rejection::TypedHeaderRejectionReason, FromRequest, RequestParts},
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{
    errors::Result as JwtResult, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::{ops::Deref, time::Duration};

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

lazy_static::lazy_static! {
    static ref KEYS: Keys = {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        Keys {
            encoding: EncodingKey::from_base64_secret(&secret).expect("JWT_SECRET is not valid base64"),
            decoding: DecodingKey::from_base64_secret(&secret).expect("JWT_SECRET is not valid base64"),
        }
    };
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: u64,
}

#[allow(unused_must_use)]
pub fn ensure_jwt_secret_is_valid() {
    KEYS.deref();
}

/// Tokens are normally issued by the sign-in service sharing `JWT_SECRET`.
pub fn generate_jwt(user_id: i32, exp: Duration) -> JwtResult<String> {
    jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            user_id,
            exp: jsonwebtoken::get_current_timestamp() + exp.as_secs(),
        },
        &KEYS.encoding,
    )
}

pub fn validate_jwt(token: &str) -> JwtResult<TokenData<Claims>> {
    jsonwebtoken::decode::<Claims>(token, &KEYS.decoding, &Validation::default())
}

fn invalid_token() -> AppError {
    AppError::from(
        axum::http::StatusCode::UNAUTHORIZED,
        "invalid authentication token",
    )
}

/// The authenticated user's id; rejects anonymous requests with 401.
pub struct ExtractAuth(pub i32);

/// The caller, anonymous when no bearer token is sent. A token that is sent
/// but does not validate is still rejected.
pub struct MaybeAuth(pub Viewer);

#[async_trait]
impl<B: Send> FromRequest<B> for MaybeAuth {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request(req).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let claims = validate_jwt(bearer.token()).map_err(|_| invalid_token())?.claims;
                Ok(MaybeAuth(Viewer::User(claims.user_id)))
            }
            Err(rejection) => match rejection.reason() {
                TypedHeaderRejectionReason::Missing => Ok(MaybeAuth(Viewer::Anonymous)),
                _ => Err(invalid_token()),
            },
        }
    }
}

#[async_trait]
impl<B: Send> FromRequest<B> for ExtractAuth {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let MaybeAuth(viewer) = MaybeAuth::from_request(req).await?;
        viewer
            .user_id()
            .map(ExtractAuth)
            .ok_or_else(AppError::unauthorized)
    }
}
