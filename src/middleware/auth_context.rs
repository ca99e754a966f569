use std::future::{ready, Ready};

use actix_web::{
    dev::Payload, error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest,
};

use crate::middleware::auth::Claims;

/// Identity of the authenticated caller plus the device key used for
/// per-device state. The device key comes from the `X-Device-Id` header
/// when the app sends one; otherwise the uid doubles as the device key.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub device_id: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = match req.extensions().get::<Claims>().cloned() {
            Some(claims) => claims,
            None => return ready(Err(ErrorUnauthorized("User not authenticated"))),
        };
        let device_id = req
            .headers()
            .get("X-Device-Id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| claims.user_id.clone());

        ready(Ok(AuthenticatedUser {
            user_id: claims.user_id,
            email: claims.sub,
            device_id,
        }))
    }
}
