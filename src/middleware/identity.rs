use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::error::AppError;

/// The authenticated caller, as asserted by the fronting gateway.
/// Authentication itself happens upstream; this service only requires the
/// gateway-set header and threads the actor id explicitly through every
/// operation.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        ready(
            user_id
                .map(|user_id| Identity { user_id })
                .ok_or_else(|| AppError::Unauthorized.into()),
        )
    }
}
