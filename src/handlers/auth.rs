use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::errors::AppError;

/// Header set by the auth gateway once it has verified the session.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Uuid);

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Identity)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()));
        ready(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn reads_a_uuid_header() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        let identity = Identity::extract(&req).await.unwrap();
        assert_eq!(identity, Identity(id));
    }

    #[actix_web::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            Identity::extract(&req).await,
            Err(AppError::Unauthorized(_))
        ));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "someone"))
            .to_http_request();
        assert!(Identity::extract(&req).await.is_err());
    }
}
