//! The authentication endpoint

use actix_web::{web, HttpResponse};
use validator::Validate;

use ag_core::domain::entities::AuthStatus;
use ag_core::errors::EngineError;

use crate::app::AppState;
use crate::dto::{AuthRequest, AuthResponseBody, ErrorBody};

/// `POST /v1/auth` — verify one credential triple.
///
/// Status mapping: `Authenticated` is 200, `AccountLocked` 423,
/// `BadRequest` 400, `ServerError` 502, every other rejection 401.
/// Backend infrastructure failures surface as 502 so load balancers can
/// distinguish them from rejections.
pub async fn authenticate(
    state: web::Data<AppState>,
    body: web::Json<AuthRequest>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(ErrorBody::new(errors.to_string()));
    }

    match state
        .engine
        .authenticate(&body.realm, &body.account, &body.password)
        .await
    {
        Ok(result) => {
            let mut builder = match result.status {
                AuthStatus::Authenticated => HttpResponse::Ok(),
                AuthStatus::AccountLocked => HttpResponse::Locked(),
                AuthStatus::BadRequest => HttpResponse::BadRequest(),
                AuthStatus::ServerError => HttpResponse::BadGateway(),
                _ => HttpResponse::Unauthorized(),
            };
            builder.json(AuthResponseBody::from(result))
        }
        Err(EngineError::InvariantViolation { message }) => {
            HttpResponse::ServiceUnavailable().json(ErrorBody::new(message))
        }
        Err(err) => HttpResponse::BadGateway().json(ErrorBody::new(err.to_string())),
    }
}
