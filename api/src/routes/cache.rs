//! Cache-control endpoints.
//!
//! Each handler applies the directive locally first, then — when the
//! request asks for it and cluster sync is enabled — forwards it to the
//! peers.

use actix_web::{web, HttpResponse};
use tracing::warn;
use validator::Validate;

use ag_core::sync::SyncPayload;

use crate::app::AppState;
use crate::dto::{CacheClearRequest, CacheFlushRequest, ErrorBody, LockRequest};

async fn forward(state: &AppState, payload: SyncPayload) {
    if let Some(sync) = state.sync.as_ref() {
        if let Err(err) = sync.broadcast(payload).await {
            warn!(error = %err, "cache directive broadcast failed");
        }
    }
}

/// `POST /v1/cache/flush` — drop one account or a whole realm from the
/// positive or negative cache.
pub async fn flush(state: web::Data<AppState>, body: web::Json<CacheFlushRequest>) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(ErrorBody::new(errors.to_string()));
    }

    let outcome = if body.nak {
        state
            .engine
            .flush_nak_cache(&body.realm, body.account.as_deref())
    } else {
        state
            .engine
            .flush_cache(&body.realm, body.account.as_deref())
    };
    if let Err(err) = outcome {
        return HttpResponse::ServiceUnavailable().json(ErrorBody::new(err.to_string()));
    }

    if body.broadcast {
        let payload = match (&body.account, body.nak) {
            (Some(account), false) => SyncPayload::CacheRemoveAccount {
                realm: body.realm.clone(),
                account: account.clone(),
            },
            (None, false) => SyncPayload::CacheRemoveRealm {
                realm: body.realm.clone(),
            },
            (Some(account), true) => SyncPayload::CacheRemoveNakAccount {
                realm: body.realm.clone(),
                account: account.clone(),
            },
            (None, true) => SyncPayload::CacheRemoveNakRealm {
                realm: body.realm.clone(),
            },
        };
        forward(&state, payload).await;
    }
    HttpResponse::NoContent().finish()
}

/// `POST /v1/cache/clear` — drop everything from the positive or negative
/// cache.
pub async fn clear(state: web::Data<AppState>, body: web::Json<CacheClearRequest>) -> HttpResponse {
    let outcome = if body.nak {
        state.engine.clear_nak_cache()
    } else {
        state.engine.clear_cache()
    };
    if let Err(err) = outcome {
        return HttpResponse::ServiceUnavailable().json(ErrorBody::new(err.to_string()));
    }

    if body.broadcast {
        let payload = if body.nak {
            SyncPayload::CacheClearNak
        } else {
            SyncPayload::CacheClear
        };
        forward(&state, payload).await;
    }
    HttpResponse::NoContent().finish()
}

/// `POST /v1/lock` — force-lock an account for the given duration
pub async fn lock_account(state: web::Data<AppState>, body: web::Json<LockRequest>) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(ErrorBody::new(errors.to_string()));
    }

    let duration = std::time::Duration::from_secs(body.ttl_secs);
    if let Err(err) = state
        .engine
        .lock_account(&body.realm, &body.account, duration)
    {
        return HttpResponse::ServiceUnavailable().json(ErrorBody::new(err.to_string()));
    }
    HttpResponse::NoContent().finish()
}
