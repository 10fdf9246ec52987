use actix_web::HttpRequest;
use chrono::Utc;

use super::error::ApiError;
use super::telegram_auth::InitDataVerifier;
use crate::domain::identity::Identity;
use crate::storage::IdentityStore;

/// Header carrying the already-authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Resolve the caller from the user id header.
pub async fn authenticate(req: &HttpRequest, identities: &dyn IdentityStore) -> Result<Identity, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthenticated)?;

    match identities.get_identity(user_id).await? {
        Some(identity) => Ok(identity),
        None => {
            tracing::debug!(user_id, "Unknown user id");
            Err(ApiError::Unauthenticated)
        }
    }
}

pub async fn require_admin(req: &HttpRequest, identities: &dyn IdentityStore) -> Result<Identity, ApiError> {
    let identity = authenticate(req, identities).await?;
    if !identity.is_admin {
        tracing::warn!(user_id = %identity.id, path = %req.path(), "Admin route refused");
        return Err(ApiError::admin_required());
    }
    Ok(identity)
}

/// Resolve a Mini App caller from signed `initData`. Without a bot token
/// nothing can be verified, so every caller is refused.
pub fn verify_init_data(verifier: Option<&InitDataVerifier>, init_data: &str) -> Result<String, ApiError> {
    let Some(verifier) = verifier else {
        tracing::warn!("Telegram order refused: no bot token configured");
        return Err(ApiError::Unauthenticated);
    };

    verifier.verify(init_data, Utc::now()).map_err(|e| {
        tracing::warn!(error = %e, "Telegram initData rejected");
        ApiError::Unauthenticated
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_missing_or_unknown_user() {
        let store = MemoryStore::new();

        let req = TestRequest::default().to_http_request();
        assert!(matches!(authenticate(&req, &store).await, Err(ApiError::Unauthenticated)));

        let req = TestRequest::default().insert_header((USER_ID_HEADER, "ghost")).to_http_request();
        assert!(matches!(authenticate(&req, &store).await, Err(ApiError::Unauthenticated)));
    }

    #[actix_web::test]
    async fn test_admin_gate() {
        let store = MemoryStore::new();
        store.upsert_identity(Identity::new("alice")).await;
        store.upsert_identity(Identity::new("root").admin()).await;

        let req = TestRequest::default().insert_header((USER_ID_HEADER, "alice")).to_http_request();
        assert_eq!(authenticate(&req, &store).await.unwrap().id, "alice");
        assert!(matches!(require_admin(&req, &store).await, Err(ApiError::Authorization(_))));

        let req = TestRequest::default().insert_header((USER_ID_HEADER, "root")).to_http_request();
        assert!(require_admin(&req, &store).await.unwrap().is_admin);
    }

    #[test]
    fn test_init_data_gate() {
        let verifier = InitDataVerifier::new("42:secret").unwrap();
        let auth_date = Utc::now().timestamp().to_string();
        let signed = verifier.sign(&[("user", r#"{"id":777000}"#), ("auth_date", &auth_date)]);

        assert_eq!(verify_init_data(Some(&verifier), &signed).unwrap(), "777000");
        assert!(matches!(verify_init_data(None, &signed), Err(ApiError::Unauthenticated)));
        assert!(matches!(
            verify_init_data(Some(&verifier), "user=%7B%22id%22%3A777000%7D"),
            Err(ApiError::Unauthenticated)
        ));
    }
}
