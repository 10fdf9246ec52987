use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

// ============================================================================
// Telegram Mini App identity
// ============================================================================
//
// The Mini App hands the backend its `initData` query string. Telegram signs
// it: the secret key is HMAC-SHA256("WebAppData", bot_token), the hash is
// HMAC-SHA256(secret, data_check_string) where data_check_string is every
// other field as `key=value`, sorted by key and joined with '\n'.
//
// A verified payload is the only thing that makes a caller the owner of a
// Telegram user id.
//
// ============================================================================

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("initData signing key is invalid")]
    Key,

    #[error("initData has no hash")]
    MissingHash,

    #[error("initData hash does not match")]
    BadSignature,

    #[error("initData has no valid auth_date")]
    MissingAuthDate,

    #[error("initData is too old")]
    Expired,

    #[error("initData has no valid user")]
    MissingUser,
}

#[derive(Deserialize)]
struct WebAppUser {
    id: i64,
}

#[derive(Clone)]
pub struct InitDataVerifier {
    secret: Vec<u8>,
    max_age: Duration,
}

impl InitDataVerifier {
    pub fn new(bot_token: &str) -> Result<Self, InitDataError> {
        let secret = mac(b"WebAppData")?
            .chain_update(bot_token.as_bytes())
            .finalize()
            .into_bytes()
            .to_vec();

        Ok(Self {
            secret,
            max_age: Duration::hours(24),
        })
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Check the signature and freshness of `init_data` and return the
    /// Telegram user id it was issued to.
    pub fn verify(&self, init_data: &str, now: DateTime<Utc>) -> Result<String, InitDataError> {
        let mut hash = None;
        let mut fields: Vec<(String, String)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
            if key == "hash" {
                hash = Some(value.into_owned());
            } else {
                fields.push((key.into_owned(), value.into_owned()));
            }
        }

        let hash = hash.ok_or(InitDataError::MissingHash)?;
        let expected = hex::decode(hash).map_err(|_| InitDataError::BadSignature)?;
        mac(&self.secret)?
            .chain_update(data_check_string(&mut fields))
            .verify_slice(&expected)
            .map_err(|_| InitDataError::BadSignature)?;

        let field = |name: &str| fields.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str());

        let auth_date = field("auth_date")
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(InitDataError::MissingAuthDate)?;
        if now - auth_date > self.max_age || auth_date - now > Duration::minutes(5) {
            return Err(InitDataError::Expired);
        }

        let user: WebAppUser = field("user")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .ok_or(InitDataError::MissingUser)?;
        if user.id <= 0 {
            return Err(InitDataError::MissingUser);
        }

        Ok(user.id.to_string())
    }

    /// Build a signed `initData` string the way Telegram does.
    #[cfg(test)]
    pub(crate) fn sign(&self, fields: &[(&str, &str)]) -> String {
        let mut owned: Vec<(String, String)> =
            fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let hash = mac(&self.secret)
            .unwrap()
            .chain_update(data_check_string(&mut owned))
            .finalize()
            .into_bytes();

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            query.append_pair(key, value);
        }
        query.append_pair("hash", &hex::encode(hash));
        query.finish()
    }
}

fn mac(key: &[u8]) -> Result<HmacSha256, InitDataError> {
    HmacSha256::new_from_slice(key).map_err(|_| InitDataError::Key)
}

fn data_check_string(fields: &mut [(String, String)]) -> String {
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
