use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::dto::auth_dto::TelegramLoginPayload;

type HmacSha256 = Hmac<Sha256>;

/// Widget logins older than this are rejected.
pub const MAX_AUTH_AGE_SECS: i64 = 24 * 60 * 60;
/// How far in the future `auth_date` may lie before the payload is refused.
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

/// Builds the `key=value` lines Telegram signs, sorted by key, without `hash`.
pub fn data_check_string(payload: &TelegramLoginPayload) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("auth_date", payload.auth_date.to_string()),
        ("first_name", payload.first_name.clone()),
        ("id", payload.id.to_string()),
    ];
    if let Some(last_name) = &payload.last_name {
        pairs.push(("last_name", last_name.clone()));
    }
    if let Some(username) = &payload.username {
        pairs.push(("username", username.clone()));
    }
    if let Some(photo_url) = &payload.photo_url {
        pairs.push(("photo_url", photo_url.clone()));
    }

    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sign_login(payload: &TelegramLoginPayload, bot_token: &str) -> Option<String> {
    let secret_key = Sha256::digest(bot_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&secret_key).ok()?;
    mac.update(data_check_string(payload).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a Telegram Login Widget payload. `now` is a unix timestamp.
pub fn verify_login_widget(payload: &TelegramLoginPayload, bot_token: &str, now: i64) -> bool {
    let age = now.saturating_sub(payload.auth_date);
    if !(-MAX_CLOCK_SKEW_SECS..=MAX_AUTH_AGE_SECS).contains(&age) {
        return false;
    }
    let Some(calculated) = sign_login(payload, bot_token) else {
        return false;
    };
    let expected = payload.hash.to_ascii_lowercase();
    subtle::ConstantTimeEq::ct_eq(calculated.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(auth_date: i64) -> TelegramLoginPayload {
        TelegramLoginPayload {
            id: 4242,
            first_name: "Ivan".into(),
            last_name: Some("Petrov".into()),
            username: Some("ivanp".into()),
            photo_url: None,
            auth_date,
            hash: String::new(),
        }
    }

    #[test]
    fn check_string_is_sorted_and_skips_missing_fields() {
        assert_eq!(
            data_check_string(&payload(100)),
            "auth_date=100\nfirst_name=Ivan\nid=4242\nlast_name=Petrov\nusername=ivanp"
        );
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let mut p = payload(1_000);
        p.hash = sign_login(&p, "123:ABC").unwrap().to_uppercase();
        assert!(verify_login_widget(&p, "123:ABC", 1_100));
    }

    #[test]
    fn rejects_wrong_token_or_tampering() {
        let mut p = payload(1_000);
        p.hash = sign_login(&p, "123:ABC").unwrap();
        assert!(!verify_login_widget(&p, "999:XYZ", 1_100));

        p.first_name = "Mallory".into();
        assert!(!verify_login_widget(&p, "123:ABC", 1_100));
    }

    #[test]
    fn rejects_stale_logins() {
        let mut p = payload(1_000);
        p.hash = sign_login(&p, "123:ABC").unwrap();
        assert!(!verify_login_widget(&p, "123:ABC", 1_000 + MAX_AUTH_AGE_SECS + 1));
    }

    #[test]
    fn rejects_out_of_range_auth_dates() {
        let now = 1_700_000_000;
        for auth_date in [i64::MIN, i64::MAX, now + MAX_CLOCK_SKEW_SECS + 1] {
            let mut p = payload(auth_date);
            p.hash = sign_login(&p, "123:ABC").unwrap();
            assert!(!verify_login_widget(&p, "123:ABC", now), "auth_date {auth_date}");
        }

        let mut p = payload(now + 30);
        p.hash = sign_login(&p, "123:ABC").unwrap();
        assert!(verify_login_widget(&p, "123:ABC", now));
    }
}
