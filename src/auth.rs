use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, info};

use crate::{clock::Clock, error::PicksError, models::types::UtcDateTime};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: UtcDateTime,
}

/// Shared-password gate handing out signed bearer tokens.
///
/// A token is `{expiry unix seconds}.{base64url HMAC-SHA256 of the expiry}`.
/// The password is kept only as its HMAC tag and checked with a constant-time comparison.
pub struct AuthGate {
    password_tag: Vec<u8>,
    mac: HmacSha256,
    ttl: time::Duration,
    clock: Arc<dyn Clock>,
}

impl AuthGate {
    pub fn new(
        password: String,
        secret: &str,
        ttl: time::Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<AuthGate, PicksError> {
        if password.is_empty() || secret.is_empty() {
            return Err(PicksError::InvalidInput(
                "Password and token secret must not be empty".to_string(),
            ));
        }

        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PicksError::InvalidInput(format!("Unusable token secret: {e}")))?;

        let password_tag = password_mac(&mac, &password).finalize().into_bytes().to_vec();

        Ok(AuthGate {
            password_tag,
            mac,
            ttl,
            clock,
        })
    }

    pub fn login(&self, password: &str) -> Result<IssuedToken, PicksError> {
        if password_mac(&self.mac, password)
            .verify_slice(&self.password_tag)
            .is_err()
        {
            info!("Rejected login with a wrong password");
            return Err(PicksError::Unauthorized);
        }

        let expires_at = self.clock.now() + self.ttl;
        let expiry = expires_at.unix_timestamp();

        Ok(IssuedToken {
            access_token: format!("{expiry}.{}", BASE64.encode(self.sign(expiry))),
            token_type: "bearer",
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<(), PicksError> {
        let (expiry, signature) = token.split_once('.').ok_or(PicksError::Unauthorized)?;
        let expiry: i64 = expiry.parse().map_err(|_| PicksError::Unauthorized)?;
        let signature = BASE64
            .decode(signature)
            .map_err(|_| PicksError::Unauthorized)?;

        let mut mac = self.mac.clone();
        mac.update(expiry.to_string().as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| PicksError::Unauthorized)?;

        if expiry <= self.clock.now().unix_timestamp() {
            debug!("Token expired at {expiry}");
            return Err(PicksError::Unauthorized);
        }

        Ok(())
    }

    fn sign(&self, expiry: i64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(expiry.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// HMAC over the password, kept apart from expiry signatures by its prefix.
fn password_mac(mac: &HmacSha256, password: &str) -> HmacSha256 {
    let mut mac = mac.clone();
    mac.update(b"password:");
    mac.update(password.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;
    use time::{macros::datetime, Duration};

    use super::AuthGate;
    use crate::{
        clock::{Clock, ManualClock},
        error::PicksError,
        models::types::UtcDateTime,
    };

    fn gate_with_secret(secret: &str) -> (AuthGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(UtcDateTime::from(datetime!(2024-12-20 12:00 UTC))));
        let gate = AuthGate::new("bowlseason".to_string(), secret, Duration::weeks(1), clock.clone())
            .unwrap();
        (gate, clock)
    }

    #[test]
    fn issued_token_verifies_until_expiry() {
        let (gate, clock) = gate_with_secret("s3cret");
        let token = gate.login("bowlseason").unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_at, clock.now() + Duration::weeks(1));

        gate.verify(&token.access_token).unwrap();

        clock.advance(Duration::days(6));
        gate.verify(&token.access_token).unwrap();

        clock.set(token.expires_at);
        assert!(matches!(gate.verify(&token.access_token), Err(PicksError::Unauthorized)));
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let (gate, _clock) = gate_with_secret("s3cret");
        assert!(matches!(gate.login("guess"), Err(PicksError::Unauthorized)));
    }

    #[test]
    fn password_must_match_exactly() {
        let (gate, _clock) = gate_with_secret("s3cret");
        for near_miss in ["", "bowlseaso", "bowlseason ", "Bowlseason", "bowlseasonbowlseason"] {
            assert!(
                matches!(gate.login(near_miss), Err(PicksError::Unauthorized)),
                "{near_miss:?}"
            );
        }
        gate.login("bowlseason").unwrap();
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let (gate, _clock) = gate_with_secret("s3cret");
        let (other, _clock) = gate_with_secret("another secret");
        let token = gate.login("bowlseason").unwrap().access_token;
        let foreign = other.login("bowlseason").unwrap().access_token;

        let (expiry, signature) = token.split_once('.').unwrap();
        let extended = format!("{}.{signature}", expiry.parse::<i64>().unwrap() + 3600);

        for bad in [
            "",
            "garbage",
            "123.",
            "abc.def",
            extended.as_str(),
            foreign.as_str(),
        ] {
            assert!(matches!(gate.verify(bad), Err(PicksError::Unauthorized)), "{bad:?}");
        }
    }

    #[test]
    fn empty_secret_is_refused() {
        let clock = Arc::new(ManualClock::new(UtcDateTime::now()));
        let err = AuthGate::new("pw".to_string(), "", Duration::hours(1), clock)
            .err()
            .unwrap();
        assert!(matches!(err, PicksError::InvalidInput(_)));
    }
}
