// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed email verification links.
//!
//! Token format: `base64url(user_id \n email \n exp) . base64url(mac)` where
//! `mac = HMAC-SHA256(secret, "email-verification.v1\n" || payload)`. The
//! domain prefix keeps these MACs from being usable anywhere else the secret
//! is used.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::ValidationError;

type HmacSha256 = Hmac<Sha256>;

const MAC_DOMAIN: &[u8] = b"email-verification.v1\n";

/// Identity a valid verification token vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEmail {
    pub user_id: String,
    pub email: String,
}

/// Issues and checks verification links.
#[derive(Clone)]
pub struct VerificationLinks {
    keyed: HmacSha256,
    base_url: Url,
    ttl: Duration,
}

impl VerificationLinks {
    /// Create a link signer. Links point at `{base_url}/verify-email`.
    pub fn new(secret: &[u8], base_url: Url, ttl: Duration) -> Result<Self, InvalidLength> {
        let mut keyed = <HmacSha256 as Mac>::new_from_slice(secret)?;
        keyed.update(MAC_DOMAIN);
        Ok(Self {
            keyed,
            base_url,
            ttl,
        })
    }

    /// Sign a token for `user_id`/`email`, valid for the configured TTL.
    pub fn sign(&self, user_id: &str, email: &str, now: DateTime<Utc>) -> String {
        let exp = (now + self.ttl).timestamp();
        let payload = format!("{user_id}\n{email}\n{exp}");
        let mac = self.mac(payload.as_bytes()).finalize().into_bytes();

        format!(
            "{}.{}",
            Base64UrlUnpadded::encode_string(payload.as_bytes()),
            Base64UrlUnpadded::encode_string(&mac)
        )
    }

    /// Full link to put in the verification email.
    pub fn link(&self, user_id: &str, email: &str, now: DateTime<Utc>) -> Result<Url, url::ParseError> {
        let token = self.sign(user_id, email, now);
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse_with_params(&format!("{base}/verify-email"), &[("token", token)])
    }

    /// Check signature and expiry of a token.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedEmail, ValidationError> {
        let invalid = ValidationError::InvalidVerificationLink;

        let (payload_b64, mac_b64) = token.split_once('.').ok_or(invalid.clone())?;
        let payload = Base64UrlUnpadded::decode_vec(payload_b64).map_err(|_| invalid.clone())?;
        let mac = Base64UrlUnpadded::decode_vec(mac_b64).map_err(|_| invalid.clone())?;

        self.mac(&payload)
            .verify_slice(&mac)
            .map_err(|_| invalid.clone())?;

        let payload = String::from_utf8(payload).map_err(|_| invalid.clone())?;
        let mut fields = payload.splitn(3, '\n');
        let (Some(user_id), Some(email), Some(exp)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid);
        };
        let exp: i64 = exp.parse().map_err(|_| invalid.clone())?;

        if now.timestamp() >= exp || user_id.is_empty() {
            return Err(invalid);
        }

        Ok(VerifiedEmail {
            user_id: user_id.to_string(),
            email: email.to_string(),
        })
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(payload);
        mac
    }
}
