//! Unsubscribe link tokens.
//!
//! New links carry `hex(HMAC-SHA256(secret, email))`. Links already sitting
//! in inboxes carry `base64(email)`; those keep verifying while
//! `accept_legacy` is on.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::NewsletterConfig;
use crate::error::{NewsletterError, NewsletterResult};
use crate::models::normalize_email;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UnsubscribeTokens {
    mac: HmacSha256,
    site_url: String,
    accept_legacy: bool,
}

impl std::fmt::Debug for UnsubscribeTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsubscribeTokens")
            .field("site_url", &self.site_url)
            .field("accept_legacy", &self.accept_legacy)
            .finish_non_exhaustive()
    }
}

impl UnsubscribeTokens {
    pub fn new(secret: &str, site_url: impl Into<String>, accept_legacy: bool) -> NewsletterResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NewsletterError::Internal(format!("Invalid unsubscribe secret: {}", e)))?;
        Ok(Self {
            mac,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            accept_legacy,
        })
    }

    pub fn from_config(config: &NewsletterConfig) -> NewsletterResult<Self> {
        Self::new(
            &config.unsubscribe_secret,
            config.site_url.clone(),
            config.accept_legacy_tokens,
        )
    }

    pub fn encode(&self, email: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(normalize_email(email).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn encode_legacy(email: &str) -> String {
        STANDARD.encode(normalize_email(email))
    }

    pub fn decode_legacy(token: &str) -> Option<String> {
        let bytes = STANDARD.decode(token.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Constant-time for signed tokens.
    pub fn verify(&self, email: &str, token: &str) -> bool {
        let email = normalize_email(email);

        if let Ok(signature) = hex::decode(token.trim()) {
            let mut mac = self.mac.clone();
            mac.update(email.as_bytes());
            if mac.verify_slice(&signature).is_ok() {
                return true;
            }
        }

        self.accept_legacy
            && Self::decode_legacy(token).is_some_and(|decoded| normalize_email(&decoded) == email)
    }

    /// `{site}/api/newsletter/unsubscribe?email=..&token=..[&campaign=..]`
    pub fn build_unsubscribe_url(&self, email: &str, campaign_id: Option<Uuid>) -> String {
        let email = normalize_email(email);
        let mut url = format!(
            "{}/api/newsletter/unsubscribe?email={}&token={}",
            self.site_url,
            urlencoding::encode(&email),
            self.encode(&email)
        );
        if let Some(campaign_id) = campaign_id {
            url.push_str(&format!("&campaign={}", campaign_id));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(accept_legacy: bool) -> UnsubscribeTokens {
        UnsubscribeTokens::new("a-test-secret-that-is-long-enough-123", "https://pedals.example/", accept_legacy)
            .unwrap()
    }

    #[test]
    fn test_signed_token_verifies_for_same_email() {
        let codec = tokens(false);
        let token = codec.encode("Rider@Example.com");
        assert_eq!(token.len(), 64);
        assert!(codec.verify("rider@example.com", &token));
        assert!(!codec.verify("other@example.com", &token));
    }

    #[test]
    fn test_token_depends_on_secret() {
        let other = UnsubscribeTokens::new("another-secret-that-is-long-enough-456", "x", false).unwrap();
        let token = tokens(false).encode("a@b.co");
        assert!(!other.verify("a@b.co", &token));
    }

    #[test]
    fn test_legacy_token_round_trip() {
        let token = UnsubscribeTokens::encode_legacy("a@b.co");
        assert_eq!(token, "YUBiLmNv");
        assert_eq!(UnsubscribeTokens::decode_legacy(&token).as_deref(), Some("a@b.co"));
        assert_eq!(UnsubscribeTokens::decode_legacy("not base64!"), None);
    }

    #[test]
    fn test_legacy_acceptance_is_configurable() {
        let token = UnsubscribeTokens::encode_legacy("a@b.co");
        assert!(tokens(true).verify("a@b.co", &token));
        assert!(!tokens(false).verify("a@b.co", &token));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(!tokens(true).verify("a@b.co", "deadbeef"));
        assert!(!tokens(true).verify("a@b.co", ""));
    }

    #[test]
    fn test_unsubscribe_url_shape() {
        let codec = tokens(false);
        let campaign = Uuid::now_v7();
        let url = codec.build_unsubscribe_url("a+b@c.co", Some(campaign));

        assert!(url.starts_with("https://pedals.example/api/newsletter/unsubscribe?email=a%2Bb%40c.co&token="));
        assert!(url.ends_with(&format!("&campaign={}", campaign)));
        assert!(url.contains(&codec.encode("a+b@c.co")));
    }
}
