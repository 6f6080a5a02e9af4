/// CAPTCHA verification
///
/// The security gate hands the client's CAPTCHA token to a [`CaptchaVerifier`].
/// Verification fails closed: a verifier that cannot reach the provider, or has
/// no secret configured, returns an error, and the caller treats every error as
/// a rejection.
///
/// [`HttpCaptchaVerifier`] speaks the siteverify protocol shared by reCAPTCHA,
/// hCaptcha and Turnstile: a form POST of `secret`, `response` and optional
/// `remoteip`, answered with `{"success": bool, "error-codes": [...]}`.
///
/// # Example
///
/// ```no_run
/// use brightline_shared::security::captcha::{CaptchaVerifier, HttpCaptchaVerifier};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = HttpCaptchaVerifier::new(
///     reqwest::Client::new(),
///     Some("secret".to_string()),
///     "https://www.google.com/recaptcha/api/siteverify",
/// );
///
/// let accepted = verifier.verify("token-from-client", None).await?;
/// println!("human: {}", accepted);
/// # Ok(())
/// # }
/// ```

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default siteverify endpoint (Google reCAPTCHA)
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Error type for CAPTCHA verification
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    /// No secret key configured, so nothing can be verified
    #[error("CAPTCHA verification is not configured")]
    NotConfigured,

    /// The provider could not be reached or answered with an error status
    #[error("CAPTCHA provider request failed: {0}")]
    Request(String),

    /// The provider answered with a body we could not read
    #[error("Invalid CAPTCHA provider response: {0}")]
    InvalidResponse(String),
}

/// Verifies CAPTCHA tokens against an external provider
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Returns `Ok(true)` if the provider accepted the token, `Ok(false)` if it
    /// rejected it
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,

    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Siteverify-protocol verifier over HTTP
#[derive(Debug, Clone)]
pub struct HttpCaptchaVerifier {
    client: reqwest::Client,
    secret: Option<String>,
    verify_url: String,
}

impl HttpCaptchaVerifier {
    /// Creates a verifier; `secret = None` makes every verification fail
    /// with [`CaptchaError::NotConfigured`]
    pub fn new(client: reqwest::Client, secret: Option<String>, verify_url: impl Into<String>) -> Self {
        Self {
            client,
            secret: secret.filter(|s| !s.is_empty()),
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for HttpCaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        let secret = self.secret.as_deref().ok_or(CaptchaError::NotConfigured)?;

        let mut form = vec![("secret", secret.to_string()), ("response", token.to_string())];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CaptchaError::Request(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "CAPTCHA provider returned an error status");
            return Err(CaptchaError::Request(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        if !body.success {
            debug!(error_codes = ?body.error_codes, "CAPTCHA token rejected");
        }

        Ok(body.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn verifier(url: String) -> HttpCaptchaVerifier {
        HttpCaptchaVerifier::new(reqwest::Client::new(), Some("test-secret".to_string()), url)
    }

    #[tokio::test]
    async fn test_accepts_valid_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/siteverify")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("secret".into(), "test-secret".into()),
                Matcher::UrlEncoded("response".into(), "good-token".into()),
                Matcher::UrlEncoded("remoteip".into(), "203.0.113.9".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let result = verifier(format!("{}/siteverify", server.url()))
            .verify("good-token", Some("203.0.113.9".parse().unwrap()))
            .await;

        mock.assert_async().await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_invalid_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/siteverify")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "error-codes": ["invalid-input-response"]}"#)
            .create_async()
            .await;

        let result = verifier(format!("{}/siteverify", server.url()))
            .verify("bad-token", None)
            .await;

        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_provider_error_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/siteverify")
            .with_status(503)
            .create_async()
            .await;

        let result = verifier(format!("{}/siteverify", server.url()))
            .verify("token", None)
            .await;

        assert!(matches!(result, Err(CaptchaError::Request(_))));
    }

    #[tokio::test]
    async fn test_garbled_response_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/siteverify")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let result = verifier(format!("{}/siteverify", server.url()))
            .verify("token", None)
            .await;

        assert!(matches!(result, Err(CaptchaError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_secret_fails_closed() {
        let verifier = HttpCaptchaVerifier::new(reqwest::Client::new(), None, DEFAULT_VERIFY_URL);
        assert!(matches!(
            verifier.verify("token", None).await,
            Err(CaptchaError::NotConfigured)
        ));

        let verifier =
            HttpCaptchaVerifier::new(reqwest::Client::new(), Some(String::new()), DEFAULT_VERIFY_URL);
        assert!(matches!(
            verifier.verify("token", None).await,
            Err(CaptchaError::NotConfigured)
        ));
    }
}
