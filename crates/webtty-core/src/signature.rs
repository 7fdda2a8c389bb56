//! Signed-URL verification.
//!
//! A connection is admitted only if its referring URL proves approval by a
//! holder of the server's signing secret. The token is the `signed` query
//! parameter: a hex-encoded HMAC-SHA256 over the canonical URL, which is the
//! URL with the `signed` parameter removed and every other query parameter
//! kept in its original order.
//!
//! Verification is symmetric and fail-closed: if either a secret is
//! configured or a token is present, both must be present and the signature
//! must validate. The only accepted unsigned case is the absence of both.
//! No expiry is enforced here; a validity window, if any, is the token
//! issuer's concern.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::{Position, Url};

use crate::constants::SIGNATURE_PARAM;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Split a URL into its canonical form and the signature token, if any.
///
/// Works on the raw query text so the original parameter order and
/// percent-encoding survive untouched.
fn canonical_and_token(url: &Url) -> (String, Option<String>) {
    let mut token = None;
    let mut kept: Vec<&str> = Vec::new();
    let prefix = format!("{}=", SIGNATURE_PARAM);

    if let Some(query) = url.query() {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix(prefix.as_str()) {
                token = Some(value.to_string());
            } else if !pair.is_empty() {
                kept.push(pair);
            }
        }
    }

    // AfterPath excludes the '?' delimiter; it is re-added only when
    // parameters survive, so signing and verifying agree on the exact
    // canonical string.
    let mut canonical = url[..Position::AfterPath].to_string();
    if !kept.is_empty() {
        canonical.push('?');
        canonical.push_str(&kept.join("&"));
    }

    (canonical, token)
}

fn compute_token(canonical: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a URL with the given secret, returning the URL with the `signed`
/// token appended.
///
/// Used by token issuers and tests; the server itself only verifies.
pub fn sign(url: &str, secret: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::Config {
        message: format!("cannot sign unparseable url: {}", e),
    })?;

    let (canonical, existing) = canonical_and_token(&parsed);
    if existing.is_some() {
        return Err(Error::Config {
            message: "url already carries a signature token".to_string(),
        });
    }

    let token = compute_token(&canonical, secret);
    let separator = if canonical.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}{}={}",
        canonical, separator, SIGNATURE_PARAM, token
    ))
}

/// Verify the referring URL against the configured secret.
///
/// - No secret configured and no token present: accepted (open mode).
/// - Otherwise a secret, a parseable referer, and a matching token are all
///   required; any missing half or mismatch yields [`Error::Unverified`].
pub fn verify(referer: Option<&str>, secret: Option<&str>) -> Result<()> {
    let parsed = referer.map(Url::parse);

    let (canonical, token) = match &parsed {
        Some(Ok(url)) => {
            let (canonical, token) = canonical_and_token(url);
            (Some(canonical), token)
        }
        // An unparseable referer cannot carry a valid token.
        Some(Err(_)) | None => (None, None),
    };

    match (secret, token) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(Error::Unverified {
            message: "signature token present but no signing secret configured".to_string(),
        }),
        (Some(_), None) => Err(Error::Unverified {
            message: "signing secret configured but no signature token present".to_string(),
        }),
        (Some(secret), Some(token)) => {
            let canonical = canonical.ok_or_else(|| Error::Unverified {
                message: "referer missing or unparseable".to_string(),
            })?;

            let raw = hex::decode(token.as_bytes()).map_err(|_| Error::Unverified {
                message: "signature token is not valid hex".to_string(),
            })?;

            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts keys of any length");
            mac.update(canonical.as_bytes());
            mac.verify_slice(&raw).map_err(|_| Error::Unverified {
                message: "signature mismatch".to_string(),
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
