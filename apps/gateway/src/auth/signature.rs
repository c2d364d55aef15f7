//! HMAC verification of the session cookie's signature prefix.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{AuthError, SessionCookieValue};

type HmacSha256 = Hmac<Sha256>;

/// Verifies cookies signed by the HTTP session layer with a shared secret.
///
/// The signature is the unpadded standard base64 of `HMAC-SHA256(secret, raw_key)`,
/// optionally preceded by an `s:` marker.
///
/// Not interoperable with `express-session` cookies. Those are laid out as
/// `s:<sid>.<sig>`, with the signature after the dot, while this gateway reads
/// `<signature>.<rawKey>`. The HTTP layer must mint cookies in the latter
/// layout for verification to succeed.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }

    /// Produce the signature the HTTP layer would attach to `raw_key`.
    pub fn sign(&self, raw_key: &str) -> String {
        let mut mac = self.mac();
        mac.update(raw_key.as_bytes());
        STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of the cookie's signature against its raw key.
    pub fn verify(&self, cookie: &SessionCookieValue) -> Result<(), AuthError> {
        let signature = cookie.signature.strip_prefix("s:").unwrap_or(&cookie.signature);
        let expected = STANDARD_NO_PAD
            .decode(signature.trim_end_matches('='))
            .map_err(|_| AuthError::BadSignature)?;

        let mut mac = self.mac();
        mac.update(cookie.raw_key.as_bytes());
        mac.verify_slice(&expected).map_err(|_| AuthError::BadSignature)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}
