//! Request signatures.
//!
//! The signed message is the canonical form of the request parameters:
//! every key except `sign`, sorted byte-wise, rendered as `key=value` and
//! joined with `&`. Values are used verbatim with no URL-encoding. The
//! signature is the lowercase hex HMAC-SHA256 of that string.
//!
//! ```
//! use tollgate_auth::signature::{canonical_string, Params};
//!
//! let mut params = Params::new();
//! params.insert("timestamp".into(), "1700000000000".into());
//! params.insert("nonce".into(), "abc".into());
//! params.insert("sign".into(), "ignored".into());
//!
//! assert_eq!(canonical_string(&params), "nonce=abc&timestamp=1700000000000");
//! ```

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Name of the parameter that carries the signature itself.
pub const SIGN_FIELD: &str = "sign";

/// Request parameters. Ordered by key, which is the canonical order.
pub type Params = BTreeMap<String, String>;

/// Render the canonical string for `params`.
#[must_use]
pub fn canonical_string(params: &Params) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != SIGN_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the signature of `params` under `secret`.
///
/// # Errors
///
/// Returns `AuthError::Internal` if the key cannot initialize the MAC.
pub fn sign(params: &Params, secret: &[u8]) -> Result<String> {
    Ok(SignatureValidator::new(secret)?.sign(params))
}

/// Signs and verifies parameter sets with one shared secret.
#[derive(Clone)]
pub struct SignatureValidator {
    mac: HmacSha256,
}

impl SignatureValidator {
    /// Create a validator keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the key cannot initialize the MAC.
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| AuthError::Internal(format!("hmac key: {e}")))?;
        Ok(Self { mac })
    }

    /// Compute the lowercase hex signature of `params`.
    #[must_use]
    pub fn sign(&self, params: &Params) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical_string(params).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify `provided` against the signature of `params`.
    ///
    /// The comparison is constant-time.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSignature` on any mismatch, including a
    /// signature that is not valid hex.
    pub fn validate(&self, params: &Params, provided: &str) -> Result<()> {
        let provided = hex::decode(provided).map_err(|_| AuthError::InvalidSignature)?;

        let mut mac = self.mac.clone();
        mac.update(canonical_string(params).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn canonical_string_sorts_and_skips_sign() {
        let p = params(&[("b", "2"), ("a", "1"), ("sign", "zzz"), ("C", "3")]);
        // Byte-wise ordering puts uppercase before lowercase
        assert_eq!(canonical_string(&p), "C=3&a=1&b=2");
    }

    #[test]
    fn values_are_not_url_encoded() {
        let p = params(&[("q", "a b&c=d"), ("x", "ü")]);
        assert_eq!(canonical_string(&p), "q=a b&c=d&x=ü");
    }

    #[test]
    fn empty_params_sign_empty_string() {
        assert_eq!(canonical_string(&Params::new()), "");
        let sig = sign(&Params::new(), SECRET).unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn signs_the_canonical_string() {
        let validator = SignatureValidator::new(b"key").unwrap();
        let mut mac = HmacSha256::new_from_slice(b"key").unwrap();
        mac.update(b"msg=hello");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(validator.sign(&params(&[("msg", "hello")])), expected);
    }

    #[test]
    fn signature_is_deterministic_regardless_of_insertion_order() {
        let a = params(&[("timestamp", "1"), ("nonce", "n"), ("email", "u1@example.com")]);
        let b = params(&[("email", "u1@example.com"), ("timestamp", "1"), ("nonce", "n")]);
        assert_eq!(sign(&a, SECRET).unwrap(), sign(&b, SECRET).unwrap());
    }

    #[test]
    fn signature_changes_with_value_or_secret() {
        let base = params(&[("timestamp", "1"), ("nonce", "n")]);
        let changed = params(&[("timestamp", "2"), ("nonce", "n")]);

        let sig = sign(&base, SECRET).unwrap();
        assert_ne!(sig, sign(&changed, SECRET).unwrap());
        assert_ne!(sig, sign(&base, b"other-secret").unwrap());
    }

    #[test]
    fn signature_is_lowercase_hex() {
        let sig = sign(&params(&[("a", "1")]), SECRET).unwrap();
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn validate_accepts_matching_signature() {
        let validator = SignatureValidator::new(SECRET).unwrap();
        let mut p = params(&[("timestamp", "1"), ("nonce", "n")]);
        let sig = validator.sign(&p);

        // The sign field itself is excluded from the signed message
        p.insert(SIGN_FIELD.to_string(), sig.clone());
        assert!(validator.validate(&p, &sig).is_ok());
    }

    #[test]
    fn validate_rejects_mismatch() {
        let validator = SignatureValidator::new(SECRET).unwrap();
        let p = params(&[("timestamp", "1"), ("nonce", "n")]);
        let mut sig = validator.sign(&p);
        sig.replace_range(0..1, if sig.starts_with('0') { "1" } else { "0" });

        assert!(matches!(
            validator.validate(&p, &sig),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn validate_rejects_non_hex_and_truncated() {
        let validator = SignatureValidator::new(SECRET).unwrap();
        let p = params(&[("a", "1")]);
        let sig = validator.sign(&p);

        assert!(validator.validate(&p, "not-hex").is_err());
        assert!(validator.validate(&p, &sig[..32]).is_err());
        assert!(validator.validate(&p, "").is_err());
    }
}
