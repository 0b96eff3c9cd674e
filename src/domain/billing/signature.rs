//! Gateway request signing and callback verification.
//!
//! Signing string: every non-empty parameter except `sign` and `sign_type`,
//! sorted by key, joined as `k=v` pairs with `&`, followed directly by the
//! merchant secret. The signature is the lower-case hex MD5 of that string.

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::notification::GatewayParams;

/// Parameter carrying the signature.
pub const SIGN_FIELD: &str = "sign";

/// Parameter naming the signature algorithm.
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// The only algorithm the gateway speaks.
pub const SIGN_TYPE_MD5: &str = "MD5";

/// Signs and verifies gateway parameter maps with one merchant secret.
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    secret: SecretString,
}

impl SignatureEngine {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Builds the string that gets hashed, without the secret.
    pub fn canonical_string<K, V>(params: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(K, V)> = params
            .into_iter()
            .filter(|(k, v)| {
                let key = k.as_ref();
                !v.as_ref().is_empty() && key != SIGN_FIELD && key != SIGN_TYPE_FIELD
            })
            .collect();
        pairs.sort_by(|a, b| a.0.as_ref().as_bytes().cmp(b.0.as_ref().as_bytes()));

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Lower-case hex signature over `params`.
    ///
    /// Depends only on the key/value content, never on iteration order.
    pub fn sign<K, V>(&self, params: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut payload = Self::canonical_string(params);
        payload.push_str(self.secret.expose_secret());
        hex::encode(Md5::digest(payload.as_bytes()))
    }

    /// Returns `params` with `sign_type` and `sign` filled in.
    pub fn signed(&self, mut params: GatewayParams) -> GatewayParams {
        params.insert(SIGN_TYPE_FIELD.to_string(), SIGN_TYPE_MD5.to_string());
        let signature = self.sign(params.iter());
        params.insert(SIGN_FIELD.to_string(), signature);
        params
    }

    /// Checks the `sign` field of a callback.
    ///
    /// Missing or empty signatures fail. Hex case is ignored and the
    /// comparison runs in constant time for equal-length inputs.
    pub fn verify(&self, params: &GatewayParams) -> bool {
        let supplied = match params.get(SIGN_FIELD) {
            Some(sign) if !sign.is_empty() => sign.to_ascii_lowercase(),
            _ => return false,
        };
        let expected = self.sign(params.iter());
        constant_time_compare(supplied.as_bytes(), expected.as_bytes())
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
