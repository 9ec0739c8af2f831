use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Bytes of entropy in every issued token.
const TOKEN_BYTES: usize = 32;

/// Generates a URL-safe one-time token from the OS CSPRNG.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}

/// SHA-256 hex digest of a token. Only this value is ever persisted.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Compares a presented token against a stored fingerprint.
pub fn matches_fingerprint(token: &str, stored: &str) -> bool {
    let presented = fingerprint(token);
    presented.len() == stored.len()
        && presented
            .bytes()
            .zip(stored.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
