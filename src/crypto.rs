//! Token generation and hashing for invitation links.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Default number of random bytes in a generated token.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generates a cryptographically secure random token.
///
/// The token is `bytes` random bytes from the OS RNG, hex-encoded, so the
/// returned string is `2 * bytes` characters long. The default of 32 bytes
/// gives 256 bits of entropy.
///
/// # Example
///
/// ```rust
/// use bailiwick::crypto::generate_token;
///
/// let token = generate_token(32);
/// assert_eq!(token.len(), 64);
/// ```
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Generates a token with the default length (32 bytes, 64 hex characters).
pub fn generate_token_default() -> String {
    generate_token(DEFAULT_TOKEN_BYTES)
}

/// Hashes a token using SHA-256 for storage.
/// Unlike passwords, tokens are high-entropy random strings,
/// so a fast hash like SHA-256 is appropriate.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
