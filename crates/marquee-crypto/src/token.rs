use sha2::{Digest, Sha256};

/// Scope for tokens mailed out to activate a new account.
pub const SCOPE_ACTIVATION: &str = "activation";

/// Scope for stateful bearer tokens presented on API requests.
pub const SCOPE_AUTHENTICATION: &str = "authentication";

/// SHA-256 digest of a bearer token's plaintext. This is the only form of
/// a token that is ever stored or compared.
pub fn token_hash(plaintext: &str) -> [u8; 32] {
    Sha256::digest(plaintext.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_sha256() {
        // sha256("abc")
        let expected: [u8; 32] = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
            0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
            0xf2, 0x00, 0x15, 0xad,
        ];
        assert_eq!(token_hash("abc"), expected);
    }

    #[test]
    fn distinct_tokens_distinct_digests() {
        assert_ne!(token_hash("Y3QMGX3PJ3WLRL2YRTQGQ6KRHU"), token_hash("Y3QMGX3PJ3WLRL2YRTQGQ6KRHV"));
    }
}
