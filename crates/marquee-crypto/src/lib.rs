/// Marquee Crypto Library
///
/// One-way secrets for the record store: Argon2id password hashes for
/// accounts and SHA-256 digests for opaque bearer tokens. Neither module
/// ever exposes a plaintext once it has been hashed and cleared.

pub mod password;
pub mod token;
