//! Secret generator for production deployment.
//!
//! One-shot CLI: prints a signing secret, an encryption key, and a suggested
//! database password to stdout. Nothing else in the workspace depends on it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::Rng;
use rand::RngCore;
use rand::rngs::OsRng;

const JWT_SECRET_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(alphabet: &[u8], length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Signing secret for token issuance.
fn generate_jwt_secret(length: usize) -> String {
    random_string(JWT_SECRET_ALPHABET, length)
}

/// URL-safe base64 encoding of 32 random bytes.
fn generate_encryption_key() -> String {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    URL_SAFE.encode(key)
}

fn generate_database_password(length: usize) -> String {
    random_string(PASSWORD_ALPHABET, length)
}

fn main() {
    println!("Generating secure keys for production deployment...\n");

    let jwt_secret = generate_jwt_secret(64);
    let encryption_key = generate_encryption_key();
    let db_password = generate_database_password(32);

    println!("Add these to your .env file:");
    println!("{}", "=".repeat(50));
    println!("JWT_SECRET={jwt_secret}");
    println!("ENCRYPTION_KEY={encryption_key}");
    println!("# Suggested database password: {db_password}");
    println!("{}", "=".repeat(50));
    println!("\nIMPORTANT: Store these keys securely and never commit them to version control!");
}
