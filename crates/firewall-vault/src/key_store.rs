//! Encrypted key envelope: a versioned binary format (magic header, KDF
//! salt, AEAD nonce, authenticated ciphertext) built on `argon2` and
//! `chacha20poly1305`.
//!
//! Format V1:
//! `[ Magic: "TXFWKEY1" (8) ][ Version: u16 BE (2) ][ Salt: 16B ][ Nonce: 12B ][ Ciphertext + Tag ]`

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use firewall_types::FirewallError;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

const HEADER_MAGIC: &[u8; 8] = b"TXFWKEY1";
const HEADER_VERSION: u16 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEK_LEN: usize = 32;
const HEADER_LEN: usize = 8 + 2 + SALT_LEN + NONCE_LEN;

/// A byte buffer that zeroizes its contents on drop, for decrypted key
/// material that must not linger in process memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(pub Vec<u8>);

fn derive_kek(vault_secret: &[u8], salt: &[u8]) -> Result<[u8; KEK_LEN], FirewallError> {
    let mut kek = [0u8; KEK_LEN];
    Argon2::default()
        .hash_password_into(vault_secret, salt, &mut kek)
        .map_err(|e| FirewallError::Io(format!("key derivation failed: {e}")))?;
    Ok(kek)
}

/// Encrypts `secret` under a key derived from `vault_secret` (the vault's
/// process-lifetime master secret), returning the versioned envelope.
pub fn encrypt_key(secret: &[u8], vault_secret: &[u8]) -> Result<Vec<u8>, FirewallError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_bytes);

    let mut kek = derive_kek(vault_secret, &salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&kek));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, secret)
        .map_err(|_| FirewallError::Io("key encryption failed".into()))?;
    kek.zeroize();

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(HEADER_MAGIC);
    out.extend_from_slice(&HEADER_VERSION.to_be_bytes());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts an envelope produced by [`encrypt_key`].
pub fn decrypt_key(data: &[u8], vault_secret: &[u8]) -> Result<SensitiveBytes, FirewallError> {
    if data.len() < HEADER_LEN {
        return Err(FirewallError::Io("key envelope too short".into()));
    }
    if &data[0..8] != HEADER_MAGIC {
        return Err(FirewallError::Io("invalid key envelope signature".into()));
    }
    let version = u16::from_be_bytes(data[8..10].try_into().unwrap());
    if version != HEADER_VERSION {
        return Err(FirewallError::Io(format!(
            "unsupported key envelope version: {version}"
        )));
    }
    let salt = &data[10..10 + SALT_LEN];
    let nonce_bytes = &data[10 + SALT_LEN..HEADER_LEN];
    let ciphertext = &data[HEADER_LEN..];

    let mut kek = derive_kek(vault_secret, salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&kek));
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| FirewallError::Io("key decryption failed: wrong secret or corrupted envelope".into()))?;
    kek.zeroize();

    Ok(SensitiveBytes(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_recovers_original_secret() {
        let secret = b"correct horse battery staple seed material";
        let vault_secret = b"process-local-vault-master-secret";
        let envelope = encrypt_key(secret, vault_secret).unwrap();
        assert_eq!(&envelope[0..8], HEADER_MAGIC);
        let decrypted = decrypt_key(&envelope, vault_secret).unwrap();
        assert_eq!(decrypted.0, secret);
    }

    #[test]
    fn wrong_vault_secret_fails_to_decrypt() {
        let envelope = encrypt_key(b"secret", b"correct-secret").unwrap();
        assert!(decrypt_key(&envelope, b"wrong-secret").is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let mut envelope = encrypt_key(b"secret", b"vault-secret").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(decrypt_key(&envelope, b"vault-secret").is_err());
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        assert!(decrypt_key(&[0u8; 4], b"vault-secret").is_err());
    }
}
