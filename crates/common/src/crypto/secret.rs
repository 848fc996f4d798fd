//! Content encryption using ChaCha20-Poly1305
//!
//! Every file gets its own `Secret` and `Iv`. File content is encrypted
//! once under that exact pair. Small metadata fields stored next to it
//! (name, size, timestamps, storage hash) are sealed under the same key
//! with a fresh random nonce each, so no nonce is ever reused with the
//! same key.

use std::fmt;
use std::io::Read;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of ChaCha20-Poly1305 nonce in bytes (96 bits)
pub const IV_SIZE: usize = 12;
/// Size of the Poly1305 authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Wrong key, wrong IV, or the ciphertext was corrupted or tampered with
    #[error("decryption failed")]
    Decryption,
    #[error("encryption failed")]
    Encryption,
    #[error("invalid encoding: {0}")]
    Encoding(String),
    #[error("randomness source failed: {0}")]
    Randomness(String),
    #[error("key error: {0}")]
    Key(#[from] super::KeyError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).map_err(|e| CryptoError::Randomness(e.to_string()))?;
    Ok(buff)
}

fn decode_fixed<const N: usize>(hex: &str, what: &str) -> Result<[u8; N], CryptoError> {
    let mut buff = [0u8; N];
    hex::decode_to_slice(hex, &mut buff)
        .map_err(|e| CryptoError::Encoding(format!("{what}: {e}")))?;
    Ok(buff)
}

/// A 256-bit symmetric key for a single file
#[derive(PartialEq, Eq, Clone)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

/// A 96-bit nonce paired with a file's `Secret`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Iv([u8; IV_SIZE]);

impl From<[u8; IV_SIZE]> for Iv {
    fn from(bytes: [u8; IV_SIZE]) -> Self {
        Iv(bytes)
    }
}

impl Iv {
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(random_bytes()?))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; IV_SIZE] = data.try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "invalid iv size, expected {}, got {}",
                IV_SIZE,
                data.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self(decode_fixed(hex, "iv")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(random_bytes()?))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SECRET_SIZE] = data.try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        Ok(Self(decode_fixed(hex, "secret")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt data under this key and the given IV
    ///
    /// Output is `ciphertext || tag`. The same (key, iv, data) triple
    /// always produces the same output.
    pub fn encrypt(&self, iv: &Iv, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .encrypt(Nonce::from_slice(&iv.0), data)
            .map_err(|_| CryptoError::Encryption)
    }

    /// Reverse of [`Secret::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the key or IV does not
    /// match, or if the ciphertext fails authentication.
    pub fn decrypt(&self, iv: &Iv, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .decrypt(Nonce::from_slice(&iv.0), data)
            .map_err(|_| CryptoError::Decryption)
    }

    /// Encrypt a whole file read from `reader`
    ///
    /// The content is buffered in memory and treated as opaque bytes.
    pub fn encrypt_file<R>(&self, iv: &Iv, reader: R) -> Result<Vec<u8>, CryptoError>
    where
        R: Read,
    {
        let mut data = Vec::new();
        let mut reader = reader;
        reader.read_to_end(&mut data)?;
        self.encrypt(iv, &data)
    }

    pub fn decrypt_file(&self, iv: &Iv, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.decrypt(iv, data)
    }

    /// Encrypt a small value with a fresh random nonce
    ///
    /// Output is `nonce (12 bytes) || ciphertext || tag`.
    pub fn seal(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv = Iv::generate()?;
        let ciphertext = self.encrypt(&iv, data)?;

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv.0);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Reverse of [`Secret::seal`]
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < IV_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption);
        }
        let iv = Iv::from_slice(&data[..IV_SIZE])?;
        self.decrypt(&iv, &data[IV_SIZE..])
    }

    /// Seal a string field and hex encode the result
    pub fn seal_str(&self, value: &str) -> Result<String, CryptoError> {
        Ok(hex::encode(self.seal(value.as_bytes())?))
    }

    /// Open a hex encoded sealed string field
    pub fn open_str(&self, sealed: &str) -> Result<String, CryptoError> {
        let data = hex::decode(sealed).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        String::from_utf8(self.open(&data)?).map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_secret_encrypt_decrypt() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let data = b"hello world, this is a test message for encryption";

        let encrypted = secret.encrypt(&iv, data).unwrap();
        assert_eq!(encrypted.len(), data.len() + TAG_SIZE);
        let decrypted = secret.decrypt(&iv, &encrypted).unwrap();

        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_encrypt_is_deterministic_for_key_and_iv() {
        let secret = Secret::from([3u8; SECRET_SIZE]);
        let iv = Iv::from([9u8; IV_SIZE]);
        assert_eq!(
            secret.encrypt(&iv, b"same input").unwrap(),
            secret.encrypt(&iv, b"same input").unwrap()
        );
    }

    #[test]
    fn test_binary_file_roundtrip() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();
        // every byte value, including sequences that are not valid UTF-8
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let encrypted = secret.encrypt_file(&iv, Cursor::new(data.clone())).unwrap();
        let decrypted = secret.decrypt_file(&iv, &encrypted).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_empty_data_roundtrip() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();

        let encrypted = secret.encrypt(&iv, b"").unwrap();
        assert_eq!(secret.decrypt(&iv, &encrypted).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_wrong_key_or_iv_fails() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let encrypted = secret.encrypt(&iv, b"payload").unwrap();

        let other_secret = Secret::generate().unwrap();
        assert!(matches!(
            other_secret.decrypt(&iv, &encrypted),
            Err(CryptoError::Decryption)
        ));

        let other_iv = Iv::generate().unwrap();
        assert!(matches!(
            secret.decrypt(&other_iv, &encrypted),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let mut encrypted = secret.encrypt(&iv, b"test data for integrity check").unwrap();
        encrypted[4] ^= 0xFF;

        assert!(matches!(
            secret.decrypt(&iv, &encrypted),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_seal_uses_fresh_nonces() {
        let secret = Secret::generate().unwrap();
        let a = secret.seal(b"report.pdf").unwrap();
        let b = secret.seal(b"report.pdf").unwrap();
        assert_ne!(a, b);
        assert_eq!(secret.open(&a).unwrap(), b"report.pdf");
        assert_eq!(secret.open(&b).unwrap(), b"report.pdf");
    }

    #[test]
    fn test_seal_str_roundtrip() {
        let secret = Secret::generate().unwrap();
        let sealed = secret.seal_str("2024-05-01T10:00:00Z").unwrap();
        assert!(sealed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(secret.open_str(&sealed).unwrap(), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_open_short_input() {
        let secret = Secret::generate().unwrap();
        assert!(matches!(secret.open(&[0u8; 4]), Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_size_validation() {
        assert!(Secret::from_slice(&[1u8; 16]).is_err());
        assert!(Secret::from_slice(&[1u8; 64]).is_err());
        assert!(Secret::from_slice(&[1u8; SECRET_SIZE]).is_ok());
        assert!(Iv::from_slice(&[1u8; 8]).is_err());
        assert!(Iv::from_slice(&[1u8; IV_SIZE]).is_ok());
    }

    #[test]
    fn test_hex_roundtrip() {
        let secret = Secret::generate().unwrap();
        let iv = Iv::generate().unwrap();
        assert_eq!(Secret::from_hex(&secret.to_hex()).unwrap(), secret);
        assert_eq!(Iv::from_hex(&iv.to_hex()).unwrap(), iv);
        assert_eq!(secret.to_hex().len(), 2 * SECRET_SIZE);
        assert_eq!(iv.to_hex().len(), 2 * IV_SIZE);
    }
}
