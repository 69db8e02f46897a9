use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

pub const KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 12;

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("ciphertext missing nonce")]
    MissingNonce,
    #[error("encryption failure")]
    EncryptFailure,
    #[error("decryption failure")]
    DecryptFailure,
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

/// 256-bit symmetric key used for authenticated encryption (AES-256-GCM).
///
/// Key bytes are wiped from memory when the value is dropped and never
/// appear in `Debug` output.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LENGTH]>);

impl SymmetricKey {
    /// Construct a key from a base64-encoded string.
    pub fn from_base64(value: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(BASE64_STANDARD.decode(value.trim())?);
        Self::from_bytes(decoded.as_slice())
    }

    /// Construct a key from raw bytes.
    pub fn from_bytes<B>(bytes: B) -> Result<Self, CryptoError>
    where
        B: AsRef<[u8]>,
    {
        let slice = bytes.as_ref();
        if slice.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: slice.len(),
            });
        }
        let mut array = [0u8; KEY_LENGTH];
        array.copy_from_slice(slice);
        Ok(Self(Zeroizing::new(array)))
    }

    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(bytes))
    }

    /// Base64 form, for provisioning tooling.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.0.as_slice())
    }

    /// Encrypt `plaintext`, binding `aad` as associated data.
    ///
    /// Output layout is `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        seal_with_key(&self.0, plaintext, aad)
    }

    /// Reverse of [`SymmetricKey::seal`]. Fails if the key, the ciphertext
    /// or the associated data do not match.
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        open_with_key(&self.0, sealed, aad)
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        // Only used for configuration sanity checks, never on secrets from requests.
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for SymmetricKey {}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

fn seal_with_key(
    key: &[u8; KEY_LENGTH],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: key.len(),
    })?;
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptFailure)?;
    let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.append(&mut ciphertext);
    Ok(output)
}

fn open_with_key(
    key: &[u8; KEY_LENGTH],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() <= NONCE_LENGTH {
        return Err(CryptoError::MissingNonce);
    }
    let (nonce_bytes, encrypted) = sealed.split_at(NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: key.len(),
    })?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: encrypted,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptFailure)
}
