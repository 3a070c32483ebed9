//! Cryptographic primitives shared by the session, group and handshake layers.

use crate::Error;
use crate::types::{X25519PublicKey, X25519Secret};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Block size used for plaintext padding.
pub const PADDING_BLOCK_SIZE: usize = 16;

/// Generates a cryptographically secure random 32-byte seed.
pub(crate) fn generate_random_seed() -> Result<Box<[u8; 32]>, Error> {
    let mut seed = Box::new([0u8; 32]);
    OsRng
        .try_fill_bytes(seed.as_mut_slice())
        .map_err(|_| Error::Random)?;
    Ok(seed)
}

/// Random 31-bit identifier, as used for sender key ids.
pub(crate) fn random_key_id() -> Result<u32, Error> {
    let value = OsRng.try_next_u32().map_err(|_| Error::Random)?;
    Ok(value & 0x7fff_ffff)
}

/// Random registration id in `1..=16380`.
pub(crate) fn generate_registration_id() -> Result<u32, Error> {
    let value = OsRng.try_next_u32().map_err(|_| Error::Random)?;
    Ok(value % 16380 + 1)
}

/// X25519 agreement between `our_secret` and `their_public`.
pub fn dh(
    our_secret: &X25519Secret,
    their_public: &X25519PublicKey,
) -> Result<Zeroizing<[u8; 32]>, Error> {
    our_secret.dh(their_public)
}

/// Ed25519 signature over `message`.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> [u8; 64] {
    signing_key.sign(message).to_bytes()
}

/// Verifies an Ed25519 signature.
///
/// A wrong signature returns `Ok(false)`; only malformed signature bytes are an error.
pub fn verify(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, Error> {
    let signature = Signature::from_slice(signature)
        .map_err(|err| Error::Crypto(format!("Malformed signature: {err}")))?;
    Ok(verifying_key.verify_strict(message, &signature).is_ok())
}

/// HKDF-Extract with SHA-256.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> Zeroizing<[u8; 32]> {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&prk);
    out
}

/// HKDF-Expand with SHA-256; `prk` must be at least 32 bytes.
pub fn hkdf_expand(prk: &[u8], info: &[u8], length: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
    let hkdf = Hkdf::<Sha256>::from_prk(prk)
        .map_err(|_| Error::Crypto("HKDF pseudo-random key too short".to_string()))?;
    let mut okm = Zeroizing::new(vec![0u8; length]);
    hkdf.expand(info, okm.as_mut_slice())
        .map_err(|_| Error::Crypto(format!("HKDF cannot produce {length} bytes")))?;
    Ok(okm)
}

/// Extract-then-expand. A `None` salt is 32 zero bytes.
pub fn derive_secrets(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let prk = hkdf_extract(salt.unwrap_or(&[0u8; 32]), ikm);
    hkdf_expand(prk.as_slice(), info, length)
}

/// HMAC-SHA-256 over `data`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], Error> {
    hmac_sha256_parts(key, &[data])
}

/// HMAC-SHA-256 over the concatenation of `parts`.
pub fn hmac_sha256_parts(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|err| Error::Crypto(format!("HMAC initialization failed: {err}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time check of a truncated HMAC-SHA-256 tag over `parts`.
pub fn hmac_sha256_verify_truncated(
    key: &[u8],
    parts: &[&[u8]],
    tag: &[u8],
) -> Result<bool, Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|err| Error::Crypto(format!("HMAC initialization failed: {err}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.verify_truncated_left(tag).is_ok())
}

/// AES-256-CBC with PKCS#7 padding.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|err| Error::Crypto(format!("Invalid AES-CBC key or IV: {err}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Reverses [`aes_cbc_encrypt`]; bad padding is a decryption failure.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|err| Error::Crypto(format!("Invalid AES-CBC key or IV: {err}")))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailure("Invalid CBC padding".to_string()))
}

/// Builds the 96-bit GCM nonce `0x00000000 || be64(counter)`.
pub fn counter_nonce(counter: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[4..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// AES-256-GCM with a 128-bit tag appended to the ciphertext.
pub fn aes_gcm_encrypt(
    key: &[u8],
    nonce: &[u8; 12],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, Error> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|err| Error::Crypto(format!("Invalid AES-GCM key: {err}")))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::Crypto("AES-GCM encryption failed".to_string()))
}

/// Opens a sealed [`aes_gcm_encrypt`] payload, checking the tag against `aad`.
pub fn aes_gcm_decrypt(
    key: &[u8],
    nonce: &[u8; 12],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, Error> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|err| Error::Crypto(format!("Invalid AES-GCM key: {err}")))?;
    Ok(cipher.decrypt(
        Nonce::from_slice(nonce),
        Payload {
            msg: ciphertext,
            aad,
        },
    )?)
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-1 digest.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    ::sha1::Sha1::digest(data).into()
}

/// MD5 digest.
pub fn md5(data: &[u8]) -> [u8; 16] {
    ::md5::Md5::digest(data).into()
}

/// Pads `plaintext` to a multiple of 16 bytes; every pad byte holds the pad length (1..=16).
///
/// Applied by the message encoder to the serialized message body before it is
/// handed to [`SessionManager::cipher`](crate::SessionManager::cipher); the
/// session ciphers only add PKCS#7.
pub fn pad_message(plaintext: &[u8]) -> Vec<u8> {
    let padding = PADDING_BLOCK_SIZE - plaintext.len() % PADDING_BLOCK_SIZE;
    let mut padded = Vec::with_capacity(plaintext.len() + padding);
    padded.extend_from_slice(plaintext);
    padded.resize(plaintext.len() + padding, padding as u8);
    padded
}

/// Strips padding added by [`pad_message`] from a deciphered message body.
pub fn unpad_message(padded: &[u8]) -> Result<&[u8], Error> {
    let Some(&last) = padded.last() else {
        return Err(Error::InvalidMessage("Empty padded message".to_string()));
    };

    let padding = usize::from(last);
    if padding == 0 || padding > PADDING_BLOCK_SIZE || padding > padded.len() {
        return Err(Error::InvalidMessage(format!("Invalid padding length {padding}")));
    }

    let (body, pad) = padded.split_at(padded.len() - padding);
    if pad.iter().any(|&byte| byte != last) {
        return Err(Error::InvalidMessage("Inconsistent padding bytes".to_string()));
    }
    Ok(body)
}
