//! AES field encryption.
//!
//! [`AesCipher`] turns a string into `base64url(nonce || ciphertext || tag)` using AES-GCM, and
//! back. The key length picks the AES variant: 16, 24 or 32 bytes.
//!
//! [`encrypt_fields`] and [`decrypt_fields`] apply the cipher to every non-empty field a record
//! declares with `#[record(encrypt = "aes")]`. Both are all-or-nothing: if any field fails, the
//! record is left exactly as it was.

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
    aead::{Aead, KeyInit, consts::U12},
    aes::Aes192,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use rand::RngCore;
use std::fmt;

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    record::Record,
};

/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

enum Variant {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// AES-GCM cipher producing URL-safe base64 strings.
pub struct AesCipher {
    variant: Variant,
}

impl AesCipher {
    /// Creates a cipher from a 16, 24 or 32 byte key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Crypto`] for any other key length.
    pub fn new(key: &[u8]) -> RecordStoreResult<Self> {
        let variant = match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(Variant::Aes128),
            24 => Aes192Gcm::new_from_slice(key).map(Variant::Aes192),
            32 => Aes256Gcm::new_from_slice(key).map(Variant::Aes256),
            len => return Err(RecordStoreError::Crypto(format!("invalid key size {len}"))),
        }
        .map_err(|e| RecordStoreError::Crypto(e.to_string()))?;

        Ok(Self { variant })
    }

    /// Encrypts `plaintext` with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> RecordStoreResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = match &self.variant {
            Variant::Aes128(cipher) => cipher.encrypt(nonce, plaintext.as_bytes()),
            Variant::Aes192(cipher) => cipher.encrypt(nonce, plaintext.as_bytes()),
            Variant::Aes256(cipher) => cipher.encrypt(nonce, plaintext.as_bytes()),
        }
        .map_err(|_| RecordStoreError::Crypto("encryption error".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend(ciphertext);

        Ok(URL_SAFE.encode(sealed))
    }

    /// Decrypts a value produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Crypto`] if the input is not valid base64, is too short,
    /// fails authentication (wrong key or tampered data) or is not UTF-8.
    pub fn decrypt(&self, encoded: &str) -> RecordStoreResult<String> {
        let sealed = URL_SAFE
            .decode(encoded)
            .map_err(|e| RecordStoreError::Crypto(e.to_string()))?;

        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(RecordStoreError::Crypto("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = match &self.variant {
            Variant::Aes128(cipher) => cipher.decrypt(nonce, ciphertext),
            Variant::Aes192(cipher) => cipher.decrypt(nonce, ciphertext),
            Variant::Aes256(cipher) => cipher.decrypt(nonce, ciphertext),
        }
        .map_err(|_| RecordStoreError::Crypto("decryption error".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| RecordStoreError::Crypto(e.to_string()))
    }
}

impl fmt::Debug for AesCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.variant {
            Variant::Aes128(_) => "Aes128Gcm",
            Variant::Aes192(_) => "Aes192Gcm",
            Variant::Aes256(_) => "Aes256Gcm",
        };
        f.debug_struct("AesCipher").field("cipher", &name).finish()
    }
}

/// Encrypts every non-empty encrypted field of `record` in place.
///
/// # Errors
///
/// - [`RecordStoreError::MissingCryptoSecret`] if a field needs encrypting and the record's
///   configuration has no crypto key.
/// - [`RecordStoreError::Crypto`] if the cipher fails.
///
/// On error the record is unchanged.
pub fn encrypt_fields<R: Record>(record: &mut R) -> RecordStoreResult<()> {
    transform_fields(record, AesCipher::encrypt)
}

/// Decrypts every non-empty encrypted field of `record` in place.
///
/// Errors are the same as for [`encrypt_fields`]; on error the record is unchanged.
pub fn decrypt_fields<R: Record>(record: &mut R) -> RecordStoreResult<()> {
    transform_fields(record, AesCipher::decrypt)
}

fn transform_fields<R, F>(record: &mut R, transform: F) -> RecordStoreResult<()>
where
    R: Record,
    F: Fn(&AesCipher, &str) -> RecordStoreResult<String>,
{
    let config = R::db_config();
    let mut cipher: Option<AesCipher> = None;
    let mut staged: Vec<String> = Vec::new();

    record.visit_encrypted_fields(&mut |name, value| {
        if value.is_empty() {
            return Ok(());
        }

        if cipher.is_none() {
            let crypto = config
                .crypto
                .as_ref()
                .ok_or_else(|| RecordStoreError::MissingCryptoSecret(name.to_string()))?;
            cipher = Some(AesCipher::new(crypto.aes_secret())?);
        }

        if let Some(cipher) = cipher.as_ref() {
            staged.push(transform(cipher, value.as_str())?);
        }
        Ok(())
    })?;

    if staged.is_empty() {
        return Ok(());
    }

    let mut staged = staged.into_iter();
    record.visit_encrypted_fields(&mut |_, value| {
        if !value.is_empty() {
            if let Some(transformed) = staged.next() {
                *value = transformed;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::{
        config::ConnectionConfig,
        record::{
            FieldVisitor, RecordFields,
            tests::{Note, TEST_SECRET},
        },
    };

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Keyless {
        secret: String,
    }

    impl RecordFields for Keyless {
        fn id(&self) -> Option<&bson::oid::ObjectId> {
            None
        }

        fn set_id(&mut self, _id: bson::oid::ObjectId) {}

        fn visit_encrypted_fields(
            &mut self,
            visitor: &mut FieldVisitor<'_>,
        ) -> RecordStoreResult<()> {
            visitor("secret", &mut self.secret)
        }
    }

    impl Record for Keyless {
        fn collection_name() -> &'static str {
            "keyless"
        }

        fn db_config() -> ConnectionConfig {
            ConnectionConfig::new("localhost", "docvault_test")
        }
    }

    #[test]
    fn invalid_key_size_is_rejected() {
        let err = AesCipher::new(b"INVALID AES KEY").unwrap_err();
        assert_eq!(err, RecordStoreError::Crypto("invalid key size 15".to_string()));
    }

    #[test]
    fn every_aes_key_size_round_trips() {
        for key in [&[7u8; 16][..], &[7u8; 24][..], &[7u8; 32][..]] {
            let cipher = AesCipher::new(key).unwrap();
            let sealed = cipher.encrypt("Sample text").unwrap();
            assert_ne!(sealed, "Sample text");
            assert_eq!(cipher.decrypt(&sealed).unwrap(), "Sample text");
        }
    }

    #[test]
    fn nonces_make_ciphertexts_differ() {
        let cipher = AesCipher::new(TEST_SECRET).unwrap();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = AesCipher::new(TEST_SECRET).unwrap().encrypt("Sample text").unwrap();
        let other = AesCipher::new(&[1u8; 32]).unwrap();
        assert!(matches!(other.decrypt(&sealed), Err(RecordStoreError::Crypto(_))));
    }

    #[test]
    fn garbage_input_is_a_crypto_error() {
        let cipher = AesCipher::new(TEST_SECRET).unwrap();
        assert!(matches!(cipher.decrypt("not base64!"), Err(RecordStoreError::Crypto(_))));
        assert!(matches!(cipher.decrypt("c2hvcnQ="), Err(RecordStoreError::Crypto(_))));
    }

    #[test]
    fn only_encrypted_fields_are_transformed() {
        let mut note = Note {
            secret: "crypto text".into(),
            title: "plain text".into(),
            pages: 3,
            ..Default::default()
        };

        encrypt_fields(&mut note).unwrap();
        assert_ne!(note.secret, "crypto text");
        assert_eq!(note.title, "plain text");
        assert_eq!(note.pages, 3);

        decrypt_fields(&mut note).unwrap();
        assert_eq!(note.secret, "crypto text");
        assert_eq!(note.title, "plain text");
    }

    #[test]
    fn empty_fields_stay_empty() {
        let mut note = Note { title: "plain text".into(), ..Default::default() };
        encrypt_fields(&mut note).unwrap();
        assert_eq!(note.secret, "");
        decrypt_fields(&mut note).unwrap();
        assert_eq!(note.secret, "");
    }

    #[test]
    fn missing_secret_leaves_the_field_unmodified() {
        let mut record = Keyless { secret: "crypto text".into() };

        let err = encrypt_fields(&mut record).unwrap_err();
        assert_eq!(err, RecordStoreError::MissingCryptoSecret("secret".into()));
        assert_eq!(record.secret, "crypto text");

        let err = decrypt_fields(&mut record).unwrap_err();
        assert!(err.is_missing_crypto_secret());
        assert_eq!(record.secret, "crypto text");
    }

    #[test]
    fn missing_secret_is_ignored_when_nothing_needs_encrypting() {
        let mut record = Keyless::default();
        encrypt_fields(&mut record).unwrap();
        decrypt_fields(&mut record).unwrap();
    }

    #[test]
    fn failed_decryption_leaves_the_record_unchanged() {
        let mut note = Note { secret: "definitely not ciphertext".into(), ..Default::default() };
        assert!(decrypt_fields(&mut note).is_err());
        assert_eq!(note.secret, "definitely not ciphertext");
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(plaintext in "\\PC{1,64}") {
            let mut note = Note { secret: plaintext.clone(), ..Default::default() };
            encrypt_fields(&mut note).unwrap();
            prop_assert_ne!(&note.secret, &plaintext);
            decrypt_fields(&mut note).unwrap();
            prop_assert_eq!(note.secret, plaintext);
        }
    }
}
