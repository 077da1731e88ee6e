use crate::{Ciphertext, Key, Plaintext};

pub mod kcipher2;

pub use kcipher2::{KCipher2, Keystream, OutputTooShort};

/// A cipher encrypts and decrypts data of arbitrary length under a key.
///
/// The [encryption](CipherEncrypt) and [decryption](CipherDecrypt) halves
/// are separate traits; `Cipher` ties them together for implementations
/// where both directions use the same key type.
pub trait Cipher:
    CipherEncrypt<EncryptionKey = Self::Key> + CipherDecrypt<DecryptionKey = Self::Key>
{
    type Key;
}

/// The encryption half of a [cipher](Cipher).
pub trait CipherEncrypt {
    type EncryptionErr;
    type EncryptionKey;

    /// Encrypt the plaintext.
    fn encrypt(
        &self,
        data: Plaintext<Vec<u8>>,
        key: Key<Self::EncryptionKey>,
    ) -> Result<Ciphertext<Vec<u8>>, Self::EncryptionErr>;
}

/// The decryption half of a [cipher](Cipher).
pub trait CipherDecrypt {
    type DecryptionErr;
    type DecryptionKey;

    /// Decrypt the ciphertext.
    fn decrypt(
        &self,
        data: Ciphertext<Vec<u8>>,
        key: Key<Self::DecryptionKey>,
    ) -> Result<Plaintext<Vec<u8>>, Self::DecryptionErr>;
}
