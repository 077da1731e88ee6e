#[cfg(test)]
mod test;

mod cipher;
mod key;
mod text;

pub use {
    cipher::{kcipher2, Cipher, CipherDecrypt, CipherEncrypt, KCipher2, Keystream, OutputTooShort},
    key::Key,
    text::{Ciphertext, Plaintext},
};
