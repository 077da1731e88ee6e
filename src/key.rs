use std::fmt;

/// Encryption/decryption key.
///
/// The `Debug` output never includes the wrapped value, so key material
/// stays out of logs and assertion messages.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Key<T>(pub T);

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(..)")
    }
}
