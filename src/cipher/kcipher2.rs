//! KCipher-2 is a word-oriented stream cipher standardized in ISO/IEC
//! 18033-4 and described in [RFC 7008](https://www.rfc-editor.org/rfc/rfc7008).
//!
//! The cipher state consists of two non-linear feedback shift registers,
//! FSR-A (five 32-bit words) and FSR-B (eleven words), coupled through four
//! internal registers L1, L2, R1 and R2. Every clock shifts both feedback
//! registers by one word, passes the internal registers through the
//! substitution step [`sub`], and produces 64 bits of keystream from the
//! non-linear function [`nlf`]. What sets the design apart is the dynamic
//! feedback control: two bits of FSR-A decide, clock by clock, which fixed
//! α-multiplications enter the FSR-B feedback, so FSR-B is not a linear
//! register even before the output function is applied.
//!
//! Because the keystream is simply XORed onto the data and XOR is an
//! involution, encryption and decryption are the same operation.
//! [`Keystream`] is the running engine with byte-granular, resumable
//! output; [`KCipher2`] is the one-shot [cipher](crate::Cipher) built on
//! top of it.

use {
    crate::{Cipher, CipherDecrypt, CipherEncrypt, Ciphertext, Key, Plaintext},
    docext::docext,
    std::{convert::Infallible, fmt, mem},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

pub mod tables;

use tables::{ALPHA0, ALPHA1, ALPHA2, ALPHA3, T0, T1, T2, T3};

/// Key size in bytes. KCipher-2 supports only 128-bit keys.
pub const KEY_BYTES: usize = 16;

/// Initialization vector size in bytes.
pub const IV_BYTES: usize = 16;

/// Bytes of keystream produced by one clock of the engine.
const BLOCK_BYTES: usize = 8;

/// Setup-mode clocks mixing the loaded key and IV before any keystream is
/// produced.
const SETUP_ROUNDS: usize = 24;

/// Pack four bytes into a word, most significant byte first. All of
/// KCipher-2 is specified in this byte order.
pub fn pack(b0: u8, b1: u8, b2: u8, b3: u8) -> u32 {
    u32::from_be_bytes([b0, b1, b2, b3])
}

/// Multiply `w` by the fixed element $\alpha_0$ of $GF(2^{32})$.
///
/// The field is viewed as a degree-4 extension of $GF(2^8)$ with
/// $\alpha_0$ a root of the extension polynomial, so a word is a
/// polynomial with byte coefficients and multiplication by $\alpha_0$
/// shifts the word up by one byte, then folds the outgoing byte back in
/// through a 256-entry table:
///
/// $$
/// \alpha_0 \cdot w = (w \ll 8) \oplus \mathrm{ALPHA0}[w \gg 24]
/// $$
///
/// [`ALPHA0`] holds the product of $\alpha_0$ with every possible top
/// byte, already reduced modulo the extension polynomial.
#[docext]
pub fn mul_alpha0(w: u32) -> u32 {
    (w << 8) ^ ALPHA0[(w >> 24) as usize]
}

/// Multiply `w` by the fixed element $\alpha_1$ of $GF(2^{32})$, see
/// [`mul_alpha0`].
#[docext]
pub fn mul_alpha1(w: u32) -> u32 {
    (w << 8) ^ ALPHA1[(w >> 24) as usize]
}

/// Multiply `w` by the fixed element $\alpha_2$ of $GF(2^{32})$, see
/// [`mul_alpha0`].
#[docext]
pub fn mul_alpha2(w: u32) -> u32 {
    (w << 8) ^ ALPHA2[(w >> 24) as usize]
}

/// Multiply `w` by the fixed element $\alpha_3$ of $GF(2^{32})$, see
/// [`mul_alpha0`].
#[docext]
pub fn mul_alpha3(w: u32) -> u32 {
    (w << 8) ^ ALPHA3[(w >> 24) as usize]
}

/// The 32-bit substitution step.
///
/// Conceptually this applies the AES S-box to each byte of `w` and then
/// multiplies the result by an MDS matrix over $GF(2^8)$, the same
/// confusion-then-diffusion pairing AES uses for SubBytes and MixColumns.
/// The [T tables](tables) fold both steps into one lookup per byte, so the
/// whole transformation is four loads and three XORs:
///
/// $$
/// \mathrm{sub}(w) = T_0[w_3] \oplus T_1[w_2] \oplus T_2[w_1] \oplus
/// T_3[w_0]
/// $$
///
/// where $w_0$ is the most significant byte of $w$.
#[docext]
pub fn sub(w: u32) -> u32 {
    let [b0, b1, b2, b3] = w.to_be_bytes();
    T0[usize::from(b3)] ^ T1[usize::from(b2)] ^ T2[usize::from(b1)] ^ T3[usize::from(b0)]
}

/// The non-linear output function, one modular addition folded with two
/// XORs:
///
/// $$
/// \mathrm{NLF}(a, b, c, d) = ((a + b) \bmod 2^{32}) \oplus c \oplus d
/// $$
///
/// The carry chain of the addition is what makes this non-linear over
/// $GF(2)$.
#[docext]
pub fn nlf(a: u32, b: u32, c: u32, d: u32) -> u32 {
    a.wrapping_add(b) ^ c ^ d
}

/// A running KCipher-2 engine: the mixed register state for one
/// `(key, IV)` pair together with a byte position into its keystream.
///
/// The registers produce 8 bytes of keystream per clock. The engine
/// buffers the most recent block and counts how much of it has been
/// handed out, which turns the fixed-size clocking into byte-granular,
/// resumable output: requests of any length can be mixed freely and
/// always continue exactly where the previous request stopped. The engine
/// is also an infinite `Iterator` over keystream bytes.
///
/// The state is exclusively owned and serialized by `&mut self`; separate
/// engines are fully independent. On drop, every register is zeroed so
/// key-derived material does not linger in freed memory.
pub struct Keystream {
    /// FSR-A, shifting towards index 0.
    a: [u32; 5],
    /// FSR-B, shifting towards index 0.
    b: [u32; 11],
    r1: u32,
    r2: u32,
    l1: u32,
    l2: u32,
    /// High word of the buffered keystream block.
    sh: u32,
    /// Low word of the buffered keystream block.
    sl: u32,
    /// Bytes of the buffered block already handed out, in `[0, 8)`.
    cnt: usize,
}

/// Pre-clock register values consumed by the setup-mode feedback.
struct Snapshot {
    a0: u32,
    b0: u32,
    a4: u32,
    b10: u32,
    r1: u32,
    r2: u32,
    l1: u32,
    l2: u32,
}

impl Keystream {
    /// Set up the engine for a key and IV.
    ///
    /// Expands the 128-bit key into twelve words with an AES-style
    /// schedule, loads the expanded key and the IV into the two feedback
    /// registers, runs 24 setup-mode clocks to mix the state, and buffers
    /// the first keystream block. The expanded key exists only inside this
    /// function and is zeroed before it returns; all of it lives on in the
    /// register load anyway.
    pub fn new(key: Key<[u8; KEY_BYTES]>, iv: [u8; IV_BYTES]) -> Self {
        let Key(key) = key;

        let iv = [
            pack(iv[0], iv[1], iv[2], iv[3]),
            pack(iv[4], iv[5], iv[6], iv[7]),
            pack(iv[8], iv[9], iv[10], iv[11]),
            pack(iv[12], iv[13], iv[14], iv[15]),
        ];

        let mut ik = [0; 12];
        ik[0] = pack(key[0], key[1], key[2], key[3]);
        ik[1] = pack(key[4], key[5], key[6], key[7]);
        ik[2] = pack(key[8], key[9], key[10], key[11]);
        ik[3] = pack(key[12], key[13], key[14], key[15]);
        ik[4] = ik[0] ^ sub(ik[3].rotate_left(8)) ^ 0x0100_0000;
        ik[5] = ik[1] ^ ik[4];
        ik[6] = ik[2] ^ ik[5];
        ik[7] = ik[3] ^ ik[6];
        ik[8] = ik[4] ^ sub(ik[7].rotate_left(8)) ^ 0x0200_0000;
        ik[9] = ik[5] ^ ik[8];
        ik[10] = ik[6] ^ ik[9];
        ik[11] = ik[7] ^ ik[10];

        let mut state = Self {
            a: [ik[4], ik[3], ik[2], ik[1], ik[0]],
            b: [
                ik[10], ik[11], iv[0], iv[1], ik[8], ik[9], iv[2], iv[3], ik[7], ik[5], ik[6],
            ],
            r1: 0,
            r2: 0,
            l1: 0,
            l2: 0,
            sh: 0,
            sl: 0,
            cnt: 0,
        };
        ik.zeroize();

        for _ in 0..SETUP_ROUNDS {
            state.mix();
        }
        state.generate();
        state
    }

    /// XOR the next `data.len()` keystream bytes onto `data` in place,
    /// advancing the stream position by the same amount.
    ///
    /// This is both encryption and decryption, and the method to use when
    /// input and output are the same buffer. Requests compose: consuming
    /// the stream in chunks yields exactly the bytes of one large request,
    /// no matter how the chunk lengths fall relative to the 8-byte blocks.
    /// An empty slice is a no-op and does not clock the engine.
    pub fn apply(&mut self, mut data: &mut [u8]) {
        if data.is_empty() {
            return;
        }

        // Drain the partially consumed block first.
        if self.cnt != 0 {
            let take = usize::min(BLOCK_BYTES - self.cnt, data.len());
            let block = self.block();
            let (head, rest) = mem::take(&mut data).split_at_mut(take);
            head.iter_mut()
                .zip(&block[self.cnt..])
                .for_each(|(d, k)| *d ^= k);
            data = rest;
            self.cnt += take;
            if self.cnt == BLOCK_BYTES {
                self.clock();
                self.cnt = 0;
            }
        }

        // Whole blocks.
        let mut blocks = data.chunks_exact_mut(BLOCK_BYTES);
        for chunk in blocks.by_ref() {
            chunk
                .iter_mut()
                .zip(self.block())
                .for_each(|(d, k)| *d ^= k);
            self.clock();
        }

        // A trailing partial block; the rest of it stays buffered for the
        // next call.
        let tail = blocks.into_remainder();
        if !tail.is_empty() {
            tail.iter_mut()
                .zip(self.block())
                .for_each(|(d, k)| *d ^= k);
            self.cnt = tail.len();
        }
    }

    /// Fill `output` with the next `output.len()` bytes of raw keystream.
    pub fn fill(&mut self, output: &mut [u8]) {
        output.fill(0);
        self.apply(output);
    }

    /// Encrypt `input` into `output`, which must be at least as long;
    /// output bytes past `input.len()` are left untouched.
    ///
    /// The length check happens before any work, so a failed call writes
    /// nothing and does not move the keystream position. The borrow rules
    /// already rule out overlapping buffers; for in-place operation use
    /// [`apply`](Self::apply).
    pub fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), OutputTooShort> {
        let output = output.get_mut(..input.len()).ok_or(OutputTooShort)?;
        output.copy_from_slice(input);
        self.apply(output);
        Ok(())
    }

    /// Decrypt `input` into `output`. This is the same operation as
    /// [`encrypt`](Self::encrypt), since applying the keystream twice
    /// cancels out; both names exist so call sites read naturally.
    pub fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), OutputTooShort> {
        self.encrypt(input, output)
    }

    /// The common clock transition, shared by the setup and update modes.
    ///
    /// Every tap is read from the pre-shift registers, so the ordering
    /// pitfalls of implementations that shift first and index the moved
    /// words afterwards cannot arise here: the FSR-A feedback is
    /// `α₀·a[0] ^ a[3]`, the dynamic feedback control tests bits 30 and
    /// 31 of `a[2]`, and the FSR-B feedback combines `b[0]`, `b[1]`,
    /// `b[6]` and `b[8]`. Only then are both registers shifted and the
    /// feedback words inserted. The returned snapshot carries the
    /// pre-clock values that only the setup-mode feedback consumes, which
    /// keeps the hot path free of any mode branch.
    fn advance(&mut self) -> Snapshot {
        // Next internal registers.
        let r1 = sub(self.l2.wrapping_add(self.b[9]));
        let r2 = sub(self.r1);
        let l1 = sub(self.r2.wrapping_add(self.b[4]));
        let l2 = sub(self.l1);

        // FSR-A feedback.
        let fa = mul_alpha0(self.a[0]) ^ self.a[3];

        // FSR-B feedback under dynamic feedback control: bits 30 and 31 of
        // a[2] select the α-multiplications.
        let t1 = if self.a[2] & 0x4000_0000 != 0 {
            mul_alpha1(self.b[0])
        } else {
            mul_alpha2(self.b[0])
        };
        let t2 = if self.a[2] & 0x8000_0000 != 0 {
            mul_alpha3(self.b[8])
        } else {
            self.b[8]
        };
        let fb = t1 ^ self.b[1] ^ self.b[6] ^ t2;

        let pre = Snapshot {
            a0: self.a[0],
            b0: self.b[0],
            a4: self.a[4],
            b10: self.b[10],
            r1: self.r1,
            r2: self.r2,
            l1: self.l1,
            l2: self.l2,
        };

        // Shift both registers down a word and insert the feedback.
        self.a.copy_within(1.., 0);
        self.b.copy_within(1.., 0);
        self.a[4] = fa;
        self.b[10] = fb;

        self.r1 = r1;
        self.r2 = r2;
        self.l1 = l1;
        self.l2 = l2;

        pre
    }

    /// One update-mode clock: advance the state and refresh the buffered
    /// keystream block.
    fn clock(&mut self) {
        self.advance();
        self.generate();
    }

    /// One setup-mode clock: advance the state and fold the two [`nlf`]
    /// outputs of the pre-clock state back into the feedback words. No
    /// keystream is produced in this mode.
    fn mix(&mut self) {
        let pre = self.advance();
        self.a[4] ^= nlf(pre.b0, pre.r2, pre.r1, pre.a4);
        self.b[10] ^= nlf(pre.b10, pre.l2, pre.l1, pre.a0);
    }

    /// Refresh the buffered keystream block from the current state.
    fn generate(&mut self) {
        self.sh = nlf(self.b[10], self.l2, self.l1, self.a[0]);
        self.sl = nlf(self.b[0], self.r2, self.r1, self.a[4]);
    }

    /// The buffered keystream block as bytes, high word first.
    fn block(&self) -> [u8; BLOCK_BYTES] {
        let mut block = [0; BLOCK_BYTES];
        block[..4].copy_from_slice(&self.sh.to_be_bytes());
        block[4..].copy_from_slice(&self.sl.to_be_bytes());
        block
    }

    #[cfg(test)]
    pub(crate) fn registers(&self) -> Vec<u32> {
        let mut words = vec![
            self.r1,
            self.r2,
            self.l1,
            self.l2,
            self.sh,
            self.sl,
            self.cnt as u32,
        ];
        words.extend(self.a);
        words.extend(self.b);
        words
    }
}

impl Iterator for Keystream {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        let mut byte = [0];
        self.fill(&mut byte);
        Some(byte[0])
    }
}

impl Zeroize for Keystream {
    fn zeroize(&mut self) {
        self.a.zeroize();
        self.b.zeroize();
        self.r1.zeroize();
        self.r2.zeroize();
        self.l1.zeroize();
        self.l2.zeroize();
        self.sh.zeroize();
        self.sl.zeroize();
        self.cnt.zeroize();
    }
}

impl Drop for Keystream {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for Keystream {}

impl fmt::Debug for Keystream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The registers are keystream material, keep them out of output.
        f.debug_struct("Keystream").finish_non_exhaustive()
    }
}

/// The KCipher-2 stream cipher over whole messages, with the IV fixed at
/// construction and the key supplied per call.
///
/// Every operation runs a fresh [`Keystream`] from the stream origin, so
/// the same `(key, IV)` pair always maps a message to the same ciphertext.
/// Reusing one `(key, IV)` pair for two different messages voids the
/// cipher's security; choosing fresh IVs is the caller's responsibility.
#[derive(Debug, Clone, Copy)]
pub struct KCipher2 {
    iv: [u8; IV_BYTES],
}

impl KCipher2 {
    pub fn new(iv: [u8; IV_BYTES]) -> Self {
        Self { iv }
    }
}

impl Cipher for KCipher2 {
    type Key = [u8; KEY_BYTES];
}

impl CipherEncrypt for KCipher2 {
    type EncryptionErr = Infallible;
    type EncryptionKey = [u8; KEY_BYTES];

    fn encrypt(
        &self,
        data: Plaintext<Vec<u8>>,
        key: Key<Self::EncryptionKey>,
    ) -> Result<Ciphertext<Vec<u8>>, Self::EncryptionErr> {
        let Plaintext(mut data) = data;
        Keystream::new(key, self.iv).apply(&mut data);
        Ok(Ciphertext(data))
    }
}

impl CipherDecrypt for KCipher2 {
    type DecryptionErr = Infallible;
    type DecryptionKey = [u8; KEY_BYTES];

    fn decrypt(
        &self,
        data: Ciphertext<Vec<u8>>,
        key: Key<Self::DecryptionKey>,
    ) -> Result<Plaintext<Vec<u8>>, Self::DecryptionErr> {
        // Decryption applies the same keystream; XOR cancels itself.
        let Ciphertext(mut data) = data;
        Keystream::new(key, self.iv).apply(&mut data);
        Ok(Plaintext(data))
    }
}

/// Returned by [`Keystream::encrypt`] and [`Keystream::decrypt`] when the
/// output buffer is shorter than the input.
#[derive(Debug)]
pub struct OutputTooShort;

impl fmt::Display for OutputTooShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("output buffer is shorter than the input")
    }
}
