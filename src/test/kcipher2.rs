//! Tests for the [KCipher-2 engine](crate::Keystream). The keystream and
//! ciphertext values pin the cipher's output for fixed keys and IVs; their
//! derivation and verification are documented in DESIGN.md. The remaining
//! tests exercise the resumption behavior of the streaming layer, which
//! must deliver one identical byte sequence no matter how requests are
//! sliced.

use {
    crate::{Key, Keystream},
    zeroize::Zeroize,
};

const ZERO_KEY: [u8; 16] = [0; 16];
const ZERO_IV: [u8; 16] = [0; 16];

/// The first 64 keystream bytes for the all-zero key and IV.
const ZERO_KS: &str = "f871ebef945b7272e40c04941dff05370b981a59fbc8ac57566d3b02c179dbb4\
                       3b46f1f033554c725de68bcc9872858f575496024062f0e9f932c998226db6ba";

fn keystream(key: [u8; 16], iv: [u8; 16], len: usize) -> Vec<u8> {
    let mut out = vec![0; len];
    Keystream::new(Key(key), iv).fill(&mut out);
    out
}

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn zero_key_zero_iv_keystream() {
    assert_eq!(keystream(ZERO_KEY, ZERO_IV, 64), unhex(ZERO_KS));
}

#[test]
fn nonzero_key_iv_keystream() {
    let key = unhex("a37b7d012c897f273c0e6f3a6b7b55e3").try_into().unwrap();
    let iv = unhex("00112233445566778899aabbccddeeff").try_into().unwrap();
    assert_eq!(
        keystream(key, iv, 32),
        unhex("4a5dcad8aaeaaa9b576f3ea57c8ce1fe3be08aeda0fd10e1af375c7413d05a64")
    );
}

#[test]
fn sequential_key_iv_keystream() {
    let mut key = [0; 16];
    let mut iv = [0; 16];
    for i in 0..16 {
        key[i] = i as u8;
        iv[i] = 16 + i as u8;
    }
    assert_eq!(
        keystream(key, iv, 24),
        unhex("bf47408975c931f200f406d9f3c918ca1cbbd1df51fdb742")
    );
}

#[test]
fn encrypt_known_plaintext() {
    let plaintext: Vec<u8> = (0..32).collect();
    let mut ciphertext = [0; 32];
    Keystream::new(Key(ZERO_KEY), ZERO_IV)
        .encrypt(&plaintext, &mut ciphertext)
        .unwrap();
    assert_eq!(
        ciphertext.to_vec(),
        unhex("f870e9ec905e7475ec050e9f11f20b381b89084aefddba404e742119dd64c5ab")
    );
}

/// Decrypting with a fresh engine for the same key and IV restores the
/// plaintext exactly.
#[test]
fn encrypt_then_decrypt_restores_plaintext() {
    let plaintext: Vec<u8> = (0..32).collect();
    let mut ciphertext = [0; 32];
    let mut restored = [0; 32];
    Keystream::new(Key(ZERO_KEY), ZERO_IV)
        .encrypt(&plaintext, &mut ciphertext)
        .unwrap();
    Keystream::new(Key(ZERO_KEY), ZERO_IV)
        .decrypt(&ciphertext, &mut restored)
        .unwrap();
    assert_eq!(restored.to_vec(), plaintext);
}

/// Ciphertext is the plaintext XORed with the raw keystream of a fresh
/// engine.
#[test]
fn encrypt_equals_plaintext_xor_keystream() {
    let plaintext: Vec<u8> = (0..64).map(|i| (7 * i) as u8).collect();
    let ks = keystream(ZERO_KEY, ZERO_IV, 64);
    let mut ciphertext = [0; 64];
    Keystream::new(Key(ZERO_KEY), ZERO_IV)
        .encrypt(&plaintext, &mut ciphertext)
        .unwrap();
    for i in 0..64 {
        assert_eq!(ciphertext[i], plaintext[i] ^ ks[i]);
    }
}

/// One 64-byte request, eight requests of 8, sixty-four requests of 1, and
/// a mixed partition must all produce the same bytes.
#[test]
fn chunked_requests_match_one_shot() {
    let one_shot = keystream(ZERO_KEY, ZERO_IV, 64);

    for partition in [
        vec![8; 8],
        vec![1; 64],
        vec![3, 5, 7, 11, 13, 17, 8],
        vec![64],
    ] {
        let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
        let mut out = Vec::new();
        for len in partition {
            let mut chunk = vec![0; len];
            engine.fill(&mut chunk);
            out.extend(chunk);
        }
        assert_eq!(out, one_shot);
    }
}

/// Splitting a request at any offset relative to the stream origin,
/// including on and around the 8-byte block boundaries, does not change
/// the output.
#[test]
fn resumes_across_block_boundaries() {
    let one_shot = keystream(ZERO_KEY, ZERO_IV, 24);

    for split in [0, 1, 7, 8, 9, 15, 16, 17] {
        let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
        let mut head = vec![0; split];
        let mut tail = vec![0; 24 - split];
        engine.fill(&mut head);
        engine.fill(&mut tail);
        head.extend(tail);
        assert_eq!(head, one_shot, "split at {split}");
    }
}

/// Zero-length requests are no-ops wherever they land in the sequence.
#[test]
fn empty_requests_do_not_perturb_the_stream() {
    let one_shot = keystream(ZERO_KEY, ZERO_IV, 64);

    let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
    let mut out = Vec::new();
    for len in [0, 5, 0, 0, 11, 0, 48] {
        let mut chunk = vec![0; len];
        engine.fill(&mut chunk);
        out.extend(chunk);
    }
    assert_eq!(out, one_shot);
}

/// In-place application over split borrows agrees with the two-buffer
/// encrypt.
#[test]
fn in_place_apply_matches_encrypt() {
    let plaintext: Vec<u8> = (0..41).map(|i| (13 * i) as u8).collect();
    let mut ciphertext = vec![0; 41];
    Keystream::new(Key(ZERO_KEY), ZERO_IV)
        .encrypt(&plaintext, &mut ciphertext)
        .unwrap();

    let mut buf = plaintext.clone();
    let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
    let (first, second) = buf.split_at_mut(17);
    engine.apply(first);
    engine.apply(second);
    assert_eq!(buf, ciphertext);
}

/// A rejected call must not desynchronize the keystream.
#[test]
fn short_output_is_rejected_without_consuming_keystream() {
    let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
    let mut out = [0; 4];
    assert!(engine.encrypt(&[0; 8], &mut out).is_err());
    assert_eq!(out, [0; 4]);

    let mut rest = [0; 8];
    engine.fill(&mut rest);
    assert_eq!(rest.as_slice(), &unhex(ZERO_KS)[..8]);
}

/// The iterator view of the engine yields the keystream byte by byte.
#[test]
fn iterator_matches_fill() {
    let one_shot = keystream(ZERO_KEY, ZERO_IV, 40);
    let iterated: Vec<u8> = Keystream::new(Key(ZERO_KEY), ZERO_IV).take(40).collect();
    assert_eq!(iterated, one_shot);
}

/// Zeroization, which drop performs, clears every register of the state.
#[test]
fn zeroize_clears_every_register() {
    let mut engine = Keystream::new(Key(ZERO_KEY), ZERO_IV);
    assert!(engine.registers().iter().any(|&w| w != 0));
    engine.zeroize();
    assert!(engine.registers().iter().all(|&w| w == 0));
}
