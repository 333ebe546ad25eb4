//! The byte-oriented Rijndael round function over 256-bit and 512-bit
//! states, and the two wide-block keystream ciphers built from it.
//!
//! Round keys are not produced by the classic Rijndael schedule; they are
//! drawn straight from the cSHAKE key stream as big-endian 32-bit words, so
//! related-key structure in the schedule reduces to distinguishing cSHAKE
//! output from random. ShiftRows is widened per block size: the 256-bit state
//! shifts its rows by 0/1/3/4 of its 8 columns, the 512-bit state by 1/2/4/8
//! of its 16 columns, giving full diffusion within two rounds.

use byteorder::{BigEndian, ByteOrder};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cshake::CShake;
use crate::ctr::KeystreamCipher;

/// The AES substitution box.
static SBOX: [u8; 256] = [
    0x63, 0x7C, 0x77, 0x7B, 0xF2, 0x6B, 0x6F, 0xC5, 0x30, 0x01, 0x67, 0x2B, 0xFE, 0xD7, 0xAB, 0x76,
    0xCA, 0x82, 0xC9, 0x7D, 0xFA, 0x59, 0x47, 0xF0, 0xAD, 0xD4, 0xA2, 0xAF, 0x9C, 0xA4, 0x72, 0xC0,
    0xB7, 0xFD, 0x93, 0x26, 0x36, 0x3F, 0xF7, 0xCC, 0x34, 0xA5, 0xE5, 0xF1, 0x71, 0xD8, 0x31, 0x15,
    0x04, 0xC7, 0x23, 0xC3, 0x18, 0x96, 0x05, 0x9A, 0x07, 0x12, 0x80, 0xE2, 0xEB, 0x27, 0xB2, 0x75,
    0x09, 0x83, 0x2C, 0x1A, 0x1B, 0x6E, 0x5A, 0xA0, 0x52, 0x3B, 0xD6, 0xB3, 0x29, 0xE3, 0x2F, 0x84,
    0x53, 0xD1, 0x00, 0xED, 0x20, 0xFC, 0xB1, 0x5B, 0x6A, 0xCB, 0xBE, 0x39, 0x4A, 0x4C, 0x58, 0xCF,
    0xD0, 0xEF, 0xAA, 0xFB, 0x43, 0x4D, 0x33, 0x85, 0x45, 0xF9, 0x02, 0x7F, 0x50, 0x3C, 0x9F, 0xA8,
    0x51, 0xA3, 0x40, 0x8F, 0x92, 0x9D, 0x38, 0xF5, 0xBC, 0xB6, 0xDA, 0x21, 0x10, 0xFF, 0xF3, 0xD2,
    0xCD, 0x0C, 0x13, 0xEC, 0x5F, 0x97, 0x44, 0x17, 0xC4, 0xA7, 0x7E, 0x3D, 0x64, 0x5D, 0x19, 0x73,
    0x60, 0x81, 0x4F, 0xDC, 0x22, 0x2A, 0x90, 0x88, 0x46, 0xEE, 0xB8, 0x14, 0xDE, 0x5E, 0x0B, 0xDB,
    0xE0, 0x32, 0x3A, 0x0A, 0x49, 0x06, 0x24, 0x5C, 0xC2, 0xD3, 0xAC, 0x62, 0x91, 0x95, 0xE4, 0x79,
    0xE7, 0xC8, 0x37, 0x6D, 0x8D, 0xD5, 0x4E, 0xA9, 0x6C, 0x56, 0xF4, 0xEA, 0x65, 0x7A, 0xAE, 0x08,
    0xBA, 0x78, 0x25, 0x2E, 0x1C, 0xA6, 0xB4, 0xC6, 0xE8, 0xDD, 0x74, 0x1F, 0x4B, 0xBD, 0x8B, 0x8A,
    0x70, 0x3E, 0xB5, 0x66, 0x48, 0x03, 0xF6, 0x0E, 0x61, 0x35, 0x57, 0xB9, 0x86, 0xC1, 0x1D, 0x9E,
    0xE1, 0xF8, 0x98, 0x11, 0x69, 0xD9, 0x8E, 0x94, 0x9B, 0x1E, 0x87, 0xE9, 0xCE, 0x55, 0x28, 0xDF,
    0x8C, 0xA1, 0x89, 0x0D, 0xBF, 0xE6, 0x42, 0x68, 0x41, 0x99, 0x2D, 0x0F, 0xB0, 0x54, 0xBB, 0x16,
];

/// Touch the S-box so it is cache-resident before key-dependent lookups
/// begin; called at the top of every block batch.
pub(crate) fn prefetch_sbox() {
    let mut acc = 0u8;
    for &b in SBOX.iter() {
        acc |= b;
    }
    std::hint::black_box(acc);
}

fn sub_bytes(state: &mut [u8]) {
    for b in state.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

// Row r of column c lives at byte 4c + r; each row rotates left by a fixed
// column count.
fn shift_rows<const COLS: usize>(state: &mut [u8], shifts: [usize; 4]) {
    let mut tmp = [0u8; 64];
    tmp[..state.len()].copy_from_slice(state);
    for c in 0..COLS {
        for r in 0..4 {
            state[4 * c + r] = tmp[4 * ((c + shifts[r]) % COLS) + r];
        }
    }
}

fn shift_rows_256(state: &mut [u8]) {
    shift_rows::<8>(state, [0, 1, 3, 4]);
}

fn shift_rows_512(state: &mut [u8]) {
    shift_rows::<16>(state, [1, 2, 4, 8]);
}

fn mix_columns(state: &mut [u8]) {
    for col in state.chunks_exact_mut(4) {
        let s0 = u32::from(col[0]);
        let s1 = u32::from(col[1]);
        let s2 = u32::from(col[2]);
        let s3 = u32::from(col[3]);

        let t0 = (s0 << 1) ^ s1 ^ (s1 << 1) ^ s2 ^ s3;
        let t1 = s0 ^ (s1 << 1) ^ s2 ^ (s2 << 1) ^ s3;
        let t2 = s0 ^ s1 ^ (s2 << 1) ^ s3 ^ (s3 << 1);
        let t3 = s0 ^ (s0 << 1) ^ s1 ^ s2 ^ (s3 << 1);

        // conditional reduction by x^8 + x^4 + x^3 + x + 1
        col[0] = (t0 ^ ((t0 >> 8).wrapping_neg() & 0x11B)) as u8;
        col[1] = (t1 ^ ((t1 >> 8).wrapping_neg() & 0x11B)) as u8;
        col[2] = (t2 ^ ((t2 >> 8).wrapping_neg() & 0x11B)) as u8;
        col[3] = (t3 ^ ((t3 >> 8).wrapping_neg() & 0x11B)) as u8;
    }
}

fn key_addition(state: &mut [u8], round_keys: &[u32]) {
    for (col, &rk) in state.chunks_exact_mut(4).zip(round_keys) {
        col[0] ^= (rk >> 24) as u8;
        col[1] ^= (rk >> 16) as u8;
        col[2] ^= (rk >> 8) as u8;
        col[3] ^= rk as u8;
    }
}

fn squeeze_round_keys(xof: &mut CShake, words: usize) -> Vec<u32> {
    let mut buf = vec![0u8; words * 4];
    xof.squeeze(&mut buf);
    let keys = buf.chunks_exact(4).map(BigEndian::read_u32).collect();
    buf.zeroize();
    keys
}

macro_rules! wide_cipher {
    ($name:ident, $block:expr, $shift:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name {
            round_keys: Vec<u32>,
            rounds: u32,
        }

        impl $name {
            const WORDS_PER_KEY: usize = $block / 4;

            /// Draws `(rounds + 1)` block-wide round keys from the key
            /// stream, interpreted as big-endian words.
            pub(crate) fn from_xof(xof: &mut CShake, rounds: u32) -> Self {
                let words = Self::WORDS_PER_KEY * (rounds as usize + 1);
                $name { round_keys: squeeze_round_keys(xof, words), rounds }
            }

            pub(crate) fn from_words(round_keys: Vec<u32>, rounds: u32) -> Option<Self> {
                (round_keys.len() == Self::WORDS_PER_KEY * (rounds as usize + 1))
                    .then_some($name { round_keys, rounds })
            }

            pub(crate) fn round_key_words(&self) -> &[u32] {
                &self.round_keys
            }
        }

        impl KeystreamCipher for $name {
            const BLOCK_SIZE: usize = $block;

            fn encrypt_counter_block(&self, counter: &[u8], keystream: &mut [u8]) {
                const W: usize = $block / 4;
                debug_assert_eq!(counter.len(), $block);
                debug_assert_eq!(keystream.len(), $block);

                let rk = &self.round_keys;
                let mut state = [0u8; $block];
                state.copy_from_slice(counter);

                key_addition(&mut state, &rk[..W]);
                for r in 1..self.rounds as usize {
                    sub_bytes(&mut state);
                    $shift(&mut state);
                    mix_columns(&mut state);
                    key_addition(&mut state, &rk[r * W..(r + 1) * W]);
                }
                sub_bytes(&mut state);
                $shift(&mut state);
                let last = self.rounds as usize * W;
                key_addition(&mut state, &rk[last..last + W]);

                keystream.copy_from_slice(&state);
            }

            fn prefetch_tables(&self) {
                prefetch_sbox();
            }
        }
    };
}

wide_cipher!(
    RcsCipher,
    32,
    shift_rows_256,
    "The 256-bit-block Rijndael keystream cipher backing RCS."
);

wide_cipher!(
    RwsCipher,
    64,
    shift_rows_512,
    "The 512-bit-block Rijndael keystream cipher backing RWS."
);
