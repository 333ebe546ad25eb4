//! The Threefish-1024 block function backing the TSX-1024 stream cipher,
//! with the round count raised from the standard 80 to 120.
//!
//! The 16-word cipher key and the 2-word tweak are not supplied by the
//! caller; both are drawn from the cSHAKE key stream, so the schedule's
//! extended key and tweak words inherit the XOF's domain separation. Subkeys
//! are injected every four rounds from the 17-word extended key and 3-word
//! extended tweak, rotating one position per injection.

use byteorder::{ByteOrder, LittleEndian};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cshake::CShake;
use crate::ctr::KeystreamCipher;

const BLOCK_SIZE: usize = 128;
const WORDS: usize = 16;
const KEY_PARITY: u64 = 0x1BD1_1BDA_A9FC_1A22;

// Skein v1.3 rotation schedule for Threefish-1024; rows repeat every eight
// rounds.
const ROTATIONS: [[u32; 8]; 8] = [
    [24, 13, 8, 47, 8, 17, 22, 37],
    [38, 19, 10, 55, 49, 18, 23, 52],
    [33, 4, 51, 13, 34, 41, 59, 17],
    [5, 20, 48, 41, 47, 28, 16, 25],
    [41, 9, 37, 31, 12, 47, 44, 30],
    [16, 34, 56, 51, 4, 53, 42, 41],
    [31, 44, 47, 46, 19, 42, 44, 25],
    [9, 48, 35, 52, 23, 31, 37, 20],
];

const PERMUTE: [usize; WORDS] = [0, 9, 2, 13, 6, 11, 4, 15, 10, 7, 12, 3, 14, 5, 8, 1];

/// The Threefish-1024 keystream cipher.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Tsx1024Cipher {
    key: [u64; WORDS + 1],
    tweak: [u64; 3],
    rounds: u32,
}

impl Tsx1024Cipher {
    /// Draws the 128-byte cipher key and the 16-byte tweak from the key
    /// stream, little-endian words, and extends both with their parity words.
    pub(crate) fn from_xof(xof: &mut CShake, rounds: u32) -> Self {
        let mut buf = [0u8; BLOCK_SIZE + 16];
        xof.squeeze(&mut buf);

        let mut key_words = [0u64; WORDS];
        LittleEndian::read_u64_into(&buf[..BLOCK_SIZE], &mut key_words);
        let mut tweak_words = [0u64; 2];
        LittleEndian::read_u64_into(&buf[BLOCK_SIZE..], &mut tweak_words);
        buf.zeroize();

        let cipher = Self::from_words(key_words, tweak_words, rounds);
        key_words.zeroize();
        cipher
    }

    pub(crate) fn from_words(key_words: [u64; WORDS], tweak_words: [u64; 2], rounds: u32) -> Self {
        debug_assert_eq!(rounds % 4, 0);

        let mut key = [0u64; WORDS + 1];
        key[..WORDS].copy_from_slice(&key_words);
        key[WORDS] = key_words.iter().fold(KEY_PARITY, |acc, &k| acc ^ k);

        let tweak = [tweak_words[0], tweak_words[1], tweak_words[0] ^ tweak_words[1]];

        Tsx1024Cipher { key, tweak, rounds }
    }

    pub(crate) fn key_words(&self) -> &[u64] {
        &self.key[..WORDS]
    }

    pub(crate) fn tweak_words(&self) -> [u64; 2] {
        [self.tweak[0], self.tweak[1]]
    }

    #[inline]
    fn add_subkey(&self, x: &mut [u64; WORDS], s: usize) {
        for (i, w) in x.iter_mut().enumerate() {
            *w = w.wrapping_add(self.key[(s + i) % (WORDS + 1)]);
        }
        x[13] = x[13].wrapping_add(self.tweak[s % 3]);
        x[14] = x[14].wrapping_add(self.tweak[(s + 1) % 3]);
        x[15] = x[15].wrapping_add(s as u64);
    }

    fn encrypt_words(&self, block: &mut [u64; WORDS]) {
        let mut x = *block;

        for d in 0..self.rounds as usize {
            if d % 4 == 0 {
                self.add_subkey(&mut x, d / 4);
            }

            let rot = &ROTATIONS[d % 8];
            for j in 0..8 {
                x[2 * j] = x[2 * j].wrapping_add(x[2 * j + 1]);
                x[2 * j + 1] = x[2 * j + 1].rotate_left(rot[j]) ^ x[2 * j];
            }

            let mut y = [0u64; WORDS];
            for (i, &p) in PERMUTE.iter().enumerate() {
                y[i] = x[p];
            }
            x = y;
        }
        self.add_subkey(&mut x, self.rounds as usize / 4);

        *block = x;
    }
}

impl KeystreamCipher for Tsx1024Cipher {
    const BLOCK_SIZE: usize = BLOCK_SIZE;

    fn encrypt_counter_block(&self, counter: &[u8], keystream: &mut [u8]) {
        debug_assert_eq!(counter.len(), 16);
        debug_assert_eq!(keystream.len(), BLOCK_SIZE);

        // counter word 0 is the low half of the 128-bit integer
        let mut block = [0u64; WORDS];
        block[0] = LittleEndian::read_u64(&counter[..8]);
        block[1] = LittleEndian::read_u64(&counter[8..]);

        self.encrypt_words(&mut block);
        LittleEndian::write_u64_into(&block, keystream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> Tsx1024Cipher {
        Tsx1024Cipher::from_words([0x0101_0101; WORDS], [5, 9], 120)
    }

    #[test]
    fn keystream_is_deterministic() {
        let c = cipher();
        let mut a = [0u8; BLOCK_SIZE];
        let mut b = [0u8; BLOCK_SIZE];
        c.encrypt_counter_block(&[3u8; 16], &mut a);
        c.encrypt_counter_block(&[3u8; 16], &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn counter_words_both_matter() {
        let c = cipher();
        let mut low = [0u8; 16];
        low[0] = 1;
        let mut high = [0u8; 16];
        high[8] = 1;

        let mut a = [0u8; BLOCK_SIZE];
        let mut b = [0u8; BLOCK_SIZE];
        c.encrypt_counter_block(&low, &mut a);
        c.encrypt_counter_block(&high, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn tweak_separates_streams() {
        let a = Tsx1024Cipher::from_words([7; WORDS], [0, 0], 120);
        let b = Tsx1024Cipher::from_words([7; WORDS], [0, 1], 120);

        let mut x = [0u8; BLOCK_SIZE];
        let mut y = [0u8; BLOCK_SIZE];
        a.encrypt_counter_block(&[0u8; 16], &mut x);
        b.encrypt_counter_block(&[0u8; 16], &mut y);
        assert_ne!(x, y);
    }

    #[test]
    fn parity_word_covers_whole_key() {
        let mut words = [2u64; WORDS];
        let a = Tsx1024Cipher::from_words(words, [1, 2], 120);
        words[15] ^= 0x8000_0000_0000_0000;
        let b = Tsx1024Cipher::from_words(words, [1, 2], 120);

        let mut x = [0u8; BLOCK_SIZE];
        let mut y = [0u8; BLOCK_SIZE];
        a.encrypt_counter_block(&[0u8; 16], &mut x);
        b.encrypt_counter_block(&[0u8; 16], &mut y);
        assert_ne!(x, y);
    }
}
