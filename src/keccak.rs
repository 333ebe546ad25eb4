//! The Keccak-p\[1600\] permutation in its 24-round and 48-round forms, plus
//! the byte-addressed sponge state shared by the cSHAKE and KMAC layers.
//!
//! The 24-round form is the standard Keccak-f\[1600\] of FIPS-202, used for
//! the 168/136/72-byte rates. The 48-round form extends the ι schedule with
//! the next 24 constants of the FIPS-202 LFSR sequence and is used only for
//! the 36-byte rate of the 1024-bit security level; at round `r` it applies
//! constant `R - r - 1`, so it opens with the extended half of the table.

use zeroize::Zeroize;

/// Width of the permutation state in 64-bit lanes.
pub(crate) const STATE_WORDS: usize = 25;

/// Width of the permutation state in bytes.
pub(crate) const STATE_SIZE: usize = 200;

const MAX_ROUNDS: usize = 48;

/// The first `MAX_ROUNDS` ι constants of the FIPS-202 LFSR sequence. The
/// table is generated rather than transcribed; the 24-round KAT below anchors
/// it to the published values.
const ROUND_CONSTANTS: [u64; MAX_ROUNDS] = round_constants();

const fn round_constants() -> [u64; MAX_ROUNDS] {
    let mut rc = [0u64; MAX_ROUNDS];
    let mut lfsr = 1u8;
    let mut ir = 0;
    while ir < MAX_ROUNDS {
        let mut j = 0;
        while j < 7 {
            if lfsr & 1 == 1 {
                rc[ir] |= 1 << ((1u32 << j) - 1);
            }
            // x^8 + x^6 + x^5 + x^4 + 1 over GF(2)
            let msb = lfsr & 0x80;
            lfsr <<= 1;
            if msb != 0 {
                lfsr ^= 0x71;
            }
            j += 1;
        }
        ir += 1;
    }
    rc
}

const RHO: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

/// Apply Keccak-p\[1600\] with the given round count (24 or 48) to the lanes.
pub fn permute_p1600(lanes: &mut [u64; STATE_WORDS], rounds: usize) {
    debug_assert!(rounds == 24 || rounds == 48);

    for r in 0..rounds {
        let rc = if rounds > 24 {
            ROUND_CONSTANTS[rounds - r - 1]
        } else {
            ROUND_CONSTANTS[r]
        };
        round(lanes, rc);
    }
}

#[inline]
fn round(a: &mut [u64; STATE_WORDS], rc: u64) {
    // theta
    let mut c = [0u64; 5];
    for x in 0..5 {
        c[x] = a[x] ^ a[x + 5] ^ a[x + 10] ^ a[x + 15] ^ a[x + 20];
    }
    for x in 0..5 {
        let d = c[(x + 4) % 5] ^ c[(x + 1) % 5].rotate_left(1);
        for y in 0..5 {
            a[x + 5 * y] ^= d;
        }
    }

    // rho and pi
    let mut t = a[1];
    for i in 0..24 {
        let j = PI[i];
        let tmp = a[j];
        a[j] = t.rotate_left(RHO[i]);
        t = tmp;
    }

    // chi
    for y in 0..5 {
        let row = [a[5 * y], a[5 * y + 1], a[5 * y + 2], a[5 * y + 3], a[5 * y + 4]];
        for x in 0..5 {
            a[5 * y + x] = row[x] ^ ((!row[(x + 1) % 5]) & row[(x + 2) % 5]);
        }
    }

    // iota
    a[0] ^= rc;
}

/// A byte-addressed sponge over the permutation, parameterized at runtime by
/// rate and round count. Both the XOF and the MAC are thin shells around this.
#[derive(Clone, Debug)]
pub(crate) struct Sponge {
    lanes: [u64; STATE_WORDS],
    pos: usize,
    rate: usize,
    rounds: usize,
}

impl Sponge {
    pub fn new(rate: usize, rounds: usize) -> Self {
        debug_assert!(rate <= STATE_SIZE);

        Sponge { lanes: [0u64; STATE_WORDS], pos: 0, rate, rounds }
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    #[inline]
    fn xor_byte(&mut self, offset: usize, byte: u8) {
        self.lanes[offset / 8] ^= u64::from(byte) << (8 * (offset % 8));
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> u8 {
        (self.lanes[offset / 8] >> (8 * (offset % 8))) as u8
    }

    fn permute(&mut self) {
        permute_p1600(&mut self.lanes, self.rounds);
    }

    /// Fold bytes into the state at the current rate position, permuting at
    /// every rate boundary.
    pub fn absorb(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (self.rate - self.pos).min(data.len());
            for (i, &b) in data[..take].iter().enumerate() {
                self.xor_byte(self.pos + i, b);
            }
            self.pos += take;
            data = &data[take..];
            if self.pos == self.rate {
                self.permute();
                self.pos = 0;
            }
        }
    }

    /// Skip to the next rate boundary; the skipped bytes are zero, so this is
    /// the tail of the SP 800-185 `bytepad` rule.
    pub fn fill_block(&mut self) {
        if self.pos != 0 {
            self.permute();
            self.pos = 0;
        }
    }

    /// Apply the domain suffix and the pad10*1 terminator, then permute into
    /// the squeezing phase.
    pub fn finish(&mut self, domain: u8) {
        self.xor_byte(self.pos, domain);
        self.xor_byte(self.rate - 1, 0x80);
        self.permute();
        self.pos = 0;
    }

    /// Extract output bytes, permuting at every rate boundary. Only valid
    /// after [`Sponge::finish`].
    pub fn squeeze(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            let take = (self.rate - self.pos).min(out.len() - written);
            for i in 0..take {
                out[written + i] = self.byte_at(self.pos + i);
            }
            self.pos += take;
            written += take;
            if self.pos == self.rate {
                self.permute();
                self.pos = 0;
            }
        }
    }

    pub fn reset(&mut self) {
        self.lanes.zeroize();
        self.pos = 0;
    }
}

impl Zeroize for Sponge {
    fn zeroize(&mut self) {
        self.lanes.zeroize();
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfsr_matches_published_constants() {
        // FIPS-202 table; any drift in the generator breaks everything above
        let published: [u64; 24] = [
            0x0000000000000001,
            0x0000000000008082,
            0x800000000000808a,
            0x8000000080008000,
            0x000000000000808b,
            0x0000000080000001,
            0x8000000080008081,
            0x8000000000008009,
            0x000000000000008a,
            0x0000000000000088,
            0x0000000080008009,
            0x000000008000000a,
            0x000000008000808b,
            0x800000000000008b,
            0x8000000000008089,
            0x8000000000008003,
            0x8000000000008002,
            0x8000000000000080,
            0x000000000000800a,
            0x800000008000000a,
            0x8000000080008081,
            0x8000000000008080,
            0x0000000080000001,
            0x8000000080008008,
        ];
        assert_eq!(&ROUND_CONSTANTS[..24], &published);
    }

    #[test]
    fn f1600_zero_state_kat() {
        // test vector produced by XKCP rev 2a8d2311a830ab3037f8c7ef2511e5c7cc032127
        let mut lanes = [0u64; STATE_WORDS];
        permute_p1600(&mut lanes, 24);
        let expected = [
            0xF1258F7940E1DDE7,
            0x84D5CCF933C0478A,
            0xD598261EA65AA9EE,
            0xBD1547306F80494D,
            0x8B284E056253D057,
            0xFF97A42D7F8E6FD4,
            0x90FEE5A0A44647C4,
            0x8C5BDA0CD6192E76,
            0xAD30A6F71B19059C,
            0x30935AB7D08FFC64,
            0xEB5AA93F2317D635,
            0xA9A6E6260D712103,
            0x81A57C16DBCF555F,
            0x43B831CD0347C826,
            0x01F22F1A11A5569F,
            0x05E5635A21D9AE61,
            0x64BEFEF28CC970F2,
            0x613670957BC46611,
            0xB87C5A554FD00ECB,
            0x8C3EE88A1CCF32C8,
            0x940C7922AE3A2614,
            0x1841F924A2C509E4,
            0x16F53526E70465C2,
            0x75F644E97F30A13B,
            0xEAF1FF7B5CECA249,
        ];
        assert_eq!(lanes, expected);
    }

    #[test]
    fn f1600_double_permute_kat() {
        let mut lanes = [0u64; STATE_WORDS];
        permute_p1600(&mut lanes, 24);
        permute_p1600(&mut lanes, 24);
        let expected = [
            0x2D5C954DF96ECB3C,
            0x6A332CD07057B56D,
            0x093D8D1270D76B6C,
            0x8A20D9B25569D094,
            0x4F9C4F99E5E7F156,
            0xF957B9A2DA65FB38,
            0x85773DAE1275AF0D,
            0xFAF4F247C3D810F7,
            0x1F1B9EE6F79A8759,
            0xE4FECC0FEE98B425,
            0x68CE61B6B9CE68A1,
            0xDEEA66C4BA8F974F,
            0x33C43D836EAFB1F5,
            0xE00654042719DBD9,
            0x7CF8A9F009831265,
            0xFD5449A6BF174743,
            0x97DDAD33D8994B40,
            0x48EAD5FC5D0BE774,
            0xE3B8C8EE55B7B03C,
            0x91A0226E649E42E9,
            0x900E3129E7BADD7B,
            0x202A9EC5FAA3CCE8,
            0x5B3402464E1C3DB6,
            0x609F4E62A44C1059,
            0x20D06CD26A8FBF5C,
        ];
        assert_eq!(lanes, expected);
    }

    #[test]
    fn p1600_48_differs_from_two_f1600() {
        let mut a = [0u64; STATE_WORDS];
        let mut b = [0u64; STATE_WORDS];
        permute_p1600(&mut a, 48);
        permute_p1600(&mut b, 24);
        permute_p1600(&mut b, 24);
        assert_ne!(a, b);
    }

    #[test]
    fn sponge_position_spans_blocks() {
        let mut a = Sponge::new(136, 24);
        a.absorb(&[0xAB; 300]);
        a.finish(0x1F);
        let mut x = [0u8; 64];
        a.squeeze(&mut x);

        let mut b = Sponge::new(136, 24);
        b.absorb(&[0xAB; 100]);
        b.absorb(&[0xAB; 200]);
        b.finish(0x1F);
        let mut y = [0u8; 32];
        b.squeeze(&mut y);
        let mut z = [0u8; 32];
        b.squeeze(&mut z);

        assert_eq!(&x[..32], &y);
        assert_eq!(&x[32..], &z);
    }
}
