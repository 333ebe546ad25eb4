//! The customizable SHAKE XOF (SP 800-185) used as the key-schedule
//! generator for the cipher family.
//!
//! Initialized with a key, a customization string, and a name string, the
//! XOF absorbs `bytepad(encode_string(name) || encode_string(custom), rate)`
//! followed by the key as message data, then produces an unbounded output
//! stream. With both strings empty it degrades to plain SHAKE. Two ciphers
//! keyed identically but with different name strings draw from disjoint
//! streams; the key schedule leans on exactly that property.

use zeroize::ZeroizeOnDrop;

use crate::keccak::Sponge;

const CSHAKE_DOMAIN: u8 = 0x04;
const SHAKE_DOMAIN: u8 = 0x1F;

/// The security level of the XOF, which selects the sponge rate and the
/// permutation round count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShakeMode {
    /// 128-bit security, 168-byte rate.
    Shake128,
    /// 256-bit security, 136-byte rate.
    Shake256,
    /// 512-bit security, 72-byte rate.
    Shake512,
    /// 1024-bit security, 36-byte rate over the 48-round permutation.
    Shake1024,
}

impl ShakeMode {
    /// The sponge rate in bytes.
    pub const fn rate(self) -> usize {
        match self {
            ShakeMode::Shake128 => 168,
            ShakeMode::Shake256 => 136,
            ShakeMode::Shake512 => 72,
            ShakeMode::Shake1024 => 36,
        }
    }

    /// The permutation round count backing this rate.
    pub const fn rounds(self) -> usize {
        match self {
            ShakeMode::Shake1024 => 48,
            _ => 24,
        }
    }

    /// The security level in bytes.
    pub const fn security(self) -> usize {
        match self {
            ShakeMode::Shake128 => 16,
            ShakeMode::Shake256 => 32,
            ShakeMode::Shake512 => 64,
            ShakeMode::Shake1024 => 128,
        }
    }

    pub(crate) const fn id(self) -> u8 {
        match self {
            ShakeMode::Shake128 => 1,
            ShakeMode::Shake256 => 2,
            ShakeMode::Shake512 => 3,
            ShakeMode::Shake1024 => 4,
        }
    }

    pub(crate) const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(ShakeMode::Shake128),
            2 => Some(ShakeMode::Shake256),
            3 => Some(ShakeMode::Shake512),
            4 => Some(ShakeMode::Shake1024),
            _ => None,
        }
    }
}

/// SP 800-185 2.3.1 `left_encode`: the value preceded by the byte-length of
/// its minimal big-endian encoding.
pub(crate) fn left_encode(out: &mut Vec<u8>, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = if value == 0 { 7 } else { value.leading_zeros() as usize / 8 };
    out.push((8 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// SP 800-185 2.3.1 `right_encode`: as `left_encode` with the length byte
/// appended instead of prepended.
pub(crate) fn right_encode(out: &mut Vec<u8>, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = if value == 0 { 7 } else { value.leading_zeros() as usize / 8 };
    out.extend_from_slice(&bytes[skip..]);
    out.push((8 - skip) as u8);
}

/// SP 800-185 2.3.2 `encode_string`: the bit-length prefix followed by the
/// string itself.
pub(crate) fn encode_string(out: &mut Vec<u8>, s: &[u8]) {
    left_encode(out, (s.len() as u64) * 8);
    out.extend_from_slice(s);
}

/// The keyed XOF. Create with [`CShake::new`], key with
/// [`CShake::initialize`], then draw output with [`CShake::squeeze`].
#[derive(Clone, Debug, ZeroizeOnDrop)]
pub struct CShake {
    sponge: Sponge,
    #[zeroize(skip)]
    mode: ShakeMode,
    #[zeroize(skip)]
    domain: u8,
    #[zeroize(skip)]
    squeezing: bool,
}

impl CShake {
    /// Returns a new XOF at the given security mode.
    pub fn new(mode: ShakeMode) -> Self {
        CShake {
            sponge: Sponge::new(mode.rate(), mode.rounds()),
            mode,
            domain: SHAKE_DOMAIN,
            squeezing: false,
        }
    }

    /// The mode this instance was created with.
    pub fn mode(&self) -> ShakeMode {
        self.mode
    }

    /// Key the XOF. The name and customization strings are absorbed under the
    /// `bytepad` rule first; the key is absorbed as message data. Any prior
    /// state is discarded.
    pub fn initialize(&mut self, key: &[u8], custom: &[u8], name: &[u8]) {
        self.sponge.reset();
        self.squeezing = false;

        if custom.is_empty() && name.is_empty() {
            self.domain = SHAKE_DOMAIN;
        } else {
            self.domain = CSHAKE_DOMAIN;
            let mut header = Vec::with_capacity(8 + custom.len() + name.len());
            left_encode(&mut header, self.sponge.rate() as u64);
            encode_string(&mut header, name);
            encode_string(&mut header, custom);
            self.sponge.absorb(&header);
            self.sponge.fill_block();
        }

        self.sponge.absorb(key);
    }

    /// Fill `out` with the next bytes of the output stream.
    pub fn squeeze(&mut self, out: &mut [u8]) {
        if !self.squeezing {
            self.sponge.finish(self.domain);
            self.squeezing = true;
        }
        self.sponge.squeeze(out);
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn plain_shake256() {
        // SHAKE256(""), first 64 bytes; NIST FIPS-202 example values
        let mut xof = CShake::new(ShakeMode::Shake256);
        xof.initialize(&[], &[], &[]);
        let mut out = [0u8; 64];
        xof.squeeze(&mut out);
        assert_eq!(
            out,
            hex!(
                "46b9dd2b0ba88d13233b3feb743eeb243fcd52ea62b81b82b50c27646ed5762f"
                "d75dc4ddd8c0f200cb05019d67b592f6fc821c49479ab48640292eacb3b7c4be"
            )
        );
    }

    #[test]
    fn name_string_separates_streams() {
        let mut a = CShake::new(ShakeMode::Shake256);
        a.initialize(b"key", b"", b"RCSK256");
        let mut b = CShake::new(ShakeMode::Shake256);
        b.initialize(b"key", b"", b"RWSK256");

        let (mut x, mut y) = ([0u8; 32], [0u8; 32]);
        a.squeeze(&mut x);
        b.squeeze(&mut y);
        assert_ne!(x, y);
    }

    #[test]
    fn squeeze_is_streamed() {
        let mut a = CShake::new(ShakeMode::Shake512);
        a.initialize(b"key", b"custom", b"name");
        let mut whole = [0u8; 100];
        a.squeeze(&mut whole);

        let mut b = CShake::new(ShakeMode::Shake512);
        b.initialize(b"key", b"custom", b"name");
        let mut parts = [0u8; 100];
        for chunk in parts.chunks_mut(7) {
            b.squeeze(chunk);
        }
        assert_eq!(whole, parts);
    }

    #[test]
    fn left_encode_values() {
        let mut v = Vec::new();
        left_encode(&mut v, 0);
        assert_eq!(v, [1, 0]);

        v.clear();
        left_encode(&mut v, 168);
        assert_eq!(v, [1, 168]);

        v.clear();
        left_encode(&mut v, 256);
        assert_eq!(v, [2, 1, 0]);
    }

    #[test]
    fn right_encode_values() {
        let mut v = Vec::new();
        right_encode(&mut v, 0);
        assert_eq!(v, [0, 1]);

        v.clear();
        right_encode(&mut v, 2048);
        assert_eq!(v, [8, 0, 2]);
    }
}
