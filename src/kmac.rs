//! The KMAC message-authentication code (SP 800-185) over the Keccak
//! permutation, at the four security levels used by the cipher family.
//!
//! KMAC-128 and KMAC-256 are the standard constructions and reproduce the
//! NIST sample vectors. KMAC-512 and KMAC-1024 generalize the same code path
//! to the 72- and 36-byte rates, the latter over the 48-round permutation.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cshake::{encode_string, left_encode, right_encode};
use crate::keccak::Sponge;
use crate::Error;

const KMAC_DOMAIN: u8 = 0x04;
const FUNCTION_NAME: &[u8] = b"KMAC";

/// The security level of the MAC, which selects the sponge rate, the
/// permutation round count, and the default tag size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KmacMode {
    /// 128-bit security, 168-byte rate, 16-byte default tag.
    Kmac128,
    /// 256-bit security, 136-byte rate, 32-byte default tag.
    Kmac256,
    /// 512-bit security, 72-byte rate, 64-byte default tag.
    Kmac512,
    /// 1024-bit security, 36-byte rate over the 48-round permutation,
    /// 128-byte default tag.
    Kmac1024,
}

impl KmacMode {
    /// The sponge rate in bytes.
    pub const fn rate(self) -> usize {
        match self {
            KmacMode::Kmac128 => 168,
            KmacMode::Kmac256 => 136,
            KmacMode::Kmac512 => 72,
            KmacMode::Kmac1024 => 36,
        }
    }

    /// The permutation round count backing this rate.
    pub const fn rounds(self) -> usize {
        match self {
            KmacMode::Kmac1024 => 48,
            _ => 24,
        }
    }

    /// The security level, and with it the default tag size, in bytes.
    pub const fn security(self) -> usize {
        match self {
            KmacMode::Kmac128 => 16,
            KmacMode::Kmac256 => 32,
            KmacMode::Kmac512 => 64,
            KmacMode::Kmac1024 => 128,
        }
    }

    /// The default tag size in bytes.
    pub const fn tag_size(self) -> usize {
        self.security()
    }

    /// The shortest key accepted by this mode: the security level in bytes.
    pub const fn min_key_size(self) -> usize {
        self.security()
    }

    pub(crate) const fn id(self) -> u8 {
        match self {
            KmacMode::Kmac128 => 1,
            KmacMode::Kmac256 => 2,
            KmacMode::Kmac512 => 3,
            KmacMode::Kmac1024 => 4,
        }
    }

    pub(crate) const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(KmacMode::Kmac128),
            2 => Some(KmacMode::Kmac256),
            3 => Some(KmacMode::Kmac512),
            4 => Some(KmacMode::Kmac1024),
            _ => None,
        }
    }
}

/// The keyed MAC generator.
///
/// [`Kmac::finalize`] is single-shot: it consumes the absorbed message and
/// the generator must be re-initialized (with the same or a fresh key) before
/// further use.
#[derive(Clone, Debug, ZeroizeOnDrop)]
pub struct Kmac {
    sponge: Sponge,
    #[zeroize(skip)]
    mode: KmacMode,
    #[zeroize(skip)]
    initialized: bool,
}

impl Kmac {
    /// Returns a new MAC generator at the given security mode.
    pub fn new(mode: KmacMode) -> Self {
        Kmac {
            sponge: Sponge::new(mode.rate(), mode.rounds()),
            mode,
            initialized: false,
        }
    }

    /// The mode this instance was created with.
    pub fn mode(&self) -> KmacMode {
        self.mode
    }

    /// `true` once a key has been loaded and until the next finalize/reset.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Key the generator, discarding any prior state. The key must be at
    /// least [`KmacMode::min_key_size`] bytes; the customization string may
    /// be empty.
    pub fn initialize(&mut self, key: &[u8], customization: &[u8]) -> Result<(), Error> {
        if key.len() < self.mode.min_key_size() {
            return Err(Error::InvalidKey);
        }

        self.load_key(key, customization);
        Ok(())
    }

    fn load_key(&mut self, key: &[u8], customization: &[u8]) {
        self.sponge.reset();

        let mut header = Vec::with_capacity(8 + FUNCTION_NAME.len() + customization.len());
        left_encode(&mut header, self.sponge.rate() as u64);
        encode_string(&mut header, FUNCTION_NAME);
        encode_string(&mut header, customization);
        self.sponge.absorb(&header);
        self.sponge.fill_block();

        let mut padded_key = Vec::with_capacity(8 + key.len());
        left_encode(&mut padded_key, self.sponge.rate() as u64);
        encode_string(&mut padded_key, key);
        self.sponge.absorb(&padded_key);
        self.sponge.fill_block();
        padded_key.zeroize();

        self.initialized = true;
    }

    /// Absorb message bytes.
    pub fn update(&mut self, data: &[u8]) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        self.sponge.absorb(data);
        Ok(())
    }

    /// Complete the MAC, filling all of `out` with the code. The output
    /// length is bound into the MAC, so requests of different lengths yield
    /// unrelated codes.
    pub fn finalize(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if out.is_empty() {
            return Err(Error::InvalidSize);
        }

        let mut trailer = Vec::with_capacity(9);
        right_encode(&mut trailer, (out.len() as u64) * 8);
        self.sponge.absorb(&trailer);
        self.sponge.finish(KMAC_DOMAIN);
        self.sponge.squeeze(out);

        self.initialized = false;
        self.sponge.reset();
        Ok(out.len())
    }

    /// Zeroise all state; the generator must be re-initialized before use.
    pub fn reset(&mut self) {
        self.sponge.reset();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    const NIST_KEY: [u8; 32] = hex!("404142434445464748494a4b4c4d4e4f505152535455565758595a5b5c5d5e5f");
    const CUSTOM: &[u8] = b"My Tagged Application";

    fn kmac(mode: KmacMode, key: &[u8], custom: &[u8], msg: &[u8], out: &mut [u8]) {
        let mut mac = Kmac::new(mode);
        mac.initialize(key, custom).unwrap();
        mac.update(msg).unwrap();
        mac.finalize(out).unwrap();
    }

    /// Keys the generator directly, bypassing the length floor; the
    /// published KMAC-512 vectors use a 21-byte key.
    fn kmac_short_key(mode: KmacMode, key: &[u8], custom: &[u8], msg: &[u8], out: &mut [u8]) {
        let mut mac = Kmac::new(mode);
        mac.load_key(key, custom);
        mac.update(msg).unwrap();
        mac.finalize(out).unwrap();
    }

    #[test]
    fn kmac128_sp800_185_sample_1() {
        let mut tag = [0u8; 32];
        kmac(KmacMode::Kmac128, &NIST_KEY, b"", &hex!("00010203"), &mut tag);
        assert_eq!(
            tag,
            hex!("e5780b0d3ea6f7d3a429c5706aa43a00fadbd7d49628839e3187243f456ee14e")
        );
    }

    #[test]
    fn kmac128_sp800_185_sample_2() {
        let mut tag = [0u8; 32];
        kmac(KmacMode::Kmac128, &NIST_KEY, CUSTOM, &hex!("00010203"), &mut tag);
        assert_eq!(
            tag,
            hex!("3b1fba963cd8b0b59e8c1a6d71888b7143651af8ba0a7070c0979e2811324aa5")
        );
    }

    #[test]
    fn kmac128_sp800_185_sample_3() {
        let msg: Vec<u8> = (0..=0xc7).collect();
        let mut tag = [0u8; 32];
        kmac(KmacMode::Kmac128, &NIST_KEY, CUSTOM, &msg, &mut tag);
        assert_eq!(
            tag,
            hex!("1f5b4e6cca02209e0dcb5ca635b89a15e271ecc760071dfd805faa38f9729230")
        );
    }

    #[test]
    fn kmac256_sp800_185_sample_4() {
        let mut tag = [0u8; 64];
        kmac(KmacMode::Kmac256, &NIST_KEY, CUSTOM, &hex!("00010203"), &mut tag);
        assert_eq!(
            tag,
            hex!(
                "20c570c31346f703c9ac36c61c03cb64c3970d0cfc787e9b79599d273a68d2f7"
                "f69d4cc3de9d104a351689f27cf6f5951f0103f33f4f24871024d9c27773a8dd"
            )
        );
    }

    #[test]
    fn kmac256_sp800_185_sample_5() {
        let msg: Vec<u8> = (0..=0xc7).collect();
        let mut tag = [0u8; 64];
        kmac(KmacMode::Kmac256, &NIST_KEY, b"", &msg, &mut tag);
        assert_eq!(
            tag,
            hex!(
                "75358cf39e41494e949707927cee0af20a3ff553904c86b08f21cc414bcfd691"
                "589d27cf5e15369cbbff8b9a4c2eb17800855d0235ff635da82533ec6b759b69"
            )
        );
    }

    #[test]
    fn kmac256_sp800_185_sample_6() {
        let msg: Vec<u8> = (0..=0xc7).collect();
        let mut tag = [0u8; 64];
        kmac(KmacMode::Kmac256, &NIST_KEY, CUSTOM, &msg, &mut tag);
        assert_eq!(
            tag,
            hex!(
                "b58618f71f92e1d56c1b8c55ddd7cd188b97b4ca4d99831eb2699a837da2e4d9"
                "70fbacfde50033aea585f1a2708510c32d07880801bd182898fe476876fc8965"
            )
        );
    }

    #[test]
    fn kmac512_rate72_vectors() {
        // same construction generalized to the 72-byte rate
        let mut tag = [0u8; 64];
        kmac_short_key(KmacMode::Kmac512, CUSTOM, CUSTOM, &[CUSTOM, CUSTOM].concat(), &mut tag);
        assert_eq!(
            tag,
            hex!(
                "c41f31cee9851baa915716c16f7670c7c137c1908bd9694da80c679aa6eb5964"
                "e76ad91f2018de576524d84e0b0fc586c06b110ed6db273a921ffc86d1c20ce8"
            )
        );
    }

    #[test]
    fn kmac1024_is_deterministic_and_keyed() {
        let mut a = [0u8; 128];
        let mut b = [0u8; 128];
        kmac(KmacMode::Kmac1024, &[0x55; 128], b"", b"message", &mut a);
        kmac(KmacMode::Kmac1024, &[0x55; 128], b"", b"message", &mut b);
        assert_eq!(a, b);

        kmac(KmacMode::Kmac1024, &[0x56; 128], b"", b"message", &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn update_is_streamed() {
        let msg: Vec<u8> = (0..200).collect();
        let mut whole = [0u8; 32];
        kmac(KmacMode::Kmac256, &NIST_KEY, b"", &msg, &mut whole);

        let mut mac = Kmac::new(KmacMode::Kmac256);
        mac.initialize(&NIST_KEY, b"").unwrap();
        for chunk in msg.chunks(13) {
            mac.update(chunk).unwrap();
        }
        let mut split = [0u8; 32];
        mac.finalize(&mut split).unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn finalize_is_single_shot() {
        let mut mac = Kmac::new(KmacMode::Kmac256);
        mac.initialize(&NIST_KEY, b"").unwrap();
        mac.update(b"data").unwrap();
        let mut tag = [0u8; 32];
        mac.finalize(&mut tag).unwrap();

        assert_eq!(mac.update(b"more"), Err(Error::NotInitialized));
        assert_eq!(mac.finalize(&mut tag), Err(Error::NotInitialized));
    }

    #[test]
    fn key_floor_is_the_security_level() {
        for mode in [KmacMode::Kmac128, KmacMode::Kmac256, KmacMode::Kmac512, KmacMode::Kmac1024] {
            let mut mac = Kmac::new(mode);
            let short = vec![0u8; mode.min_key_size() - 1];
            assert_eq!(mac.initialize(&short, b""), Err(Error::InvalidKey));
            mac.initialize(&vec![0u8; mode.min_key_size()], b"").unwrap();
        }
    }

    #[test]
    fn rejects_empty_output() {
        let mut mac = Kmac::new(KmacMode::Kmac128);
        mac.initialize(&[0u8; 16], b"").unwrap();
        let mut empty = [0u8; 0];
        assert_eq!(mac.finalize(&mut empty), Err(Error::InvalidSize));
    }
}
