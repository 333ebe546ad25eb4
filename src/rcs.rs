//! RCS, the 256-bit-block wide Rijndael authenticated stream cipher.
//!
//! Accepts 256/512/1024-bit keys; the key size selects the round count, the
//! key-schedule XOF mode, and (when authenticating) the KMAC mode and tag
//! size, so `Rcs` with a 32-byte key is the RCS-256/KMAC-256 configuration.

use byteorder::{ByteOrder, LittleEndian};

use crate::cshake::{CShake, ShakeMode};
use crate::rijndael::RcsCipher;
use crate::stream::{CipherVariant, StreamCipher};

/// The RCS parameter table.
pub struct RcsVariant;

impl CipherVariant for RcsVariant {
    type Cipher = RcsCipher;

    const NONCE_SIZE: usize = 32;
    const NAME: &'static str = "RCS";
    const AUTH_PREFIX: &'static str = "RCS";
    const VERSION_INFO: &'static [u8; 16] = b"RCS version 1.0a";
    const LEGAL_KEY_SIZES: &'static [usize] = &[32, 64, 128];

    fn rounds(key_size: usize) -> u32 {
        match key_size {
            32 => 22,
            64 => 30,
            _ => 38,
        }
    }

    fn shake_mode(key_size: usize) -> ShakeMode {
        match key_size {
            32 => ShakeMode::Shake256,
            64 => ShakeMode::Shake512,
            _ => ShakeMode::Shake1024,
        }
    }

    fn expand(xof: &mut CShake, rounds: u32) -> RcsCipher {
        RcsCipher::from_xof(xof, rounds)
    }

    fn export(cipher: &RcsCipher) -> Vec<u8> {
        let words = cipher.round_key_words();
        let mut bytes = vec![0u8; words.len() * 4];
        LittleEndian::write_u32_into(words, &mut bytes);
        bytes
    }

    fn import(bytes: &[u8], rounds: u32) -> Option<RcsCipher> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return None;
        }
        let mut words = vec![0u32; bytes.len() / 4];
        LittleEndian::read_u32_into(bytes, &mut words);
        RcsCipher::from_words(words, rounds)
    }
}

/// The RCS authenticated stream cipher.
pub type Rcs = StreamCipher<RcsVariant>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymmetricKey;

    #[test]
    fn formal_names() {
        assert_eq!(Rcs::new(false).name(), "RCS");

        let mut cipher = Rcs::new(true);
        cipher
            .initialize(true, &SymmetricKey::new(vec![0; 32], vec![0; 32]))
            .unwrap();
        assert_eq!(cipher.name(), "RCSK256");

        let mut cipher = Rcs::new(true);
        cipher
            .initialize(true, &SymmetricKey::new(vec![0; 64], vec![0; 32]))
            .unwrap();
        assert_eq!(cipher.name(), "RCSK512");

        let mut cipher = Rcs::new(true);
        cipher
            .initialize(true, &SymmetricKey::new(vec![0; 128], vec![0; 32]))
            .unwrap();
        assert_eq!(cipher.name(), "RCSK1024");
    }

    #[test]
    fn tag_size_tracks_key_size() {
        for key_size in [32usize, 64, 128] {
            let mut cipher = Rcs::new(true);
            cipher
                .initialize(true, &SymmetricKey::new(vec![0; key_size], vec![0; 32]))
                .unwrap();
            assert_eq!(cipher.tag_size().unwrap(), key_size);
        }
    }

    #[test]
    fn round_trip_all_key_sizes() {
        let msg = b"the quick brown fox jumps over the lazy dog";

        for key_size in [32usize, 64, 128] {
            let key = SymmetricKey::new(vec![0x2A; key_size], vec![0x0F; 32]);

            let mut enc = Rcs::new(true);
            enc.initialize(true, &key).unwrap();
            let mut ct = vec![0u8; msg.len() + key_size];
            enc.transform(msg, &mut ct).unwrap();

            let mut dec = Rcs::new(true);
            dec.initialize(false, &key).unwrap();
            let mut pt = vec![0u8; msg.len()];
            dec.transform(&ct, &mut pt).unwrap();

            assert_eq!(&pt, msg, "key size {key_size}");
            assert_ne!(&ct[..msg.len()], msg, "key size {key_size}");
        }
    }
}
