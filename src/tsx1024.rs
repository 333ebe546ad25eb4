//! TSX-1024, the Threefish-1024 authenticated stream cipher.
//!
//! The 128-byte cipher key and 16-byte tweak are always drawn from the
//! key-schedule XOF, so the user key may be 256, 512, or 1024 bits; the key
//! size selects only the XOF and KMAC modes. The 16-byte nonce register is
//! the whole 128-bit counter, word 0 low.

use byteorder::{ByteOrder, LittleEndian};

use crate::cshake::{CShake, ShakeMode};
use crate::stream::{CipherVariant, StreamCipher};
use crate::threefish::Tsx1024Cipher;

const KEY_WORDS: usize = 16;

/// The TSX-1024 parameter table.
pub struct Tsx1024Variant;

impl CipherVariant for Tsx1024Variant {
    type Cipher = Tsx1024Cipher;

    const NONCE_SIZE: usize = 16;
    const NAME: &'static str = "TSX1024";
    const AUTH_PREFIX: &'static str = "TSX";
    const VERSION_INFO: &'static [u8; 16] = b"TSX version 1.1a";
    const LEGAL_KEY_SIZES: &'static [usize] = &[32, 64, 128];

    fn rounds(_key_size: usize) -> u32 {
        120
    }

    fn shake_mode(key_size: usize) -> ShakeMode {
        match key_size {
            32 => ShakeMode::Shake256,
            64 => ShakeMode::Shake512,
            _ => ShakeMode::Shake1024,
        }
    }

    fn expand(xof: &mut CShake, rounds: u32) -> Tsx1024Cipher {
        Tsx1024Cipher::from_xof(xof, rounds)
    }

    fn export(cipher: &Tsx1024Cipher) -> Vec<u8> {
        let mut bytes = vec![0u8; (KEY_WORDS + 2) * 8];
        LittleEndian::write_u64_into(cipher.key_words(), &mut bytes[..KEY_WORDS * 8]);
        LittleEndian::write_u64_into(&cipher.tweak_words(), &mut bytes[KEY_WORDS * 8..]);
        bytes
    }

    fn import(bytes: &[u8], rounds: u32) -> Option<Tsx1024Cipher> {
        if bytes.len() != (KEY_WORDS + 2) * 8 || rounds % 4 != 0 || rounds == 0 {
            return None;
        }
        let mut key_words = [0u64; KEY_WORDS];
        LittleEndian::read_u64_into(&bytes[..KEY_WORDS * 8], &mut key_words);
        let mut tweak_words = [0u64; 2];
        LittleEndian::read_u64_into(&bytes[KEY_WORDS * 8..], &mut tweak_words);
        Some(Tsx1024Cipher::from_words(key_words, tweak_words, rounds))
    }
}

/// The TSX-1024 authenticated stream cipher.
pub type Tsx1024 = StreamCipher<Tsx1024Variant>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymmetricKey;

    #[test]
    fn formal_names() {
        assert_eq!(Tsx1024::new(false).name(), "TSX1024");

        let mut cipher = Tsx1024::new(true);
        cipher
            .initialize(true, &SymmetricKey::new(vec![0; 128], vec![0; 16]))
            .unwrap();
        assert_eq!(cipher.name(), "TSXK1024");
    }

    #[test]
    fn round_trip_all_key_sizes() {
        // spans several 128-byte blocks plus a partial one
        let msg = [0xC3u8; 500];

        for key_size in [32usize, 64, 128] {
            let key = SymmetricKey::new(vec![0x2A; key_size], vec![0x0F; 16]);

            let mut enc = Tsx1024::new(true);
            enc.initialize(true, &key).unwrap();
            let mut ct = vec![0u8; msg.len() + key_size];
            enc.transform(&msg, &mut ct).unwrap();

            let mut dec = Tsx1024::new(true);
            dec.initialize(false, &key).unwrap();
            let mut pt = vec![0u8; msg.len()];
            dec.transform(&ct, &mut pt).unwrap();

            assert_eq!(pt, msg, "key size {key_size}");
        }
    }

    #[test]
    fn info_string_tweaks_the_cipher() {
        let msg = [0u8; 64];
        let plain = SymmetricKey::new(vec![1; 32], vec![2; 16]);
        let tweaked = SymmetricKey::with_info(vec![1; 32], vec![2; 16], vec![3; 16]);

        let mut a = Tsx1024::new(false);
        a.initialize(true, &plain).unwrap();
        let mut x = vec![0u8; 64];
        a.transform(&msg, &mut x).unwrap();

        let mut b = Tsx1024::new(false);
        b.initialize(true, &tweaked).unwrap();
        let mut y = vec![0u8; 64];
        b.transform(&msg, &mut y).unwrap();

        assert_ne!(x, y);
    }
}
