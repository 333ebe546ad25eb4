//! RWS, the 512-bit-block wide Rijndael authenticated stream cipher.
//!
//! Accepts 128/256/512-bit keys. The wider block doubles the keystream per
//! counter and raises the round counts to 20/40/80 to keep full diffusion
//! over the 16-column state.

use byteorder::{ByteOrder, LittleEndian};

use crate::cshake::{CShake, ShakeMode};
use crate::rijndael::RwsCipher;
use crate::stream::{CipherVariant, StreamCipher};

/// The RWS parameter table.
pub struct RwsVariant;

impl CipherVariant for RwsVariant {
    type Cipher = RwsCipher;

    const NONCE_SIZE: usize = 64;
    const NAME: &'static str = "RWS";
    const AUTH_PREFIX: &'static str = "RWS";
    const VERSION_INFO: &'static [u8; 16] = b"RWS version 1.1a";
    const LEGAL_KEY_SIZES: &'static [usize] = &[16, 32, 64];
    const SERIALIZED_ROUNDS_WIDTH: usize = 2;

    fn rounds(key_size: usize) -> u32 {
        match key_size {
            16 => 20,
            32 => 40,
            _ => 80,
        }
    }

    fn shake_mode(key_size: usize) -> ShakeMode {
        match key_size {
            16 => ShakeMode::Shake128,
            32 => ShakeMode::Shake256,
            _ => ShakeMode::Shake512,
        }
    }

    fn expand(xof: &mut CShake, rounds: u32) -> RwsCipher {
        RwsCipher::from_xof(xof, rounds)
    }

    fn export(cipher: &RwsCipher) -> Vec<u8> {
        let words = cipher.round_key_words();
        let mut bytes = vec![0u8; words.len() * 4];
        LittleEndian::write_u32_into(words, &mut bytes);
        bytes
    }

    fn import(bytes: &[u8], rounds: u32) -> Option<RwsCipher> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return None;
        }
        let mut words = vec![0u32; bytes.len() / 4];
        LittleEndian::read_u32_into(bytes, &mut words);
        RwsCipher::from_words(words, rounds)
    }
}

/// The RWS authenticated stream cipher.
pub type Rws = StreamCipher<RwsVariant>;
