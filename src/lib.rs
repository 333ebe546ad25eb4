//! A family of wide-block authenticated stream ciphers built from a
//! counter-mode keystream generator and a KMAC authenticator, keyed through
//! a single cSHAKE key schedule.
//!
//! The three members are:
//!
//! 1. [`Rcs`], a 256-bit-block Rijndael variant with 256/512/1024-bit keys
//!    and 22/30/38 rounds.
//! 2. [`Rws`], a 512-bit-block Rijndael variant with 128/256/512-bit keys
//!    and 20/40/80 rounds.
//! 3. [`Tsx1024`], a Threefish-1024 variant at 120 rounds with
//!    256/512/1024-bit keys.
//!
//! Each derives its round keys and MAC key from the user key with one cSHAKE
//! pass whose name string carries the cipher's formal name, the key size, and
//! a finalisation counter; the MAC key is rotated through cSHAKE after every
//! message, so back-to-back tags under the same user key never share a keyed
//! state. Tag sizes equal the key size (16/32/64/128 bytes), tag comparison
//! is constant-time, and decryption releases no plaintext on a tag mismatch.
//!
//! Transforms over payloads of at least
//! [`StreamCipher::parallel_block_size`] bytes generate their keystream on a
//! fork-join worker pool, each worker's counter pre-advanced to its chunk;
//! the output is bit-identical to the sequential path.
//!
//! Key material is zeroised on drop and on re-initialization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;

use zeroize::ZeroizeOnDrop;

pub mod cshake;
mod ctr;
pub mod keccak;
pub mod kmac;
mod rcs;
mod rijndael;
mod rws;
mod stream;
mod threefish;
mod tsx1024;

mod fuzzing;

pub use crate::ctr::{KeystreamCipher, ParallelOptions};
pub use crate::rcs::{Rcs, RcsVariant};
pub use crate::rijndael::{RcsCipher, RwsCipher};
pub use crate::rws::{Rws, RwsVariant};
pub use crate::stream::{CipherVariant, StreamCipher};
pub use crate::threefish::Tsx1024Cipher;
pub use crate::tsx1024::{Tsx1024, Tsx1024Variant};

/// The size of a non-empty info (customization) string in bytes.
pub const INFO_SIZE: usize = 16;

/// The closed set of failures surfaced by the cipher family. Nothing is
/// recovered internally; every fallible operation reports to its caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The key size is not in the legal set, or a serialized state is
    /// malformed.
    InvalidKey,
    /// The nonce does not fill the cipher's counter register.
    InvalidNonce,
    /// The info string is neither empty nor 16 bytes.
    InvalidInfo,
    /// An output buffer is too small, or a size parameter is out of bounds.
    InvalidSize,
    /// A configuration value was rejected.
    InvalidParam,
    /// The operation requires a keyed instance.
    NotInitialized,
    /// The operation is not legal in the current state, e.g. associated data
    /// on an unauthenticated instance.
    IllegalOperation,
    /// The configuration is not supported by the host, e.g. a parallel
    /// degree beyond the processor count.
    NotSupported,
    /// The MAC tag did not match during decryption.
    AuthenticationFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidKey => "invalid key size or malformed key state",
            Error::InvalidNonce => "nonce size must equal the cipher block size",
            Error::InvalidInfo => "info size must be zero or sixteen bytes",
            Error::InvalidSize => "buffer or size parameter out of bounds",
            Error::InvalidParam => "configuration parameter rejected",
            Error::NotInitialized => "the cipher has not been initialized",
            Error::IllegalOperation => "operation not legal in the current state",
            Error::NotSupported => "configuration not supported on this host",
            Error::AuthenticationFailure => "the authentication tag does not match",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

/// The keying material consumed by [`StreamCipher::initialize`]: a secret
/// key, a public nonce the size of the counter register, and an optional
/// 16-byte info string that customizes the key schedule. Zeroised on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: Vec<u8>,
    nonce: Vec<u8>,
    info: Vec<u8>,
}

impl SymmetricKey {
    /// Returns keying material with an empty info string; the cipher's fixed
    /// version tag customizes the key schedule.
    pub fn new(key: Vec<u8>, nonce: Vec<u8>) -> Self {
        SymmetricKey { key, nonce, info: Vec::new() }
    }

    /// Returns keying material with a caller-supplied info string.
    pub fn with_info(key: Vec<u8>, nonce: Vec<u8>, info: Vec<u8>) -> Self {
        SymmetricKey { key, nonce, info }
    }

    /// The secret key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The nonce.
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// The info string; empty unless supplied.
    pub fn info(&self) -> &[u8] {
        &self.info
    }
}
