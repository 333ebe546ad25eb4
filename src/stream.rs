//! The authenticated stream-cipher core shared by the RCS, RWS, and TSX-1024
//! variants: keying, the MAC discipline, the transform state machine, and
//! state serialization.
//!
//! A single cSHAKE pass over (key, customization, name) produces the cipher
//! round keys and then the MAC key, so the entire keyed state of an instance
//! is one XOF stream. The name string carries the finalisation counter in its
//! first 8 bytes; every finalize refreshes it and rotates the MAC key through
//! cSHAKE again, which keeps successive tags under one user key on disjoint
//! XOF inputs.

use byteorder::{ByteOrder, LittleEndian};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::cshake::{CShake, ShakeMode};
use crate::ctr::{self, KeystreamCipher, ParallelOptions};
use crate::kmac::{Kmac, KmacMode};
use crate::{Error, SymmetricKey, INFO_SIZE};

/// The parameter table of one member of the cipher family.
///
/// Implemented by [`RcsVariant`](crate::RcsVariant),
/// [`RwsVariant`](crate::RwsVariant), and
/// [`Tsx1024Variant`](crate::Tsx1024Variant); the variant is fixed in the
/// type, not selected at run time.
pub trait CipherVariant {
    /// The keystream block cipher.
    type Cipher: KeystreamCipher + Clone + Zeroize + Send + Sync;

    /// The nonce/counter register size in bytes.
    const NONCE_SIZE: usize;

    /// The formal name of the unauthenticated cipher.
    const NAME: &'static str;

    /// The name prefix of the authenticated cipher; the KMAC mode is
    /// appended (`"RCS"` becomes `"RCSK256"`).
    const AUTH_PREFIX: &'static str;

    /// The 16-byte customization used when no info string is supplied.
    const VERSION_INFO: &'static [u8; 16];

    /// Accepted key sizes in bytes.
    const LEGAL_KEY_SIZES: &'static [usize];

    /// The width in bytes (2 or 4) of the round-count field in the
    /// serialized state; the wide-block 512-bit variant uses 2.
    const SERIALIZED_ROUNDS_WIDTH: usize = 4;

    /// The round count for a legal key size.
    fn rounds(key_size: usize) -> u32;

    /// The XOF security mode for a legal key size.
    fn shake_mode(key_size: usize) -> ShakeMode;

    /// Draw the cipher's key material from the key-schedule stream.
    fn expand(xof: &mut CShake, rounds: u32) -> Self::Cipher;

    /// The cipher's key material as the serialized byte layout.
    fn export(cipher: &Self::Cipher) -> Vec<u8>;

    /// Rebuild the cipher from [`CipherVariant::export`] output.
    fn import(bytes: &[u8], rounds: u32) -> Option<Self::Cipher>;
}

const fn kmac_for(mode: ShakeMode) -> KmacMode {
    match mode {
        ShakeMode::Shake128 => KmacMode::Kmac128,
        ShakeMode::Shake256 => KmacMode::Kmac256,
        ShakeMode::Shake512 => KmacMode::Kmac512,
        ShakeMode::Shake1024 => KmacMode::Kmac1024,
    }
}

/// An authenticated counter-mode stream cipher.
///
/// The state machine is: construct, [`StreamCipher::initialize`] for a
/// direction, then any sequence of [`StreamCipher::set_associated_data`] and
/// [`StreamCipher::transform`] calls; re-initializing starts a new epoch and
/// zeroises the old one. Dropping the instance erases all key material.
pub struct StreamCipher<V: CipherVariant> {
    cipher: Option<V::Cipher>,
    mac: Option<Kmac>,
    custom: Vec<u8>,
    mac_key: Vec<u8>,
    mac_tag: Vec<u8>,
    name: Vec<u8>,
    nonce: Vec<u8>,
    counter: u64,
    rounds: u32,
    shake_mode: Option<ShakeMode>,
    kmac_mode: Option<KmacMode>,
    authenticated: bool,
    encryption: bool,
    initialized: bool,
    options: ParallelOptions,
}

impl<V: CipherVariant> StreamCipher<V> {
    /// Returns a new instance; `authenticate` decides once whether transforms
    /// carry a MAC tag.
    pub fn new(authenticate: bool) -> Self {
        StreamCipher {
            cipher: None,
            mac: None,
            custom: Vec::new(),
            mac_key: Vec::new(),
            mac_tag: Vec::new(),
            name: Vec::new(),
            nonce: vec![0u8; V::NONCE_SIZE],
            counter: 0,
            rounds: 0,
            shake_mode: None,
            kmac_mode: None,
            authenticated: authenticate,
            encryption: false,
            initialized: false,
            options: ParallelOptions::new(<V::Cipher as KeystreamCipher>::BLOCK_SIZE),
        }
    }

    /// `true` when transforms produce or verify a MAC tag.
    pub fn is_authenticator(&self) -> bool {
        self.authenticated
    }

    /// `true` when initialized for encryption.
    pub fn is_encryption(&self) -> bool {
        self.encryption
    }

    /// `true` once keyed and ready to transform.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `true` when large transforms run multi-threaded.
    pub fn is_parallel(&self) -> bool {
        self.options.is_parallel()
    }

    /// Accepted key sizes in bytes.
    pub fn legal_key_sizes(&self) -> &'static [usize] {
        V::LEGAL_KEY_SIZES
    }

    /// The formal name of the cipher in its current configuration, e.g.
    /// `"RCS"` or `"RCSK256"`.
    pub fn name(&self) -> String {
        match self.kmac_mode {
            Some(mode) => format!("{}K{}", V::AUTH_PREFIX, mode.security() * 8),
            None => V::NAME.to_string(),
        }
    }

    /// The current value of the nonce/counter register.
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// The payload size that triggers multi-threaded processing.
    pub fn parallel_block_size(&self) -> usize {
        self.options.parallel_block_size()
    }

    /// The threading and batching profile; changes must be made before
    /// [`StreamCipher::initialize`].
    pub fn parallel_profile_mut(&mut self) -> &mut ParallelOptions {
        &mut self.options
    }

    /// Set the worker count for multi-threaded transforms; it must be even
    /// and no greater than the logical processor count.
    pub fn parallel_max_degree(&mut self, degree: usize) -> Result<(), Error> {
        self.options.set_max_degree(degree)
    }

    /// The MAC tag size in bytes; zero when not authenticating.
    pub fn tag_size(&self) -> Result<usize, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(self.kmac_mode.map_or(0, KmacMode::tag_size))
    }

    /// The tag produced by the last finalized transform.
    pub fn tag(&self) -> Result<&[u8], Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if !self.authenticated || self.counter == 0 {
            return Err(Error::IllegalOperation);
        }
        Ok(&self.mac_tag)
    }

    /// Key the cipher for one direction, starting a new epoch.
    ///
    /// The key size must be legal for the variant, the nonce must fill the
    /// counter register, and the info string is either empty (the fixed
    /// version tag is used) or 16 bytes of caller customization.
    pub fn initialize(&mut self, encryption: bool, key: &SymmetricKey) -> Result<(), Error> {
        if !V::LEGAL_KEY_SIZES.contains(&key.key().len()) {
            return Err(Error::InvalidKey);
        }
        if key.nonce().len() != V::NONCE_SIZE {
            return Err(Error::InvalidNonce);
        }
        if !key.info().is_empty() && key.info().len() != INFO_SIZE {
            return Err(Error::InvalidInfo);
        }
        self.options.validate()?;

        if self.initialized {
            self.reset();
        }

        let shake_mode = V::shake_mode(key.key().len());
        self.shake_mode = Some(shake_mode);
        self.kmac_mode = self.authenticated.then(|| kmac_for(shake_mode));
        self.rounds = V::rounds(key.key().len());
        self.counter = 0;

        self.custom = if key.info().is_empty() {
            V::VERSION_INFO.to_vec()
        } else {
            key.info().to_vec()
        };

        // name string: finalisation counter, key bits, formal name
        let formal = self.name();
        self.name = vec![0u8; 8 + 2 + formal.len()];
        LittleEndian::write_u64(&mut self.name[..8], self.counter);
        LittleEndian::write_u16(&mut self.name[8..10], (key.key().len() * 8) as u16);
        self.name[10..].copy_from_slice(formal.as_bytes());

        self.nonce = key.nonce().to_vec();

        let mut gen = CShake::new(shake_mode);
        gen.initialize(key.key(), &self.custom, &self.name);
        self.cipher = Some(V::expand(&mut gen, self.rounds));

        if let Some(mode) = self.kmac_mode {
            let mut mac_key = vec![0u8; mode.min_key_size()];
            gen.squeeze(&mut mac_key);
            let mut mac = Kmac::new(mode);
            mac.initialize(&mac_key, &[])?;
            self.mac = Some(mac);
            self.mac_key = mac_key;
            self.mac_tag = vec![0u8; mode.tag_size()];
        }

        self.encryption = encryption;
        self.initialized = true;
        Ok(())
    }

    /// Absorb associated data into the MAC ahead of the next transform. Each
    /// call is one AD block: the data is followed by its own little-endian
    /// length encoding, so differently-split inputs authenticate differently.
    pub fn set_associated_data(&mut self, data: &[u8]) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        let mac = self.mac.as_mut().ok_or(Error::IllegalOperation)?;
        if data.is_empty() {
            return Err(Error::InvalidSize);
        }

        mac.update(data)?;
        let mut encoding = [0u8; 4];
        LittleEndian::write_u32(&mut encoding, data.len() as u32);
        mac.update(&encoding)
    }

    /// Transform one message.
    ///
    /// Encrypting, all of `input` is plaintext and `output` receives the
    /// ciphertext with the tag appended. Decrypting, `input` is ciphertext
    /// with the trailing tag and `output` receives the plaintext only after
    /// the tag verifies; on mismatch no plaintext is released and the
    /// instance is left as it was before the call, so a corrected retry
    /// produces the right result. Returns the bytes written.
    pub fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        if self.encryption {
            self.encrypt(input, output)
        } else {
            self.decrypt(input, output)
        }
    }

    /// Emit the full instance state as a length-tagged byte sequence; the
    /// reconstruction constructor restores an instance that behaves
    /// identically from this point on.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        let cipher = self.cipher.as_ref().ok_or(Error::NotInitialized)?;

        let key_bytes = V::export(cipher);
        let mut state = Vec::with_capacity(
            key_bytes.len()
                + self.custom.len()
                + self.mac_key.len()
                + self.mac_tag.len()
                + self.name.len()
                + self.nonce.len()
                + 6 * 2
                + 8
                + V::SERIALIZED_ROUNDS_WIDTH
                + 5,
        );

        for field in [
            key_bytes.as_slice(),
            &self.custom,
            &self.mac_key,
            &self.mac_tag,
            &self.name,
            &self.nonce,
        ] {
            let mut len = [0u8; 2];
            LittleEndian::write_u16(&mut len, field.len() as u16);
            state.extend_from_slice(&len);
            state.extend_from_slice(field);
        }

        let mut counter = [0u8; 8];
        LittleEndian::write_u64(&mut counter, self.counter);
        state.extend_from_slice(&counter);
        if V::SERIALIZED_ROUNDS_WIDTH == 2 {
            let mut rounds = [0u8; 2];
            LittleEndian::write_u16(&mut rounds, self.rounds as u16);
            state.extend_from_slice(&rounds);
        } else {
            let mut rounds = [0u8; 4];
            LittleEndian::write_u32(&mut rounds, self.rounds);
            state.extend_from_slice(&rounds);
        }

        state.push(self.kmac_mode.map_or(0, KmacMode::id));
        state.push(self.shake_mode.map_or(0, ShakeMode::id));
        state.push(u8::from(self.authenticated));
        state.push(u8::from(self.encryption));
        state.push(u8::from(self.initialized));

        Ok(state)
    }

    /// Reconstruct an instance from [`StreamCipher::serialize`] output.
    pub fn from_state(state: &[u8]) -> Result<Self, Error> {
        // six length-tagged fields plus the fixed trailer
        let min_state = 6 * 2 + 8 + V::SERIALIZED_ROUNDS_WIDTH + 5;
        if state.len() < min_state {
            return Err(Error::InvalidKey);
        }

        let mut offset = 0;
        let mut read_field = |state: &[u8]| -> Result<Vec<u8>, Error> {
            if state.len() - offset < 2 {
                return Err(Error::InvalidKey);
            }
            let len = LittleEndian::read_u16(&state[offset..offset + 2]) as usize;
            offset += 2;
            if state.len() - offset < len {
                return Err(Error::InvalidKey);
            }
            let field = state[offset..offset + len].to_vec();
            offset += len;
            Ok(field)
        };

        let key_bytes = read_field(state)?;
        let custom = read_field(state)?;
        let mac_key = read_field(state)?;
        let mac_tag = read_field(state)?;
        let name = read_field(state)?;
        let nonce = read_field(state)?;

        if state.len() - offset < 8 + V::SERIALIZED_ROUNDS_WIDTH + 5 {
            return Err(Error::InvalidKey);
        }
        let counter = LittleEndian::read_u64(&state[offset..offset + 8]);
        let rounds = if V::SERIALIZED_ROUNDS_WIDTH == 2 {
            u32::from(LittleEndian::read_u16(&state[offset + 8..offset + 10]))
        } else {
            LittleEndian::read_u32(&state[offset + 8..offset + 12])
        };
        let trailer = offset + 8 + V::SERIALIZED_ROUNDS_WIDTH;
        let kmac_id = state[trailer];
        let shake_id = state[trailer + 1];
        let authenticated = state[trailer + 2] != 0;
        let encryption = state[trailer + 3] != 0;
        let initialized = state[trailer + 4] != 0;

        if !initialized || nonce.len() != V::NONCE_SIZE {
            return Err(Error::InvalidKey);
        }
        let shake_mode = ShakeMode::from_id(shake_id).ok_or(Error::InvalidKey)?;
        let kmac_mode = if authenticated {
            Some(KmacMode::from_id(kmac_id).ok_or(Error::InvalidKey)?)
        } else {
            None
        };
        let cipher = V::import(&key_bytes, rounds).ok_or(Error::InvalidKey)?;

        let mac = match kmac_mode {
            Some(mode) => {
                if mac_tag.len() != mode.tag_size() {
                    return Err(Error::InvalidKey);
                }
                let mut mac = Kmac::new(mode);
                mac.initialize(&mac_key, &[]).map_err(|_| Error::InvalidKey)?;
                Some(mac)
            }
            None => None,
        };

        Ok(StreamCipher {
            cipher: Some(cipher),
            mac,
            custom,
            mac_key,
            mac_tag,
            name,
            nonce,
            counter,
            rounds,
            shake_mode: Some(shake_mode),
            kmac_mode,
            authenticated,
            encryption,
            initialized,
            options: ParallelOptions::new(<V::Cipher as KeystreamCipher>::BLOCK_SIZE),
        })
    }

    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        if let Some(mode) = self.kmac_mode {
            if output.len() < input.len() + mode.tag_size() {
                return Err(Error::InvalidSize);
            }

            // bind the counter's starting position, then the ciphertext
            self.mac_update(&self.nonce.clone())?;
            self.keystream_xor(input, output)?;
            self.mac_update(&output[..input.len()])?;
            self.counter += input.len() as u64;

            self.finalize_mac()?;
            output[input.len()..input.len() + mode.tag_size()].copy_from_slice(&self.mac_tag);
            Ok(input.len() + mode.tag_size())
        } else {
            if output.len() < input.len() {
                return Err(Error::InvalidSize);
            }
            self.keystream_xor(input, output)?;
            Ok(input.len())
        }
    }

    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        if let Some(mode) = self.kmac_mode {
            if input.len() < mode.tag_size() {
                return Err(Error::InvalidSize);
            }
            let msg_len = input.len() - mode.tag_size();
            if output.len() < msg_len {
                return Err(Error::InvalidSize);
            }

            // checkpoint the MAC chain so a failed message can be retried
            let mac_checkpoint = self.mac.clone();
            let mut key_checkpoint = self.mac_key.clone();
            let mut tag_checkpoint = self.mac_tag.clone();
            let mut name_checkpoint = self.name.clone();
            let counter_checkpoint = self.counter;

            self.mac_update(&self.nonce.clone())?;
            self.mac_update(&input[..msg_len])?;
            self.counter += msg_len as u64;
            self.finalize_mac()?;

            if !bool::from(self.mac_tag.ct_eq(&input[msg_len..])) {
                // the checkpoints become the live state again; the advanced
                // copies are scrubbed as they are displaced
                self.mac = mac_checkpoint;
                self.mac_key.zeroize();
                self.mac_key = key_checkpoint;
                self.mac_tag.zeroize();
                self.mac_tag = tag_checkpoint;
                self.name.zeroize();
                self.name = name_checkpoint;
                self.counter = counter_checkpoint;
                return Err(Error::AuthenticationFailure);
            }

            // scrub the unused checkpoints of the superseded MAC key state
            drop(mac_checkpoint);
            key_checkpoint.zeroize();
            tag_checkpoint.zeroize();
            name_checkpoint.zeroize();

            self.keystream_xor(&input[..msg_len], output)?;
            Ok(msg_len)
        } else {
            if output.len() < input.len() {
                return Err(Error::InvalidSize);
            }
            self.keystream_xor(input, output)?;
            Ok(input.len())
        }
    }

    fn keystream_xor(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), Error> {
        let cipher = self.cipher.as_ref().ok_or(Error::NotInitialized)?;
        ctr::process(cipher, input, output, &mut self.nonce, &self.options);
        Ok(())
    }

    fn mac_update(&mut self, data: &[u8]) -> Result<(), Error> {
        self.mac.as_mut().ok_or(Error::IllegalOperation)?.update(data)
    }

    /// Terminate the running MAC into the tag field and rotate the MAC key.
    fn finalize_mac(&mut self) -> Result<(), Error> {
        let shake_mode = self.shake_mode.ok_or(Error::NotInitialized)?;
        let mac = self.mac.as_mut().ok_or(Error::IllegalOperation)?;

        // termination string: every byte the MAC chain consumed, itself included
        let total = self.counter + V::NONCE_SIZE as u64 + 8;
        let mut terminator = [0u8; 8];
        LittleEndian::write_u64(&mut terminator, total);
        mac.update(&terminator)?;
        mac.finalize(&mut self.mac_tag)?;

        // rotate: refresh the counter in the name string, pull a fresh MAC key
        LittleEndian::write_u64(&mut self.name[..8], self.counter);
        let mut gen = CShake::new(shake_mode);
        gen.initialize(&self.mac_key, &self.custom, &self.name);
        let mut fresh = vec![0u8; self.mac_key.len()];
        gen.squeeze(&mut fresh);
        mac.initialize(&fresh, &[])?;
        self.mac_key.zeroize();
        self.mac_key = fresh;
        Ok(())
    }

    fn reset(&mut self) {
        self.cipher = None;
        if let Some(mac) = self.mac.as_mut() {
            mac.reset();
        }
        self.custom.zeroize();
        self.mac_key.zeroize();
        self.mac_tag.zeroize();
        self.name.zeroize();
        self.nonce.zeroize();
        self.custom.clear();
        self.mac_key.clear();
        self.mac_tag.clear();
        self.name.clear();
        self.counter = 0;
        self.rounds = 0;
        self.encryption = false;
        self.initialized = false;
    }
}

impl<V: CipherVariant> Drop for StreamCipher<V> {
    fn drop(&mut self) {
        self.reset();
    }
}
