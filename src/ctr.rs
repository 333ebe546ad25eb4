//! The little-endian counter-mode driver: batched sequential keystream
//! generation sized to the probed SIMD width, and a rayon fork-join parallel
//! path over equal chunks with pre-advanced counters.
//!
//! The counter is a plain 128-bit little-endian integer carried in the low 16
//! bytes of the block-sized nonce register. Each block consumes the current
//! counter value and then advances it by one, so a batch of K blocks covers
//! counters C .. C+K-1 and leaves the register at C+K; batches exist only to
//! feed SIMD lanes and are observationally equivalent to K sequential calls.

use std::sync::OnceLock;

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

use crate::Error;

/// A block cipher usable as a counter-mode keystream source.
pub trait KeystreamCipher {
    /// The cipher block (and keystream batch unit) size in bytes.
    const BLOCK_SIZE: usize;

    /// Encrypt one counter-register value into one keystream block.
    fn encrypt_counter_block(&self, counter: &[u8], keystream: &mut [u8]);

    /// Pull any key-independent lookup tables into cache before a batch of
    /// key-dependent accesses.
    fn prefetch_tables(&self) {}
}

/// Hard ceiling on the configurable parallel block size.
const MAX_PARALLEL_ALLOC: usize = 100_000_000;

/// Bytes of keystream each worker is sized to keep cache-resident.
const PARALLEL_CACHE_SEGMENT: usize = 2048;

/// The number of counter blocks a single batch dispatch covers, by probed
/// lane width. Probed once per process.
pub(crate) fn simd_lanes() -> usize {
    static LANES: OnceLock<usize> = OnceLock::new();
    *LANES.get_or_init(probe_simd_lanes)
}

#[cfg(target_arch = "x86_64")]
fn probe_simd_lanes() -> usize {
    if is_x86_feature_detected!("avx512f") {
        16
    } else if is_x86_feature_detected!("avx2") {
        8
    } else {
        4
    }
}

#[cfg(target_arch = "aarch64")]
fn probe_simd_lanes() -> usize {
    4
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe_simd_lanes() -> usize {
    1
}

/// Add `value` to the 128-bit little-endian integer in the low 16 bytes of
/// the register.
pub(crate) fn le_increase(counter: &mut [u8], value: u64) {
    let n = LittleEndian::read_u128(&counter[..16]).wrapping_add(u128::from(value));
    LittleEndian::write_u128(&mut counter[..16], n);
}

/// Multi-threading and SIMD-batching configuration for one cipher instance.
///
/// Changes must be made before `initialize`; the profile is validated there.
#[derive(Clone, Debug)]
pub struct ParallelOptions {
    block_size: usize,
    parallel_block_size: usize,
    max_degree: usize,
    processor_count: usize,
    simd_lanes: usize,
    is_parallel: bool,
}

impl ParallelOptions {
    pub(crate) fn new(block_size: usize) -> Self {
        let processor_count =
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        // an even worker count, or no parallelism at all
        let max_degree = if processor_count < 2 { 1 } else { processor_count & !1 };

        ParallelOptions {
            block_size,
            parallel_block_size: max_degree * PARALLEL_CACHE_SEGMENT,
            max_degree,
            processor_count,
            simd_lanes: simd_lanes(),
            is_parallel: max_degree >= 2,
        }
    }

    /// Whether transforms of at least [`ParallelOptions::parallel_block_size`]
    /// bytes are multi-threaded.
    pub fn is_parallel(&self) -> bool {
        self.is_parallel
    }

    /// Enable or disable the multi-threaded path.
    pub fn set_parallel(&mut self, enabled: bool) {
        self.is_parallel = enabled && self.max_degree >= 2;
    }

    /// The payload size that triggers the multi-threaded path.
    pub fn parallel_block_size(&self) -> usize {
        self.parallel_block_size
    }

    /// Set the payload size that triggers the multi-threaded path; it must be
    /// a multiple of [`ParallelOptions::parallel_minimum_size`] and no larger
    /// than [`ParallelOptions::parallel_maximum_size`].
    pub fn set_parallel_block_size(&mut self, size: usize) -> Result<(), Error> {
        if size < self.parallel_minimum_size() || size > self.parallel_maximum_size() {
            return Err(Error::InvalidSize);
        }
        if size % self.parallel_minimum_size() != 0 {
            return Err(Error::InvalidParam);
        }

        self.parallel_block_size = size;
        Ok(())
    }

    /// The number of worker threads used by the multi-threaded path.
    pub fn parallel_max_degree(&self) -> usize {
        self.max_degree
    }

    /// The smallest legal parallel block size: one SIMD batch per worker.
    pub fn parallel_minimum_size(&self) -> usize {
        self.max_degree * self.simd_lanes * self.block_size
    }

    /// The largest legal parallel block size.
    pub fn parallel_maximum_size(&self) -> usize {
        MAX_PARALLEL_ALLOC
    }

    /// The number of logical processors reported by the host.
    pub fn processor_count(&self) -> usize {
        self.processor_count
    }

    pub(crate) fn set_max_degree(&mut self, degree: usize) -> Result<(), Error> {
        if degree == 0 || degree % 2 != 0 || degree > self.processor_count {
            return Err(Error::NotSupported);
        }

        self.max_degree = degree;
        self.parallel_block_size = degree * PARALLEL_CACHE_SEGMENT;
        self.is_parallel = true;
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.is_parallel {
            if self.parallel_block_size < self.parallel_minimum_size()
                || self.parallel_block_size > self.parallel_maximum_size()
            {
                return Err(Error::InvalidSize);
            }
            if self.parallel_block_size % self.parallel_minimum_size() != 0 {
                return Err(Error::InvalidParam);
            }
        }
        Ok(())
    }
}

/// Fill `out` with keystream, advancing the counter register one step per
/// block (including the partial trailing block).
pub(crate) fn generate<C: KeystreamCipher>(cipher: &C, out: &mut [u8], counter: &mut [u8]) {
    let bs = C::BLOCK_SIZE;
    let mut offset = 0;

    cipher.prefetch_tables();

    // stagger a batch of consecutive counters per dispatch to feed SIMD lanes
    let batch = match simd_lanes() {
        n if n >= 16 => 16,
        n if n >= 8 => 8,
        n if n >= 4 => 4,
        _ => 1,
    };
    if batch > 1 {
        let reg = counter.len();
        let stride = batch * bs;
        let aligned = (out.len() / stride) * stride;
        let mut staggered = vec![0u8; batch * reg];
        while offset != aligned {
            for lane in staggered.chunks_exact_mut(reg) {
                lane.copy_from_slice(counter);
                le_increase(counter, 1);
            }
            for (lane, block) in
                staggered.chunks_exact(reg).zip(out[offset..offset + stride].chunks_exact_mut(bs))
            {
                cipher.encrypt_counter_block(lane, block);
            }
            offset += stride;
        }
    }

    while out.len() - offset >= bs {
        cipher.encrypt_counter_block(counter, &mut out[offset..offset + bs]);
        le_increase(counter, 1);
        offset += bs;
    }

    if offset != out.len() {
        let mut otp = [0u8; 128];
        cipher.encrypt_counter_block(counter, &mut otp[..bs]);
        le_increase(counter, 1);
        let rem = out.len() - offset;
        out[offset..].copy_from_slice(&otp[..rem]);
    }
}

fn xor_into(out: &mut [u8], input: &[u8]) {
    for (o, i) in out.iter_mut().zip(input) {
        *o ^= i;
    }
}

fn process_sequential<C: KeystreamCipher>(
    cipher: &C,
    input: &[u8],
    output: &mut [u8],
    counter: &mut [u8],
) {
    generate(cipher, output, counter);
    xor_into(output, input);
}

fn process_parallel<C: KeystreamCipher + Sync>(
    cipher: &C,
    input: &[u8],
    output: &mut [u8],
    counter: &mut [u8],
    degree: usize,
) {
    let chunk = input.len() / degree;
    let counter_stride = (chunk / C::BLOCK_SIZE) as u64;
    debug_assert_eq!(chunk % C::BLOCK_SIZE, 0);
    debug_assert_eq!(chunk * degree, input.len());

    let base = counter.to_vec();
    output
        .par_chunks_mut(chunk)
        .zip(input.par_chunks(chunk))
        .enumerate()
        .for_each(|(i, (out_chunk, in_chunk))| {
            // private counter, pre-advanced to this chunk's first block
            let mut thread_counter = base.clone();
            le_increase(&mut thread_counter, counter_stride * i as u64);
            generate(cipher, out_chunk, &mut thread_counter);
            xor_into(out_chunk, in_chunk);
        });

    // master register jumps past every chunk
    le_increase(counter, counter_stride * degree as u64);
}

/// XOR `input` into `output` under the keystream, multi-threading every full
/// parallel block when the profile allows it.
pub(crate) fn process<C: KeystreamCipher + Sync>(
    cipher: &C,
    input: &[u8],
    output: &mut [u8],
    counter: &mut [u8],
    options: &ParallelOptions,
) {
    debug_assert!(output.len() >= input.len());

    let prl = options.parallel_block_size();
    if options.is_parallel() && input.len() >= prl {
        let whole = (input.len() / prl) * prl;
        for start in (0..whole).step_by(prl) {
            process_parallel(
                cipher,
                &input[start..start + prl],
                &mut output[start..start + prl],
                counter,
                options.parallel_max_degree(),
            );
        }
        if whole != input.len() {
            process_sequential(cipher, &input[whole..], &mut output[whole..input.len()], counter);
        }
    } else {
        process_sequential(cipher, &input[..], &mut output[..input.len()], counter);
    }
}
