//! Lossless block compression codec.
//!
//! Wraps the LZ4 block format from `lz4_flex`: single pass, no dictionary,
//! no framing. Every call is independent; the [`Codec`] value only records
//! that the startup self-test passed.
//!
//! # Buffer Sizing
//!
//! Compression output is allocated up front with [`worst_case_bound`]:
//!
//! ```text
//! capacity = n + n / 16 + 64 + 3
//! ```
//!
//! This covers incompressible input for this class of byte compressor, so
//! the output buffer is never resized during a pass. The encoder checks its
//! own, more conservative bound before starting, so the allocation is the
//! larger of the two.
//!
//! Decompression output is bounded by a caller-supplied `max_capacity`.
//! Output that would not fit fails with [`Error::CapacityExceeded`] instead
//! of being truncated.
//!
//! # Example
//!
//! ```
//! use wsrelay::Codec;
//!
//! # fn main() -> wsrelay::Result<()> {
//! let codec = Codec::init()?;
//! let packed = codec.compress(b"hello hello hello hello")?;
//! let unpacked = codec.decompress(&packed, 1024)?;
//! assert_eq!(unpacked, b"hello hello hello hello");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use lz4_flex::block::{self, DecompressError};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Payload length the default decompression capacity is sized for.
pub const REFERENCE_PAYLOAD_LEN: usize = 259_271;

/// Default decompression capacity: the worst-case bound of the reference
/// payload length.
pub const DEFAULT_MAX_CAPACITY: usize = worst_case_bound(REFERENCE_PAYLOAD_LEN);

/// Probe compressed and decompressed by [`Codec::init`].
const SELF_TEST_PROBE: &[u8] = b"Franz jagt im komplett verwahrlosten Taxi quer durch Bayern. \
Franz jagt im komplett verwahrlosten Taxi quer durch Bayern.";

// ============================================================================
// Sizing
// ============================================================================

/// Returns the guaranteed-sufficient compression output size for `len` input bytes.
#[inline]
#[must_use]
pub const fn worst_case_bound(len: usize) -> usize {
    len + len / 16 + 64 + 3
}

/// Allocation used for a compression pass over `len` bytes.
#[inline]
fn compress_capacity(len: usize) -> usize {
    worst_case_bound(len).max(block::get_maximum_output_size(len))
}

// ============================================================================
// Codec
// ============================================================================

/// Handle to an initialized compression codec.
///
/// Construct with [`Codec::init`]. Cheap to share behind an `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    _initialized: (),
}

impl Codec {
    /// Initializes the codec and runs the self-test.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if the probe does not survive a
    /// compress/decompress round trip.
    pub fn init() -> Result<Self> {
        let codec = Self { _initialized: () };

        let packed = codec
            .compress(SELF_TEST_PROBE)
            .map_err(|e| Error::initialization(format!("self-test compress: {e}")))?;
        let unpacked = codec
            .decompress(&packed, SELF_TEST_PROBE.len())
            .map_err(|e| Error::initialization(format!("self-test decompress: {e}")))?;

        if unpacked != SELF_TEST_PROBE {
            return Err(Error::initialization("self-test round trip mismatch"));
        }

        debug!(
            probe_len = SELF_TEST_PROBE.len(),
            packed_len = packed.len(),
            "Codec initialized"
        );
        Ok(codec)
    }

    /// Compresses `input` in a single pass.
    ///
    /// Returns exactly the compressed prefix of the worst-case sized buffer.
    /// Empty input compresses to empty output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compression`] if the encoder rejects the buffer.
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = vec![0u8; compress_capacity(input.len())];
        let written = block::compress_into(input, &mut output)
            .map_err(|e| Error::compression(e.to_string()))?;
        output.truncate(written);

        trace!(input_len = input.len(), output_len = written, "Compressed");
        Ok(output)
    }

    /// Decompresses `input` into a buffer of at most `max_capacity` bytes.
    ///
    /// Empty input decompresses to empty output.
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityExceeded`] if the output would exceed `max_capacity`
    /// - [`Error::Decompression`] if `input` is corrupt or truncated
    pub fn decompress(&self, input: &[u8], max_capacity: usize) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = vec![0u8; max_capacity];
        let written = block::decompress_into(input, &mut output).map_err(|e| match e {
            DecompressError::OutputTooSmall { .. } => Error::capacity_exceeded(max_capacity),
            other => Error::decompression(other.to_string()),
        })?;
        output.truncate(written);

        trace!(input_len = input.len(), output_len = written, "Decompressed");
        Ok(output)
    }
}

// ============================================================================
// Tests
// ============================================================================
