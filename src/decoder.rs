//! Owned wrapper around the libopus decoder state.
//!
//! The state block is allocated here, sized by the library, and freed in
//! `Drop`, so every exit path releases it.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::{self, NonNull};

use libc::c_int;

use crate::opus::{
    self, OpusDecoder, FEC_DISABLED, OPUS_ALLOC_FAIL, OPUS_BAD_ARG, OPUS_INTERNAL_ERROR, OPUS_OK,
};

/// A libopus status code carried through unchanged.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(c_int);

impl Error {
    /// The raw status code exactly as the library returned it.
    pub fn code(&self) -> c_int {
        self.0
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error({}: {})", self.0, opus::strerror(self.0))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", opus::strerror(self.0), self.0)
    }
}

impl std::error::Error for Error {}

/// The library's own create path allocates states with the C allocator;
/// caller-provided storage has to match that alignment.
const STATE_ALIGN: usize = 16;

/// One libopus decoder, its state block owned for the wrapper's lifetime.
#[derive(Debug)]
pub struct Decoder {
    state: NonNull<OpusDecoder>,
    layout: Layout,
    sample_rate: i32,
    channels: c_int,
}

// The state block is heap memory with no thread affinity; libopus keeps no
// global references into it.
unsafe impl Send for Decoder {}

impl Decoder {
    /// Allocate and initialize a decoder for the given configuration.
    ///
    /// Validation is the library's own: unsupported rates or channel
    /// counts come back as its status codes, untouched.
    pub fn new(sample_rate: i32, channels: i32) -> Result<Self, Error> {
        let size = unsafe { opus::opus_decoder_get_size(channels) };
        if size <= 0 {
            // get_size reports 0 for channel counts it rejects
            return Err(Error(OPUS_BAD_ARG));
        }
        let layout = Layout::from_size_align(size as usize, STATE_ALIGN)
            .map_err(|_| Error(OPUS_INTERNAL_ERROR))?;
        let block = unsafe { alloc_zeroed(layout) };
        let Some(state) = NonNull::new(block.cast::<OpusDecoder>()) else {
            return Err(Error(OPUS_ALLOC_FAIL));
        };
        let ret = unsafe { opus::opus_decoder_init(state.as_ptr(), sample_rate, channels) };
        if ret != OPUS_OK {
            unsafe { dealloc(block, layout) };
            return Err(Error(ret));
        }
        Ok(Self {
            state,
            layout,
            sample_rate,
            channels,
        })
    }

    /// Decode one encoded frame into `pcm`, forward error correction
    /// disabled.
    ///
    /// `pcm` is interleaved; the frame capacity reported to libopus is
    /// `pcm.len() / channels`, so the library cannot write past the slice.
    /// An empty packet requests packet-loss concealment, in which case the
    /// capacity (a multiple of 2.5 ms) sets the generated duration.
    ///
    /// Returns the number of samples decoded per channel.
    pub fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize, Error> {
        let frame_cap = (pcm.len() / self.channels as usize) as c_int;
        let (data, len) = if packet.is_empty() {
            (ptr::null(), 0)
        } else {
            (packet.as_ptr(), packet.len() as i32)
        };
        let ret = unsafe {
            opus::opus_decode(
                self.state.as_ptr(),
                data,
                len,
                pcm.as_mut_ptr(),
                frame_cap,
                FEC_DISABLED,
            )
        };
        if ret < 0 {
            Err(Error(ret))
        } else {
            Ok(ret as usize)
        }
    }

    pub fn sample_rate(&self) -> i32 {
        self.sample_rate
    }

    pub fn channels(&self) -> i32 {
        self.channels
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // The state was initialized into memory we own; no destroy call is
        // needed, only the block itself goes away.
        unsafe { dealloc(self.state.as_ptr().cast::<u8>(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opus::{MAX_FRAME_SAMPLES, OPUS_BUFFER_TOO_SMALL, OPUS_INVALID_PACKET};

    // One byte of TOC, zero-length frame: config 31 (CELT fullband, 20 ms),
    // mono, code 0. Decodes as DTX to exactly one frame of samples.
    const DTX_20MS_MONO: &[u8] = &[0xF8];

    #[test]
    fn init_and_drop() {
        let dec = Decoder::new(48_000, 1).unwrap();
        assert_eq!(dec.sample_rate(), 48_000);
        assert_eq!(dec.channels(), 1);
    }

    #[test]
    fn unsupported_rate_is_the_librarys_error() {
        let err = Decoder::new(44_100, 1).unwrap_err();
        assert_eq!(err.code(), OPUS_BAD_ARG);
    }

    #[test]
    fn unsupported_channel_counts_are_rejected() {
        assert!(Decoder::new(48_000, 0).is_err());
        assert!(Decoder::new(48_000, 3).is_err());
    }

    #[test]
    fn dtx_frame_decodes_to_one_full_frame() {
        let mut dec = Decoder::new(16_000, 1).unwrap();
        let mut pcm = vec![0i16; 2880];
        assert_eq!(dec.decode(DTX_20MS_MONO, &mut pcm).unwrap(), 320);

        let mut dec = Decoder::new(48_000, 1).unwrap();
        let mut pcm = vec![0i16; MAX_FRAME_SAMPLES];
        assert_eq!(dec.decode(DTX_20MS_MONO, &mut pcm).unwrap(), 960);
    }

    #[test]
    fn concealment_fills_the_requested_capacity() {
        let mut dec = Decoder::new(48_000, 1).unwrap();
        let mut pcm = vec![0i16; 960];
        assert_eq!(dec.decode(&[], &mut pcm).unwrap(), 960);
    }

    #[test]
    fn stereo_capacity_is_counted_per_channel() {
        let mut dec = Decoder::new(48_000, 2).unwrap();
        let mut pcm = vec![0i16; 1920]; // 960 samples per channel
        assert_eq!(dec.decode(&[], &mut pcm).unwrap(), 960);
    }

    #[test]
    fn undersized_buffer_is_reported_not_overrun() {
        let mut dec = Decoder::new(48_000, 1).unwrap();
        let mut pcm = vec![0i16; 480]; // 10 ms, but the packet carries 20 ms
        let err = dec.decode(DTX_20MS_MONO, &mut pcm).unwrap_err();
        assert_eq!(err.code(), OPUS_BUFFER_TOO_SMALL);
    }

    #[test]
    fn truncated_code3_packet_is_invalid() {
        let mut dec = Decoder::new(48_000, 1).unwrap();
        let mut pcm = vec![0i16; MAX_FRAME_SAMPLES];
        let err = dec.decode(&[0x03], &mut pcm).unwrap_err();
        assert_eq!(err.code(), OPUS_INVALID_PACKET);
    }
}
