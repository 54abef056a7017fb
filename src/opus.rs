//! Opus decoder FFI surface.
//!
//! Raw symbols come from `audiopus_sys`, which links the system libopus or
//! builds the bundled copy. This module pins down the status codes and
//! limits the bridge relies on.

use std::ffi::CStr;

use libc::c_int;

pub use audiopus_sys::{opus_decode, opus_decoder_get_size, opus_decoder_init, OpusDecoder};

// Status codes from opus_defines.h, pinned as c_int so boundary returns
// stay int32 regardless of how a bindings generator types C macros.
pub const OPUS_OK: c_int = 0;
pub const OPUS_BAD_ARG: c_int = -1;
pub const OPUS_BUFFER_TOO_SMALL: c_int = -2;
pub const OPUS_INTERNAL_ERROR: c_int = -3;
pub const OPUS_INVALID_PACKET: c_int = -4;
pub const OPUS_UNIMPLEMENTED: c_int = -5;
pub const OPUS_INVALID_STATE: c_int = -6;
pub const OPUS_ALLOC_FAIL: c_int = -7;

/// The bridge never asks libopus to reconstruct lost packets.
pub const FEC_DISABLED: c_int = 0;

/// Largest decodable frame per channel: 120 ms at 48 kHz.
pub const MAX_FRAME_SAMPLES: usize = 5760;

/// Human-readable message for a libopus status code.
pub fn strerror(code: c_int) -> &'static str {
    unsafe {
        let ptr = audiopus_sys::opus_strerror(code);
        if ptr.is_null() {
            return "";
        }
        CStr::from_ptr(ptr).to_str().unwrap_or("")
    }
}

/// Version string of the linked libopus.
pub fn version() -> &'static str {
    unsafe {
        let ptr = audiopus_sys::opus_get_version_string();
        if ptr.is_null() {
            return "";
        }
        CStr::from_ptr(ptr).to_str().unwrap_or("")
    }
}
