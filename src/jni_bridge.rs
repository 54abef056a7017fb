//! JNI entry points for the managed audio runtime.
//!
//! The managed side binds three externals on its bridge class:
//!
//! ```kotlin
//! external fun decoderInit(sampleRate: Int, numChannels: Int): Int
//! external fun decode(packet: ByteArray, output: ByteArray): Int
//! external fun decoderRelease()
//! ```
//!
//! Byte arrays cross by value copy; nothing native outlives a call except
//! the decoder itself.

use jni::objects::{JByteArray, JClass};
use jni::sys::jint;
use jni::JNIEnv;
use libc::c_int;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::decoder::Decoder;
use crate::opus::{OPUS_INTERNAL_ERROR, OPUS_INVALID_STATE, OPUS_OK};

/// The single live decoder. The managed side is expected to serialize its
/// calls; the lock turns an out-of-contract race into a wait instead of
/// undefined behavior.
static DECODER: Lazy<Mutex<Option<Decoder>>> = Lazy::new(|| Mutex::new(None));

/// Build a decoder for the slot, dropping any previous one.
fn initialize(sample_rate: i32, channels: i32) -> c_int {
    let mut slot = DECODER.lock();
    // Drop the old decoder first so a failed init leaves the slot empty
    // rather than pointing at a stale configuration.
    slot.take();
    match Decoder::new(sample_rate, channels) {
        Ok(dec) => {
            debug!("decoder ready: {} Hz, {} ch", sample_rate, channels);
            *slot = Some(dec);
            OPUS_OK
        }
        Err(err) => {
            warn!(
                "decoder init ({} Hz, {} ch) failed: {}",
                sample_rate, channels, err
            );
            err.code()
        }
    }
}

/// Decode one frame into `pcm`. Returns samples per channel or a negative
/// libopus status; `OPUS_INVALID_STATE` when no decoder is live.
fn decode_frame(packet: &[u8], pcm: &mut [i16]) -> c_int {
    let mut slot = DECODER.lock();
    let Some(dec) = slot.as_mut() else {
        warn!("decode called with no live decoder");
        return OPUS_INVALID_STATE;
    };
    match dec.decode(packet, pcm) {
        Ok(samples) => samples as c_int,
        Err(err) => {
            warn!("decode of {}-byte packet failed: {}", packet.len(), err);
            err.code()
        }
    }
}

/// Drop the live decoder, if any.
fn release() {
    if DECODER.lock().take().is_some() {
        debug!("decoder released");
    }
}

#[no_mangle]
pub extern "system" fn Java_com_opusbridge_audio_OpusBridge_decoderInit(
    _env: JNIEnv,
    _class: JClass,
    sample_rate: jint,
    num_channels: jint,
) -> jint {
    crate::init_logging();
    initialize(sample_rate, num_channels)
}

#[no_mangle]
pub extern "system" fn Java_com_opusbridge_audio_OpusBridge_decode(
    mut env: JNIEnv,
    _class: JClass,
    packet: JByteArray,
    output: JByteArray,
) -> jint {
    crate::init_logging();

    let packet = match env.convert_byte_array(&packet) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("reading packet array failed: {}", err);
            return OPUS_INTERNAL_ERROR;
        }
    };
    let out_len = match env.get_array_length(&output) {
        Ok(len) => len as usize,
        Err(err) => {
            error!("reading output length failed: {}", err);
            return OPUS_INTERNAL_ERROR;
        }
    };

    // Capacity in 16-bit samples is half the managed buffer's byte length.
    let mut pcm = vec![0i16; out_len / 2];
    let decoded = decode_frame(&packet, &mut pcm);
    if decoded < 0 {
        return decoded;
    }

    // Copy the PCM back in native byte order; the managed caller slices the
    // first `decoded * 2` bytes per channel.
    let bytes = unsafe { std::slice::from_raw_parts(pcm.as_ptr().cast::<i8>(), pcm.len() * 2) };
    if let Err(err) = env.set_byte_array_region(&output, 0, bytes) {
        error!("writing output array failed: {}", err);
        return OPUS_INTERNAL_ERROR;
    }
    decoded
}

#[no_mangle]
pub extern "system" fn Java_com_opusbridge_audio_OpusBridge_decoderRelease(
    _env: JNIEnv,
    _class: JClass,
) {
    crate::init_logging();
    release();
}
