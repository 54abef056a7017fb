//! Opus decoder bridge for a managed Android runtime.
//!
//! This crate is the native half of the host application's audio stack:
//! a JNI library that owns a single libopus decoder and exposes
//! initialize/decode/release entry points to the managed layer.

#![allow(non_snake_case)]
#![allow(dead_code)]

mod decoder;
mod jni_bridge;
mod opus;

pub use decoder::{Decoder, Error};
pub use jni_bridge::*;
pub use opus::*;

use once_cell::sync::OnceCell;
use std::panic;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize the library (called from JNI_OnLoad or first JNI call)
pub fn init_logging() {
    INIT.get_or_init(|| {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("opus-bridge-rs"),
        );

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Debug)
                .try_init();
        }

        // Panic hook so panics reach the host's log instead of dying silently
        panic::set_hook(Box::new(|panic_info| {
            let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            let location = if let Some(loc) = panic_info.location() {
                format!("{}:{}:{}", loc.file(), loc.line(), loc.column())
            } else {
                "unknown location".to_string()
            };

            log::error!("RUST PANIC: {} at {}", msg, location);
        }));

        log::info!("opus bridge initialized, {}", opus::version());
    });
}
