#![cfg_attr(not(test), no_std)]

pub mod console;
pub mod recorder;
pub mod wallclock;

pub use sdcard;
