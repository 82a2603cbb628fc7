//! ardpicprog-core - Core library for PIC programmer images
//!
//! This crate holds everything about a PIC device's memory that does not
//! depend on talking to a programmer: address ranges, device parameters,
//! sparse word storage and the Intel HEX codec. It is `no_std` compatible
//! and only needs `alloc`.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`FormatError`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ardpicprog_core::{DeviceProfile, HexFormat, HexImage};
//!
//! let profile = Arc::new(DeviceProfile::from_details(&details)?);
//! let image = HexImage::load(profile, HexFormat::Auto, &text)?;
//! print!("{}", image.save(true));
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod device;
pub mod error;
pub mod hex;
pub mod image;
pub mod memory;
pub mod range;

pub use device::{AreaKind, DeviceDetails, DeviceProfile, MemoryArea};
pub use error::{FormatError, FormatSource, Result};
pub use hex::HexFormat;
pub use image::HexImage;
pub use memory::{SparseMemoryStore, WordSink, WordSource};
pub use range::AddressRange;
