//! # sem-core
//!
//! Backend-neutral types for SEM image diagnostics.
//!
//! - [`Grid`] - Row-major 2-D `f32` grid used for pixels and spectra
//! - [`RawImage`], [`IntoGrid`] - Array-like sources and the validating pixel setter
//! - [`Histogram`] - Unit-bin intensity histogram and equalisation table
//! - [`hanning`], [`SeparableWindow`] - Apodisation window
//! - [`Error`] - Input error taxonomy
//!
//! ## Crate Structure
//!
//! ```text
//! sem-core (this crate)
//!    ^
//!    |
//!    +-- sem-compute (backend selector, CPU and wgpu image variants)
//!           ^
//!           +-- sem-cli
//! ```

pub mod error;
pub mod grid;
pub mod histogram;
pub mod window;

pub use error::{Error, Result};
pub use grid::{Grid, IntoGrid, RawImage, Sample};
pub use histogram::{BIT_DEPTH, Histogram, TableOverflow, bin_of, lookup_index, max_level};
pub use window::{SeparableWindow, hanning, shifted_index};
