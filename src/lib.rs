//! # fast-gaussian
//!
//! Separable recursive Gaussian blur for single-channel `f32` image planes.
//!
//! Instead of convolving with a finite kernel (O(sigma) per pixel), the blur
//! runs a third-order IIR recursion derived from truncated-cosine functions
//! (Charalampidis 2016), giving O(1) per-pixel cost independent of sigma.
//! The 2D blur is separable: a horizontal pass over rows into a temporary
//! plane, then a vertical pass over column strips into the output.
//!
//! Both passes are SIMD kernels compiled for several instruction sets; the
//! best variant for the running CPU is selected once at first use.
//!
//! ## Example
//!
//! ```rust
//! use fast_gaussian::Blur;
//!
//! let (width, height) = (64, 64);
//! let mut plane = vec![0.0f32; width * height];
//! plane[32 * width + 32] = 1.0;
//!
//! let mut blur = Blur::new(2.0, width, height).unwrap();
//! let out = blur.blur_plane(&plane).unwrap();
//!
//! // The blur preserves total energy.
//! let energy: f32 = out.iter().sum();
//! assert!((energy - 1.0).abs() < 1e-3);
//! ```
//!
//! Multi-channel images are blurred by repeated invocation per channel; see
//! [`Blur::blur`].

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
// Constants ported from libjxl keep their exact printed form.
#![allow(clippy::unreadable_literal)]
#![allow(clippy::excessive_precision)]
// mul_add ordering affects numerical parity with the reference.
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

pub mod alpha;
mod blur;
mod gaussian;
mod horizontal;
mod plane;
mod vertical;

pub use blur::{fast_gaussian, Blur};
pub use gaussian::RecursiveGaussian;
pub use horizontal::horizontal_row;
pub use plane::{PlaneMut, PlaneRef, RowSink, RowSource};
pub use vertical::vertical_pass;

/// Errors produced by the blur engine.
///
/// Every operation here is a deterministic numerical transform, so no error
/// is retryable: a failed call fails identically when repeated with the same
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GaussError {
    /// Sigma was not a finite positive number.
    #[error("sigma must be finite and > 0")]
    InvalidSigma,
    /// The 3x3 coefficient system was singular. This indicates an internal
    /// inconsistency in the filter design and should not occur for any valid
    /// sigma.
    #[error("coefficient matrix is singular")]
    SingularMatrix,
    /// Scratch memory for the vertical pass could not be allocated.
    #[error("failed to allocate scratch memory")]
    OutOfMemory,
}
