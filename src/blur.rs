//! Orchestration of the two passes.
//!
//! The horizontal pass is an embarrassingly parallel map over rows (each row
//! writes a disjoint slice of the temporary plane, so no locking); the
//! vertical pass then runs over column strips, sequentially per call. The
//! vertical pass never starts before the row map has fully drained.

use crate::horizontal::horizontal_row;
use crate::plane::{PlaneMut, PlaneRef};
use crate::vertical::vertical_pass;
use crate::{GaussError, RecursiveGaussian};

/// Blurs one `xsize x ysize` plane: horizontal pass from `input` into
/// `temp`, vertical pass from `temp` into `output`.
///
/// All three planes must be `xsize * ysize` contiguous floats. The first
/// failing phase aborts the call; there is no partial recovery.
///
/// # Errors
/// [`GaussError::OutOfMemory`] if the vertical pass cannot allocate scratch.
///
/// # Panics
/// Panics if the plane sizes disagree or `xsize`/`ysize` is zero.
pub fn fast_gaussian(
    rg: &RecursiveGaussian,
    xsize: usize,
    ysize: usize,
    input: &[f32],
    temp: &mut [f32],
    output: &mut [f32],
) -> Result<(), GaussError> {
    assert!(xsize > 0 && ysize > 0);
    assert_eq!(input.len(), xsize * ysize);
    assert_eq!(temp.len(), xsize * ysize);
    assert_eq!(output.len(), xsize * ysize);

    horizontal_pass(rg, input, temp, xsize);

    let temp_plane = PlaneRef::new(temp, xsize);
    let mut out_plane = PlaneMut::new(output, xsize);
    vertical_pass(rg, xsize, ysize, &temp_plane, &mut out_plane)
}

fn horizontal_pass(rg: &RecursiveGaussian, input: &[f32], output: &mut [f32], width: usize) {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        input
            .par_chunks_exact(width)
            .zip(output.par_chunks_exact_mut(width))
            .for_each(|(input, output)| horizontal_row(rg, input, output));
    }

    #[cfg(not(feature = "rayon"))]
    {
        input
            .chunks_exact(width)
            .zip(output.chunks_exact_mut(width))
            .for_each(|(input, output)| horizontal_row(rg, input, output));
    }
}

/// Structure handling image blur.
///
/// Holds the designed kernel and the temporary plane, so repeated blurs of
/// same-sized planes reuse the allocation. The width and height of planes
/// passed to [`blur`][Self::blur] must exactly match this instance; after
/// downscaling, [`shrink_to`][Self::shrink_to] resizes the internal buffer
/// without reallocating.
pub struct Blur {
    kernel: RecursiveGaussian,
    temp: Vec<f32>,
    width: usize,
    height: usize,
}

impl Blur {
    /// Creates a new [Blur] with the given sigma for images of the given
    /// width and height. Pre-allocates the temporary plane.
    ///
    /// # Errors
    /// [`GaussError::InvalidSigma`] for non-finite or non-positive sigma.
    pub fn new(sigma: f64, width: usize, height: usize) -> Result<Self, GaussError> {
        assert!(width > 0 && height > 0);
        Ok(Blur {
            kernel: RecursiveGaussian::new(sigma)?,
            temp: vec![0.0f32; width * height],
            width,
            height,
        })
    }

    /// The designed filter coefficients.
    pub fn kernel(&self) -> &RecursiveGaussian {
        &self.kernel
    }

    /// Truncates the internal buffer to fit images of the given width and
    /// height without affecting the allocated memory.
    pub fn shrink_to(&mut self, width: usize, height: usize) {
        assert!(width > 0 && height > 0);
        assert!(width * height <= self.temp.capacity());
        self.temp.truncate(width * height);
        self.temp.resize(width * height, 0.0);
        self.width = width;
        self.height = height;
    }

    /// Blurs all three channels of a planar image.
    ///
    /// # Errors
    /// Propagates the first per-plane failure.
    pub fn blur(&mut self, img: &[Vec<f32>; 3]) -> Result<[Vec<f32>; 3], GaussError> {
        Ok([
            self.blur_plane(&img[0])?,
            self.blur_plane(&img[1])?,
            self.blur_plane(&img[2])?,
        ])
    }

    /// Blurs a single plane of `width * height` floats.
    ///
    /// # Errors
    /// [`GaussError::OutOfMemory`] if vertical-pass scratch allocation fails.
    pub fn blur_plane(&mut self, plane: &[f32]) -> Result<Vec<f32>, GaussError> {
        let mut out = vec![0.0f32; self.width * self.height];
        fast_gaussian(
            &self.kernel,
            self.width,
            self.height,
            plane,
            &mut self.temp,
            &mut out,
        )?;
        Ok(out)
    }
}
