//! Vertical pass: the same recursion applied along columns.
//!
//! Where the horizontal pass vectorizes across unrolled outputs of one row,
//! this pass vectorizes across columns (one lane per column) and runs the
//! plain second-order recursion row by row. Columns are processed in strips
//! sized to one cache line; each strip keeps the last two rows' outputs of
//! every mode in a small ring buffer.

use multiversion::multiversion;
use wide::f32x4;

use crate::plane::{RowSink, RowSource};
use crate::{GaussError, RecursiveGaussian};

/// Lanes of one `f32x4` vector.
const LANES: usize = 4;
/// Vectors per full-width strip: 64-byte cache line / 16 bytes per vector.
const FULL_VECTORS: usize = 4;
const FULL_LANES: usize = FULL_VECTORS * LANES;
/// History needs rows n-1 and n-2; rounded up to 4 for mask-based modulo.
const RING_LEN: usize = 4;
/// Distance of the software prefetch in the interior region.
const PREFETCH_ROWS: usize = 8;

/// Applies the 1D vertical recursion to every column of an `xsize x ysize`
/// plane. `input` rows are read, `output` rows written; both must span
/// exactly `xsize` floats per row for rows `0..ysize`.
///
/// Allocates one cache-line-aligned scratch block (zero sentinel + ring
/// buffer), reused across strips.
///
/// # Errors
/// [`GaussError::OutOfMemory`] if the scratch buffer cannot be allocated;
/// no output has been written in that case.
pub fn vertical_pass<In: RowSource, Out: RowSink>(
    rg: &RecursiveGaussian,
    xsize: usize,
    ysize: usize,
    input: &In,
    output: &mut Out,
) -> Result<(), GaussError> {
    let mut scratch = Scratch::new(FULL_LANES * (1 + 3 * RING_LEN))?;
    let (zero, ring_data) = scratch.floats_mut().split_at_mut(FULL_LANES);

    let mut x = 0;
    while x + FULL_LANES <= xsize {
        vertical_strip::<FULL_VECTORS, In, Out>(rg, x, ysize, ring_data, zero, input, output);
        x += FULL_LANES;
    }
    while x + LANES <= xsize {
        vertical_strip::<1, In, Out>(rg, x, ysize, ring_data, zero, input, output);
        x += LANES;
    }
    if x < xsize {
        vertical_strip_scalar(rg, x, xsize - x, ysize, input, output);
    }
    Ok(())
}

/// Fixed-capacity circular history: for each of the three modes, the last
/// `RING_LEN` rows' outputs of a strip (`lanes` floats each). Indexing by
/// (possibly negative) row number is hidden behind [`Ring::slot`].
struct Ring<'a> {
    data: &'a mut [f32],
    lanes: usize,
}

impl<'a> Ring<'a> {
    fn new(data: &'a mut [f32], lanes: usize) -> Self {
        Self {
            data: &mut data[..3 * lanes * RING_LEN],
            lanes,
        }
    }

    fn reset(&mut self) {
        self.data.fill(0.0);
    }

    #[inline(always)]
    fn slot(&self, mode: usize, n: isize) -> usize {
        let wrapped = (n & (RING_LEN as isize - 1)) as usize;
        (mode * RING_LEN + wrapped) * self.lanes
    }

    #[inline(always)]
    fn load(&self, mode: usize, n: isize, idx: usize) -> f32x4 {
        let at = self.slot(mode, n) + idx;
        let arr: [f32; LANES] = self.data[at..at + LANES].try_into().unwrap();
        f32x4::new(arr)
    }

    #[inline(always)]
    fn store(&mut self, mode: usize, n: isize, idx: usize, v: f32x4) {
        let at = self.slot(mode, n) + idx;
        self.data[at..at + LANES].copy_from_slice(&v.to_array());
    }
}

/// Input rows feeding one block: a single row (border regions, possibly the
/// zero sentinel) or the sum of the two neighbor rows (interior).
enum StripInput<'a> {
    Single(&'a [f32]),
    Two(&'a [f32], &'a [f32]),
}

impl StripInput<'_> {
    #[inline(always)]
    fn load(&self, idx: usize) -> f32x4 {
        match self {
            StripInput::Single(row) => load4(row, idx),
            StripInput::Two(top, bottom) => load4(top, idx) + load4(bottom, idx),
        }
    }
}

#[inline(always)]
fn load4(row: &[f32], at: usize) -> f32x4 {
    let arr: [f32; LANES] = row[at..at + LANES].try_into().unwrap();
    f32x4::new(arr)
}

/// One row of one strip: `VECTORS` consecutive vectors, each lane a column.
/// `out` is `None` during warmup, before output row 0 is reached.
#[inline(always)]
fn vertical_block<const VECTORS: usize>(
    d1: &[f32x4; 3],
    n2: &[f32x4; 3],
    input: &StripInput<'_>,
    n: isize,
    ring: &mut Ring<'_>,
    mut out: Option<&mut [f32]>,
) {
    for v in 0..VECTORS {
        let idx = v * LANES;
        let sum = input.load(idx);
        let mut total = f32x4::ZERO;
        for k in 0..3 {
            let y1 = ring.load(k, n - 1, idx);
            let y2 = ring.load(k, n - 2, idx);
            // (35): y[n] = n2*sum - d1*y[n-1] - y[n-2]
            let y = n2[k].mul_add(sum, -(d1[k] * y1) - y2);
            ring.store(k, n, idx, y);
            total += y;
        }
        if let Some(row) = out.as_deref_mut() {
            row[idx..idx + LANES].copy_from_slice(&total.to_array());
        }
    }
}

/// Runs all rows for the strip of `VECTORS * LANES` columns starting at `x`.
///
/// Rows advance through four regions: warmup without output (top neighbor
/// out of bounds, output row still negative), warmup with output, interior
/// (both neighbors in bounds, prefetched), and the bottom border (bottom
/// neighbor replaced by the zero sentinel once out of bounds).
#[multiversion(targets("x86_64+avx2+fma", "x86_64+sse2", "aarch64+neon"))]
fn vertical_strip<const VECTORS: usize, In: RowSource, Out: RowSink>(
    rg: &RecursiveGaussian,
    x: usize,
    ysize: usize,
    ring_data: &mut [f32],
    zero: &[f32],
    input: &In,
    output: &mut Out,
) {
    let lanes = VECTORS * LANES;
    let d1 = [
        f32x4::splat(rg.d1[0]),
        f32x4::splat(rg.d1[1]),
        f32x4::splat(rg.d1[2]),
    ];
    let n2 = [
        f32x4::splat(rg.n2[0]),
        f32x4::splat(rg.n2[1]),
        f32x4::splat(rg.n2[2]),
    ];
    let big_n = rg.radius as isize;

    let mut ring = Ring::new(ring_data, lanes);
    ring.reset();

    // Warmup: top neighbor is out of bounds (zero padded), no output yet.
    let mut n = -big_n + 1;
    while n < 0 {
        // bottom is non-negative because n starts at -N + 1.
        let bottom = (n + big_n - 1) as usize;
        let src = if bottom < ysize {
            &input.row(bottom)[x..x + lanes]
        } else {
            &zero[..lanes]
        };
        vertical_block::<VECTORS>(&d1, &n2, &StripInput::Single(src), n, &mut ring, None);
        n += 1;
    }

    // Output starts; top neighbor still out of bounds.
    while (n as usize) < (big_n as usize + 1).min(ysize) {
        let bottom = (n + big_n - 1) as usize;
        let src = if bottom < ysize {
            &input.row(bottom)[x..x + lanes]
        } else {
            &zero[..lanes]
        };
        let out_row = &mut output.row_mut(n as usize)[x..x + lanes];
        vertical_block::<VECTORS>(
            &d1,
            &n2,
            &StripInput::Single(src),
            n,
            &mut ring,
            Some(out_row),
        );
        n += 1;
    }

    // Interior: both neighbors in bounds, no bounds checks, prefetch ahead.
    while n < ysize as isize - big_n + 1 - PREFETCH_ROWS as isize {
        let top = (n - big_n - 1) as usize;
        let bottom = (n + big_n - 1) as usize;
        let two = StripInput::Two(
            &input.row(top)[x..x + lanes],
            &input.row(bottom)[x..x + lanes],
        );
        let out_row = &mut output.row_mut(n as usize)[x..x + lanes];
        vertical_block::<VECTORS>(&d1, &n2, &two, n, &mut ring, Some(out_row));
        prefetch(&input.row(top + PREFETCH_ROWS)[x..]);
        prefetch(&input.row(bottom + PREFETCH_ROWS)[x..]);
        n += 1;
    }

    // Bottom border: no prefetch, bottom neighbor may leave the image.
    while (n as usize) < ysize {
        let top = (n - big_n - 1) as usize;
        let bottom = n + big_n - 1;
        let bottom_row = if (bottom as usize) < ysize {
            &input.row(bottom as usize)[x..x + lanes]
        } else {
            &zero[..lanes]
        };
        let two = StripInput::Two(&input.row(top)[x..x + lanes], bottom_row);
        let out_row = &mut output.row_mut(n as usize)[x..x + lanes];
        vertical_block::<VECTORS>(&d1, &n2, &two, n, &mut ring, Some(out_row));
        n += 1;
    }
}

/// Remainder columns narrower than one vector, processed one column per
/// lane-equivalent with bounds checks on every row.
fn vertical_strip_scalar<In: RowSource, Out: RowSink>(
    rg: &RecursiveGaussian,
    x: usize,
    cols: usize,
    ysize: usize,
    input: &In,
    output: &mut Out,
) {
    debug_assert!(cols < LANES);
    let big_n = rg.radius as isize;

    // [mode][column] histories; cols < 4.
    let mut prev = [[0f32; LANES]; 3];
    let mut prev2 = [[0f32; LANES]; 3];

    let mut n = -big_n + 1;
    while n < ysize as isize {
        let top = n - big_n - 1;
        let bottom = n + big_n - 1;
        for c in 0..cols {
            let col = x + c;
            let t = if top >= 0 {
                input.row(top as usize)[col]
            } else {
                0.0
            };
            // bottom is non-negative because n starts at -N + 1.
            let b = if (bottom as usize) < ysize {
                input.row(bottom as usize)[col]
            } else {
                0.0
            };
            let sum = t + b;
            let mut total = 0.0;
            for k in 0..3 {
                let y = sum.mul_add(rg.n2[k], -(rg.d1[k] * prev[k][c]) - prev2[k][c]);
                prev2[k][c] = prev[k][c];
                prev[k][c] = y;
                total += y;
            }
            if n >= 0 {
                output.row_mut(n as usize)[col] = total;
            }
        }
        n += 1;
    }
}

#[inline(always)]
fn prefetch(row: &[f32]) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: prefetch is a hint; the pointer is valid for the slice.
    unsafe {
        use core::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(row.as_ptr().cast::<i8>(), _MM_HINT_T0);
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = row;
}

/// Cache-line-sized allocation unit for the scratch buffer.
#[repr(C, align(64))]
#[derive(Clone, Copy)]
struct CacheLine([f32; 16]);

/// Zero-filled, cache-line-aligned scratch with fallible allocation.
struct Scratch {
    blocks: Vec<CacheLine>,
}

impl Scratch {
    fn new(floats: usize) -> Result<Self, GaussError> {
        let n = floats.div_ceil(16);
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(n)
            .map_err(|_| GaussError::OutOfMemory)?;
        blocks.resize(n, CacheLine([0.0; 16]));
        Ok(Self { blocks })
    }

    fn floats_mut(&mut self) -> &mut [f32] {
        let len = self.blocks.len() * 16;
        // SAFETY: CacheLine is repr(C) over [f32; 16]; the cast reinterprets
        // the same initialized storage.
        unsafe { std::slice::from_raw_parts_mut(self.blocks.as_mut_ptr().cast::<f32>(), len) }
    }
}
