//! Horizontal pass: 1D recursion along a row.
//!
//! Although output `n` depends on outputs `n-1` and `n-2`, the recursion can
//! be unrolled 4x by precomputing up to fourth powers of the coefficients
//! (the `mul_*` tables in [`RecursiveGaussian`]), so the interior of a row
//! produces four outputs per step. Beyond 4 lanes the accumulated rounding
//! error in the expanded coefficients becomes unacceptable; the cap is a
//! correctness boundary, not a tunable.

use multiversion::multiversion;
use wide::f32x4;

use crate::RecursiveGaussian;

/// Unroll factor of the interior loop. Do not raise.
const MAX_LANES: usize = 4;

/// Applies the 1D recursive blur along a single row.
///
/// `input` and `output` must have equal length (`xsize`). Samples outside
/// `[0, xsize)` are treated as zero. No allocation, no failure path.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+sse2", "aarch64+neon"))]
pub fn horizontal_row(rg: &RecursiveGaussian, input: &[f32], output: &mut [f32]) {
    assert_eq!(input.len(), output.len());
    let xsize = input.len() as isize;
    let big_n = rg.radius as isize;

    // Scalar per-mode history, carried across all three phases.
    let mut prev = [0f32; 3];
    let mut prev2 = [0f32; 3];

    let mut n = -big_n + 1;

    // Left boundary: bounds-checked, zero-padded, output only once n >= 0.
    let first_aligned = (rg.radius + 1).next_multiple_of(MAX_LANES) as isize;
    while n < first_aligned.min(xsize) {
        let sum = padded_sum(input, n, big_n);
        let out = scalar_step(rg, sum, &mut prev, &mut prev2);
        if n >= 0 {
            output[n as usize] = out;
        }
        n += 1;
    }

    // Interior: no bounds checks, 4 outputs per mode per step. To produce a
    // vector of outputs we multiply broadcast input sums by lane-shifted
    // coefficient vectors and add the history terms; each step only depends
    // on the previous step's last two outputs.
    let mul_in = [
        f32x4::new(rg.mul_in[0]),
        f32x4::new(rg.mul_in[1]),
        f32x4::new(rg.mul_in[2]),
    ];
    let mul_in_s1 = [shift1(rg.mul_in[0]), shift1(rg.mul_in[1]), shift1(rg.mul_in[2])];
    let mul_in_s2 = [shift2(rg.mul_in[0]), shift2(rg.mul_in[1]), shift2(rg.mul_in[2])];
    let mul_in_s3 = [shift3(rg.mul_in[0]), shift3(rg.mul_in[1]), shift3(rg.mul_in[2])];
    let mul_prev = [
        f32x4::new(rg.mul_prev[0]),
        f32x4::new(rg.mul_prev[1]),
        f32x4::new(rg.mul_prev[2]),
    ];
    let mul_prev2 = [
        f32x4::new(rg.mul_prev2[0]),
        f32x4::new(rg.mul_prev2[1]),
        f32x4::new(rg.mul_prev2[2]),
    ];

    let mut prev_v = [
        f32x4::splat(prev[0]),
        f32x4::splat(prev[1]),
        f32x4::splat(prev[2]),
    ];
    let mut prev2_v = [
        f32x4::splat(prev2[0]),
        f32x4::splat(prev2[1]),
        f32x4::splat(prev2[2]),
    ];

    while n < xsize - big_n + 1 - (MAX_LANES as isize - 1) {
        let left = (n - big_n - 1) as usize;
        let right = (n + big_n - 1) as usize;
        let sum = load4(input, left) + load4(input, right);
        let s = sum.to_array();
        let in0 = f32x4::splat(s[0]);
        let in1 = f32x4::splat(s[1]);
        let in2 = f32x4::splat(s[2]);
        let in3 = f32x4::splat(s[3]);

        let mut total = f32x4::ZERO;
        for k in 0..3 {
            let mut out = in0 * mul_in[k];
            out = mul_in_s1[k].mul_add(in1, out);
            out = mul_in_s2[k].mul_add(in2, out);
            out = mul_in_s3[k].mul_add(in3, out);

            out = mul_prev2[k].mul_add(prev2_v[k], out);
            out = mul_prev[k].mul_add(prev_v[k], out);

            let o = out.to_array();
            prev2_v[k] = f32x4::splat(o[MAX_LANES - 2]);
            prev_v[k] = f32x4::splat(o[MAX_LANES - 1]);
            total += out;
        }
        output[n as usize..n as usize + MAX_LANES].copy_from_slice(&total.to_array());
        n += MAX_LANES as isize;
    }

    for k in 0..3 {
        prev[k] = prev_v[k].to_array()[0];
        prev2[k] = prev2_v[k].to_array()[0];
    }

    // Right boundary: bounds checks re-enabled as n approaches xsize.
    while n < xsize {
        let sum = padded_sum(input, n, big_n);
        output[n as usize] = scalar_step(rg, sum, &mut prev, &mut prev2);
        n += 1;
    }
}

/// Symmetric input sum `in[n - N - 1] + in[n + N - 1]` with zero padding.
#[inline(always)]
fn padded_sum(input: &[f32], n: isize, big_n: isize) -> f32 {
    let left = n - big_n - 1;
    let right = n + big_n - 1;
    let left_val = if left >= 0 { input[left as usize] } else { 0.0 };
    let right_val = if right < input.len() as isize {
        input[right as usize]
    } else {
        0.0
    };
    left_val + right_val
}

/// One output of the plain second-order recursion, summed over modes.
#[inline(always)]
fn scalar_step(rg: &RecursiveGaussian, sum: f32, prev: &mut [f32; 3], prev2: &mut [f32; 3]) -> f32 {
    let mut total = 0.0;
    for k in 0..3 {
        let mut out = sum * rg.mul_in[k][0];
        out = rg.mul_prev2[k][0].mul_add(prev2[k], out);
        prev2[k] = prev[k];
        out = rg.mul_prev[k][0].mul_add(prev[k], out);
        prev[k] = out;
        total += out;
    }
    total
}

#[inline(always)]
fn load4(input: &[f32], at: usize) -> f32x4 {
    let arr: [f32; 4] = input[at..at + 4].try_into().unwrap();
    f32x4::new(arr)
}

// Lane shifts of a coefficient vector (zeros shifted in from lane 0).
#[inline(always)]
fn shift1(c: [f32; 4]) -> f32x4 {
    f32x4::new([0.0, c[0], c[1], c[2]])
}

#[inline(always)]
fn shift2(c: [f32; 4]) -> f32x4 {
    f32x4::new([0.0, 0.0, c[0], c[1]])
}

#[inline(always)]
fn shift3(c: [f32; 4]) -> f32x4 {
    f32x4::new([0.0, 0.0, 0.0, c[0]])
}
