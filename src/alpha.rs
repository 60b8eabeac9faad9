//! Per-pixel alpha compositing primitives.
//!
//! Closed-form arithmetic over independent pixels; no state, no recursion.
//! All slices are parallel per-channel planes of equal length, with color
//! and alpha as linear floats (alpha in `[0, 1]`).

/// Alpha below this is treated as this value when (un)premultiplying, so
/// fully transparent pixels keep their color instead of dividing by zero.
pub const SMALL_ALPHA: f32 = 1e-6;

/// One layer of a blend: three color planes and an alpha plane.
#[derive(Clone, Copy)]
pub struct Layer<'a> {
    pub r: &'a [f32],
    pub g: &'a [f32],
    pub b: &'a [f32],
    pub a: &'a [f32],
}

/// Output planes of a blend.
pub struct LayerMut<'a> {
    pub r: &'a mut [f32],
    pub g: &'a mut [f32],
    pub b: &'a mut [f32],
    pub a: &'a mut [f32],
}

/// Composites `fg` over `bg`.
///
/// The output alpha is `1 - (1 - fg_a) * (1 - bg_a)` in both modes. With
/// straight (non-premultiplied) alpha each color is
/// `(fg_c * fg_a + bg_c * bg_a * (1 - fg_a)) / out_a`, or 0 where
/// `out_a == 0`; with premultiplied alpha the division disappears and the
/// color is `fg_c + bg_c * (1 - fg_a)`.
pub fn alpha_blend(bg: Layer<'_>, fg: Layer<'_>, out: LayerMut<'_>, premultiplied: bool) {
    let n = out.a.len();
    if premultiplied {
        for x in 0..n {
            out.r[x] = fg.r[x] + bg.r[x] * (1.0 - fg.a[x]);
            out.g[x] = fg.g[x] + bg.g[x] * (1.0 - fg.a[x]);
            out.b[x] = fg.b[x] + bg.b[x] * (1.0 - fg.a[x]);
            out.a[x] = 1.0 - (1.0 - fg.a[x]) * (1.0 - bg.a[x]);
        }
    } else {
        for x in 0..n {
            let new_a = 1.0 - (1.0 - fg.a[x]) * (1.0 - bg.a[x]);
            let rnew_a = if new_a > 0.0 { 1.0 / new_a } else { 0.0 };
            out.r[x] = (fg.r[x] * fg.a[x] + bg.r[x] * bg.a[x] * (1.0 - fg.a[x])) * rnew_a;
            out.g[x] = (fg.g[x] * fg.a[x] + bg.g[x] * bg.a[x] * (1.0 - fg.a[x])) * rnew_a;
            out.b[x] = (fg.b[x] * fg.a[x] + bg.b[x] * bg.a[x] * (1.0 - fg.a[x])) * rnew_a;
            out.a[x] = new_a;
        }
    }
}

/// Single-channel variant of [`alpha_blend`], for blending extra channels.
pub fn alpha_blend_channel(
    bg: &[f32],
    bga: &[f32],
    fg: &[f32],
    fga: &[f32],
    out: &mut [f32],
    premultiplied: bool,
) {
    if premultiplied {
        for x in 0..out.len() {
            out[x] = fg[x] + bg[x] * (1.0 - fga[x]);
        }
    } else {
        for x in 0..out.len() {
            let new_a = 1.0 - (1.0 - fga[x]) * (1.0 - bga[x]);
            let rnew_a = if new_a > 0.0 { 1.0 / new_a } else { 0.0 };
            out[x] = (fg[x] * fga[x] + bg[x] * bga[x] * (1.0 - fga[x])) * rnew_a;
        }
    }
}

/// Adds `fg` weighted by its alpha onto `bg`; alpha passes through from `bg`.
pub fn alpha_weighted_add(bg: Layer<'_>, fg: Layer<'_>, out: LayerMut<'_>) {
    for x in 0..out.a.len() {
        out.r[x] = bg.r[x] + fg.r[x] * fg.a[x];
        out.g[x] = bg.g[x] + fg.g[x] * fg.a[x];
        out.b[x] = bg.b[x] + fg.b[x] * fg.a[x];
        out.a[x] = bg.a[x];
    }
}

/// Elementwise product of two planes.
pub fn mul_blend(bg: &[f32], fg: &[f32], out: &mut [f32]) {
    for x in 0..out.len() {
        out[x] = bg[x] * fg[x];
    }
}

/// Scales each color by `max(a, SMALL_ALPHA)`.
pub fn premultiply(r: &mut [f32], g: &mut [f32], b: &mut [f32], a: &[f32]) {
    for x in 0..a.len() {
        let multiplier = a[x].max(SMALL_ALPHA);
        r[x] *= multiplier;
        g[x] *= multiplier;
        b[x] *= multiplier;
    }
}

/// Inverse of [`premultiply`]; near-zero alpha leaves colors ~unchanged
/// scaled by `1 / SMALL_ALPHA` of their premultiplied value.
pub fn unpremultiply(r: &mut [f32], g: &mut [f32], b: &mut [f32], a: &[f32]) {
    for x in 0..a.len() {
        let multiplier = 1.0 / a[x].max(SMALL_ALPHA);
        r[x] *= multiplier;
        g[x] *= multiplier;
        b[x] *= multiplier;
    }
}
