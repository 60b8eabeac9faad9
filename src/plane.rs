//! Row access over logical image planes.
//!
//! The blur engine never owns the planes it reads and writes; it sees them
//! through these traits. A row is exactly `width` contiguous floats, row
//! indices are always in `[0, height)`, and rows at different indices never
//! alias.

/// Read access to the rows of a plane.
pub trait RowSource {
    /// Returns row `y`. The slice is exactly `width` elements.
    fn row(&self, y: usize) -> &[f32];
}

/// Write access to the rows of a plane.
pub trait RowSink {
    /// Returns row `y` mutably. The slice is exactly `width` elements.
    fn row_mut(&mut self, y: usize) -> &mut [f32];
}

/// Read-only view of a contiguous row-major plane.
#[derive(Clone, Copy)]
pub struct PlaneRef<'a> {
    data: &'a [f32],
    width: usize,
}

impl<'a> PlaneRef<'a> {
    /// # Panics
    /// Panics if `data` is not a whole number of `width`-sized rows.
    pub fn new(data: &'a [f32], width: usize) -> Self {
        assert!(width > 0);
        assert_eq!(data.len() % width, 0);
        Self { data, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.data.len() / self.width
    }
}

impl RowSource for PlaneRef<'_> {
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

/// Mutable view of a contiguous row-major plane.
pub struct PlaneMut<'a> {
    data: &'a mut [f32],
    width: usize,
}

impl<'a> PlaneMut<'a> {
    /// # Panics
    /// Panics if `data` is not a whole number of `width`-sized rows.
    pub fn new(data: &'a mut [f32], width: usize) -> Self {
        assert!(width > 0);
        assert_eq!(data.len() % width, 0);
        Self { data, width }
    }
}

impl RowSource for PlaneMut<'_> {
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

impl RowSink for PlaneMut<'_> {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f32] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }
}
