//! Typed 2-D pixel target with row-scoped write access.

use std::ops::{Deref, DerefMut};

use crate::error::{TiffError, TiffResult};

/// A strided two-dimensional sample buffer.
///
/// Rows are lent out one at a time through [`row`](PixelBuffer::row); the
/// exclusive borrow keeps concurrent row handles impossible and a write is
/// visible once its handle is released.
#[derive(Debug, Clone)]
pub struct PixelBuffer<T> {
    data: Vec<T>,
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    /// Row stride in samples; at least `width * samples_per_pixel`.
    stride: usize,
}

impl<T: Copy + Default> PixelBuffer<T> {
    pub fn new(width: u32, height: u32, samples_per_pixel: u16) -> Self {
        let stride = width as usize * usize::from(samples_per_pixel);
        Self::with_stride(width, height, samples_per_pixel, stride)
    }

    /// A buffer whose rows are padded out to `stride` samples, e.g. a tile
    /// view into a larger destination.
    pub fn with_stride(width: u32, height: u32, samples_per_pixel: u16, stride: usize) -> Self {
        let row_samples = width as usize * usize::from(samples_per_pixel);
        let stride = stride.max(row_samples);
        Self {
            data: vec![T::default(); stride * height as usize],
            width,
            height,
            samples_per_pixel,
            stride,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    /// Lends the sample span of one row.
    pub fn row(&mut self, row: u32) -> TiffResult<RowSpan<'_, T>> {
        if row >= self.height {
            return Err(TiffError::OutOfRange {
                row,
                rows: self.height,
            });
        }
        let start = row as usize * self.stride;
        let len = self.width as usize * usize::from(self.samples_per_pixel);
        Ok(RowSpan {
            samples: &mut self.data[start..start + len],
        })
    }

    /// Read-only view of one row, mainly for assertions.
    pub fn row_samples(&self, row: u32) -> Option<&[T]> {
        if row >= self.height {
            return None;
        }
        let start = row as usize * self.stride;
        let len = self.width as usize * usize::from(self.samples_per_pixel);
        Some(&self.data[start..start + len])
    }

    /// The whole backing store, including any stride padding.
    pub fn samples(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// Scoped handle for one row's samples.
pub struct RowSpan<'a, T> {
    samples: &'a mut [T],
}

impl<T> Deref for RowSpan<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.samples
    }
}

impl<T> DerefMut for RowSpan<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_strided() {
        let mut buffer = PixelBuffer::<u8>::with_stride(2, 2, 1, 4);
        buffer.row(0).unwrap().copy_from_slice(&[1, 2]);
        buffer.row(1).unwrap().copy_from_slice(&[3, 4]);
        assert_eq!(buffer.samples(), &[1, 2, 0, 0, 3, 4, 0, 0]);
    }

    #[test]
    fn out_of_range_row_is_refused() {
        let mut buffer = PixelBuffer::<u8>::new(2, 2, 1);
        assert!(matches!(
            buffer.row(2),
            Err(TiffError::OutOfRange { row: 2, rows: 2 })
        ));
    }

    #[test]
    fn multi_sample_rows_cover_all_samples() {
        let mut buffer = PixelBuffer::<u16>::new(2, 1, 3);
        assert_eq!(buffer.row(0).unwrap().len(), 6);
    }
}
