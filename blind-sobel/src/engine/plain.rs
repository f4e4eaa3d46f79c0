use crate::engine::{GradientPair, integer_magnitude};
use crate::errors::EdgeError;
use crate::grid::PixelGrid;
use crate::kernel::{SOBEL_X, SOBEL_Y, weighted_sum};
use crate::transform::ChunkedTransform;

/// Sobel over raw pixel values.
#[derive(Debug, Clone)]
pub struct PlaintextGradientEngine {
    transform: ChunkedTransform,
}

impl PlaintextGradientEngine {
    pub fn new(transform: ChunkedTransform) -> Self {
        Self { transform }
    }

    /// Raw `(Gx, Gy)` at `index`; zero on the border.
    pub fn gradient(grid: &PixelGrid, index: usize) -> GradientPair<i64> {
        let shape = grid.shape();
        if shape.is_border(index) {
            return GradientPair::new(0, 0);
        }

        let pixels = grid.pixels();
        let taps = shape.neighborhood(index).map(|i| pixels[i] as i64);
        GradientPair::new(weighted_sum(&SOBEL_X, &taps), weighted_sum(&SOBEL_Y, &taps))
    }

    /// Edge magnitude of every pixel, in index order.
    pub fn detect(&self, grid: &PixelGrid) -> Result<Vec<u8>, EdgeError> {
        let indices: Vec<usize> = (0..grid.shape().len()).collect();
        self.transform.map(&indices, |&index| {
            let GradientPair { gx, gy } = Self::gradient(grid, index);
            Ok(integer_magnitude(gx, gy))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PlaintextGradientEngine {
        PlaintextGradientEngine::new(ChunkedTransform::new(3).unwrap())
    }

    fn bright_pixel(value: u8) -> PixelGrid {
        let mut pixels = vec![0u8; 16];
        pixels[10] = value;
        PixelGrid::try_with(4, pixels).unwrap()
    }

    #[test]
    fn test_single_saturated_pixel() -> Result<(), EdgeError> {
        let out = engine().detect(&bright_pixel(255))?;
        assert_eq!(out, vec![0, 0, 0, 0, 0, 255, 255, 0, 0, 255, 0, 0, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_single_dim_pixel() -> Result<(), EdgeError> {
        let grid = bright_pixel(100);
        assert_eq!(PlaintextGradientEngine::gradient(&grid, 5), GradientPair::new(100, 100));
        assert_eq!(PlaintextGradientEngine::gradient(&grid, 10), GradientPair::new(0, 0));

        let out = engine().detect(&grid)?;
        assert_eq!((out[5], out[6], out[9], out[10]), (141, 200, 200, 0));
        Ok(())
    }

    #[test]
    fn test_constant_image_has_no_edges() -> Result<(), EdgeError> {
        let grid = PixelGrid::try_with(7, vec![173; 49])?;
        assert!(engine().detect(&grid)?.iter().all(|&p| p == 0));
        Ok(())
    }

    #[test]
    fn test_tiny_images_are_all_border() -> Result<(), EdgeError> {
        for side in 0..3 {
            let grid = PixelGrid::try_with(side, vec![255; side * side])?;
            assert_eq!(engine().detect(&grid)?, vec![0; side * side]);
        }
        Ok(())
    }
}
