//! Row-major addressing of square grayscale images.

use crate::errors::EdgeError;

/// Side length of a square grid; all addressing is done on flat indices.
///
/// `side * side` always fits in a `usize`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridShape {
    side: usize,
}

impl GridShape {
    pub fn new(side: usize) -> Result<Self, EdgeError> {
        if side.checked_mul(side).is_none() {
            return Err(EdgeError::MalformedRequest(format!(
                "Image side {} is too large",
                side
            )));
        }
        Ok(Self { side })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn len(&self) -> usize {
        self.side * self.side
    }

    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    /// Row and column of a flat index.
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.side, index % self.side)
    }

    /// Outermost row or column. The side length is used for both axes.
    pub fn is_border(&self, index: usize) -> bool {
        let (x, y) = self.coords(index);
        let last = self.side - 1;
        x == 0 || x == last || y == 0 || y == last
    }

    /// Flat indices of the 3×3 neighbourhood, row-major from the top-left:
    /// `-W-1, -W, -W+1, -1, 0, +1, W-1, W, W+1`.
    ///
    /// Only meaningful for interior indices.
    pub fn neighborhood(&self, index: usize) -> [usize; 9] {
        let w = self.side;
        [
            index - w - 1,
            index - w,
            index - w + 1,
            index - 1,
            index,
            index + 1,
            index + w - 1,
            index + w,
            index + w + 1,
        ]
    }

    /// Rejects sequences whose length is not `side * side`.
    pub fn check_len(&self, len: usize) -> Result<(), EdgeError> {
        if len != self.len() {
            return Err(EdgeError::MalformedRequest(format!(
                "Expected {} pixels for a {}x{} image, got {}",
                self.len(),
                self.side,
                self.side,
                len
            )));
        }
        Ok(())
    }
}

/// A square grayscale image. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    shape: GridShape,
    pixels: Vec<u8>,
}

impl PixelGrid {
    pub fn try_with(side: usize, pixels: Vec<u8>) -> Result<Self, EdgeError> {
        let shape = GridShape::new(side)?;
        shape.check_len(pixels.len())?;
        Ok(Self { shape, pixels })
    }

    /// Builds a grid from explicit dimensions, rejecting anything but squares.
    pub fn from_dimensions(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, EdgeError> {
        if width != height {
            return Err(EdgeError::UnsupportedShape(format!(
                "{}x{} is not square",
                width, height
            )));
        }
        Self::try_with(width, pixels)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn side(&self) -> usize {
        self.shape.side()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_of_four_by_four() -> Result<(), EdgeError> {
        let shape = GridShape::new(4)?;
        let interior: Vec<usize> = (0..16).filter(|&i| !shape.is_border(i)).collect();
        assert_eq!(interior, vec![5, 6, 9, 10]);
        Ok(())
    }

    #[test]
    fn test_neighborhood_order() -> Result<(), EdgeError> {
        let shape = GridShape::new(4)?;
        assert_eq!(shape.neighborhood(5), [0, 1, 2, 4, 5, 6, 8, 9, 10]);
        Ok(())
    }

    #[test]
    fn test_rejects_side_whose_square_overflows() {
        let huge = 1usize << (usize::BITS / 2);
        assert!(matches!(GridShape::new(huge), Err(EdgeError::MalformedRequest(_))));
        assert!(matches!(
            PixelGrid::try_with(huge, Vec::new()),
            Err(EdgeError::MalformedRequest(_))
        ));
        assert!(GridShape::new(huge - 1).is_ok());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(PixelGrid::try_with(3, vec![0; 8]).is_err());
        assert!(PixelGrid::try_with(3, vec![0; 9]).is_ok());
        assert!(matches!(
            PixelGrid::from_dimensions(3, 2, vec![0; 6]),
            Err(EdgeError::UnsupportedShape(_))
        ));
    }
}
