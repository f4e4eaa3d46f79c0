use anyhow::{Context, Result};
use blind_sobel::grid::PixelGrid;
use image::GrayImage;

use std::path::Path;

/// Loads any supported image as 8-bit grayscale. Only square images are accepted.
pub fn load_grid(path: &Path) -> Result<PixelGrid> {
    let image = image::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .to_luma8();
    let (width, height) = (image.width() as usize, image.height() as usize);
    let grid = PixelGrid::from_dimensions(width, height, image.into_raw())?;
    Ok(grid)
}

pub fn save_pixels(path: &Path, side: usize, pixels: Vec<u8>) -> Result<()> {
    let image = GrayImage::from_raw(side as u32, side as u32, pixels)
        .with_context(|| format!("pixels do not fill a {}x{} image", side, side))?;
    image
        .save(path)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
