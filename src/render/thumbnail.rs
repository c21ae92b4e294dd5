//! Thumbnail downscaling of display images.

use super::DisplayImage;

/// Downscales a display image to fit within a bounding box, preserving
/// aspect ratio.
///
/// Uses box-filter averaging: each output pixel is the mean of the
/// source region it covers, so high-contrast hot pixels do not alias
/// into stray bright thumbnails. An image already within the box is
/// returned as a copy.
pub fn thumbnail(image: &DisplayImage, max_width: usize, max_height: usize) -> DisplayImage {
    let (src_w, src_h) = (image.width(), image.height());
    if src_w <= max_width && src_h <= max_height {
        return image.clone();
    }

    let scale = (max_width as f64 / src_w as f64).min(max_height as f64 / src_h as f64);
    let out_w = ((src_w as f64 * scale).round() as usize).max(1);
    let out_h = ((src_h as f64 * scale).round() as usize).max(1);

    let mut pixels = Vec::with_capacity(out_w * out_h);
    for out_row in 0..out_h {
        let r0 = out_row * src_h / out_h;
        let r1 = (((out_row + 1) * src_h).div_ceil(out_h)).min(src_h);
        for out_col in 0..out_w {
            let c0 = out_col * src_w / out_w;
            let c1 = (((out_col + 1) * src_w).div_ceil(out_w)).min(src_w);

            let mut sum = 0u64;
            for row in r0..r1 {
                for col in c0..c1 {
                    sum += u64::from(image.pixel(row, col));
                }
            }
            let count = ((r1 - r0) * (c1 - c0)) as u64;
            pixels.push((sum as f64 / count as f64).round() as u8);
        }
    }

    DisplayImage::new(pixels, out_w, out_h)
}
