//! Three-panel image composition.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage, RgbImage};
use thiserror::Error;

/// Every source panel is resized to this height, aspect ratio preserved.
pub const CANVAS_HEIGHT: u32 = 300;

/// Fixed size of the destination canvas.
pub const CANVAS_WIDTH: u32 = 960;

/// Horizontal distance between panel origins: panels land at 0, 320, 640.
pub const PANEL_OFFSET: u32 = 320;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot open source image `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("source image `{path}` has zero height")]
    EmptySource { path: PathBuf },
}

/// Compose three source images into one 960x300 panel strip.
///
/// Each source is resized to the target height with Lanczos resampling and
/// pasted onto a transparent canvas at its fixed offset, in category order;
/// a panel wider than its slot is overdrawn by the next paste and clipped
/// at the canvas edge. The flattened RGB result is ready for JPEG encoding.
pub(crate) fn compose(sources: [&Path; 3]) -> Result<RgbImage, RenderError> {
    let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgba([0, 0, 0, 0]));

    for (index, path) in sources.into_iter().enumerate() {
        let source = image::open(path).map_err(|source| RenderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let panel = resize_to_height(&source, path)?;
        let x = i64::from(index as u32 * PANEL_OFFSET);
        imageops::overlay(&mut canvas, &panel.to_rgba8(), x, 0);
    }

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn resize_to_height(source: &DynamicImage, path: &Path) -> Result<DynamicImage, RenderError> {
    let (width, height) = source.dimensions();
    if height == 0 || width == 0 {
        return Err(RenderError::EmptySource {
            path: path.to_path_buf(),
        });
    }
    let scaled_width =
        ((f64::from(width) * f64::from(CANVAS_HEIGHT) / f64::from(height)).round() as u32).max(1);
    Ok(source.resize_exact(scaled_width, CANVAS_HEIGHT, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn write_solid_jpeg(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        img.save(&path).expect("write fixture jpeg");
        path
    }

    #[test]
    fn composes_fixed_size_canvas() {
        let dir = TempDir::new().expect("temp dir");
        let a = write_solid_jpeg(dir.path(), "a.jpg", 320, 300, [200, 10, 10]);
        let b = write_solid_jpeg(dir.path(), "b.jpg", 640, 600, [10, 200, 10]);
        let c = write_solid_jpeg(dir.path(), "c.jpg", 150, 300, [10, 10, 200]);

        let composed = compose([a.as_path(), b.as_path(), c.as_path()]).expect("composed");
        assert_eq!(composed.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));

        // Panel centers carry their source color (JPEG noise tolerant).
        let center = |panel: u32| composed.get_pixel(panel * PANEL_OFFSET + 70, 150);
        assert!(center(0)[0] > 150 && center(0)[1] < 80);
        assert!(center(1)[1] > 150 && center(1)[0] < 80);
        assert!(center(2)[2] > 150 && center(2)[0] < 80);
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        let dir = TempDir::new().expect("temp dir");
        // 150x300 source: panel is 150 wide, so x=200 in slot 3 stays blank.
        let a = write_solid_jpeg(dir.path(), "a.jpg", 320, 300, [255, 255, 255]);
        let b = write_solid_jpeg(dir.path(), "b.jpg", 320, 300, [255, 255, 255]);
        let narrow = write_solid_jpeg(dir.path(), "n.jpg", 75, 150, [255, 255, 255]);

        let composed = compose([a.as_path(), b.as_path(), narrow.as_path()]).expect("composed");
        // Narrow source scales to 150x300; beyond that the canvas stays the
        // flattened transparent background.
        let blank = composed.get_pixel(2 * PANEL_OFFSET + 200, 150);
        assert_eq!(blank, &Rgb([0, 0, 0]));
        let filled = composed.get_pixel(2 * PANEL_OFFSET + 75, 150);
        assert!(filled[0] > 200);
    }

    #[test]
    fn missing_source_fails() {
        let dir = TempDir::new().expect("temp dir");
        let a = write_solid_jpeg(dir.path(), "a.jpg", 100, 100, [1, 2, 3]);
        let missing = dir.path().join("absent.jpg");
        let err = compose([a.as_path(), missing.as_path(), a.as_path()]).expect_err("open failure");
        assert!(matches!(err, RenderError::Open { .. }));
    }
}
