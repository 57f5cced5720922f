//! Label matrices on disk: grayscale images or JSON row arrays.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma};
use tracing::debug;

use crate::{
    error::{LabelError, Result},
    labels::LabelMatrix,
};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Labels from an 8 or 16-bit grayscale image; any other pixel format is
/// converted to 16-bit luma first.
pub fn labels_from_image(image: &DynamicImage) -> LabelMatrix {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data: Vec<u32> = match image {
        DynamicImage::ImageLuma8(buf) => buf.as_raw().iter().map(|&v| v as u32).collect(),
        DynamicImage::ImageLuma16(buf) => buf.as_raw().iter().map(|&v| v as u32).collect(),
        other => other.to_luma16().as_raw().iter().map(|&v| v as u32).collect(),
    };
    let mut labels = LabelMatrix::new(height, width);
    for (i, v) in data.into_iter().enumerate() {
        labels.set(i / width, i % width, v);
    }
    labels
}

/// 16-bit grayscale image of the labels.
pub fn labels_to_image(labels: &LabelMatrix) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>> {
    let max = labels.max_label();
    if max > u16::MAX as u32 {
        return Err(LabelError::LabelOverflow { label: max });
    }
    let raw: Vec<u16> = labels.as_slice().iter().map(|&l| l as u16).collect();
    ImageBuffer::from_raw(labels.width() as u32, labels.height() as u32, raw).ok_or_else(|| {
        LabelError::InvariantViolation("label buffer does not match its shape".to_string())
    })
}

/// Load labels from `.json` rows or any image format `image` can decode.
pub fn load_labels(path: impl AsRef<Path>) -> Result<LabelMatrix> {
    let path = path.as_ref();
    let labels = if is_json(path) {
        let rows: Vec<Vec<u32>> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        LabelMatrix::from_rows(&rows)?
    } else {
        labels_from_image(&image::open(path)?)
    };
    debug!(path = %path.display(), shape = ?labels.shape(), "loaded labels");
    Ok(labels)
}

/// Save labels as `.json` rows or a 16-bit image whose format follows the
/// extension.
pub fn save_labels(labels: &LabelMatrix, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if is_json(path) {
        std::fs::write(path, serde_json::to_string(&labels.to_rows())?)?;
    } else {
        labels_to_image(labels)?.save(path)?;
    }
    debug!(path = %path.display(), "saved labels");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_from_gray_image() {
        let mut image = GrayImage::new(3, 2);
        image.put_pixel(2, 1, Luma([7u8]));
        let labels = labels_from_image(&DynamicImage::ImageLuma8(image));
        assert_eq!(labels.shape(), (2, 3));
        assert_eq!(labels.get(1, 2), 7);
        assert_eq!(labels.labels(), vec![7]);
    }

    #[test]
    fn test_sixteen_bit_round_trip() {
        let mut labels = LabelMatrix::new(4, 5);
        labels.set(0, 4, 300);
        labels.set(3, 0, 65535);
        let image = labels_to_image(&labels).expect("labels fit");
        let back = labels_from_image(&DynamicImage::ImageLuma16(image));
        assert_eq!(back, labels);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut labels = LabelMatrix::new(2, 2);
        labels.set(1, 1, 70_000);
        assert!(matches!(
            labels_to_image(&labels),
            Err(LabelError::LabelOverflow { label: 70_000 })
        ));
    }

    #[test]
    fn test_json_extension() {
        assert!(is_json(Path::new("labels.JSON")));
        assert!(!is_json(Path::new("labels.png")));
    }
}
