use std::fmt;
use std::fs;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::Value;

use crate::error::{ViewerError, ViewerResult};
use crate::normalize::{self, CanonicalFrameSet, SchemaTag};

/// A frame-set that made it through parsing and detection, with the bits of
/// its origin the session keeps alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFrameSet {
    pub frame_set: CanonicalFrameSet,
    pub tag: SchemaTag,
    pub base_name: Option<String>,
}

/// Decoded sprite-sheet image. Owns its pixel buffer; dropping the handle
/// releases it.
pub struct ImageHandle {
    name: String,
    pixels: DynamicImage,
}

impl ImageHandle {
    pub fn new(name: impl Into<String>, pixels: DynamicImage) -> Self {
        let handle = Self {
            name: name.into(),
            pixels,
        };
        tracing::debug!(
            image = %handle.name,
            width = handle.width(),
            height = handle.height(),
            "image buffer acquired"
        );
        handle
    }

    pub fn from_bytes(name: &str, bytes: &[u8], format: ImageFormat) -> ViewerResult<Self> {
        let pixels = image::load_from_memory_with_format(bytes, format)
            .map_err(|err| ViewerError::ImageDecodeFailure(format!("{name}: {err}")))?;
        Ok(Self::new(name, pixels))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("name", &self.name)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        tracing::debug!(image = %self.name, "image buffer released");
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reject anything not named `*.json`, then read and parse it.
/// Returns the parsed document and the name with `.json` removed.
pub fn read_json_document(path: &Path) -> ViewerResult<(Value, String)> {
    let file_name = file_name_of(path);
    if !file_name.ends_with(".json") {
        return Err(ViewerError::WrongFileKind(
            "Please upload a JSON file".to_string(),
        ));
    }
    let base_name = file_name.replacen(".json", "", 1);
    let text = fs::read_to_string(path)?;
    let raw = parse_json_text(&text)?;
    tracing::debug!(path = %path.display(), "frame metadata parsed");
    Ok((raw, base_name))
}

pub fn parse_json_text(text: &str) -> ViewerResult<Value> {
    serde_json::from_str(text).map_err(|err| ViewerError::ParseFailure(err.to_string()))
}

pub fn frame_set_from_value(raw: &Value, base_name: Option<String>) -> ViewerResult<LoadedFrameSet> {
    let (tag, frame_set) = normalize::normalize(raw)?;
    Ok(LoadedFrameSet {
        frame_set,
        tag,
        base_name,
    })
}

pub fn load_frame_set(path: &Path) -> ViewerResult<LoadedFrameSet> {
    let (raw, base_name) = read_json_document(path)?;
    let loaded = frame_set_from_value(&raw, Some(base_name))?;
    tracing::info!(
        path = %path.display(),
        format = %loaded.tag,
        frames = loaded.frame_set.len(),
        "frame set loaded"
    );
    Ok(loaded)
}

/// The image slot accepts any extension the `image` crate maps to a raster
/// format; decoding is then attempted with that format.
pub fn load_image(path: &Path) -> ViewerResult<ImageHandle> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| ViewerError::WrongFileKind("Please upload an image file".to_string()))?;
    let bytes = fs::read(path)?;
    ImageHandle::from_bytes(&file_name_of(path), &bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::new(w, h))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn json_slot_rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            load_frame_set(&path),
            Err(ViewerError::WrongFileKind(_))
        ));
    }

    #[test]
    fn invalid_json_is_a_parse_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_frame_set(&path),
            Err(ViewerError::ParseFailure(_))
        ));
    }

    #[test]
    fn unrecognized_document_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        fs::write(&path, r#"{"foo": 1}"#).unwrap();
        assert!(matches!(
            load_frame_set(&path),
            Err(ViewerError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn base_name_drops_json_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heroes.json");
        let doc = json!({
            "sprites": [{"fileName": "a", "x": 0, "y": 0, "width": 1, "height": 1}],
            "spriteSheetWidth": 1,
            "spriteSheetHeight": 1
        });
        fs::write(&path, doc.to_string()).unwrap();
        let loaded = load_frame_set(&path).unwrap();
        assert_eq!(loaded.tag, SchemaTag::SpriteList);
        assert_eq!(loaded.base_name.as_deref(), Some("heroes"));
    }

    #[test]
    fn image_slot_requires_image_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.json");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            load_image(&path),
            Err(ViewerError::WrongFileKind(_))
        ));
    }

    #[test]
    fn corrupt_image_is_a_decode_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            load_image(&path),
            Err(ViewerError::ImageDecodeFailure(_))
        ));
    }

    #[test]
    fn decodes_png_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        fs::write(&path, png_bytes(64, 63)).unwrap();
        let handle = load_image(&path).unwrap();
        assert_eq!(handle.dimensions(), (64, 63));
        assert_eq!(handle.name(), "sheet.png");
    }
}
