//! Frame-schema normalizer.
//!
//! Two metadata shapes are accepted:
//!
//! - **hash-atlas** (JSON-Hash, as written by texture packers):
//!   `{"frames": {"name": {"frame": {"x", "y", "w", "h"}}}, "meta": {"size": {"w", "h"}}}`
//! - **sprite-list**:
//!   `{"sprites": [{"fileName", "x", "y", "width", "height"}], "spriteSheetWidth", "spriteSheetHeight"}`
//!
//! Both are reduced to a [`CanonicalFrameSet`]. Nothing here validates geometry:
//! negative, missing or out-of-bounds numbers are carried through as-is.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ViewerError, ViewerResult};

pub const EXPORT_FORMAT: &str = "RGBA8888";
pub const EXPORT_SCALE: &str = "1";
pub const EXPORT_FALLBACK_NAME: &str = "spritesheet_phaser.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaTag {
    HashAtlas,
    SpriteList,
}

impl SchemaTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaTag::HashAtlas => "hash-atlas",
            SchemaTag::SpriteList => "sprite-list",
        }
    }
}

impl fmt::Display for SchemaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One numeric field of a rectangle or sheet size, kept exactly as it
/// appeared in the source document. `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Measure(pub Option<Value>);

impl Measure {
    pub fn missing() -> Self {
        Measure(None)
    }

    pub fn of(value: i64) -> Self {
        Measure(Some(Value::from(value)))
    }

    fn field(obj: Option<&Map<String, Value>>, key: &str) -> Self {
        Measure(obj.and_then(|o| o.get(key)).cloned())
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_ref().and_then(Value::as_f64)
    }

    /// Integral reading of the field; `10.0` counts, `10.5` does not.
    pub fn as_i64(&self) -> Option<i64> {
        let raw = self.0.as_ref()?;
        if let Some(v) = raw.as_i64() {
            return Some(v);
        }
        let f = raw.as_f64()?;
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    }

    /// Whether this field numerically equals a pixel count.
    pub fn equals_pixels(&self, pixels: u32) -> bool {
        self.as_f64() == Some(f64::from(pixels))
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(Value::String(s)) => f.write_str(s),
            Some(v) => write!(f, "{v}"),
            None => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rect {
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub x: Measure,
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub y: Measure,
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub w: Measure,
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub h: Measure,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            x: Measure::of(x),
            y: Measure::of(y),
            w: Measure::of(w),
            h: Measure::of(h),
        }
    }

    /// Integral geometry, if every field is an integer.
    pub fn integral(&self) -> Option<(i64, i64, i64, i64)> {
        Some((
            self.x.as_i64()?,
            self.y.as_i64()?,
            self.w.as_i64()?,
            self.h.as_i64()?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetSize {
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub w: Measure,
    #[serde(skip_serializing_if = "Measure::is_missing")]
    pub h: Measure,
}

impl SheetSize {
    pub fn new(w: i64, h: i64) -> Self {
        Self {
            w: Measure::of(w),
            h: Measure::of(h),
        }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.w.equals_pixels(width) && self.h.equals_pixels(height)
    }
}

impl fmt::Display for SheetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalFrameSet {
    pub frames: IndexMap<String, Rect>,
    pub sheet_size: SheetSize,
}

impl CanonicalFrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rect> {
        self.frames.get(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportFrame {
    pub frame: Rect,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMeta {
    pub format: &'static str,
    pub size: SheetSize,
    pub scale: &'static str,
}

/// Hash-atlas shaped document written by the export path.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub frames: IndexMap<String, ExportFrame>,
    pub meta: ExportMeta,
}

fn has_key(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

/// Classify a parsed document. First match wins; anything that is not an
/// object, or lacks both key pairs, is rejected. `sprites` must be an array.
pub fn detect(raw: &Value) -> ViewerResult<SchemaTag> {
    let Some(obj) = raw.as_object() else {
        return Err(ViewerError::UnrecognizedFormat);
    };
    if has_key(obj, "frames") && has_key(obj, "meta") {
        return Ok(SchemaTag::HashAtlas);
    }
    let sprites_listed = obj.get("sprites").is_some_and(Value::is_array);
    if sprites_listed && has_key(obj, "spriteSheetWidth") {
        return Ok(SchemaTag::SpriteList);
    }
    Err(ViewerError::UnrecognizedFormat)
}

pub fn to_canonical(raw: &Value, tag: SchemaTag) -> CanonicalFrameSet {
    match tag {
        SchemaTag::HashAtlas => hash_atlas_to_canonical(raw),
        SchemaTag::SpriteList => sprite_list_to_canonical(raw),
    }
}

/// `detect` followed by `to_canonical`.
pub fn normalize(raw: &Value) -> ViewerResult<(SchemaTag, CanonicalFrameSet)> {
    let tag = detect(raw)?;
    Ok((tag, to_canonical(raw, tag)))
}

fn rect_from_frame_entry(entry: &Value) -> Rect {
    let frame = entry.get("frame").and_then(Value::as_object);
    Rect {
        x: Measure::field(frame, "x"),
        y: Measure::field(frame, "y"),
        w: Measure::field(frame, "w"),
        h: Measure::field(frame, "h"),
    }
}

fn hash_atlas_to_canonical(raw: &Value) -> CanonicalFrameSet {
    let mut frames = IndexMap::new();
    match raw.get("frames") {
        Some(Value::Object(entries)) => {
            for (name, entry) in entries {
                frames.insert(name.clone(), rect_from_frame_entry(entry));
            }
        }
        // JSON-Array flavour: each entry names itself.
        Some(Value::Array(entries)) => {
            for (idx, entry) in entries.iter().enumerate() {
                let name = entry
                    .get("filename")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| idx.to_string());
                frames.insert(name, rect_from_frame_entry(entry));
            }
        }
        _ => {}
    }

    let size = raw
        .get("meta")
        .and_then(|m| m.get("size"))
        .and_then(Value::as_object);
    CanonicalFrameSet {
        frames,
        sheet_size: SheetSize {
            w: Measure::field(size, "w"),
            h: Measure::field(size, "h"),
        },
    }
}

fn sprite_list_to_canonical(raw: &Value) -> CanonicalFrameSet {
    let mut frames = IndexMap::new();
    let sprites = raw
        .get("sprites")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for (idx, sprite) in sprites.iter().enumerate() {
        let Some(obj) = sprite.as_object() else {
            tracing::warn!(index = idx, "sprite record is not an object, skipped");
            continue;
        };
        let name = match obj.get("fileName") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                tracing::warn!(index = idx, "sprite record has no fileName, skipped");
                continue;
            }
        };
        let rect = Rect {
            x: Measure::field(Some(obj), "x"),
            y: Measure::field(Some(obj), "y"),
            w: Measure::field(Some(obj), "width"),
            h: Measure::field(Some(obj), "height"),
        };
        // IndexMap keeps the first position of a repeated key.
        frames.insert(name, rect);
    }

    let top = raw.as_object();
    CanonicalFrameSet {
        frames,
        sheet_size: SheetSize {
            w: Measure::field(top, "spriteSheetWidth"),
            h: Measure::field(top, "spriteSheetHeight"),
        },
    }
}

pub fn to_export_document(canonical: &CanonicalFrameSet) -> ExportDocument {
    let frames = canonical
        .frames
        .iter()
        .map(|(name, rect)| (name.clone(), ExportFrame { frame: rect.clone() }))
        .collect();
    ExportDocument {
        frames,
        meta: ExportMeta {
            format: EXPORT_FORMAT,
            size: canonical.sheet_size.clone(),
            scale: EXPORT_SCALE,
        },
    }
}

/// Pretty-printed (2-space) export text.
pub fn export_json_pretty(canonical: &CanonicalFrameSet) -> ViewerResult<String> {
    Ok(serde_json::to_string_pretty(&to_export_document(canonical))?)
}

pub fn export_file_name(base_name: Option<&str>) -> String {
    match base_name {
        Some(base) if !base.is_empty() => format!("{base}_phaser.json"),
        _ => EXPORT_FALLBACK_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sprite_list_doc() -> Value {
        json!({
            "sprites": [
                {"fileName": "hero.png", "x": 0, "y": 0, "width": 32, "height": 48},
                {"fileName": "coin.png", "x": 32, "y": 0, "width": 16, "height": 16},
                {"fileName": "door.png", "x": 48, "y": 0, "width": 16, "height": 32}
            ],
            "spriteSheetWidth": 64,
            "spriteSheetHeight": 48
        })
    }

    #[test]
    fn detect_classifies_both_shapes() {
        let atlas = json!({"frames": {}, "meta": {"size": {"w": 1, "h": 1}}});
        assert_eq!(detect(&atlas).unwrap(), SchemaTag::HashAtlas);
        assert_eq!(detect(&sprite_list_doc()).unwrap(), SchemaTag::SpriteList);
    }

    #[test]
    fn detect_prefers_hash_atlas_when_both_match() {
        let both = json!({
            "frames": {}, "meta": {},
            "sprites": [], "spriteSheetWidth": 10
        });
        assert_eq!(detect(&both).unwrap(), SchemaTag::HashAtlas);
    }

    #[test]
    fn detect_rejects_everything_else() {
        let inputs = [
            json!({"foo": 1}),
            json!({"frames": {}}),
            json!({"sprites": []}),
            json!({"sprites": 5, "spriteSheetWidth": 10}),
            json!({"sprites": {"a": {}}, "spriteSheetWidth": 10}),
            json!({"frames": null, "meta": {}}),
            json!([1, 2, 3]),
            json!("frames"),
            json!(null),
            json!(42),
        ];
        for input in &inputs {
            assert!(
                matches!(detect(input), Err(ViewerError::UnrecognizedFormat)),
                "expected rejection for {input}"
            );
        }
    }

    #[test]
    fn sprite_list_duplicates_keep_last_value() {
        let doc = json!({
            "sprites": [
                {"fileName": "a", "x": 0, "y": 0, "width": 10, "height": 10},
                {"fileName": "a", "x": 5, "y": 5, "width": 2, "height": 2}
            ],
            "spriteSheetWidth": 100,
            "spriteSheetHeight": 50
        });
        let canonical = to_canonical(&doc, SchemaTag::SpriteList);
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical.get("a"), Some(&Rect::new(5, 5, 2, 2)));
        assert_eq!(canonical.sheet_size, SheetSize::new(100, 50));
    }

    #[test]
    fn sprite_list_preserves_sequence_order() {
        let canonical = to_canonical(&sprite_list_doc(), SchemaTag::SpriteList);
        let names: Vec<&str> = canonical.frames.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["hero.png", "coin.png", "door.png"]);
        assert_eq!(canonical.get("coin.png"), Some(&Rect::new(32, 0, 16, 16)));
    }

    #[test]
    fn hash_atlas_copies_frames_and_size_verbatim() {
        let doc = json!({
            "frames": {
                "idle": {"frame": {"x": 0, "y": 0, "w": 24, "h": 24}, "rotated": false},
                "run": {"frame": {"x": -4, "y": 300, "w": 24, "h": 24}}
            },
            "meta": {"size": {"w": 48, "h": 24}, "app": "packer"}
        });
        let canonical = to_canonical(&doc, SchemaTag::HashAtlas);
        assert_eq!(canonical.get("idle"), Some(&Rect::new(0, 0, 24, 24)));
        // Out-of-bounds and negative values pass through untouched.
        assert_eq!(canonical.get("run"), Some(&Rect::new(-4, 300, 24, 24)));
        assert_eq!(canonical.sheet_size, SheetSize::new(48, 24));
    }

    #[test]
    fn hash_atlas_array_frames_use_filename() {
        let doc = json!({
            "frames": [
                {"filename": "player.png", "frame": {"x": 0, "y": 0, "w": 32, "h": 64}},
                {"frame": {"x": 32, "y": 0, "w": 32, "h": 32}}
            ],
            "meta": {"size": {"w": 64, "h": 64}}
        });
        let canonical = to_canonical(&doc, SchemaTag::HashAtlas);
        assert_eq!(canonical.get("player.png"), Some(&Rect::new(0, 0, 32, 64)));
        assert_eq!(canonical.get("1"), Some(&Rect::new(32, 0, 32, 32)));
    }

    #[test]
    fn missing_fields_are_carried_not_rejected() {
        let doc = json!({
            "frames": {"broken": {"frame": {"x": 1}}, "no_frame": {}},
            "meta": {}
        });
        let (tag, canonical) = normalize(&doc).unwrap();
        assert_eq!(tag, SchemaTag::HashAtlas);
        let broken = canonical.get("broken").unwrap();
        assert_eq!(broken.x, Measure::of(1));
        assert!(broken.w.is_missing());
        assert_eq!(canonical.get("no_frame"), Some(&Rect::default()));
        assert!(canonical.sheet_size.w.is_missing());
    }

    #[test]
    fn export_reproduces_sprite_list_geometry() {
        let canonical = to_canonical(&sprite_list_doc(), SchemaTag::SpriteList);
        let exported = serde_json::to_value(to_export_document(&canonical)).unwrap();
        assert_eq!(
            exported,
            json!({
                "frames": {
                    "hero.png": {"frame": {"x": 0, "y": 0, "w": 32, "h": 48}},
                    "coin.png": {"frame": {"x": 32, "y": 0, "w": 16, "h": 16}},
                    "door.png": {"frame": {"x": 48, "y": 0, "w": 16, "h": 32}}
                },
                "meta": {"format": "RGBA8888", "size": {"w": 64, "h": 48}, "scale": "1"}
            })
        );
    }

    #[test]
    fn export_omits_missing_fields() {
        let doc = json!({
            "sprites": [{"fileName": "a", "x": 3}],
            "spriteSheetWidth": 8
        });
        let canonical = to_canonical(&doc, SchemaTag::SpriteList);
        let exported = serde_json::to_value(to_export_document(&canonical)).unwrap();
        assert_eq!(exported["frames"]["a"]["frame"], json!({"x": 3}));
        assert_eq!(exported["meta"]["size"], json!({"w": 8}));
    }

    #[test]
    fn export_text_uses_two_space_indent() {
        let canonical = to_canonical(&sprite_list_doc(), SchemaTag::SpriteList);
        let text = export_json_pretty(&canonical).unwrap();
        assert!(text.starts_with("{\n  \"frames\": {\n    \"hero.png\""));
    }

    #[test]
    fn export_file_name_falls_back() {
        assert_eq!(export_file_name(Some("heroes")), "heroes_phaser.json");
        assert_eq!(export_file_name(Some("")), EXPORT_FALLBACK_NAME);
        assert_eq!(export_file_name(None), EXPORT_FALLBACK_NAME);
    }

    #[test]
    fn sheet_size_matches_integral_floats() {
        let size = SheetSize {
            w: Measure(Some(json!(64.0))),
            h: Measure::of(64),
        };
        assert!(size.matches(64, 64));
        assert!(!size.matches(64, 63));
        assert!(!SheetSize::default().matches(64, 64));
    }
}
