//! Frame-boundary overlay drawn onto a copy of the sprite sheet.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::normalize::{CanonicalFrameSet, Rect};
use crate::prefs::Theme;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub outline: Rgba<u8>,
    pub fill: Rgba<u8>,
    pub highlight_outline: Rgba<u8>,
    pub highlight_fill: Rgba<u8>,
    pub label_plate: Rgba<u8>,
    pub label_text: Rgba<u8>,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                outline: Rgba([0, 122, 255, 255]),
                fill: Rgba([0, 122, 255, 28]),
                highlight_outline: Rgba([255, 59, 48, 255]),
                highlight_fill: Rgba([255, 59, 48, 72]),
                label_plate: Rgba([255, 255, 255, 200]),
                label_text: Rgba([20, 20, 20, 255]),
            },
            Theme::Dark => Self {
                outline: Rgba([100, 210, 255, 255]),
                fill: Rgba([100, 210, 255, 32]),
                highlight_outline: Rgba([255, 214, 10, 255]),
                highlight_fill: Rgba([255, 214, 10, 72]),
                label_plate: Rgba([0, 0, 0, 190]),
                label_text: Rgba([240, 240, 240, 255]),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub theme: Theme,
    pub labels: bool,
    pub highlight: Option<String>,
    pub thickness: u32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            labels: true,
            highlight: None,
            thickness: 1,
        }
    }
}

/// What happened to one frame while drawing.
#[derive(Debug, Clone, Serialize)]
pub struct FrameMark {
    pub name: String,
    pub label: String,
    pub frame: Rect,
    pub drawn: bool,
    pub clipped: bool,
    pub highlighted: bool,
}

pub fn frame_label(name: &str, rect: &Rect) -> String {
    format!("{name} ({}x{})", rect.w, rect.h)
}

pub fn render_overlay(
    sheet: &RgbaImage,
    frames: &CanonicalFrameSet,
    options: &OverlayOptions,
) -> (RgbaImage, Vec<FrameMark>) {
    let palette = Palette::for_theme(options.theme);
    let mut out = sheet.clone();
    let mut marks = Vec::with_capacity(frames.len());
    let mut highlighted_box = None;

    for (name, rect) in &frames.frames {
        let highlighted = options.highlight.as_deref() == Some(name.as_str());
        let label = frame_label(name, rect);
        let visible = rect
            .integral()
            .and_then(|geom| visible_box(geom, out.width(), out.height()));

        let mut mark = FrameMark {
            name: name.clone(),
            label: label.clone(),
            frame: rect.clone(),
            drawn: false,
            clipped: false,
            highlighted,
        };

        if let Some((bx, clipped)) = visible {
            mark.drawn = true;
            mark.clipped = clipped;
            if highlighted {
                // Drawn last so it sits above its neighbours.
                highlighted_box = Some((bx, label));
            } else {
                draw_frame(&mut out, bx, palette.outline, palette.fill, options.thickness);
                if options.labels {
                    draw_label(&mut out, bx, &label, &palette);
                }
            }
        }
        marks.push(mark);
    }

    if let Some((bx, label)) = highlighted_box {
        draw_frame(
            &mut out,
            bx,
            palette.highlight_outline,
            palette.highlight_fill,
            options.thickness.saturating_add(1),
        );
        if options.labels {
            draw_label(&mut out, bx, &label, &palette);
        }
    }

    (out, marks)
}

/// Inclusive pixel box of a frame clipped to the image, plus whether any
/// clipping happened. Empty, negative-size or fully off-sheet frames yield
/// `None`.
fn visible_box(
    (x, y, w, h): (i64, i64, i64, i64),
    img_w: u32,
    img_h: u32,
) -> Option<((u32, u32, u32, u32), bool)> {
    if w <= 0 || h <= 0 || img_w == 0 || img_h == 0 {
        return None;
    }
    let max_x = i64::from(img_w) - 1;
    let max_y = i64::from(img_h) - 1;
    let x1 = x.saturating_add(w - 1);
    let y1 = y.saturating_add(h - 1);
    if x > max_x || y > max_y || x1 < 0 || y1 < 0 {
        return None;
    }
    let cx0 = x.max(0);
    let cy0 = y.max(0);
    let cx1 = x1.min(max_x);
    let cy1 = y1.min(max_y);
    let clipped = cx0 != x || cy0 != y || cx1 != x1 || cy1 != y1;
    Some(((cx0 as u32, cy0 as u32, cx1 as u32, cy1 as u32), clipped))
}

fn draw_frame(
    img: &mut RgbaImage,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
    outline: Rgba<u8>,
    fill: Rgba<u8>,
    thickness: u32,
) {
    fill_rect_alpha(img, x0 as i32, y0 as i32, x1 as i32, y1 as i32, fill);
    draw_rect_outline(img, x0, y0, x1, y1, outline, thickness);
}

/// Outline grows inward so neighbouring frames stay distinguishable.
fn draw_rect_outline(
    img: &mut RgbaImage,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    for t in 0..thickness.max(1) {
        let tx0 = x0 + t;
        let ty0 = y0 + t;
        let Some(tx1) = x1.checked_sub(t) else { break };
        let Some(ty1) = y1.checked_sub(t) else { break };
        if tx0 > tx1 || ty0 > ty1 {
            break;
        }
        for xx in tx0..=tx1 {
            img.put_pixel(xx, ty0, color);
            img.put_pixel(xx, ty1, color);
        }
        for yy in ty0..=ty1 {
            img.put_pixel(tx0, yy, color);
            img.put_pixel(tx1, yy, color);
        }
    }
}

fn draw_label(img: &mut RgbaImage, (x0, y0, _, _): (u32, u32, u32, u32), text: &str, palette: &Palette) {
    let tx = x0 as i32 + 2;
    let ty = y0 as i32 + 2;
    let (bx0, by0, bx1, by1) = text_bbox(tx, ty, text);
    fill_rect_alpha(img, bx0 - 1, by0 - 1, bx1, by1, palette.label_plate);
    draw_bitmap_text(img, tx, ty, text, palette.label_text);
}

fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    let inv = 1.0 - a;
    let mix = |d: u8, s: u8| {
        (f64::from(d) * inv + f64::from(s) * a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let out_a = (f64::from(dst[3]) + f64::from(src[3]) * inv)
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}

fn fill_rect_alpha(img: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let last_x = img.width() as i32 - 1;
    let last_y = img.height() as i32 - 1;
    let (left, right) = (x0.min(x1).clamp(0, last_x), x0.max(x1).clamp(0, last_x));
    let (top, bottom) = (y0.min(y1).clamp(0, last_y), y0.max(y1).clamp(0, last_y));
    for y in top as u32..=bottom as u32 {
        for x in left as u32..=right as u32 {
            let blended = blend_pixel(*img.get_pixel(x, y), color);
            img.put_pixel(x, y, blended);
        }
    }
}

/// 8x8 glyphs, one pixel per font bit. Unknown characters render as `?`.
fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
    let (width, height) = (img.width() as i32, img.height() as i32);
    for (slot, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + slot as i32 * 8;
        for (dy, bits) in glyph.iter().enumerate() {
            let py = y + dy as i32;
            if !(0..height).contains(&py) {
                continue;
            }
            for dx in (0..8i32).filter(|&bit| (*bits >> bit) & 1 == 1) {
                let px = origin_x + dx;
                if (0..width).contains(&px) {
                    let blended = blend_pixel(*img.get_pixel(px as u32, py as u32), color);
                    img.put_pixel(px as u32, py as u32, blended);
                }
            }
        }
    }
}

fn text_bbox(x: i32, y: i32, text: &str) -> (i32, i32, i32, i32) {
    (x, y, x + text.chars().count() as i32 * 8, y + 8)
}
