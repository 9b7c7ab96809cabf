//! Bounding-box overlay rendering for the live preview.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::camera::Frame;

use super::Detection;

const BOX_COLOR: Rgba<u8> = Rgba([76, 175, 80, 255]);
const BOX_THICKNESS: u32 = 2;

/// Decode a frame, draw one rectangle per detection, re-encode. Boxes
/// that fall entirely outside the frame are dropped; partial boxes are
/// clamped to the image bounds.
pub fn render_overlay(frame: &Frame, detections: &[Detection]) -> Result<Frame> {
    let decoded = image::load_from_memory_with_format(&frame.bytes, ImageFormat::Jpeg)
        .context("failed to decode frame for overlay")?;
    let mut canvas = decoded.to_rgba8();

    for detection in detections {
        if let Some(bbox_px) = clamp_box(detection, canvas.dimensions()) {
            draw_rect(&mut canvas, bbox_px, BOX_COLOR, BOX_THICKNESS);
        }
    }

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .context("failed to encode overlay frame")?;

    Ok(Frame {
        bytes,
        width: frame.width,
        height: frame.height,
    })
}

/// Convert a detection box into clamped pixel corners `[x0, y0, x1, y1]`.
fn clamp_box(detection: &Detection, dims: (u32, u32)) -> Option<[u32; 4]> {
    let (w, h) = dims;
    let bbox = detection.bounding_box;
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return None;
    }

    let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min((max.saturating_sub(1)) as f32) as u32 };
    let x0 = clamp(bbox.x, w);
    let y0 = clamp(bbox.y, h);
    let x1 = clamp(bbox.x + bbox.width, w);
    let y1 = clamp(bbox.y + bbox.height, h);

    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some([x0, y0, x1, y1])
}

fn draw_rect(img: &mut RgbaImage, bbox_px: [u32; 4], color: Rgba<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1.min(w - 1) {
            img.put_pixel(x, yy0, color);
            if yy1 < h {
                img.put_pixel(x, yy1, color);
            }
        }
        for y in yy0..=yy1.min(h - 1) {
            img.put_pixel(xx0, y, color);
            if xx1 < w {
                img.put_pixel(xx1, y, color);
            }
        }
    }
}
