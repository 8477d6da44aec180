use crate::letterbox::LetterboxGeometry;
use crate::types::BoundingBox;

/// Map a box normalized against the original image onto the letterboxed canvas.
///
/// The result is normalized against `geometry.target_size` and every field is
/// clamped to [0, 1] on its own. Boxes are never rejected for leaving the frame.
pub fn remap_box(
    bbox: &BoundingBox,
    orig_width: u32,
    orig_height: u32,
    geometry: &LetterboxGeometry,
) -> BoundingBox {
    let placed = place_box(bbox, orig_width, orig_height, geometry);
    let target = geometry.target_size as f64;

    BoundingBox::new(
        bbox.label_id,
        clip(placed[0] / target),
        clip(placed[1] / target),
        clip(placed[2] / target),
        clip(placed[3] / target),
    )
}

/// Box center and extent in canvas pixels, before normalization and clipping
pub fn place_box(
    bbox: &BoundingBox,
    orig_width: u32,
    orig_height: u32,
    geometry: &LetterboxGeometry,
) -> [f64; 4] {
    let (scale_x, scale_y) = geometry.axis_scales(orig_width, orig_height);
    let (w, h) = (orig_width as f64, orig_height as f64);

    let abs_x_center = bbox.x_center * w;
    let abs_y_center = bbox.y_center * h;
    let abs_width = bbox.width * w;
    let abs_height = bbox.height * h;

    // pad offsets move the center only
    [
        abs_x_center * scale_x + geometry.pad_x as f64,
        abs_y_center * scale_y + geometry.pad_y as f64,
        abs_width * scale_x,
        abs_height * scale_y,
    ]
}

fn clip(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
