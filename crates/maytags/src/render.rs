//! Drawing tags into gray images, for synthetic scenes and printable targets.

use maytags_core::{GrayImage, Homography};
use maytags_family::TagFamily;
use nalgebra::Point2;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("family {family} has no tag id {id} ({count} codes)")]
    UnknownId {
        family: String,
        id: u32,
        count: usize,
    },
    #[error("tag placement is not invertible")]
    DegeneratePlacement,
}

/// Gray levels of one lattice cell: `Some(true)` white, `Some(false)` black,
/// `None` outside the printed area.
fn cell_is_white(family: &TagFamily, code: u64, x: i32, y: i32) -> Option<bool> {
    let origin = family.lattice_origin();
    let end = origin + family.total_width as i32;
    if x < origin || y < origin || x >= end || y >= end {
        return None;
    }
    let bits = family.bit_count();
    if let Some(i) = family
        .bit_locations
        .iter()
        .position(|l| l.x == x && l.y == y)
    {
        return Some((code >> (bits - 1 - i)) & 1 == 1);
    }
    let w = family.width_at_border as i32;
    let inside = (0..w).contains(&x) && (0..w).contains(&y);
    let on_border = inside && (x == 0 || y == 0 || x == w - 1 || y == w - 1);
    // The border ring is black for normal families; everything else printed
    // takes the opposite level.
    Some(on_border == family.reversed_border)
}

/// Paint tag `id` of `family` into `image`.
///
/// `placement` maps the canonical square `[-1, 1]^2` onto the tag's border
/// square in the image; each pixel takes the level of the cell under its center.
pub fn draw_tag(
    image: &mut GrayImage,
    family: &TagFamily,
    id: u32,
    placement: &Homography,
    white: u8,
    black: u8,
) -> Result<(), RenderError> {
    let code = *family
        .codes
        .get(id as usize)
        .ok_or_else(|| RenderError::UnknownId {
            family: family.name.to_string(),
            id,
            count: family.codes.len(),
        })?;
    let inverse = placement
        .inverse()
        .ok_or(RenderError::DegeneratePlacement)?;
    let half_width = family.width_at_border as f64 / 2.0;

    for y in 0..image.height {
        for x in 0..image.width {
            let c = inverse.apply(Point2::new(x as f64 + 0.5, y as f64 + 0.5));
            if !c.x.is_finite() || !c.y.is_finite() {
                continue;
            }
            let lx = ((c.x + 1.0) * half_width).floor() as i32;
            let ly = ((c.y + 1.0) * half_width).floor() as i32;
            if let Some(is_white) = cell_is_white(family, code, lx, ly) {
                image.set(x, y, if is_white { white } else { black });
            }
        }
    }
    Ok(())
}

/// A white `width x height` canvas with one tag drawn in black and white.
pub fn render_tag(
    width: usize,
    height: usize,
    family: &TagFamily,
    id: u32,
    placement: &Homography,
) -> Result<GrayImage, RenderError> {
    let mut image = GrayImage::filled(width, height, 255);
    draw_tag(&mut image, family, id, placement, 255, 0)?;
    Ok(image)
}
