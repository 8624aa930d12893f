use serde::Serialize;

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const MARGIN_MM: f64 = 10.0;

const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Where one captured image sits on its page, in millimetres from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub image_width: u32,
    pub image_height: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale an image into the margin-inset content box of an A4 page, keeping
/// its aspect ratio and centering it on both axes.
pub fn place(image_width: u32, image_height: u32) -> Placement {
    let content_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let content_height = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;
    let aspect = image_width.max(1) as f64 / image_height.max(1) as f64;

    let mut width = content_width;
    let mut height = content_width / aspect;
    if height > content_height {
        height = content_height;
        width = content_height * aspect;
    }

    Placement {
        image_width,
        image_height,
        x: MARGIN_MM + (content_width - width) / 2.0,
        y: MARGIN_MM + (content_height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn a4_capture_is_limited_by_height() {
        let p = place(1588, 2246);
        assert!(close(p.height, 277.0));
        assert!(close(p.width, 277.0 * 1588.0 / 2246.0));
        assert!(close(p.y, 10.0));
        assert!(close(p.x, (210.0 - p.width) / 2.0));
        assert!(p.width <= 190.0);
    }

    #[test]
    fn wide_image_is_limited_by_width_and_centered_vertically() {
        let p = place(2000, 1000);
        assert!(close(p.width, 190.0));
        assert!(close(p.height, 95.0));
        assert!(close(p.x, 10.0));
        assert!(close(p.y, 10.0 + (277.0 - 95.0) / 2.0));
    }

    #[test]
    fn placement_is_deterministic() {
        assert_eq!(place(1588, 2246), place(1588, 2246));
    }

    #[test]
    fn converts_to_points() {
        assert!(close(mm_to_pt(25.4), 72.0));
        assert!((mm_to_pt(210.0) - 595.2756).abs() < 1e-3);
    }
}
