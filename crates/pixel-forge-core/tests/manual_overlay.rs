use image::{Rgb, Rgba, RgbaImage};
use pixel_forge_core::config::PipelineConfig;
use pixel_forge_core::overlay::{ManualEdits, PixelEdit};
use pixel_forge_core::pipeline::pixelate;

fn half_transparent(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        if x < w / 2 {
            Rgba([(x * 20) as u8, 200, (y * 20) as u8, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[test]
fn edits_survive_extreme_settings() {
    let cfg = PipelineConfig::builder()
        .target_width(8)
        .preset("gameboy")
        .brightness(50.0)
        .contrast(50.0)
        .saturation(-100.0)
        .noise(0.5)
        .dither(true, 1.0)
        .cleanup(2)
        .roughness(0.5)
        .outline(Rgb([255, 0, 255]))
        .seed(5)
        .build();

    let mut edits = ManualEdits::new();
    edits.paint(0, 0, Rgba([1, 2, 3, 4]));
    edits.paint(2, 3, Rgba([250, 10, 10, 255]));
    edits.paint(7, 7, Rgba([9, 9, 9, 9]));
    edits.paint(100, 100, Rgba([255, 255, 255, 255]));

    let out = pixelate(&half_transparent(8, 8), &cfg, &edits).unwrap();
    assert_eq!(*out.image.get_pixel(0, 0), Rgba([1, 2, 3, 4]));
    assert_eq!(*out.image.get_pixel(2, 3), Rgba([250, 10, 10, 255]));
    assert_eq!(*out.image.get_pixel(7, 7), Rgba([9, 9, 9, 9]));
    assert_eq!(out.stats.edits_applied, 3);
}

#[test]
fn erased_pixel_stays_clear_next_to_outline() {
    let cfg = PipelineConfig::builder()
        .target_width(8)
        .keep_colors()
        .outline(Rgb([0, 0, 0]))
        .build();
    let mut edits = ManualEdits::new();
    edits.paint(4, 0, Rgba([0, 0, 0, 0]));

    let out = pixelate(&half_transparent(8, 8), &cfg, &edits).unwrap();
    assert_eq!(*out.image.get_pixel(4, 0), Rgba([0, 0, 0, 0]));
    assert_eq!(*out.image.get_pixel(4, 1), Rgba([0, 0, 0, 255]));
    assert_eq!(out.image.get_pixel(5, 1)[3], 0);
}

#[test]
fn painted_pixel_can_be_outlined() {
    let cfg = PipelineConfig::builder()
        .target_width(8)
        .keep_colors()
        .outline(Rgb([0, 0, 255]))
        .build();
    let mut edits = ManualEdits::new();
    edits.paint(6, 4, Rgba([255, 255, 255, 255]));

    let out = pixelate(&half_transparent(8, 8), &cfg, &edits).unwrap();
    assert_eq!(*out.image.get_pixel(6, 4), Rgba([255, 255, 255, 255]));
    assert_eq!(*out.image.get_pixel(7, 4), Rgba([0, 0, 255, 255]));
    assert_eq!(*out.image.get_pixel(6, 3), Rgba([0, 0, 255, 255]));
}

#[test]
fn edit_map_operations() {
    let mut edits = ManualEdits::new();
    assert!(edits.is_empty());
    edits.paint(3, 1, Rgba([1, 1, 1, 255]));
    edits.paint(3, 1, Rgba([2, 2, 2, 255]));
    edits.paint(0, 5, Rgba([3, 3, 3, 255]));
    assert_eq!(edits.len(), 2);
    assert_eq!(edits.get(3, 1), Some(Rgba([2, 2, 2, 255])));
    assert!(edits.erase(3, 1));
    assert!(!edits.erase(3, 1));
    assert_eq!(edits.get(3, 1), None);
    edits.clear();
    assert!(edits.is_empty());
}

#[test]
fn edits_serialize_as_a_list() {
    let mut edits = ManualEdits::new();
    edits.paint(2, 0, Rgba([10, 20, 30, 255]));
    edits.paint(1, 4, Rgba([0, 0, 0, 0]));
    let json = serde_json::to_string(&edits).unwrap();
    let list: Vec<PixelEdit> = serde_json::from_str(&json).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!((list[0].x, list[0].y), (1, 4));
    let back: ManualEdits = serde_json::from_str(&json).unwrap();
    assert_eq!(back, edits);
}
