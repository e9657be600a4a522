use image::{Rgba, RgbaImage};
use pixel_forge_core::atlas::TextureAtlas;
use pixel_forge_core::compositing::{GUIDE_COLOR, blend_over};
use pixel_forge_core::config::{AtlasConfig, coerce_dimension, coerce_offset};
use pixel_forge_core::export::{decode_image, encode_png, to_layout_json};
use pixel_forge_core::packer::grid::{placement_from_pointer, snap};
use pixel_forge_core::PixelForgeError;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn grid_cfg(padding: u32) -> AtlasConfig {
    AtlasConfig::builder()
        .with_canvas(128, 128)
        .with_tile(16, 16)
        .padding(padding)
        .use_grid(true)
        .build()
}

#[test]
fn pointer_snaps_to_tile_plus_padding() {
    let cfg = grid_cfg(2);
    assert_eq!(cfg.cell_size(), (18, 18));
    assert_eq!(placement_from_pointer(33.0, 40.0, &cfg), (36, 36));
    assert_eq!(placement_from_pointer(0.0, 0.0, &cfg), (0, 0));
    assert_eq!(placement_from_pointer(-50.0, 30.0, &cfg), (0, 36));
    assert_eq!(placement_from_pointer(f64::NAN, 29.0, &cfg), (0, 36));
    assert_eq!(snap(27.0, 18), 36.0);
    assert_eq!(snap(26.9, 18), 18.0);
}

#[test]
fn pointer_without_grid_only_removes_padding() {
    let cfg = AtlasConfig {
        use_grid: false,
        ..grid_cfg(3)
    };
    assert_eq!(placement_from_pointer(33.4, 40.6, &cfg), (30, 38));
    assert_eq!(placement_from_pointer(1.0, 2.0, &cfg), (0, 0));
}

#[test]
fn place_at_pointer_moves_texture() {
    let mut atlas = TextureAtlas::new(grid_cfg(2));
    let id = atlas.add_texture("a", RgbaImage::from_pixel(4, 4, RED));
    assert_eq!(atlas.place_at_pointer(id, 33.0, 40.0).unwrap(), (36, 36));
    let t = atlas.get(id).unwrap();
    assert_eq!((t.x, t.y), (36, 36));
    assert!(matches!(
        atlas.place_at_pointer(999, 0.0, 0.0),
        Err(PixelForgeError::UnknownTexture(999))
    ));
}

#[test]
fn numeric_inputs_are_coerced() {
    assert_eq!(coerce_dimension(f64::NAN, 7), 7);
    assert_eq!(coerce_dimension(-3.0, 7), 1);
    assert_eq!(coerce_dimension(12.9, 7), 12);
    assert_eq!(coerce_offset(-1.0, 4), 0);
    assert_eq!(coerce_offset(f64::INFINITY, 4), 4);

    let mut atlas = TextureAtlas::new(AtlasConfig::default());
    let id = atlas.add_texture("a", RgbaImage::new(1, 1));
    atlas.set_position(id, -5, 9).unwrap();
    let t = atlas.get(id).unwrap();
    assert_eq!((t.x, t.y), (0, 9));

    let zero = AtlasConfig {
        width: 0,
        tile_height: 0,
        ..Default::default()
    };
    assert!(zero.validate().is_err());
    let atlas = TextureAtlas::new(zero);
    assert_eq!(atlas.config().width, 1);
    assert_eq!(atlas.config().tile_height, 1);
}

#[test]
fn compose_offsets_by_padding() {
    let cfg = AtlasConfig {
        padding: 3,
        ..grid_cfg(3)
    };
    let mut atlas = TextureAtlas::new(cfg);
    let id = atlas.add_texture("red", RgbaImage::from_pixel(2, 2, RED));
    atlas.set_position(id, 10, 0).unwrap();
    let out = atlas.compose();
    assert_eq!(out.dimensions(), (128, 128));
    assert_eq!(*out.get_pixel(13, 3), RED);
    assert_eq!(*out.get_pixel(14, 4), RED);
    assert_eq!(*out.get_pixel(12, 3), CLEAR);
    assert_eq!(*out.get_pixel(13, 2), CLEAR);
    assert_eq!(*out.get_pixel(0, 0), CLEAR);
}

#[test]
fn later_textures_draw_on_top() {
    let mut atlas = TextureAtlas::new(grid_cfg(0));
    atlas.add_texture("under", RgbaImage::from_pixel(4, 4, RED));
    let mut over = RgbaImage::from_pixel(4, 4, BLUE);
    over.put_pixel(0, 0, CLEAR);
    atlas.add_texture("over", over);
    let out = atlas.compose();
    assert_eq!(*out.get_pixel(1, 1), BLUE);
    assert_eq!(*out.get_pixel(0, 0), RED);
}

#[test]
fn translucent_pixels_blend_source_over() {
    let half_blue = Rgba([0, 0, 255, 128]);
    let mixed = blend_over(RED, half_blue);
    assert_eq!(mixed[3], 255);
    assert!((126..=128).contains(&mixed[0]));
    assert!((127..=129).contains(&mixed[2]));
    assert_eq!(blend_over(CLEAR, half_blue), half_blue);
}

#[test]
fn clipped_at_canvas_edge() {
    let mut atlas = TextureAtlas::new(AtlasConfig {
        width: 8,
        height: 8,
        use_grid: false,
        ..Default::default()
    });
    let id = atlas.add_texture("wide", RgbaImage::from_pixel(6, 6, RED));
    atlas.set_position(id, 5, 5).unwrap();
    let out = atlas.compose();
    assert_eq!(out.dimensions(), (8, 8));
    assert_eq!(*out.get_pixel(7, 7), RED);
    assert_eq!(atlas.overflowing(), vec![id]);
}

#[test]
fn preview_shows_guides_but_export_does_not() {
    let atlas = TextureAtlas::new(grid_cfg(2));
    let export = atlas.compose();
    assert!(export.pixels().all(|p| *p == CLEAR));

    let preview = atlas.compose_preview();
    // vertical guide at x = padding, away from any horizontal line
    assert_eq!(*preview.get_pixel(2, 5), GUIDE_COLOR);
    assert_eq!(*preview.get_pixel(20, 5), GUIDE_COLOR);
    assert_eq!(*preview.get_pixel(5, 5), CLEAR);

    let no_grid = TextureAtlas::new(AtlasConfig {
        use_grid: false,
        ..grid_cfg(2)
    });
    assert!(no_grid.compose_preview().pixels().all(|p| *p == CLEAR));
}

#[test]
fn png_roundtrip_is_lossless() {
    let img = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 80, 7, (x * 50) as u8]));
    let bytes = encode_png(&img).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    assert_eq!(decode_image(&bytes).unwrap(), img);
    assert!(decode_image(b"not an image").is_err());
}

#[test]
fn layout_json_reports_drawn_frames() {
    let mut atlas = TextureAtlas::new(grid_cfg(2));
    let id = atlas.add_texture("hero", RgbaImage::new(10, 12));
    atlas.set_position(id, 18, 36).unwrap();
    let v = to_layout_json(&atlas);
    assert_eq!(v["frames"][0]["name"], "hero");
    assert_eq!(v["frames"][0]["frame"]["x"], 20);
    assert_eq!(v["frames"][0]["frame"]["y"], 38);
    assert_eq!(v["frames"][0]["frame"]["w"], 10);
    assert_eq!(v["meta"]["size"]["w"], 128);
    assert_eq!(v["meta"]["padding"], 2);
}

#[test]
fn stats_track_occupancy() {
    let mut atlas = TextureAtlas::new(AtlasConfig {
        width: 10,
        height: 10,
        ..Default::default()
    });
    atlas.add_texture("a", RgbaImage::new(5, 5));
    atlas.add_texture("b", RgbaImage::new(5, 5));
    let s = atlas.stats();
    assert_eq!(s.num_textures, 2);
    assert_eq!(s.used_area, 50);
    assert!((s.occupancy - 0.5).abs() < 1e-9);
    assert_eq!(s.wasted_area(), 50);
}

#[test]
fn ids_are_never_reused() {
    let mut atlas = TextureAtlas::default();
    let a = atlas.add_texture("a", RgbaImage::new(1, 1));
    let b = atlas.add_texture("b", RgbaImage::new(1, 1));
    assert_eq!((a, b), (1, 2));
    assert_eq!(atlas.remove(a).unwrap().name, "a");
    assert!(atlas.remove(a).is_none());
    let c = atlas.add_texture("c", RgbaImage::new(1, 1));
    assert_eq!(c, 3);
    atlas.clear();
    assert!(atlas.is_empty());
}

#[test]
fn shrinking_config_keeps_content_visible() {
    let mut atlas = TextureAtlas::new(AtlasConfig::default());
    let id = atlas.add_texture("a", RgbaImage::new(20, 10));
    atlas.set_position(id, 100, 50).unwrap();
    atlas.set_config(AtlasConfig {
        width: 64,
        height: 64,
        padding: 1,
        ..Default::default()
    });
    assert_eq!(atlas.config().width, 121);
    assert_eq!(atlas.config().height, 64);
}

#[test]
fn far_placements_saturate_instead_of_overflowing() {
    let mut atlas = TextureAtlas::new(grid_cfg(4));
    let id = atlas.add_texture("far", RgbaImage::from_pixel(2, 2, RED));
    atlas.set_position(id, i64::MAX, u32::MAX as i64 - 1).unwrap();
    let t = atlas.get(id).unwrap();
    assert_eq!((t.x, t.y), (u32::MAX, u32::MAX - 1));
    assert_eq!(t.drawn_origin(4), (u32::MAX, u32::MAX));

    let v = to_layout_json(&atlas);
    assert_eq!(v["frames"][0]["frame"]["x"], u32::MAX);
    assert_eq!(v["frames"][0]["frame"]["y"], u32::MAX);
    assert!(atlas.compose().pixels().all(|p| *p == CLEAR));
    assert_eq!(atlas.overflowing(), vec![id]);
}
