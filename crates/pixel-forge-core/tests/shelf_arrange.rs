use image::{Rgba, RgbaImage};
use pixel_forge_core::atlas::TextureAtlas;
use pixel_forge_core::config::{AtlasConfig, OverflowPolicy};
use pixel_forge_core::packer::footprint;
use pixel_forge_core::packer::shelf::ShelfPacker;
use pixel_forge_core::{PixelForgeError, Rect};

fn tex(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([200, 100, 50, 255]))
}

fn plain(w: u32, h: u32) -> AtlasConfig {
    AtlasConfig::builder()
        .with_canvas(w, h)
        .use_grid(false)
        .padding(0)
        .build()
}

fn positions(atlas: &TextureAtlas) -> Vec<(u32, u32)> {
    atlas.textures().iter().map(|t| (t.x, t.y)).collect()
}

#[test]
fn shelf_wraps_below_tallest_item() {
    let mut p = ShelfPacker::new(10, 1);
    assert_eq!(p.place(4, 3), Rect::new(0, 0, 4, 3));
    assert_eq!(p.place(4, 5), Rect::new(5, 0, 4, 5));
    // 10 + 4 > 10 -> new shelf at tallest (5) + padding
    assert_eq!(p.place(4, 2), Rect::new(0, 6, 4, 2));
    assert_eq!(p.shelves(), 2);
    assert_eq!(p.bottom(), 8);
}

#[test]
fn oversized_first_item_still_wraps() {
    let mut p = ShelfPacker::new(8, 2);
    assert_eq!(p.place(12, 3), Rect::new(0, 2, 12, 3));
    assert_eq!(p.place(4, 4), Rect::new(0, 7, 4, 4));
}

#[test]
fn exact_fill_never_overlaps_and_stays_inside() {
    let mut atlas = TextureAtlas::new(plain(64, 64));
    for i in 0..16 {
        atlas.add_texture(format!("t{i}"), tex(16, 16));
    }
    let report = atlas.auto_arrange().unwrap();
    assert_eq!(report.placed, 16);
    assert_eq!(report.shelves, 4);
    assert!(report.overflowed.is_empty());

    let rects: Vec<Rect> = atlas.textures().iter().map(|t| t.rect()).collect();
    for (i, a) in rects.iter().enumerate() {
        assert!(a.right() <= 64 && a.bottom() <= 64, "{a:?}");
        for b in &rects[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn mixed_sizes_fill_rows_in_order() {
    let mut atlas = TextureAtlas::new(plain(32, 64));
    atlas.add_texture("a", tex(16, 8));
    atlas.add_texture("b", tex(16, 16));
    atlas.add_texture("c", tex(32, 8));
    atlas.add_texture("d", tex(8, 8));
    atlas.auto_arrange().unwrap();
    assert_eq!(positions(&atlas), vec![(0, 0), (16, 0), (0, 16), (0, 24)]);
}

#[test]
fn grid_mode_rounds_footprints_up_to_tiles() {
    let cfg = AtlasConfig::builder()
        .with_canvas(64, 64)
        .with_tile(16, 16)
        .padding(2)
        .use_grid(true)
        .build();
    assert_eq!(footprint(10, 17, &cfg), (16, 32));
    assert_eq!(footprint(16, 16, &cfg), (16, 16));

    let mut atlas = TextureAtlas::new(cfg);
    for i in 0..4 {
        atlas.add_texture(format!("t{i}"), tex(10, 10));
    }
    atlas.auto_arrange().unwrap();
    assert_eq!(positions(&atlas), vec![(0, 0), (18, 0), (36, 0), (0, 18)]);
}

#[test]
fn arrange_is_idempotent() {
    let mut atlas = TextureAtlas::new(plain(40, 40));
    atlas.add_texture("a", tex(12, 7));
    atlas.add_texture("b", tex(20, 9));
    atlas.add_texture("c", tex(15, 3));
    atlas.auto_arrange().unwrap();
    let first = positions(&atlas);
    atlas.set_position(1, 30, 30).unwrap();
    atlas.auto_arrange().unwrap();
    assert_eq!(positions(&atlas), first);
}

fn three_tall(policy: OverflowPolicy) -> TextureAtlas {
    let cfg = AtlasConfig {
        overflow: policy,
        ..plain(32, 32)
    };
    let mut atlas = TextureAtlas::new(cfg);
    for i in 0..3 {
        atlas.add_texture(format!("t{i}"), tex(20, 20));
    }
    atlas
}

#[test]
fn overflow_is_reported_by_default() {
    let mut atlas = three_tall(OverflowPolicy::default());
    let report = atlas.auto_arrange().unwrap();
    assert_eq!(report.overflowed, vec![2, 3]);
    assert!(!report.grew);
    assert_eq!(positions(&atlas), vec![(0, 0), (0, 20), (0, 40)]);
    assert_eq!(atlas.config().height, 32);
    assert_eq!(atlas.overflowing(), vec![2, 3]);
    assert_eq!(atlas.stats().num_overflowing, 2);
}

#[test]
fn overflow_can_grow_the_canvas() {
    let mut atlas = three_tall(OverflowPolicy::Grow);
    let report = atlas.auto_arrange().unwrap();
    assert!(report.grew);
    assert_eq!((atlas.config().width, atlas.config().height), (32, 60));
    assert!(atlas.overflowing().is_empty());
}

#[test]
fn overflow_can_be_rejected() {
    let mut atlas = three_tall(OverflowPolicy::Reject);
    atlas.set_position(3, 5, 5).unwrap();
    match atlas.auto_arrange() {
        Err(PixelForgeError::OutOfSpace { overflowed }) => assert_eq!(overflowed, vec![2, 3]),
        other => panic!("expected OutOfSpace, got {other:?}"),
    }
    assert_eq!(positions(&atlas), vec![(0, 0), (0, 0), (5, 5)]);
}

#[test]
fn grow_never_shrinks() {
    let mut atlas = TextureAtlas::new(plain(100, 100));
    atlas.add_texture("a", tex(10, 10));
    assert!(!atlas.fit_canvas_to_content());
    assert_eq!(atlas.config().width, 100);
}
