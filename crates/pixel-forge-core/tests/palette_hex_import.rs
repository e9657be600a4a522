use image::Rgb;
use pixel_forge_core::PixelForgeError;
use pixel_forge_core::color::{parse_hex, to_hex};
use pixel_forge_core::palette::{Palette, export_palette_json, export_palette_text, import_palette};

#[test]
fn parse_hex_forms() {
    assert_eq!(parse_hex("#fff"), Some(Rgb([255, 255, 255])));
    assert_eq!(parse_hex("#1A2b3C"), Some(Rgb([0x1a, 0x2b, 0x3c])));
    assert_eq!(parse_hex("abc"), Some(Rgb([0xaa, 0xbb, 0xcc])));
    assert_eq!(parse_hex("#12345"), None);
    assert_eq!(parse_hex("#ggg"), None);
    assert_eq!(to_hex(Rgb([0xab, 0x01, 0xff])), "#ab01ff");
}

#[test]
fn import_extracts_tokens_in_order_without_duplicates() {
    let text = "Colors: #FFF, #102030 and #ffffff again, plus #abc.\n#FFFF is not a colour";
    let pal = import_palette("mine", text).unwrap();
    assert_eq!(pal.name, "mine");
    assert_eq!(
        pal.colors,
        vec![
            Rgb([255, 255, 255]),
            Rgb([0x10, 0x20, 0x30]),
            Rgb([0xaa, 0xbb, 0xcc]),
        ]
    );
}

#[test]
fn import_accepts_gpl_style_lists() {
    let text = "GIMP Palette\nName: test\n# comment line\n#000000\n#7f7f7f\n#ff0000\n";
    let pal = import_palette("gpl", text).unwrap();
    assert_eq!(pal.len(), 3);
    assert_eq!(pal.colors[2], Rgb([255, 0, 0]));
}

#[test]
fn import_without_tokens_fails() {
    for text in ["", "no colours here", "#12 #zzzzzz"] {
        match import_palette("x", text) {
            Err(PixelForgeError::PaletteImport(_)) => {}
            other => panic!("expected PaletteImport for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn json_export_reimports() {
    let pal = Palette::new("duo", vec![Rgb([1, 2, 3]), Rgb([250, 128, 0])]);
    let json = export_palette_json(&pal).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["name"], "duo");
    assert_eq!(v["colors"][1], "#fa8000");

    let back: Palette = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pal);
}

#[test]
fn json_with_bad_colour_is_rejected() {
    let err = serde_json::from_str::<Palette>(r##"{"name":"bad","colors":["#123456","nope"]}"##);
    assert!(err.is_err());
    let empty = serde_json::from_str::<Palette>(r#"{"name":"empty","colors":[]}"#);
    assert!(empty.is_err());
}

#[test]
fn text_export_is_one_hex_per_line() {
    let pal = Palette::new("duo", vec![Rgb([0, 0, 0]), Rgb([255, 255, 255])]);
    let text = export_palette_text(&pal);
    assert_eq!(text, "#000000\n#ffffff\n");
    assert_eq!(import_palette("duo", &text).unwrap(), pal);
}
