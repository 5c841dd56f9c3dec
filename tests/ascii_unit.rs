//! Unit tests for the ASCII conversion module.
//!
//! These tests verify:
//! - Glyph lookup totality and monotonicity for every ramp
//! - Display geometry clamping
//! - Frame composition layout

use asciiplay::ascii::*;
use asciiplay::media::{FrameRead, FrameReader, FrameSource};
use std::io::Cursor;

const ALL_CHARSETS: [CharSet; 3] = [CharSet::Standard, CharSet::Blocks, CharSet::Minimal];

// ==================== Glyph Lookup Tests ====================

#[test]
fn test_lut_is_total_for_every_byte() {
    for charset in ALL_CHARSETS {
        for invert in [false, true] {
            let lut = GlyphLut::from_charset(charset, invert);
            for value in 0..=255u8 {
                assert!(lut.ramp().contains(&lut.glyph(value)));
                assert!(lut.position(value) < lut.ramp().len());
            }
        }
    }
}

#[test]
fn test_lut_is_monotonic() {
    for charset in ALL_CHARSETS {
        let lut = GlyphLut::from_charset(charset, false);
        for value in 1..=255u8 {
            assert!(
                lut.position(value - 1) <= lut.position(value),
                "{} not monotonic at {}",
                charset.name(),
                value
            );
        }
    }
}

#[test]
fn test_lut_endpoints() {
    for charset in ALL_CHARSETS {
        let chars = charset.chars();
        let lut = GlyphLut::from_charset(charset, false);
        assert_eq!(lut.glyph(0), chars[0]);
        assert_eq!(lut.glyph(255), chars[chars.len() - 1]);

        let inverted = GlyphLut::from_charset(charset, true);
        assert_eq!(inverted.glyph(0), chars[chars.len() - 1]);
        assert_eq!(inverted.glyph(255), chars[0]);
    }
}

#[test]
fn test_standard_ramp_buckets() {
    // 10 levels: each covers 25 or 26 intensity values.
    let lut = GlyphLut::from_charset(CharSet::Standard, false);
    assert_eq!(lut.glyph(25), ' ');
    assert_eq!(lut.glyph(26), '.');
    assert_eq!(lut.glyph(128), '+');
    assert_eq!(lut.glyph(230), '%');
    assert_eq!(lut.glyph(231), '@');
}

#[test]
fn test_custom_ramp_uses_every_glyph() {
    let lut = GlyphLut::new(&['a', 'b', 'c']).unwrap();
    let used: std::collections::HashSet<char> = (0..=255u8).map(|v| lut.glyph(v)).collect();
    assert_eq!(used.len(), 3);
}

#[test]
fn test_single_glyph_ramp_rejected() {
    assert!(GlyphLut::new(&['#']).is_err());
    assert!(GlyphLut::new(&[]).is_err());
}

// ==================== Geometry Tests ====================

#[test]
fn test_geometry_clamps_to_minimum() {
    let geometry = DisplayGeometry::clamped(0, 0, 20, 10);
    assert_eq!(geometry, DisplayGeometry { width: 20, height: 10 });
    assert_eq!(geometry.frame_len(), 200);
}

#[test]
fn test_geometry_keeps_larger_request() {
    let geometry = DisplayGeometry::clamped(120, 40, 20, 10);
    assert_eq!(geometry, DisplayGeometry { width: 120, height: 40 });
    assert_eq!(geometry.to_string(), "120x40");
}

#[test]
fn test_geometry_default() {
    let geometry = DisplayGeometry::default();
    assert_eq!(
        (geometry.width, geometry.height),
        (DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT)
    );
}

// ==================== Composition Tests ====================

#[test]
fn test_compose_layout() {
    let geometry = DisplayGeometry { width: 3, height: 2 };
    let mut renderer = GlyphRenderer::new(GlyphLut::new(&['.', '#']).unwrap(), geometry);
    let text = renderer.compose(&[0, 255, 0, 255, 0, 255], None).to_string();

    assert!(text.starts_with("\x1b[1;1H"));
    let body = text.trim_start_matches("\x1b[1;1H");
    assert_eq!(body, format!(".#.{}#.#", ROW_SEPARATOR));
}

#[test]
fn test_compose_reuses_buffer_between_frames() {
    let geometry = DisplayGeometry { width: 2, height: 1 };
    let mut renderer = GlyphRenderer::new(GlyphLut::new(&['.', '#']).unwrap(), geometry);
    let first = renderer.compose(&[0, 0], Some("status")).to_string();
    let second = renderer.compose(&[255, 255], None).to_string();
    assert!(first.ends_with("status"));
    assert!(second.ends_with("##"));
    assert!(!second.contains("status"));
}

// ==================== Frame Boundary Tests ====================

#[test]
fn test_short_input_is_end_of_stream() {
    for len in [0usize, 1, 199] {
        let mut reader = FrameReader::new(Cursor::new(vec![7u8; len]), 200);
        let mut buf = vec![0u8; reader.frame_len()];
        match reader.read_frame(&mut buf).unwrap() {
            FrameRead::EndOfStream { partial } => assert_eq!(partial, len),
            FrameRead::Frame => panic!("{} bytes must not yield a frame", len),
        }
    }
}

#[test]
fn test_exact_frames_then_end_of_stream() {
    let mut reader = FrameReader::new(Cursor::new(vec![1u8; 600]), 200);
    let mut buf = vec![0u8; 200];
    for _ in 0..3 {
        assert!(matches!(reader.read_frame(&mut buf).unwrap(), FrameRead::Frame));
    }
    assert!(matches!(
        reader.read_frame(&mut buf).unwrap(),
        FrameRead::EndOfStream { partial: 0 }
    ));
}
