//! Aspect ratio derivation from `ffprobe -show_streams` JSON.
//!
//! Precedence:
//! 1. the first video stream (the first stream if none is marked as video);
//! 2. its `display_aspect_ratio` when present and well-formed, otherwise
//!    `width`/`height`;
//! 3. a rotation of 90 or 270 degrees (from `tags.rotate` or
//!    `side_data_list[].rotation`) inverts the ratio;
//! 4. the ratio is bucketed into 16:9, 9:16 or other.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tubely_core::AspectRatio;

use super::ProbeError;

/// Relative tolerance when matching a ratio to a canonical bucket.
const RATIO_TOLERANCE: f64 = 0.02;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u64>,
    #[serde(default)]
    height: Option<u64>,
    #[serde(default)]
    display_aspect_ratio: Option<String>,
    #[serde(default)]
    tags: HashMap<String, Value>,
    #[serde(default)]
    side_data_list: Vec<SideData>,
}

#[derive(Debug, Deserialize)]
struct SideData {
    #[serde(default)]
    rotation: Option<Value>,
}

impl FfprobeStream {
    /// Rotation in degrees normalised to `0..360`, 0 when absent.
    fn rotation(&self) -> i64 {
        let from_tags = self.tags.get("rotate").and_then(value_as_degrees);
        let from_side_data = self
            .side_data_list
            .iter()
            .find_map(|sd| sd.rotation.as_ref().and_then(value_as_degrees));

        from_tags.or(from_side_data).unwrap_or(0).rem_euclid(360)
    }

    /// Width over height as reported, before rotation.
    fn raw_ratio(&self) -> Result<(u64, u64), ProbeError> {
        if let Some(dar) = self.display_aspect_ratio.as_deref().and_then(parse_ratio) {
            return Ok(dar);
        }

        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(ProbeError::MissingDimensions),
        }
    }
}

fn value_as_degrees(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

/// Parse `"W:H"`; `"0:1"`, `"N/A"` and empty strings yield `None`.
fn parse_ratio(s: &str) -> Option<(u64, u64)> {
    let (w, h) = s.trim().split_once(':')?;
    let w = w.trim().parse::<u64>().ok()?;
    let h = h.trim().parse::<u64>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Bucket a width/height pair.
pub fn classify_dimensions(width: u64, height: u64) -> AspectRatio {
    if width == 0 || height == 0 {
        return AspectRatio::Other;
    }

    let ratio = width as f64 / height as f64;
    let near = |target: f64| ((ratio - target) / target).abs() <= RATIO_TOLERANCE;

    if near(16.0 / 9.0) {
        AspectRatio::Landscape
    } else if near(9.0 / 16.0) {
        AspectRatio::Portrait
    } else {
        AspectRatio::Other
    }
}

/// Derive the aspect ratio from raw `ffprobe` JSON output.
pub fn parse_ffprobe_output(output: &[u8]) -> Result<AspectRatio, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(output)?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .or_else(|| parsed.streams.first())
        .ok_or(ProbeError::NoStreams)?;

    let (w, h) = stream.raw_ratio()?;
    let (w, h) = match stream.rotation() {
        90 | 270 => (h, w),
        _ => (w, h),
    };

    Ok(classify_dimensions(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<AspectRatio, ProbeError> {
        parse_ffprobe_output(json.as_bytes())
    }

    #[test]
    fn test_display_aspect_ratio_wins() {
        let json = r#"{"streams":[{"codec_type":"video","width":1440,"height":1080,
            "display_aspect_ratio":"16:9"}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Landscape);
    }

    #[test]
    fn test_dimensions_without_display_tag() {
        let json = r#"{"streams":[{"codec_type":"video","width":1920,"height":1080}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Landscape);

        let json = r#"{"streams":[{"codec_type":"video","width":1080,"height":1920}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Portrait);
    }

    #[test]
    fn test_unusable_display_tag_falls_back_to_dimensions() {
        for dar in ["0:1", "N/A", ""] {
            let json = format!(
                r#"{{"streams":[{{"width":1920,"height":1080,"display_aspect_ratio":"{}"}}]}}"#,
                dar
            );
            assert_eq!(parse(&json).unwrap(), AspectRatio::Landscape, "dar {:?}", dar);
        }
    }

    #[test]
    fn test_rotation_in_tags() {
        let json = r#"{"streams":[{"codec_type":"video","width":1920,"height":1080,
            "tags":{"rotate":"90","language":"und"}}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Portrait);
    }

    #[test]
    fn test_rotation_in_side_data() {
        let json = r#"{"streams":[{"codec_type":"video","width":1920,"height":1080,
            "display_aspect_ratio":"16:9",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Portrait);
    }

    #[test]
    fn test_half_turn_keeps_orientation() {
        let json = r#"{"streams":[{"width":1920,"height":1080,"tags":{"rotate":"180"}}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Landscape);
    }

    #[test]
    fn test_first_video_stream_is_used() {
        let json = r#"{"streams":[
            {"codec_type":"audio","sample_rate":"48000"},
            {"codec_type":"video","width":720,"height":1280}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Portrait);
    }

    #[test]
    fn test_other_ratios() {
        let json = r#"{"streams":[{"width":1024,"height":768}]}"#;
        assert_eq!(parse(json).unwrap(), AspectRatio::Other);
        assert_eq!(classify_dimensions(1, 1), AspectRatio::Other);
        assert_eq!(classify_dimensions(0, 1080), AspectRatio::Other);
        // 854x480 is the usual rounding of 16:9 at 480p.
        assert_eq!(classify_dimensions(854, 480), AspectRatio::Landscape);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse(r#"{"streams":[]}"#), Err(ProbeError::NoStreams)));
        assert!(matches!(parse("{}"), Err(ProbeError::NoStreams)));
        assert!(matches!(
            parse(r#"{"streams":[{"codec_type":"video"}]}"#),
            Err(ProbeError::MissingDimensions)
        ));
        assert!(matches!(parse("not json"), Err(ProbeError::Parse(_))));
    }
}
