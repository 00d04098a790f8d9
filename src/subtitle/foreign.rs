//! Reader for foreign timed-caption files (WebVTT, and SRT which shares the cue layout).

use std::sync::LazyLock;

use regex::Regex;

use crate::subtitle::align::join_text;
use crate::subtitle::cue::RawCue;

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{2})[.,](\d{1,3})$").expect("valid timestamp regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Parse `HH:MM:SS.mmm`, `MM:SS.mmm` or the SRT comma form into seconds.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let caps = TIMESTAMP_REGEX.captures(s.trim())?;
    let hours: f64 = caps.get(1).map_or(Some(0.0), |m| m.as_str().parse().ok())?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let frac = &caps[4];
    let millis: f64 = format!("{frac:0<3}").parse().ok()?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let (left, right) = line.split_once("-->")?;
    // VTT allows cue settings after the end timestamp.
    let end_token = right.split_whitespace().next()?;
    let start = parse_timestamp(left)?;
    let end = parse_timestamp(end_token)?;
    Some((start, end))
}

/// Reconstruct cues from VTT/SRT content. Malformed blocks are skipped.
pub(crate) fn parse_timed_captions(content: &str) -> Vec<RawCue> {
    let normalized = content.replace("\r\n", "\n");
    let mut out = Vec::new();
    let mut lines = normalized.lines().peekable();

    while let Some(line) = lines.next() {
        if !line.contains("-->") {
            continue;
        }
        let Some((start, end)) = parse_timing_line(line) else {
            tracing::warn!(line, "skipping caption block with unreadable timing");
            continue;
        };

        let mut text = String::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() || next.contains("-->") {
                break;
            }
            let cleaned = TAG_REGEX.replace_all(next, "");
            let cleaned = cleaned.trim();
            if !cleaned.is_empty() {
                text = if text.is_empty() {
                    cleaned.to_string()
                } else {
                    join_text(&text, cleaned)
                };
            }
            lines.next();
        }

        if text.is_empty() || end <= start {
            continue;
        }
        out.push(RawCue::new(start, end, text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_in_all_supported_forms() {
        assert_eq!(parse_timestamp("00:00:01.500"), Some(1.5));
        assert_eq!(parse_timestamp("01:02:03,004"), Some(3723.004));
        assert_eq!(parse_timestamp("02:03.5"), Some(123.5));
        assert_eq!(parse_timestamp("00:61:00.000"), None);
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn parses_vtt_with_header_ids_settings_and_tags() {
        let vtt = "WEBVTT\r\n\r\nNOTE generated\r\n\r\n1\r\n00:00:00.100 --> 00:00:02.500 align:start\r\n<v Narrator>大家好</v>\r\n今天分享\r\n\r\n00:00:02.600 --> 00:00:04.000\r\nHello\r\nworld\r\n";
        let cues = parse_timed_captions(vtt);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0], RawCue::new(0.1, 2.5, "大家好今天分享"));
        assert_eq!(cues[1], RawCue::new(2.6, 4.0, "Hello world"));
    }

    #[test]
    fn parses_srt_and_skips_broken_blocks() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\n第一句\n\n2\n00:00:xx --> 00:00:02,000\n坏的\n\n3\n00:00:02,000 --> 00:00:03,000\n第三句\n";
        let cues = parse_timed_captions(srt);
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["第一句", "第三句"]);
    }

    #[test]
    fn empty_content_yields_no_cues() {
        assert!(parse_timed_captions("WEBVTT\n\n").is_empty());
        assert!(parse_timed_captions("").is_empty());
    }
}
