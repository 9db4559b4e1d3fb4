//! Timed lyric structures and LRC parsing
//!
//! Karaoke material is stored as a JSON array of time-aligned lines.
//! Two alignment levels exist: line-aligned (`time` + `text`) and
//! word-aligned (`words` carries per-word timing). The stored wire names
//! (`startTime`, `endTime`) predate this crate and must not change.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

/// One word of a word-aligned karaoke line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricWord {
    pub text: String,
    /// Word start in seconds from the start of the audio
    #[serde(rename = "startTime")]
    pub start_time: f64,
    /// Word end in seconds from the start of the audio
    #[serde(rename = "endTime")]
    pub end_time: f64,
}

/// One time-aligned lyric line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Line start in seconds from the start of the audio
    pub time: f64,
    pub text: String,
    /// Per-word timing, present only for word-aligned material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<LyricWord>>,
}

/// Parse a stored karaoke lyric blob.
///
/// Blobs were written by several app generations; anything that does not
/// deserialize cleanly is treated as "no karaoke lyrics" rather than an
/// error, so one corrupt row cannot break library listing.
pub fn parse_lyrics_blob(raw: &str) -> Option<Vec<LyricLine>> {
    match serde_json::from_str::<Vec<LyricLine>>(raw) {
        Ok(lines) => Some(lines),
        Err(e) => {
            warn!("Ignoring unparseable karaoke lyric blob: {}", e);
            None
        }
    }
}

/// Serialize timed lyrics into the stored JSON form
pub fn serialize_lyrics(lines: &[LyricLine]) -> Result<String> {
    Ok(serde_json::to_string(lines)?)
}

/// Concatenated line text with single-space separators.
///
/// This is the comparable text used for duplicate-signature matching.
pub fn plain_text(lines: &[LyricLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// Matches "[mm:ss.xx]text" and "[mm:ss.xxx]text" timestamp lines
static LRC_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[(\d{2}):(\d{2})\.(\d{2,3})\](.*)$").unwrap());

/// Parse LRC text into line-aligned lyrics.
///
/// Lines without a leading timestamp (headers, blank lines, garbage) are
/// skipped. The fractional part is centiseconds when two digits,
/// milliseconds when three.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in text.lines() {
        if let Some(caps) = LRC_TIMESTAMP.captures(raw) {
            let minutes: f64 = caps[1].parse().unwrap_or(0.0);
            let seconds: f64 = caps[2].parse().unwrap_or(0.0);
            let frac = &caps[3];
            let frac_value: f64 = frac.parse().unwrap_or(0.0);
            let frac_seconds = if frac.len() == 2 {
                frac_value / 100.0
            } else {
                frac_value / 1000.0
            };

            lines.push(LyricLine {
                time: minutes * 60.0 + seconds + frac_seconds,
                text: caps[4].trim().to_string(),
                words: None,
            });
        }
    }

    lines
}

/// Render line-aligned lyrics as LRC text ("[mm:ss.xx]" form)
pub fn lyrics_to_lrc(lines: &[LyricLine]) -> String {
    let mut out = String::new();

    for line in lines {
        let total_centis = (line.time * 100.0).round().max(0.0) as i64;
        let minutes = total_centis / 6000;
        let seconds = (total_centis % 6000) / 100;
        let centis = total_centis % 100;
        out.push_str(&format!(
            "[{:02}:{:02}.{:02}]{}\n",
            minutes, seconds, centis, line.text
        ));
    }

    out
}
