//! Raw-text analysis for imported material
//!
//! Text handed to the importer (PDF extraction output, pasted sheets) is
//! either plain lyrics or a chord sheet. Classification is by density of
//! bracketed chord tokens; chord sheets keep the original text as cifra
//! and derive a stripped letra from it.

use once_cell::sync::Lazy;
use regex::Regex;

// ChordPro-style inline chord tokens: [D], [Em7], [C#m/G]
static BRACKET_CHORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());

/// Share of non-empty lines that must carry chord tokens before the text
/// counts as a chord sheet
const CHORD_LINE_THRESHOLD: f64 = 0.15;

/// Result of classifying imported raw text
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    /// Lyric text, with chord tokens stripped when the input is a chord sheet
    pub letra: String,
    /// The original text, kept only for chord sheets
    pub cifra: Option<String>,
    pub has_cifra: bool,
}

/// Classify raw text and derive letra/cifra from it
pub fn analyze_text_content(raw: &str) -> TextAnalysis {
    let non_empty: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let chord_lines = non_empty
        .iter()
        .filter(|l| BRACKET_CHORD.is_match(l))
        .count();

    let is_chord_sheet = !non_empty.is_empty()
        && (chord_lines as f64) / (non_empty.len() as f64) > CHORD_LINE_THRESHOLD;

    if is_chord_sheet {
        TextAnalysis {
            letra: strip_chords(raw),
            cifra: Some(raw.to_string()),
            has_cifra: true,
        }
    } else {
        TextAnalysis {
            letra: raw.to_string(),
            cifra: None,
            has_cifra: false,
        }
    }
}

/// Remove bracketed chord tokens line by line, collapsing the gaps they
/// leave behind. Line structure is preserved.
fn strip_chords(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let without = BRACKET_CHORD.replace_all(line, "");
            without.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
