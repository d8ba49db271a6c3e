// Text Processing Service
// Normalization and sentence segmentation used by the evidence extractor.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Normalize punctuation and whitespace ahead of analysis.
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text.to_string();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    // Replace em dash
    s = s.replace('\u{2014}', "-");

    // Replace non-breaking space
    let space_re = Regex::new(r"\u{00A0}").unwrap();
    s = space_re.replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    // Collapse horizontal whitespace
    let ws_re = Regex::new(r"[ \t\x0C\x0B]+").unwrap();
    s = ws_re.replace_all(&s, " ").to_string();

    // Strip each line
    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceOffset {
    pub text: String,
    /// UTF-8 byte offset (0-based) into the source text.
    pub start: i32,
    /// UTF-8 byte offset (0-based, end-exclusive) into the source text.
    pub end: i32,
}

fn is_decimal_point(text: &str, dot_idx: usize) -> bool {
    let prev_digit = text[..dot_idx]
        .chars()
        .next_back()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false);
    let next_digit = text[dot_idx + 1..]
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false);
    prev_digit && next_digit
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<SentenceOffset>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    let t_start = start + lead;
    let t_end = t_start + trimmed.len();
    out.push(SentenceOffset {
        text: trimmed.to_string(),
        start: t_start as i32,
        end: t_end as i32,
    });
}

/// Split text into sentences with byte offsets into the original string.
/// Terminators are `.` `!` `?` and newlines; decimal points do not split, and
/// a closing quote/bracket directly after the terminator stays attached.
pub fn split_sentences_with_offsets(text: &str) -> Vec<SentenceOffset> {
    let mut out = Vec::new();
    if text.is_empty() {
        return out;
    }

    let mut seg_start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, ch)) = iter.next() {
        let is_end = match ch {
            '.' => !is_decimal_point(text, i),
            '!' | '?' | '\n' => true,
            _ => false,
        };
        if !is_end {
            continue;
        }

        let mut end = i + ch.len_utf8();
        if ch != '\n' {
            while let Some(&(j, c2)) = iter.peek() {
                if matches!(c2, '"' | '\'' | ')' | '\u{201d}' | '\u{2019}') {
                    iter.next();
                    end = j + c2.len_utf8();
                } else {
                    break;
                }
            }
        }

        push_trimmed(text, seg_start, end, &mut out);
        seg_start = end;
    }

    push_trimmed(text, seg_start, text.len(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        let s = "We \u{201c}may\u{201d} share\u{00A0}data.\r\n  See   terms.";
        let n = normalize_punctuation(s);
        assert_eq!(n, "We \"may\" share data.\nSee terms.");
    }

    #[test]
    fn test_split_sentences_basic() {
        let text = "We collect data. We may share it with partners! Contact us?";
        let sents = split_sentences_with_offsets(text);
        assert_eq!(sents.len(), 3);
        assert_eq!(sents[0].text, "We collect data.");
        assert_eq!(sents[1].text, "We may share it with partners!");
    }

    #[test]
    fn test_split_sentences_offsets_index_source() {
        let text = "First sentence. Second one here.";
        for s in split_sentences_with_offsets(text) {
            assert_eq!(&text[s.start as usize..s.end as usize], s.text);
        }
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        let text = "We retain data for 1.5 years. Then we delete it.";
        let sents = split_sentences_with_offsets(text);
        assert_eq!(sents.len(), 2);
        assert!(sents[0].text.contains("1.5 years"));
    }

    #[test]
    fn test_newline_splits() {
        let text = "Retention policy\nWe retain data indefinitely";
        let sents = split_sentences_with_offsets(text);
        assert_eq!(sents.len(), 2);
    }

    #[test]
    fn test_closing_quote_stays_attached() {
        let text = "They said \"we sell data.\" More text follows.";
        let sents = split_sentences_with_offsets(text);
        assert!(sents[0].text.ends_with('"'));
    }
}
