//! Filename templates such as `{index:04}_{basename}`.
//!
//! Recognized tokens are `{index}`, `{index:NN}`, `{hue}`, `{hue:NN}` and
//! `{basename}`; `NN` zero-pads to that width. Anything else in braces is kept
//! verbatim. The original extension is always appended once, after rendering.
use std::fmt;

use crate::pipeline::services::image::analysis::NEUTRAL_HUE;

pub const DEFAULT_TEMPLATE: &str = "{index}_{basename}";

/// Widest zero padding a token may ask for
pub const MAX_PAD_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Index { width: Option<usize> },
    Hue { width: Option<usize> },
    Basename,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                // unterminated brace, keep the remainder as text
                literal.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let token = &after[..close];
            match parse_token(token) {
                Some(segment) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                None => {
                    literal.push('{');
                    literal.push_str(token);
                    literal.push('}');
                }
            }
            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render a name for the record at 1-based `index`.
    pub fn render(&self, index: usize, hue: Option<f64>, original_name: &str) -> String {
        let (basename, extension) = split_extension(original_name);
        let mut name = String::with_capacity(original_name.len() + 8);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Index { width } => push_padded(&mut name, index as i64, *width),
                Segment::Hue { width } => {
                    let hue = hue.unwrap_or(NEUTRAL_HUE).round() as i64;
                    push_padded(&mut name, hue, *width);
                }
                Segment::Basename => name.push_str(basename),
            }
        }

        name.push_str(extension);
        name
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE)
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_token(token: &str) -> Option<Segment> {
    let (name, width) = match token.split_once(':') {
        Some((name, digits)) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let width: usize = digits.parse().ok()?;
            if width > MAX_PAD_WIDTH {
                return None;
            }
            (name, Some(width))
        }
        None => (token, None),
    };

    match (name, width) {
        ("index", width) => Some(Segment::Index { width }),
        ("hue", width) => Some(Segment::Hue { width }),
        ("basename", None) => Some(Segment::Basename),
        _ => None,
    }
}

fn push_padded(out: &mut String, value: i64, width: Option<usize>) {
    match width {
        Some(width) => out.push_str(&format!("{:0width$}", value, width = width)),
        None => out.push_str(&value.to_string()),
    }
}

/// Split `name` into base name and extension (with its dot).
///
/// A name without a dot, or whose only dot is the first character, has no
/// extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_index_keeps_original_extension() {
        let template = FilenameTemplate::parse("{index:04}_{basename}");
        assert_eq!(template.render(2, Some(10.0), "photo.JPG"), "0002_photo.JPG");
    }

    #[test]
    fn default_template() {
        let template = FilenameTemplate::default();
        assert_eq!(template.render(3, None, "sunset.final.png"), "3_sunset.final.png");
    }

    #[test]
    fn hue_is_rounded_and_padded() {
        let template = FilenameTemplate::parse("h{hue:03}-{basename}");
        assert_eq!(template.render(1, Some(39.6), "a.png"), "h040-a.png");
        assert_eq!(template.render(1, None, "a.png"), "h999-a.png");
        assert_eq!(FilenameTemplate::parse("{hue}").render(1, Some(7.2), "b"), "7");
    }

    #[test]
    fn unknown_tokens_stay_verbatim() {
        let template = FilenameTemplate::parse("{date}_{index}_{basename:2}_{");
        assert_eq!(template.render(5, None, "x.gif"), "{date}_5_{basename:2}_{.gif");
    }

    #[test]
    fn oversized_padding_is_not_a_token() {
        let template = FilenameTemplate::parse("{index:1000000000000}_{hue:33}_{index:32}");
        let name = template.render(4, Some(12.0), "a.png");
        assert_eq!(
            name,
            format!("{{index:1000000000000}}_{{hue:33}}_{}4.png", "0".repeat(31))
        );
    }

    #[test]
    fn every_occurrence_is_rendered() {
        let template = FilenameTemplate::parse("{index}-{basename}-{index}");
        assert_eq!(template.render(7, None, "cat.jpg"), "7-cat-7.jpg");
    }

    #[test]
    fn names_without_extension() {
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(FilenameTemplate::default().render(1, None, ".hidden"), "1_.hidden");
    }
}
