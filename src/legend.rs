// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Error;

pub const DEFAULT_LEGEND_FORMAT: &str = "{platform}-{scenario}";

const MISSING: &str = "None";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    Platform,
    Scenario,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Centre,
}

/// Padding from a `[[fill]align][width]` format spec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Pad {
    fill: char,
    align: Align,
    width: usize,
}

impl Default for Pad {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: Align::Left,
            width: 0,
        }
    }
}

impl Pad {
    fn parse(spec: &str) -> Option<Self> {
        fn align(c: char) -> Option<Align> {
            match c {
                '<' => Some(Align::Left),
                '>' => Some(Align::Right),
                '^' => Some(Align::Centre),
                _ => None,
            }
        }

        let mut pad = Pad::default();
        let mut chars = spec.chars();
        let rest = match (chars.next(), chars.next()) {
            (Some(fill), Some(a)) if align(a).is_some() => {
                pad.fill = fill;
                pad.align = align(a)?;
                chars.as_str()
            }
            (Some(a), _) if align(a).is_some() => {
                pad.align = align(a)?;
                &spec[a.len_utf8()..]
            }
            _ => spec,
        };

        if !rest.is_empty() {
            if !rest.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            pad.width = rest.parse().ok()?;
        }
        Some(pad)
    }

    fn apply(&self, value: &str, out: &mut String) {
        let missing = self.width.saturating_sub(value.chars().count());
        let (before, after) = match self.align {
            Align::Left => (0, missing),
            Align::Right => (missing, 0),
            Align::Centre => (missing / 2, missing - missing / 2),
        };
        out.extend(std::iter::repeat(self.fill).take(before));
        out.push_str(value);
        out.extend(std::iter::repeat(self.fill).take(after));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field, Pad),
}

/// A parsed legend template such as `{platform}-{scenario}`.
///
/// `{{` and `}}` produce literal braces. Placeholders may carry a padding
/// spec such as `{platform:>12}` or `{scenario:*^9}`. Any other placeholder
/// or spec is rejected when the template is parsed, before any record is
/// labelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendFormat {
    segments: Vec<Segment>,
}

impl Default for LegendFormat {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Field(Field::Platform, Pad::default()),
                Segment::Literal("-".to_owned()),
                Segment::Field(Field::Scenario, Pad::default()),
            ],
        }
    }
}

impl LegendFormat {
    pub fn parse(template: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::LegendFormat {
            template: template.to_owned(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut placeholder = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        placeholder.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'".to_owned()));
                    }

                    let (name, spec) = match placeholder.find(':') {
                        Some(i) => (&placeholder[..i], Some(&placeholder[i + 1..])),
                        None => (placeholder.as_str(), None),
                    };
                    let field = match name {
                        "platform" => Field::Platform,
                        "scenario" => Field::Scenario,
                        other => {
                            return Err(invalid(format!(
                                "unknown placeholder '{{{}}}', expected {{platform}} or {{scenario}}",
                                other
                            )))
                        }
                    };
                    let pad = match spec {
                        Some(spec) => Pad::parse(spec).ok_or_else(|| {
                            invalid(format!(
                                "unsupported format spec '{}', expected [[fill]align][width]",
                                spec
                            ))
                        })?,
                        None => Pad::default(),
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field, pad));
                }
                '}' => return Err(invalid("single '}' encountered".to_owned())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Renders the label for one record. A missing scenario renders as
    /// `None`.
    pub fn render(&self, platform: &str, scenario: Option<&str>) -> String {
        let mut label = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => label.push_str(s),
                Segment::Field(Field::Platform, pad) => pad.apply(platform, &mut label),
                Segment::Field(Field::Scenario, pad) => {
                    pad.apply(scenario.unwrap_or(MISSING), &mut label)
                }
            }
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template() {
        let format = LegendFormat::parse(DEFAULT_LEGEND_FORMAT).unwrap();
        assert_eq!(format, LegendFormat::default());
        assert_eq!(format.render("vllm", Some("chat")), "vllm-chat");
        assert_eq!(format.render("vllm", None), "vllm-None");
    }

    #[test]
    fn repeated_and_reordered_placeholders() {
        let format = LegendFormat::parse("{scenario} on {platform} ({platform})").unwrap();
        assert_eq!(format.render("oci", Some("rag")), "rag on oci (oci)");
    }

    #[test]
    fn escaped_braces() {
        let format = LegendFormat::parse("{{{platform}}}").unwrap();
        assert_eq!(format.render("a", None), "{a}");
    }

    #[test]
    fn literal_only() {
        let format = LegendFormat::parse("fixed").unwrap();
        assert_eq!(format.render("a", Some("b")), "fixed");
    }

    #[test]
    fn padding_specs() {
        let format = LegendFormat::parse("{platform:>6}|{scenario:<5}|").unwrap();
        assert_eq!(format.render("vllm", Some("rag")), "  vllm|rag  |");

        let format = LegendFormat::parse("{platform:*^8}").unwrap();
        assert_eq!(format.render("vllm", None), "**vllm**");

        let format = LegendFormat::parse("{platform:6}{scenario:}").unwrap();
        assert_eq!(format.render("oci", Some("x")), "oci   x");

        // width smaller than the value leaves it untouched
        let format = LegendFormat::parse("{scenario:>2}").unwrap();
        assert_eq!(format.render("a", None), "None");
    }

    #[test]
    fn unsupported_specs_fail() {
        assert!(LegendFormat::parse("{platform:.3}").is_err());
        assert!(LegendFormat::parse("{platform:>x}").is_err());
        assert!(LegendFormat::parse("{platform!r}").is_err());
    }

    #[test]
    fn unknown_placeholder_fails() {
        match LegendFormat::parse("{platform}-{model}") {
            Err(Error::LegendFormat { template, reason }) => {
                assert_eq!(template, "{platform}-{model}");
                assert!(reason.contains("{model}"), "{}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(LegendFormat::parse("{}").is_err());
    }

    #[test]
    fn unbalanced_braces_fail() {
        assert!(LegendFormat::parse("{platform").is_err());
        assert!(LegendFormat::parse("platform}").is_err());
    }
}
