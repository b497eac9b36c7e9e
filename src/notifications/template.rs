//! Positional `%`-directive templates for notification text.
//!
//! Grammar: `%[index$|<][-][width][.precision]conversion` where conversion is
//! `s`/`S` (text), `t`/`T` followed by a date/time suffix, `%` or `n`.
//! Ordinary directives consume arguments left to right, `n$` picks argument
//! `n` (1-based) and `<` reuses the previous directive's argument. Upper-case
//! conversions upper-case their output.

use chrono::{DateTime, FixedOffset};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

/// Rendering of a timestamp consumed by a plain `%s`
const DEFAULT_DATE_PATTERN: &str = "%a %b %d %H:%M:%S %:z %Y";

/// Suffixes accepted after `%t` / `%T`
const DATE_SUFFIXES: &str = "HIklMSLNpzZsQBbhAaCYyjmdeRTrDFc";

/// Largest width, precision or argument index a directive may carry
const MAX_DIRECTIVE_NUMBER: usize = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template ends with a dangling '%'")]
    DanglingPercent,

    #[error("Unknown conversion '{0}' at offset {1}")]
    UnknownConversion(char, usize),

    #[error("Missing date/time suffix after '%{0}' at offset {1}")]
    MissingDateSuffix(char, usize),

    #[error("Unknown date/time suffix '{0}' at offset {1}")]
    UnknownDateSuffix(char, usize),

    #[error("Argument index 0 at offset {0}; indices start at 1")]
    ZeroIndex(usize),

    #[error("'<' at offset {0} has no previous argument to reuse")]
    NoPreviousArgument(usize),

    #[error("Template uses {needed} arguments but only {available} are supplied")]
    MissingArgument { needed: usize, available: usize },

    #[error("Date/time conversion applied to text argument {0}")]
    NotATimestamp(usize),

    #[error("Number in directive at offset {0} is too large")]
    NumberTooLarge(usize),
}

/// Kind of value expected at an argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    Time,
}

/// A value substituted into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatArg {
    Text(String),
    Time(DateTime<FixedOffset>),
}

impl From<&str> for FormatArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FormatArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<DateTime<FixedOffset>> for FormatArg {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Self::Time(ts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Text,
    DateTime(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    /// Zero-based argument position
    arg: usize,
    conversion: Conversion,
    upper: bool,
    left_align: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Directive(Directive),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    arity: usize,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();
        let mut ordinary = 0usize;
        let mut last: Option<usize> = None;
        let mut arity = 0usize;

        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let mut relative = false;
            let mut index = None;
            let mut width = None;
            let mut left_align = false;

            if chars.next_if(|&(_, c)| c == '<').is_some() {
                relative = true;
            } else if let Some(n) = take_digits(&mut chars, offset)? {
                if chars.next_if(|&(_, c)| c == '$').is_some() {
                    index = Some(n);
                } else {
                    width = Some(n);
                }
            }

            if width.is_none() {
                while chars.next_if(|&(_, c)| c == '-').is_some() {
                    left_align = true;
                }
                width = take_digits(&mut chars, offset)?;
            }

            let precision = if chars.next_if(|&(_, c)| c == '.').is_some() {
                Some(take_digits(&mut chars, offset)?.unwrap_or(0))
            } else {
                None
            };

            let (_, conv) = chars.next().ok_or(TemplateError::DanglingPercent)?;
            let conversion = match conv {
                '%' => {
                    literal.push('%');
                    continue;
                }
                'n' => {
                    literal.push('\n');
                    continue;
                }
                's' | 'S' => Conversion::Text,
                't' | 'T' => {
                    let (_, suffix) = chars
                        .next()
                        .ok_or(TemplateError::MissingDateSuffix(conv, offset))?;
                    if !DATE_SUFFIXES.contains(suffix) {
                        return Err(TemplateError::UnknownDateSuffix(suffix, offset));
                    }
                    Conversion::DateTime(suffix)
                }
                other => return Err(TemplateError::UnknownConversion(other, offset)),
            };

            let arg = if relative {
                last.ok_or(TemplateError::NoPreviousArgument(offset))?
            } else if let Some(n) = index {
                n.checked_sub(1).ok_or(TemplateError::ZeroIndex(offset))?
            } else {
                ordinary += 1;
                ordinary - 1
            };
            last = Some(arg);
            arity = arity.max(arg + 1);

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Directive(Directive {
                arg,
                conversion,
                upper: conv.is_ascii_uppercase(),
                left_align,
                width,
                precision,
            }));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments, arity })
    }

    /// Number of arguments the template reads
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Fail unless `available` arguments cover every directive
    pub fn check_arity(&self, available: usize) -> Result<(), TemplateError> {
        if self.arity > available {
            return Err(TemplateError::MissingArgument {
                needed: self.arity,
                available,
            });
        }
        Ok(())
    }

    /// Check every directive against the kinds of the arguments it will get
    pub fn check_args(&self, kinds: &[ArgKind]) -> Result<(), TemplateError> {
        self.check_arity(kinds.len())?;
        for segment in &self.segments {
            if let Segment::Directive(d) = segment {
                if let (Conversion::DateTime(_), ArgKind::Text) = (d.conversion, kinds[d.arg]) {
                    return Err(TemplateError::NotATimestamp(d.arg + 1));
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, args: &[FormatArg]) -> Result<String, TemplateError> {
        self.check_arity(args.len())?;

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Directive(d) => {
                    let value = match (d.conversion, &args[d.arg]) {
                        (Conversion::Text, FormatArg::Text(s)) => s.clone(),
                        (Conversion::Text, FormatArg::Time(ts)) => {
                            ts.format(DEFAULT_DATE_PATTERN).to_string()
                        }
                        (Conversion::DateTime(suffix), FormatArg::Time(ts)) => {
                            format_date_field(ts, suffix)
                        }
                        (Conversion::DateTime(_), FormatArg::Text(_)) => {
                            return Err(TemplateError::NotATimestamp(d.arg + 1));
                        }
                    };
                    push_justified(&mut out, value, d);
                }
            }
        }
        Ok(out)
    }
}

fn take_digits(
    chars: &mut Peekable<CharIndices<'_>>,
    offset: usize,
) -> Result<Option<usize>, TemplateError> {
    let mut value: Option<usize> = None;
    while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
        let digit = (c as u8 - b'0') as usize;
        let next = value
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .filter(|&v| v <= MAX_DIRECTIVE_NUMBER)
            .ok_or(TemplateError::NumberTooLarge(offset))?;
        value = Some(next);
    }
    Ok(value)
}

fn format_date_field(ts: &DateTime<FixedOffset>, suffix: char) -> String {
    let pattern = match suffix {
        'H' => "%H",
        'I' => "%I",
        'k' => "%-H",
        'l' => "%-I",
        'M' => "%M",
        'S' => "%S",
        'L' => "%3f",
        'N' => "%9f",
        'p' => "%P",
        'z' => "%z",
        'Z' => "%:z",
        's' => "%s",
        'Q' => return ts.timestamp_millis().to_string(),
        'B' => "%B",
        'b' | 'h' => "%b",
        'A' => "%A",
        'a' => "%a",
        'C' => "%C",
        'Y' => "%Y",
        'y' => "%y",
        'j' => "%j",
        'm' => "%m",
        'd' => "%d",
        'e' => "%-d",
        'R' => "%H:%M",
        'T' => "%H:%M:%S",
        'r' => "%I:%M:%S %p",
        'D' => "%m/%d/%y",
        'F' => "%Y-%m-%d",
        _ => DEFAULT_DATE_PATTERN,
    };
    ts.format(pattern).to_string()
}

fn push_justified(out: &mut String, value: String, d: &Directive) {
    let mut value = if d.upper { value.to_uppercase() } else { value };
    if let Some(max) = d.precision {
        if let Some((cut, _)) = value.char_indices().nth(max) {
            value.truncate(cut);
        }
    }

    let pad = d
        .width
        .map(|w| w.saturating_sub(value.chars().count()))
        .unwrap_or(0);
    if d.left_align {
        out.push_str(&value);
        out.extend(std::iter::repeat(' ').take(pad));
    } else {
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(&value);
    }
}
