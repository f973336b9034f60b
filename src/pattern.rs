//! Defines [`Pattern`], the placeholder template behind every permalink and
//! the source file naming convention. A pattern is a string such as
//! `{year}/{month}/{title}.html` which is rendered from a [`Fields`] value
//! ([`Pattern::render`]) or matched against a path to recover one
//! ([`Pattern::matches`]).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A placeholder name recognized inside a [`Pattern`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Year,
    Month,
    Day,
    Tag,
}

impl Field {
    fn from_name(name: &str) -> Option<Field> {
        match name {
            "title" => Some(Field::Title),
            "year" => Some(Field::Year),
            "month" => Some(Field::Month),
            "day" => Some(Field::Day),
            "tag" => Some(Field::Tag),
            _ => None,
        }
    }

    /// The name of the placeholder as it appears between braces.
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::Tag => "tag",
        }
    }

    // Numeric fields are zero-padded to a fixed width so they can be matched
    // back out of a path without a delimiter.
    fn width(self) -> Option<usize> {
        match self {
            Field::Year => Some(4),
            Field::Month | Field::Day => Some(2),
            Field::Title | Field::Tag => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// The values available for substitution. Which ones are present depends on
/// the kind of page being routed: an article has a title and a full date, a
/// tag page only a tag, a month page a year and a month.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub tag: Option<String>,
}

impl Fields {
    /// Returns the formatted value for `field`, if present.
    pub fn get(&self, field: Field) -> Option<String> {
        match field {
            Field::Title => self.title.clone(),
            Field::Year => self.year.map(|y| format!("{:04}", y)),
            Field::Month => self.month.map(|m| format!("{:02}", m)),
            Field::Day => self.day.map(|d| format!("{:02}", d)),
            Field::Tag => self.tag.clone(),
        }
    }

    // Records a captured value. Returns `None` when the value can't be parsed
    // or disagrees with an earlier capture of the same field.
    fn set(&mut self, field: Field, value: &str) -> Option<()> {
        fn merge<T: PartialEq>(slot: &mut Option<T>, value: T) -> Option<()> {
            match slot {
                Some(existing) if *existing != value => None,
                _ => {
                    *slot = Some(value);
                    Some(())
                }
            }
        }

        match field {
            Field::Title => merge(&mut self.title, value.to_owned()),
            Field::Year => merge(&mut self.year, value.parse().ok()?),
            Field::Month => merge(&mut self.month, value.parse().ok()?),
            Field::Day => merge(&mut self.day, value.parse().ok()?),
            Field::Tag => merge(&mut self.tag, value.to_owned()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Field),
}

/// A parsed placeholder template. Patterns are validated on construction, so
/// an unknown placeholder is reported when configuration is loaded rather
/// than halfway through a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses `source` into a pattern.
    pub fn parse(source: &str) -> Result<Pattern> {
        if source.is_empty() {
            return Err(Error::Empty);
        }

        let unbalanced = || Error::UnbalancedBraces(source.to_owned());
        let mut segments = Vec::new();
        let mut rest = source;
        while !rest.is_empty() {
            match rest.find(|c: char| c == '{' || c == '}') {
                None => {
                    segments.push(Segment::Literal(rest.to_owned()));
                    break;
                }
                Some(i) => {
                    if i > 0 {
                        segments.push(Segment::Literal(rest[..i].to_owned()));
                    }
                    if rest[i..].starts_with('}') {
                        return Err(unbalanced());
                    }
                    let after = &rest[i + 1..];
                    let close = after.find('}').ok_or_else(unbalanced)?;
                    let name = &after[..close];
                    if name.contains('{') {
                        return Err(unbalanced());
                    }
                    let field = Field::from_name(name).ok_or_else(|| {
                        Error::UnknownPlaceholder {
                            pattern: source.to_owned(),
                            name: name.to_owned(),
                        }
                    })?;
                    segments.push(Segment::Placeholder(field));
                    rest = &after[close + 1..];
                }
            }
        }

        Ok(Pattern {
            source: source.to_owned(),
            segments,
        })
    }

    /// The pattern as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Iterates over the placeholders in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(field) => Some(*field),
            Segment::Literal(_) => None,
        })
    }

    /// Checks that every placeholder in the pattern is one of `allowed`.
    pub fn restrict(&self, allowed: &[Field]) -> Result<()> {
        match self.fields().find(|f| !allowed.contains(f)) {
            None => Ok(()),
            Some(field) => Err(Error::UnsupportedPlaceholder {
                pattern: self.source.clone(),
                field,
            }),
        }
    }

    /// Checks that every field in `required` appears in the pattern.
    pub fn require(&self, required: &[Field]) -> Result<()> {
        match required.iter().find(|f| !self.fields().any(|g| g == **f)) {
            None => Ok(()),
            Some(field) => Err(Error::MissingPlaceholder {
                pattern: self.source.clone(),
                field: *field,
            }),
        }
    }

    /// Substitutes every placeholder with the corresponding value from
    /// `fields`. Fails if the pattern names a field that is absent.
    pub fn render(&self, fields: &Fields) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Placeholder(field) => match fields.get(*field) {
                    Some(value) => out.push_str(&value),
                    None => {
                        return Err(Error::MissingField {
                            pattern: self.source.clone(),
                            field: *field,
                        })
                    }
                },
            }
        }
        Ok(out)
    }

    /// The inverse of [`Pattern::render`]: recovers the field values from a
    /// rendered path, or returns `None` if `input` doesn't fit the pattern.
    /// Numeric fields consume exactly their padded width; textual fields
    /// consume the shortest non-empty run (without a `/`) that lets the rest
    /// of the pattern match.
    pub fn matches(&self, input: &str) -> Option<Fields> {
        match_segments(&self.segments, input, Fields::default())
    }
}

fn match_segments(segments: &[Segment], input: &str, mut fields: Fields) -> Option<Fields> {
    let (first, rest) = match segments.split_first() {
        None if input.is_empty() => return Some(fields),
        None => return None,
        Some(split) => split,
    };

    match first {
        Segment::Literal(literal) => input
            .strip_prefix(literal.as_str())
            .and_then(|tail| match_segments(rest, tail, fields)),
        Segment::Placeholder(field) => match field.width() {
            Some(width) => {
                let digits = input.get(..width)?;
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                fields.set(*field, digits)?;
                match_segments(rest, &input[width..], fields)
            }
            None => input
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
                .take_while(|&end| !input[..end].contains('/'))
                .find_map(|end| {
                    let mut candidate = fields.clone();
                    candidate.set(*field, &input[..end])?;
                    match_segments(rest, &input[end..], candidate)
                }),
        },
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Pattern> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Pattern, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<Pattern>()
            .map_err(D::Error::custom)
    }
}

/// The result of a fallible pattern operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem parsing or rendering a [`Pattern`].
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Returned for an empty pattern string.
    Empty,

    /// Returned when a `{` has no matching `}` or vice versa.
    UnbalancedBraces(String),

    /// Returned when a placeholder name isn't one of the known fields.
    UnknownPlaceholder { pattern: String, name: String },

    /// Returned when a pattern uses a placeholder that has no meaning for the
    /// kind of page it routes.
    UnsupportedPlaceholder { pattern: String, field: Field },

    /// Returned when a pattern lacks a placeholder it needs.
    MissingPlaceholder { pattern: String, field: Field },

    /// Returned when rendering needs a field that wasn't provided.
    MissingField { pattern: String, field: Field },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Empty => write!(f, "empty pattern"),
            Error::UnbalancedBraces(pattern) => {
                write!(f, "unbalanced braces in pattern `{}`", pattern)
            }
            Error::UnknownPlaceholder { pattern, name } => {
                write!(f, "unknown placeholder `{{{}}}` in pattern `{}`", name, pattern)
            }
            Error::UnsupportedPlaceholder { pattern, field } => {
                write!(f, "placeholder `{}` can't be used in pattern `{}`", field, pattern)
            }
            Error::MissingPlaceholder { pattern, field } => {
                write!(f, "pattern `{}` must contain `{}`", pattern, field)
            }
            Error::MissingField { pattern, field } => write!(
                f,
                "no value for `{}` while rendering pattern `{}`",
                field, pattern
            ),
        }
    }
}

impl std::error::Error for Error {}
