//! Defines the [`Post`] type and the logic for parsing one from its source
//! text. Path-derived metadata (date and title slug) is supplied by the
//! caller; see [`crate::parser`] for how it's recovered from file names.

use crate::excerpt;
use crate::pattern::Fields;
use crate::tag::Tag;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// A dated article parsed from a source file.
#[derive(Clone, Debug)]
pub struct Post {
    /// The source file path relative to the source directory.
    pub source_path: PathBuf,

    /// The publication date, taken from the file name.
    pub date: NaiveDate,

    /// The title slug, taken from the file name.
    pub title_slug: String,

    /// The title, taken from the frontmatter.
    pub title: String,

    /// Tags in the order they were written, without duplicates.
    pub tags: Vec<Tag>,

    /// The raw markdown body, excerpt marker included.
    pub body: String,

    /// The markdown before the excerpt marker, if the body has one.
    pub excerpt: Option<String>,

    /// The body with the excerpt marker removed.
    pub article: String,

    /// Drafts (`published: false`) are skipped unless drafts are enabled.
    pub published: bool,
}

impl Post {
    /// Parses a post from `input`. The input must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with a `title` and optionally `tags` and
    ///    `published`
    /// 3. Terminal frontmatter fence (`---`) on its own line
    /// 4. Post body, optionally split by `excerpt_marker`
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// tags: greet, meta
    /// ---
    /// # Hello
    ///
    /// READMORE
    ///
    /// World
    /// ```
    pub fn parse(
        source_path: PathBuf,
        date: NaiveDate,
        title_slug: String,
        input: &str,
        excerpt_marker: &str,
    ) -> Result<Post> {
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let yaml = &input[yaml_start..yaml_stop];
        let frontmatter: Frontmatter = match yaml.trim().is_empty() {
            true => Frontmatter::default(),
            false => serde_yaml::from_str(yaml)?,
        };

        let title = frontmatter
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingField("title"))?;
        let tags = match &frontmatter.tags {
            None => Vec::new(),
            Some(TagList::Joined(joined)) => Tag::parse_list(vec![joined.as_str()]),
            Some(TagList::Listed(names)) => Tag::parse_list(names.iter().map(String::as_str)),
        };

        let body = &input[body_start..];
        let split = excerpt::split(body, excerpt_marker);
        Ok(Post {
            source_path,
            date,
            title_slug,
            title,
            tags,
            body: body.to_owned(),
            excerpt: match split.split {
                true => Some(split.summary.to_owned()),
                false => None,
            },
            article: format!("{}{}", split.summary, split.remainder),
            published: frontmatter.published.unwrap_or(true),
        })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Returns the summary markdown and whether the post was actually
    /// summarized (i.e., had an excerpt marker).
    pub fn summary(&self) -> (&str, bool) {
        match &self.excerpt {
            Some(excerpt) => (excerpt.as_str(), true),
            None => (self.article.as_str(), false),
        }
    }

    /// The permalink fields this post provides.
    pub fn fields(&self) -> Fields {
        Fields {
            title: Some(self.title_slug.clone()),
            year: Some(self.year()),
            month: Some(self.month()),
            day: Some(self.day()),
            tag: None,
        }
    }
}

/// Orders posts newest first, breaking ties on the source path so the output
/// doesn't depend on directory iteration order.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.source_path.cmp(&b.source_path))
}

// Returns the byte offsets of the YAML start, YAML end, and body start. A
// fence is a line holding only `---` (trailing whitespace allowed), so `---`
// inside a YAML value or a `----` rule doesn't end the frontmatter early.
fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    fn is_fence(line: &str) -> bool {
        line.trim_end() == "---"
    }

    let mut lines = input.split_inclusive('\n');
    let yaml_start = match lines.next() {
        Some(line) if is_fence(line) => line.len(),
        _ => return Err(Error::FrontmatterMissingStartFence),
    };
    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line) {
            return Ok((yaml_start, offset, offset + line.len()));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

#[derive(Deserialize, Default)]
struct Frontmatter {
    /// The title of the post.
    #[serde(default)]
    title: Option<String>,

    /// The tags associated with the post.
    #[serde(default)]
    tags: Option<TagList>,

    /// Whether the post is published.
    #[serde(default)]
    published: Option<bool>,
}

/// Tags may be written as `tags: a, b` or as a YAML sequence.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagList {
    Joined(String),
    Listed(Vec<String>),
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence.
    FrontmatterMissingEndFence,

    /// Returned when a required frontmatter field is absent or blank.
    MissingField(&'static str),

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::MissingField(field) => {
                write!(f, "Missing required frontmatter field `{}`", field)
            }
            Error::DeserializeYaml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeserializeYaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(input: &str) -> Result<Post> {
        Post::parse(
            PathBuf::from("2014-11-12-hello.html.markdown"),
            NaiveDate::from_ymd_opt(2014, 11, 12).unwrap(),
            "hello".to_owned(),
            input,
            "READMORE",
        )
    }

    #[test]
    fn test_parse_post() -> Result<()> {
        let post = parse("---\ntitle: Hello\ntags: Rails, git, rails\n---\nIntro\nREADMORE\nRest\n")?;
        assert_eq!("Hello", post.title);
        let tags: Vec<&str> = post.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(vec!["rails", "git"], tags);
        assert_eq!("Intro\nREADMORE\nRest\n", post.body);
        assert_eq!(Some("Intro\n".to_owned()), post.excerpt);
        assert_eq!("Intro\n\nRest\n", post.article);
        assert!(post.published);
        assert_eq!((2014, 11, 12), (post.year(), post.month(), post.day()));
        Ok(())
    }

    #[test]
    fn test_parse_tag_sequence_and_draft() -> Result<()> {
        let post = parse("---\ntitle: Draft\ntags: [one, two]\npublished: false\n---\nBody")?;
        assert_eq!(2, post.tags.len());
        assert!(!post.published);
        assert_eq!(("Body", false), post.summary());
        Ok(())
    }

    #[test]
    fn test_dashes_inside_frontmatter_value() -> Result<()> {
        let post = parse("---\ntitle: a---b\n---\nBody")?;
        assert_eq!("a---b", post.title);
        assert_eq!("Body", post.body);
        Ok(())
    }

    #[test]
    fn test_fences_are_whole_lines() -> Result<()> {
        let input = "---\na\n----\n---foo\n---\nBody";
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        assert_eq!("a\n----\n---foo\n", &input[yaml_start..yaml_stop]);
        assert_eq!("Body", &input[body_start..]);

        let post = parse("---  \r\ntitle: Rules\r\n--- \r\nBody")?;
        assert_eq!("Rules", post.title);
        assert_eq!("Body", post.body);

        assert!(matches!(
            parse("----\ntitle: Hello\n---\nBody"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            parse("---\ntitle: Hello\n---more\nBody"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        Ok(())
    }

    #[test]
    fn test_missing_title() {
        for input in &["---\ntags: a\n---\nBody", "---\n---\nBody", "---\ntitle: ' '\n---\n"] {
            match parse(input) {
                Err(Error::MissingField("title")) => {}
                other => panic!("wanted missing title, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_fences() {
        assert!(matches!(
            parse("title: Hello\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            parse("---\ntitle: Hello\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_newest_first_breaks_ties_by_path() -> Result<()> {
        let mut a = parse("---\ntitle: A\n---\n")?;
        let mut b = a.clone();
        a.source_path = PathBuf::from("2014-11-12-a.html.markdown");
        b.source_path = PathBuf::from("2014-11-12-b.html.markdown");
        let mut older = a.clone();
        older.date = NaiveDate::from_ymd_opt(2014, 5, 4).unwrap();

        let mut posts = vec![older, b, a];
        posts.sort_by(newest_first);
        let order: Vec<&str> = posts
            .iter()
            .map(|p| p.source_path.to_str().unwrap())
            .collect();
        assert_eq!(
            vec![
                "2014-11-12-a.html.markdown",
                "2014-11-12-b.html.markdown",
                "2014-11-12-a.html.markdown",
            ],
            order
        );
        assert_eq!(2014, posts[2].year());
        assert_eq!(5, posts[2].month());
        Ok(())
    }
}
