//! Defines the [`Parser`], which loads [`Post`] objects from the source
//! directory. Each markdown file's path (relative to the source directory,
//! markdown extension removed) must match the source [`Pattern`], e.g.
//! `2014-11-12-best-commit-messages-one-line.html.markdown` against
//! `{year}-{month}-{day}-{title}.html`.

use crate::pattern::Pattern;
use crate::post::{self, newest_first, Post};
use chrono::NaiveDate;
use log::debug;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions recognized as markdown sources.
pub const MARKDOWN_EXTENSIONS: &[&str] = &[".markdown", ".md"];

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// The pattern that every markdown source path must match.
    sources: &'a Pattern,

    /// The marker separating a post's summary from the rest of its body.
    excerpt_marker: &'a str,

    /// Whether posts with `published: false` are kept.
    show_drafts: bool,

    /// Directories, relative to the source directory, that are never walked
    /// (e.g. the asset directories).
    excluded: Vec<PathBuf>,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(sources: &'a Pattern, excerpt_marker: &'a str, show_drafts: bool) -> Parser<'a> {
        Parser {
            sources,
            excerpt_marker,
            show_drafts,
            excluded: Vec::new(),
        }
    }

    /// Skips the directories in `dirs` (relative to the source directory)
    /// and everything under them.
    pub fn exclude<'p>(mut self, dirs: impl IntoIterator<Item = &'p Path>) -> Parser<'a> {
        self.excluded.extend(dirs.into_iter().map(Path::to_owned));
        self
    }

    /// Walks `source_directory` and returns every post, newest first. Files
    /// without a markdown extension are ignored; a markdown file whose path
    /// doesn't match the source pattern aborts the parse.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let walker = WalkDir::new(source_directory)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(source_directory, entry.path()));
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix() should never fail since WalkDir yields
            // descendants of `source_directory`
            let relative_path = match entry.path().strip_prefix(source_directory) {
                Ok(relative_path) => relative_path,
                Err(_) => continue,
            };
            if strip_markdown_extension(relative_path).is_none() {
                debug!("skipping non-markdown file {}", relative_path.display());
                continue;
            }

            let post = self.parse_post(source_directory, relative_path)?;
            match post.published || self.show_drafts {
                true => posts.push(post),
                false => debug!("skipping draft {}", relative_path.display()),
            }
        }

        posts.sort_by(newest_first);
        Ok(posts)
    }

    fn is_excluded(&self, source_directory: &Path, path: &Path) -> bool {
        match path.strip_prefix(source_directory) {
            Ok(relative) => self.excluded.iter().any(|dir| dir.as_path() == relative),
            Err(_) => false,
        }
    }

    /// Parses a single [`Post`] from the file at `relative_path` under
    /// `source_directory`.
    pub fn parse_post(&self, source_directory: &Path, relative_path: &Path) -> Result<Post> {
        let (date, title_slug) = self.parse_file_name(relative_path)?;

        use std::io::Read;
        let mut contents = String::new();
        File::open(source_directory.join(relative_path))
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|err| Error::Read {
                path: relative_path.to_owned(),
                err,
            })?;

        debug!("parsing post {}", relative_path.display());
        Post::parse(
            relative_path.to_owned(),
            date,
            title_slug,
            &contents,
            self.excerpt_marker,
        )
        .map_err(|err| Error::Post {
            path: relative_path.to_owned(),
            err,
        })
    }

    /// Recovers the date and title slug from a source path.
    pub fn parse_file_name(&self, relative_path: &Path) -> Result<(NaiveDate, String)> {
        let malformed = |reason: String| Error::MalformedFileName {
            path: relative_path.to_owned(),
            reason,
        };

        let stem = strip_markdown_extension(relative_path)
            .ok_or_else(|| malformed("not a markdown file".to_owned()))?;
        let fields = self.sources.matches(&stem).ok_or_else(|| {
            malformed(format!("doesn't match the pattern `{}`", self.sources))
        })?;

        match (fields.year, fields.month, fields.day, fields.title) {
            (Some(year), Some(month), Some(day), Some(title)) => {
                match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(date) => Ok((date, title)),
                    None => Err(malformed(format!(
                        "{:04}-{:02}-{:02} is not a valid date",
                        year, month, day
                    ))),
                }
            }
            _ => Err(malformed(format!(
                "the pattern `{}` doesn't provide a full date and title",
                self.sources
            ))),
        }
    }
}

// Returns the path as a `/`-separated string without its markdown extension,
// or `None` if it has no markdown extension.
fn strip_markdown_extension(relative_path: &Path) -> Option<String> {
    let path = relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    MARKDOWN_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext).map(str::to_owned))
}

/// Represents the result of a [`Parser`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading posts from the source directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when a markdown file's path doesn't yield a date and title.
    MalformedFileName { path: PathBuf, reason: String },

    /// Returned when a post's contents can't be parsed.
    Post { path: PathBuf, err: post::Error },

    /// Returned when a source file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedFileName { path, reason } => {
                write!(f, "malformed file name `{}`: {}", path.display(), reason)
            }
            Error::Post { path, err } => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
            Error::Read { path, err } => {
                write!(f, "reading `{}`: {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedFileName { .. } => None,
            Error::Post { err, .. } => Some(err),
            Error::Read { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while walking the source directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::index_tags;

    fn parser(sources: &Pattern) -> Parser {
        Parser::new(sources, "READMORE", false)
    }

    #[test]
    fn test_parse_file_name() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        let (date, slug) = parser(&sources).parse_file_name(Path::new(
            "2014-11-12-best-commit-messages-one-line.html.markdown",
        ))?;
        assert_eq!(NaiveDate::from_ymd_opt(2014, 11, 12), Some(date));
        assert_eq!("best-commit-messages-one-line", slug);
        Ok(())
    }

    #[test]
    fn test_parse_file_name_nested() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}/{month}-{day}-{title}")?;
        let (date, slug) =
            parser(&sources).parse_file_name(Path::new("2015/01-31-nested.md"))?;
        assert_eq!(NaiveDate::from_ymd_opt(2015, 1, 31), Some(date));
        assert_eq!("nested", slug);
        Ok(())
    }

    #[test]
    fn test_malformed_file_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        let parser = parser(&sources);
        for name in &[
            "about.html.markdown",
            "2014-13-01-bad-month.html.markdown",
            "2014-02-30-bad-day.html.markdown",
            "2014-11-12-wrong-ext.txt",
        ] {
            match parser.parse_file_name(Path::new(name)) {
                Err(Error::MalformedFileName { path, .. }) => {
                    assert_eq!(Path::new(name), path)
                }
                other => panic!("wanted malformed file name for {}, got {:?}", name, other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_parse_posts() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        let posts = parser(&sources).parse_posts(Path::new("./testdata/parser/"))?;

        let slugs: Vec<&str> = posts.iter().map(|p| p.title_slug.as_str()).collect();
        assert_eq!(
            vec!["best-commit-messages-one-line", "rails-five"],
            slugs,
            "the draft is skipped, the stylesheet ignored, newest first"
        );

        let tags = index_tags(&posts);
        let rails: Vec<&str> = tags["rails"]
            .posts
            .iter()
            .map(|p| p.title_slug.as_str())
            .collect();
        assert_eq!(vec!["best-commit-messages-one-line", "rails-five"], rails);
        Ok(())
    }

    #[test]
    fn test_parse_posts_with_drafts() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        let posts = Parser::new(&sources, "READMORE", true)
            .parse_posts(Path::new("./testdata/parser/"))?;
        assert_eq!(3, posts.len());
        assert_eq!("unfinished", posts[0].title_slug);
        Ok(())
    }

    #[test]
    fn test_parse_posts_skips_excluded_directories(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        let source_directory = Path::new("./testdata/assets/");
        assert!(
            parser(&sources).parse_posts(source_directory).is_err(),
            "the vendored README is not a post"
        );

        let posts = parser(&sources)
            .exclude(vec![Path::new("javascripts")])
            .parse_posts(source_directory)?;
        let slugs: Vec<&str> = posts.iter().map(|p| p.title_slug.as_str()).collect();
        assert_eq!(vec!["fine"], slugs);
        Ok(())
    }

    #[test]
    fn test_parse_posts_reports_malformed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sources = Pattern::parse("{year}-{month}-{day}-{title}.html")?;
        match parser(&sources).parse_posts(Path::new("./testdata/malformed/")) {
            Err(Error::MalformedFileName { path, .. }) => {
                assert_eq!(Path::new("notes.html.markdown"), path);
            }
            other => panic!("wanted malformed file name, got {:?}", other),
        }
        Ok(())
    }
}
