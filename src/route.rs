//! The route resolver. A [`Router`] turns posts, tags, and calendar periods
//! into [`Route`]s (permalink, absolute URL, and output file) using the
//! configured [`Pattern`]s, and [`PageKind::template`] binds each kind of page
//! to its template. [`Claims`] detects two pages resolving to the same
//! output file.

use crate::pattern::{self, Fields, Pattern};
use crate::post::Post;
use crate::tag::Tag;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// The kinds of page the generator writes. Each kind is rendered with its own
/// template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    Post,
    Tag,
    Calendar,
    Index,
}

/// The template file bound to each [`PageKind`].
#[derive(Clone, Debug)]
pub struct Templates {
    pub layout: PathBuf,
    pub index: PathBuf,
    pub tag: PathBuf,
    pub calendar: PathBuf,
}

impl PageKind {
    /// Returns the template used to render pages of this kind.
    pub fn template(self, templates: &Templates) -> &Path {
        match self {
            PageKind::Post => &templates.layout,
            PageKind::Tag => &templates.tag,
            PageKind::Calendar => &templates.calendar,
            PageKind::Index => &templates.index,
        }
    }
}

/// The permalink patterns for every kind of page.
#[derive(Clone, Debug)]
pub struct Permalinks {
    /// Article permalinks, e.g. `blog/{title}/`.
    pub post: Pattern,

    /// Tag page permalinks, e.g. `tags/{tag}.html`.
    pub tag: Pattern,

    /// Year page permalinks, e.g. `{year}.html`.
    pub year: Pattern,

    /// Month page permalinks, e.g. `{year}/{month}.html`.
    pub month: Pattern,

    /// The first page of the home index, e.g. `index.html`. Later pages are
    /// siblings named `1.html`, `2.html`, and so on.
    pub index: Pattern,
}

/// Where a page lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// The rendered permalink, relative to the site root.
    pub permalink: String,

    /// The permalink joined onto the site root.
    pub url: Url,

    /// The file the page is written to. Permalinks ending in `/` are written
    /// to `index.html` inside that directory.
    pub file_path: PathBuf,
}

/// Resolves [`Route`]s. Holds no mutable state, so resolving the same input
/// twice always gives the same route.
pub struct Router<'a> {
    permalinks: &'a Permalinks,

    /// The site's base URL. Must end in `/` so permalinks join beneath it.
    site_root: &'a Url,

    /// The directory the site is written to.
    output_directory: &'a Path,
}

impl<'a> Router<'a> {
    /// Constructs a new router. See fields on [`Router`] for argument
    /// descriptions.
    pub fn new(permalinks: &'a Permalinks, site_root: &'a Url, output_directory: &'a Path) -> Self {
        Router {
            permalinks,
            site_root,
            output_directory,
        }
    }

    /// Resolves the route for an article.
    pub fn post(&self, post: &Post) -> Result<Route> {
        self.resolve(&self.permalinks.post, &post.fields())
    }

    /// Resolves the route for a tag page.
    pub fn tag(&self, tag: &Tag) -> Result<Route> {
        self.resolve(
            &self.permalinks.tag,
            &Fields {
                tag: Some(tag.slug.clone()),
                ..Fields::default()
            },
        )
    }

    /// Resolves the route for a year page.
    pub fn year(&self, year: i32) -> Result<Route> {
        self.resolve(
            &self.permalinks.year,
            &Fields {
                year: Some(year),
                ..Fields::default()
            },
        )
    }

    /// Resolves the route for a month page.
    pub fn month(&self, year: i32, month: u32) -> Result<Route> {
        self.resolve(
            &self.permalinks.month,
            &Fields {
                year: Some(year),
                month: Some(month),
                ..Fields::default()
            },
        )
    }

    /// Resolves the route for page `page` (zero-based) of the home index.
    pub fn index_page(&self, page: usize) -> Result<Route> {
        let first = self.permalinks.index.render(&Fields::default())?;
        if page == 0 {
            return self.route(first);
        }
        let permalink = match first.rfind('/') {
            Some(i) => format!("{}{}.html", &first[..=i], page),
            None => format!("{}.html", page),
        };
        self.route(permalink)
    }

    /// Resolves the route for a fixed site path, such as the feed.
    pub fn fixed(&self, path: &str) -> Result<Route> {
        self.route(path.to_owned())
    }

    fn resolve(&self, pattern: &Pattern, fields: &Fields) -> Result<Route> {
        self.route(pattern.render(fields)?)
    }

    // Permalinks name files under the output directory, so `.` and `..`
    // segments (and empty ones before the last) are rejected. Two distinct
    // accepted permalinks never name the same file.
    fn route(&self, permalink: String) -> Result<Route> {
        let relative = permalink.trim_start_matches('/');
        let segments: Vec<&str> = relative.split('/').collect();
        let last = segments.len() - 1;
        let invalid = segments
            .iter()
            .enumerate()
            .any(|(i, part)| *part == "." || *part == ".." || (part.is_empty() && i != last));
        if invalid {
            return Err(Error::InvalidPermalink(permalink));
        }
        let url = self.site_root.join(relative)?;
        let mut file_path = relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.output_directory.to_owned(), |path, part| path.join(part));
        if relative.is_empty() || relative.ends_with('/') {
            file_path.push("index.html");
        }
        Ok(Route {
            permalink,
            url,
            file_path,
        })
    }
}

/// Tracks which output files have been claimed, and by what.
#[derive(Default)]
pub struct Claims {
    claimed: HashMap<PathBuf, String>,
}

impl Claims {
    /// Records that `origin` (e.g. a post's source path) renders to `route`.
    /// Fails if something else already claimed the same output file.
    pub fn claim(&mut self, route: &Route, origin: impl Into<String>) -> Result<()> {
        let origin = origin.into();
        match self.claimed.get(&route.file_path) {
            Some(first) => Err(Error::Collision {
                permalink: route.permalink.clone(),
                first: first.clone(),
                second: origin,
            }),
            None => {
                self.claimed.insert(route.file_path.clone(), origin);
                Ok(())
            }
        }
    }
}

/// The result of a fallible routing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error resolving a [`Route`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a permalink pattern can't be rendered.
    Pattern(pattern::Error),

    /// Returned when a permalink can't be joined onto the site root.
    Url(url::ParseError),

    /// Returned when a permalink has `.`, `..`, or empty segments.
    InvalidPermalink(String),

    /// Returned when two pages resolve to the same output file.
    Collision {
        permalink: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Pattern(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::InvalidPermalink(permalink) => write!(
                f,
                "permalink `{}` has `.`, `..`, or empty path segments",
                permalink
            ),
            Error::Collision {
                permalink,
                first,
                second,
            } => write!(
                f,
                "permalink `{}` is produced by both `{}` and `{}`",
                permalink, first, second
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pattern(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::InvalidPermalink(_) => None,
            Error::Collision { .. } => None,
        }
    }
}

impl From<pattern::Error> for Error {
    fn from(err: pattern::Error) -> Error {
        Error::Pattern(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn permalinks(post: &str) -> Permalinks {
        Permalinks {
            post: Pattern::parse(post).unwrap(),
            tag: Pattern::parse("tags/{tag}.html").unwrap(),
            year: Pattern::parse("{year}.html").unwrap(),
            month: Pattern::parse("{year}/{month}.html").unwrap(),
            index: Pattern::parse("blog/").unwrap(),
        }
    }

    fn post(source: &str, slug: &str) -> Post {
        Post::parse(
            PathBuf::from(source),
            NaiveDate::from_ymd_opt(2014, 11, 12).unwrap(),
            slug.to_owned(),
            "---\ntitle: Post\n---\nbody",
            "READMORE",
        )
        .unwrap()
    }

    #[test]
    fn test_post_route() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let permalinks = permalinks("blog/{title}/");
        let site_root = Url::parse("https://example.org/")?;
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));
        let post = post(
            "2014-11-12-best-commit-messages-one-line.html.markdown",
            "best-commit-messages-one-line",
        );

        let route = router.post(&post)?;
        assert_eq!("blog/best-commit-messages-one-line/", route.permalink);
        assert_eq!(
            "https://example.org/blog/best-commit-messages-one-line/",
            route.url.as_str()
        );
        assert_eq!(
            Path::new("/out/blog/best-commit-messages-one-line/index.html"),
            route.file_path
        );
        assert_eq!(route, router.post(&post)?, "routing is deterministic");
        Ok(())
    }

    #[test]
    fn test_listing_routes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let permalinks = permalinks("{year}/{month}/{day}/{title}.html");
        let site_root = Url::parse("https://example.org/site/")?;
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));

        let tag = Tag::new("Ruby on Rails").unwrap();
        assert_eq!("tags/ruby-on-rails.html", router.tag(&tag)?.permalink);
        assert_eq!("2014.html", router.year(2014)?.permalink);
        let month = router.month(2014, 5)?;
        assert_eq!("2014/05.html", month.permalink);
        assert_eq!("https://example.org/site/2014/05.html", month.url.as_str());
        assert_eq!(Path::new("/out/2014/05.html"), month.file_path);

        assert_eq!(Path::new("/out/blog/index.html"), router.index_page(0)?.file_path);
        assert_eq!("blog/2.html", router.index_page(2)?.permalink);
        assert_eq!(Path::new("/out/feed.xml"), router.fixed("feed.xml")?.file_path);
        Ok(())
    }

    #[test]
    fn test_post_route_rejects_tag_placeholder() {
        let permalinks = permalinks("blog/{tag}/{title}.html");
        let site_root = Url::parse("https://example.org/").unwrap();
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));
        match router.post(&post("2014-11-12-x.md", "x")) {
            Err(Error::Pattern(pattern::Error::MissingField { .. })) => {}
            other => panic!("wanted missing field, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_dot_segments() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let permalinks = permalinks("blog/{title}/");
        let site_root = Url::parse("https://example.org/")?;
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));

        // `2014-11-13-...html.markdown` yields the title slug `..`, which
        // would otherwise land on the index page at `blog/index.html`
        match router.post(&post("2014-11-13-...html.markdown", "..")) {
            Err(Error::InvalidPermalink(permalink)) => assert_eq!("blog/../", permalink),
            other => panic!("wanted invalid permalink, got {:?}", other),
        }
        for bad in &["./feed.xml", "a/./b.html", "a//b.html", "../escape.html"] {
            assert!(
                matches!(router.fixed(bad), Err(Error::InvalidPermalink(_))),
                "{} should be rejected",
                bad
            );
        }
        assert_eq!(Path::new("/out/index.html"), router.fixed("/")?.file_path);
        Ok(())
    }

    #[test]
    fn test_collision_reports_both_sources() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let permalinks = permalinks("blog/{title}/");
        let site_root = Url::parse("https://example.org/")?;
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));
        let first = post("2014-11-12-hello.html.markdown", "hello");
        let second = post("2015-01-01-hello.html.markdown", "hello");

        let mut claims = Claims::default();
        claims.claim(&router.post(&first)?, "2014-11-12-hello.html.markdown")?;
        match claims.claim(&router.post(&second)?, "2015-01-01-hello.html.markdown") {
            Err(Error::Collision {
                permalink,
                first,
                second,
            }) => {
                assert_eq!("blog/hello/", permalink);
                assert_eq!("2014-11-12-hello.html.markdown", first);
                assert_eq!("2015-01-01-hello.html.markdown", second);
            }
            other => panic!("wanted collision, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_template_binding() {
        let templates = Templates {
            layout: PathBuf::from("layout.html"),
            index: PathBuf::from("index.html"),
            tag: PathBuf::from("tag.html"),
            calendar: PathBuf::from("calendar.html"),
        };
        assert_eq!(Path::new("layout.html"), PageKind::Post.template(&templates));
        assert_eq!(Path::new("tag.html"), PageKind::Tag.template(&templates));
        assert_eq!(Path::new("calendar.html"), PageKind::Calendar.template(&templates));
        assert_eq!(Path::new("index.html"), PageKind::Index.template(&templates));
    }
}
