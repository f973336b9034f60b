//! Responsible for routing, templating, and writing HTML pages to disk from
//! [`Post`] sources. Every page is routed (and checked for permalink
//! collisions) before the first file is written, so a routing error never
//! leaves a half-written site behind.

use crate::index::{index_calendar, index_tags, paginate};
use crate::post::Post;
use crate::route::{self, Claims, PageKind, Route, Router};
use crate::value::{self, object, optional_link, string, PostValue};
use gtmpl::{Template, Value};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// The parsed template for each [`PageKind`].
pub type TemplateSet = HashMap<PageKind, Template>;

/// Responsible for indexing, templating, and writing HTML pages to disk.
pub struct Writer<'a> {
    /// The templates pages are rendered with.
    pub templates: &'a TemplateSet,

    /// Resolves the route of every page.
    pub router: &'a Router<'a>,

    /// The number of posts per home index page.
    pub index_page_size: usize,

    /// Site-wide values (title, home page, asset URLs, plugin settings) made
    /// available to every template at the top level.
    pub site: &'a HashMap<String, Value>,
}

/// An object representing an output HTML file. A [`Page`] can be converted to
/// a [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page {
    /// Which template renders the page.
    kind: PageKind,

    /// The main item for the page.
    item: Value,

    /// Where the page is written.
    route: Route,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,
}

impl Page {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `url`, `prev`, and `next`.
    fn to_value(&self) -> Value {
        object(vec![
            ("item", self.item.clone()),
            ("url", value::link(&self.route.url)),
            ("prev", optional_link(self.prev.as_ref())),
            ("next", optional_link(self.next.as_ref())),
        ])
    }
}

/// Every routed page of a site, ready to be written.
pub struct Plan {
    pages: Vec<Page>,
}

impl Plan {
    /// The number of pages in the plan.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// The routes of the post pages, in the order the posts were given.
    pub fn post_routes(&self) -> Vec<&Route> {
        self.pages
            .iter()
            .filter(|page| page.kind == PageKind::Post)
            .map(|page| &page.route)
            .collect()
    }

    /// Whether the plan has no pages. A plan always has at least the first
    /// home index page.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let template = self
            .templates
            .get(&page.kind)
            .ok_or_else(|| Error::Template(format!("no template for {:?} pages", page.kind)))?;
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            for (key, site_value) in self.site.iter() {
                obj.insert(key.clone(), site_value.clone());
            }
        }

        debug!("writing {}", page.route.file_path.display());
        let io_err = |err| Error::Io {
            path: page.route.file_path.clone(),
            err,
        };
        let mut file = std::fs::File::create(&page.route.file_path).map_err(io_err)?;
        template.execute(&mut file, &gtmpl::Context::from(value)?)?;
        Ok(())
    }

    /// Takes a slice of [`Post`] (newest first) and routes every post,
    /// index, tag, and calendar page without writing anything. Output files
    /// already recorded in `claims` (and any two pages of this site that
    /// resolve to the same file) are reported as collisions.
    pub fn plan(&self, posts: &[Post], claims: &mut Claims) -> Result<Plan> {
        Ok(Plan {
            pages: self.pages(posts, claims)?,
        })
    }

    /// Templates every page of a [`Plan`] and writes it to disk. Returns the
    /// number of pages written.
    pub fn write(&self, plan: &Plan) -> Result<usize> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in &plan.pages {
            if let Some(dir) = page.route.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                        path: dir.to_owned(),
                        err,
                    })?;
                }
            }
            self.write_page(page)?;
        }
        Ok(plan.pages.len())
    }

    /// Routes and builds every [`Page`] for a set of [`Post`]s.
    fn pages(&self, posts: &[Post], claims: &mut Claims) -> Result<Vec<Page>> {
        let mut routes = Vec::with_capacity(posts.len());
        for post in posts {
            let route = self.router.post(post)?;
            claims.claim(&route, post.source_path.display().to_string())?;
            routes.push(route);
        }

        let tags = index_tags(posts);
        let mut tag_routes: HashMap<&str, Route> = HashMap::new();
        for (slug, group) in tags.iter() {
            let route = self.router.tag(group.tag)?;
            claims.claim(&route, format!("tag page `{}`", slug))?;
            tag_routes.insert(slug.as_str(), route);
        }

        let values: Vec<PostValue> = posts
            .iter()
            .zip(routes.iter())
            .map(|(post, route)| {
                let tags = post
                    .tags
                    .iter()
                    .filter_map(|t| tag_routes.get(t.slug.as_str()).map(|r| value::tag(t, &r.url)))
                    .collect();
                PostValue::new(post, route, tags)
            })
            .collect();
        let by_source: HashMap<&Path, &PostValue> = posts
            .iter()
            .map(|p| p.source_path.as_path())
            .zip(values.iter())
            .collect();
        let summaries = |posts: &[&Post]| -> Value {
            Value::Array(
                posts
                    .iter()
                    .filter_map(|p| by_source.get(p.source_path.as_path()))
                    .map(|v| v.summary())
                    .collect(),
            )
        };

        let mut pages = Vec::new();

        // post pages
        for (i, (post_value, route)) in values.iter().zip(routes.iter()).enumerate() {
            pages.push(Page {
                kind: PageKind::Post,
                item: post_value.full(),
                route: route.clone(),
                prev: match i {
                    0 => None,
                    _ => Some(routes[i - 1].url.clone()),
                },
                next: routes.get(i + 1).map(|r| r.url.clone()),
            });
        }

        // home index pages
        let all: Vec<&Post> = posts.iter().collect();
        let chunks = paginate(&all, self.index_page_size);
        let index_routes = (0..chunks.len())
            .map(|i| self.router.index_page(i))
            .collect::<route::Result<Vec<Route>>>()?;
        for (i, chunk) in chunks.into_iter().enumerate() {
            claims.claim(&index_routes[i], format!("index page {}", i))?;
            pages.push(Page {
                kind: PageKind::Index,
                item: summaries(chunk),
                route: index_routes[i].clone(),
                prev: match i {
                    0 => None,
                    _ => Some(index_routes[i - 1].url.clone()),
                },
                next: index_routes.get(i + 1).map(|r| r.url.clone()),
            });
        }

        // tag pages
        for (slug, group) in tags.iter() {
            let route = tag_routes[slug.as_str()].clone();
            pages.push(Page {
                kind: PageKind::Tag,
                item: object(vec![
                    ("tag", value::tag(group.tag, &route.url)),
                    ("posts", summaries(group.posts.as_slice())),
                ]),
                route,
                prev: None,
                next: None,
            });
        }

        // calendar pages
        let calendar = index_calendar(posts);
        for (year, group) in calendar.years.iter() {
            let route = self.router.year(*year)?;
            claims.claim(&route, format!("calendar page {:04}", year))?;
            pages.push(Page {
                kind: PageKind::Calendar,
                item: object(vec![
                    ("year", string(format!("{:04}", year))),
                    ("month", Value::Nil),
                    ("posts", summaries(group.as_slice())),
                ]),
                route,
                prev: None,
                next: None,
            });
        }
        for ((year, month), group) in calendar.months.iter() {
            let route = self.router.month(*year, *month)?;
            claims.claim(&route, format!("calendar page {:04}-{:02}", year, month))?;
            pages.push(Page {
                kind: PageKind::Calendar,
                item: object(vec![
                    ("year", string(format!("{:04}", year))),
                    ("month", string(format!("{:02}", month))),
                    ("posts", summaries(group.as_slice())),
                ]),
                route,
                prev: None,
                next: None,
            });
        }

        Ok(pages)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error resolving or claiming a page's route.
    Route(route::Error),

    /// An error writing the output files.
    Io { path: PathBuf, err: io::Error },
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<route::Error> for Error {
    /// Converts a [`route::Error`] into an [`Error`].
    fn from(err: route::Error) -> Error {
        Error::Route(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Route(err) => err.fmt(f),
            Error::Io { path, err } => write!(f, "writing `{}`: {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Route(err) => Some(err),
            Error::Io { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pattern::Pattern;
    use crate::route::Permalinks;
    use chrono::NaiveDate;

    fn post(slug: &str, date: (i32, u32, u32), tags: &str) -> Post {
        let (year, month, day) = date;
        Post::parse(
            PathBuf::from(format!("{:04}-{:02}-{:02}-{}.md", year, month, day, slug)),
            NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            slug.to_owned(),
            &format!("---\ntitle: {}\ntags: {}\n---\nbody", slug, tags),
            "READMORE",
        )
        .unwrap()
    }

    fn permalinks(post: &str, tag: &str) -> Permalinks {
        Permalinks {
            post: Pattern::parse(post).unwrap(),
            tag: Pattern::parse(tag).unwrap(),
            year: Pattern::parse("{year}.html").unwrap(),
            month: Pattern::parse("{year}/{month}.html").unwrap(),
            index: Pattern::parse("index.html").unwrap(),
        }
    }

    fn routed_files(permalinks: &Permalinks, posts: &[Post]) -> Result<Vec<PathBuf>> {
        let templates = TemplateSet::new();
        let site_root = Url::parse("https://example.org/").unwrap();
        let router = Router::new(permalinks, &site_root, Path::new("/out"));
        let site = HashMap::new();
        let writer = Writer {
            templates: &templates,
            router: &router,
            index_page_size: 2,
            site: &site,
        };
        let pages = writer.pages(posts, &mut Claims::default())?;
        Ok(pages.into_iter().map(|p| p.route.file_path).collect())
    }

    #[test]
    fn test_pages() -> Result<()> {
        let posts = vec![
            post("c", (2014, 11, 12), "rails"),
            post("b", (2014, 5, 4), "rails, git"),
            post("a", (2013, 1, 1), ""),
        ];
        let files = routed_files(&permalinks("blog/{title}/", "tags/{tag}.html"), &posts)?;
        let wanted: Vec<PathBuf> = vec![
            "/out/blog/c/index.html",
            "/out/blog/b/index.html",
            "/out/blog/a/index.html",
            "/out/index.html",
            "/out/1.html",
            "/out/tags/git.html",
            "/out/tags/rails.html",
            "/out/2013.html",
            "/out/2014.html",
            "/out/2013/01.html",
            "/out/2014/05.html",
            "/out/2014/11.html",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(wanted, files);
        Ok(())
    }

    #[test]
    fn test_plan_post_routes() -> Result<()> {
        let posts = vec![post("b", (2014, 11, 12), "rails"), post("a", (2013, 1, 1), "")];
        let permalinks = permalinks("blog/{title}/", "tags/{tag}.html");
        let templates = TemplateSet::new();
        let site_root = Url::parse("https://example.org/").unwrap();
        let router = Router::new(&permalinks, &site_root, Path::new("/out"));
        let site = HashMap::new();
        let writer = Writer {
            templates: &templates,
            router: &router,
            index_page_size: 10,
            site: &site,
        };

        let plan = writer.plan(&posts, &mut Claims::default())?;
        let permalinks: Vec<&str> = plan
            .post_routes()
            .into_iter()
            .map(|route| route.permalink.as_str())
            .collect();
        assert_eq!(vec!["blog/b/", "blog/a/"], permalinks);
        assert_eq!(8, plan.len(), "2 posts, 1 index, 1 tag, 2 years, 2 months");
        Ok(())
    }

    #[test]
    fn test_post_collision() {
        let posts = vec![post("same", (2014, 11, 12), ""), post("same", (2013, 1, 1), "")];
        match routed_files(&permalinks("blog/{title}/", "tags/{tag}.html"), &posts) {
            Err(Error::Route(route::Error::Collision { first, second, .. })) => {
                assert_eq!("2014-11-12-same.md", first);
                assert_eq!("2013-01-01-same.md", second);
            }
            other => panic!("wanted collision, got {:?}", other),
        }
    }

    #[test]
    fn test_tag_page_collides_with_post() {
        let posts = vec![post("rails", (2014, 11, 12), "rails")];
        match routed_files(&permalinks("{title}.html", "{tag}.html"), &posts) {
            Err(Error::Route(route::Error::Collision { permalink, .. })) => {
                assert_eq!("rails.html", permalink);
            }
            other => panic!("wanted collision, got {:?}", other),
        }
    }
}
