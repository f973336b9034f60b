//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), routing and rendering post, index, tag, and calendar
//! pages ([`crate::write`]), copying the asset directories into the output
//! directory, and generating the Atom feed ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig, FEED_PATH};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::post::Post;
use crate::route::{Claims, Error as RouteError, PageKind, Route, Router};
use crate::value::{link, string};
use crate::write::{Error as WriteError, TemplateSet, Writer};
use gtmpl::{Template, Value};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a build produced.
#[derive(Debug, PartialEq, Eq)]
pub struct Summary {
    pub posts: usize,
    pub pages: usize,
}

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`Writer::plan`], [`Writer::write`], and
/// [`write_feed`] which do the heavy-lifting. This function also copies the
/// asset directories from the source directory to the output directory. Any
/// error aborts the build.
pub fn build_site(config: &Config) -> Result<Summary> {
    // collect all posts
    let posts = parse_posts(config)?;
    info!("parsed {} posts", posts.len());

    // Parse the template files before touching the output directory so a
    // broken theme doesn't leave us with an empty site.
    let mut templates = TemplateSet::new();
    for kind in &[PageKind::Post, PageKind::Index, PageKind::Tag, PageKind::Calendar] {
        let files = config
            .partials
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(kind.template(&config.templates)));
        templates.insert(*kind, parse_template(files)?);
    }

    // Route every page (and check for collisions) before touching the output
    // directory.
    let router = Router::new(&config.permalinks, &config.site_root, &config.output_directory);
    let feed_route = router.fixed(FEED_PATH)?;
    let mut claims = Claims::default();
    claims.claim(&feed_route, "the feed")?;
    let site = site_values(config, &router, &feed_route)?;
    let writer = Writer {
        templates: &templates,
        router: &router,
        index_page_size: config.index_page_size,
        site: &site,
    };
    let plan = writer.plan(&posts, &mut claims)?;
    debug!("routed {} pages", plan.len());
    let assets = route_assets(config, &router, &mut claims)?;
    debug!("routed {} asset files", assets.len());

    // Blow away the old output directory so we don't have any stale pages
    // from posts that have since been renamed or removed. Only directories
    // carrying our watermark (or empty ones) are deleted, in case the wrong
    // output directory was passed.
    clean_output_directory(&config.output_directory)?;

    // write the post, index, tag, and calendar pages
    let pages = writer.write(&plan)?;
    info!("wrote {} pages", pages);

    // copy asset files
    for (src, route) in &assets {
        if let Some(dir) = route.file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(src, &route.file_path)?;
    }
    info!("copied {} asset files", assets.len());

    // create the atom feed
    let entries: Vec<(&Post, &Route)> = posts.iter().zip(plan.post_routes()).collect();
    write_feed(
        &FeedConfig {
            title: &config.title,
            author: config.author.as_ref(),
            home_page: &config.site_root,
            feed_url: &feed_route.url,
            size: config.feed_size,
        },
        &entries,
        File::create(&feed_route.file_path)?,
    )?;
    info!("wrote feed to {}", feed_route.file_path.display());

    Ok(Summary {
        posts: posts.len(),
        pages,
    })
}

/// Parses every post under the configured source directory, newest first.
pub fn parse_posts(config: &Config) -> Result<Vec<Post>> {
    let parser = PostParser::new(&config.sources, &config.excerpt_marker, config.show_drafts)
        .exclude(config.assets.iter());
    Ok(parser.parse_posts(&config.source_directory)?)
}

/// Resolves the route of every post without writing anything, failing on the
/// first permalink collision.
pub fn resolve_routes(config: &Config, posts: &[Post]) -> Result<Vec<Route>> {
    let router = Router::new(&config.permalinks, &config.site_root, &config.output_directory);
    let mut claims = Claims::default();
    let mut routes = Vec::with_capacity(posts.len());
    for post in posts {
        let route = router.post(post)?;
        claims.claim(&route, post.source_path.display().to_string())?;
        routes.push(route);
    }
    Ok(routes)
}

// The values every template sees at the top level: the site title, links, and
// the settings of the commenting and analytics integrations.
fn site_values(config: &Config, router: &Router, feed_route: &Route) -> Result<HashMap<String, Value>> {
    let mut site = HashMap::new();
    site.insert("site_title".to_owned(), string(config.title.as_str()));
    site.insert("home_page".to_owned(), link(&router.index_page(0)?.url));
    site.insert("site_root".to_owned(), link(&config.site_root));
    site.insert("feed_url".to_owned(), link(&feed_route.url));
    let assets = [
        ("css_url", &config.assets.css),
        ("js_url", &config.assets.js),
        ("images_url", &config.assets.images),
    ];
    for (key, dir) in assets.iter() {
        let dir = format!("{}/", dir.to_string_lossy().trim_end_matches('/'));
        site.insert((*key).to_owned(), link(&router.fixed(&dir)?.url));
    }
    site.insert("comments_enabled".to_owned(), Value::Bool(config.comments.enabled));
    site.insert(
        "comments_shortname".to_owned(),
        string(config.comments.parameter.clone().unwrap_or_default()),
    );
    site.insert("analytics_enabled".to_owned(), Value::Bool(config.analytics.enabled));
    site.insert(
        "analytics_id".to_owned(),
        string(config.analytics.parameter.clone().unwrap_or_default()),
    );
    Ok(site)
}

// Routes and claims every file under the asset directories, so an asset can't
// silently replace a generated page. Returns each source file with its route.
fn route_assets(config: &Config, router: &Router, claims: &mut Claims) -> Result<Vec<(PathBuf, Route)>> {
    let mut assets = Vec::new();
    for dir in config.assets.iter() {
        let src = config.source_directory.join(dir);
        if !src.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&src).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix() should never fail since WalkDir yields
            // descendants of the source directory
            let relative = match entry.path().strip_prefix(&config.source_directory) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let permalink = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let route = router.fixed(&permalink)?;
            claims.claim(&route, format!("asset `{}`", permalink))?;
            assets.push((entry.path().to_owned(), route));
        }
    }
    Ok(assets)
}

// Loads the template file contents, joins them with newlines, and parses the
// result into a template. Output ends exactly where the last file does.
fn parse_template<'a>(template_files: impl Iterator<Item = &'a Path>) -> Result<Template> {
    let mut sources = Vec::new();
    for template_file in template_files {
        let source =
            std::fs::read_to_string(template_file).map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?;
        sources.push(source);
    }

    let mut template = Template::default();
    template
        .parse(&sources.join("\n"))
        .map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, routing,
/// writing, cleaning the output directory, parsing template files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors resolving routes, including permalink collisions.
    Route(RouteError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the output directory has content but wasn't created by
    /// a previous build.
    NotOutputDirectory(PathBuf),

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for errors walking the asset directories.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Route(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::NotOutputDirectory(path) => write!(
                f,
                "Refusing to clean '{}': it isn't empty and has no `{}` file",
                path.display(),
                WATERMARK
            ),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Route(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::NotOutputDirectory(_) => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<RouteError> for Error {
    /// Converts [`RouteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: RouteError) -> Error {
        Error::Route(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

/// The file that marks a directory as created by `datepress`.
const WATERMARK: &str = ".datepress";

fn clean_output_directory(dir: &Path) -> Result<()> {
    if dir.is_dir() && !dir.join(WATERMARK).is_file() && std::fs::read_dir(dir)?.next().is_some() {
        return Err(Error::NotOutputDirectory(dir.to_owned()));
    }
    rmdir(dir)?;
    std::fs::create_dir_all(dir)?;
    File::create(dir.join(WATERMARK))?;
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
