//! Loads the immutable [`Config`] for a build from a `datepress.yaml`
//! project file, applying the overrides of the selected environment.

use crate::pattern::{Field, Pattern};
use crate::route::{Permalinks, Templates};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "datepress.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

/// The site author, credited in the feed.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

/// A third-party integration (comments, analytics) reduced to an on/off
/// switch and a single parameter such as a site shortname or tracking ID.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginSetting {
    pub enabled: bool,
    pub parameter: Option<String>,
}

#[derive(Deserialize, Clone, Default)]
struct Plugin {
    #[serde(default)]
    enabled: Option<bool>,

    #[serde(default, alias = "id", alias = "shortname")]
    parameter: Option<String>,
}

impl Plugin {
    fn merge(&mut self, other: &Plugin) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.parameter.is_some() {
            self.parameter = other.parameter.clone();
        }
    }

    // A plugin with a parameter is on unless explicitly disabled.
    fn setting(&self) -> PluginSetting {
        PluginSetting {
            enabled: self.enabled.unwrap_or_else(|| self.parameter.is_some()),
            parameter: self.parameter.clone(),
        }
    }
}

/// The asset directories, relative to the source directory. Each one is
/// copied to the same name under the output directory.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Assets {
    #[serde(default = "Assets::default_css")]
    pub css: PathBuf,
    #[serde(default = "Assets::default_js")]
    pub js: PathBuf,
    #[serde(default = "Assets::default_images")]
    pub images: PathBuf,
}

impl Assets {
    fn default_css() -> PathBuf {
        PathBuf::from("stylesheets")
    }

    fn default_js() -> PathBuf {
        PathBuf::from("javascripts")
    }

    fn default_images() -> PathBuf {
        PathBuf::from("images")
    }

    /// Iterates over the asset directories.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        vec![self.css.as_path(), self.js.as_path(), self.images.as_path()].into_iter()
    }
}

impl Default for Assets {
    fn default() -> Self {
        Assets {
            css: Assets::default_css(),
            js: Assets::default_js(),
            images: Assets::default_images(),
        }
    }
}

#[derive(Deserialize)]
struct Theme {
    #[serde(default = "Theme::default_directory")]
    directory: PathBuf,
    #[serde(default = "Theme::default_layout")]
    layout: PathBuf,
    #[serde(default = "Theme::default_index")]
    index: PathBuf,
    #[serde(default = "Theme::default_tag")]
    tag: PathBuf,
    #[serde(default = "Theme::default_calendar")]
    calendar: PathBuf,

    /// Files prepended to every template, e.g. shared `{{define}}` blocks.
    #[serde(default)]
    partials: Vec<PathBuf>,
}

impl Theme {
    fn default_directory() -> PathBuf {
        PathBuf::from("templates")
    }
    fn default_layout() -> PathBuf {
        PathBuf::from("layout.html")
    }
    fn default_index() -> PathBuf {
        PathBuf::from("index.html")
    }
    fn default_tag() -> PathBuf {
        PathBuf::from("tag.html")
    }
    fn default_calendar() -> PathBuf {
        PathBuf::from("calendar.html")
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            directory: Theme::default_directory(),
            layout: Theme::default_layout(),
            index: Theme::default_index(),
            tag: Theme::default_tag(),
            calendar: Theme::default_calendar(),
            partials: Vec::new(),
        }
    }
}

/// Settings an environment may override.
#[derive(Deserialize, Default)]
struct Overrides {
    #[serde(default)]
    site_root: Option<Url>,
    #[serde(default)]
    show_drafts: Option<bool>,
    #[serde(default)]
    comments: Plugin,
    #[serde(default)]
    analytics: Plugin,
}

fn pattern(s: &str) -> Pattern {
    // the defaults below are known to parse
    Pattern::parse(s).unwrap_or_else(|e| panic!("invalid default pattern: {}", e))
}

#[derive(Deserialize)]
struct Project {
    title: String,
    site_root: Url,
    #[serde(default)]
    author: Option<Author>,

    #[serde(default = "Project::default_source")]
    source: PathBuf,
    #[serde(default = "Project::default_sources")]
    sources: Pattern,
    #[serde(default = "Project::default_permalink")]
    permalink: Pattern,
    #[serde(default = "Project::default_tag_link")]
    tag_link: Pattern,
    #[serde(default = "Project::default_year_link")]
    year_link: Pattern,
    #[serde(default = "Project::default_month_link")]
    month_link: Pattern,
    #[serde(default = "Project::default_index_link")]
    index_link: Pattern,

    #[serde(default)]
    theme: Theme,
    #[serde(default = "Project::default_excerpt_marker")]
    excerpt_marker: String,
    #[serde(default)]
    index_page_size: PageSize,
    #[serde(default)]
    feed_size: PageSize,
    #[serde(default)]
    assets: Assets,

    #[serde(default)]
    comments: Plugin,
    #[serde(default)]
    analytics: Plugin,
    #[serde(default)]
    show_drafts: bool,

    #[serde(default)]
    environments: HashMap<String, Overrides>,
}

impl Project {
    fn default_source() -> PathBuf {
        PathBuf::from("source")
    }
    fn default_sources() -> Pattern {
        pattern("{year}-{month}-{day}-{title}.html")
    }
    fn default_permalink() -> Pattern {
        pattern("{year}/{month}/{day}/{title}.html")
    }
    fn default_tag_link() -> Pattern {
        pattern("tags/{tag}.html")
    }
    fn default_year_link() -> Pattern {
        pattern("{year}.html")
    }
    fn default_month_link() -> Pattern {
        pattern("{year}/{month}.html")
    }
    fn default_index_link() -> Pattern {
        pattern("index.html")
    }
    fn default_excerpt_marker() -> String {
        String::from("READMORE")
    }

    // Rejects patterns that use placeholders their page kind can't supply, or
    // that lack the ones needed to tell pages apart.
    fn validate(&self) -> Result<()> {
        use Field::*;
        let checks: [(&str, &Pattern, &[Field], &[Field]); 6] = [
            ("sources", &self.sources, &[Year, Month, Day, Title], &[Year, Month, Day, Title]),
            ("permalink", &self.permalink, &[Year, Month, Day, Title], &[]),
            ("tag_link", &self.tag_link, &[Tag], &[Tag]),
            ("year_link", &self.year_link, &[Year], &[Year]),
            ("month_link", &self.month_link, &[Year, Month], &[Year, Month]),
            ("index_link", &self.index_link, &[], &[]),
        ];
        for (key, pattern, allowed, required) in checks.iter() {
            pattern
                .restrict(allowed)
                .and_then(|_| pattern.require(required))
                .with_context(|| format!("Invalid `{}`", key))?;
        }
        Ok(())
    }
}

/// The settings for one build. Built once at start-up and never mutated.
#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub author: Option<Author>,

    /// The site's base URL, always ending in `/`.
    pub site_root: Url,

    pub source_directory: PathBuf,
    pub output_directory: PathBuf,

    /// The pattern every markdown source path must match.
    pub sources: Pattern,
    pub permalinks: Permalinks,
    pub templates: Templates,
    pub partials: Vec<PathBuf>,

    pub excerpt_marker: String,
    pub index_page_size: usize,
    pub feed_size: usize,
    pub assets: Assets,

    pub comments: PluginSetting,
    pub analytics: PluginSetting,
    pub show_drafts: bool,
}

impl Config {
    /// Searches `dir` and its ancestors for a project file and loads it.
    pub fn from_directory(
        dir: &Path,
        output_directory: Option<&Path>,
        environment: Option<&str>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory, environment)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, environment),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads the project file at `path`. The output directory defaults to
    /// `build` beside the project file.
    pub fn from_project_file(
        path: &Path,
        output_directory: Option<&Path>,
        environment: Option<&str>,
    ) -> Result<Config> {
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        let yaml = crate::util::read(path, "project")?;
        let output_directory = match output_directory {
            Some(dir) => dir.to_owned(),
            None => project_root.join("build"),
        };
        Config::from_yaml(&yaml, project_root, output_directory, environment)
    }

    /// Builds a config from project YAML. Relative paths are resolved against
    /// `project_root`.
    pub fn from_yaml(
        yaml: &str,
        project_root: &Path,
        output_directory: PathBuf,
        environment: Option<&str>,
    ) -> Result<Config> {
        let mut project: Project = serde_yaml::from_str(yaml)?;
        project.validate()?;

        if let Some(name) = environment {
            let overrides = project
                .environments
                .remove(name)
                .ok_or_else(|| anyhow!("Unknown environment `{}`", name))?;
            if let Some(site_root) = overrides.site_root {
                project.site_root = site_root;
            }
            if let Some(show_drafts) = overrides.show_drafts {
                project.show_drafts = show_drafts;
            }
            project.comments.merge(&overrides.comments);
            project.analytics.merge(&overrides.analytics);
        }

        let source_directory = project_root.join(&project.source);
        let theme_dir = project_root.join(&project.theme.directory);
        Ok(Config {
            title: project.title,
            author: project.author,
            site_root: with_trailing_slash(project.site_root),
            source_directory,
            output_directory,
            sources: project.sources,
            permalinks: Permalinks {
                post: project.permalink,
                tag: project.tag_link,
                year: project.year_link,
                month: project.month_link,
                index: project.index_link,
            },
            templates: Templates {
                layout: theme_dir.join(&project.theme.layout),
                index: theme_dir.join(&project.theme.index),
                tag: theme_dir.join(&project.theme.tag),
                calendar: theme_dir.join(&project.theme.calendar),
            },
            partials: project
                .theme
                .partials
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            excerpt_marker: project.excerpt_marker,
            index_page_size: project.index_page_size.0.max(1),
            feed_size: project.feed_size.0,
            assets: project.assets,
            comments: project.comments.setting(),
            analytics: project.analytics.setting(),
            show_drafts: project.show_drafts,
        })
    }
}

// `Url::join` treats the last path segment as a file name unless the base
// ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
