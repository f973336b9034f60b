//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::markdown;
use crate::post::Post;
use crate::route::Route;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, Text};
use chrono::{NaiveDate, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// The fixed path of the feed, relative to the site root.
pub const FEED_PATH: &str = "feed.xml";

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub author: Option<&'a Author>,
    pub home_page: &'a Url,

    /// The URL the feed itself is published at.
    pub feed_url: &'a Url,

    /// The maximum number of entries, newest first.
    pub size: usize,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// posts (newest first) with their routes, and writes the result to a
/// [`std::io::Write`]. The feed's `updated` timestamp is the newest post's
/// date, so rebuilding unchanged sources yields an identical feed.
pub fn write_feed<W: Write>(config: &FeedConfig, posts: &[(&Post, &Route)], w: W) -> Result<()> {
    feed(config, posts)?.write_to(w)?;
    Ok(())
}

fn feed(config: &FeedConfig, posts: &[(&Post, &Route)]) -> Result<Feed> {
    let entries = posts
        .iter()
        .take(config.size)
        .map(|(post, route)| entry(config, post, route))
        .collect::<Result<Vec<Entry>>>()?;
    let updated = match posts.first() {
        Some((post, _)) => timestamp(post.date)?,
        None => timestamp(NaiveDate::from_ymd_opt(1970, 1, 1).ok_or(Error::InvalidDate)?)?,
    };

    let mut feed = Feed::default();
    feed.set_title(config.title);
    feed.set_id(config.home_page.to_string());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(config.author));
    feed.set_links(vec![
        link(config.home_page, "alternate"),
        link(config.feed_url, "self"),
    ]);
    feed.set_entries(entries);
    Ok(feed)
}

fn entry(config: &FeedConfig, post: &Post, route: &Route) -> Result<Entry> {
    let (summary, _) = post.summary();
    let date = timestamp(post.date)?;

    let mut entry = Entry::default();
    entry.set_id(route.url.to_string());
    entry.set_title(post.title.as_str());
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_authors(author_to_people(config.author));
    entry.set_links(vec![link(&route.url, "alternate")]);
    entry.set_summary(Some(Text::html(markdown::to_html(summary, 0))));
    entry.set_categories(
        post.tags
            .iter()
            .map(|tag| {
                let mut category = Category::default();
                category.set_term(tag.slug.as_str());
                category.set_label(Some(tag.name.clone()));
                category
            })
            .collect::<Vec<Category>>(),
    );
    Ok(entry)
}

// Posts carry only a date; they're treated as published at midnight UTC.
fn timestamp(date: NaiveDate) -> Result<FixedDateTime> {
    let midnight = date.and_hms_opt(0, 0, 0).ok_or(Error::InvalidDate)?;
    Ok(Utc.from_utc_datetime(&midnight).into())
}

fn link(url: &Url, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(url.to_string());
    link.set_rel(rel);
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants inlude I/O, Atom, and
/// date-time conversion issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a post's date can't be converted to a timestamp.
    InvalidDate,
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::InvalidDate => write!(f, "post date out of range"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::InvalidDate => None,
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn post(slug: &str, date: (i32, u32, u32)) -> Post {
        let (year, month, day) = date;
        Post::parse(
            PathBuf::from(format!("{}.md", slug)),
            NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            slug.to_owned(),
            &format!("---\ntitle: {}\ntags: rails\n---\nIntro\n\nREADMORE\n\nRest", slug),
            "READMORE",
        )
        .unwrap()
    }

    fn route(slug: &str) -> Route {
        Route {
            permalink: format!("blog/{}/", slug),
            url: Url::parse(&format!("https://example.org/blog/{}/", slug)).unwrap(),
            file_path: PathBuf::from(format!("/out/blog/{}/index.html", slug)),
        }
    }

    #[test]
    fn test_write_feed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let home_page = Url::parse("https://example.org/")?;
        let feed_url = home_page.join(FEED_PATH)?;
        let author = Author {
            name: "Ada".to_owned(),
            email: None,
        };
        let config = FeedConfig {
            title: "Commit Log",
            author: Some(&author),
            home_page: &home_page,
            feed_url: &feed_url,
            size: 1,
        };
        let (newer, older) = (post("newer", (2014, 11, 12)), post("older", (2014, 5, 4)));
        let (newer_route, older_route) = (route("newer"), route("older"));
        let posts = vec![(&newer, &newer_route), (&older, &older_route)];

        let mut out = Vec::new();
        write_feed(&config, &posts, &mut out)?;
        let xml = String::from_utf8(out)?;

        assert!(xml.contains("<title>Commit Log</title>"));
        assert!(xml.contains("https://example.org/blog/newer/"));
        assert!(!xml.contains("https://example.org/blog/older/"), "feed size is 1");
        assert!(xml.contains("2014-11-12T00:00:00"));
        assert!(xml.contains("<name>Ada</name>"));
        assert!(xml.contains("term=\"rails\""));

        let mut again = Vec::new();
        write_feed(&config, &posts, &mut again)?;
        assert_eq!(xml.as_bytes(), again.as_slice(), "feeds are reproducible");
        Ok(())
    }
}
