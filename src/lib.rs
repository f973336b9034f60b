//! The library code for the `datepress` static blog generator. A build has
//! two distinct steps:
//!
//! 1. Parsing posts from dated source files on disk ([`crate::parser`])
//! 2. Routing and rendering the posts into output files ([`crate::write`])
//!
//! Every post's source path encodes its date and title slug (e.g.
//! `2014-11-12-best-commit-messages-one-line.html.markdown`), recovered by
//! matching it against the source [`pattern::Pattern`]. The route resolver
//! ([`crate::route`]) renders the same kind of pattern back out to produce
//! permalinks for posts, and for the index pages generated from them: the
//! paginated home index, one page per tag, and one page per year and month
//! ([`crate::index`]).
//!
//! Routing happens for the whole site before anything is written, so an
//! authoring mistake (a malformed file name, a missing title, two posts
//! claiming the same permalink) stops the build without a half-written site.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod excerpt;
pub mod feed;
pub mod index;
pub mod markdown;
pub mod parser;
pub mod pattern;
pub mod post;
pub mod route;
pub mod tag;
pub mod value;
pub mod write;

mod util;
