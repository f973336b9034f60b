//! Groups posts for listing pages: by tag ([`index_tags`]), by year and
//! month ([`index_calendar`]), and into fixed-size pages for the home index
//! ([`paginate`]). Every grouping keeps posts newest first (see
//! [`crate::post::newest_first`]) regardless of the order it's given.

use crate::post::{newest_first, Post};
use crate::tag::Tag;
use std::collections::BTreeMap;

/// The posts carrying one tag.
#[derive(Debug)]
pub struct TagGroup<'a> {
    /// The tag as first encountered (newest post first).
    pub tag: &'a Tag,

    /// The posts carrying the tag, newest first.
    pub posts: Vec<&'a Post>,
}

/// Indexes a list of [`Post`] objects by tag slug. A post appears in each of
/// its tags' groups exactly once.
pub fn index_tags<'a>(posts: &'a [Post]) -> BTreeMap<String, TagGroup<'a>> {
    let mut indices: BTreeMap<String, TagGroup> = BTreeMap::new();
    for post in sorted(posts) {
        for tag in post.tags.iter() {
            let group = indices.entry(tag.slug.clone()).or_insert_with(|| TagGroup {
                tag,
                posts: Vec::new(),
            });
            if !group.posts.iter().any(|p| std::ptr::eq(*p, post)) {
                group.posts.push(post);
            }
        }
    }
    indices
}

/// Posts grouped by year and by month.
#[derive(Debug, Default)]
pub struct Calendar<'a> {
    pub years: BTreeMap<i32, Vec<&'a Post>>,
    pub months: BTreeMap<(i32, u32), Vec<&'a Post>>,
}

/// Indexes a list of [`Post`] objects by year and by (year, month).
pub fn index_calendar<'a>(posts: &'a [Post]) -> Calendar<'a> {
    let mut calendar = Calendar::default();
    for post in sorted(posts) {
        calendar.years.entry(post.year()).or_default().push(post);
        calendar
            .months
            .entry((post.year(), post.month()))
            .or_default()
            .push(post);
    }
    calendar
}

/// Splits `posts` into pages of at most `page_size` posts. There is always
/// at least one page, so an empty site still gets a home page.
pub fn paginate<'a, 'p>(posts: &'p [&'a Post], page_size: usize) -> Vec<&'p [&'a Post]> {
    match posts.is_empty() {
        true => vec![posts],
        false => posts.chunks(page_size.max(1)).collect(),
    }
}

fn sorted(posts: &[Post]) -> Vec<&Post> {
    let mut sorted: Vec<&Post> = posts.iter().collect();
    sorted.sort_by(|a, b| newest_first(a, b));
    sorted
}
