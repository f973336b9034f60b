//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use std::hash::{Hash, Hasher};

/// Represents a [`crate::post::Post`] tag. The `name` is kept as the author
/// wrote it for display, while the `slug` identifies the tag and is what
/// lands in tag page permalinks.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as written in the post's frontmatter (trimmed).
    pub name: String,

    /// The slugified name, so e.g. `macOS` and `MacOS` resolve to the same
    /// tag, and the value can be dropped into a permalink.
    pub slug: String,
}

impl Tag {
    /// Creates a tag from its written name. Returns `None` if the name has no
    /// characters that survive slugification.
    pub fn new(name: &str) -> Option<Tag> {
        let name = name.trim();
        let slug = slug::slugify(name);
        match slug.is_empty() {
            true => None,
            false => Some(Tag {
                name: name.to_owned(),
                slug,
            }),
        }
    }

    /// Parses a comma-separated tag list (`rails, git`) into tags, dropping
    /// empty entries and duplicates while keeping the first occurrence.
    pub fn parse_list<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Tag> {
        let mut tags: Vec<Tag> = Vec::new();
        for tag in names.into_iter().flat_map(|n| n.split(',')).filter_map(Tag::new) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}
