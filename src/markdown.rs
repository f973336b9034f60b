//! Converts post markdown into HTML with [`pulldown_cmark`].

use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// Converts `markdown` to HTML. Headings are demoted by `heading_offset`
/// levels (capped at `h6`) so that a post's `#` sits below the site and post
/// titles in the page template.
pub fn to_html(markdown: &str, heading_offset: u32) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let demote = |level: u32| (level + heading_offset).min(6);
    let events = Parser::new_ext(markdown, options).map(|ev| match ev {
        Event::Start(Tag::Heading(level)) => Event::Start(Tag::Heading(demote(level))),
        Event::End(Tag::Heading(level)) => Event::End(Tag::Heading(demote(level))),
        _ => ev,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}
