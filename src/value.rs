//! Conversions from the site model into template [`Value`]s.

use crate::markdown;
use crate::post::Post;
use crate::route::Route;
use crate::tag::Tag;
use gtmpl_value::Value;
use std::collections::HashMap;
use url::Url;

/// Posts' own headings start at `h3`, beneath the site (`h1`) and post
/// (`h2`) titles.
const HEADING_OFFSET: u32 = 2;

/// Builds a [`Value::Object`] from key/value pairs.
pub fn object(pairs: Vec<(&str, Value)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

pub fn string(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

pub fn link(url: &Url) -> Value {
    Value::String(url.to_string())
}

pub fn optional_link(url: Option<&Url>) -> Value {
    match url {
        Some(url) => link(url),
        None => Value::Nil,
    }
}

/// Converts a [`Tag`] and its page URL into a [`Value`] with fields `tag`
/// (the slug), `name`, and `url`.
pub fn tag(tag: &Tag, url: &Url) -> Value {
    object(vec![
        ("tag", string(tag.slug.as_str())),
        ("name", string(tag.name.as_str())),
        ("url", link(url)),
    ])
}

/// The template-facing rendering of a post: its route, its tags' values, and
/// its markdown converted to HTML once.
pub struct PostValue {
    /// The fields shared by listing pages and the post's own page.
    summary: HashMap<String, Value>,

    /// The full body as HTML.
    body: String,
}

impl PostValue {
    /// Renders `post`. `tags` must hold one value per post tag (see [`tag`]).
    pub fn new(post: &Post, route: &Route, tags: Vec<Value>) -> PostValue {
        let (summary, summarized) = post.summary();
        let mut fields = HashMap::new();
        fields.insert("title".to_owned(), string(post.title.as_str()));
        fields.insert("url".to_owned(), link(&route.url));
        fields.insert("permalink".to_owned(), string(route.permalink.as_str()));
        fields.insert("date".to_owned(), string(post.date.format("%Y-%m-%d").to_string()));
        fields.insert("year".to_owned(), string(format!("{:04}", post.year())));
        fields.insert("month".to_owned(), string(format!("{:02}", post.month())));
        fields.insert("day".to_owned(), string(format!("{:02}", post.day())));
        fields.insert("tags".to_owned(), Value::Array(tags));
        fields.insert(
            "summary".to_owned(),
            string(markdown::to_html(summary, HEADING_OFFSET)),
        );
        fields.insert("summarized".to_owned(), Value::Bool(summarized));
        PostValue {
            summary: fields,
            body: markdown::to_html(&post.article, HEADING_OFFSET),
        }
    }

    /// The value shown on listing pages: everything but the body.
    pub fn summary(&self) -> Value {
        Value::Object(self.summary.clone())
    }

    /// The value shown on the post's own page: the summary fields plus
    /// `body`.
    pub fn full(&self) -> Value {
        let mut fields = self.summary.clone();
        fields.insert("body".to_owned(), string(self.body.as_str()));
        Value::Object(fields)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn text(value: &Value, key: &str) -> String {
        match value {
            Value::Object(fields) => match &fields[key] {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                _ => panic!("`{}` is not a string or bool", key),
            },
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_post_value() {
        let post = Post::parse(
            PathBuf::from("2014-05-04-hello.md"),
            NaiveDate::from_ymd_opt(2014, 5, 4).unwrap(),
            "hello".to_owned(),
            "---\ntitle: Hello\n---\nIntro\n\nREADMORE\n\nRest\n",
            "READMORE",
        )
        .unwrap();
        let route = Route {
            permalink: "blog/hello/".to_owned(),
            url: Url::parse("https://example.org/blog/hello/").unwrap(),
            file_path: PathBuf::from("/out/blog/hello/index.html"),
        };
        let value = PostValue::new(&post, &route, Vec::new());

        let summary = value.summary();
        assert_eq!("2014-05-04", text(&summary, "date"));
        assert_eq!("05", text(&summary, "month"));
        assert_eq!("https://example.org/blog/hello/", text(&summary, "url"));
        assert_eq!("<p>Intro</p>\n", text(&summary, "summary"));
        assert_eq!("true", text(&summary, "summarized"));
        assert!(matches!(summary, Value::Object(ref m) if !m.contains_key("body")));

        let full = value.full();
        assert_eq!("<p>Intro</p>\n<p>Rest</p>\n", text(&full, "body"));
    }
}
