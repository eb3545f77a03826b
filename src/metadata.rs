use std::borrow::Cow;
use std::fmt::Write as _;

/// Article header fields, filled in by the header parser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Metadata {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub tags: Vec<String>,
    /// RFC 3339 timestamp, already converted from the source format.
    pub date: Option<String>,
    pub author: String,
    pub draft: bool,
}

impl Metadata {
    pub fn new(default_author: &str) -> Self {
        Metadata {
            title: None,
            slug: None,
            tags: vec![],
            date: None,
            author: default_author.to_string(),
            draft: false,
        }
    }

    /// Renders the YAML front matter block in fixed key order:
    /// title, slug, tags, date, author, draft. Empty optional fields are
    /// omitted; the date is always quoted so it stays a string in Hugo.
    pub fn front_matter(&self) -> String {
        let mut out = String::new();
        if let Some(ref title) = self.title {
            let _ = writeln!(out, "title: {}", scalar(title));
        }
        if let Some(ref slug) = self.slug {
            let _ = writeln!(out, "slug: {}", scalar(slug));
        }
        if !self.tags.is_empty() {
            out.push_str("tags:\n");
            for tag in self.tags.iter() {
                let _ = writeln!(out, "- {}", scalar(tag));
            }
        }
        if let Some(ref date) = self.date {
            let _ = writeln!(out, "date: \"{}\"", date);
        }
        let _ = writeln!(out, "author: {}", scalar(&self.author));
        let _ = writeln!(out, "draft: {}", self.draft);
        out
    }
}

// Quotes values that would not survive as a YAML plain scalar.
fn scalar(value: &str) -> Cow<'_, str> {
    let needs_quoting = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.ends_with(' ')
        || value.starts_with([' ', '-', '?', '\'', '"', '[', ']', '{', '}', '*', '&', '#']);
    if needs_quoting {
        Cow::Owned(format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        ))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_renders_all_fields_in_fixed_order() {
        let meta = Metadata {
            title: Some("1UP berlin".to_string()),
            slug: Some("1up-berlin".to_string()),
            tags: ["art", "berlin", "documentary", "graffiti"]
                .into_iter()
                .map(String::from)
                .collect(),
            date: Some("2011-12-20T12:46:00+01:00".to_string()),
            author: "marvin".to_string(),
            draft: true,
        };
        assert_eq!(
            meta.front_matter(),
            concat!(
                "title: 1UP berlin\n",
                "slug: 1up-berlin\n",
                "tags:\n",
                "- art\n",
                "- berlin\n",
                "- documentary\n",
                "- graffiti\n",
                "date: \"2011-12-20T12:46:00+01:00\"\n",
                "author: marvin\n",
                "draft: true\n",
            )
        );
    }

    #[test]
    fn front_matter_omits_empty_optional_fields() {
        let meta = Metadata::new("marvin");
        assert_eq!(meta.front_matter(), "author: marvin\ndraft: false\n");
    }

    #[test]
    fn front_matter_quotes_ambiguous_scalars() {
        let mut meta = Metadata::new("marvin");
        meta.title = Some("Rust: first steps".to_string());
        assert_eq!(
            meta.front_matter(),
            "title: \"Rust: first steps\"\nauthor: marvin\ndraft: false\n"
        );
    }
}
