use anyhow::{bail, Context};
use chrono::{FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::metadata::Metadata;

/// One article: parsed header fields plus the remaining body text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Document {
    pub meta: Metadata,
    pub body: String,
}

impl Document {
    /// Renders the Hugo-style article file: front matter between `---`
    /// delimiters, followed by the body.
    pub fn render(&self) -> String {
        format!("---\n{}---\n{}", self.meta.front_matter(), self.body)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Date,
    Slug,
    Author,
    Tags,
    Category,
    Draft,
}

// Classification is first-match-wins in this order; a line matching none of
// the patterns is body text.
static HEADER_FIELDS: Lazy<Vec<(Field, Regex)>> = Lazy::new(|| {
    [
        (Field::Title, r"^Title:\s(.+)$"),
        (Field::Date, r"^Date:\s(.+)$"),
        (Field::Slug, r"^Slug:\s(.+)$"),
        (Field::Author, r"^Author:\s(.+)$"),
        (Field::Tags, r"^Tags:\s(.+)$"),
        (Field::Category, r"^Category:\s(.+)$"),
        (Field::Draft, r"^Status:\s(draft)$"),
    ]
    .into_iter()
    .map(|(field, pattern)| (field, Regex::new(pattern).unwrap()))
    .collect()
});

// Pelican stores article dates as local time; this source used CET.
static SOURCE_OFFSET: Lazy<FixedOffset> = Lazy::new(|| FixedOffset::east_opt(3600).unwrap());

const SOURCE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Splits raw article text into header metadata and body. The author falls
/// back to `default_author` unless an `Author:` header is present (the last
/// one wins if there are several).
pub(crate) fn parse(raw: &str, default_author: &str) -> anyhow::Result<Document> {
    let mut meta = Metadata::new(default_author);
    let mut body: Vec<&str> = vec![];

    'lines: for line in raw.lines() {
        for (field, pattern) in HEADER_FIELDS.iter() {
            if let Some(caps) = pattern.captures(line) {
                apply(*field, &caps[1], &mut meta)?;
                continue 'lines;
            }
        }
        // it must be text if nothing else matches
        body.push(line);
    }

    // the header block is separated from the body by a single blank line;
    // strip at most one from each end
    if body.first() == Some(&"") {
        body.remove(0);
    }
    if body.last() == Some(&"") {
        body.pop();
    }
    if body.is_empty() {
        bail!("empty body: no text lines left after header extraction");
    }

    Ok(Document {
        meta,
        body: body.join("\n"),
    })
}

fn apply(field: Field, value: &str, meta: &mut Metadata) -> anyhow::Result<()> {
    match field {
        Field::Title => meta.title = Some(value.to_string()),
        Field::Date => {
            let naive = NaiveDateTime::parse_from_str(value, SOURCE_DATE_FORMAT)
                .with_context(|| format!("invalid date header: {value:?}"))?;
            let date = naive
                .and_local_timezone(*SOURCE_OFFSET)
                .single()
                .with_context(|| format!("ambiguous date header: {value:?}"))?;
            meta.date = Some(date.to_rfc3339());
        }
        Field::Slug => meta.slug = Some(value.to_string()),
        Field::Author => meta.author = value.to_string(),
        Field::Tags => {
            meta.tags = value
                .split(',')
                .map(|tag| tag.chars().filter(|c| !c.is_whitespace()).collect())
                .collect();
        }
        Field::Category => {} // recognized but not carried over
        Field::Draft => meta.draft = true,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_header_and_body() {
        let raw = concat!(
            "Title: 1UP berlin\n",
            "Date: 2011-12-20 12:46\n",
            "Slug: 1up-berlin\n",
            "Tags: art, berlin, documentary, graffiti\n",
            "Status: draft\n",
            "\n",
            "Jeder der einmal durch Berlin gelaufen ist kennt sie.\n",
            "\n",
            "{% youtube QXxXoSTPivA %}\n",
        );
        let doc = parse(raw, "marvin").unwrap();
        assert_eq!(doc.meta.title.as_deref(), Some("1UP berlin"));
        assert_eq!(
            doc.meta.date.as_deref(),
            Some("2011-12-20T12:46:00+01:00")
        );
        assert_eq!(doc.meta.slug.as_deref(), Some("1up-berlin"));
        assert_eq!(doc.meta.tags, ["art", "berlin", "documentary", "graffiti"]);
        assert_eq!(doc.meta.author, "marvin");
        assert!(doc.meta.draft);
        assert_eq!(
            doc.body,
            "Jeder der einmal durch Berlin gelaufen ist kennt sie.\n\n{% youtube QXxXoSTPivA %}"
        );
    }

    #[test]
    fn tags_are_split_on_commas_with_whitespace_stripped() {
        let doc = parse("Tags: a, b,c\n\nbody", "marvin").unwrap();
        assert_eq!(doc.meta.tags, ["a", "b", "c"]);
    }

    #[test]
    fn author_defaults_and_last_explicit_header_wins() {
        let doc = parse("some text", "marvin").unwrap();
        assert_eq!(doc.meta.author, "marvin");

        let doc = parse("Author: alice\n\nsome text\nAuthor: bob", "marvin").unwrap();
        assert_eq!(doc.meta.author, "bob");
    }

    #[test]
    fn status_must_be_exactly_draft() {
        let doc = parse("Status: draft\n\nbody", "marvin").unwrap();
        assert!(doc.meta.draft);

        let doc = parse("Status: published\n\nbody", "marvin").unwrap();
        assert!(!doc.meta.draft);
        // the unrecognized status line stays in the body
        assert_eq!(doc.body, "Status: published\n\nbody");
    }

    #[test]
    fn category_is_recognized_but_discarded() {
        let doc = parse("Category: music\n\nbody", "marvin").unwrap();
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn malformed_date_is_an_error() {
        let err = parse("Date: 20.12.2011\n\nbody", "marvin").unwrap_err();
        assert!(err.to_string().contains("invalid date header"));
    }

    #[test]
    fn only_one_blank_line_is_trimmed_from_each_end() {
        let doc = parse("\n\nbody\n\nafter\n", "marvin").unwrap();
        assert_eq!(doc.body, "\nbody\n\nafter");
    }

    #[test]
    fn empty_body_is_an_error_not_a_panic() {
        for raw in ["Title: X", "", "\n\n", "Title: X\n\n"] {
            let err = parse(raw, "marvin").unwrap_err();
            assert!(err.to_string().contains("empty body"), "input {raw:?}");
        }
    }

    #[test]
    fn render_wraps_front_matter_and_body() {
        let doc = parse("Title: X\n\nbody", "marvin").unwrap();
        assert_eq!(
            doc.render(),
            "---\ntitle: X\nauthor: marvin\ndraft: false\n---\nbody"
        );
    }
}
