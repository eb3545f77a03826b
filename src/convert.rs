use crate::parser;
use crate::resolver::MediaResolver;
use crate::rewrite;

/// Runs the full pipeline on one article: header extraction, body rewriting,
/// and serialization into a Hugo-style document.
pub(crate) fn convert(
    raw: &str,
    default_author: &str,
    resolver: &dyn MediaResolver,
) -> anyhow::Result<String> {
    let mut document = parser::parse(raw, default_author)?;
    document.body = rewrite::rewrite(&document.body, resolver)?;
    Ok(document.render())
}
