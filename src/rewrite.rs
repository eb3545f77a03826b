use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::resolver::MediaResolver;

// Liquid-style embed tag, e.g. `{% youtube dQw4w9WgXcQ %}`.
fn embed_tag(name: &str) -> Regex {
    Regex::new(&format!(r"\{{%\s{name}\s(.+?)\s%\}}")).unwrap()
}

static YOUTUBE: Lazy<Regex> = Lazy::new(|| embed_tag("youtube"));
static VIMEO: Lazy<Regex> = Lazy::new(|| embed_tag("vimeo"));
static GIPHY: Lazy<Regex> = Lazy::new(|| embed_tag("giphy"));
static SOUNDCLOUD: Lazy<Regex> = Lazy::new(|| embed_tag("soundcloud"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(.*?)\]\(\{static\}(/images/[^)]+)\)").unwrap());
static POST_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(\{static\}(/[^)]+\.md)\)").unwrap());

/// Rewrites Pelican shortcodes and `{static}` references in `body` into Hugo
/// syntax. The passes run in a fixed order; giphy and soundcloud tags go
/// through the injected resolver, everything else is pure text substitution.
pub(crate) fn rewrite(body: &str, resolver: &dyn MediaResolver) -> anyhow::Result<String> {
    let mut text = YOUTUBE.replace_all(body, "{{< youtube $1 >}}").into_owned();
    text = VIMEO.replace_all(&text, "{{< vimeo $1 >}}").into_owned();
    text = replace_fallible(&GIPHY, &text, |caps| {
        let embed = resolver.resolve_giphy(&caps[1])?;
        Ok(format!(
            "[![{}]({})]({})",
            embed.source_label, embed.image_url, embed.page_url
        ))
    })?;
    text = replace_fallible(&SOUNDCLOUD, &text, |caps| {
        resolver.resolve_soundcloud(&caps[1])
    })?;
    text = IMAGE.replace_all(&text, "![$1]($2)").into_owned();
    text = POST_LINK
        .replace_all(&text, "[$1]({{< ref \"$2\" >}})")
        .into_owned();
    Ok(text)
}

// `Regex::replace_all` with a replacement that can fail.
fn replace_fallible<F>(pattern: &Regex, text: &str, mut replacement: F) -> anyhow::Result<String>
where
    F: FnMut(&Captures) -> anyhow::Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for caps in pattern.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        out.push_str(&text[last_end..whole.start()]);
        out.push_str(&replacement(&caps)?);
        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);
    Ok(out)
}
