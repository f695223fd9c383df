//! Title clean-up applied before a video title is published.
use regex::Regex;

const OPEN_QUOTE: char = '«';
const CLOSE_QUOTE: char = '»';

#[derive(Debug, Clone, Default)]
pub struct TitleCleaner {
    strip: Option<Regex>,
    unquote: bool,
}

impl TitleCleaner {
    /// `strip` is a pattern whose matches are removed from the title; an empty
    /// pattern disables stripping.
    pub fn new(strip: Option<&str>, unquote: bool) -> Result<Self, regex::Error> {
        let strip = match strip.filter(|p| !p.is_empty()) {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };
        Ok(Self { strip, unquote })
    }

    pub fn clean(&self, title: &str) -> String {
        let title = match &self.strip {
            Some(re) => re.replace_all(title, "").into_owned(),
            None => title.to_string(),
        };
        if self.unquote {
            unquote(&title)
        } else {
            title
        }
    }
}

/// Drops quote pairs wrapping the whole title, then turns the remaining
/// plain `"` pairs into `«` `»` from left to right. An unpaired `"` is left
/// as is.
pub fn unquote(title: &str) -> String {
    let mut title = title;
    loop {
        let inner = unwrap_once(title);
        if inner.len() == title.len() {
            break;
        }
        title = inner;
    }

    let paired = title.matches('"').count() / 2 * 2;
    let mut seen = 0;
    title
        .chars()
        .map(|c| {
            if c != '"' || seen == paired {
                return c;
            }
            seen += 1;
            if seen % 2 == 1 {
                OPEN_QUOTE
            } else {
                CLOSE_QUOTE
            }
        })
        .collect()
}

/// `«` `»` only count as a wrapper when they are the sole angle quotes, so two
/// adjacent inner pairs are never mistaken for one.
fn unwrap_once(title: &str) -> &str {
    if title.len() > 1 && title.starts_with('"') && title.ends_with('"') {
        return title.trim_matches('"');
    }
    match title
        .strip_prefix(OPEN_QUOTE)
        .and_then(|t| t.strip_suffix(CLOSE_QUOTE))
    {
        Some(inner) if !inner.contains([OPEN_QUOTE, CLOSE_QUOTE]) => inner,
        _ => title,
    }
}
