//! Text preprocessing applied before markdown is parsed or rendered
//!
//! [`preprocess_markdown`] runs five stages, each on the previous stage's
//! output:
//!
//! 1. [`fix_urls`]: `www.` tokens get an `https://` scheme
//! 2. [`linkify_urls`]: naked `http(s)://` URLs become `[display](url)`
//! 3. [`linkify_emails`]: bare addresses become `[email](mailto:email)`
//! 4. [`convert_video_links`]: video links become `<video-embed>` placeholders
//! 5. [`convert_hashtags`]: `#word` becomes a `<span data-hashtag>` placeholder
//!
//! Every stage only rewrites text outside code spans, links, autolinks and
//! placeholders produced earlier, so running the pipeline twice changes
//! nothing the first run did not.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use crate::hashtag::{HASHTAG_REGEX, starts_hashtag_after};
use crate::video::parse_video_url;

/// Spans no stage rewrites. Group names identify the construct.
static PROTECTED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s:```.*?```)",
        r"|`[^`\n]*`",
        r#"|<video-embed [^>]*></video-embed>"#,
        r#"|<span data-hashtag[^>]*>[^<]*</span>"#,
        r"|(?P<image>!\[[^\]\n]*\]\([^)\s]*\))",
        r"|(?P<link>\[[^\]\n]*\]\((?P<href>[^)\s]*)\))",
        r"|(?P<autolink><(?P<autohref>(?:https?://|mailto:)[^>\s]+)>)",
    ))
    .expect("protected span regex")
});

static WWW_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(])(www\.[^\s<>()\[\]]+)").expect("www regex")
});

static NAKED_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>()\[\]]+").expect("naked url regex"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

static STRIP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\*\*(.*?)\*\*", "$1"),
        (r"__(.*?)__", "$1"),
        (r"\*(.*?)\*", "$1"),
        (r"\b_([^_\n]+)_\b", "$1"),
        (r"~~(.*?)~~", "$1"),
        (r"`{1,3}([^`]*?)`{1,3}", "$1"),
        (r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        (r"\[([^\]]*)\]\([^)]*\)", "$1"),
        (r"(?m)^#{1,6}\s+", ""),
        (r"(?m)^>\s*", ""),
        (r"<[^>]+>", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("strip regex"), replacement))
    .collect()
});

/// Trailing characters left outside a linkified URL
const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\''];

/// Run all five stages
pub fn preprocess_markdown(text: &str) -> String {
    let text = fix_urls(text);
    trace!(stage = "fix_urls", len = text.len());
    let text = linkify_urls(&text);
    trace!(stage = "linkify_urls", len = text.len());
    let text = linkify_emails(&text);
    trace!(stage = "linkify_emails", len = text.len());
    let text = convert_video_links(&text);
    trace!(stage = "convert_video_links", len = text.len());
    let text = convert_hashtags(&text);
    trace!(stage = "convert_hashtags", len = text.len());
    text
}

/// Give bare `www.` domains an `https://` scheme, in text and link targets
pub fn fix_urls(text: &str) -> String {
    map_segments(
        text,
        |gap, _| WWW_REGEX.replace_all(gap, "${1}https://${2}").into_owned(),
        |caps| match caps.name("href") {
            Some(href) if href.as_str().starts_with("www.") => {
                let full = &caps[0];
                let offset = href.start() - caps.get(0).map_or(0, |m| m.start());
                format!("{}https://{}", &full[..offset], &full[offset..])
            }
            _ => caps[0].to_string(),
        },
    )
}

/// Wrap naked URLs as `[display](url)`, display without scheme and `www.`
pub fn linkify_urls(text: &str) -> String {
    map_gaps(text, |gap, _| {
        NAKED_URL_REGEX
            .replace_all(gap, |caps: &Captures| {
                let matched = &caps[0];
                let url = matched.trim_end_matches(URL_TRAILING_PUNCTUATION);
                let rest = &matched[url.len()..];
                format!("[{}]({}){}", display_url(url), url, rest)
            })
            .into_owned()
    })
}

/// Wrap bare email addresses as `[email](mailto:email)`
pub fn linkify_emails(text: &str) -> String {
    map_gaps(text, |gap, _| {
        EMAIL_REGEX
            .replace_all(gap, |caps: &Captures| {
                let email = caps[0].trim_end_matches('.');
                let rest = &caps[0][email.len()..];
                format!("[{email}](mailto:{email}){rest}")
            })
            .into_owned()
    })
}

/// Replace markdown links and autolinks to videos with placeholder tags
pub fn convert_video_links(text: &str) -> String {
    map_segments(
        text,
        |gap, _| gap.to_string(),
        |caps| {
            let href = caps
                .name("href")
                .filter(|_| caps.name("link").is_some())
                .or_else(|| caps.name("autohref"));
            match href.and_then(|href| parse_video_url(href.as_str())) {
                Some(video) => video_placeholder(video.provider.as_str(), &video.video_id),
                None => caps[0].to_string(),
            }
        },
    )
}

/// Replace `#word` outside links and placeholders with a hashtag placeholder
pub fn convert_hashtags(text: &str) -> String {
    map_gaps(text, |gap, prev_char| {
        let mut out = String::with_capacity(gap.len());
        let mut last = 0;
        for caps in HASHTAG_REGEX.captures_iter(gap) {
            let Some(full) = caps.get(0) else { continue };
            let prev = gap[..full.start()].chars().next_back().or(prev_char);
            if !starts_hashtag_after(prev) {
                continue;
            }
            out.push_str(&gap[last..full.start()]);
            out.push_str(&hashtag_placeholder(&caps[1]));
            last = full.end();
        }
        out.push_str(&gap[last..]);
        out
    })
}

/// `<video-embed provider="P" video-id="ID"></video-embed>`
pub fn video_placeholder(provider: &str, video_id: &str) -> String {
    format!(r#"<video-embed provider="{provider}" video-id="{video_id}"></video-embed>"#)
}

/// `<span data-hashtag data-label="word">#word</span>`
pub fn hashtag_placeholder(label: &str) -> String {
    format!(r#"<span data-hashtag data-label="{label}">#{label}</span>"#)
}

/// Whether a link target may be rendered as a clickable link: relative
/// paths, fragments, `http(s)` and `mailto`
pub fn is_safe_href(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    (lower.starts_with('/') && !lower.starts_with("//"))
        || lower.starts_with('#')
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
}

/// Strip emphasis, links, headers, blockquotes and HTML tags, keeping link
/// text. Only meant for measuring visible length.
pub fn remove_markdown_syntax(text: &str) -> String {
    STRIP_RULES
        .iter()
        .fold(text.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
}

/// Visible length of markdown, in characters
pub fn visible_len(text: &str) -> usize {
    remove_markdown_syntax(text).chars().count()
}

/// Cut markdown to `limit` visible characters.
///
/// Whole lines are kept while they fit; each kept line break counts as one
/// character. The first line that does not fit is cut inside, outside of
/// links and placeholders, and `...` is appended. Text that fits is
/// returned unchanged.
pub fn truncate_markdown(text: &str, limit: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    for (index, paragraph) in text.split('\n').enumerate() {
        let separator = usize::from(index > 0);
        let len = visible_len(paragraph);

        if used + separator + len <= limit {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(paragraph);
            used += separator + len;
            continue;
        }

        let remaining = limit.saturating_sub(used + separator);
        let cut = cut_paragraph(paragraph, remaining);
        if !cut.is_empty() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&cut);
        }
        let mut out = out.trim_end().to_string();
        out.push_str("...");
        trace!(limit, "truncated markdown");
        return out;
    }

    out
}

/// Longest prefix of `paragraph` that fits in `remaining` visible
/// characters, cut outside protected spans. Visible length grows with the
/// prefix, so the cut is found by bisection.
fn cut_paragraph(paragraph: &str, remaining: usize) -> String {
    if remaining == 0 {
        return String::new();
    }

    let mut protected = PROTECTED_REGEX
        .find_iter(paragraph)
        .map(|m| (m.start(), m.end()))
        .peekable();
    let cuts: Vec<usize> = paragraph
        .char_indices()
        .map(|(i, _)| i)
        .filter(|&cut| {
            while protected.next_if(|&(_, end)| end <= cut).is_some() {}
            protected.peek().is_none_or(|&(start, _)| cut <= start)
        })
        .collect();

    let fitting = |cut: usize| {
        let candidate = close_open_markers(paragraph[..cut].trim_end());
        (visible_len(&candidate) <= remaining).then_some(candidate)
    };

    // the empty prefix always fits; the answer lies in cuts[low..high]
    let (mut low, mut high) = (0, cuts.len());
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if fitting(cuts[mid]).is_some() {
            low = mid;
        } else {
            high = mid;
        }
    }

    cuts.get(low).and_then(|&cut| fitting(cut)).unwrap_or_default()
}

fn close_open_markers(prefix: &str) -> String {
    let mut out = prefix.to_string();
    for marker in ["**", "~~"] {
        if prefix.matches(marker).count() % 2 == 1 {
            out.push_str(marker);
        }
    }
    out
}

fn display_url(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let display = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    display.trim_end_matches('/').to_string()
}

/// Rewrite the text between protected spans. `prev` is the character just
/// before the gap.
fn map_gaps(text: &str, on_gap: impl Fn(&str, Option<char>) -> String) -> String {
    map_segments(text, on_gap, |caps| caps[0].to_string())
}

fn map_segments(
    text: &str,
    on_gap: impl Fn(&str, Option<char>) -> String,
    on_protected: impl Fn(&Captures) -> String,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PROTECTED_REGEX.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        if full.start() > last {
            let prev = text[..last].chars().next_back();
            out.push_str(&on_gap(&text[last..full.start()], prev));
        }
        out.push_str(&on_protected(&caps));
        last = full.end();
    }
    if last < text.len() {
        let prev = text[..last].chars().next_back();
        out.push_str(&on_gap(&text[last..], prev));
    }

    out
}
