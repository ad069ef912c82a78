//! Text Utilities
//!
//! Turns rendered page markup into a short plain-text preview for terminal
//! output. Long previews are clipped on word boundaries.

use regex::Regex;

lazy_static::lazy_static! {
    static ref EMBEDDED_BLOCK: Option<Regex> =
        Regex::new(r"(?is)<style\b.*?</style>|<script\b.*?</script>").ok();
    static ref TAG: Option<Regex> = Regex::new(r"(?s)<[^>]*>").ok();
}

/// Plain-text preview of `html`, at most about `max_bytes` long
pub fn preview_markup(html: &str, max_bytes: usize) -> String {
    let mut text = html.to_string();
    if let Some(re) = EMBEDDED_BLOCK.as_ref() {
        text = re.replace_all(&text, " ").into_owned();
    }
    if let Some(re) = TAG.as_ref() {
        text = re.replace_all(&text, " ").into_owned();
    }

    let decoded = html_escape::decode_html_entities(&text);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    clip_words(&collapsed, max_bytes)
}

/// Leading words of `text` that fit in `max_bytes`, with a count of the rest.
///
/// A first word longer than the budget is cut on a char boundary.
pub fn clip_words(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut kept = String::new();
    let mut words = text.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        let needed = if kept.is_empty() {
            word.len()
        } else {
            kept.len() + 1 + word.len()
        };
        if needed > max_bytes {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
        words.next();
    }

    if kept.is_empty() {
        if let Some(word) = words.peek() {
            let mut cut = max_bytes.min(word.len());
            while !word.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut > 0 {
                kept.push_str(&word[..cut]);
                words.next();
            }
        }
    }

    match (kept.is_empty(), words.count()) {
        (_, 0) => format!("{}...", kept),
        (true, rest) => format!("... [{} more]", rest),
        (false, rest) => format!("{} ... [{} more]", kept, rest),
    }
}
