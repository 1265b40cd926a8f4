//! Plain-text cleanup for replies that are handed to text-to-speech.

use std::sync::OnceLock;

use regex::Regex;

fn re_code_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("valid code block regex"))
}

fn re_inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"))
}

fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"))
}

fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid header regex"))
}

fn re_emphasis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // **bold**, *italic*, __bold__, _italic_
    RE.get_or_init(|| {
        Regex::new(r"\*\*([^*]+?)\*\*|\*([^*]+?)\*|__([^_]+?)__|_([^_]+?)_")
            .expect("valid emphasis regex")
    })
}

fn re_symbols() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[*_#`~\[\]\(\)\{\}]").expect("valid symbol regex"))
}

fn re_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Strips markdown and symbols a speech engine would read out literally.
///
/// Email addresses come out as "name at gmail.com". Sentence-final
/// punctuation is kept so the voice still pauses.
pub fn clean_for_speech(text: &str) -> String {
    let text = re_code_block().replace_all(text, "");
    let text = re_inline_code().replace_all(&text, "$1");
    let text = re_link().replace_all(&text, "$1");
    let text = re_header().replace_all(&text, "");
    let text = re_emphasis().replace_all(&text, "$1$2$3$4");
    let text = re_symbols().replace_all(&text, "");
    let text = text.replace('&', " and ").replace('@', " at ");
    let text = re_whitespace().replace_all(&text, " ");

    text.trim_start_matches(|c: char| ".,;:!?".contains(c) || c.is_whitespace())
        .trim_end_matches(|c: char| ",;:".contains(c) || c.is_whitespace())
        .to_string()
}
