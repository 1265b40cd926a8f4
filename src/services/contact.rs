//! Best-effort name and email extraction from transcribed speech.
//!
//! Nothing in here fails: when a field cannot be found it is reported as
//! `None` and the booking flow asks again on the next turn.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::ContactInfo;

const NAME_ANCHORS: &[&str] = &["name", "i'm", "im", "called"];

const NAME_STOPLIST: &[&str] = &["gmail", "email", "address", "yes", "no", "okay", "please"];

const GMAIL_DOMAIN: &str = "gmail.com";

const DIGIT_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

const TEEN_WORDS: &[&str] = &[
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
    "eighteen", "nineteen",
];

const TENS_WORDS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

fn re_email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
    })
}

fn re_gmail_address() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9._%+-]*[a-z0-9])?@gmail\.com$")
            .expect("valid gmail regex")
    })
}

/// Whether `candidate` is a plausible Gmail address assembled from dictation.
pub fn is_gmail_address(candidate: &str) -> bool {
    re_gmail_address().is_match(candidate)
}

/// Whether `candidate` is exactly one email address.
pub fn is_email_address(candidate: &str) -> bool {
    re_email()
        .find(candidate)
        .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
}

/// A known dictation pattern: a spoken stem, optionally followed by a number,
/// that stands for a fixed Gmail local part. For example the stem
/// "think out" with the number 98 recognises "think out ninety eight at gmail".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailHint {
    pub stem: String,
    pub number: Option<u32>,
    pub local_part: String,
}

impl EmailHint {
    /// Parses `stem[#number]=local_part`.
    pub fn parse(entry: &str) -> Option<Self> {
        let (pattern, local_part) = entry.split_once('=')?;
        let (stem, number) = match pattern.split_once('#') {
            Some((stem, number)) => (stem, Some(number.trim().parse().ok()?)),
            None => (pattern, None),
        };

        let stem = normalize_spoken(stem);
        let local_part = local_part.trim().to_lowercase();
        if stem.is_empty() || !is_gmail_address(&format!("{local_part}@{GMAIL_DOMAIN}")) {
            return None;
        }

        Some(Self {
            stem,
            number,
            local_part,
        })
    }

    /// Parses a comma separated list, skipping malformed entries.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let hint = Self::parse(entry);
                if hint.is_none() {
                    tracing::warn!(entry, "ignoring malformed email hint");
                }
                hint
            })
            .collect()
    }

    fn matches(&self, normalized: &str) -> bool {
        let padded = format!(" {normalized} ");
        if !padded.contains(&format!(" {} ", self.stem)) {
            return false;
        }
        match self.number {
            Some(n) => spoken_forms(n)
                .iter()
                .any(|form| padded.contains(&format!(" {form} "))),
            None => true,
        }
    }

    fn email(&self) -> String {
        format!("{}@{GMAIL_DOMAIN}", self.local_part)
    }
}

/// Ways a number tends to come back from speech-to-text: "98",
/// "nine eight" and "ninety eight".
fn spoken_forms(n: u32) -> Vec<String> {
    let digits = n.to_string();
    let mut forms = vec![digits.clone()];

    let by_digit: Vec<&str> = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| DIGIT_WORDS[d as usize])
        .collect();
    forms.push(by_digit.join(" "));

    match n {
        10..=19 => forms.push(TEEN_WORDS[(n - 10) as usize].to_string()),
        20..=99 => {
            let tens = TENS_WORDS[(n / 10) as usize];
            match n % 10 {
                0 => forms.push(tens.to_string()),
                unit => forms.push(format!("{tens} {}", DIGIT_WORDS[unit as usize])),
            }
        }
        _ => {}
    }

    forms
}

/// Lower-cases and replaces punctuation with spaces, collapsing runs of
/// whitespace.
fn normalize_spoken(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_token(word: &str) -> &str {
    word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '@'))
}

fn trim_name(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphabetic())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

#[derive(Debug, Clone, Default)]
pub struct ContactExtractor {
    hints: Vec<EmailHint>,
}

impl ContactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hints(hints: Vec<EmailHint>) -> Self {
        Self { hints }
    }

    pub fn extract(&self, text: &str) -> ContactInfo {
        ContactInfo {
            name: extract_name(text),
            email: self.extract_email(text),
        }
    }

    pub fn extract_email(&self, text: &str) -> Option<String> {
        if let Some(m) = re_email().find(text) {
            return Some(m.as_str().to_string());
        }

        let lower = text.to_lowercase();
        if !(lower.contains("gmail") && (lower.contains("at") || lower.contains('@'))) {
            return None;
        }

        let normalized = normalize_spoken(text);
        if let Some(hint) = self.hints.iter().find(|h| h.matches(&normalized)) {
            return Some(hint.email());
        }

        reconstruct_dictated_gmail(&lower)
    }
}

pub fn extract_contact_info(text: &str) -> ContactInfo {
    ContactExtractor::new().extract(text)
}

/// Rebuilds "j o h n dot s at gmail" style dictation. Single characters and
/// anything containing "dot" before the "at" are kept; the address is only
/// accepted once "gmail" follows the "at".
fn reconstruct_dictated_gmail(lower: &str) -> Option<String> {
    let mut local = String::new();
    let mut found_at = false;

    for raw in lower.split_whitespace() {
        let token = trim_token(raw);
        if token == "at" || token == "@" {
            found_at = true;
            continue;
        }

        if found_at {
            if token == "g" || token == "mail" || token.starts_with("gmail") {
                let candidate = format!("{local}@{GMAIL_DOMAIN}");
                return is_gmail_address(&candidate).then_some(candidate);
            }
            continue;
        }

        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => local.push(c),
            _ if token.contains("dot") => local.push('.'),
            _ => {}
        }
    }

    None
}

/// Joins spelled-out fragments collected over several turns into a Gmail
/// address, if they form a valid one.
pub fn email_from_fragments(fragments: &[String]) -> Option<String> {
    let local: String = fragments.concat();
    let local = local.trim_end_matches(GMAIL_DOMAIN).trim_end_matches('@');
    let candidate = format!("{local}@{GMAIL_DOMAIN}");
    is_gmail_address(&candidate).then_some(candidate)
}

pub fn extract_name(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();

    for (i, word) in words.iter().enumerate() {
        let anchor = word
            .trim_matches(|c: char| !(c.is_alphabetic() || c == '\''))
            .to_lowercase();
        if !NAME_ANCHORS.contains(&anchor.as_str()) {
            continue;
        }

        let candidate = match words.get(i + 1) {
            Some(next) if trim_name(next).eq_ignore_ascii_case("is") => {
                words.get(i + 2).map(|w| trim_name(w))
            }
            Some(next) => {
                let next = trim_name(next);
                (starts_uppercase(next) || next.chars().count() > 2).then_some(next)
            }
            None => None,
        };

        if let Some(name) = candidate.filter(|n| is_name_like(n)) {
            return Some(capitalize(name));
        }
    }

    words
        .iter()
        .map(|w| trim_name(w))
        .find(|w| {
            starts_uppercase(w)
                && w.chars().count() > 2
                && w.chars().all(char::is_alphabetic)
                && !NAME_STOPLIST.contains(&w.to_lowercase().as_str())
                && !is_number_word(w)
        })
        .map(str::to_string)
}

/// "Nine" at the start of a sentence is a dictated digit, not a name.
fn is_number_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    [DIGIT_WORDS, TEEN_WORDS, TENS_WORDS]
        .iter()
        .any(|words| words.iter().any(|w| !w.is_empty() && *w == lower))
}

pub fn is_name_like(word: &str) -> bool {
    !word.is_empty() && !word.contains('@') && !word.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn think_out_hint() -> EmailHint {
        EmailHint::parse("think out#98=thinkout98").unwrap()
    }

    #[test]
    fn test_name_and_email_in_one_sentence() {
        let info = extract_contact_info("My name is Francis and my email is thinkout98@gmail.com");
        assert_eq!(info.name.as_deref(), Some("Francis"));
        assert_eq!(info.email.as_deref(), Some("thinkout98@gmail.com"));
        assert!(info.is_complete());
    }

    #[test]
    fn test_first_email_wins() {
        let email = ContactExtractor::new()
            .extract_email("use a@example.org or b@example.org");
        assert_eq!(email.as_deref(), Some("a@example.org"));
    }

    #[test]
    fn test_name_anchor_variants() {
        assert_eq!(extract_name("I'm francis").as_deref(), Some("Francis"));
        assert_eq!(extract_name("they call me, uh, called Bo").as_deref(), Some("Bo"));
        assert_eq!(extract_name("my name is FRANCIS.").as_deref(), Some("Francis"));
        assert_eq!(extract_name("name jo"), None);
    }

    #[test]
    fn test_name_fallback_skips_stoplist() {
        assert_eq!(extract_name("Email address is think"), None);
        assert_eq!(extract_name("Okay Gmail Maria").as_deref(), Some("Maria"));
        assert_eq!(extract_name("c h I n k out"), None);
        assert_eq!(extract_name("So think out ninety eight. Nine eight. At Gmail dot com."), None);
    }

    #[test]
    fn test_dictated_letters_rebuilt() {
        let email = ContactExtractor::new()
            .extract_email("it's t h i n k dot o u t at gmail dot com");
        assert_eq!(email.as_deref(), Some("think.out@gmail.com"));
    }

    #[test]
    fn test_dictated_digits_kept() {
        let email = ContactExtractor::new().extract_email("j o 9 8 @ gmail.com");
        assert_eq!(email.as_deref(), Some("jo98@gmail.com"));
    }

    #[test]
    fn test_spoken_number_words_not_collected() {
        let email = ContactExtractor::new().extract_email("j o nine eight at gmail dot com");
        assert_eq!(email.as_deref(), Some("jo@gmail.com"));
    }

    #[test]
    fn test_is_email_address() {
        assert!(is_email_address("thinkout98@gmail.com"));
        assert!(is_email_address("jo.b+cal@example.co"));
        assert!(!is_email_address("thinkout98 at gmail"));
        assert!(!is_email_address("mail me at jo@example.com"));
        assert!(!is_email_address(""));
    }

    #[test]
    fn test_lone_dot_is_not_an_email() {
        assert_eq!(ContactExtractor::new().extract_email("dot at gmail dot com"), None);
        assert_eq!(ContactExtractor::new().extract_email("At Gmail dot com"), None);
    }

    #[test]
    fn test_gmail_requires_at() {
        assert_eq!(ContactExtractor::new().extract_email("j o gmail"), None);
    }

    #[test]
    fn test_hint_matches_spoken_number_forms() {
        let extractor = ContactExtractor::with_hints(vec![think_out_hint()]);
        for text in [
            "think out ninety eight at gmail dot com",
            "So think out ninety eight. Nine eight. At Gmail dot com.",
            "think out 98 at gmail",
            "Think out nine-eight @ gmail",
        ] {
            assert_eq!(
                extractor.extract_email(text).as_deref(),
                Some("thinkout98@gmail.com"),
                "{text}"
            );
        }
    }

    #[test]
    fn test_hint_needs_number_when_configured() {
        let extractor = ContactExtractor::with_hints(vec![think_out_hint()]);
        assert_eq!(extractor.extract_email("think out at gmail"), None);
        assert_eq!(extractor.extract_email("think out ninety eight"), None);
    }

    #[test]
    fn test_hint_parsing() {
        let hints = EmailHint::parse_list("think out#98=thinkout98, sholla alagbe=sholla.alagbe, bad, x#y=z");
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[1].stem, "sholla alagbe");
        assert_eq!(hints[1].number, None);
        assert_eq!(hints[1].email(), "sholla.alagbe@gmail.com");
    }

    #[test]
    fn test_spoken_forms() {
        assert_eq!(spoken_forms(98), vec!["98", "nine eight", "ninety eight"]);
        assert_eq!(spoken_forms(12), vec!["12", "one two", "twelve"]);
        assert_eq!(spoken_forms(40), vec!["40", "four zero", "forty"]);
        assert_eq!(spoken_forms(7), vec!["7", "seven"]);
    }

    #[test]
    fn test_fragments_to_email() {
        let parts: Vec<String> = ["j", "o", ".", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(email_from_fragments(&parts).as_deref(), Some("jo.b@gmail.com"));
        assert_eq!(email_from_fragments(&[]), None);
        assert_eq!(email_from_fragments(&[".".to_string()]), None);
    }

    #[test]
    fn test_noisy_dictation_never_panics() {
        for text in [
            "Email address is think",
            "c h I n k out",
            "It's think out ninety eight",
            "At Gmail dot com",
            "@",
            "at at at gmail",
            "   ",
        ] {
            let _ = extract_contact_info(text);
        }
    }
}
