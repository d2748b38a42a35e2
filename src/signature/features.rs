//! Per-line signature features.
//!
//! Every line maps to a fixed vector of 12 boolean flags. Summed over the trailing
//! window of a body the same slots form a histogram.

use crate::config::ExtractionConfig;
use crate::text::split_lines;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

pub const FEATURE_COUNT: usize = 12;

/// Lines longer than this are never used to decide whether a body has a signature.
const GATE_LINE_MAX_LEN: usize = 27;

lazy_static! {
    pub static ref RE_EMAIL: Regex = Regex::new("@").unwrap();
    pub static ref RE_RELAX_PHONE: Regex =
        Regex::new(r".*(\(? ?\d{2,3} ?\)?.{0,3}){2,}").unwrap();
    pub static ref RE_URL: Regex = Regex::new(r"https?://|www\.\S+\.\S").unwrap();
    pub static ref RE_SEPARATOR: Regex = Regex::new(r"^\s*---*\s*$").unwrap();
    pub static ref RE_SPECIAL_CHARS: Regex =
        Regex::new(r"^\s*([*#+^\-~&/$_!%:=]){10,}\s*$").unwrap();
    pub static ref RE_SIGNATURE_WORDS: Regex = Regex::new(
        r"(T|t)hank.*,|(B|b)est|(R|r)egards|^sent[ ]from[ ]my[\s,!\w]*$|BR|(S|s)incerely|(C|c)orporation|Group"
    )
    .unwrap();
    pub static ref RE_NAME: Regex =
        Regex::new(r"[A-Z][a-z]+\s\s?[A-Z]\.?\s\s?[A-Z][a-z]+").unwrap();
    static ref RE_NAME_SPLIT: Regex = Regex::new(r"[^\p{L}]+").unwrap();
    static ref RE_OTHER_PUNCTUATION: Regex = Regex::new(r"\p{Po}").unwrap();
    static ref BAD_SENDER_NAMES: HashSet<&'static str> = [
        "hotmail", "gmail", "yandex", "mail", "yahoo", "mailgun", "mailgunhq", "example", "com",
        "org", "net", "ru", "mailto",
    ]
    .into_iter()
    .collect();
}

/// Slots of the feature vector, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ManyCapitalizedWords,
    TooLongLine,
    Email,
    Url,
    Phone,
    Separator,
    SpecialChars,
    SignatureWords,
    Name,
    PunctuationHigh,
    PunctuationVeryHigh,
    ContainsSenderNames,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::ManyCapitalizedWords,
        Feature::TooLongLine,
        Feature::Email,
        Feature::Url,
        Feature::Phone,
        Feature::Separator,
        Feature::SpecialChars,
        Feature::SignatureWords,
        Feature::Name,
        Feature::PunctuationHigh,
        Feature::PunctuationVeryHigh,
        Feature::ContainsSenderNames,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::ManyCapitalizedWords => "many_capitalized_words",
            Feature::TooLongLine => "too_long_line",
            Feature::Email => "email",
            Feature::Url => "url",
            Feature::Phone => "phone",
            Feature::Separator => "separator",
            Feature::SpecialChars => "special_chars",
            Feature::SignatureWords => "signature_words",
            Feature::Name => "name",
            Feature::PunctuationHigh => "punctuation_high",
            Feature::PunctuationVeryHigh => "punctuation_very_high",
            Feature::ContainsSenderNames => "contains_sender_names",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [bool; FEATURE_COUNT]);

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> bool {
        self.0[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: bool) {
        self.0[feature.index()] = value;
    }

    /// Flags as 0.0 / 1.0, the input of a numeric model.
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        self.0.map(|flag| if flag { 1.0 } else { 0.0 })
    }

    pub fn active(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.get(*f))
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.active().map(Feature::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureHistogram(pub [u32; FEATURE_COUNT]);

impl FeatureHistogram {
    pub fn get(&self, feature: Feature) -> u32 {
        self.0[feature.index()]
    }

    pub fn add(&mut self, vector: &FeatureVector) {
        for (count, flag) in self.0.iter_mut().zip(vector.0) {
            *count += u32::from(flag);
        }
    }
}

impl<'a> FromIterator<&'a FeatureVector> for FeatureHistogram {
    fn from_iter<I: IntoIterator<Item = &'a FeatureVector>>(vectors: I) -> Self {
        let mut histogram = FeatureHistogram::default();
        for vector in vectors {
            histogram.add(vector);
        }
        histogram
    }
}

/// Tries to extract the sender's names from a `From:` value.
///
/// Not only real names come out: company names and parts of the address do too.
pub fn extract_names(sender: &str) -> BTreeSet<String> {
    RE_NAME_SPLIT
        .split(sender)
        .filter(|word| word.chars().count() > 1 && !BAD_SENDER_NAMES.contains(word))
        .map(str::to_string)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Regex matching any sender name or its capitalized form, `None` for an empty name set.
fn sender_names_regex(names: &BTreeSet<String>) -> Option<Regex> {
    if names.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = names
        .iter()
        .flat_map(|name| [regex::escape(name), regex::escape(&capitalize(name))])
        .collect();
    Regex::new(&alternatives.join("|")).ok()
}

pub fn contains_sender_names(text: &str, sender: &str) -> bool {
    sender_names_regex(&extract_names(sender)).map_or(false, |re| re.is_match(text))
}

fn is_valid_word(word: &str) -> bool {
    !matches!(word.chars().next(), Some(c) if c == '(' || c == '+' || c.is_ascii_digit())
}

/// Share of valid words starting with an uppercase letter, 0 for fewer than 2 words.
pub fn capitalized_words_percent(text: &str) -> u32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    let valid: Vec<&str> = words.iter().copied().filter(|w| is_valid_word(w)).collect();
    if valid.is_empty() || words.len() < 2 {
        return 0;
    }
    let capitalized = valid
        .iter()
        .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
        .count();
    (100 * capitalized / valid.len()) as u32
}

pub fn many_capitalized_words(text: &str) -> bool {
    capitalized_words_percent(text) > 66
}

/// Share of characters in the "other punctuation" (Po) category.
pub fn punctuation_percent(text: &str) -> u32 {
    let total = text.chars().count();
    if total == 0 {
        return 0;
    }
    let punctuation = RE_OTHER_PUNCTUATION.find_iter(text).count();
    (100 * punctuation / total) as u32
}

/// Feature evaluation bound to one sender.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    too_long_signature_line: usize,
    signature_max_lines: usize,
    sender_names: Option<Regex>,
}

impl FeatureSpace {
    pub fn new(sender: &str, config: &ExtractionConfig) -> Self {
        FeatureSpace {
            too_long_signature_line: config.too_long_signature_line,
            signature_max_lines: config.signature_max_lines,
            sender_names: sender_names_regex(&extract_names(sender)),
        }
    }

    pub fn contains_sender_names(&self, text: &str) -> bool {
        self.sender_names
            .as_ref()
            .map_or(false, |re| re.is_match(text))
    }

    /// Feature vector of a single line. The line is trimmed first.
    pub fn line_features(&self, line: &str) -> FeatureVector {
        let line = line.trim();
        let mut vector = FeatureVector::default();
        if line.is_empty() {
            return vector;
        }

        let punctuation = punctuation_percent(line);
        vector.set(Feature::ManyCapitalizedWords, many_capitalized_words(line));
        vector.set(
            Feature::TooLongLine,
            line.chars().count() > self.too_long_signature_line,
        );
        vector.set(Feature::Email, RE_EMAIL.is_match(line));
        vector.set(Feature::Url, RE_URL.is_match(line));
        vector.set(Feature::Phone, RE_RELAX_PHONE.is_match(line));
        vector.set(Feature::Separator, RE_SEPARATOR.is_match(line));
        vector.set(Feature::SpecialChars, RE_SPECIAL_CHARS.is_match(line));
        vector.set(Feature::SignatureWords, RE_SIGNATURE_WORDS.is_match(line));
        vector.set(Feature::Name, RE_NAME.is_match(line));
        vector.set(Feature::PunctuationHigh, punctuation > 50);
        // FIXME: most likely meant to be a 90% threshold
        vector.set(Feature::PunctuationVeryHigh, punctuation > 50);
        vector.set(Feature::ContainsSenderNames, self.contains_sender_names(line));
        vector
    }

    /// Trimmed non-blank lines among the last `signature_max_lines` of `body`.
    fn trailing_lines<'a>(&self, body: &'a str) -> Vec<&'a str> {
        let lines: Vec<&str> = split_lines(body)
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let skip = lines.len().saturating_sub(self.signature_max_lines);
        lines[skip..].to_vec()
    }

    /// Feature vectors of the trailing window, top to bottom.
    ///
    /// Lines longer than `max_line_len` characters are left out.
    pub fn window_features(&self, body: &str, max_line_len: usize) -> Vec<FeatureVector> {
        self.trailing_lines(body)
            .into_iter()
            .filter(|line| line.chars().count() <= max_line_len)
            .map(|line| self.line_features(line))
            .collect()
    }

    pub fn window_histogram(&self, body: &str, max_line_len: usize) -> FeatureHistogram {
        self.window_features(body, max_line_len).iter().collect()
    }

    /// Cheap check deciding whether per-line classification is worth running.
    ///
    /// Only short lines count: one naming the sender passes at once, otherwise more
    /// than one line must carry exactly one of phone, email or url.
    pub fn has_signature(&self, body: &str) -> bool {
        let vectors = self.window_features(body, GATE_LINE_MAX_LEN);
        let histogram: FeatureHistogram = vectors.iter().collect();
        if histogram.get(Feature::ContainsSenderNames) > 0 {
            return true;
        }
        let upvotes = vectors
            .iter()
            .filter(|vector| {
                [Feature::Phone, Feature::Email, Feature::Url]
                    .into_iter()
                    .filter(|feature| vector.get(*feature))
                    .count()
                    == 1
            })
            .count();
        upvotes > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PHONE_NUMBERS: &[&str] = &[
        "15615552323",
        "1-561-555-1212",
        "5613333",
        "18008793262",
        "800-879-3262",
        "0-800.879.3262",
        "04 3452488",
        "04 -3452488",
        "04 - 3452499",
        "(610) 310-5555 x5555",
        "533-1123",
        "(021)1234567",
        "(021)123456",
        "(000)000000",
        "+7 920 34 57 23",
        "+7(920) 34 57 23",
        "+7(920)345723",
        "+7920345723",
        "8920345723",
        "21143",
        "2-11-43",
        "2 - 11 - 43",
    ];

    fn feature_space(sender: &str) -> FeatureSpace {
        FeatureSpace::new(sender, &ExtractionConfig::default())
    }

    #[test]
    fn test_match_valid_phone_numbers() {
        for phone in VALID_PHONE_NUMBERS {
            assert!(RE_RELAX_PHONE.is_match(phone), "{phone}");
        }
    }

    #[test]
    fn test_match_names() {
        assert!(RE_NAME.is_match("John R. Doe"));
        assert!(!RE_NAME.is_match("john r. doe"));
    }

    #[test]
    fn test_extract_names() {
        let names = extract_names("Sergey N.  Obukhov <serobnic@mail.ru>");
        for name in ["Sergey", "Obukhov", "serobnic"] {
            assert!(names.contains(name), "{name}");
        }
        assert!(!names.contains("N"));
        assert!(!names.contains("mail"));
        assert!(!names.contains("ru"));

        assert!(extract_names("").is_empty());
    }

    #[test]
    fn test_extract_names_from_various_headers() {
        let cases: &[(&str, &[&str])] = &[
            ("Williams III, Bill </O=EXAMPLE/OU=NA/CN=RECIPIENTS/CN=BWILLIA5>", &["Williams", "III", "Bill"]),
            ("Laura\" \"Goldberg <laura.goldberg@example.com>", &["Laura", "Goldberg"]),
            ("<sergey.obukhov@xxx.ru>", &["sergey", "obukhov"]),
            ("<sergey_obukhov@xxx.ru>", &["sergey", "obukhov"]),
            ("wcl@example.com (Wayne Long +7 920 -256 - 35-09)", &["Wayne", "Long"]),
            ("Sergey N, Obukhov [mailto: serobnic@xxx.ru]", &["Sergey", "Obukhov"]),
            ("* * * * <the_pod1@example.com>", &["the", "pod"]),
            ("\"Mates Rate \\(Wine\\)\" <amen@example.com.com>", &["Mates", "Rate", "Wine"]),
        ];
        for (sender, expected) in cases {
            let names = extract_names(sender);
            for name in *expected {
                assert!(names.contains(*name), "{name} not in names of {sender}");
            }
        }
    }

    #[test]
    fn test_contains_sender_names() {
        let sender = "Sergey N.  Obukhov <xxx@example.com>";
        assert!(contains_sender_names("Sergey Obukhov", sender));
        assert!(contains_sender_names("BR, Sergey N.", sender));
        assert!(contains_sender_names("Serobnic", "<serobnic@mail.ru>"));
        assert!(contains_sender_names("serobnic", "<serobnic@mail.ru>"));
        assert!(!contains_sender_names("Sergey", ""));
    }

    #[test]
    fn test_capitalized_words() {
        assert_eq!(capitalized_words_percent("Aaaa Bbbb cccc dddd"), 50);
        assert!(many_capitalized_words("Aaaa Bbbb Cccc dddd"));
        assert!(!many_capitalized_words("Aaaa Bbbb cccc dddd"));
        assert_eq!(capitalized_words_percent("Single"), 0);
        assert_eq!(capitalized_words_percent("+7 920"), 0);
        assert_eq!(capitalized_words_percent("(Bob) Smith 555"), 100);
    }

    #[test]
    fn test_punctuation_percent() {
        assert_eq!(punctuation_percent("q,w."), 50);
        assert_eq!(punctuation_percent("qqq ggg hhh"), 0);
        assert_eq!(punctuation_percent(""), 0);
        // dashes are Pd, not Po
        assert_eq!(punctuation_percent("----"), 0);
    }

    #[test]
    fn test_line_features() {
        let space = feature_space("John <john@example.com>");

        let vector = space.line_features("John Doe");
        assert_eq!(
            vector.active().collect::<Vec<_>>(),
            vec![Feature::ManyCapitalizedWords, Feature::ContainsSenderNames]
        );

        let vector = space.line_features("555-226-2345");
        assert_eq!(vector.active().collect::<Vec<_>>(), vec![Feature::Phone]);

        let vector = space.line_features("  --  ");
        assert_eq!(vector.active().collect::<Vec<_>>(), vec![Feature::Separator]);

        let vector = space.line_features("*********************");
        assert!(vector.get(Feature::SpecialChars));
        assert!(!vector.get(Feature::Separator));

        assert_eq!(space.line_features("   "), FeatureVector::default());
    }

    #[test]
    fn test_punctuation_features_share_threshold() {
        let vector = feature_space("").line_features("!!!...??a");
        assert!(vector.get(Feature::PunctuationHigh));
        assert!(vector.get(Feature::PunctuationVeryHigh));
    }

    #[test]
    fn test_signature_words_and_long_lines() {
        let space = feature_space("");
        assert!(space.line_features("Thanks,").get(Feature::SignatureWords));
        assert!(space.line_features("Best regards").get(Feature::SignatureWords));
        assert!(space
            .line_features("sent from my iPhone")
            .get(Feature::SignatureWords));
        let long = "a".repeat(61);
        assert!(space.line_features(&long).get(Feature::TooLongLine));
        assert!(!space.line_features(&"a".repeat(60)).get(Feature::TooLongLine));
    }

    #[test]
    fn test_window_histogram() {
        let body = "John Doe\n\nVP Research and Development, Xxxx Xxxx Xxxxx\n\n555-226-2345\n\njohn@example.com";
        let space = feature_space("John <john@example.com>");

        let vectors = space.window_features(body, usize::MAX);
        assert_eq!(vectors.len(), 4);
        assert!(vectors[1].get(Feature::ManyCapitalizedWords));
        assert!(!vectors[1].get(Feature::ContainsSenderNames));

        let histogram = space.window_histogram(body, usize::MAX);
        assert_eq!(histogram.0, [2, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 2]);

        // the long title line drops out of a gate-sized window
        let short = space.window_histogram(body, GATE_LINE_MAX_LEN);
        assert_eq!(short.0, [1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_window_limited_to_signature_max_lines() {
        let config = ExtractionConfig {
            signature_max_lines: 2,
            ..ExtractionConfig::default()
        };
        let space = FeatureSpace::new("", &config);
        assert_eq!(space.window_features("a\nb\n\nc\n", usize::MAX).len(), 2);
    }

    #[test]
    fn test_has_signature_gate() {
        let space = feature_space("Sergey");
        assert!(space.has_signature("Blah\r\n--\r\n\r\nSergey Obukhov"));
        assert!(!space.has_signature("Blah"));

        let anonymous = feature_space("");
        assert!(anonymous.has_signature("Hello\n\nbob@example.com\n555-226-2345"));
        assert!(!anonymous.has_signature("Hello\n\nbob@example.com"));
        // long lines are ignored by the gate
        assert!(!anonymous.has_signature(
            "Hello\n\nplease write to bob@example.com for details\ncall 555-226-2345 any day of the week"
        ));
    }

    #[test]
    fn test_gate_counts_single_contact_lines() {
        let space = feature_space("");
        // a line carrying both email and url is not an upvote
        let body = "Hello\n\nbob@www.example.com\n555-226-2345";
        let vectors = space.window_features(body, GATE_LINE_MAX_LEN);
        assert!(vectors[1].get(Feature::Email) && vectors[1].get(Feature::Url));
        assert!(!space.has_signature(body));

        assert!(space.has_signature("Hello\n\nwww.example.com\n555-226-2345"));
    }
}
