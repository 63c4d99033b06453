/// Inflection: indefinite articles, plurals and ordinals for modifiers.
///
/// Two implementations are provided. `EnglishInflector` knows the usual
/// exceptions of English spelling and pronunciation; `FallbackInflector`
/// is a documented approximation (vowel test for articles, `s`/`es` for
/// plurals). Which one is used is chosen once, through `InflectorKind`.

use serde::{Deserialize, Serialize};

/// Linguistic capability consumed by the `.a`, `.s` and `.th` modifiers.
pub trait Inflector: Send + Sync {
    /// `"a"` or `"an"` for the phrase starting with `word`.
    fn article(&self, word: &str) -> &'static str;

    /// Plural of `word`; for a phrase, the last word is pluralized.
    fn plural(&self, word: &str) -> String;

    /// `1` → `1st`, `12` → `12th`, `23` → `23rd`. Non-numbers get `th`.
    fn ordinal(&self, number: &str) -> String {
        let digits = number.trim().trim_start_matches('-');
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return format!("{}th", number);
        }
        let bytes = digits.as_bytes();
        let last = bytes[bytes.len() - 1];
        let tens = if bytes.len() > 1 { bytes[bytes.len() - 2] } else { b'0' };
        let suffix = match (tens, last) {
            (b'1', _) => "th",
            (_, b'1') => "st",
            (_, b'2') => "nd",
            (_, b'3') => "rd",
            _ => "th",
        };
        format!("{}{}", number, suffix)
    }
}

/// Which inflector a generator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InflectorKind {
    #[default]
    Full,
    Fallback,
}

impl InflectorKind {
    pub fn inflector(self) -> &'static dyn Inflector {
        match self {
            Self::Full => &EnglishInflector,
            Self::Fallback => &FallbackInflector,
        }
    }
}

/// Heuristic inflector: an approximation, not linguistically complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInflector;

impl Inflector for FallbackInflector {
    fn article(&self, word: &str) -> &'static str {
        match word.trim_start().chars().next() {
            Some(c) if "aeiou".contains(c.to_ascii_lowercase()) => "an",
            _ => "a",
        }
    }

    fn plural(&self, word: &str) -> String {
        if word.is_empty() {
            return String::new();
        }
        let lower = word.to_lowercase();
        if ["s", "x", "z", "ch", "sh"].iter().any(|end| lower.ends_with(end)) {
            format!("{}es", word)
        } else {
            format!("{}s", word)
        }
    }
}

/// Rule-based English inflector.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflector;

/// Vowel-initial words pronounced with a leading consonant sound.
const CONSONANT_SOUND_PREFIXES: &[&str] = &[
    "one", "once", "eu", "ewe", "uni", "use", "usu", "uti", "ute", "ura", "uri", "uro", "ubi",
    "uku", "ufo", "uvu", "ouija",
];

/// Exceptions to `CONSONANT_SOUND_PREFIXES`.
const VOWEL_SOUND_PREFIXES: &[&str] = &["unin", "unim", "unid", "unil", "unir"];

/// Words starting with a silent `h`.
const SILENT_H_PREFIXES: &[&str] = &["hour", "honest", "honor", "honour", "heir", "herb"];

/// Letters whose names start with a vowel sound, for acronyms.
const VOWEL_SOUND_LETTERS: &str = "AEFHILMNORSX";

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("person", "people"),
    ("mouse", "mice"),
    ("louse", "lice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
    ("die", "dice"),
    ("cactus", "cacti"),
    ("fungus", "fungi"),
    ("nucleus", "nuclei"),
    ("radius", "radii"),
    ("crisis", "crises"),
    ("analysis", "analyses"),
    ("thesis", "theses"),
    ("phenomenon", "phenomena"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("leaf", "leaves"),
    ("loaf", "loaves"),
    ("knife", "knives"),
    ("life", "lives"),
    ("wife", "wives"),
    ("wolf", "wolves"),
    ("half", "halves"),
    ("calf", "calves"),
    ("elf", "elves"),
    ("self", "selves"),
    ("shelf", "shelves"),
    ("thief", "thieves"),
    ("potato", "potatoes"),
    ("tomato", "tomatoes"),
    ("hero", "heroes"),
    ("echo", "echoes"),
    ("veto", "vetoes"),
    ("torpedo", "torpedoes"),
    ("quiz", "quizzes"),
];

const UNINFLECTED: &[&str] = &[
    "sheep", "fish", "deer", "moose", "series", "species", "aircraft", "news", "salmon", "trout",
    "bison", "swine", "information", "rice", "equipment",
];

impl Inflector for EnglishInflector {
    fn article(&self, word: &str) -> &'static str {
        let first: String = word
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .chars()
            .take_while(|c| c.is_alphanumeric())
            .collect();
        let Some(initial) = first.chars().next() else {
            return "a";
        };

        if initial.is_ascii_digit() {
            // eight, eleven, eighteen, eighty...
            let digits = first.len();
            let eleven_or_eighteen =
                digits % 3 == 2 && (first.starts_with("11") || first.starts_with("18"));
            return if initial == '8' || eleven_or_eighteen {
                "an"
            } else {
                "a"
            };
        }

        if first.chars().count() > 1 && first.chars().all(|c| c.is_ascii_uppercase()) {
            return if VOWEL_SOUND_LETTERS.contains(initial) {
                "an"
            } else {
                "a"
            };
        }

        let lower = first.to_lowercase();
        if VOWEL_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return "an";
        }
        if CONSONANT_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return "a";
        }
        if SILENT_H_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return "an";
        }
        if lower.len() == 1 {
            return if VOWEL_SOUND_LETTERS.contains(initial.to_ascii_uppercase()) {
                "an"
            } else {
                "a"
            };
        }
        if lower.starts_with(['a', 'e', 'i', 'o', 'u']) {
            "an"
        } else {
            "a"
        }
    }

    fn plural(&self, word: &str) -> String {
        let split = word
            .rfind(|c: char| !c.is_alphabetic())
            .map_or(0, |i| i + word[i..].chars().next().map_or(1, char::len_utf8));
        let (head, last) = word.split_at(split);
        if last.is_empty() {
            return word.to_string();
        }
        format!("{}{}", head, match_case(last, &plural_of(&last.to_lowercase())))
    }
}

fn plural_of(word: &str) -> String {
    if UNINFLECTED.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(single, _)| *single == word) {
        return plural.to_string();
    }
    for (single, plural) in [("woman", "women"), ("man", "men")] {
        if let Some(stem) = word.strip_suffix(single) {
            if ["fire", "police", "chair", "sales", "fisher", "country"].contains(&stem) {
                return format!("{}{}", stem, plural);
            }
        }
    }

    let mut chars = word.chars().rev();
    let last = chars.next();
    let before = chars.next();
    match (before, last) {
        (Some(b), Some('y')) if !"aeiou".contains(b) => {
            format!("{}ies", &word[..word.len() - 1])
        }
        _ if ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) => {
            format!("{}es", word)
        }
        _ => format!("{}s", word),
    }
}

/// Give `inflected` the capitalization pattern of `original`.
fn match_case(original: &str, inflected: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return inflected.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        return capitalize(inflected);
    }
    inflected.to_string()
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Uppercase the first letter of every word and lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c != '\'';
        }
    }
    out
}

/// Resolve inline `a(n)` and `word(s)` markers in expanded text.
///
/// `a(n)` becomes the article for the next word, keeping the case of the
/// marker (`A(n)` → `A`/`An`, `A(N)` → `A`/`AN`). `word(s)` is pluralized
/// unless the closest preceding number is exactly 1.
pub fn resolve_inline(text: &str, inflector: &dyn Inflector) -> String {
    if !text.contains('(') {
        return text.to_string();
    }
    resolve_plurals(&resolve_articles(text, inflector), inflector)
}

fn resolve_articles(text: &str, inflector: &dyn Inflector) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let is_marker = i + 4 <= chars.len()
            && chars[i].eq_ignore_ascii_case(&'a')
            && chars[i + 1] == '('
            && chars[i + 2].eq_ignore_ascii_case(&'n')
            && chars[i + 3] == ')'
            && (i == 0 || !chars[i - 1].is_alphanumeric());
        if !is_marker {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let next_word: String = chars[i + 4..]
            .iter()
            .skip_while(|c| c.is_whitespace())
            .take_while(|c| c.is_alphanumeric())
            .collect();
        let article = if next_word.is_empty() {
            "a"
        } else {
            inflector.article(&next_word)
        };
        let mut article: String = article.to_string();
        if chars[i].is_uppercase() {
            article = capitalize(&article);
        }
        if chars[i + 2].is_uppercase() {
            article = article.to_uppercase();
        }
        out.push_str(&article);
        i += 4;
    }
    out
}

fn resolve_plurals(text: &str, inflector: &dyn Inflector) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest
        .find("(s)")
        .into_iter()
        .chain(rest.find("(S)"))
        .min()
    {
        let before = &rest[..pos];
        let marker = &rest[pos + 1..pos + 2];
        let word_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphabetic())
            .last()
            .map_or(before.len(), |(i, _)| i);
        let word = &before[word_start..];

        out.push_str(&before[..word_start]);
        if word.is_empty() {
            out.push_str(marker);
        } else if preceding_number(&out) == Some(1.0) {
            out.push_str(word);
        } else {
            out.push_str(&inflector.plural(word));
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    out
}

/// The number closest to the end of `text`, if any.
fn preceding_number(text: &str) -> Option<f64> {
    let end = text.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = text[..end]
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(0, |(i, c)| i + c.len_utf8());
    text[start..end].trim_start_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("elephant", "an")]
    #[case("dog", "a")]
    #[case("Umbrella", "an")]
    #[case("", "a")]
    fn fallback_articles(#[case] word: &str, #[case] expected: &str) {
        assert_eq!(FallbackInflector.article(word), expected);
    }

    #[rstest]
    #[case("cat", "cats")]
    #[case("bus", "buses")]
    #[case("box", "boxes")]
    #[case("buzz", "buzzes")]
    #[case("church", "churches")]
    #[case("dish", "dishes")]
    #[case("baby", "babys")]
    fn fallback_plurals(#[case] word: &str, #[case] expected: &str) {
        assert_eq!(FallbackInflector.plural(word), expected);
    }

    #[rstest]
    #[case("elephant", "an")]
    #[case("dog", "a")]
    #[case("hour", "an")]
    #[case("honest man", "an")]
    #[case("university", "a")]
    #[case("unicorn", "a")]
    #[case("uninteresting thing", "an")]
    #[case("one-eyed cat", "a")]
    #[case("European", "a")]
    #[case("FBI agent", "an")]
    #[case("UFO", "a")]
    #[case("8-ball", "an")]
    #[case("11", "an")]
    #[case("12", "a")]
    #[case("18000", "an")]
    #[case("x", "an")]
    #[case("hat", "a")]
    fn english_articles(#[case] word: &str, #[case] expected: &str) {
        assert_eq!(EnglishInflector.article(word), expected);
    }

    #[rstest]
    #[case("cat", "cats")]
    #[case("baby", "babies")]
    #[case("day", "days")]
    #[case("box", "boxes")]
    #[case("child", "children")]
    #[case("Mouse", "Mice")]
    #[case("sheep", "sheep")]
    #[case("knife", "knives")]
    #[case("fireman", "firemen")]
    #[case("human", "humans")]
    #[case("big red dog", "big red dogs")]
    #[case("CAT", "CATS")]
    #[case("", "")]
    fn english_plurals(#[case] word: &str, #[case] expected: &str) {
        assert_eq!(EnglishInflector.plural(word), expected);
    }

    #[rstest]
    #[case("1", "1st")]
    #[case("2", "2nd")]
    #[case("3", "3rd")]
    #[case("4", "4th")]
    #[case("11", "11th")]
    #[case("12", "12th")]
    #[case("13", "13th")]
    #[case("21", "21st")]
    #[case("102", "102nd")]
    #[case("-1", "-1st")]
    #[case("last", "lastth")]
    fn ordinals(#[case] number: &str, #[case] expected: &str) {
        assert_eq!(EnglishInflector.ordinal(number), expected);
        assert_eq!(FallbackInflector.ordinal(number), expected);
    }

    #[test]
    fn kind_selects_inflector() {
        assert_eq!(InflectorKind::Full.inflector().article("hour"), "an");
        assert_eq!(InflectorKind::Fallback.inflector().article("hour"), "a");
        assert_eq!(InflectorKind::default(), InflectorKind::Full);
    }

    #[test]
    fn case_helpers() {
        assert_eq!(capitalize("hello WORLD"), "Hello WORLD");
        assert_eq!(capitalize(""), "");
        assert_eq!(title_case("the cat's HAT"), "The Cat's Hat");
    }

    #[rstest]
    #[case("a(n) apple", "an apple")]
    #[case("a(n) pear", "a pear")]
    #[case("A(n) owl", "An owl")]
    #[case("A(N) OWL", "AN OWL")]
    #[case("banana(n)", "banana(n)")]
    #[case("a(n)", "a")]
    #[case("3 cat(s)", "3 cats")]
    #[case("1 cat(s)", "1 cat")]
    #[case("1 big box(s)", "1 big box")]
    #[case("1.5 box(s)", "1.5 boxes")]
    #[case("cat(s) and dog(s)", "cats and dogs")]
    #[case("(s)", "s")]
    #[case("€5 coin(s)", "€5 coins")]
    #[case("€1 coin(s)", "€1 coin")]
    #[case("ünf 1 Äpfel(s)", "ünf 1 Äpfel")]
    #[case("no markers", "no markers")]
    fn inline_markers(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(resolve_inline(text, &EnglishInflector), expected);
    }

    proptest! {
        #[test]
        fn fallback_is_total(word in "\\PC*") {
            let article = FallbackInflector.article(&word);
            prop_assert!(article == "a" || article == "an");
            let plural = FallbackInflector.plural(&word);
            prop_assert!(plural.starts_with(&word));
        }

        #[test]
        fn english_never_panics(word in "\\PC*") {
            let article = EnglishInflector.article(&word);
            prop_assert!(article == "a" || article == "an");
            let _ = EnglishInflector.plural(&word);
            let _ = resolve_inline(&word, &EnglishInflector);
        }
    }
}
