// Label normalizer - turns raw tag labels into the final prompt vocabulary
//
// Pipeline per label:
// 1. Strip an optional weighting wrapper: `(x)`, `((x))`, `((x:1.30))`
// 2. Split combo labels on `/` ("synthwave / electro")
// 3. Per token: split off trailing `:weight` suffixes, then alias table
//    (short-circuits), spelling fixes, plural → singular, then internal
//    whitespace → hyphen unless a hyphenated proper noun is present
// 4. Re-wrap with the captured wrapper and verbatim weight
// 5. Insert into an ordered set, comparing case-insensitively
//
// The whole thing must be idempotent. Every value in the tables below is a
// fixed point of `normalize_token`, which the tests check.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `(open parens)(inner)(optional :weight)(close parens)`; inner may not contain parens.
static WRAPPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\(+)([^()]*?)(:\d+(?:\.\d+)?)?(\)+)$").expect("wrapper regex is valid")
});

/// A single `:weight` suffix at the end of a token.
static TRAILING_WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*(:\d+(?:\.\d+)?)$").expect("weight regex is valid")
});

/// Whole-token replacements. Matching one skips every other step.
const ALIASES: &[(&str, &str)] = &[
    ("lo-fi hip hop", "lofi"),
    ("lo-fi", "lofi"),
    ("lo fi", "lofi"),
    ("hip hop", "hip-hop"),
    ("rnb", "r&b"),
    ("rhythm and blues", "r&b"),
    ("drum n bass", "dnb"),
    ("drum and bass", "dnb"),
    ("d&b", "dnb"),
    ("edm", "electronic-dance"),
    ("808s", "tr-808"),
];

const SPELLING_FIXES: &[(&str, &str)] = &[
    ("melodical", "melodic"),
    ("baseline", "bassline"),
    ("baselines", "basslines"),
    ("synthwav", "synthwave"),
    ("arpegios", "arpeggios"),
    ("arpegio", "arpeggio"),
    ("atmosferic", "atmospheric"),
    ("acoustical", "acoustic"),
    ("orchestal", "orchestral"),
    ("ambiant", "ambient"),
];

/// Applied to the whole (spelling-corrected) token.
const PLURALS: &[(&str, &str)] = &[
    ("breakdowns", "breakdown"),
    ("basslines", "bassline"),
    ("arpeggios", "arpeggio"),
    ("synths", "synth"),
    ("analog synths", "analog synth"),
    ("pads", "pad"),
    ("strings", "string"),
    ("guitars", "guitar"),
    ("distorted guitars", "distorted guitar"),
    ("drums", "drum"),
    ("vocals", "vocal"),
    ("female vocals", "female vocal"),
    ("male vocals", "male vocal"),
    ("harmonies", "harmony"),
    ("chords", "chord"),
    ("choirs", "choir"),
    ("horns", "horn"),
    ("claps", "clap"),
    ("risers", "riser"),
];

/// Hyphenated proper nouns; a token containing any of these keeps its spaces.
const HYPHEN_EXCEPTIONS: &[&str] = &[
    "tb-303",
    "tr-808",
    "tr-909",
    "juno-106",
    "sh-101",
    "j-pop",
    "k-pop",
    "c-pop",
    "dj-friendly",
    "hi-fi",
];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(from, _)| *from == key).map(|(_, to)| *to)
}

/// A label with its weighting wrapper peeled off.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Wrapped<'a> {
    open: &'a str,
    inner: &'a str,
    weight: Option<&'a str>,
    close: &'a str,
}

fn unwrap_label(label: &str) -> Option<Wrapped<'_>> {
    let caps = WRAPPER_RE.captures(label)?;
    let inner = caps.get(2)?;
    let weight = caps.get(3);
    // `((:1.2))` has nothing to weight; the whole inside is literal text.
    let (inner, weight) = match weight {
        Some(w) if inner.as_str().trim().is_empty() => (&label[inner.start()..w.end()], None),
        _ => (inner.as_str(), weight.map(|m| m.as_str())),
    };
    Some(Wrapped {
        open: caps.get(1)?.as_str(),
        inner,
        weight,
        close: caps.get(4)?.as_str(),
    })
}

/// Alias, spelling, plural and hyphenation steps over collapsed lowercase words.
fn normalize_words(words: &str) -> String {
    if let Some(alias) = lookup(ALIASES, words) {
        return alias.to_string();
    }

    let corrected = lookup(SPELLING_FIXES, words).unwrap_or(words);
    let singular = lookup(PLURALS, corrected).unwrap_or(corrected);

    if singular.contains(' ') && !HYPHEN_EXCEPTIONS.iter().any(|exc| singular.contains(exc)) {
        return singular.replace(' ', "-");
    }
    singular.to_string()
}

/// Normalize one bare token (no wrapper, no `/`). Returns `None` for blank input.
///
/// Trailing `:weight` suffixes are split off, kept verbatim and re-attached
/// without spaces, so a token reads the same inside or outside a wrapper.
pub fn normalize_token(raw: &str) -> Option<String> {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if collapsed.is_empty() {
        return None;
    }

    let mut body = collapsed.as_str();
    let mut weights: Vec<&str> = Vec::new();
    while let Some(caps) = TRAILING_WEIGHT_RE.captures(body) {
        let (Some(rest), Some(weight)) = (caps.get(1), caps.get(2)) else {
            break;
        };
        weights.push(weight.as_str());
        body = rest.as_str();
    }
    weights.reverse();
    let weights = weights.concat();

    if body.trim().is_empty() {
        return Some(weights);
    }
    Some(normalize_words(body.trim()) + &weights)
}

/// Normalize one raw label into zero or more output tokens.
pub fn normalize_label(label: &str) -> Vec<String> {
    let trimmed = label.trim();
    match unwrap_label(trimmed) {
        Some(w) => w
            .inner
            .split('/')
            .filter_map(normalize_token)
            .map(|token| format!("{}{}{}{}", w.open, token, w.weight.unwrap_or(""), w.close))
            .collect(),
        // "(Pads) / Strings": each piece may carry its own wrapper
        None => trimmed
            .split('/')
            .flat_map(|piece| {
                let piece = piece.trim();
                if unwrap_label(piece).is_some() {
                    normalize_label(piece)
                } else {
                    normalize_token(piece).into_iter().collect()
                }
            })
            .collect(),
    }
}

/// Normalize an ordered list of labels into a deduplicated ordered list of
/// output tokens. First occurrence wins; comparison ignores case.
pub fn normalize<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        for token in normalize_label(label.as_ref()) {
            if seen.insert(token.to_lowercase()) {
                out.push(token);
            }
        }
    }
    out
}
