//! HTML character reference decoding.

use std::sync::LazyLock;

use regex::{Captures, Regex};

// One alternation so every reference is decoded exactly once: "&amp;#38;" becomes "&#38;",
// never "&".
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|([a-zA-Z][a-zA-Z0-9]*));")
        .expect("entity pattern is valid")
});

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        // XML core
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        // whitespace
        "nbsp" => '\u{00A0}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        // dashes and punctuation
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "minus" => '\u{2212}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "sbquo" => '\u{201A}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bdquo" => '\u{201E}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        "lsaquo" => '\u{2039}',
        "rsaquo" => '\u{203A}',
        "prime" => '\u{2032}',
        "Prime" => '\u{2033}',
        "sect" => '\u{00A7}',
        "para" => '\u{00B6}',
        "dagger" => '\u{2020}',
        "Dagger" => '\u{2021}',
        "iexcl" => '\u{00A1}',
        "iquest" => '\u{00BF}',
        // currency
        "euro" => '\u{20AC}',
        "pound" => '\u{00A3}',
        "yen" => '\u{00A5}',
        "cent" => '\u{00A2}',
        "curren" => '\u{00A4}',
        // legal
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        // math
        "times" => '\u{00D7}',
        "divide" => '\u{00F7}',
        "plusmn" => '\u{00B1}',
        "frac12" => '\u{00BD}',
        "frac14" => '\u{00BC}',
        "frac34" => '\u{00BE}',
        "deg" => '\u{00B0}',
        "sup1" => '\u{00B9}',
        "sup2" => '\u{00B2}',
        "sup3" => '\u{00B3}',
        "micro" => '\u{00B5}',
        "permil" => '\u{2030}',
        "ne" => '\u{2260}',
        "le" => '\u{2264}',
        "ge" => '\u{2265}',
        "asymp" => '\u{2248}',
        "infin" => '\u{221E}',
        "sum" => '\u{2211}',
        "radic" => '\u{221A}',
        // arrows
        "larr" => '\u{2190}',
        "rarr" => '\u{2192}',
        "uarr" => '\u{2191}',
        "darr" => '\u{2193}',
        "harr" => '\u{2194}',
        "rArr" => '\u{21D2}',
        "lArr" => '\u{21D0}',
        // greek
        "alpha" => '\u{03B1}',
        "beta" => '\u{03B2}',
        "gamma" => '\u{03B3}',
        "delta" => '\u{03B4}',
        "epsilon" => '\u{03B5}',
        "lambda" => '\u{03BB}',
        "mu" => '\u{03BC}',
        "pi" => '\u{03C0}',
        "sigma" => '\u{03C3}',
        "tau" => '\u{03C4}',
        "phi" => '\u{03C6}',
        "omega" => '\u{03C9}',
        "Delta" => '\u{0394}',
        "Sigma" => '\u{03A3}',
        "Omega" => '\u{03A9}',
        // accented latin
        "agrave" => '\u{00E0}',
        "aacute" => '\u{00E1}',
        "acirc" => '\u{00E2}',
        "atilde" => '\u{00E3}',
        "auml" => '\u{00E4}',
        "aring" => '\u{00E5}',
        "aelig" => '\u{00E6}',
        "egrave" => '\u{00E8}',
        "eacute" => '\u{00E9}',
        "ecirc" => '\u{00EA}',
        "euml" => '\u{00EB}',
        "igrave" => '\u{00EC}',
        "iacute" => '\u{00ED}',
        "icirc" => '\u{00EE}',
        "iuml" => '\u{00EF}',
        "ograve" => '\u{00F2}',
        "oacute" => '\u{00F3}',
        "ocirc" => '\u{00F4}',
        "otilde" => '\u{00F5}',
        "ouml" => '\u{00F6}',
        "oslash" => '\u{00F8}',
        "ugrave" => '\u{00F9}',
        "uacute" => '\u{00FA}',
        "ucirc" => '\u{00FB}',
        "uuml" => '\u{00FC}',
        "yacute" => '\u{00FD}',
        "yuml" => '\u{00FF}',
        "Agrave" => '\u{00C0}',
        "Aacute" => '\u{00C1}',
        "Acirc" => '\u{00C2}',
        "Atilde" => '\u{00C3}',
        "Auml" => '\u{00C4}',
        "Aring" => '\u{00C5}',
        "AElig" => '\u{00C6}',
        "Egrave" => '\u{00C8}',
        "Eacute" => '\u{00C9}',
        "Ecirc" => '\u{00CA}',
        "Euml" => '\u{00CB}',
        "Igrave" => '\u{00CC}',
        "Iacute" => '\u{00CD}',
        "Icirc" => '\u{00CE}',
        "Iuml" => '\u{00CF}',
        "Ograve" => '\u{00D2}',
        "Oacute" => '\u{00D3}',
        "Ocirc" => '\u{00D4}',
        "Otilde" => '\u{00D5}',
        "Ouml" => '\u{00D6}',
        "Oslash" => '\u{00D8}',
        "Ugrave" => '\u{00D9}',
        "Uacute" => '\u{00DA}',
        "Ucirc" => '\u{00DB}',
        "Uuml" => '\u{00DC}',
        "Yacute" => '\u{00DD}',
        "ntilde" => '\u{00F1}',
        "Ntilde" => '\u{00D1}',
        "ccedil" => '\u{00E7}',
        "Ccedil" => '\u{00C7}',
        "szlig" => '\u{00DF}',
        _ => return None,
    };
    Some(c)
}

/// Code points 1..=0x10FFFF that form a valid `char`. Zero, surrogates and
/// out-of-range values leave the reference untouched.
fn numeric_reference(digits: &str, radix: u32) -> Option<char> {
    let value = u32::from_str_radix(digits, radix).ok()?;
    if value == 0 {
        return None;
    }
    char::from_u32(value)
}

/// Decode named, decimal and hexadecimal character references. Unknown names and
/// malformed references (for example a missing `;`) are kept verbatim.
pub fn decode(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                numeric_reference(dec.as_str(), 10)
            } else if let Some(hex) = caps.get(2) {
                numeric_reference(hex.as_str(), 16)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
