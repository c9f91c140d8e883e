//! Metaphone phonetic encoding
//!
//! Coarse pronunciation codes used to match surnames despite spelling
//! variation ("Smith" / "Smyth" both encode to `SM0`). Encoding never fails
//! loudly: input with no encodable letters yields `None`, which callers treat
//! as "no phonetic evidence".

use unicode_normalization::UnicodeNormalization;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

fn is_vowel(c: Option<char>) -> bool {
    c.is_some_and(|c| VOWELS.contains(&c))
}

fn is_front_vowel(c: Option<char>) -> bool {
    matches!(c, Some('e') | Some('i') | Some('y'))
}

/// Encode a word with the classic Metaphone rules
///
/// Returns the uppercase code, or `None` when nothing could be encoded.
/// Spaces separate the codes of multi-word input.
pub fn metaphone(word: &str) -> Option<String> {
    let chars: Vec<char> = word
        .nfkd()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .flat_map(|c| c.to_lowercase())
        .collect();

    // Initial letter exceptions: skip the first letter
    let skip_first = matches!(
        chars.as_slice(),
        ['k', 'n', ..] | ['g', 'n', ..] | ['p', 'n', ..] | ['w', 'r', ..] | ['a', 'e', ..]
    );
    let chars = if skip_first { &chars[1..] } else { &chars[..] };

    let at = |i: usize| chars.get(i).copied();
    let mut code = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let prev = if i > 0 { at(i - 1) } else { None };
        let next = at(i + 1);
        let after = at(i + 2);
        let word_start = i == 0 || prev == Some(' ');

        // Doubled letters collapse, except C
        if next == Some(c) && c != 'c' {
            i += 1;
            continue;
        }

        match c {
            'a' | 'e' | 'i' | 'o' | 'u' => {
                if word_start {
                    code.push(c);
                }
            }
            'b' => {
                // Silent in a trailing "mb"
                let trailing_mb = prev == Some('m') && matches!(next, None | Some(' '));
                if !trailing_mb {
                    code.push('b');
                }
            }
            'c' => {
                if (next == Some('i') && after == Some('a')) || next == Some('h') {
                    code.push('x');
                    i += 1;
                } else if is_front_vowel(next) {
                    code.push('s');
                    i += 1;
                } else {
                    code.push('k');
                }
            }
            'd' => {
                if next == Some('g') && is_front_vowel(after) {
                    code.push('j');
                    i += 2;
                } else {
                    code.push('t');
                }
            }
            'f' | 'j' | 'l' | 'm' | 'n' | 'r' => code.push(c),
            'g' => {
                if is_front_vowel(next) {
                    code.push('j');
                } else if next == Some('h') && !is_vowel(after) {
                    // "gh" not before a vowel is silent
                    i += 1;
                } else if next == Some('n') && matches!(after, None | Some(' ')) {
                    // Trailing "gn"
                    i += 1;
                } else {
                    code.push('k');
                }
            }
            'h' => {
                if i == 0 || is_vowel(next) || !is_vowel(prev) {
                    code.push('h');
                }
            }
            'k' => {
                if prev != Some('c') {
                    code.push('k');
                }
            }
            'p' => {
                if next == Some('h') {
                    code.push('f');
                    i += 1;
                } else {
                    code.push('p');
                }
            }
            'q' => code.push('k'),
            's' => {
                if next == Some('h') {
                    code.push('x');
                    i += 1;
                } else if next == Some('i') && matches!(after, Some('o') | Some('a')) {
                    code.push('x');
                    i += 2;
                } else {
                    code.push('s');
                }
            }
            't' => {
                if next == Some('i') && matches!(after, Some('o') | Some('a')) {
                    code.push('x');
                } else if next == Some('h') {
                    code.push('0');
                    i += 1;
                } else if !(next == Some('c') && after == Some('h')) {
                    code.push('t');
                }
            }
            'v' => code.push('f'),
            'w' => {
                if i == 0 && next == Some('h') {
                    code.push('w');
                    i += 1;
                } else if is_vowel(next) {
                    code.push('w');
                }
            }
            'x' => {
                if i == 0 {
                    if next == Some('h') || (next == Some('i') && matches!(after, Some('o') | Some('a')))
                    {
                        code.push('x');
                    } else {
                        code.push('s');
                    }
                } else {
                    code.push_str("ks");
                }
            }
            'y' => {
                if is_vowel(next) {
                    code.push('y');
                }
            }
            'z' => code.push('s'),
            ' ' => {
                if !code.is_empty() && !code.ends_with(' ') {
                    code.push(' ');
                }
            }
            _ => {}
        }
        i += 1;
    }

    let code = code.trim_end().to_uppercase();
    (!code.is_empty()).then_some(code)
}

/// True when both words have the same non-empty code
pub fn metaphone_match(a: &str, b: &str) -> bool {
    match (metaphone(a), metaphone(b)) {
        (Some(code_a), Some(code_b)) => code_a == code_b,
        _ => false,
    }
}
