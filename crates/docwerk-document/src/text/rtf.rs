// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RTF control-word stripping.

/// Destinations whose content is never visible text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "themedata",
    "datastore",
    "latentstyles",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "mmathPr",
];

#[derive(Debug, Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Fallback characters to drop after a `\u` escape (`\ucN`).
    unicode_skip: usize,
}

/// Visible text of an RTF document.
///
/// Handles groups, ignorable (`\*`) and known non-text destinations,
/// paragraph/line/tab control words, `\'hh` Windows-1252 escapes and `\uN`
/// Unicode escapes with their fallback characters.
pub fn rtf_to_text(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState {
        skip: false,
        unicode_skip: 1,
    };
    let mut pending_fallback = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'{' => {
                stack.push(state);
                i += 1;
            }
            b'}' => {
                state = stack.pop().unwrap_or(state);
                pending_fallback = 0;
                i += 1;
            }
            b'\\' => {
                i += 1;
                let Some(&next) = bytes.get(i) else { break };
                match next {
                    b'\\' | b'{' | b'}' => {
                        emit(&mut out, &state, &mut pending_fallback, next as char);
                        i += 1;
                    }
                    b'\'' => {
                        let hex = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
                        if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                            emit(&mut out, &state, &mut pending_fallback, cp1252(value));
                            i += 3;
                        } else {
                            i += 1;
                        }
                    }
                    b'*' => {
                        state.skip = true;
                        i += 1;
                    }
                    b'~' => {
                        emit(&mut out, &state, &mut pending_fallback, ' ');
                        i += 1;
                    }
                    b'-' | b'_' => i += 1,
                    b'\n' | b'\r' => {
                        emit(&mut out, &state, &mut pending_fallback, '\n');
                        i += 1;
                    }
                    c if c.is_ascii_alphabetic() => {
                        let start = i;
                        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                            i += 1;
                        }
                        let word = std::str::from_utf8(&bytes[start..i]).unwrap_or("");
                        let num_start = i;
                        if i < bytes.len() && bytes[i] == b'-' {
                            i += 1;
                        }
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                        let param: Option<i32> = std::str::from_utf8(&bytes[num_start..i])
                            .ok()
                            .and_then(|n| n.parse().ok());
                        // A single space delimits the control word.
                        if i < bytes.len() && bytes[i] == b' ' {
                            i += 1;
                        }
                        control_word(word, param, &mut state, &mut out, &mut pending_fallback);
                    }
                    _ => i += 1,
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                // Runs of plain bytes; multi-byte UTF-8 is rare but tolerated.
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b'{' | b'}' | b'\\' | b'\r' | b'\n') {
                    i += 1;
                }
                for c in String::from_utf8_lossy(&bytes[start..i]).chars() {
                    emit(&mut out, &state, &mut pending_fallback, c);
                }
            }
        }
    }

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn control_word(
    word: &str,
    param: Option<i32>,
    state: &mut GroupState,
    out: &mut String,
    pending_fallback: &mut usize,
) {
    match word {
        "par" | "line" | "sect" | "page" | "row" => emit(out, state, pending_fallback, '\n'),
        "tab" | "cell" => emit(out, state, pending_fallback, '\t'),
        "emdash" => emit(out, state, pending_fallback, '—'),
        "endash" => emit(out, state, pending_fallback, '–'),
        "bullet" => emit(out, state, pending_fallback, '•'),
        "lquote" => emit(out, state, pending_fallback, '‘'),
        "rquote" => emit(out, state, pending_fallback, '’'),
        "ldblquote" => emit(out, state, pending_fallback, '“'),
        "rdblquote" => emit(out, state, pending_fallback, '”'),
        "uc" => state.unicode_skip = param.unwrap_or(1).max(0) as usize,
        "u" => {
            if let Some(code) = param {
                // Values above 32767 are written as negative 16-bit numbers.
                let code = if code < 0 { code + 65536 } else { code } as u32;
                let c = char::from_u32(code).unwrap_or('\u{FFFD}');
                emit(out, state, pending_fallback, c);
                *pending_fallback = state.unicode_skip;
            }
        }
        w if SKIPPED_DESTINATIONS.contains(&w) => state.skip = true,
        _ => {}
    }
}

fn emit(out: &mut String, state: &GroupState, pending_fallback: &mut usize, c: char) {
    if *pending_fallback > 0 {
        *pending_fallback -= 1;
        return;
    }
    if !state.skip {
        out.push(c);
    }
}

/// Windows-1252 byte to char; the 0x80-0x9F block differs from Latin-1.
fn cp1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž',
        '\u{8f}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}',
        'ž', 'Ÿ',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        other => other as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_header_tables_and_control_words() {
        let rtf = br"{\rtf1\ansi\deff0{\fonttbl{\f0 Times New Roman;}}{\colortbl;\red0\green0\blue0;}
\f0\fs24 Hello \b bold\b0  world.\par Second line.}";
        assert_eq!(rtf_to_text(rtf), "Hello bold world.\nSecond line.");
    }

    #[test]
    fn ignorable_destinations_are_skipped() {
        let rtf = br"{\rtf1{\*\generator Riched20;}Visible{\*\unknown hidden}}";
        assert_eq!(rtf_to_text(rtf), "Visible");
    }

    #[test]
    fn escapes_and_unicode() {
        let rtf = br"{\rtf1 caf\'e9 \{braces\} na\u239?ve}";
        assert_eq!(rtf_to_text(rtf), "café {braces} naïve");
    }

    #[test]
    fn tabs_and_cp1252_quotes() {
        let rtf = br"{\rtf1 a\tab b \'93q\'94}";
        assert_eq!(rtf_to_text(rtf), "a\tb “q”");
    }
}
