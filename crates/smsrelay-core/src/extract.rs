//! Verification code extraction.
//!
//! A code is a run of 4–8 ASCII digits with no digit directly before or
//! after it. Snippets are checked in three passes, first hit wins:
//!
//! 1. Fixed phrases such as `验证码为：123456`, line by line.
//! 2. Any snippet that mentions a code keyword; its first digit run.
//! 3. All snippets joined; the first digit run anywhere.
//!
//! Pass 3 is a heuristic. When a message without keywords carries several
//! candidate runs (a code and an order number, say) the earliest one wins,
//! which is not guaranteed to be the code.

use std::ops::RangeInclusive;

const CODE_LENGTH: RangeInclusive<usize> = 4..=8;

/// Matched case-sensitively.
const CODE_KEYWORDS: [&str; 3] = ["验证码", "校验码", "驗證碼"];

/// Matched case-insensitively.
const LATIN_CODE_KEYWORDS: [&str; 2] = ["verification code", "auth code"];

/// Must be followed by a full-width or ASCII colon, then the code.
const CODE_PHRASES: [&str; 2] = ["验证码为", "验证码是"];

/// Find the most likely verification code in `snippets`.
pub fn extract<S: AsRef<str>>(snippets: &[S]) -> Option<String> {
    let snippets: Vec<&str> = snippets
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(code) = snippets.iter().find_map(|s| phrase_code(s)) {
        return Some(code.to_owned());
    }

    if let Some(code) = snippets
        .iter()
        .filter(|s| has_keyword(s))
        .find_map(|s| digit_runs(s).next())
    {
        return Some(code.to_owned());
    }

    let merged = snippets.join("\n");
    digit_runs(&merged).next().map(str::to_owned)
}

/// Maximal ASCII digit runs whose length is a plausible code length.
fn digit_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| CODE_LENGTH.contains(&run.len()))
}

fn has_keyword(snippet: &str) -> bool {
    if CODE_KEYWORDS.iter().any(|k| snippet.contains(k)) {
        return true;
    }
    let lowered = snippet.to_lowercase();
    LATIN_CODE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

fn phrase_code(snippet: &str) -> Option<&str> {
    snippet.lines().find_map(|line| {
        CODE_PHRASES.iter().find_map(|phrase| {
            line.match_indices(phrase)
                .find_map(|(idx, _)| code_after_separator(&line[idx + phrase.len()..]))
        })
    })
}

fn code_after_separator(rest: &str) -> Option<&str> {
    let rest = rest
        .strip_prefix('：')
        .or_else(|| rest.strip_prefix(':'))?
        .trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let run = &rest[..end];
    CODE_LENGTH.contains(&run.len()).then_some(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_snippet_beats_later_runs() {
        let snippets = ["您的验证码为：8839", "其他文本 999999"];
        assert_eq!(extract(&snippets).as_deref(), Some("8839"));
    }

    #[test]
    fn short_runs_are_ignored() {
        assert_eq!(
            extract(&["random text 12 and 345678"]).as_deref(),
            Some("345678")
        );
    }

    #[test]
    fn no_digits_no_code() {
        assert_eq!(extract(&["no digits here"]), None);
        assert_eq!(extract::<&str>(&[]), None);
        assert_eq!(extract(&["", ""]), None);
    }

    #[test]
    fn long_runs_are_not_split() {
        // Ten digits: no 4–8 digit window is bounded by non-digits.
        assert_eq!(extract(&["call +1234567890"]), None);
        assert_eq!(extract(&["123456789 and 4455"]).as_deref(), Some("4455"));
    }

    #[test]
    fn keyword_wins_over_earlier_unrelated_number() {
        let snippets = ["Order 20240101 shipped", "Your verification code: 7731"];
        assert_eq!(extract(&snippets).as_deref(), Some("7731"));
    }

    #[test]
    fn latin_keywords_are_case_insensitive() {
        assert_eq!(
            extract(&["ref 5555", "AUTH CODE 0420"]).as_deref(),
            Some("0420")
        );
    }

    #[test]
    fn keyword_without_digits_falls_through_to_global_scan() {
        let snippets = ["验证码已发送", "序号 66778"];
        assert_eq!(extract(&snippets).as_deref(), Some("66778"));
    }

    #[test]
    fn global_scan_takes_first_positional_match() {
        let snippets = ["first 1111 then 2222", "later 3333"];
        assert_eq!(extract(&snippets).as_deref(), Some("1111"));
    }

    #[test]
    fn fixed_phrase_is_checked_before_keywords() {
        // The keyword snippet comes first but its first run is not the code.
        let snippets = ["校验码 尾号 1234 的卡", "验证码是: 908172"];
        assert_eq!(extract(&snippets).as_deref(), Some("908172"));
    }

    #[test]
    fn fixed_phrase_spans_lines_independently() {
        let snippet = "【Bank】\n您的验证码为：  456789，5分钟内有效";
        assert_eq!(phrase_code(snippet), Some("456789"));
        assert_eq!(phrase_code("验证码为 123456"), None);
    }

    #[test]
    fn duplicate_snippets_do_not_change_the_result() {
        let body = "Code 8080 for login";
        assert_eq!(extract(&[body, body, body]).as_deref(), Some("8080"));
    }

    #[test]
    fn digits_glued_to_letters_still_count() {
        assert_eq!(extract(&["G-482910 is your code"]).as_deref(), Some("482910"));
    }
}
