//! Exact + fuzzy member-name matcher (spec §4.4.3, C7): kana folding and
//! full/half-width folding so CSV rows with minor name-formatting drift
//! still resolve to the right member.

use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::id::MemberId;

pub fn normalize_exact(s: &str) -> String {
    s.trim().to_lowercase()
}

fn fold_char(c: char) -> char {
    let code = c as u32;
    match code {
        0x30A1..=0x30F6 => char::from_u32(code - 0x60).unwrap_or(c),
        0xFF10..=0xFF19 | 0xFF21..=0xFF3A | 0xFF41..=0xFF5A => {
            char::from_u32(code - 0xFEE0).unwrap_or(c)
        }
        _ => c,
    }
}

/// Builds on `normalize_exact`, then strips ASCII and ideographic
/// (`U+3000`) whitespace, folds katakana to hiragana, and folds full-width
/// ASCII letters/digits to half-width (spec §4.4.3).
pub fn normalize_fuzzy(s: &str) -> String {
    normalize_exact(s)
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != '\u{3000}')
        .map(fold_char)
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
    None,
}

#[derive(Clone, Debug)]
pub struct MemberMatcher {
    fuzzy_enabled: bool,
    exact_index: HashMap<String, MemberId>,
    /// Preserves insertion order so a fuzzy scan deterministically returns
    /// the first matching member when names collide after folding.
    fuzzy_entries: Vec<(String, MemberId)>,
}

impl MemberMatcher {
    pub fn build(members: &[(MemberId, String)], fuzzy_enabled: bool) -> Self {
        let mut exact_index = HashMap::with_capacity(members.len());
        let mut fuzzy_entries = Vec::with_capacity(members.len());
        for (id, display_name) in members {
            exact_index
                .entry(normalize_exact(display_name))
                .or_insert_with(|| id.clone());
            fuzzy_entries.push((normalize_fuzzy(display_name), id.clone()));
        }
        MemberMatcher {
            fuzzy_enabled,
            exact_index,
            fuzzy_entries,
        }
    }

    /// Exact hit first; if none and fuzzy matching is enabled, the first
    /// member whose fuzzy-normalized display name equals the fuzzy-
    /// normalized input. Empty input is an error; an unmatched name is a
    /// non-error `None` (spec §4.4.3).
    pub fn find(&self, name: &str) -> AppResult<Option<MemberId>> {
        if name.trim().is_empty() {
            return Err(AppError::validation("メンバー名を入力してください"));
        }
        if let Some(id) = self.exact_index.get(&normalize_exact(name)) {
            return Ok(Some(id.clone()));
        }
        if self.fuzzy_enabled {
            let folded = normalize_fuzzy(name);
            if let Some((_, id)) = self.fuzzy_entries.iter().find(|(key, _)| *key == folded) {
                return Ok(Some(id.clone()));
            }
        }
        Ok(None)
    }

    pub fn find_with_kind(&self, name: &str) -> AppResult<(MatchKind, Option<MemberId>)> {
        if name.trim().is_empty() {
            return Err(AppError::validation("メンバー名を入力してください"));
        }
        if let Some(id) = self.exact_index.get(&normalize_exact(name)) {
            return Ok((MatchKind::Exact, Some(id.clone())));
        }
        if self.fuzzy_enabled {
            let folded = normalize_fuzzy(name);
            if let Some((_, id)) = self.fuzzy_entries.iter().find(|(key, _)| *key == folded) {
                return Ok((MatchKind::Fuzzy, Some(id.clone())));
            }
        }
        Ok((MatchKind::None, None))
    }

    /// Per-index results, each tagged with how (or whether) it matched.
    pub fn match_all(&self, names: &[&str]) -> Vec<AppResult<(MatchKind, Option<MemberId>)>> {
        names.iter().map(|name| self.find_with_kind(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemberId, MemberId) {
        (MemberId::generate(), MemberId::generate())
    }

    #[test]
    fn exact_match_is_case_and_whitespace_insensitive() {
        let (taro, _) = sample();
        let matcher = MemberMatcher::build(&[(taro.clone(), "Taro".to_string())], false);
        assert_eq!(matcher.find("  taro  ").unwrap(), Some(taro));
    }

    #[test]
    fn fuzzy_folds_katakana_and_full_width() {
        let (taro, _) = sample();
        // hiragana display name stored, katakana + full-width spacing in the CSV row
        let matcher = MemberMatcher::build(&[(taro.clone(), "たろう".to_string())], true);
        assert_eq!(matcher.find("タロウ").unwrap(), Some(taro.clone()));
        assert_eq!(matcher.find("　たろう　").unwrap(), Some(taro));
    }

    #[test]
    fn fuzzy_disabled_does_not_fall_back() {
        let (taro, _) = sample();
        let matcher = MemberMatcher::build(&[(taro, "たろう".to_string())], false);
        assert_eq!(matcher.find("タロウ").unwrap(), None);
    }

    #[test]
    fn empty_input_is_an_error_unmatched_is_not() {
        let matcher = MemberMatcher::build(&[], true);
        assert!(matcher.find("").is_err());
        assert_eq!(matcher.find("nobody").unwrap(), None);
    }

    #[test]
    fn fuzzy_normalizer_is_idempotent_and_fold_invariant() {
        let s = "　タロウ１２３ＡＢ";
        let once = normalize_fuzzy(s);
        let twice = normalize_fuzzy(&once);
        assert_eq!(once, twice);
        assert_eq!(normalize_fuzzy("たろう123ab"), once);
    }
}
