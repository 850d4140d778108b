//! 著作権表示による対象判定
//!
//! 小文字化し、1900-2099 の4桁年トークンを除き、空白を畳んでから
//! 接頭辞・接尾辞を比較する。トークンの順序は意味を持つ。

use std::sync::LazyLock;

use regex::Regex;

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year regex is valid"));

/// 比較用に正規化した文字列
pub fn normalize_copyright(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = YEAR_TOKEN.replace_all(&lower, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 正規化後に `prefix` で始まり `suffix` で終わるか。
/// 表示自体が空白だけなら不一致（年だけの表示は正規化後の空文字で比較する）
pub fn matches_copyright(copyright: &str, prefix: &str, suffix: &str) -> bool {
    if copyright.trim().is_empty() {
        return false;
    }
    let text = normalize_copyright(copyright);
    text.starts_with(&normalize_copyright(prefix)) && text.ends_with(&normalize_copyright(suffix))
}
