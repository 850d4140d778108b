//! コマンドライン文字列の分解

/// 先頭のプログラム部分と残りの引数に分ける。
/// - 先頭が `"` なら次の `"` までをプログラムとして扱う（argv[0] にエスケープはない）
/// - それ以外は空白までをプログラムとして扱う
pub fn split_program(cmdline: &str) -> (&str, &str) {
    let s = cmdline.trim_start();
    if s.is_empty() {
        return ("", "");
    }
    if let Some(rest) = s.strip_prefix('"') {
        return match rest.find('"') {
            Some(end) => (&rest[..end], rest[end + 1..].trim()),
            None => (rest, ""),
        };
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], s[end..].trim())
}
