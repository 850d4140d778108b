use std::path::PathBuf;

/// 同じインストール先を共有するプロセスの集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallGroup {
    pub directory: PathBuf,
    /// 昇順
    pub pids: Vec<u32>,
}

/// どのグループにも入らなかったメンバー（インストーラーは実行されない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedMember {
    pub pid: u32,
    pub reason: String,
}

/// グルーピング結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan {
    /// ディレクトリ順
    pub groups: Vec<InstallGroup>,
    /// pid 順
    pub excluded: Vec<ExcludedMember>,
}

/// ディレクトリ比較用のキー（大文字小文字と末尾区切りを無視）
pub fn directory_key(directory: &str) -> String {
    let trimmed = directory.trim_end_matches(['\\', '/']);
    let trimmed = if trimmed.is_empty() { directory } else { trimmed };
    trimmed.replace('/', "\\").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_and_trailing_separator() {
        assert_eq!(directory_key("C:\\ProScan\\"), directory_key("c:\\proscan"));
        assert_eq!(directory_key("C:/ProScan"), "c:\\proscan");
    }

    #[test]
    fn root_separator_is_kept() {
        assert_eq!(directory_key("\\"), "\\");
    }
}
