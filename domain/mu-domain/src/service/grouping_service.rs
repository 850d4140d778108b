//! インストール先ディレクトリ単位のグルーピング

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::{ExcludedMember, InstallGroup, InstallPlan, directory_key};

/// 実行ファイルのパスからインストール先グループを求める。
/// パスがない・存在しないものは理由付きで除外する。入力順に依存しない。
pub fn compute_install_groups<'a, I>(members: I, exists: impl Fn(&Path) -> bool) -> InstallPlan
where
    I: IntoIterator<Item = (u32, Option<&'a Path>)>,
{
    let mut groups: BTreeMap<String, (String, Vec<u32>)> = BTreeMap::new();
    let mut excluded = Vec::new();
    let mut exclude = |pid: u32, reason: String| excluded.push(ExcludedMember { pid, reason });
    for (pid, path) in members {
        let Some(path) = path else {
            exclude(pid, "no executable path".into());
            continue;
        };
        if !exists(path) {
            exclude(pid, format!("executable not found: {}", path.display()));
            continue;
        }
        let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            exclude(pid, format!("no install directory for {}", path.display()));
            continue;
        };
        let spelling = dir.to_string_lossy().into_owned();
        let entry = groups
            .entry(directory_key(&spelling))
            .or_insert_with(|| (spelling.clone(), Vec::new()));
        // 表記揺れがあっても結果が入力順で変わらないよう最小の表記を採用
        if spelling < entry.0 {
            entry.0 = spelling;
        }
        entry.1.push(pid);
    }
    excluded.sort_by_key(|m| m.pid);
    excluded.dedup_by_key(|m| m.pid);
    let groups = groups
        .into_values()
        .map(|(dir, mut pids)| {
            pids.sort_unstable();
            pids.dedup();
            InstallGroup {
                directory: PathBuf::from(dir),
                pids,
            }
        })
        .collect();
    InstallPlan { groups, excluded }
}
