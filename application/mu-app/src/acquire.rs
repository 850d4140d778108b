//! インストーラー取得ユースケース。
//!
//! サイトから URL を探し、確認後にダウンロード、マークを外して展開し
//! `<stem>.exe` を探す。セッション中で唯一キャンセル可能な工程。

use std::path::Path;

use mu_domain::model::{AcquireOutcome, CancelToken, DownloadOutcome, DownloadProgress};
use mu_domain::port::driven::{FileUnblocker, InstallerSource, Operator, SessionLog};
use mu_domain::port::driving::DownloadPlan;

pub struct AcquireDeps<'a> {
    pub source: &'a dyn InstallerSource,
    pub unblocker: &'a dyn FileUnblocker,
    pub operator: &'a dyn Operator,
    pub log: &'a dyn SessionLog,
}

/// URL のパス末尾からアーカイブ名を取り出す
pub fn archive_file_name(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

pub fn acquire_installer(
    deps: &AcquireDeps<'_>,
    plan: &DownloadPlan,
    cancel: &CancelToken,
) -> AcquireOutcome {
    let Some(url) = deps.source.find_installer_url(&plan.site_url) else {
        return AcquireOutcome::NotFound(format!("no package link on {}", plan.site_url));
    };
    let Some(file_name) = archive_file_name(&url) else {
        return AcquireOutcome::Failed(format!("cannot derive a file name from {}", url));
    };
    if !deps.operator.confirm_download(&file_name) {
        return AcquireOutcome::Declined;
    }
    if cancel.is_canceled() {
        return AcquireOutcome::Canceled;
    }

    let archive = plan.directory.join(&file_name);
    deps.log
        .append(&format!("Downloading {} to {}", url, archive.display()));
    let mut next_mark = 25u8;
    let mut on_progress = |p: DownloadProgress| {
        if let Some(pct) = p.percent() {
            if pct >= next_mark {
                deps.log.append(&format!("Download progress: {}%", pct));
                next_mark = pct - pct % 25 + 25;
            }
        }
    };
    match deps.source.download(&url, &archive, &mut on_progress, cancel) {
        DownloadOutcome::Completed => {}
        DownloadOutcome::Canceled => {
            deps.log.append("Download canceled.");
            return AcquireOutcome::Canceled;
        }
        DownloadOutcome::Failed(msg) => {
            deps.log.append(&format!("Download error: {}", msg));
            return AcquireOutcome::Failed(msg);
        }
    }
    unblock(deps, &archive);

    let stem = Path::new(&file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());
    let extract_dir = plan.directory.join(&stem);
    let exe_name = format!("{}.exe", stem);
    match deps.source.extract_installer(&archive, &extract_dir, &exe_name) {
        Some(installer) => {
            unblock(deps, &installer);
            deps.log
                .append(&format!("Installer extracted to {}", installer.display()));
            AcquireOutcome::Acquired(installer)
        }
        None => AcquireOutcome::NotFound(format!("{} not found in {}", exe_name, file_name)),
    }
}

fn unblock(deps: &AcquireDeps<'_>, path: &Path) {
    match deps.unblocker.unblock(path) {
        Ok(true) => deps
            .log
            .append(&format!("Removed Zone.Identifier from {}", path.display())),
        Ok(false) => {}
        Err(err) => deps.log.append(&format!(
            "Warning: could not unblock {}: {}",
            path.display(),
            err
        )),
    }
}
