//! 発見ユースケース。
//!
//! イメージ名で列挙し、著作権表示で絞り込み、残ったものはその場でコンテキストを取得する。

use mu_domain::DomainError;
use mu_domain::model::{ItemStatus, OutcomeEntry, ProcessRecord, ScanEntry, UpdaterConfig};
use mu_domain::port::driven::{
    ImageMetadataReader, ProcessScanner, SecurityContextCapture, SessionLog,
};
use mu_domain::port::driving::{DiscoveryReport, DiscoveryUseCase};
use mu_domain::service::matches_copyright;
use mu_log_utils::rule_line;

pub struct DiscoveryDeps<'a> {
    pub scanner: &'a dyn ProcessScanner,
    pub capture: &'a dyn SecurityContextCapture,
    pub metadata: &'a dyn ImageMetadataReader,
    pub log: &'a dyn SessionLog,
}

pub struct DiscoveryService<'a> {
    deps: DiscoveryDeps<'a>,
    config: &'a UpdaterConfig,
}

impl<'a> DiscoveryService<'a> {
    pub fn new(deps: DiscoveryDeps<'a>, config: &'a UpdaterConfig) -> Self {
        Self { deps, config }
    }

    /// 1プロセス分の記録ブロック
    fn log_record(&self, rec: &ProcessRecord) {
        let log = self.deps.log;
        log.append(&format!("Process window: {}", rec.title));
        log.append(&format!("Process path: {}", rec.display_path()));
        log.append(&format!("Process ID: {}", rec.pid));
        log.append(&format!("Product version: {}", rec.product_version));
        log.append(&format!(
            "Process started: {}",
            rec.started_at.as_deref().unwrap_or("unknown")
        ));
        if let Some(owner) = rec.owner() {
            log.append(&format!("Running as user: {}", owner));
        }
        log.append(&rule_line('='));
    }

    fn discovery_error(&self, report: &mut DiscoveryReport, pid: u32, reason: String) {
        self.deps
            .log
            .append(&format!("Unable to read process PID {}: {}", pid, reason));
        report.errors.push(OutcomeEntry {
            pid,
            status: ItemStatus::DiscoveryError(reason),
        });
    }
}

impl DiscoveryUseCase for DiscoveryService<'_> {
    fn discover(&self) -> Result<DiscoveryReport, DomainError> {
        let entries = self.deps.scanner.scan(&self.config.target_image_name)?;
        let mut report = DiscoveryReport::default();

        for entry in entries {
            let found = match entry {
                ScanEntry::Found(found) => found,
                ScanEntry::Unreadable { pid, reason } => {
                    self.discovery_error(&mut report, pid, reason);
                    continue;
                }
            };
            let Some(path) = found.known_path.clone() else {
                self.discovery_error(&mut report, found.pid, "executable path unavailable".into());
                continue;
            };
            let strings = match self.deps.metadata.version_strings(&path) {
                Ok(strings) => strings,
                Err(err) => {
                    self.discovery_error(&mut report, found.pid, err.to_string());
                    continue;
                }
            };
            let copyright = strings.legal_copyright.as_deref().unwrap_or_default();
            if !matches_copyright(
                copyright,
                &self.config.copyright_prefix,
                &self.config.copyright_suffix,
            ) {
                report.filtered_out += 1;
                continue;
            }

            // 停止前に取得しておく（停止後は読めない）
            let context = self.deps.capture.capture(found.process.as_ref(), Some(&path));
            let version = strings.product_version.unwrap_or_default();
            report
                .records
                .push(ProcessRecord::new(found, version.trim(), context));
        }

        report.records.sort_by_key(|r| r.pid);
        for rec in &report.records {
            self.log_record(rec);
        }
        self.deps.log.append(&format!(
            "Processes found: {} ({} skipped by copyright, {} unreadable)",
            report.records.len(),
            report.filtered_out,
            report.errors.len()
        ));
        Ok(report)
    }
}
