//! mu-app: アプリケーション層のファサード。
//! ドメインのポートとサービスを組み合わせて、発見・インストーラー取得・
//! 更新セッションのユースケースを実装する。

pub mod acquire;
pub mod discovery;
pub mod session;
pub mod verify;

#[cfg(test)]
pub(crate) mod stubs;

pub use acquire::{AcquireDeps, acquire_installer, archive_file_name};
pub use discovery::{DiscoveryDeps, DiscoveryService};
pub use session::{SessionDeps, UpdateSessionService};
pub use verify::VerifyService;

/// セッションログへ空行と見出しブロックを書く
pub(crate) fn section(log: &dyn mu_domain::port::driven::SessionLog, title: &str, rule: char) {
    log.append("");
    for line in mu_log_utils::section_header(title, rule) {
        log.append(&line);
    }
}
