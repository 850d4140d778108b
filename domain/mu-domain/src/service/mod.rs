//! ドメインサービス（純粋ロジック）
//!
//! OS には触れない。必要な機能はポート経由で受け取る。

pub mod command_line;
pub mod copyright_service;
pub mod grouping_service;
pub mod installer_service;
pub mod lifecycle_service;
pub mod manifest_service;
pub mod relaunch_service;

// 便宜のため主要な関数を再エクスポート
pub use command_line::split_program;
pub use copyright_service::{matches_copyright, normalize_copyright};
pub use grouping_service::compute_install_groups;
pub use installer_service::InstallerAuthenticator;
pub use lifecycle_service::stop_gracefully_then_force;
pub use manifest_service::{ASM_V1_NAMESPACE, assembly_identity_name, decode_manifest};
pub use relaunch_service::relaunch;
