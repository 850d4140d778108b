//! MultiUpdater ドメイン層
//!
//! 対象プロセスの停止→インストーラー実行→元ユーザーでの再起動という
//! 更新セッションの中核。OS 依存はポート越しに扱う。
//! ヘキサゴナルアーキテクチャの最内層（外部依存は regex のみ）。

pub mod error;   // ドメインエラー定義
pub mod model;   // ドメインモデル（プロセス記録、セッション、設定）
pub mod port;    // ポート（driving/driven）
pub mod service; // ドメインサービス（純粋ロジック）

pub use error::DomainError; // エラー型を再エクスポート
