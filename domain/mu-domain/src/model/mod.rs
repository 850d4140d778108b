//! ドメインモデル
//!
//! 標準ライブラリのみ使用（外部依存なし）
//! 値オブジェクト、エンティティ、設定型を定義

mod acquire;  // インストーラー取得（ダウンロード進捗、キャンセル）
mod config;   // 更新設定、実行時情報
mod group;    // インストール先ディレクトリ単位のグループ
mod installer; // インストーラー引数、検証結果、実行結果
mod lifecycle; // 停止結果
mod process;  // 対象プロセス、セキュリティコンテキスト、トークン
mod relaunch; // 再起動要求、戦略、結果
mod session;  // 更新セッション状態、項目ごとの結果

pub use acquire::*;
pub use config::*;
pub use group::*;
pub use installer::*;
pub use lifecycle::*;
pub use process::*;
pub use relaunch::*;
pub use session::*;
