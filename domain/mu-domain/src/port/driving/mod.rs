//! 駆動ポート（外部から呼び出されるユースケースの入口）
//!
//! 外部システムが呼び出すユースケースを定義する。
//! アプリケーション層のサービスが実装する。

mod discovery_use_case;
mod update_use_case;

pub use discovery_use_case::*;
pub use update_use_case::*;
