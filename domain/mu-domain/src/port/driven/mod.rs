//! 駆動ポート（出力インターフェース）。
//!
//! ドメインが外部に求める機能を定義する。
//! インフラ層のアダプタが実装する。

mod clock;
mod config_repository;
mod file_inspector;
mod image_metadata;
mod installer_runner;
mod installer_source;
mod operator;
mod privilege_probe;
mod process_launcher;
mod process_scanner;
mod session_log;

pub use clock::*;
pub use config_repository::*;
pub use file_inspector::*;
pub use image_metadata::*;
pub use installer_runner::*;
pub use installer_source::*;
pub use operator::*;
pub use privilege_probe::*;
pub use process_launcher::*;
pub use process_scanner::*;
pub use session_log::*;
