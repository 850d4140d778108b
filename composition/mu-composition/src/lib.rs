//! mu-composition: 実行ファイル向けのランタイムを組み立てるコンポジションルート。
//! ドメイン／アプリケーション／各種アダプタをここで配線し、apps/* はこのクレートだけに依存する。

pub mod console;
pub mod error;
pub mod runtime;
pub mod system;

// apps/* が内側レイヤーの型に触れる必要がある場合は、ここから辿れるようにする。
pub use mu_adapter_paths as paths;
pub use mu_app as app;
pub use mu_domain as domain;

pub use console::{ConsoleLog, ConsoleOperator, Echo, Selection};
pub use runtime::UpdaterRuntime;
