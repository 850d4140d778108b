//! 対象プロセスとセキュリティコンテキスト
//!
//! 発見時に取得したプロセスオブジェクト（ハンドル）を最後まで使い回す。
//! pid での再検索はしない（pid 再利用で別プロセスを止めないため）。

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::DomainError;

/// 発見時に開いた生存中プロセスへの参照
pub trait TargetProcess {
    fn pid(&self) -> u32;

    /// 終了済みか（取得済みハンドルで判定）
    fn has_exited(&self) -> bool;

    /// トップレベルウィンドウへ終了要求を送る。送れたら true
    fn request_close(&self) -> bool;

    /// 終了を待つ。`None` は無期限。終了したら true
    fn wait_for_exit(&self, timeout: Option<Duration>) -> bool;

    /// 強制終了
    fn kill(&self) -> Result<(), DomainError>;

    /// OS ハンドル（あれば）。コンテキスト取得で同じハンドルを使う
    fn raw_handle(&self) -> Option<isize> {
        None
    }
}

/// 複製済みプライマリトークンの所有ハンドル。
/// 実装側は Drop で一度だけ閉じる。
pub trait TokenHandle {
    fn raw(&self) -> isize;
}

/// レコードが排他的に所有するセキュリティトークン（Clone 不可）
pub struct SecurityToken(Box<dyn TokenHandle>);

impl SecurityToken {
    pub fn new(handle: Box<dyn TokenHandle>) -> Self {
        Self(handle)
    }

    pub fn raw(&self) -> isize {
        self.0.raw()
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken(..)")
    }
}

/// 終了前に取得する起動コンテキスト。各フィールドは独立に既定値へ落ちる。
#[derive(Debug, Default)]
pub struct SecurityContext {
    pub executable_path: Option<PathBuf>,
    /// 実行ファイルの親ディレクトリ
    pub working_directory: Option<PathBuf>,
    /// 起動引数（ベストエフォート、完全とは限らない）
    pub arguments: String,
    /// `DOMAIN\user`
    pub owner: Option<String>,
    /// 昇格時のみ取得
    pub token: Option<SecurityToken>,
}

/// スキャナが返す生のプロセス情報
pub struct DiscoveredProcess {
    pub pid: u32,
    pub image_name: String,
    pub known_path: Option<PathBuf>,
    pub title: String,
    pub started_at: Option<String>,
    pub process: Box<dyn TargetProcess>,
}

impl fmt::Debug for DiscoveredProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredProcess")
            .field("pid", &self.pid)
            .field("image_name", &self.image_name)
            .field("known_path", &self.known_path)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// スキャン結果の1件
#[derive(Debug)]
pub enum ScanEntry {
    Found(DiscoveredProcess),
    /// 開けなかった（アクセス拒否など）
    Unreadable { pid: u32, reason: String },
}

/// 発見された対象プロセス1件
pub struct ProcessRecord {
    pub pid: u32,
    pub image_name: String,
    pub title: String,
    pub product_version: String,
    pub started_at: Option<String>,
    pub context: SecurityContext,
    process: Box<dyn TargetProcess>,
}

impl ProcessRecord {
    pub fn new(
        discovered: DiscoveredProcess,
        product_version: impl Into<String>,
        context: SecurityContext,
    ) -> Self {
        Self {
            pid: discovered.pid,
            image_name: discovered.image_name,
            title: discovered.title,
            product_version: product_version.into(),
            started_at: discovered.started_at,
            context,
            process: discovered.process,
        }
    }

    /// 発見時に取得したプロセスオブジェクト
    pub fn process(&self) -> &dyn TargetProcess {
        self.process.as_ref()
    }

    pub fn executable_path(&self) -> Option<&Path> {
        self.context.executable_path.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.context.owner.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.context.token.is_some()
    }

    /// トークンを取り出す（2回目以降は None）
    pub fn take_token(&mut self) -> Option<SecurityToken> {
        self.context.token.take()
    }

    /// トークンを解放する。解放したら true
    pub fn release_token(&mut self) -> bool {
        match self.take_token() {
            Some(token) => {
                drop(token);
                true
            }
            None => false,
        }
    }

    /// 表示用のパス
    pub fn display_path(&self) -> String {
        self.executable_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("<{}>", self.image_name))
    }
}

impl fmt::Debug for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRecord")
            .field("pid", &self.pid)
            .field("image_name", &self.image_name)
            .field("title", &self.title)
            .field("product_version", &self.product_version)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
