//! 実行ファイル向けのエラー型（文字列メッセージのみ）
use std::error::Error;
use std::fmt;

use mu_domain::model::{InstallerRejection, SessionAbort};

#[derive(Debug)]
pub struct SimpleError(String);

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for SimpleError {}

impl From<InstallerRejection> for SimpleError {
    fn from(rejection: InstallerRejection) -> Self {
        Self(format!("installer rejected: {}", rejection))
    }
}

impl From<&SessionAbort> for SimpleError {
    fn from(abort: &SessionAbort) -> Self {
        Self(format!("update aborted: {}", abort))
    }
}

pub type Result<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

pub fn err(msg: impl Into<String>) -> Box<dyn Error + Send + Sync> {
    Box::new(SimpleError(msg.into()))
}
