//! 発見ユースケースポート

use crate::error::DomainError;
use crate::model::{OutcomeEntry, ProcessRecord};

/// 発見結果
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// 著作権表示が一致し、コンテキスト取得済みのレコード
    pub records: Vec<ProcessRecord>,
    /// 項目ごとの発見エラー
    pub errors: Vec<OutcomeEntry>,
    /// 同名だが著作権表示が一致しなかった件数
    pub filtered_out: usize,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub trait DiscoveryUseCase {
    /// 対象プロセスを列挙し、各レコードのコンテキストを取得する
    fn discover(&self) -> Result<DiscoveryReport, DomainError>;
}
