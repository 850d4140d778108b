//! 実行ファイルのリソース読み取りポート

use std::path::Path;

use crate::error::DomainError;
use crate::model::VersionStrings;

/// PE イメージのリソース読み取り（データファイルとしてロードし、実行しない）
pub trait ImageMetadataReader {
    /// RT_MANIFEST / ID 1 の生バイト列
    fn manifest(&self, path: &Path) -> Result<Vec<u8>, DomainError>;

    /// バージョン情報の文字列表
    fn version_strings(&self, path: &Path) -> Result<VersionStrings, DomainError>;
}
