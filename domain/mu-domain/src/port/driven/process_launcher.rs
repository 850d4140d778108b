//! 再起動用の起動ポート

use crate::model::{LaunchError, RelaunchRequest, SecurityToken};

/// 3 通りの起動手段。成功時は新しい pid（分かれば）を返す
pub trait ProcessLauncher {
    /// 取得済みトークンで起動（CreateProcessWithTokenW）
    fn launch_with_token(
        &self,
        token: &SecurityToken,
        request: &RelaunchRequest,
    ) -> Result<Option<u32>, LaunchError>;

    /// シェル所有者のトークンで起動。トークンが得られなければ TokenUnavailable
    fn launch_as_shell_owner(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError>;

    /// 呼び出し元の権限で通常起動
    fn launch_as_caller(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError>;
}
