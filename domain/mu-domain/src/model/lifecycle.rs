/// 停止処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// 開始時点で終了済み（終了要求も強制終了もしない）
    AlreadyExited,
    /// タイムアウト内に終了
    Graceful,
    /// 強制終了した
    Forced,
}

impl StopOutcome {
    pub fn is_graceful(self) -> bool {
        !matches!(self, Self::Forced)
    }
}
