//! プロセス停止（穏当→強制）

use std::time::Duration;

use crate::DomainError;
use crate::model::{StopOutcome, TargetProcess};

/// 終了要求を送り `timeout` まで待ち、終わらなければ強制終了して無期限に待つ。
/// 開始時点で終了済みなら何もしない。
pub fn stop_gracefully_then_force(
    process: &dyn TargetProcess,
    timeout: Duration,
) -> Result<StopOutcome, DomainError> {
    if process.has_exited() {
        return Ok(StopOutcome::AlreadyExited);
    }

    // ウィンドウがなくても待機は行う
    let _ = process.request_close();
    if process.wait_for_exit(Some(timeout)) {
        return Ok(StopOutcome::Graceful);
    }

    match process.kill() {
        Ok(()) => {
            process.wait_for_exit(None);
            Ok(StopOutcome::Forced)
        }
        // 強制終了の直前に自力で終わった
        Err(_) if process.has_exited() => Ok(StopOutcome::Graceful),
        Err(err) => Err(err),
    }
}
