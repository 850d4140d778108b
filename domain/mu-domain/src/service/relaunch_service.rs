//! 元ユーザーでの再起動
//!
//! 戦略は呼び出しごとに現在の昇格状態から選び直す。

use crate::model::{LaunchError, RelaunchOutcome, RelaunchRequest, RelaunchStrategy, SecurityToken};
use crate::port::driven::{PrivilegeProbe, ProcessLauncher};

impl RelaunchStrategy {
    /// この戦略で起動を試みる。失敗は結果として返す
    pub fn attempt(
        self,
        launcher: &dyn ProcessLauncher,
        request: &RelaunchRequest,
        token: Option<&SecurityToken>,
    ) -> RelaunchOutcome {
        match self {
            Self::DirectToken => match token {
                Some(token) => finish(self, launcher.launch_with_token(token, request)),
                None => fall_back(self, launcher, request),
            },
            Self::ShellOwnerToken => match launcher.launch_as_shell_owner(request) {
                Err(LaunchError::TokenUnavailable(_)) => fall_back(self, launcher, request),
                other => finish(self, other),
            },
            Self::Unelevated => finish(self, launcher.launch_as_caller(request)),
        }
    }
}

fn fall_back(
    from: RelaunchStrategy,
    launcher: &dyn ProcessLauncher,
    request: &RelaunchRequest,
) -> RelaunchOutcome {
    let mut outcome = RelaunchStrategy::Unelevated.attempt(launcher, request, None);
    outcome.fallback_from = Some(from);
    outcome
}

fn finish(strategy: RelaunchStrategy, result: Result<Option<u32>, LaunchError>) -> RelaunchOutcome {
    match result {
        Ok(pid) => RelaunchOutcome {
            strategy,
            fallback_from: None,
            pid,
            error: None,
        },
        Err(err) => RelaunchOutcome {
            strategy,
            fallback_from: None,
            pid: None,
            error: Some(err.to_string()),
        },
    }
}

/// 昇格状態とトークン有無から戦略を選んで再起動
pub fn relaunch(
    launcher: &dyn ProcessLauncher,
    privilege: &dyn PrivilegeProbe,
    request: &RelaunchRequest,
    token: Option<&SecurityToken>,
) -> RelaunchOutcome {
    let strategy = RelaunchStrategy::select(privilege.is_elevated(), token.is_some());
    strategy.attempt(launcher, request, token)
}
