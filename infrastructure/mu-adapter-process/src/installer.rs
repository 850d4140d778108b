//! インストーラーの実行（ウィンドウなし、終了まで同期待ち）

use std::path::Path;
use std::process::Command;

use mu_domain::DomainError;
use mu_domain::model::InstallerArguments;
use mu_domain::port::driven::InstallerRunner;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Default)]
pub struct InstallerRunnerAdapter;

impl InstallerRunnerAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl InstallerRunner for InstallerRunnerAdapter {
    fn run(&self, installer: &Path, args: &InstallerArguments) -> Result<i32, DomainError> {
        let mut command = Command::new(installer);
        configure(&mut command, args);
        let status = command.status().map_err(|e| {
            DomainError::ProcessLaunchFailed(format!("{}: {}", installer.display(), e))
        })?;
        // シグナル終了（Windows 以外）は -1
        Ok(status.code().unwrap_or(-1))
    }
}

/// `/LOG="..."` の引用符を保つため、Windows では生のコマンドラインを渡す
#[cfg(windows)]
fn configure(command: &mut Command, args: &InstallerArguments) {
    use std::os::windows::process::CommandExt;
    command
        .raw_arg(args.to_command_line())
        .creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure(command: &mut Command, args: &InstallerArguments) {
    command.args(args.to_args());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_installer_is_a_launch_error() {
        let args = InstallerArguments::for_directory(Path::new("C:\\ProScan"), "install.log");
        let err = InstallerRunnerAdapter::new()
            .run(Path::new("/nonexistent/mu-missing/setup.exe"), &args)
            .unwrap_err();
        assert!(matches!(err, DomainError::ProcessLaunchFailed(_)));
    }
}
