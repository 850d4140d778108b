//! mu-cli: 対象プロセスの列挙／インストーラー検証／一括更新／設定管理を行う CLI。

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mu_composition::domain::model::{
    CancelToken, OutcomeEntry, ProcessRecord, SessionReport, UpdaterConfig,
};
use mu_composition::domain::port::driving::DiscoveryReport;
use mu_composition::error::{Result, SimpleError, err};
use mu_composition::paths;
use mu_composition::{ConsoleLog, ConsoleOperator, Echo, Selection, UpdaterRuntime};
use serde::Serialize;

macro_rules! bail {
    ($($t:tt)*) => {
        return Err(err(format!($($t)*)));
    };
}

#[derive(Parser, Debug)]
#[command(name = "mu-cli", about = "Multi-instance updater CLI")]
struct Cli {
    /// データディレクトリ（未指定なら ProgramData\MultiUpdater）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 更新対象のプロセスを列挙
    Scan {
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// インストーラーが期待する製品のものか検証
    Verify {
        /// インストーラーのパス
        installer: PathBuf,
    },
    /// 選択したプロセスを停止→インストール→再起動
    Update {
        /// インストーラーのパス
        #[arg(long)]
        installer: PathBuf,
        /// 更新する PID（複数可）
        #[arg(long = "pid", num_args = 1.., conflicts_with = "all")]
        pids: Vec<u32>,
        /// 発見した全プロセスを更新
        #[arg(long, default_value_t = false)]
        all: bool,
        /// 更新後に再起動する
        #[arg(long, conflicts_with = "no_restart")]
        restart: bool,
        /// 更新後に再起動しない
        #[arg(long)]
        no_restart: bool,
        /// 穏当な終了を待つ上限（ミリ秒、1..=600000）
        #[arg(long)]
        timeout_ms: Option<u32>,
        /// 確認を省略
        #[arg(long, default_value_t = false)]
        yes: bool,
        /// セッションログの保存先
        #[arg(long)]
        save_log: Option<PathBuf>,
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// 設定ファイルの管理
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 現在の設定を表示
    Show {
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// 既定値で設定ファイルを作成
    Init {
        /// 既存ファイルを上書き
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("mu-cli failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // 全依存関係はComposition Rootで組み立て
    let runtime = match &cli.data_dir {
        Some(dir) => UpdaterRuntime::with_data_dir(dir)?,
        None => UpdaterRuntime::new()?,
    };

    match cli.command {
        Command::Scan { json } => {
            let log = ConsoleLog::new(if json { Echo::Stderr } else { Echo::Stdout });
            runtime.log_preamble(&log);
            let report = runtime.scan(&log)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&map_discovery(&report))?);
            } else {
                print_discovery(&report);
            }
        }

        Command::Verify { installer } => {
            runtime.verify(&installer).map_err(SimpleError::from)?;
            let digest = runtime.installer_sha256(&installer)?;
            println!("Installer accepted: {}", installer.display());
            println!("  SHA-256: {}", digest);
        }

        Command::Update {
            installer,
            pids,
            all,
            restart,
            no_restart,
            timeout_ms,
            yes,
            save_log,
            json,
        } => {
            let restart = restart_flag(restart, no_restart);
            let request = runtime.update_request(Some(installer), restart, timeout_ms, None)?;
            let selection = selection_from_flags(pids, all);
            if json && (selection == Selection::Prompt || !yes) {
                bail!("--json requires --all or --pid together with --yes");
            }

            let log = ConsoleLog::new(if json { Echo::Stderr } else { Echo::Stdout });
            let operator = ConsoleOperator::stdio(selection, yes);
            runtime.log_preamble(&log);
            let report = runtime.update(&request, &operator, &log, &CancelToken::new());

            if let Some(path) = &save_log {
                runtime.save_session_log(path, &log.lines())?;
                eprintln!("Session log saved to {}", path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&map_session(&report))?);
            } else {
                print_session_summary(&report);
            }

            if let Some(abort) = &report.abort {
                return Err(Box::new(SimpleError::from(abort)));
            }
            let errors = report.error_count();
            if errors > 0 {
                bail!("{} item(s) failed during the update", errors);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Show { json } => {
                let config = runtime.config();
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonConfig {
                            path: runtime.config_path().display().to_string(),
                            exists: runtime.config_exists(),
                            log_dir: paths::default_log_dir().display().to_string(),
                            config: map_config(config),
                        })?
                    );
                } else {
                    print_config(&runtime, config);
                }
            }
            ConfigCommand::Init { force } => {
                if runtime.config_exists() && !force {
                    bail!(
                        "config already exists at {} (use --force to overwrite)",
                        runtime.config_path().display()
                    );
                }
                runtime.save_config(&UpdaterConfig::default())?;
                println!("Config written to {}", runtime.config_path().display());
            }
        },
    }

    Ok(())
}

fn restart_flag(restart: bool, no_restart: bool) -> Option<bool> {
    match (restart, no_restart) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn selection_from_flags(pids: Vec<u32>, all: bool) -> Selection {
    if all {
        Selection::All
    } else if !pids.is_empty() {
        Selection::Pids(pids)
    } else {
        Selection::Prompt
    }
}

// -------------------------------------------------------------------------
// 人間可読出力
// -------------------------------------------------------------------------

fn print_discovery(report: &DiscoveryReport) {
    println!();
    println!("Update candidates ({}):", report.records.len());
    for rec in &report.records {
        println!(
            "  PID {:>6}  v{:<12} {:<24} {}",
            rec.pid,
            rec.product_version,
            rec.owner().unwrap_or("-"),
            rec.display_path()
        );
    }
    if report.filtered_out > 0 {
        println!("  ({} process(es) skipped: copyright mismatch)", report.filtered_out);
    }
    for entry in &report.errors {
        println!("  PID {:>6}  {}", entry.pid, entry.status);
    }
}

fn print_session_summary(report: &SessionReport) {
    println!();
    println!("Session: {}", report.state.as_str());
    if let Some(abort) = &report.abort {
        println!("  aborted: {}", abort);
    }
    println!(
        "  discovered={} selected={} groups={} errors={}",
        report.discovered,
        report.selected,
        report.groups.len(),
        report.error_count()
    );
    for install in &report.installs {
        match (&install.exit_code, &install.error) {
            (_, Some(error)) => println!("  {} -> failed: {}", install.directory.display(), error),
            (Some(code), None) => println!("  {} -> exit code {}", install.directory.display(), code),
            (None, None) => println!("  {} -> no exit code", install.directory.display()),
        }
    }
}

fn print_config(runtime: &UpdaterRuntime, config: &UpdaterConfig) {
    println!(
        "Config: {}{}",
        runtime.config_path().display(),
        if runtime.config_exists() { "" } else { " (not found, using defaults)" }
    );
    println!("Log directory: {}", paths::default_log_dir().display());
    println!("  target_image_name      = {}", config.target_image_name);
    println!("  copyright_prefix       = {}", config.copyright_prefix);
    println!("  copyright_suffix       = {}", config.copyright_suffix);
    println!("  manifest_identity      = {}", config.manifest_identity);
    println!("  installer_product_name = {}", config.installer_product_name);
    println!("  close_timeout_ms       = {}", config.close_timeout_ms);
    println!("  install_log_name       = {}", config.install_log_name);
    println!("  restart_after_update   = {}", config.restart_after_update);
    println!("  package_site_url       = {}", config.package_site_url);
}

// -------------------------------------------------------------------------
// JSON 出力
// -------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonProcess {
    pid: u32,
    image_name: String,
    executable_path: Option<String>,
    working_directory: Option<String>,
    arguments: String,
    owner: Option<String>,
    has_token: bool,
    title: String,
    product_version: String,
    started_at: Option<String>,
}

#[derive(Serialize)]
struct JsonOutcome {
    pid: u32,
    status: String,
    error: bool,
}

#[derive(Serialize)]
struct JsonDiscovery {
    records: Vec<JsonProcess>,
    errors: Vec<JsonOutcome>,
    filtered_out: usize,
}

#[derive(Serialize)]
struct JsonGroup {
    directory: String,
    pids: Vec<u32>,
}

#[derive(Serialize)]
struct JsonInstall {
    directory: String,
    exit_code: Option<i32>,
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonSession {
    state: &'static str,
    abort: Option<String>,
    discovered: usize,
    selected: usize,
    installer: Option<String>,
    installer_sha256: Option<String>,
    groups: Vec<JsonGroup>,
    installs: Vec<JsonInstall>,
    outcomes: Vec<JsonOutcome>,
    error_count: usize,
}

#[derive(Serialize)]
struct JsonConfigBody {
    target_image_name: String,
    copyright_prefix: String,
    copyright_suffix: String,
    manifest_identity: String,
    installer_product_name: String,
    close_timeout_ms: u32,
    install_log_name: String,
    restart_after_update: bool,
    package_site_url: String,
}

#[derive(Serialize)]
struct JsonConfig {
    path: String,
    exists: bool,
    log_dir: String,
    config: JsonConfigBody,
}

fn map_process(rec: &ProcessRecord) -> JsonProcess {
    JsonProcess {
        pid: rec.pid,
        image_name: rec.image_name.clone(),
        executable_path: rec.executable_path().map(|p| p.display().to_string()),
        working_directory: rec
            .context
            .working_directory
            .as_ref()
            .map(|p| p.display().to_string()),
        arguments: rec.context.arguments.clone(),
        owner: rec.owner().map(str::to_string),
        has_token: rec.has_token(),
        title: rec.title.clone(),
        product_version: rec.product_version.clone(),
        started_at: rec.started_at.clone(),
    }
}

fn map_outcome(entry: &OutcomeEntry) -> JsonOutcome {
    JsonOutcome {
        pid: entry.pid,
        status: entry.status.to_string(),
        error: entry.status.is_error(),
    }
}

fn map_discovery(report: &DiscoveryReport) -> JsonDiscovery {
    JsonDiscovery {
        records: report.records.iter().map(map_process).collect(),
        errors: report.errors.iter().map(map_outcome).collect(),
        filtered_out: report.filtered_out,
    }
}

fn map_session(report: &SessionReport) -> JsonSession {
    JsonSession {
        state: report.state.as_str(),
        abort: report.abort.as_ref().map(ToString::to_string),
        discovered: report.discovered,
        selected: report.selected,
        installer: report.installer.as_ref().map(|p| p.display().to_string()),
        installer_sha256: report.installer_sha256.clone(),
        groups: report
            .groups
            .iter()
            .map(|g| JsonGroup {
                directory: g.directory.display().to_string(),
                pids: g.pids.clone(),
            })
            .collect(),
        installs: report
            .installs
            .iter()
            .map(|i| JsonInstall {
                directory: i.directory.display().to_string(),
                exit_code: i.exit_code,
                error: i.error.clone(),
            })
            .collect(),
        outcomes: report.outcomes.iter().map(map_outcome).collect(),
        error_count: report.error_count(),
    }
}

fn map_config(config: &UpdaterConfig) -> JsonConfigBody {
    JsonConfigBody {
        target_image_name: config.target_image_name.clone(),
        copyright_prefix: config.copyright_prefix.clone(),
        copyright_suffix: config.copyright_suffix.clone(),
        manifest_identity: config.manifest_identity.clone(),
        installer_product_name: config.installer_product_name.clone(),
        close_timeout_ms: config.close_timeout_ms,
        install_log_name: config.install_log_name.clone(),
        restart_after_update: config.restart_after_update,
        package_site_url: config.package_site_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_flags_parse() {
        let cli = Cli::try_parse_from([
            "mu-cli", "update", "--installer", "setup.exe", "--pid", "10", "20", "--no-restart",
            "--timeout-ms", "500", "--yes",
        ])
        .unwrap();
        match cli.command {
            Command::Update {
                installer,
                pids,
                all,
                restart,
                no_restart,
                timeout_ms,
                yes,
                ..
            } => {
                assert_eq!(installer, PathBuf::from("setup.exe"));
                assert_eq!(pids, vec![10, 20]);
                assert!(!all);
                assert_eq!(restart_flag(restart, no_restart), Some(false));
                assert_eq!(timeout_ms, Some(500));
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn pid_and_all_conflict() {
        let parsed = Cli::try_parse_from([
            "mu-cli", "update", "--installer", "a.exe", "--pid", "1", "--all",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn restart_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "mu-cli", "update", "--installer", "a.exe", "--restart", "--no-restart",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn selection_follows_flags() {
        assert_eq!(selection_from_flags(vec![], true), Selection::All);
        assert_eq!(selection_from_flags(vec![5], false), Selection::Pids(vec![5]));
        assert_eq!(selection_from_flags(vec![], false), Selection::Prompt);
        assert_eq!(restart_flag(false, false), None);
        assert_eq!(restart_flag(true, false), Some(true));
    }

    #[test]
    fn config_json_carries_defaults() {
        let body = map_config(&UpdaterConfig::default());
        let text = serde_json::to_string(&body).unwrap();
        assert!(text.contains("\"close_timeout_ms\":10000"));
        assert!(text.contains("\"restart_after_update\":true"));
    }
}
