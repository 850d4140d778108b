//! ファイルシステムアダプター（設定の永続化、ファイル検査、ゾーン識別子の除去、
//! セッションログの保存）
use mu_domain::error::DomainError;
use mu_domain::model::UpdaterConfig;
use mu_domain::port::driven::{ConfigRepository, FileInspector, FileUnblocker};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// インターネット由来マークの代替データストリーム名
const ZONE_IDENTIFIER_STREAM: &str = ":Zone.Identifier";

#[derive(Debug)]
pub struct FsAdapter {
    config_path: PathBuf,
}

impl FsAdapter {
    /// 指定ルートディレクトリでアダプターを作成。ファイルは遅延作成。
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            config_path: root.as_ref().join("config").join("config.json"),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// セッションログを1行ずつ書き出す（上書き）
    pub fn save_session_log(&self, path: &Path, lines: &[String]) -> Result<(), DomainError> {
        let mut data = lines.join("\r\n");
        data.push_str("\r\n");
        write_atomic(path, data.as_bytes())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), DomainError> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| DomainError::IoError(format!("create_dir_all: {e}")))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), DomainError> {
    ensure_parent_dir(path)?;
    let suffix = unique_suffix();
    let tmp_path = path.with_extension(format!("tmp.{suffix}"));
    {
        let mut f = fs::File::create(&tmp_path)
            .map_err(|e| DomainError::IoError(format!("create temp file: {e}")))?;
        f.write_all(data)
            .map_err(|e| DomainError::IoError(format!("write temp file: {e}")))?;
        let _ = f.sync_all();
    }
    #[cfg(windows)]
    {
        if path.exists() {
            if let Err(e) = replace_file(&tmp_path, path) {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
            return Ok(());
        }
    }
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DomainError::IoError(format!("rename temp file: {e}"))
    })
}

fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}.{}", std::process::id(), nanos)
}

#[cfg(windows)]
fn replace_file(src: &Path, dst: &Path) -> Result<(), DomainError> {
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::Storage::FileSystem::{REPLACE_FILE_FLAGS, ReplaceFileW};
    use windows::core::PCWSTR;

    fn to_wide(path: &Path) -> Vec<u16> {
        let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
        wide.push(0);
        wide
    }

    let src_w = to_wide(src);
    let dst_w = to_wide(dst);
    unsafe {
        ReplaceFileW(
            PCWSTR(dst_w.as_ptr()),
            PCWSTR(src_w.as_ptr()),
            PCWSTR::null(),
            REPLACE_FILE_FLAGS(0),
            None,
            None,
        )
        .map_err(|e| DomainError::IoError(format!("ReplaceFileW failed: {}", e.message())))?;
    }
    Ok(())
}

impl ConfigRepository for FsAdapter {
    /// ファイルがなければ既定値。あれば読み込んで検証する
    fn load(&self) -> Result<UpdaterConfig, DomainError> {
        let mut buf = String::new();
        let mut f = match fs::File::open(&self.config_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UpdaterConfig::default()),
            Err(e) => return Err(DomainError::ConfigLoadFailed(format!("open config: {e}"))),
        };
        f.read_to_string(&mut buf)
            .map_err(|e| DomainError::ConfigLoadFailed(format!("read config: {e}")))?;
        let dto: ConfigDto =
            serde_json::from_str(&buf).map_err(|e| DomainError::ConfigLoadFailed(e.to_string()))?;
        let config = UpdaterConfig::from(dto);
        config
            .validate()
            .map_err(|e| DomainError::ConfigLoadFailed(e.to_string()))?;
        Ok(config)
    }

    fn save(&self, config: &UpdaterConfig) -> Result<(), DomainError> {
        config.validate()?;
        let dto = ConfigDto::from(config);
        let data = serde_json::to_string_pretty(&dto)
            .map_err(|e| DomainError::IoError(format!("serialize config: {e}")))?;
        write_atomic(&self.config_path, data.as_bytes())
            .map_err(|e| DomainError::IoError(format!("write config: {e}")))
    }

    fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

impl FileInspector for FsAdapter {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn sha256_hex(&self, path: &Path) -> Result<String, DomainError> {
        use sha2::{Digest, Sha256};

        let mut file = fs::File::open(path)
            .map_err(|e| DomainError::IoError(format!("Failed to open {:?}: {}", path, e)))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| DomainError::IoError(format!("Failed to read {:?}: {}", path, e)))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let hash = hasher.finalize();
        Ok(hash.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

impl FileUnblocker for FsAdapter {
    /// `path:Zone.Identifier` を削除する。NTFS 以外・非Windows ではマークなし扱い
    fn unblock(&self, path: &Path) -> Result<bool, DomainError> {
        if !cfg!(windows) {
            return Ok(false);
        }
        let mut stream = path.as_os_str().to_os_string();
        stream.push(ZONE_IDENTIFIER_STREAM);
        match fs::remove_file(&stream) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::IoError(format!(
                "remove Zone.Identifier from {:?}: {}",
                path, e
            ))),
        }
    }
}

// ---------- DTO 定義 ----------

#[derive(Serialize, Deserialize)]
struct ConfigDto {
    #[serde(default = "default_version")]
    version: String,
    target: TargetDto,
    installer: InstallerDto,
    #[serde(default)]
    session: SessionDto,
}

#[derive(Serialize, Deserialize)]
struct TargetDto {
    image_name: String,
    copyright_prefix: String,
    copyright_suffix: String,
}

#[derive(Serialize, Deserialize)]
struct InstallerDto {
    manifest_identity: String,
    product_name: String,
    #[serde(default = "default_install_log_name")]
    install_log_name: String,
    #[serde(default = "default_package_site_url")]
    package_site_url: String,
}

#[derive(Serialize, Deserialize)]
struct SessionDto {
    #[serde(default = "default_close_timeout_ms")]
    close_timeout_ms: u32,
    #[serde(default = "default_restart")]
    restart_after_update: bool,
}

impl Default for SessionDto {
    fn default() -> Self {
        Self {
            close_timeout_ms: default_close_timeout_ms(),
            restart_after_update: default_restart(),
        }
    }
}

fn default_version() -> String {
    "1".into()
}

fn default_install_log_name() -> String {
    UpdaterConfig::default().install_log_name
}

fn default_package_site_url() -> String {
    UpdaterConfig::default().package_site_url
}

fn default_close_timeout_ms() -> u32 {
    UpdaterConfig::default().close_timeout_ms
}

fn default_restart() -> bool {
    UpdaterConfig::default().restart_after_update
}

impl From<&UpdaterConfig> for ConfigDto {
    fn from(cfg: &UpdaterConfig) -> Self {
        Self {
            version: default_version(),
            target: TargetDto {
                image_name: cfg.target_image_name.clone(),
                copyright_prefix: cfg.copyright_prefix.clone(),
                copyright_suffix: cfg.copyright_suffix.clone(),
            },
            installer: InstallerDto {
                manifest_identity: cfg.manifest_identity.clone(),
                product_name: cfg.installer_product_name.clone(),
                install_log_name: cfg.install_log_name.clone(),
                package_site_url: cfg.package_site_url.clone(),
            },
            session: SessionDto {
                close_timeout_ms: cfg.close_timeout_ms,
                restart_after_update: cfg.restart_after_update,
            },
        }
    }
}

impl From<ConfigDto> for UpdaterConfig {
    fn from(dto: ConfigDto) -> Self {
        Self {
            target_image_name: dto.target.image_name,
            copyright_prefix: dto.target.copyright_prefix,
            copyright_suffix: dto.target.copyright_suffix,
            manifest_identity: dto.installer.manifest_identity,
            installer_product_name: dto.installer.product_name,
            close_timeout_ms: dto.session.close_timeout_ms,
            install_log_name: dto.installer.install_log_name,
            restart_after_update: dto.session.restart_after_update,
            package_site_url: dto.installer.package_site_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_loads_defaults() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        assert!(!fs.exists());
        assert_eq!(fs.load().unwrap(), UpdaterConfig::default());
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let config = UpdaterConfig {
            close_timeout_ms: 2500,
            restart_after_update: false,
            ..UpdaterConfig::default()
        };
        fs.save(&config).unwrap();
        assert!(fs.exists());
        assert!(fs.config_path().ends_with("config/config.json"));
        assert_eq!(fs.load().unwrap(), config);

        // 上書き保存
        let second = UpdaterConfig {
            close_timeout_ms: 5000,
            ..config
        };
        fs.save(&second).unwrap();
        assert_eq!(fs.load().unwrap().close_timeout_ms, 5000);
    }

    #[test]
    fn session_section_is_optional() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let json = r#"{
            "target": { "image_name": "ProScan", "copyright_prefix": "ProScan", "copyright_suffix": "Bob Aune" },
            "installer": { "manifest_identity": "JR.Inno.Setup", "product_name": "ProScan" }
        }"#;
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(fs.config_path(), json).unwrap();
        assert_eq!(fs.load().unwrap(), UpdaterConfig::default());
    }

    #[test]
    fn invalid_config_is_rejected_on_load_and_save() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let bad = UpdaterConfig {
            close_timeout_ms: 0,
            ..UpdaterConfig::default()
        };
        assert!(matches!(fs.save(&bad), Err(DomainError::InvalidConfig(_))));

        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(fs.config_path(), "{ not json").unwrap();
        assert!(matches!(fs.load(), Err(DomainError::ConfigLoadFailed(_))));
    }

    #[test]
    fn sha256_of_known_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, b"abc").unwrap();
        let fs = FsAdapter::new(dir.path());
        assert!(fs.is_file(&path));
        assert!(!fs.is_file(dir.path()));
        assert_eq!(
            fs.sha256_hex(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(fs.sha256_hex(&dir.path().join("missing.exe")).is_err());
    }

    #[test]
    fn unblock_without_marker_reports_false() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, b"x").unwrap();
        let fs = FsAdapter::new(dir.path());
        assert!(!fs.unblock(&path).unwrap());
    }

    #[test]
    fn session_log_is_written_with_crlf() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let path = dir.path().join("logs").join("session.log");
        fs.save_session_log(&path, &["first".into(), "second".into()])
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first\r\nsecond\r\n"
        );
    }
}
