//! インストーラーの真正性確認
//!
//! マニフェストの assemblyIdentity とバージョン情報の ProductName を両方確認する。
//! 署名検証はしない。どの段階の失敗でも不合格（fail-closed）。

use std::path::Path;

use crate::model::{InstallerRejection, UpdaterConfig};
use crate::port::driven::{FileInspector, ImageMetadataReader};
use crate::service::manifest_service::{assembly_identity_name, decode_manifest};

pub struct InstallerAuthenticator<'a> {
    reader: &'a dyn ImageMetadataReader,
    files: &'a dyn FileInspector,
    expected_identity: &'a str,
    expected_product: &'a str,
}

impl<'a> InstallerAuthenticator<'a> {
    pub fn new(
        reader: &'a dyn ImageMetadataReader,
        files: &'a dyn FileInspector,
        expected_identity: &'a str,
        expected_product: &'a str,
    ) -> Self {
        Self {
            reader,
            files,
            expected_identity,
            expected_product,
        }
    }

    pub fn from_config(
        reader: &'a dyn ImageMetadataReader,
        files: &'a dyn FileInspector,
        config: &'a UpdaterConfig,
    ) -> Self {
        Self::new(
            reader,
            files,
            &config.manifest_identity,
            &config.installer_product_name,
        )
    }

    /// 拒否理由付きで検証
    pub fn authenticate(&self, path: &Path) -> Result<(), InstallerRejection> {
        if !self.files.is_file(path) {
            return Err(InstallerRejection::MissingFile);
        }

        let raw = self
            .reader
            .manifest(path)
            .map_err(|e| InstallerRejection::ManifestUnavailable(e.to_string()))?;
        let xml = decode_manifest(&raw).map_err(InstallerRejection::ManifestMalformed)?;
        let identity =
            assembly_identity_name(&xml).map_err(InstallerRejection::ManifestMalformed)?;
        // 完全一致（大文字小文字を区別）
        if identity.as_deref() != Some(self.expected_identity) {
            return Err(InstallerRejection::ManifestIdentityMismatch { found: identity });
        }

        let strings = self
            .reader
            .version_strings(path)
            .map_err(|e| InstallerRejection::VersionInfoUnavailable(e.to_string()))?;
        let product = strings
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if product != Some(self.expected_product) {
            return Err(InstallerRejection::ProductNameMismatch {
                found: product.map(str::to_string),
            });
        }
        Ok(())
    }

    pub fn is_expected_installer(&self, path: &Path) -> bool {
        self.authenticate(path).is_ok()
    }
}
