//! インストーラー単体の検証ユースケース

use std::path::Path;

use mu_domain::model::{InstallerRejection, UpdaterConfig};
use mu_domain::port::driven::{FileInspector, ImageMetadataReader};
use mu_domain::port::driving::VerifyInstallerUseCase;
use mu_domain::service::InstallerAuthenticator;

pub struct VerifyService<'a> {
    metadata: &'a dyn ImageMetadataReader,
    files: &'a dyn FileInspector,
    config: &'a UpdaterConfig,
}

impl<'a> VerifyService<'a> {
    pub fn new(
        metadata: &'a dyn ImageMetadataReader,
        files: &'a dyn FileInspector,
        config: &'a UpdaterConfig,
    ) -> Self {
        Self {
            metadata,
            files,
            config,
        }
    }
}

impl VerifyInstallerUseCase for VerifyService<'_> {
    fn verify(&self, installer: &Path) -> Result<(), InstallerRejection> {
        InstallerAuthenticator::from_config(self.metadata, self.files, self.config)
            .authenticate(installer)
    }
}
