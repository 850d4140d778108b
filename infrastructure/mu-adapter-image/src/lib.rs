//! PE イメージのリソース読み取りアダプター
//! Windows: データファイルとしてロードし（実行しない）、RT_MANIFEST と RT_VERSION を読む
//! 非Windows: リソースは読めないものとして扱う（検証は常に拒否される）

mod version_info;

use std::path::Path;

use mu_domain::DomainError;
use mu_domain::model::VersionStrings;
use mu_domain::port::driven::ImageMetadataReader;

pub use version_info::parse_version_strings;

/// マニフェストとバージョン情報はどちらもリソース ID 1
const RESOURCE_ID: usize = 1;
const RT_VERSION: usize = 16;
const RT_MANIFEST: usize = 24;

#[derive(Debug, Default)]
pub struct ImageResourceAdapter;

impl ImageResourceAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageMetadataReader for ImageResourceAdapter {
    fn manifest(&self, path: &Path) -> Result<Vec<u8>, DomainError> {
        read_resource(path, RT_MANIFEST)
    }

    fn version_strings(&self, path: &Path) -> Result<VersionStrings, DomainError> {
        let data = read_resource(path, RT_VERSION)?;
        parse_version_strings(&data).ok_or_else(|| {
            DomainError::ResourceUnavailable(format!(
                "malformed version resource in {}",
                path.display()
            ))
        })
    }
}

#[cfg(windows)]
fn read_resource(path: &Path, resource_type: usize) -> Result<Vec<u8>, DomainError> {
    win::read_resource(path, RESOURCE_ID, resource_type)
}

#[cfg(not(windows))]
fn read_resource(path: &Path, resource_type: usize) -> Result<Vec<u8>, DomainError> {
    let _ = (RESOURCE_ID, resource_type);
    Err(DomainError::ResourceUnavailable(format!(
        "PE resources are only readable on Windows: {}",
        path.display()
    )))
}

#[cfg(windows)]
mod win {
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use mu_domain::DomainError;
    use mu_log_utils::write_lifecycle_line;
    use windows::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows::Win32::System::LibraryLoader::{
        FindResourceW, LOAD_LIBRARY_AS_DATAFILE, LoadLibraryExW, LoadResource, LockResource,
        SizeofResource,
    };
    use windows::core::PCWSTR;

    struct LibraryGuard(HMODULE);

    impl Drop for LibraryGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = FreeLibrary(self.0);
            }
        }
    }

    fn unavailable(path: &Path, what: &str) -> DomainError {
        let message = format!("{} failed for {}", what, path.display());
        write_lifecycle_line("IMAGE", &message);
        DomainError::ResourceUnavailable(message)
    }

    /// MAKEINTRESOURCE 相当
    fn int_resource(id: usize) -> PCWSTR {
        PCWSTR(id as *const u16)
    }

    pub fn read_resource(
        path: &Path,
        id: usize,
        resource_type: usize,
    ) -> Result<Vec<u8>, DomainError> {
        let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
        wide.push(0);

        unsafe {
            let module = LoadLibraryExW(PCWSTR(wide.as_ptr()), None, LOAD_LIBRARY_AS_DATAFILE)
                .map_err(|_| unavailable(path, "LoadLibraryExW"))?;
            let _guard = LibraryGuard(module);

            let info = FindResourceW(Some(module), int_resource(id), int_resource(resource_type));
            if info.0.is_null() {
                return Err(unavailable(path, "FindResourceW"));
            }
            let size = SizeofResource(Some(module), info) as usize;
            let loaded =
                LoadResource(Some(module), info).map_err(|_| unavailable(path, "LoadResource"))?;
            let data = LockResource(loaded);
            if data.is_null() || size == 0 {
                return Err(unavailable(path, "LockResource"));
            }
            // モジュール解放前に複製する
            Ok(std::slice::from_raw_parts(data as *const u8, size).to_vec())
        }
    }
}
