use crate::errors::{Result, ResultExt};
use std::fs;
use std::path::Path;
use zip::ZipArchive;

/// Extract every regular file of `zip_path` under `dest`, keeping entry-relative
/// paths. Directory entries are implied by the files beneath them.
pub fn unzip_into(zip_path: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory {}", dest.display()))?;

    let f = fs::File::open(zip_path)
        .with_context(|| format!("failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(f)
        .with_context(|| format!("{} is not a readable archive", zip_path.display()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("failed to read entry {i} of {}", zip_path.display()))?;
        if file.is_dir() {
            continue;
        }

        let Some(rel) = file.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("skipping archive entry with unsafe path: {}", file.name());
            continue;
        };
        let outpath = dest.join(rel);

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&outpath)
            .with_context(|| format!("failed to create {}", outpath.display()))?;
        std::io::copy(&mut file, &mut out)
            .with_context(|| format!("failed to extract {}", file.name()))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode().map(|m| m & 0o777).filter(|m| *m != 0) {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
        }

        written += 1;
    }
    Ok(written)
}
