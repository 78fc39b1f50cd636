use crate::ArtifactError;
use std::path::{Path, PathBuf};

/// File extension of a packaged artifact.
pub const ARTIFACT_EXT: &str = "epub";

fn project_base_name(project_dir: &Path) -> Result<String, ArtifactError> {
    project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ArtifactError::InvalidProjectDir(format!(
                "no base name in '{}'",
                project_dir.display()
            ))
        })
}

/// Canonical artifact location: a sibling of the project directory named
/// `<dirname>.epub`.
pub fn canonical_artifact_path(project_dir: &Path) -> Result<PathBuf, ArtifactError> {
    let base = project_base_name(project_dir)?;
    let parent = project_dir.parent().ok_or_else(|| {
        ArtifactError::InvalidProjectDir(format!(
            "no parent directory for '{}'",
            project_dir.display()
        ))
    })?;
    Ok(parent.join(format!("{base}.{ARTIFACT_EXT}")))
}

/// Where the checker sometimes drops the artifact instead: inside the
/// project directory, under the same base name.
pub fn inner_artifact_path(project_dir: &Path) -> Result<PathBuf, ArtifactError> {
    let base = project_base_name(project_dir)?;
    Ok(project_dir.join(format!("{base}.{ARTIFACT_EXT}")))
}

/// Hidden, timestamp-qualified backup name in the same directory:
/// `.{stem}-{timestamp}.{ext}`. The dot prefix keeps a backup left behind by
/// a crashed run recognizable and manually recoverable.
pub fn backup_path(artifact: &Path, timestamp: &str) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let ext = artifact
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));
    let name = format!(".{stem}-{timestamp}{}", ext.unwrap_or_default());
    artifact.with_file_name(name)
}

/// First unused `{stem} (n).{ext}` sibling, counting from 2. Deterministic
/// and collision-free: with N same-named candidates present, the result is
/// exactly one previously-absent name.
pub fn disambiguated_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let ext = artifact
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n: u32 = 2;
    loop {
        let candidate = artifact.with_file_name(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
