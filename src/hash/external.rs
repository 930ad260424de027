//! External hasher wrapper (§4.1, §9): any executable taking one path argument and writing
//! a decimal unsigned integer on stdout.

use std::path::Path;
use std::process::Command;

use crate::error::HlsyncError;
use crate::types::Hash;

pub fn hash_file_external(program: &Path, path: &Path) -> Result<Hash, HlsyncError> {
    let output = Command::new(program)
        .arg(path)
        .output()
        .map_err(|e| HlsyncError::HasherExecFailed {
            cause: format!("{}: {}", program.display(), e),
        })?;

    if !output.status.success() {
        return Err(HlsyncError::HasherExecFailed {
            cause: format!(
                "{} exited with {:?} on {}",
                program.display(),
                output.status.code(),
                path.display()
            ),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let text = text.trim();
    text.parse::<u64>()
        .map(Hash)
        .map_err(|_| HlsyncError::HasherBadOutput {
            output: text.to_string(),
        })
}
