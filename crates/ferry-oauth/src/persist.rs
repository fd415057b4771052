//! Owner-only atomic rewrite of credential files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{OAuthError, Result};

/// Serialize `value` as JSON and atomically replace `path` with it.
///
/// The JSON is written to a sibling `.tmp` file, restricted to 0600 on Unix,
/// then renamed over the original. Readers see the old file or the new file,
/// never a partial one.
pub fn write_private_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let content = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, &content).map_err(|e| io_error(&temp_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        if let Err(source) = std::fs::set_permissions(&temp_path, permissions) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(io_error(&temp_path, source));
        }
    }

    if let Err(source) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_error(path, source));
    }

    tracing::debug!(path = %path.display(), "Credential file rewritten");
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> OAuthError {
    OAuthError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
