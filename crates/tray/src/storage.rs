use std::{io::ErrorKind, path::Path};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// `None` when the file does not exist; malformed content is an error.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io("read", path)(e)),
    };
    serde_json::from_str(&data).map(Some).map_err(Error::json(path))
}

/// Pretty-printed JSON, written to a sibling temp file then renamed.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(Error::io("create", parent))?;
    }
    let data = serde_json::to_string_pretty(value).map_err(Error::json(path))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data)
        .await
        .map_err(Error::io("write", &tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(Error::io("rename", path))
}
