use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use atlas_common::{
    transactions::{StdTx, TxEncoder},
    utils::NodeId,
};

use crate::config::CONFIG_DIR;

pub const GENTX_DIR: &str = "gentx";

/// Default location of a node's genesis transaction,
/// `<root>/config/gentx/gentx-<node_id>.json`. The directory is created if
/// missing.
pub fn make_output_filepath(root: &Path, node_id: &NodeId) -> io::Result<PathBuf> {
    let dir = root.join(CONFIG_DIR).join(GENTX_DIR);
    create_private_dir(&dir)?;
    Ok(dir.join(format!("gentx-{}.json", node_id)))
}

/// Creates the parent directory of an explicitly chosen output file.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_private_dir(parent),
        _ => Ok(()),
    }
}

/// Writes `tx` followed by a newline to a file that must not exist yet.
///
/// An existing file fails with [`io::ErrorKind::AlreadyExists`] and is left
/// untouched.
pub fn write_signed_gentx<E>(path: &Path, tx: &StdTx, encoder: &E) -> io::Result<()>
where
    E: TxEncoder + ?Sized,
{
    let mut bytes = encoder
        .encode(tx)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    bytes.push(b'\n');

    write_new_file(path, 0o644, &bytes)?;

    info!(path = %path.display(), signed = tx.is_signed(), "wrote genesis transaction");
    Ok(())
}

/// Creates `path` holding exactly `bytes`, failing if it already exists.
pub(crate) fn write_new_file(path: &Path, mode: u32, bytes: &[u8]) -> io::Result<()> {
    write_new_file_with(path, mode, |file| file.write_all(bytes))
}

/// Fills a temporary file next to `path` and moves it into place only once
/// `fill` and the sync succeed. On any failure nothing is left at `path`.
fn write_new_file_with<F>(path: &Path, mode: u32, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".tmp-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut tmp = builder.tempfile_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

/// Creates `dir` and its parents with owner-only access. Existing
/// directories keep their permissions.
pub(crate) fn create_private_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    debug!(path = %dir.display(), "created directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::transactions::{JsonTxCodec, StdFee};
    use tempfile::tempdir;

    fn empty_tx(memo: &str) -> StdTx {
        StdTx { msg: vec![], fee: StdFee::default(), signatures: vec![], memo: memo.into() }
    }

    #[test]
    fn test_output_path_layout() {
        let dir = tempdir().unwrap();
        let path = make_output_filepath(dir.path(), &NodeId::from("abc123")).unwrap();

        assert_eq!(path, dir.path().join("config").join("gentx").join("gentx-abc123.json"));
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_appends_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gentx.json");
        write_signed_gentx(&path, &empty_tx("m"), &JsonTxCodec).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        assert_eq!(content.matches('\n').count(), 1);
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gentx.json");
        write_signed_gentx(&path, &empty_tx("first"), &JsonTxCodec).unwrap();
        let before = fs::read(&path).unwrap();

        let err = write_signed_gentx(&path, &empty_tx("second"), &JsonTxCodec).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gentx.json");

        let err = write_new_file_with(&path, 0o644, |file| {
            file.write_all(b"{\"msg\":")?;
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        write_signed_gentx(&path, &empty_tx("retry"), &JsonTxCodec).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("retry"));
    }

    #[test]
    fn test_rejected_write_leaves_no_temporary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gentx.json");
        write_signed_gentx(&path, &empty_tx("first"), &JsonTxCodec).unwrap();
        write_signed_gentx(&path, &empty_tx("second"), &JsonTxCodec).unwrap_err();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("gentx.json")]);
    }

    #[test]
    fn test_parent_of_explicit_document_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("tx.json");
        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("out").join("nested").is_dir());

        ensure_parent_dir(Path::new("tx.json")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = make_output_filepath(dir.path(), &NodeId::from("n")).unwrap();
        write_signed_gentx(&path, &empty_tx(""), &JsonTxCodec).unwrap();

        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode();
        let file_mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert_eq!(file_mode & 0o777, 0o644);
    }
}
