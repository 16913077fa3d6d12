//! Fetching and unpacking the pretrained model archive.

use crate::error::{Result, VisionError};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tar::Archive;

pub const MODEL_NAME: &str = "ssd_mobilenet_v1_coco_11_06_2017";
pub const DOWNLOAD_BASE: &str = "http://download.tensorflow.org/models/object_detection/";
pub const GRAPH_FILE: &str = "frozen_inference_graph.pb";

/// `<model_name>.tar.gz`
pub fn archive_name(model_name: &str) -> String {
    format!("{}.tar.gz", model_name)
}

/// Download `url` to `dest` unless `dest` already exists. Returns whether a
/// download happened.
pub fn ensure_downloaded<P: AsRef<Path>>(url: &str, dest: P) -> Result<bool> {
    let dest = dest.as_ref();
    if dest.is_file() {
        log::info!("Loading model...");
        return Ok(false);
    }
    log::info!("Downloading model...");
    download(url, dest)?;
    Ok(true)
}

/// Stream `url` into `dest` with a progress bar.
pub fn download<P: AsRef<Path>>(url: &str, dest: P) -> Result<()> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;

    let bar = match response.content_length() {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::no_length(),
    };
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes} ({eta})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(url.to_string());

    let saved = save_stream(bar.wrap_read(response), dest);
    bar.finish_and_clear();
    saved
}

/// `<dest>.part`, the file a transfer writes into before it is complete.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Copy `reader` into `dest`. Bytes go to [`partial_path`] first and are
/// renamed into place only after a successful flush; the partial file is
/// removed on any error, so `dest` exists only when complete.
pub fn save_stream<R: Read, P: AsRef<Path>>(mut reader: R, dest: P) -> Result<()> {
    let dest = dest.as_ref();
    let part = partial_path(dest);

    let written = File::create(&part).and_then(|file| {
        let mut writer = BufWriter::new(file);
        io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });
    if let Err(err) = written.and_then(|_| fs::rename(&part, dest)) {
        let _ = fs::remove_file(&part);
        return Err(VisionError::file(dest, err));
    }
    Ok(())
}

/// Extract every member of a `.tar.gz` whose base name contains `needle`
/// into `dest_dir`, keeping its path inside the archive. Returns the path of
/// the last extracted member.
pub fn extract_member<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, needle: &str, dest_dir: Q) -> Result<PathBuf> {
    let archive_path = archive_path.as_ref();
    let dest_dir = dest_dir.as_ref();
    let file = File::open(archive_path).map_err(|e| VisionError::file(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut extracted = None;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let member = entry.path()?.into_owned();
        let matches = member
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(needle));
        if matches {
            entry.unpack_in(dest_dir)?;
            extracted = Some(dest_dir.join(&member));
        }
    }
    log::info!("Extracting files...");

    extracted.ok_or_else(|| VisionError::dataset(archive_path, format!("no member named like '{}'", needle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, members: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extracts_only_matching_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("model.tar.gz");
        write_archive(
            &archive,
            &[
                ("model/graph.pbtxt", b"ignored"),
                ("model/frozen_inference_graph.pb", b"graph bytes"),
            ],
        );

        let out = dir.path().join("out");
        let path = extract_member(&archive, GRAPH_FILE, &out).unwrap();
        assert_eq!(path, out.join("model").join(GRAPH_FILE));
        assert_eq!(fs::read(&path).unwrap(), b"graph bytes");
        assert!(!out.join("model").join("graph.pbtxt").exists());
    }

    #[test]
    fn test_missing_member_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("model.tar.gz");
        write_archive(&archive, &[("model/readme.txt", b"hi")]);
        assert!(extract_member(&archive, GRAPH_FILE, dir.path()).is_err());
    }

    /// Yields `good` bytes, then fails.
    struct BrokenStream {
        good: usize,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            let n = self.good.min(buf.len());
            buf[..n].fill(7);
            self.good -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_save_stream_renames_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("model.tar.gz");
        save_stream(&b"archive bytes"[..], &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"archive bytes");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_interrupted_transfer_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("model.tar.gz");
        let err = save_stream(BrokenStream { good: 20_000 }, &dest).unwrap_err();
        assert!(matches!(err, VisionError::File { .. }));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("models/m.tar.gz")),
            PathBuf::from("models/m.tar.gz.part")
        );
    }

    #[test]
    fn test_existing_archive_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join(archive_name(MODEL_NAME));
        fs::write(&archive, b"cached").unwrap();
        // The URL is never contacted.
        assert!(!ensure_downloaded("http://127.0.0.1:9/unreachable", &archive).unwrap());
        assert_eq!(archive_name("m"), "m.tar.gz");
    }
}
