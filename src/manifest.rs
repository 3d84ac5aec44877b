// src/manifest.rs

//! Manifest generation for HTTP-manifest sources
//!
//! Scans a versions directory laid out as one sub-directory per released
//! version (optionally holding a description file) and produces the JSON
//! document a [`ServerSource`](crate::ServerSource) consumes. Publishing
//! is then a matter of serving the versions directory and the document
//! from the same base URL.

use crate::error::{Error, Result};
use crate::source::{ManifestAsset, ManifestRelease};
use semver::Version;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Default name of the per-version description file
pub const DESCRIPTION_FILENAME: &str = "description.txt";

/// Default separator between the release name and its description
pub const NAME_SEPARATOR: &str = "=====";

/// Scan a versions directory into manifest entries, sorted ascending
///
/// Every sub-directory must be named after a valid version (a leading `v`
/// is tolerated). Files inside become the release's assets, except the
/// description file, which is parsed into name and description instead.
pub fn scan_versions_dir(
    versions_dir: &Path,
    base_url: &str,
    description_filename: &str,
    name_separator: &str,
) -> Result<Vec<ManifestRelease>> {
    let base_url = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };

    let mut entries: Vec<(Version, ManifestRelease)> = Vec::new();
    for dir_entry in fs::read_dir(versions_dir)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_dir() {
            continue;
        }
        let folder_name = dir_entry.file_name().to_string_lossy().to_string();
        let version = Version::parse(folder_name.trim().trim_start_matches('v'))?;

        let release = read_version_dir(
            &dir_entry.path(),
            &version,
            &format!("{}{}/", base_url, folder_name),
            description_filename,
            name_separator,
        )?;
        debug!("scanned version {}", version);
        entries.push((version, release));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries.into_iter().map(|(_, release)| release).collect())
}

fn read_version_dir(
    dir: &Path,
    version: &Version,
    folder_url: &str,
    description_filename: &str,
    name_separator: &str,
) -> Result<ManifestRelease> {
    let mut name = String::new();
    let mut description = String::new();
    let mut assets = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_string();
        if filename == description_filename {
            (name, description) = read_description(&entry.path(), name_separator)?;
            continue;
        }
        assets.push(ManifestAsset { filename });
    }

    if assets.is_empty() {
        return Err(Error::ReleaseDiscarded {
            tag: version.to_string(),
            reason: format!("version directory '{}' holds no assets", dir.display()),
        });
    }
    // deterministic output regardless of directory iteration order
    assets.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(ManifestRelease {
        folder_url: folder_url.to_string(),
        name,
        description,
        version: version.to_string(),
        assets,
    })
}

/// Split a description file into release name and description
fn read_description(path: &Path, name_separator: &str) -> Result<(String, String)> {
    let content = fs::read_to_string(path)?;
    match content.split_once(name_separator) {
        Some((name, description)) => {
            Ok((name.trim().to_string(), description.trim().to_string()))
        }
        None => Ok((content.trim().to_string(), String::new())),
    }
}

/// Write manifest entries as the served JSON document
pub fn write_manifest(releases: &[ManifestRelease], output: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(releases).map_err(|e| Error::Decode {
        url: output.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::write(output, json)?;
    info!(
        "wrote manifest with {} release(s) to {}",
        releases.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_version_dir(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
    }

    #[test]
    fn test_scan_sorts_ascending_and_builds_urls() {
        let root = tempfile::tempdir().unwrap();
        make_version_dir(root.path(), "2.0.0", &[("app_linux_x86_64", "b")]);
        make_version_dir(root.path(), "1.0.0", &[("app_linux_x86_64", "a")]);

        let releases = scan_versions_dir(
            root.path(),
            "https://host/updates",
            DESCRIPTION_FILENAME,
            NAME_SEPARATOR,
        )
        .unwrap();

        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].version, "1.0.0");
        assert_eq!(releases[1].version, "2.0.0");
        assert_eq!(releases[0].folder_url, "https://host/updates/1.0.0/");
    }

    #[test]
    fn test_scan_parses_description_file() {
        let root = tempfile::tempdir().unwrap();
        make_version_dir(
            root.path(),
            "v1.2.0",
            &[
                ("app_linux_x86_64", "bin"),
                ("description.txt", "Spring release=====Many fixes."),
            ],
        );

        let releases = scan_versions_dir(
            root.path(),
            "https://host/u/",
            DESCRIPTION_FILENAME,
            NAME_SEPARATOR,
        )
        .unwrap();

        assert_eq!(releases[0].name, "Spring release");
        assert_eq!(releases[0].description, "Many fixes.");
        // the description file never shows up as an asset
        assert_eq!(releases[0].assets.len(), 1);
        assert_eq!(releases[0].assets[0].filename, "app_linux_x86_64");
    }

    #[test]
    fn test_scan_rejects_unversioned_directory() {
        let root = tempfile::tempdir().unwrap();
        make_version_dir(root.path(), "not-a-version", &[("f", "x")]);

        assert!(scan_versions_dir(
            root.path(),
            "https://host/",
            DESCRIPTION_FILENAME,
            NAME_SEPARATOR
        )
        .is_err());
    }

    #[test]
    fn test_written_manifest_decodes_again() {
        let root = tempfile::tempdir().unwrap();
        make_version_dir(root.path(), "1.0.0", &[("app_linux_x86_64", "a")]);
        let releases = scan_versions_dir(
            root.path(),
            "https://host/",
            DESCRIPTION_FILENAME,
            NAME_SEPARATOR,
        )
        .unwrap();

        let output = root.path().join("serv_update.json");
        write_manifest(&releases, &output).unwrap();

        let decoded: Vec<ManifestRelease> =
            serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].version, "1.0.0");
    }
}
