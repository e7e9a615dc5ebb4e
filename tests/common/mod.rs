//! Common test utilities and helpers for reposnap tests
#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Temporary target directory plus a place for a config file
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Directory repositories are synced into
    pub fn target(&self) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child("target")
    }

    /// Write `content` to a file under the target directory, creating parents
    pub fn seed_file(&self, relative: &str, content: &str) {
        let file = self.target().child(relative);
        std::fs::create_dir_all(file.path().parent().expect("seed file has a parent"))
            .expect("Failed to create parent directories");
        file.write_str(content).expect("Failed to write seed file");
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config = self.temp_dir.child("config.yml");
        config
            .write_str(content)
            .expect("Failed to write test config");
        config.path().to_path_buf()
    }

    /// Config pointing archive downloads at `archive_url`
    pub fn create_archive_config(&self, archive_url: &str, repositories: &[&str]) -> PathBuf {
        let repos: String = if repositories.is_empty() {
            " []\n".to_string()
        } else {
            std::iter::once("\n".to_string())
                .chain(repositories.iter().map(|r| format!("  - {}\n", r)))
                .collect()
        };
        self.create_test_config(&format!(
            r#"
target_directory: "{}"
repositories:{}sync:
  branches: [main, master]
  timeout: 5
github:
  archive_url: "{}"
  token_env: "REPOSNAP_TEST_UNSET_TOKEN"
logging:
  color: false
"#,
            self.target().path().display(),
            repos,
            archive_url
        ))
    }
}

/// Build an in-memory zip archive; names ending in `/` become directories
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, FileOptions::default())
                .expect("Failed to add directory");
        } else {
            writer
                .start_file(*name, FileOptions::default())
                .expect("Failed to start file");
            writer
                .write_all(content.as_bytes())
                .expect("Failed to write file");
        }
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

fn archive_path(repo: &str, branch: &str) -> String {
    format!("/{}/zip/refs/heads/{}", repo, branch)
}

/// Serve `body` as the archive of `repo` at `branch`
pub async fn mount_archive(server: &MockServer, repo: &str, branch: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(archive_path(repo, branch)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Answer 404 for `repo` at `branch`
pub async fn mount_missing(server: &MockServer, repo: &str, branch: &str) {
    Mock::given(method("GET"))
        .and(path(archive_path(repo, branch)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Sorted relative paths of every file under `root`
pub fn list_files(root: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .expect("entry outside root")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

pub fn assert_contains_any(text: &str, expected: &[&str]) {
    let found = expected.iter().any(|item| text.contains(item));
    assert!(
        found,
        "Expected text to contain at least one of {:?}, but it didn't. Text: {}",
        expected,
        text
    );
}
