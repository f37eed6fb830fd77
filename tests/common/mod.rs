//! Shared fixtures for pipeline tests: a throwaway project, stand-in
//! installer and compiler scripts, and a one-file HTTP server.
#![allow(dead_code)]

use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use kodegen_bundler_node::bundler::ToolCommand;

/// Creates `node_modules/<dep>` for every entry of the `dependencies`
/// object in `./package.json`, and records its arguments in `install.log`.
const INSTALLER: &str = r#"#!/bin/sh
set -e
echo "$(pwd) $*" >> "__LOG__"
awk '
  /"dependencies": *\{\}/ { next }
  /"dependencies": *\{/ { d = 1; next }
  d && /\}/ { d = 0 }
  d { gsub(/[ ",]/, ""); split($0, a, ":"); print a[1] }
' package.json | while read dep; do
  mkdir -p "node_modules/$dep"
  [ -f "node_modules/$dep/package.json" ] || echo "{\"name\": \"$dep\"}" > "node_modules/$dep/package.json"
done
"#;

/// Concatenates the entry file into the output behind an externals header.
pub const COMPILER: &str = r#"#!/bin/sh
set -e
{
  echo "// externals: $BUNDLE_EXTERNALS"
  cat "$BUNDLE_ENTRY"
} > "$BUNDLE_OUTPUT"
"#;

/// A project directory under a temp root.
pub struct Project {
    root: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("project")).unwrap();
        Self { root }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.path().join("project")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.dir().join("build")
    }

    pub fn staging(&self) -> PathBuf {
        self.build_dir().join("bundle")
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn write_manifest(&self, relative: &str, name: &str, deps: &[(&str, &str)]) {
        let deps: serde_json::Map<String, serde_json::Value> = deps
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
            .collect();
        let manifest = serde_json::json!({
            "name": name,
            "version": "1.0.0",
            "dependencies": deps,
            "devDependencies": { "mocha": "10.0.0" },
        });
        self.write(relative, &serde_json::to_string_pretty(&manifest).unwrap());
    }

    pub fn write_executable(&self, relative: &str, contents: &str) {
        self.write(relative, contents);
        std::fs::set_permissions(
            self.dir().join(relative),
            std::fs::Permissions::from_mode(0o755),
        )
        .unwrap();
    }

    pub fn install_log(&self) -> PathBuf {
        self.root.path().join("install.log")
    }

    pub fn installer(&self) -> ToolCommand {
        let script = INSTALLER.replace("__LOG__", &self.install_log().to_string_lossy());
        ToolCommand::new(self.script("install.sh", &script).to_string_lossy())
    }

    pub fn compiler(&self) -> ToolCommand {
        ToolCommand::new(self.script("compile.sh", COMPILER).to_string_lossy())
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root.path().join("bin").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Serves `body` to every request on a local port and returns its URL.
pub async fn serve(body: &'static [u8]) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/rt")
}

/// One archive member.
#[derive(Debug, PartialEq, Eq)]
pub struct Member {
    pub mode: u32,
    pub contents: Vec<u8>,
}

/// Reads a `.tar.gz` into path -> member, directories with empty contents.
pub fn read_archive(path: &Path) -> BTreeMap<String, Member> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut members = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry
            .path()
            .unwrap()
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();
        let mode = entry.header().mode().unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        members.insert(name, Member { mode, contents });
    }
    members
}

/// Top-level names in an archive.
pub fn top_level(members: &BTreeMap<String, Member>) -> Vec<String> {
    let mut roots: Vec<String> = members
        .keys()
        .filter_map(|name| name.split('/').next().map(String::from))
        .collect();
    roots.dedup();
    roots
}
