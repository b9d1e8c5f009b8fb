//! Unit tests for the flat-file backend

use std::path::PathBuf;
use std::sync::Arc;

use ag_core::backends::{AuthBackend, BackendContext};
use ag_core::domain::entities::AuthStatus;
use ag_core::engine::EngineCounters;
use ag_shared::utils::args::ArgMap;

use crate::backends::FileAuthBackend;

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("authgrid-test-{}.creds", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write temp credential file");
        Self { path }
    }

    fn write(&self, contents: &str) {
        std::fs::write(&self.path, contents).expect("rewrite temp credential file");
    }

    fn arg(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn context(args: &str) -> BackendContext {
    BackendContext::new(
        ArgMap::parse(args).expect("test args"),
        None,
        Arc::new(EngineCounters::default()),
    )
}

#[tokio::test]
async fn authenticates_against_file_records() {
    let file = TempFile::new("// credentials\ntest.com;jeff;foobar\ntest.com;jane;pw\n");
    let backend = FileAuthBackend::new();
    backend
        .open(context(&format!("Path={}", file.arg())))
        .await
        .unwrap();

    let ok = backend
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(ok.status, AuthStatus::Authenticated);

    let wrong = backend
        .authenticate("test.com", "jeff", "nope")
        .await
        .unwrap();
    assert_eq!(wrong.status, AuthStatus::AccessDenied);

    backend.close().await;
}

#[tokio::test]
async fn reserved_and_unknown_keys_do_not_break_open() {
    let file = TempFile::new("test.com;jeff;foobar\n");
    let backend = FileAuthBackend::new();
    // reserved keys are consumed by the mapping layer; an unknown key is
    // logged and ignored
    backend
        .open(context(&format!(
            "Path={};LockoutCount=3;MaxCacheTime=5m;Bogus=1",
            file.arg()
        )))
        .await
        .unwrap();
    let ok = backend
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(ok.status, AuthStatus::Authenticated);
    backend.close().await;
}

#[tokio::test]
async fn missing_path_is_a_configuration_error() {
    let backend = FileAuthBackend::new();
    assert!(backend.open(context("Reload=true")).await.is_err());
}

#[tokio::test]
async fn unreadable_file_fails_open() {
    let backend = FileAuthBackend::new();
    assert!(backend
        .open(context("Path=/nonexistent/authgrid.creds"))
        .await
        .is_err());
}

#[tokio::test]
async fn reload_on_query_sees_edits() {
    let file = TempFile::new("test.com;jeff;foobar\n");
    let backend = FileAuthBackend::new();
    backend
        .open(context(&format!("Path={};Reload=true", file.arg())))
        .await
        .unwrap();

    file.write("test.com;jeff;changed\n");
    let old = backend
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(old.status, AuthStatus::AccessDenied);
    let new = backend
        .authenticate("test.com", "jeff", "changed")
        .await
        .unwrap();
    assert_eq!(new.status, AuthStatus::Authenticated);
    backend.close().await;
}

#[tokio::test]
async fn without_reload_edits_wait_for_reopen() {
    let file = TempFile::new("test.com;jeff;foobar\n");
    let backend = FileAuthBackend::new();
    backend
        .open(context(&format!("Path={}", file.arg())))
        .await
        .unwrap();

    file.write("test.com;jeff;changed\n");
    let still_old = backend
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(still_old.status, AuthStatus::Authenticated);
    backend.close().await;
}
