//! Integration tests for the git tools against a real `git` binary.
//!
//! Each test works in its own scratch directory. Tests return early when no
//! `git` binary is available.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use git_mcp::git::{register_tools, GitOperations};
use git_mcp::mcp::protocol::ServerInfo;
use git_mcp::mcp::server::McpServer;
use git_mcp::mcp::ToolContext;

// =============================================================================
// Helpers
// =============================================================================

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

macro_rules! require_git {
    () => {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
    };
}

/// An initialised server plus a scratch directory.
struct Fixture {
    server: McpServer,
    dir: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let mut server = McpServer::new(ServerInfo::default());
        register_tools(&mut server, GitOperations::default(), None);

        let mut fixture = Self {
            server,
            dir: tempfile::tempdir().unwrap(),
        };
        let init = fixture
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "git-tests", "version": "1"}
                }),
            )
            .await;
        assert!(init.get("result").is_some());
        fixture
    }

    /// Creates a fixture holding a repository with one commit of `a.txt`.
    async fn with_repo() -> Self {
        let mut fixture = Self::new().await;
        let repo = fixture.repo();
        fixture
            .ok("git_init", json!({"repo_path": path_str(&repo)}))
            .await;
        std::fs::write(repo.join("a.txt"), "hello\n").unwrap();
        fixture
            .ok("git_add", json!({"repo_path": path_str(&repo), "files": ["a.txt"]}))
            .await;
        fixture
            .ok("git_commit", json!({"repo_path": path_str(&repo), "message": "first"}))
            .await;
        fixture
    }

    fn repo(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    fn repo_str(&self) -> String {
        path_str(&self.repo())
    }

    async fn request(&mut self, method: &str, params: Value) -> Value {
        let frame = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let bytes = serde_json::to_vec(&frame).unwrap();
        let response = self
            .server
            .handle_frame(&ToolContext::detached(), &bytes)
            .await
            .expect("expected a response");
        serde_json::to_value(response).unwrap()
    }

    async fn call(&mut self, tool: &str, arguments: Value) -> Result<String, String> {
        let response = self
            .request("tools/call", json!({"name": tool, "arguments": arguments}))
            .await;
        if let Some(error) = response.get("error") {
            assert_eq!(error["code"], -32603, "unexpected error: {error}");
            return Err(error["message"].as_str().unwrap().to_string());
        }
        let content = &response["result"]["content"];
        assert_eq!(content[0]["type"], "text");
        Ok(content[0]["text"].as_str().unwrap().to_string())
    }

    async fn ok(&mut self, tool: &str, arguments: Value) -> String {
        match self.call(tool, arguments).await {
            Ok(text) => text,
            Err(message) => panic!("{tool} failed: {message}"),
        }
    }

    async fn err(&mut self, tool: &str, arguments: Value) -> String {
        match self.call(tool, arguments).await {
            Ok(text) => panic!("{tool} unexpectedly succeeded: {text}"),
            Err(message) => message,
        }
    }
}

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

// =============================================================================
// Working tree
// =============================================================================

#[tokio::test]
async fn test_init_reports_kind() {
    require_git!();
    let mut fx = Fixture::new().await;
    let repo = fx.repo_str();

    let text = fx.ok("git_init", json!({"repo_path": repo})).await;
    assert_eq!(
        text,
        format!("Initialized empty Git repository (regular) in {repo}")
    );
    assert!(fx.repo().join(".git").exists());

    let bare = path_str(&fx.dir.path().join("remote.git"));
    let text = fx
        .ok("git_init", json!({"repo_path": bare, "bare": true}))
        .await;
    assert!(text.contains("(bare)"));
}

#[tokio::test]
async fn test_status_add_commit_log() {
    require_git!();
    let mut fx = Fixture::new().await;
    let repo = fx.repo_str();
    fx.ok("git_init", json!({"repo_path": repo})).await;

    let status = fx.ok("git_status", json!({"repo_path": repo})).await;
    assert_eq!(status, "Repository status:\nworking tree clean");

    std::fs::write(fx.repo().join("a.txt"), "hello\n").unwrap();
    let status = fx.ok("git_status", json!({"repo_path": repo})).await;
    assert!(status.contains("?? a.txt"), "{status}");

    let added = fx
        .ok("git_add", json!({"repo_path": repo, "files": ["a.txt"]}))
        .await;
    assert_eq!(added, "Files staged successfully");

    let staged = fx.ok("git_diff_staged", json!({"repo_path": repo})).await;
    assert!(staged.starts_with("Staged changes:\n"));
    assert!(staged.contains("+hello"));

    let committed = fx
        .ok("git_commit", json!({"repo_path": repo, "message": "first"}))
        .await;
    assert!(committed.starts_with("Changes committed successfully with hash "));

    let log = fx.ok("git_log", json!({"repo_path": repo})).await;
    assert!(log.starts_with("Commit history:\n"));
    assert!(log.contains("Author: MCP Git Server"));
    assert!(log.contains("Message: first"));
}

#[tokio::test]
async fn test_commit_with_nothing_staged_fails() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    let message = fx
        .err("git_commit", json!({"repo_path": repo, "message": "empty"}))
        .await;
    assert!(message.starts_with("Tool execution error: git commit"));
}

#[tokio::test]
async fn test_diffs_and_reset() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    std::fs::write(fx.repo().join("a.txt"), "changed\n").unwrap();

    let unstaged = fx.ok("git_diff_unstaged", json!({"repo_path": repo})).await;
    assert!(unstaged.starts_with("Unstaged changes:\n"));
    assert!(unstaged.contains("+changed"));

    let against_head = fx
        .ok("git_diff", json!({"repo_path": repo, "target": "HEAD", "context_lines": 0}))
        .await;
    assert!(against_head.starts_with("Diff with HEAD:\n"));
    assert!(against_head.contains("-hello"));

    fx.ok("git_add", json!({"repo_path": repo, "files": ["."]}))
        .await;
    let reset = fx.ok("git_reset", json!({"repo_path": repo})).await;
    assert_eq!(reset, "All staged changes reset");

    let staged = fx.ok("git_diff_staged", json!({"repo_path": repo})).await;
    assert_eq!(staged, "Staged changes:\nno staged changes");
}

#[tokio::test]
async fn test_log_filters_and_show() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    let recent = fx
        .ok("git_log", json!({"repo_path": repo, "start_timestamp": "2000-01-01"}))
        .await;
    assert!(recent.contains("Message: first"));

    let ancient = fx
        .ok("git_log", json!({"repo_path": repo, "end_timestamp": "Jan 1 2000"}))
        .await;
    assert_eq!(ancient, "Commit history:\n");

    let bad = fx
        .err("git_log", json!({"repo_path": repo, "start_timestamp": "last tuesday"}))
        .await;
    assert!(bad.contains("start_timestamp"));

    let show = fx
        .ok("git_show", json!({"repo_path": repo, "revision": "HEAD"}))
        .await;
    assert!(show.contains("first"));
    assert!(show.contains("+hello"));
}

// =============================================================================
// Branches
// =============================================================================

#[tokio::test]
async fn test_branch_lifecycle() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    let created = fx
        .ok("git_create_branch", json!({"repo_path": repo, "branch_name": "feature"}))
        .await;
    assert_eq!(created, "Created branch 'feature' from 'HEAD'");

    let switched = fx
        .ok("git_checkout", json!({"repo_path": repo, "branch_name": "feature"}))
        .await;
    assert_eq!(switched, "Switched to branch 'feature'");

    let branches = fx.ok("git_branch", json!({"repo_path": repo})).await;
    assert!(branches.contains("* feature"), "{branches}");

    let bad = fx
        .err("git_branch", json!({"repo_path": repo, "branch_type": "both"}))
        .await;
    assert!(bad.contains("branch_type"));

    let missing = fx
        .err("git_checkout", json!({"repo_path": repo, "branch_name": "no-such-branch"}))
        .await;
    assert!(missing.contains("git checkout"));
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
async fn test_tag_lifecycle() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    let annotated = fx
        .ok("git_create_tag", json!({"repo_path": repo, "tag_name": "v1.0.0", "message": "Release"}))
        .await;
    assert!(annotated.starts_with("Created annotated tag 'v1.0.0' at "));
    assert!(annotated.ends_with(" with message: Release"));

    let light = fx
        .ok("git_create_tag", json!({"repo_path": repo, "tag_name": "nightly", "annotated": false}))
        .await;
    assert!(light.starts_with("Created lightweight tag 'nightly' at "));

    let all = fx.ok("git_list_tags", json!({"repo_path": repo})).await;
    assert_eq!(all, "Tags:\n- nightly\n- v1.0.0");

    let filtered = fx
        .ok("git_list_tags", json!({"repo_path": repo, "pattern": "v1*"}))
        .await;
    assert_eq!(filtered, "Tags:\n- v1.0.0");

    let deleted = fx
        .ok("git_delete_tag", json!({"repo_path": repo, "tag_name": "v1.0.0"}))
        .await;
    assert_eq!(deleted, "Deleted tag 'v1.0.0'");

    let again = fx
        .err("git_delete_tag", json!({"repo_path": repo, "tag_name": "v1.0.0"}))
        .await;
    assert_eq!(again, "Tool execution error: tag 'v1.0.0' not found");

    let none = fx
        .ok("git_list_tags", json!({"repo_path": repo, "pattern": "release-*"}))
        .await;
    assert_eq!(none, "No tags found");
}

// =============================================================================
// Remotes
// =============================================================================

#[tokio::test]
async fn test_push_to_local_remote() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();
    let remote = path_str(&fx.dir.path().join("remote.git"));

    fx.ok("git_init", json!({"repo_path": remote, "bare": true}))
        .await;
    fx.ok(
        "git_raw_command",
        json!({"repo_path": repo, "command": format!("git remote add origin '{remote}'")}),
    )
    .await;

    let pushed = fx
        .ok("git_push", json!({"repo_path": repo, "refspec": "HEAD:refs/heads/main"}))
        .await;
    assert_eq!(
        pushed,
        "Successfully pushed to origin with refspec: HEAD:refs/heads/main"
    );

    let again = fx
        .ok("git_push", json!({"repo_path": repo, "refspec": "HEAD:refs/heads/main"}))
        .await;
    assert_eq!(again, "Everything up-to-date");

    fx.ok("git_create_tag", json!({"repo_path": repo, "tag_name": "v2"}))
        .await;
    let tag = fx
        .ok("git_push_tags", json!({"repo_path": repo, "tag_name": "v2"}))
        .await;
    assert_eq!(tag, "Pushed tag 'v2' to origin");

    let missing_remote = fx
        .err("git_push", json!({"repo_path": repo, "remote": "upstream"}))
        .await;
    assert!(missing_remote.contains("git push upstream"));
}

// =============================================================================
// Raw commands and discovery
// =============================================================================

#[tokio::test]
async fn test_raw_command() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    let subjects = fx
        .ok("git_raw_command", json!({"repo_path": repo, "command": "git log --format=\"%s by %an\""}))
        .await;
    assert_eq!(subjects.trim(), "first by MCP Git Server");

    let not_git = fx
        .err("git_raw_command", json!({"repo_path": repo, "command": "rm -rf /"}))
        .await;
    assert!(not_git.contains("must start with 'git'"));

    let unterminated = fx
        .err("git_raw_command", json!({"repo_path": repo, "command": "git commit -m 'oops"}))
        .await;
    assert!(unterminated.contains("unterminated quote"));
}

#[tokio::test]
async fn test_list_repositories() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let root = path_str(fx.dir.path());

    let shallow = fx
        .ok("git_list_repositories", json!({"search_path": root}))
        .await;
    assert_eq!(shallow, "No Git repositories found");

    let deep = fx
        .ok("git_list_repositories", json!({"search_path": root, "recursive": true}))
        .await;
    assert!(deep.starts_with("Found Git repositories:\n- "));
    assert!(deep.contains(&fx.repo_str()));
}

#[tokio::test]
async fn test_missing_required_arguments() {
    require_git!();
    let mut fx = Fixture::with_repo().await;
    let repo = fx.repo_str();

    for (tool, argument) in [
        ("git_commit", "message"),
        ("git_diff", "target"),
        ("git_checkout", "branch_name"),
        ("git_show", "revision"),
        ("git_create_tag", "tag_name"),
        ("git_raw_command", "command"),
    ] {
        let message = fx.err(tool, json!({"repo_path": repo})).await;
        assert_eq!(
            message,
            format!("Tool execution error: argument '{argument}' is required")
        );
    }

    let files = fx
        .err("git_add", json!({"repo_path": repo, "files": []}))
        .await;
    assert!(files.contains("argument 'files'"));
}

#[tokio::test]
async fn test_not_a_repository() {
    require_git!();
    let mut fx = Fixture::new().await;
    let plain = path_str(fx.dir.path());

    let message = fx.err("git_status", json!({"repo_path": plain})).await;
    assert!(message.starts_with("Tool execution error: git status"));
}
