//! Git repository operations.
//!
//! Every operation runs the `git` binary in the target repository and returns
//! its result as text. A non-zero exit status becomes [`ToolError::Git`] with
//! git's own error output, which the client then sees verbatim.
//!
//! Commands run with the configured identity (`-c user.name=… -c user.email=…`)
//! so commits and annotated tags work in repositories without git config, and
//! with terminal prompts disabled so a push never waits for credentials.

mod parse;
pub mod tools;

pub use parse::{parse_timestamp, split_command, LogEntry};
pub use tools::{register_tools, GitTool};

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::ToolError;
use crate::mcp::tool::ToolContext;

/// Default number of context lines for diff operations.
pub const DEFAULT_CONTEXT_LINES: u32 = 3;

/// Default number of commits returned by `git_log`.
pub const DEFAULT_LOG_COUNT: usize = 10;

/// Default remote for push operations.
pub const DEFAULT_REMOTE: &str = "origin";

/// Author and committer identity used for commits and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User name.
    pub name: String,
    /// User email.
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "MCP Git Server".to_string(),
            email: "mcp-git@example.com".to_string(),
        }
    }
}

/// Which branches `git_branch` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchType {
    /// Local branches.
    Local,
    /// Remote-tracking branches.
    Remote,
    /// Both.
    All,
}

impl std::str::FromStr for BranchType {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "all" => Ok(Self::All),
            other => Err(ToolError::invalid_argument(
                "branch_type",
                format!("must be 'local', 'remote' or 'all', got '{other}'"),
            )),
        }
    }
}

/// Captured output of a successful git command.
#[derive(Debug, Clone, Default)]
struct GitOutput {
    stdout: String,
    stderr: String,
}

/// Runs git commands on behalf of the tool handlers.
#[derive(Debug, Clone)]
pub struct GitOperations {
    binary: String,
    identity: Identity,
}

impl Default for GitOperations {
    fn default() -> Self {
        Self::new("git", Identity::default())
    }
}

impl GitOperations {
    /// Creates git operations using `binary` and committing as `identity`.
    #[must_use]
    pub fn new(binary: impl Into<String>, identity: Identity) -> Self {
        Self {
            binary: binary.into(),
            identity,
        }
    }

    /// Returns the identity used for commits and tags.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Runs `git <args>` in `dir`.
    ///
    /// The child process is killed if shutdown is requested while it runs.
    async fn run(&self, ctx: &ToolContext, dir: &Path, args: &[&str]) -> Result<GitOutput, ToolError> {
        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg(format!("user.name={}", self.identity.name))
            .arg("-c")
            .arg(format!("user.email={}", self.identity.email))
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let command = args.join(" ");
        tracing::debug!(dir = %dir.display(), command = %command, "Running git");

        let output = tokio::select! {
            output = cmd.output() => output.map_err(|source| ToolError::Spawn {
                binary: self.binary.clone(),
                source,
            })?,
            () = ctx.cancelled() => return Err(ToolError::Cancelled),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() { &stdout } else { &stderr };
            tracing::debug!(command = %command, status = ?output.status.code(), "git failed");
            return Err(ToolError::Git {
                command,
                stderr: detail.trim().to_string(),
            });
        }

        Ok(GitOutput { stdout, stderr })
    }

    async fn stdout(&self, ctx: &ToolContext, dir: &Path, args: &[&str]) -> Result<String, ToolError> {
        Ok(self.run(ctx, dir, args).await?.stdout)
    }

    /// Returns the working tree status in porcelain form.
    ///
    /// # Errors
    ///
    /// Fails if `repo` is not a git repository.
    pub async fn status(&self, ctx: &ToolContext, repo: &Path) -> Result<String, ToolError> {
        let out = self.stdout(ctx, repo, &["status", "--porcelain"]).await?;
        let out = out.trim_end();
        if out.is_empty() {
            return Ok("working tree clean".to_string());
        }
        Ok(out.to_string())
    }

    /// Returns changes in the working tree that are not staged.
    ///
    /// # Errors
    ///
    /// Fails if git fails.
    pub async fn diff_unstaged(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        context_lines: u32,
    ) -> Result<String, ToolError> {
        let unified = format!("--unified={context_lines}");
        let out = self.stdout(ctx, repo, &["diff", &unified]).await?;
        Ok(non_empty_or(&out, "no unstaged changes"))
    }

    /// Returns changes staged for commit.
    ///
    /// # Errors
    ///
    /// Fails if git fails.
    pub async fn diff_staged(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        context_lines: u32,
    ) -> Result<String, ToolError> {
        let unified = format!("--unified={context_lines}");
        let out = self
            .stdout(ctx, repo, &["diff", "--cached", &unified])
            .await?;
        Ok(non_empty_or(&out, "no staged changes"))
    }

    /// Returns the differences between the working tree and `target`.
    ///
    /// # Errors
    ///
    /// Fails if `target` cannot be resolved.
    pub async fn diff(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        target: &str,
        context_lines: u32,
    ) -> Result<String, ToolError> {
        let unified = format!("--unified={context_lines}");
        let out = self
            .stdout(ctx, repo, &["diff", &unified, target, "--"])
            .await?;
        Ok(non_empty_or(&out, "no differences"))
    }

    /// Commits the staged changes.
    ///
    /// # Errors
    ///
    /// Fails if there is nothing to commit.
    pub async fn commit(&self, ctx: &ToolContext, repo: &Path, message: &str) -> Result<String, ToolError> {
        self.run(ctx, repo, &["commit", "-m", message]).await?;
        let hash = self.stdout(ctx, repo, &["rev-parse", "HEAD"]).await?;
        Ok(format!(
            "Changes committed successfully with hash {}",
            hash.trim()
        ))
    }

    /// Stages files. `"."` stages everything.
    ///
    /// # Errors
    ///
    /// Fails if a path does not match any file.
    pub async fn add(&self, ctx: &ToolContext, repo: &Path, files: &[String]) -> Result<String, ToolError> {
        let mut args = vec!["add", "--"];
        args.extend(files.iter().map(String::as_str));
        self.run(ctx, repo, &args).await?;
        Ok("Files staged successfully".to_string())
    }

    /// Unstages all staged changes, keeping the working tree.
    ///
    /// # Errors
    ///
    /// Fails if git fails.
    pub async fn reset(&self, ctx: &ToolContext, repo: &Path) -> Result<String, ToolError> {
        self.run(ctx, repo, &["reset", "--mixed", "--quiet"]).await?;
        Ok("All staged changes reset".to_string())
    }

    /// Returns up to `max_count` commits reachable from HEAD.
    ///
    /// `start` and `end` bound the commit date.
    ///
    /// # Errors
    ///
    /// Fails if a timestamp cannot be parsed or the repository has no commits.
    pub async fn log(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        max_count: usize,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<LogEntry>, ToolError> {
        let max = format!("--max-count={max_count}");
        let since = start
            .map(|ts| parse_timestamp("start_timestamp", ts))
            .transpose()?
            .map(|dt| format!("--since={}", dt.to_rfc3339()));
        let until = end
            .map(|ts| parse_timestamp("end_timestamp", ts))
            .transpose()?
            .map(|dt| format!("--until={}", dt.to_rfc3339()));

        let mut args = vec!["log", max.as_str(), parse::LOG_FORMAT];
        args.extend(since.as_deref());
        args.extend(until.as_deref());

        let out = self.stdout(ctx, repo, &args).await?;
        Ok(parse::parse_log(&out))
    }

    /// Creates `name` at `base`, or at HEAD when no base is given.
    ///
    /// # Errors
    ///
    /// Fails if the branch exists or the base cannot be resolved.
    pub async fn create_branch(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        name: &str,
        base: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut args = vec!["branch", name];
        args.extend(base);
        self.run(ctx, repo, &args).await?;
        Ok(format!(
            "Created branch '{name}' from '{}'",
            base.unwrap_or("HEAD")
        ))
    }

    /// Switches to branch `name`.
    ///
    /// # Errors
    ///
    /// Fails if the branch does not exist or local changes would be lost.
    pub async fn checkout(&self, ctx: &ToolContext, repo: &Path, name: &str) -> Result<String, ToolError> {
        self.run(ctx, repo, &["checkout", name]).await?;
        Ok(format!("Switched to branch '{name}'"))
    }

    /// Shows a commit: header and patch.
    ///
    /// # Errors
    ///
    /// Fails if `revision` cannot be resolved.
    pub async fn show(&self, ctx: &ToolContext, repo: &Path, revision: &str) -> Result<String, ToolError> {
        self.stdout(ctx, repo, &["show", revision, "--"]).await
    }

    /// Lists branches, the current one marked with `* `.
    ///
    /// # Errors
    ///
    /// Fails if a commit filter cannot be resolved.
    pub async fn branch(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        branch_type: BranchType,
        contains: Option<&str>,
        not_contains: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut args = vec!["branch", "--list"];
        match branch_type {
            BranchType::Local => {}
            BranchType::Remote => args.push("--remotes"),
            BranchType::All => args.push("--all"),
        }
        if let Some(sha) = contains {
            args.extend(["--contains", sha]);
        }
        if let Some(sha) = not_contains {
            args.extend(["--no-contains", sha]);
        }

        let out = self.stdout(ctx, repo, &args).await?;
        Ok(out.trim_end().to_string())
    }

    /// Runs a full `git …` command line.
    ///
    /// Returns standard output followed by standard error.
    ///
    /// # Errors
    ///
    /// Fails if the command does not start with `git` or git fails.
    pub async fn raw_command(&self, ctx: &ToolContext, repo: &Path, command: &str) -> Result<String, ToolError> {
        let words = split_command(command)?;
        let Some((first, rest)) = words.split_first() else {
            return Err(ToolError::invalid_argument("command", "is empty"));
        };
        if first != "git" {
            return Err(ToolError::invalid_argument("command", "must start with 'git'"));
        }

        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let output = self.run(ctx, repo, &args).await?;
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    /// Creates `path` if needed and initialises a repository in it.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or git fails.
    pub async fn init(&self, ctx: &ToolContext, path: &Path, bare: bool) -> Result<String, ToolError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| ToolError::Io {
                context: format!("failed to create directory {}", path.display()),
                source,
            })?;

        let mut args = vec!["init", "--quiet"];
        if bare {
            args.push("--bare");
        }
        self.run(ctx, path, &args).await?;

        let kind = if bare { "bare" } else { "regular" };
        Ok(format!(
            "Initialized empty Git repository ({kind}) in {}",
            path.display()
        ))
    }

    /// Pushes to `remote`.
    ///
    /// # Errors
    ///
    /// Fails if the remote does not exist or rejects the push.
    pub async fn push(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        remote: &str,
        refspec: Option<&str>,
        tags: bool,
    ) -> Result<String, ToolError> {
        let mut args = vec!["push", remote];
        args.extend(refspec);
        if tags {
            args.push("--tags");
        }

        let output = self.run(ctx, repo, &args).await?;
        if output.stderr.contains("Everything up-to-date") {
            return Ok("Everything up-to-date".to_string());
        }

        let mut result = format!("Successfully pushed to {remote}");
        if tags {
            result.push_str(" (including tags)");
        }
        if let Some(refspec) = refspec {
            result.push_str(&format!(" with refspec: {refspec}"));
        }
        Ok(result)
    }

    /// Finds git repositories under `search_path`.
    ///
    /// Without `recursive`, only `search_path` itself is checked.
    ///
    /// # Errors
    ///
    /// Fails if the directory walk cannot be run.
    pub async fn list_repositories(
        &self,
        search_path: PathBuf,
        recursive: bool,
    ) -> Result<Vec<PathBuf>, ToolError> {
        if !recursive {
            let found = tokio::fs::metadata(search_path.join(".git")).await.is_ok();
            return Ok(if found { vec![search_path] } else { Vec::new() });
        }

        tokio::task::spawn_blocking(move || {
            let mut found = Vec::new();
            find_repositories(&search_path, &mut found);
            found.sort();
            found
        })
        .await
        .map_err(|e| ToolError::failed(format!("repository search failed: {e}")))
    }

    /// Tags HEAD.
    ///
    /// Annotated tags use `message`, or the tag name when no message is given.
    ///
    /// # Errors
    ///
    /// Fails if the tag exists or HEAD has no commit.
    pub async fn create_tag(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        name: &str,
        message: Option<&str>,
        annotated: bool,
    ) -> Result<String, ToolError> {
        if annotated {
            let message = message.unwrap_or(name);
            self.run(ctx, repo, &["tag", "-a", name, "-m", message]).await?;
        } else {
            self.run(ctx, repo, &["tag", name]).await?;
        }

        let short = self
            .stdout(ctx, repo, &["rev-parse", "--short", "HEAD"])
            .await?;
        let kind = if annotated { "annotated" } else { "lightweight" };
        let mut result = format!("Created {kind} tag '{name}' at {}", short.trim());
        if let Some(message) = message {
            result.push_str(&format!(" with message: {message}"));
        }
        Ok(result)
    }

    /// Deletes tag `name`.
    ///
    /// # Errors
    ///
    /// Fails if the tag does not exist.
    pub async fn delete_tag(&self, ctx: &ToolContext, repo: &Path, name: &str) -> Result<String, ToolError> {
        let reference = format!("refs/tags/{name}");
        self.run(ctx, repo, &["rev-parse", "--verify", "--quiet", &reference])
            .await
            .map_err(|e| match e {
                ToolError::Git { .. } => ToolError::failed(format!("tag '{name}' not found")),
                other => other,
            })?;

        self.run(ctx, repo, &["tag", "--delete", name]).await?;
        Ok(format!("Deleted tag '{name}'"))
    }

    /// Lists tags, optionally filtered by a glob pattern.
    ///
    /// # Errors
    ///
    /// Fails if `pattern` is not a valid glob.
    pub async fn list_tags(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        pattern: Option<&str>,
    ) -> Result<Vec<String>, ToolError> {
        let pattern = pattern
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| ToolError::invalid_argument("pattern", format!("is not a valid glob: {e}")))?;

        let out = self.stdout(ctx, repo, &["tag", "--list"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .filter(|tag| pattern.as_ref().map_or(true, |p| p.matches(tag)))
            .map(str::to_string)
            .collect())
    }

    /// Pushes one tag, or all tags when `tag` is `None`.
    ///
    /// # Errors
    ///
    /// Fails if the remote does not exist or rejects the push.
    pub async fn push_tags(
        &self,
        ctx: &ToolContext,
        repo: &Path,
        remote: &str,
        tag: Option<&str>,
    ) -> Result<String, ToolError> {
        let (refspec, message) = match tag {
            Some(tag) => (
                format!("refs/tags/{tag}:refs/tags/{tag}"),
                format!("Pushed tag '{tag}' to {remote}"),
            ),
            None => (
                "refs/tags/*:refs/tags/*".to_string(),
                format!("Pushed all tags to {remote}"),
            ),
        };

        let output = self.run(ctx, repo, &["push", remote, &refspec]).await?;
        if output.stderr.contains("Everything up-to-date") {
            return Ok("Everything up-to-date".to_string());
        }
        Ok(message)
    }
}

fn non_empty_or(out: &str, empty: &str) -> String {
    let out = out.trim_end();
    if out.is_empty() {
        empty.to_string()
    } else {
        out.to_string()
    }
}

/// Collects every directory under `dir` that contains a `.git` entry.
///
/// Does not descend into `.git` directories or follow symlinks.
fn find_repositories(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        if entry.file_name() == ".git" {
            found.push(dir.to_path_buf());
            continue;
        }
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            find_repositories(&entry.path(), found);
        }
    }
}
