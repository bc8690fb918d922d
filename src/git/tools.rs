//! Git tools exposed over MCP.
//!
//! Each [`GitTool`] supplies its descriptor (name, description, input schema)
//! and is bound to a [`GitToolHandler`] that extracts arguments and formats
//! the text result.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::git::{
    BranchType, GitOperations, DEFAULT_CONTEXT_LINES, DEFAULT_LOG_COUNT, DEFAULT_REMOTE,
};
use crate::mcp::protocol::ToolDescriptor;
use crate::mcp::server::McpServer;
use crate::mcp::tool::{Arguments, ToolContent, ToolContext, ToolHandler};

/// The git tools, in the order they are listed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitTool {
    /// `git_status`
    Status,
    /// `git_diff_unstaged`
    DiffUnstaged,
    /// `git_diff_staged`
    DiffStaged,
    /// `git_diff`
    Diff,
    /// `git_commit`
    Commit,
    /// `git_add`
    Add,
    /// `git_reset`
    Reset,
    /// `git_log`
    Log,
    /// `git_create_branch`
    CreateBranch,
    /// `git_checkout`
    Checkout,
    /// `git_show`
    Show,
    /// `git_branch`
    Branch,
    /// `git_raw_command`
    RawCommand,
    /// `git_init`
    Init,
    /// `git_push`
    Push,
    /// `git_list_repositories`
    ListRepositories,
    /// `git_create_tag`
    CreateTag,
    /// `git_delete_tag`
    DeleteTag,
    /// `git_list_tags`
    ListTags,
    /// `git_push_tags`
    PushTags,
}

impl GitTool {
    /// Every git tool, in listing order.
    pub const ALL: [Self; 20] = [
        Self::Status,
        Self::DiffUnstaged,
        Self::DiffStaged,
        Self::Diff,
        Self::Commit,
        Self::Add,
        Self::Reset,
        Self::Log,
        Self::CreateBranch,
        Self::Checkout,
        Self::Show,
        Self::Branch,
        Self::RawCommand,
        Self::Init,
        Self::Push,
        Self::ListRepositories,
        Self::CreateTag,
        Self::DeleteTag,
        Self::ListTags,
        Self::PushTags,
    ];

    /// Returns the tool name clients call.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Status => "git_status",
            Self::DiffUnstaged => "git_diff_unstaged",
            Self::DiffStaged => "git_diff_staged",
            Self::Diff => "git_diff",
            Self::Commit => "git_commit",
            Self::Add => "git_add",
            Self::Reset => "git_reset",
            Self::Log => "git_log",
            Self::CreateBranch => "git_create_branch",
            Self::Checkout => "git_checkout",
            Self::Show => "git_show",
            Self::Branch => "git_branch",
            Self::RawCommand => "git_raw_command",
            Self::Init => "git_init",
            Self::Push => "git_push",
            Self::ListRepositories => "git_list_repositories",
            Self::CreateTag => "git_create_tag",
            Self::DeleteTag => "git_delete_tag",
            Self::ListTags => "git_list_tags",
            Self::PushTags => "git_push_tags",
        }
    }

    /// Looks a tool up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Status => "Shows the working tree status",
            Self::DiffUnstaged => "Shows changes in working directory not yet staged",
            Self::DiffStaged => "Shows changes that are staged for commit",
            Self::Diff => "Shows differences between branches or commits",
            Self::Commit => "Records changes to the repository",
            Self::Add => "Adds file contents to the staging area",
            Self::Reset => "Unstages all staged changes",
            Self::Log => "Shows the commit logs with optional date filtering",
            Self::CreateBranch => "Creates a new branch",
            Self::Checkout => "Switches branches",
            Self::Show => "Shows the contents of a commit",
            Self::Branch => "List Git branches",
            Self::RawCommand => {
                "Execute a raw Git command directly (bypasses shell wrapping issues)"
            }
            Self::Init => "Initialize a new Git repository",
            Self::Push => "Push changes to remote repository",
            Self::ListRepositories => "List Git repositories in a directory",
            Self::CreateTag => "Create a new Git tag",
            Self::DeleteTag => "Delete a Git tag",
            Self::ListTags => "List Git tags",
            Self::PushTags => "Push tags to remote repository",
        }
    }

    /// Schema title, e.g. `GitCreateBranch`.
    fn title(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect()
    }

    /// Returns the JSON schema for this tool's arguments.
    #[allow(clippy::too_many_lines)]
    fn input_schema(self) -> Value {
        let repo_path = json!({
            "type": "string",
            "description": "Path to Git repository"
        });
        let context_lines = json!({
            "type": "integer",
            "description": "Number of context lines to show",
            "default": DEFAULT_CONTEXT_LINES
        });
        let remote = json!({
            "type": "string",
            "description": "Remote name (default: origin)",
            "default": DEFAULT_REMOTE
        });

        let (properties, required): (Value, &[&str]) = match self {
            Self::Status | Self::Reset => (json!({ "repo_path": repo_path }), &["repo_path"]),
            Self::DiffUnstaged | Self::DiffStaged => (
                json!({ "repo_path": repo_path, "context_lines": context_lines }),
                &["repo_path"],
            ),
            Self::Diff => (
                json!({
                    "repo_path": repo_path,
                    "target": {
                        "type": "string",
                        "description": "Target branch or commit to compare with"
                    },
                    "context_lines": context_lines
                }),
                &["repo_path", "target"],
            ),
            Self::Commit => (
                json!({
                    "repo_path": repo_path,
                    "message": { "type": "string", "description": "Commit message" }
                }),
                &["repo_path", "message"],
            ),
            Self::Add => (
                json!({
                    "repo_path": repo_path,
                    "files": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Array of file paths to stage"
                    }
                }),
                &["repo_path", "files"],
            ),
            Self::Log => (
                json!({
                    "repo_path": repo_path,
                    "max_count": {
                        "type": "integer",
                        "description": "Maximum number of commits to show",
                        "default": DEFAULT_LOG_COUNT
                    },
                    "start_timestamp": {
                        "type": "string",
                        "description": "Start timestamp for filtering commits"
                    },
                    "end_timestamp": {
                        "type": "string",
                        "description": "End timestamp for filtering commits"
                    }
                }),
                &["repo_path"],
            ),
            Self::CreateBranch => (
                json!({
                    "repo_path": repo_path,
                    "branch_name": { "type": "string", "description": "Name of the new branch" },
                    "base_branch": {
                        "type": "string",
                        "description": "Base branch to create from (defaults to current branch)"
                    }
                }),
                &["repo_path", "branch_name"],
            ),
            Self::Checkout => (
                json!({
                    "repo_path": repo_path,
                    "branch_name": { "type": "string", "description": "Name of branch to checkout" }
                }),
                &["repo_path", "branch_name"],
            ),
            Self::Show => (
                json!({
                    "repo_path": repo_path,
                    "revision": {
                        "type": "string",
                        "description": "The revision (commit hash, branch name, tag) to show"
                    }
                }),
                &["repo_path", "revision"],
            ),
            Self::Branch => (
                json!({
                    "repo_path": repo_path,
                    "branch_type": {
                        "type": "string",
                        "description": "Whether to list local branches ('local'), remote branches ('remote') or all branches('all')",
                        "enum": ["local", "remote", "all"],
                        "default": "local"
                    },
                    "contains": {
                        "type": "string",
                        "description": "The commit sha that branch should contain"
                    },
                    "not_contains": {
                        "type": "string",
                        "description": "The commit sha that branch should NOT contain"
                    }
                }),
                &["repo_path"],
            ),
            Self::RawCommand => (
                json!({
                    "repo_path": repo_path,
                    "command": {
                        "type": "string",
                        "description": "Raw Git command to execute (e.g., 'git tag -a v0.0.1 -m \"Release v0.0.1\"')"
                    }
                }),
                &["repo_path", "command"],
            ),
            Self::Init => (
                json!({
                    "repo_path": {
                        "type": "string",
                        "description": "Path where to initialize the repository"
                    },
                    "bare": {
                        "type": "boolean",
                        "description": "Initialize as bare repository",
                        "default": false
                    }
                }),
                &["repo_path"],
            ),
            Self::Push => (
                json!({
                    "repo_path": repo_path,
                    "remote": remote,
                    "refspec": {
                        "type": "string",
                        "description": "Refspec to push (e.g., 'refs/heads/main:refs/heads/main')"
                    },
                    "tags": {
                        "type": "boolean",
                        "description": "Push tags along with commits",
                        "default": false
                    }
                }),
                &["repo_path"],
            ),
            Self::ListRepositories => (
                json!({
                    "search_path": {
                        "type": "string",
                        "description": "Path to search for repositories (default: current directory)"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Search recursively in subdirectories",
                        "default": false
                    }
                }),
                &[],
            ),
            Self::CreateTag => (
                json!({
                    "repo_path": repo_path,
                    "tag_name": { "type": "string", "description": "Name of the tag to create" },
                    "message": {
                        "type": "string",
                        "description": "Tag message (for annotated tags)"
                    },
                    "annotated": {
                        "type": "boolean",
                        "description": "Create annotated tag (default: true)",
                        "default": true
                    }
                }),
                &["repo_path", "tag_name"],
            ),
            Self::DeleteTag => (
                json!({
                    "repo_path": repo_path,
                    "tag_name": { "type": "string", "description": "Name of the tag to delete" }
                }),
                &["repo_path", "tag_name"],
            ),
            Self::ListTags => (
                json!({
                    "repo_path": repo_path,
                    "pattern": {
                        "type": "string",
                        "description": "Pattern to filter tags (glob pattern)"
                    }
                }),
                &["repo_path"],
            ),
            Self::PushTags => (
                json!({
                    "repo_path": repo_path,
                    "remote": remote,
                    "tag_name": {
                        "type": "string",
                        "description": "Specific tag name to push (leave empty to push all tags)"
                    }
                }),
                &["repo_path"],
            ),
        };

        let mut schema = Map::new();
        schema.insert(
            "$schema".to_string(),
            json!("http://json-schema.org/draft-07/schema#"),
        );
        schema.insert("title".to_string(), json!(self.title()));
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), properties);
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        Value::Object(schema)
    }

    /// Returns the descriptor advertised in `tools/list`.
    #[must_use]
    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description(), self.input_schema())
    }
}

/// State shared by every git tool handler.
#[derive(Debug)]
struct GitToolState {
    git: GitOperations,
    default_repository: Option<PathBuf>,
}

impl GitToolState {
    /// Resolves `repo_path`: the argument, else the configured repository, else the working directory.
    fn repo_path(&self, args: &Arguments) -> Result<PathBuf, ToolError> {
        if let Some(path) = args.str("repo_path") {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = &self.default_repository {
            return Ok(path.clone());
        }
        current_dir()
    }
}

fn current_dir() -> Result<PathBuf, ToolError> {
    std::env::current_dir().map_err(|source| ToolError::Io {
        context: "failed to get current directory".to_string(),
        source,
    })
}

fn context_lines(args: &Arguments) -> u32 {
    u32::try_from(args.int_or("context_lines", i64::from(DEFAULT_CONTEXT_LINES)))
        .unwrap_or(DEFAULT_CONTEXT_LINES)
}

fn bulleted(header: &str, items: impl IntoIterator<Item = String>) -> String {
    let mut text = header.to_string();
    for item in items {
        text.push_str("\n- ");
        text.push_str(&item);
    }
    text
}

/// Handler bound to one git tool.
#[derive(Debug)]
pub struct GitToolHandler {
    tool: GitTool,
    state: Arc<GitToolState>,
}

impl GitToolHandler {
    async fn run(&self, ctx: &ToolContext, args: &Arguments) -> Result<String, ToolError> {
        let git = &self.state.git;

        match self.tool {
            GitTool::Status => {
                let repo = self.state.repo_path(args)?;
                let status = git.status(ctx, &repo).await?;
                Ok(format!("Repository status:\n{status}"))
            }
            GitTool::DiffUnstaged => {
                let repo = self.state.repo_path(args)?;
                let diff = git.diff_unstaged(ctx, &repo, context_lines(args)).await?;
                Ok(format!("Unstaged changes:\n{diff}"))
            }
            GitTool::DiffStaged => {
                let repo = self.state.repo_path(args)?;
                let diff = git.diff_staged(ctx, &repo, context_lines(args)).await?;
                Ok(format!("Staged changes:\n{diff}"))
            }
            GitTool::Diff => {
                let repo = self.state.repo_path(args)?;
                let target = args.required_str("target")?;
                let diff = git.diff(ctx, &repo, target, context_lines(args)).await?;
                Ok(format!("Diff with {target}:\n{diff}"))
            }
            GitTool::Commit => {
                let repo = self.state.repo_path(args)?;
                let message = args.required_str("message")?;
                git.commit(ctx, &repo, message).await
            }
            GitTool::Add => {
                let repo = self.state.repo_path(args)?;
                let files = args.string_list("files");
                if files.is_empty() {
                    return Err(ToolError::invalid_argument(
                        "files",
                        "must list at least one path",
                    ));
                }
                git.add(ctx, &repo, &files).await
            }
            GitTool::Reset => {
                let repo = self.state.repo_path(args)?;
                git.reset(ctx, &repo).await
            }
            GitTool::Log => {
                let repo = self.state.repo_path(args)?;
                let max_count =
                    usize::try_from(args.int_or("max_count", -1)).unwrap_or(DEFAULT_LOG_COUNT);
                let entries = git
                    .log(
                        ctx,
                        &repo,
                        max_count,
                        args.str("start_timestamp"),
                        args.str("end_timestamp"),
                    )
                    .await?;
                let mut text = "Commit history:\n".to_string();
                for entry in entries {
                    text.push_str(&entry.to_string());
                    text.push('\n');
                }
                Ok(text)
            }
            GitTool::CreateBranch => {
                let repo = self.state.repo_path(args)?;
                let name = args.required_str("branch_name")?;
                git.create_branch(ctx, &repo, name, args.str("base_branch"))
                    .await
            }
            GitTool::Checkout => {
                let repo = self.state.repo_path(args)?;
                let name = args.required_str("branch_name")?;
                git.checkout(ctx, &repo, name).await
            }
            GitTool::Show => {
                let repo = self.state.repo_path(args)?;
                let revision = args.required_str("revision")?;
                git.show(ctx, &repo, revision).await
            }
            GitTool::Branch => {
                let repo = self.state.repo_path(args)?;
                let branch_type: BranchType = args.str("branch_type").unwrap_or("local").parse()?;
                git.branch(
                    ctx,
                    &repo,
                    branch_type,
                    args.str("contains"),
                    args.str("not_contains"),
                )
                .await
            }
            GitTool::RawCommand => {
                let repo = self.state.repo_path(args)?;
                let command = args.required_str("command")?;
                git.raw_command(ctx, &repo, command).await
            }
            GitTool::Init => {
                let path = PathBuf::from(args.required_str("repo_path")?);
                git.init(ctx, &path, args.bool_or("bare", false)).await
            }
            GitTool::Push => {
                let repo = self.state.repo_path(args)?;
                let remote = args.string_or("remote", DEFAULT_REMOTE);
                git.push(
                    ctx,
                    &repo,
                    &remote,
                    args.str("refspec"),
                    args.bool_or("tags", false),
                )
                .await
            }
            GitTool::ListRepositories => {
                let search_path = match args.str("search_path") {
                    Some(path) => PathBuf::from(path),
                    None => current_dir()?,
                };
                let repositories = git
                    .list_repositories(search_path, args.bool_or("recursive", false))
                    .await?;
                if repositories.is_empty() {
                    return Ok("No Git repositories found".to_string());
                }
                Ok(bulleted(
                    "Found Git repositories:",
                    repositories.iter().map(|p| p.display().to_string()),
                ))
            }
            GitTool::CreateTag => {
                let repo = self.state.repo_path(args)?;
                let name = args.required_str("tag_name")?;
                git.create_tag(
                    ctx,
                    &repo,
                    name,
                    args.str("message"),
                    args.bool_or("annotated", true),
                )
                .await
            }
            GitTool::DeleteTag => {
                let repo = self.state.repo_path(args)?;
                let name = args.required_str("tag_name")?;
                git.delete_tag(ctx, &repo, name).await
            }
            GitTool::ListTags => {
                let repo = self.state.repo_path(args)?;
                let tags = git.list_tags(ctx, &repo, args.str("pattern")).await?;
                if tags.is_empty() {
                    return Ok("No tags found".to_string());
                }
                Ok(bulleted("Tags:", tags))
            }
            GitTool::PushTags => {
                let repo = self.state.repo_path(args)?;
                let remote = args.string_or("remote", DEFAULT_REMOTE);
                git.push_tags(ctx, &repo, &remote, args.str("tag_name"))
                    .await
            }
        }
    }
}

#[async_trait]
impl ToolHandler for GitToolHandler {
    async fn call(
        &self,
        ctx: &ToolContext,
        args: &Arguments,
    ) -> Result<Vec<ToolContent>, ToolError> {
        let text = self.run(ctx, args).await?;
        Ok(vec![ToolContent::text(text)])
    }
}

/// Registers every git tool on `server`.
///
/// Tools without a `repo_path` argument operate on `default_repository`, or on
/// the working directory when that is `None`.
pub fn register_tools(
    server: &mut McpServer,
    git: GitOperations,
    default_repository: Option<PathBuf>,
) {
    let state = Arc::new(GitToolState {
        git,
        default_repository,
    });

    for tool in GitTool::ALL {
        let handler = GitToolHandler {
            tool,
            state: Arc::clone(&state),
        };
        server.register_tool(tool.descriptor(), Arc::new(handler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::ServerInfo;

    #[test]
    fn names_are_unique_and_round_trip() {
        for tool in GitTool::ALL {
            assert_eq!(GitTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(GitTool::from_name("git_teleport"), None);
    }

    #[test]
    fn descriptors_are_valid_schemas() {
        for tool in GitTool::ALL {
            let descriptor = tool.descriptor();
            assert!(descriptor.name.starts_with("git_"));
            assert!(!descriptor.description.is_empty());

            let schema = &descriptor.input_schema;
            assert_eq!(schema["type"], "object");
            assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
            assert!(schema["properties"].is_object());

            if let Some(required) = schema["required"].as_array() {
                for field in required {
                    let field = field.as_str().unwrap();
                    assert!(
                        schema["properties"].get(field).is_some(),
                        "{}: required field {field} has no property",
                        descriptor.name
                    );
                }
            }
        }
    }

    #[test]
    fn schema_titles() {
        assert_eq!(GitTool::CreateBranch.descriptor().input_schema["title"], "GitCreateBranch");
        assert_eq!(GitTool::Status.descriptor().input_schema["title"], "GitStatus");
    }

    #[test]
    fn list_repositories_has_no_required_fields() {
        let schema = GitTool::ListRepositories.descriptor().input_schema;
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn register_tools_in_order() {
        let mut server = McpServer::new(ServerInfo::default());
        register_tools(&mut server, GitOperations::default(), None);

        let names: Vec<_> = server.registry().list().into_iter().map(|t| t.name).collect();
        let expected: Vec<_> = GitTool::ALL.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn repo_path_resolution() {
        let state = GitToolState {
            git: GitOperations::default(),
            default_repository: Some(PathBuf::from("/configured")),
        };

        let explicit: Arguments = serde_json::from_value(json!({"repo_path": "/explicit"})).unwrap();
        assert_eq!(state.repo_path(&explicit).unwrap(), PathBuf::from("/explicit"));

        let empty: Arguments = serde_json::from_value(json!({"repo_path": ""})).unwrap();
        assert_eq!(state.repo_path(&empty).unwrap(), PathBuf::from("/configured"));

        let fallback = GitToolState {
            git: GitOperations::default(),
            default_repository: None,
        };
        assert_eq!(
            fallback.repo_path(&Arguments::new()).unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn context_lines_defaults_on_negative() {
        let args: Arguments = serde_json::from_value(json!({"context_lines": -2})).unwrap();
        assert_eq!(context_lines(&args), DEFAULT_CONTEXT_LINES);
        let args: Arguments = serde_json::from_value(json!({"context_lines": 0})).unwrap();
        assert_eq!(context_lines(&args), 0);
    }

    #[test]
    fn bulleted_list() {
        assert_eq!(
            bulleted("Tags:", vec!["v1".to_string(), "v2".to_string()]),
            "Tags:\n- v1\n- v2"
        );
    }
}
