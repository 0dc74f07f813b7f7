//! CLI Tooling
//!
//! Command-line interface over a saved file system. Each invocation loads the
//! snapshot, applies at most one transition through a [`Session`] and saves the
//! new version only when that transition commits.

use crate::alloc::AllocationMethod;
use crate::config::{BlockfsConfig, ConfigLoader};
use crate::engine::{CreateRequest, FileSystem, Operation, Session};
use crate::error::FsError;
use crate::logging::LoggingConfig;
use crate::store::persistence::{open_repository, StateRepository};
use crate::tooling::format::{
    format_batch_report, format_file_details, format_listing, format_section_heading,
    format_size, format_usage, format_validation, ListingEntry,
};
use crate::tree::Node;
use crate::types::NodeId;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;

/// blockfs - simulated block-allocated file system
#[derive(Parser, Debug)]
#[command(name = "blockfs")]
#[command(about = "Simulated file system with contiguous, linked and indexed block allocation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State location (overrides storage.path)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings with command-line overrides applied on top of `base`.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
            config.output = "stderr".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a fresh, empty file system
    Init {
        /// Number of blocks on the disk
        #[arg(long)]
        disk_size: Option<u32>,
        /// Bytes per block
        #[arg(long)]
        block_size: Option<u32>,
        /// Replace an existing file system
        #[arg(long)]
        force: bool,
    },
    /// Create a folder
    Mkdir { path: String },
    /// Create a file
    Create {
        path: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Replace the content of a file
    Write {
        path: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Rename a file or folder in place
    Rename { path: String, new_name: String },
    /// Delete a file, or a folder with everything below it
    Rm {
        path: String,
        /// Skip confirmation for non-empty folders
        #[arg(long, short)]
        yes: bool,
    },
    /// List a folder, folders first
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file's content
    Cat { path: String },
    /// Show details and block layout
    Stat { path: String },
    /// Copy local files into a folder, keeping every file that fits
    Import {
        folder: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Allocation method: contiguous, linked or indexed
        #[arg(long)]
        method: Option<AllocationMethod>,
    },
    /// Show disk usage
    Usage,
    /// Check the saved state against every invariant
    Validate {
        /// Repair what can be repaired and save the result
        #[arg(long)]
        repair: bool,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ContentArgs {
    /// Inline content
    #[arg(long, conflicts_with = "from_file")]
    pub content: Option<String>,

    /// Read content from a local file
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Allocation method: contiguous, linked or indexed
    #[arg(long)]
    pub method: Option<AllocationMethod>,
}

impl ContentArgs {
    fn read(&self) -> Result<Option<Vec<u8>>, FsError> {
        if let Some(text) = &self.content {
            return Ok(Some(text.clone().into_bytes()));
        }
        match &self.from_file {
            Some(path) => Ok(Some(std::fs::read(path)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self, FsError> {
        match raw {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(FsError::InvalidOperation(format!(
                "Invalid output format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

/// CLI context: loaded configuration plus the repository holding the state.
pub struct CliContext {
    config: BlockfsConfig,
    repository: Box<dyn StateRepository>,
    format: OutputFormat,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        state_path: Option<PathBuf>,
    ) -> Result<Self, FsError> {
        let mut config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        if state_path.is_some() {
            config.storage.path = state_path;
        }
        let repository = open_repository(&config.storage, &workspace_root)?;
        Ok(Self {
            config,
            repository,
            format: OutputFormat::Text,
        })
    }

    /// Select text or json output.
    pub fn with_output_format(mut self, format: &str) -> Result<Self, FsError> {
        self.format = OutputFormat::parse(format)?;
        Ok(self)
    }

    pub fn config(&self) -> &BlockfsConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, FsError> {
        match command {
            Commands::Init {
                disk_size,
                block_size,
                force,
            } => self.handle_init(*disk_size, *block_size, *force),
            Commands::Mkdir { path } => self.handle_mkdir(path),
            Commands::Create { path, content } => self.handle_create(path, content),
            Commands::Write { path, content } => self.handle_write(path, content),
            Commands::Rename { path, new_name } => self.handle_rename(path, new_name),
            Commands::Rm { path, yes } => self.handle_rm(path, *yes),
            Commands::Ls { path } => self.handle_ls(path),
            Commands::Cat { path } => self.handle_cat(path),
            Commands::Stat { path } => self.handle_stat(path),
            Commands::Import {
                folder,
                files,
                method,
            } => self.handle_import(folder, files, *method),
            Commands::Usage => self.handle_usage(),
            Commands::Validate { repair } => self.handle_validate(*repair),
            Commands::Config => self.handle_config(),
        }
    }

    /// Saved state, or a fresh one from config when nothing has been saved.
    fn load_state(&self) -> Result<FileSystem, FsError> {
        match self.repository.load()? {
            Some(snapshot) => FileSystem::from_snapshot(snapshot),
            None => FileSystem::from_config(&self.config.disk),
        }
    }

    fn save_state(&self, state: &FileSystem) -> Result<(), FsError> {
        self.repository.save(&state.to_snapshot())
    }

    /// Apply one operation and persist the new version if it commits.
    fn commit(
        &self,
        state: FileSystem,
        op: &Operation,
    ) -> Result<(FileSystem, Option<NodeId>), FsError> {
        let mut session = Session::new(state);
        let created = session.apply(op)?;
        self.save_state(session.state())?;
        Ok((session.into_state(), created))
    }

    fn render_json(&self, value: serde_json::Value) -> Result<String, FsError> {
        serde_json::to_string_pretty(&value).map_err(FsError::from)
    }

    fn handle_init(
        &self,
        disk_size: Option<u32>,
        block_size: Option<u32>,
        force: bool,
    ) -> Result<String, FsError> {
        if !force && self.repository.load()?.is_some() {
            return Err(FsError::InvalidOperation(format!(
                "a file system already exists at {} (use --force to replace it)",
                self.repository.location().display()
            )));
        }
        let mut disk = self.config.disk.clone();
        if let Some(size) = disk_size {
            disk.disk_size = size;
        }
        if let Some(size) = block_size {
            disk.block_size = size;
        }
        disk.validate()?;
        let state = FileSystem::from_config(&disk)?;
        self.save_state(&state)?;
        info!(
            location = %self.repository.location().display(),
            disk_size = disk.disk_size,
            block_size = disk.block_size,
            "initialized file system"
        );

        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "location": self.repository.location(),
                "disk_size": disk.disk_size,
                "block_size": disk.block_size,
            })),
            OutputFormat::Text => Ok(format!(
                "Initialized file system at {}: {} blocks of {}",
                self.repository.location().display(),
                disk.disk_size,
                format_size(u64::from(disk.block_size))
            )),
        }
    }

    fn handle_mkdir(&self, path: &str) -> Result<String, FsError> {
        let state = self.load_state()?;
        let (parent, name) = split_parent(path)?;
        let parent = state.resolve_path(parent)?;
        let op = Operation::Create(CreateRequest::folder(parent, name));
        let (state, created) = self.commit(state, &op)?;
        let id = created_id(created)?;
        self.report_created(&state, id, "folder")
    }

    fn handle_create(&self, path: &str, args: &ContentArgs) -> Result<String, FsError> {
        let state = self.load_state()?;
        let (parent, name) = split_parent(path)?;
        let parent = state.resolve_path(parent)?;
        let content = args.read()?.unwrap_or_default();
        let method = args.method.unwrap_or(self.config.disk.default_allocation);
        let op = Operation::Create(CreateRequest::file(parent, name, content).with_method(method));
        let (state, created) = self.commit(state, &op)?;
        let id = created_id(created)?;
        self.report_created(&state, id, "file")
    }

    fn report_created(&self, state: &FileSystem, id: NodeId, kind: &str) -> Result<String, FsError> {
        let path = state.path_string(id)?;
        let node = state.node(id)?;
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "id": id,
                "path": path,
                "kind": kind,
                "entry": listing_entry(node),
            })),
            OutputFormat::Text => match node.as_file() {
                Some(file) => Ok(format!(
                    "Created {} {} ({} in {} block(s), {})",
                    kind,
                    path,
                    format_size(file.size),
                    file.blocks.len(),
                    file.allocation_method
                )),
                None => Ok(format!("Created {} {}", kind, path)),
            },
        }
    }

    fn handle_write(&self, path: &str, args: &ContentArgs) -> Result<String, FsError> {
        let state = self.load_state()?;
        let node = state.resolve_path(path)?;
        let content = args.read()?.ok_or_else(|| {
            FsError::InvalidOperation("write needs --content or --from-file".to_string())
        })?;
        let op = Operation::UpdateContent {
            node,
            content,
            allocation_method: args.method,
        };
        let (state, _) = self.commit(state, &op)?;
        let details = state.file_details(node)?;
        match self.format {
            OutputFormat::Json => self.render_json(serde_json::to_value(&details)?),
            OutputFormat::Text => Ok(format!(
                "Wrote {} ({} in {} block(s), {})",
                details.path,
                format_size(details.size),
                details.blocks.len(),
                details.allocation_method
            )),
        }
    }

    fn handle_rename(&self, path: &str, new_name: &str) -> Result<String, FsError> {
        let state = self.load_state()?;
        let node = state.resolve_path(path)?;
        let old_path = state.path_string(node)?;
        let op = Operation::Rename {
            node,
            name: new_name.to_string(),
        };
        let (state, _) = self.commit(state, &op)?;
        let new_path = state.path_string(node)?;
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "id": node,
                "from": old_path,
                "to": new_path,
            })),
            OutputFormat::Text => Ok(format!("Renamed {} to {}", old_path, new_path)),
        }
    }

    fn handle_rm(&self, path: &str, yes: bool) -> Result<String, FsError> {
        let state = self.load_state()?;
        let node = state.resolve_path(path)?;
        let target = state.node(node)?;
        let summary = state.subtree_summary(node)?;
        let path = state.path_string(node)?;

        let non_empty = target.children().next().is_some();
        if non_empty && !yes {
            if !std::io::stdin().is_terminal() {
                return Err(FsError::InvalidOperation(format!(
                    "folder {} is not empty (pass --yes to delete it with its contents)",
                    path
                )));
            }
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Delete folder '{}' and the {} item(s) inside it?",
                    path,
                    summary.nodes - 1
                ))
                .default(false)
                .interact()
                .map_err(|e| {
                    FsError::InvalidOperation(format!("Failed to get user input: {}", e))
                })?;
            if !confirmed {
                return Ok("Deletion cancelled".to_string());
            }
        }

        self.commit(state, &Operation::Delete { node })?;
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "path": path,
                "removed_nodes": summary.nodes,
                "freed_blocks": summary.blocks,
            })),
            OutputFormat::Text => Ok(format!(
                "Deleted {} ({} node(s), {} block(s) freed)",
                path, summary.nodes, summary.blocks
            )),
        }
    }

    fn handle_ls(&self, path: &str) -> Result<String, FsError> {
        let state = self.load_state()?;
        let id = state.resolve_path(path)?;
        let node = state.node(id)?;
        let entries: Vec<ListingEntry> = if node.is_folder() {
            state
                .children_sorted(id)?
                .into_iter()
                .map(listing_entry)
                .collect()
        } else {
            vec![listing_entry(node)]
        };
        match self.format {
            OutputFormat::Json => self.render_json(serde_json::to_value(&entries)?),
            OutputFormat::Text => Ok(format_listing(&state.path_string(id)?, &entries)),
        }
    }

    fn handle_cat(&self, path: &str) -> Result<String, FsError> {
        let state = self.load_state()?;
        let id = state.resolve_path(path)?;
        let file = state.node(id)?.as_file().ok_or_else(|| {
            FsError::InvalidOperation(format!("{} is a folder", path))
        })?;
        let text = file.content_text().into_owned();
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "path": state.path_string(id)?,
                "size": file.size,
                "content": text,
            })),
            OutputFormat::Text => Ok(text),
        }
    }

    fn handle_stat(&self, path: &str) -> Result<String, FsError> {
        let state = self.load_state()?;
        let id = state.resolve_path(path)?;
        let node = state.node(id)?;

        if node.is_folder() {
            let summary = state.subtree_summary(id)?;
            let path = state.path_string(id)?;
            return match self.format {
                OutputFormat::Json => self.render_json(json!({
                    "id": id,
                    "path": path,
                    "kind": "folder",
                    "summary": summary,
                    "created_at": node.created_at,
                    "modified_at": node.modified_at,
                })),
                OutputFormat::Text => Ok(format!(
                    "{}\n\n  Id: {}\n  Nodes below: {}\n  Files: {}\n  Blocks: {}\n  Modified: {}\n",
                    format_section_heading(&path),
                    id,
                    summary.nodes - 1,
                    summary.files,
                    summary.blocks,
                    node.modified_at.to_rfc3339()
                )),
            };
        }

        let details = state.file_details(id)?;
        let block_map = state.block_map(id)?;
        let chain = match details.allocation_method {
            AllocationMethod::Linked => Some(state.linked_chain(id)?),
            _ => None,
        };
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "details": details,
                "block_map": block_map,
                "chain": chain,
            })),
            OutputFormat::Text => Ok(format_file_details(&details, &block_map, chain.as_deref())),
        }
    }

    fn handle_import(
        &self,
        folder: &str,
        files: &[PathBuf],
        method: Option<AllocationMethod>,
    ) -> Result<String, FsError> {
        let state = self.load_state()?;
        let parent = state.resolve_path(folder)?;
        let method = method.unwrap_or(self.config.disk.default_allocation);

        let mut names = Vec::with_capacity(files.len());
        let mut ops = Vec::with_capacity(files.len());
        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    FsError::InvalidOperation(format!("{} has no file name", file.display()))
                })?;
            let content = std::fs::read(file)?;
            ops.push(Operation::Create(
                CreateRequest::file(parent, name.clone(), content).with_method(method),
            ));
            names.push(name);
        }

        let mut session = Session::new(state);
        let report = session.apply_batch(&ops);
        if !report.accepted.is_empty() {
            self.save_state(session.state())?;
        }
        match self.format {
            OutputFormat::Json => self.render_json(serde_json::to_value(&report)?),
            OutputFormat::Text => Ok(format_batch_report(&report, &names)),
        }
    }

    fn handle_usage(&self) -> Result<String, FsError> {
        let state = self.load_state()?;
        let usage = state.disk_usage();
        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "usage": usage,
                "block_size": state.disk().block_size(),
                "nearly_full": usage.is_nearly_full(),
            })),
            OutputFormat::Text => Ok(format_usage(&usage, state.disk().block_size())),
        }
    }

    fn handle_validate(&self, repair: bool) -> Result<String, FsError> {
        let snapshot = match self.repository.load()? {
            Some(snapshot) => snapshot,
            None => {
                return Ok(format!(
                    "No saved file system at {}",
                    self.repository.location().display()
                ))
            }
        };

        let (report, repairs) = if repair {
            let (state, repairs) = FileSystem::from_snapshot_repaired(snapshot)?;
            if !repairs.is_clean() {
                self.save_state(&state)?;
            }
            (state.check_invariants(), Some(repairs))
        } else {
            (FileSystem::check_snapshot(snapshot)?, None)
        };

        match self.format {
            OutputFormat::Json => self.render_json(json!({
                "valid": report.is_valid(),
                "report": report,
                "repairs": repairs,
            })),
            OutputFormat::Text => Ok(format_validation(&report, repairs.as_ref())),
        }
    }

    fn handle_config(&self) -> Result<String, FsError> {
        match self.format {
            OutputFormat::Json => self.render_json(serde_json::to_value(&self.config)?),
            OutputFormat::Text => self.config.to_toml(),
        }
    }
}

/// Split `a/b/c` into the parent path `a/b` and the final name `c`.
fn split_parent(path: &str) -> Result<(&str, &str), FsError> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() {
        return Err(FsError::InvalidOperation(
            "path must name an entry below the root".to_string(),
        ));
    }
    Ok((parent, name))
}

fn created_id(created: Option<NodeId>) -> Result<NodeId, FsError> {
    created.ok_or_else(|| FsError::InvalidOperation("create returned no node".to_string()))
}

fn listing_entry(node: &Node) -> ListingEntry {
    let file = node.as_file();
    ListingEntry {
        id: node.id.to_hex(),
        name: node.name.clone(),
        kind: node.kind_label(),
        size: node.size(),
        method: file.map(|f| f.allocation_method.to_string()),
        blocks: file.map(|f| f.owned_blocks().len()).unwrap_or(0),
    }
}
