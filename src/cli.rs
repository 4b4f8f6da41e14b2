use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "azdo-provider")]
#[command(version)]
#[command(about = "Inspect the Azure DevOps provider: resources, schemas, configuration and ACL tokens", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List resource and data source types with their schema version
    Resources,

    /// Print the JSON schema of one resource, or of all of them
    Schema {
        /// Resource or data source type (e.g. azuredevops_project)
        #[arg(value_name = "TYPE")]
        type_name: Option<String>,
    },

    /// Resolve the provider configuration and print a redacted summary
    Config {
        /// Provider config file (TOML or JSON)
        #[arg(short, long, value_name = "PATH")]
        file: Option<String>,
    },

    /// Compute ACL security tokens offline
    #[command(subcommand)]
    Token(TokenCommand),
}

// ============================================================================
// Token Commands
// ============================================================================

#[derive(Args)]
pub struct ProjectArg {
    /// Project ID
    #[arg(long)]
    pub project_id: String,
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Project namespace token
    Project(ProjectArg),

    /// Library token of a project
    Library(ProjectArg),

    /// Token of one variable group
    VariableGroup {
        #[command(flatten)]
        project: ProjectArg,

        /// Variable group ID
        #[arg(long)]
        variable_group_id: String,
    },

    /// Token of one secure file
    SecureFile {
        #[command(flatten)]
        project: ProjectArg,

        /// Secure file ID
        #[arg(long)]
        secure_file_id: String,
    },

    /// Service endpoint token; project-wide without an endpoint
    ServiceEndpoint {
        #[command(flatten)]
        project: ProjectArg,

        /// Service endpoint ID
        #[arg(long)]
        serviceendpoint_id: Option<String>,
    },

    /// Process template token
    Process {
        /// Parent (system) process ID
        #[arg(long)]
        parent_process_id: String,

        /// Inherited process ID
        #[arg(long)]
        process_id: String,
    },

    /// Build definition token
    BuildDefinition {
        #[command(flatten)]
        project: ProjectArg,

        /// Build definition ID
        #[arg(long)]
        build_definition_id: i64,

        /// Folder of the definition (e.g. \Release\Web)
        #[arg(long)]
        path: Option<String>,
    },

    /// Build folder token
    BuildFolder {
        #[command(flatten)]
        project: ProjectArg,

        /// Folder path; the root when omitted
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Git repositories token; project-wide without a repository
    Git {
        #[command(flatten)]
        project: ProjectArg,

        /// Repository ID
        #[arg(long)]
        repository_id: Option<String>,
    },
}

impl TokenCommand {
    /// The security token this command names.
    pub fn token(&self) -> String {
        use azdo_provider::security::tokens;

        match self {
            Self::Project(p) => tokens::project_token(&p.project_id),
            Self::Library(p) => tokens::library_token(&p.project_id),
            Self::VariableGroup {
                project,
                variable_group_id,
            } => tokens::variable_group_token(&project.project_id, variable_group_id),
            Self::SecureFile {
                project,
                secure_file_id,
            } => tokens::secure_file_token(&project.project_id, secure_file_id),
            Self::ServiceEndpoint {
                project,
                serviceendpoint_id,
            } => tokens::service_endpoint_token(&project.project_id, serviceendpoint_id.as_deref()),
            Self::Process {
                parent_process_id,
                process_id,
            } => tokens::process_token(parent_process_id, process_id),
            Self::BuildDefinition {
                project,
                build_definition_id,
                path,
            } => tokens::build_definition_token(&project.project_id, *build_definition_id, path.as_deref()),
            Self::BuildFolder { project, path } => tokens::build_folder_token(&project.project_id, path),
            Self::Git {
                project,
                repository_id,
            } => tokens::git_repository_token(&project.project_id, repository_id.as_deref()),
        }
    }
}

/// Config file to load: the flag, or the default location when it exists.
pub fn config_file(flag: Option<&str>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = flag {
        return Ok(Some(azdo_provider::config::expand_path(path)));
    }
    let default = azdo_provider::config::default_config_path()?;
    Ok(default.exists().then_some(default))
}
