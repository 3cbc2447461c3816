use crate::progress::ProgressLogger;
use crate::prompt::Prompter;
use colored::Colorize;
use mernboot_atlas::AtlasProvider;
use mernboot_config::Settings;
use mernboot_provision::{
    AccessRule, AtlasGateway, ClusterSpec, ClusterStatus, ConnectionString, DatabaseUser,
    EnvFile, Pipeline, PipelineOutcome, PollPolicy, ProvisioningRecord, ProvisioningRequest,
    RecordStore, Resolution, local_placeholder, parse_manual, resolve,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Everything the Atlas commands share
pub struct AtlasContext {
    pub settings: Settings,
    pub store: RecordStore,
    pub provider: AtlasProvider,
}

impl AtlasContext {
    pub fn load() -> anyhow::Result<Self> {
        let settings = Settings::load()?;
        let store = RecordStore::new(mernboot_config::record_path()?);
        let provider =
            AtlasProvider::new().with_install_command(settings.install_command.clone());

        Ok(Self {
            settings,
            store,
            provider,
        })
    }

    fn poll_policy(&self) -> PollPolicy {
        let policy = PollPolicy::new(
            self.settings.poll_interval(),
            self.settings.max_poll_attempts,
        );
        match self.settings.poll_deadline() {
            Some(deadline) => policy.with_deadline(deadline),
            None => policy,
        }
    }

    fn cluster_spec(&self, name: String) -> ClusterSpec {
        ClusterSpec {
            name,
            provider: self.settings.provider.clone(),
            region: self.settings.region.clone(),
            tier: self.settings.tier.clone(),
        }
    }

    fn database_user(&self, username: String, password: String) -> DatabaseUser {
        DatabaseUser {
            username,
            password,
            role: self.settings.user_role.clone(),
        }
    }

    fn access_rule(&self) -> AccessRule {
        AccessRule {
            cidr: self.settings.access_cidr.clone(),
            comment: self.settings.access_comment.clone(),
        }
    }

    pub fn env_file(&self, path: Option<&Path>) -> EnvFile {
        match path {
            Some(path) => EnvFile::new(path),
            None => EnvFile::new(&self.settings.env_file),
        }
    }

    async fn load_record(&self) -> anyhow::Result<ProvisioningRecord> {
        self.store.load().await?.ok_or_else(|| {
            anyhow::anyhow!(
                "No MongoDB Atlas configuration found. Please set up MongoDB Atlas first."
            )
        })
    }
}

/// Options for `atlas setup`
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub project_name: Option<String>,
    pub cluster_name: Option<String>,
    pub username: Option<String>,
    pub resume: bool,
    pub env_file: Option<PathBuf>,
}

/// Run the provisioning pipeline, then write MONGO_URI if the cluster is ready
pub async fn handle_setup<R: BufRead>(
    ctx: &AtlasContext,
    prompt: &mut Prompter<R>,
    options: &SetupOptions,
) -> anyhow::Result<Option<ConnectionString>> {
    println!("{}", "MongoDB Atlas Setup".cyan().bold());
    println!();

    let resumed = if options.resume {
        Some(ctx.load_record().await?)
    } else {
        None
    };

    let project_name = match (&options.project_name, &resumed) {
        (Some(name), _) => name.clone(),
        (None, Some(record)) => record.project_id().to_string(),
        (None, None) => prompt.ask_required("Enter project name: ")?,
    };

    let default_cluster = resumed
        .as_ref()
        .map(|record| record.cluster_name().to_string())
        .unwrap_or_else(|| ctx.settings.default_cluster_name.clone());
    let cluster_name = match &options.cluster_name {
        Some(name) => name.clone(),
        None => prompt.ask_or(
            &format!("Enter cluster name (default: {}): ", default_cluster),
            &default_cluster,
        )?,
    };

    let username = match (&options.username, &resumed) {
        (Some(name), _) => name.clone(),
        (None, Some(record)) => record.username().to_string(),
        (None, None) => prompt.ask_required("Enter database username: ")?,
    };
    let password = prompt.ask_required("Enter database password: ")?;

    let mut request = ProvisioningRequest::new(
        project_name.as_str(),
        ctx.cluster_spec(cluster_name),
        ctx.database_user(username, password.clone()),
    )
    .with_access_rule(ctx.access_rule());
    if let Some(record) = &resumed {
        println!("Resuming project {}", record.project_id().cyan());
        request = request.resuming(record.project_id());
    }

    println!();
    let mut logger = ProgressLogger::new(ctx.settings.max_poll_attempts);
    let result = Pipeline::new(&ctx.provider, &ctx.store, ctx.poll_policy())
        .run(&request, &mut logger)
        .await;
    logger.print_summary(&project_name);
    let report = result?;

    match report.outcome() {
        PipelineOutcome::Ready => {
            println!();
            println!("{}", "✓ Cluster is ready!".green().bold());
            let env = ctx.env_file(options.env_file.as_deref());
            resolve_and_write(&ctx.provider, &report.record, &password, &env).await
        }
        PipelineOutcome::InProgress => {
            println!();
            println!(
                "{}",
                "⚠ Cluster creation is taking longer than expected.".yellow()
            );
            println!("You can check the status later with 'mernboot atlas url'.");
            Ok(None)
        }
        PipelineOutcome::Unexpected(status) => {
            println!();
            println!(
                "{}",
                format!("✗ Unexpected cluster status: {}", status).red()
            );
            println!("Check the cluster in the Atlas UI, then run 'mernboot atlas url'.");
            Ok(None)
        }
    }
}

/// Resolve the connection string of the saved cluster and write it
pub async fn handle_url<R: BufRead>(
    ctx: &AtlasContext,
    prompt: &mut Prompter<R>,
    env_file: Option<&Path>,
) -> anyhow::Result<Option<ConnectionString>> {
    let record = ctx.load_record().await?;

    println!("Getting MongoDB URL from existing configuration...");
    println!("Project ID:   {}", record.project_id().cyan());
    println!("Cluster Name: {}", record.cluster_name().cyan());

    // The record is written before the user step, which may have failed
    match ctx
        .provider
        .db_user_exists(record.project_id(), record.username())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            println!(
                "{}",
                format!(
                    "⚠ Database user {} was not found in this project. The URL will not work until it exists.",
                    record.username()
                )
                .yellow()
            );
            println!("Run 'mernboot atlas setup --resume' to create it.");
        }
        Err(e) => tracing::debug!(error = %e, "Could not check database user"),
    }

    let password = prompt.ask_required("\nEnter your database password: ")?;
    let env = ctx.env_file(env_file);
    resolve_and_write(&ctx.provider, &record, &password, &env).await
}

async fn resolve_and_write(
    gateway: &dyn AtlasGateway,
    record: &ProvisioningRecord,
    password: &str,
    env: &EnvFile,
) -> anyhow::Result<Option<ConnectionString>> {
    match resolve(gateway, record, password).await? {
        Resolution::Ready(uri) => {
            env.write_connection_string(&uri).await?;
            println!();
            println!("{}", "✓ MongoDB URL retrieved successfully!".green().bold());
            println!("{}", uri);
            println!(
                "{}",
                format!("✓ Saved MONGO_URI to {}", env.path().display()).green()
            );
            Ok(Some(uri))
        }
        Resolution::NotReadyYet => {
            println!();
            println!(
                "{}",
                "⏳ Cluster is still being created. Please wait a few minutes and try again."
                    .yellow()
            );
            println!("This usually takes 3-5 minutes after cluster creation.");
            Ok(None)
        }
    }
}

/// Show the current status of the saved cluster
pub async fn handle_status(ctx: &AtlasContext) -> anyhow::Result<()> {
    let record = ctx.load_record().await?;
    let status = ctx
        .provider
        .cluster_status(record.project_id(), record.cluster_name())
        .await?;

    let status_str = match status {
        ClusterStatus::Idle => status.to_string().green(),
        ClusterStatus::Creating => status.to_string().yellow(),
        _ => status.to_string().red(),
    };
    println!(
        "Cluster {} (project {}): {}",
        record.cluster_name().cyan(),
        record.project_id(),
        status_str
    );
    Ok(())
}

/// Validate a manually entered connection string and write it
pub async fn handle_use_url(
    ctx: &AtlasContext,
    uri: &str,
    env_file: Option<&Path>,
) -> anyhow::Result<()> {
    let uri = parse_manual(uri)?;
    let env = ctx.env_file(env_file);
    env.write_connection_string(&uri).await?;

    println!(
        "{}",
        format!("✓ Saved MONGO_URI to {}", env.path().display()).green()
    );
    Ok(())
}

/// Write the local development placeholder
pub async fn handle_local(ctx: &AtlasContext, env_file: Option<&Path>) -> anyhow::Result<()> {
    let env = ctx.env_file(env_file);
    env.write_connection_string(&local_placeholder()).await?;

    println!(
        "{}",
        format!("✓ Using local MongoDB ({})", local_placeholder()).green()
    );
    println!(
        "Update MONGO_URI in {} when your database is ready.",
        env.path().display()
    );
    Ok(())
}

pub async fn handle_logout(ctx: &AtlasContext) -> anyhow::Result<()> {
    println!("Logging out from MongoDB Atlas...");
    ctx.provider.logout().await?;

    println!(
        "{}",
        "✓ Successfully logged out from MongoDB Atlas".green().bold()
    );
    println!("{}", "Please log in again to continue.".yellow());
    Ok(())
}
