//! Command implementations

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use credsync_core::logging::{LogLevel, SharedLogger};
use credsync_core::{
    log_error, log_info, Controller, ControllerConfig, CredentialProvider, CredentialResolver,
    DirectorySecretStore, EventRouter, HttpProvider, MemoryProvider, MemorySecretStore, Reconciler,
    SecretObject, SecretStore,
};

use crate::cli::Command;
use crate::specs::{load_dir, load_file};
use crate::watch::DirectoryWatcher;

pub type CommandResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Everything a command needs, built once at startup
pub struct Context {
    pub config: ControllerConfig,
    pub logger: SharedLogger,
    pub resolver: Arc<CredentialResolver>,
}

impl Context {
    /// Build the provider and bind it to the configured team
    ///
    /// Fails if the global team cannot be resolved; nothing can be
    /// reconciled without it.
    pub async fn connect(config: ControllerConfig, fixture: Option<&Path>, logger: SharedLogger) -> CommandResult<Self> {
        let provider: Arc<dyn CredentialProvider> = match fixture {
            Some(path) => {
                log_info!(logger, "serving credentials from fixture {}", path.display());
                Arc::new(MemoryProvider::from_file(path)?)
            }
            None => Arc::new(HttpProvider::new(config.api_url.clone(), config.api_token.clone())),
        };

        let resolver = CredentialResolver::connect(provider, config.team_label(), Arc::clone(&logger)).await?;
        Ok(Self {
            config,
            logger,
            resolver: Arc::new(resolver),
        })
    }

    fn reconciler(&self, store: Arc<dyn SecretStore>) -> Reconciler {
        Reconciler::new(Arc::clone(&self.resolver), store, Arc::clone(&self.logger))
    }
}

/// Run a parsed command
pub async fn execute(command: Command, ctx: Context) -> CommandResult<()> {
    match command {
        Command::Render { spec_file } => cmd_render(&ctx, &spec_file).await,
        Command::Sync { spec_dir, out } => cmd_sync(&ctx, &spec_dir, &out).await,
        Command::Watch { spec_dir, out } => cmd_watch(ctx, &spec_dir, &out).await,
    }
}

/// Minimum console level for a command; `render` keeps stdout for JSON
pub fn console_level(command: &Command, configured: LogLevel) -> LogLevel {
    match command {
        Command::Render { .. } => configured.max(LogLevel::Warn),
        _ => configured,
    }
}

async fn cmd_render(ctx: &Context, spec_file: &Path) -> CommandResult<()> {
    let objects = load_file(spec_file, &ctx.config.namespace)?;
    let reconciler = ctx.reconciler(Arc::new(MemorySecretStore::new()));

    let mut secrets: Vec<SecretObject> = Vec::with_capacity(objects.len());
    for object in &objects {
        let secret = reconciler
            .render(object)
            .await
            .map_err(|e| format!("{} {}: {}", object.kind(), object.key(), e))?;
        secrets.push(secret);
    }

    let output = match secrets.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        _ => serde_json::to_string_pretty(&secrets)?,
    };
    println!("{}", output);
    Ok(())
}

async fn cmd_sync(ctx: &Context, spec_dir: &Path, out: &Path) -> CommandResult<()> {
    let loaded = load_dir(spec_dir, &ctx.config.namespace, &ctx.logger)?;
    let reconciler = ctx.reconciler(Arc::new(DirectorySecretStore::new(out)));

    let mut failed = 0;
    for object in loaded.objects.values() {
        if let Err(e) = reconciler.reconcile(object).await {
            failed += 1;
            log_error!(ctx.logger, "{} {} ({}): {}", object.kind(), object.key(), object.summary(), e);
        }
    }

    log_info!(
        ctx.logger,
        "synced {} of {} spec objects into {}",
        loaded.objects.len() - failed,
        loaded.objects.len(),
        out.display()
    );
    if failed > 0 || !loaded.failed.is_empty() {
        return Err(format!(
            "{} spec objects and {} spec files failed to sync",
            failed,
            loaded.failed.len()
        )
        .into());
    }
    Ok(())
}

async fn cmd_watch(ctx: Context, spec_dir: &Path, out: &Path) -> CommandResult<()> {
    let store: Arc<dyn SecretStore> = Arc::new(DirectorySecretStore::new(out));
    let controller = Controller::new(Arc::clone(&ctx.resolver), store, Arc::clone(&ctx.logger));

    let (router, project_rx, resource_rx) = EventRouter::channel(64);
    let watcher = DirectoryWatcher::new(
        spec_dir,
        ctx.config.namespace.clone(),
        ctx.config.resync_interval(),
        Arc::clone(&ctx.logger),
    );

    let logger = Arc::clone(&ctx.logger);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error!(logger, "unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::join!(controller.run(project_rx, resource_rx), watcher.run(router, shutdown));
    Ok(())
}
