use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::fmt;

use azd_api::{ArmClient, ArmDeployment, ArmLocationProvider, ArmResourceManager, Deployment};
use azd_console::{Console, StdConsole};
use azd_engine::{Provisioner, WatchOutcome};
use azd_ext::ExtensionService;
use azd_project::Project;
use azd_types::{ParamValue, ParameterDefinition};

#[derive(Parser)]
#[command(name = "azd", about = "Provision and deploy cloud applications", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the project's infrastructure and watch it to completion
    Provision(ProvisionArgs),
    /// Extension tooling
    #[command(subcommand)]
    Extension(ExtensionCommands),
}

#[derive(Args)]
struct ProvisionArgs {
    /// Target subscription id
    #[arg(long)]
    subscription: String,
    /// Target resource group
    #[arg(long)]
    resource_group: String,
    /// Deployment name inside the resource group
    #[arg(long, default_value = "azd-deploy")]
    deployment: String,
    /// Infrastructure template, passed to the deployment engine verbatim
    #[arg(long, default_value = "infra/main.json")]
    template: PathBuf,
    /// Parameter definitions and stored values
    #[arg(long, default_value = "infra/parameters.json")]
    parameters: PathBuf,
    /// Composable project file served to extensions
    #[arg(long, default_value = "azd.json")]
    project: PathBuf,
    /// Socket path for the extension service
    #[arg(long)]
    extension_socket: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ExtensionCommands {
    /// Serve the extension API on a local socket
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Socket path to listen on
    #[arg(long)]
    socket: PathBuf,
    /// Composable project file to serve
    #[arg(long, default_value = "azd.json")]
    project: PathBuf,
}

/// Deployment input set: parameter definitions plus any stored values.
#[derive(Debug, Default, Deserialize)]
struct ParameterFile {
    #[serde(default)]
    parameters: IndexMap<String, ParameterDefinition>,
    #[serde(default)]
    values: HashMap<String, Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Provision(args) => run_provision(args).await,
        Commands::Extension(ExtensionCommands::Serve(args)) => run_extension_serve(args).await,
    }
}

/// Configure the tracing subscriber from the `AZD_LOG` environment variable.
///
/// Accepts any env-filter directive; defaults to `info`. Diagnostics go to
/// stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = std::env::var("AZD_LOG").unwrap_or_else(|_| "info".into());
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

async fn run_provision(args: ProvisionArgs) -> Result<()> {
    let console: Arc<dyn Console> = Arc::new(StdConsole::new());
    let client = ArmClient::new_from_env()?;
    let resource_manager = Arc::new(ArmResourceManager::new(client.clone()));
    let locations = Arc::new(ArmLocationProvider::new(client.clone(), args.subscription.clone()));
    let provisioner = Provisioner::new(Arc::clone(&console), resource_manager, locations);

    let inputs = load_parameter_file(&args.parameters)?;
    let values = match provisioner.ensure_parameters(&inputs.parameters, &inputs.values).await {
        Ok(values) => values,
        Err(error) if error.is_canceled() => {
            console.message("Provisioning canceled.");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    let template = load_json(&args.template)?;
    let deployment = Arc::new(ArmDeployment::new(
        client,
        args.subscription,
        args.resource_group,
        args.deployment,
    ));
    deployment.submit(&template, &arm_parameters_body(&values)).await?;
    let deployment: Arc<dyn Deployment> = deployment;

    // The extension service runs for the lifetime of the command, sharing
    // the project model with the watch loop.
    let project = Arc::new(load_project(&args.project)?);
    let cancellation = CancellationToken::new();
    let socket_path = args
        .extension_socket
        .unwrap_or_else(|| std::env::temp_dir().join(format!("azd-ext-{}.sock", std::process::id())));
    let extension_task = {
        let service = ExtensionService::new(Arc::clone(&project));
        let cancellation = cancellation.child_token();
        let socket_path = socket_path.clone();
        tokio::spawn(async move { service.serve_unix(&socket_path, cancellation).await })
    };

    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    let outcome = provisioner.watch(Arc::clone(&deployment), cancellation.child_token()).await;
    cancellation.cancel();
    match extension_task.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!("extension service stopped with an error: {error:#}"),
        Err(error) => warn!("extension service task failed: {error}"),
    }

    if args.project.exists() || !project.list_resources().is_empty() {
        project.save(&args.project)?;
    }

    match outcome? {
        WatchOutcome::Succeeded => {
            console.message("Provisioning succeeded.");
            Ok(())
        }
        WatchOutcome::Canceled => {
            console.message("Provisioning canceled.");
            Ok(())
        }
        WatchOutcome::Failed => bail!("provisioning failed; see the deployment in the portal for details"),
    }
}

async fn run_extension_serve(args: ServeArgs) -> Result<()> {
    let project = Arc::new(load_project(&args.project)?);
    let service = ExtensionService::new(Arc::clone(&project));
    let cancellation = CancellationToken::new();

    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    service.serve_unix(&args.socket, cancellation).await?;
    if args.project.exists() || !project.list_resources().is_empty() {
        project.save(&args.project)?;
    }
    Ok(())
}

fn load_parameter_file(path: &Path) -> Result<ParameterFile> {
    if !path.exists() {
        return Ok(ParameterFile::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn load_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn load_project(path: &Path) -> Result<Project> {
    if path.exists() {
        Project::load(path)
    } else {
        Ok(Project::new())
    }
}

/// Render resolved values in the deployment engine's parameter body shape.
fn arm_parameters_body(values: &IndexMap<String, ParamValue>) -> Value {
    let mut body = serde_json::Map::new();
    for (name, value) in values {
        body.insert(name.clone(), serde_json::json!({ "value": value.to_json() }));
    }
    Value::Object(body)
}
