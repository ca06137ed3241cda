use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use pushline_sdk::{
    DocumentToDelete, EndOptions, OrderingToken, PushClient, PushConfig, PushMode,
    SessionSummary, SourceStatus, SpoolConfig, StartOptions,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    if let Command::Config(args) = &cli.command {
        return cmd_config(&cli.config, args);
    }
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Push(args) => cmd_push(config, args, &cli.format).await.map(|_| ()),
        Command::Delete(args) => cmd_delete(config, args).await,
        Command::DeleteOlderThan(args) => cmd_delete_older_than(config, args).await,
        Command::Status(args) => cmd_status(config, args).await,
        Command::Permissions(args) => cmd_permissions(config, args).await,
        Command::Config(_) => Ok(()),
    }
}

/// The config file when it exists, defaults otherwise. The API key may
/// always come from the environment.
fn load_config(path: &Path) -> anyhow::Result<PushConfig> {
    if path.exists() {
        return Ok(PushConfig::load(path)?);
    }
    debug!(path = %path.display(), "no config file, using defaults");
    let mut config = PushConfig::default();
    config.apply_env()?;
    Ok(config)
}

pub async fn cmd_push(
    mut config: PushConfig,
    args: PushArgs,
    format: &OutputFormat,
) -> anyhow::Result<SessionSummary> {
    if let Some(mode) = &args.mode {
        config.mode = mode.parse::<PushMode>()?;
    }
    if let Some(size) = args.max_request_size {
        config.max_request_size = size;
    }
    if let Some(dir) = &args.spool {
        let mut spool = SpoolConfig::new(dir);
        spool.offset = args.offset;
        config.spool = Some(spool);
    }

    let documents = read_json_lines(&args.file)?;
    let deletes = match &args.deletes {
        Some(path) => read_ids(path)?,
        None => Vec::new(),
    };

    let client = PushClient::connect(config)?;
    let mut batch = client.batch()?;
    let token = batch
        .start(StartOptions {
            reset_state: true,
            update_status: !args.no_status,
        })
        .await?;
    for (line, document) in documents.iter().enumerate() {
        batch
            .add_json(document)
            .await
            .with_context(|| format!("{}: line {}", args.file.display(), line + 1))?;
    }
    for id in deletes {
        batch.add(DocumentToDelete::new(id)).await?;
    }
    let summary = batch
        .end(EndOptions {
            delete_older: args.delete_older,
            update_status: !args.no_status,
        })
        .await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "ordering_id": token.get(),
                "batches": summary.batches,
                "items": summary.items,
                "bytes": summary.bytes,
            })
        ),
        OutputFormat::Text => {
            println!(
                "{} Pushed {} items in {} batches ({} bytes)",
                "✓".green().bold(),
                summary.items.to_string().bold(),
                summary.batches,
                summary.bytes
            );
            println!("  Ordering id: {}", token.to_string().yellow());
        }
    }
    Ok(summary)
}

async fn cmd_delete(config: PushConfig, args: DeleteArgs) -> anyhow::Result<()> {
    let ordering = args.ordering.map(OrderingToken::from_signed).transpose()?;
    let client = PushClient::connect(config)?;
    client
        .remove_single_document(&args.document_id, !args.no_status, ordering, args.children)
        .await?;
    println!("{} Deleted {}", "✓".green().bold(), args.document_id.yellow());
    Ok(())
}

async fn cmd_delete_older_than(config: PushConfig, args: DeleteOlderThanArgs) -> anyhow::Result<()> {
    let ordering = OrderingToken::from_signed(args.ordering)?;
    let client = PushClient::connect(config)?;
    client.delete_older_than(ordering, args.queue_delay).await?;
    println!(
        "{} Deleting documents older than {}",
        "✓".green().bold(),
        ordering.to_string().yellow()
    );
    Ok(())
}

async fn cmd_status(config: PushConfig, args: StatusArgs) -> anyhow::Result<()> {
    let status = match args.status {
        StatusValue::Rebuild => SourceStatus::Rebuild,
        StatusValue::Refresh => SourceStatus::Refresh,
        StatusValue::Incremental => SourceStatus::Incremental,
        StatusValue::Idle => SourceStatus::Idle,
    };
    let client = PushClient::connect(config)?;
    client.update_source_status(status).await?;
    println!("Source status: {}", status.to_string().cyan().bold());
    Ok(())
}

async fn cmd_permissions(config: PushConfig, args: PermissionsArgs) -> anyhow::Result<()> {
    let client = PushClient::connect(config)?;
    match args.action {
        PermissionsAction::Provider { id, kind, cascade } => {
            let cascading = cascade
                .iter()
                .map(|arg| parse_cascade(arg))
                .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
            client.add_security_provider(&id, &kind, cascading).await?;
            println!("{} Security provider {} ({})", "✓".green().bold(), id.bold(), kind);
        }
        PermissionsAction::Expand {
            provider,
            file,
            delete_older,
        } => {
            let value = read_json(&file)?;
            let mut batch = client.permission_batch(&provider);
            batch.start();
            batch
                .add_json(&value)
                .with_context(|| format!("{}: invalid permission batch", file.display()))?;
            let count = batch.end(delete_older).await?;
            println!(
                "{} {} identities sent to {}",
                "✓".green().bold(),
                count.to_string().bold(),
                provider.bold()
            );
        }
        PermissionsAction::DeleteOlderThan { provider, ordering } => {
            let ordering = OrderingToken::from_signed(ordering)?;
            client.delete_permissions_older_than(&provider, ordering).await?;
            println!(
                "{} Deleting permissions of {} older than {}",
                "✓".green().bold(),
                provider.bold(),
                ordering.to_string().yellow()
            );
        }
    }
    Ok(())
}

fn cmd_config(path: &Path, args: &ConfigArgs) -> anyhow::Result<()> {
    if args.init {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        let template = PushConfig {
            organization_id: "my-organization".into(),
            source_id: "my-source".into(),
            ..PushConfig::default()
        };
        std::fs::write(path, template.to_toml()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{} Wrote {}", "✓".green().bold(), path.display().to_string().bold());
        println!("  Set the API key in the file or in {}", pushline_sdk::API_KEY_ENV.cyan());
        return Ok(());
    }

    let mut config = load_config(path)?;
    let has_key = config.api_key.take().is_some();
    print!("{}", config.to_toml()?);
    println!(
        "# api_key: {}",
        if has_key { "set".green() } else { "not set".red() }
    );
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// One JSON object per non-blank line.
fn read_json_lines(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut documents = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("{}: line {}", path.display(), n + 1))?;
        documents.push(value);
    }
    Ok(documents)
}

fn read_ids(path: &Path) -> anyhow::Result<Vec<String>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// `ID=TYPE` into a cascading provider entry.
fn parse_cascade(arg: &str) -> anyhow::Result<(String, Value)> {
    let Some((id, kind)) = arg.split_once('=') else {
        bail!("cascade must be ID=TYPE, got `{arg}`");
    };
    if id.is_empty() || kind.is_empty() {
        bail!("cascade must be ID=TYPE, got `{arg}`");
    }
    Ok((id.to_string(), json!({"name": id, "type": kind})))
}
