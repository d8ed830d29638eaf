//! Ensemble CLI
//!
//! Inspect and administer a time-series cluster through its meta endpoint,
//! and run queries and writes against its data nodes.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a default configuration (ensemble.yml)
//! ensemble --generate-config
//!
//! # Show the cluster topology
//! ensemble --meta-url meta-1:8091 show-cluster
//!
//! # Query through the next data node in rotation
//! ensemble query "SHOW DATABASES"
//!
//! # Write a point
//! ensemble write cpu --db telegraf --tag host=server01 --field usage=64.5
//! ```

mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{CliConfig, LoggingSettings};
use ensemble_cluster::{ClientConfig, ClusterClient};
use ensemble_core::{FieldValue, Point, Query, RequestContext, Role, User};
use ensemble_meta::{MetaCtrl, RolesStore, UsersStore};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ensemble")]
#[command(author, version, about = "Client for ensemble time-series clusters")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "ensemble.yml")]
    config: PathBuf,

    /// Meta endpoint (overrides config)
    #[arg(long, global = true)]
    meta_url: Option<String>,

    /// Force HTTPS towards the meta endpoint
    #[arg(long, global = true)]
    tls: bool,

    /// Accept any TLS certificate
    #[arg(long, global = true)]
    insecure: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    generate_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show data and meta nodes
    ShowCluster,

    /// Run a query on a data node
    Query {
        /// Query text
        command: String,

        #[arg(long)]
        db: Option<String>,

        #[arg(long)]
        rp: Option<String>,

        /// Timestamp precision of returned times (ns, ms, s, ...)
        #[arg(long)]
        epoch: Option<String>,
    },

    /// Write a single point
    Write {
        measurement: String,

        #[arg(long)]
        db: Option<String>,

        #[arg(long)]
        rp: Option<String>,

        /// Tag as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_key_val)]
        tags: Vec<(String, String)>,

        /// Field as key=value (repeatable); 10i is an integer, 10u unsigned
        #[arg(long = "field", value_parser = parse_key_val, required = true)]
        fields: Vec<(String, String)>,

        /// Nanosecond timestamp (default: now)
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// List users with their permissions and roles
    Users,

    /// List roles with their permissions and members
    Roles,

    /// Show role membership keyed by user
    UserRoles,

    /// List the actions the cluster understands
    Permissions,

    /// Create a user
    CreateUser {
        name: String,

        #[arg(long)]
        password: String,

        /// Role to join (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Delete a user
    DeleteUser { name: String },

    /// Create a role
    CreateRole {
        name: String,

        /// Member user (repeatable)
        #[arg(long = "user")]
        users: Vec<String>,
    },

    /// Delete a role
    DeleteRole { name: String },
}

impl Cli {
    fn apply_overrides(&self, cluster: &mut ClientConfig) {
        if let Some(meta_url) = &self.meta_url {
            cluster.meta_url = meta_url.clone();
        }
        if self.tls {
            cluster.tls = true;
        }
        if self.insecure {
            cluster.insecure_skip_verify = true;
        }
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn parse_field_value(raw: &str) -> FieldValue {
    if let Some(v) = raw.strip_suffix('i').and_then(|s| s.parse::<i64>().ok()) {
        return FieldValue::Integer(v);
    }
    if let Some(v) = raw.strip_suffix('u').and_then(|s| s.parse::<u64>().ok()) {
        return FieldValue::UnsignedInteger(v);
    }
    match raw {
        "true" => return FieldValue::Boolean(true),
        "false" => return FieldValue::Boolean(false),
        _ => {}
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Float(v),
        _ => FieldValue::String(raw.trim_matches('"').to_string()),
    }
}

fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(settings.show_target)
        .with_thread_ids(settings.show_thread_ids)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Overall budget for one command: meta calls plus the data node request
fn command_timeout(config: &ClientConfig) -> Duration {
    config.request_timeout().saturating_mul(2)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands, client: &ClusterClient, ctx: &RequestContext, config: &ClientConfig) -> Result<()> {
    match command {
        Commands::ShowCluster => print_json(&client.ctrl().show_cluster(ctx).await?),

        Commands::Query { command, db, rp, epoch } => {
            client
                .connect(ctx, &config.source())
                .await
                .context("Failed to connect to data nodes")?;

            let mut query = Query::new(command);
            if let Some(db) = db {
                query = query.database(db);
            }
            if let Some(rp) = rp {
                query = query.retention_policy(rp);
            }
            if let Some(epoch) = epoch {
                query = query.epoch(epoch);
            }

            let resp = client.query(ctx, &query).await?;
            if let Some(err) = resp.error() {
                bail!("Query failed: {}", err);
            }
            print_json(&resp)
        }

        Commands::Write {
            measurement,
            db,
            rp,
            tags,
            fields,
            timestamp,
        } => {
            let mut builder = Point::builder(measurement);
            if let Some(db) = db {
                builder = builder.database(db);
            }
            if let Some(rp) = rp {
                builder = builder.retention_policy(rp);
            }
            if let Some(ts) = timestamp {
                builder = builder.timestamp(ts);
            }
            for (key, value) in tags {
                builder = builder.tag(key, value);
            }
            for (key, value) in fields {
                let value = parse_field_value(&value);
                builder = builder.field(key, value);
            }
            let point = builder.build().context("Invalid point")?;

            client
                .connect(ctx, &config.source())
                .await
                .context("Failed to connect to data nodes")?;
            client.write(ctx, &[point]).await?;
            info!("Wrote 1 point");
            Ok(())
        }

        Commands::Users => print_json(&client.users().all(ctx).await?),

        Commands::Roles => print_json(&client.roles()?.all(ctx).await?),

        Commands::UserRoles => print_json(&client.ctrl().user_roles(ctx).await?),

        Commands::Permissions => print_json(&client.permissions()),

        Commands::CreateUser { name, password, roles } => {
            let user = User {
                password: Some(password),
                roles: Some(roles.into_iter().map(Role::new).collect()),
                ..User::new(name)
            };
            print_json(&client.users().add(ctx, &user).await?)
        }

        Commands::DeleteUser { name } => Ok(client.users().delete(ctx, &User::new(name)).await?),

        Commands::CreateRole { name, users } => {
            let role = Role {
                users: Some(users),
                ..Role::new(name)
            };
            print_json(&client.roles()?.add(ctx, &role).await?)
        }

        Commands::DeleteRole { name } => Ok(client.roles()?.delete(ctx, &Role::new(name)).await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        CliConfig::write_default(&cli.config)?;
        println!("Generated default configuration: {}", cli.config.display());
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config)?;
    cli.apply_overrides(&mut config.cluster);
    init_logging(&config.logging)?;

    let Some(command) = cli.command else {
        bail!("No command given, see --help");
    };

    let client = ClusterClient::from_config(&config.cluster).context("Invalid cluster configuration")?;
    debug!("Using meta endpoint {}", config.cluster.meta_url);

    let ctx = RequestContext::with_timeout(command_timeout(&config.cluster));
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    run(command, &client, &ctx, &config.cluster).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(parse_key_val("host=a").unwrap(), ("host".to_string(), "a".to_string()));
        assert_eq!(parse_key_val("expr=a=b").unwrap(), ("expr".to_string(), "a=b".to_string()));
        assert!(parse_key_val("host").is_err());
        assert!(parse_key_val("=a").is_err());
    }

    #[test]
    fn test_parse_field_value() {
        assert_eq!(parse_field_value("64.5"), FieldValue::Float(64.5));
        assert_eq!(parse_field_value("10"), FieldValue::Float(10.0));
        assert_eq!(parse_field_value("10i"), FieldValue::Integer(10));
        assert_eq!(parse_field_value("10u"), FieldValue::UnsignedInteger(10));
        assert_eq!(parse_field_value("true"), FieldValue::Boolean(true));
        assert_eq!(parse_field_value("\"ok\""), FieldValue::String("ok".to_string()));
        assert_eq!(parse_field_value("nan"), FieldValue::String("nan".to_string()));
    }

    #[test]
    fn test_command_timeout_saturates() {
        assert_eq!(command_timeout(&ClientConfig::default()), Duration::from_secs(60));

        let huge = ClientConfig {
            request_timeout_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(command_timeout(&huge), Duration::MAX);
        assert_eq!(RequestContext::with_timeout(command_timeout(&huge)).deadline(), None);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["ensemble", "--meta-url", "meta-2:8091", "--tls", "show-cluster"]);
        let mut cluster = ClientConfig::default();
        cli.apply_overrides(&mut cluster);

        assert_eq!(cluster.meta_url, "meta-2:8091");
        assert!(cluster.tls);
        assert!(!cluster.insecure_skip_verify);
        assert!(matches!(cli.command, Some(Commands::ShowCluster)));
    }

    #[test]
    fn test_write_requires_a_field() {
        assert!(Cli::try_parse_from(["ensemble", "write", "cpu"]).is_err());
        let cli = Cli::try_parse_from(["ensemble", "write", "cpu", "--field", "usage=1.5", "--tag", "host=a"]).unwrap();
        match cli.command {
            Some(Commands::Write { tags, fields, .. }) => {
                assert_eq!(tags, vec![("host".to_string(), "a".to_string())]);
                assert_eq!(fields, vec![("usage".to_string(), "1.5".to_string())]);
            }
            _ => panic!("expected write command"),
        }
    }
}
