//! mgmt-patch CLI
//!
//! Command-line interface for the partial-update engine.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mgmt_patch::{
    apply_updates, build_schema, deserialize, initialize_logging, load_document_auto, serialize,
    to_json_schema, ArgValue, AssignPolicy, Binding, ClientConfig, Direction, IdentityAssign,
    OperationError, SchemaKind, UpdateOptions, DEFAULT_ENDPOINT, LOG_ENV,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "mgmt-patch")]
#[command(about = "Typed partial updates for management-plane resources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the identity of an action group
    Identity {
        #[command(subcommand)]
        command: IdentityCommands,
    },

    /// Apply bindings to a local action group document and print the request body
    ///
    /// Bindings are applied in the order --set, --append, --clear.
    Patch {
        /// Action group document in wire format (`-` for stdin)
        document: String,

        /// Assign a value; VALUE is parsed as JSON, or taken as a string
        #[arg(long = "set", value_name = "PATH=VALUE")]
        set: Vec<String>,

        /// Append to a list; VALUE is parsed as JSON, or taken as a string
        #[arg(long = "append", value_name = "PATH=VALUE")]
        append: Vec<String>,

        /// Clear a field to its blank value
        #[arg(long = "clear", value_name = "PATH")]
        clear: Vec<String>,

        /// How assign treats existing lists and dicts
        #[arg(long, default_value = "replace", value_parser = parse_policy)]
        policy: AssignPolicy,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the action group schema as JSON Schema
    Schema {
        /// Schema for request bodies
        #[arg(
            long,
            conflicts_with = "response",
            required_unless_present = "response"
        )]
        request: bool,

        /// Schema for responses
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Assign managed identities to an action group
    Assign {
        /// Name of the action group
        #[arg(short = 'n', long = "name", visible_alias = "action-group-name")]
        name: String,

        /// Resource group of the action group
        #[arg(short = 'g', long = "resource-group")]
        resource_group: String,

        /// Enable the system-assigned identity (`True` when given without a value)
        #[arg(
            long = "system-assigned",
            visible_alias = "mi-system-assigned",
            value_name = "FLAG",
            num_args = 0..=1
        )]
        system_assigned: Option<Option<String>>,

        /// User-assigned identity resource ids (clears them when given without ids)
        #[arg(
            long = "user-assigned",
            visible_alias = "mi-user-assigned",
            value_name = "ID",
            num_args = 0..
        )]
        user_assigned: Option<Vec<String>>,

        /// How identities combine with the existing ones
        #[arg(long, default_value = "replace", value_parser = parse_policy)]
        policy: AssignPolicy,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Args)]
struct ConnectionArgs {
    /// Management endpoint
    #[arg(long, env = "MGMT_PATCH_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Subscription id
    #[arg(long, env = "MGMT_PATCH_SUBSCRIPTION")]
    subscription: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "MGMT_PATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn parse_policy(s: &str) -> Result<AssignPolicy, String> {
    AssignPolicy::parse(s).ok_or_else(|| format!("unknown policy '{}' (replace, union)", s))
}

fn main() -> ExitCode {
    initialize_logging(LOG_ENV);
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Identity {
            command:
                IdentityCommands::Assign {
                    name,
                    resource_group,
                    system_assigned,
                    user_assigned,
                    policy,
                    pretty,
                    connection,
                },
        } => {
            let mut command = IdentityAssign::new(name, resource_group);
            command.system_assigned = system_assigned.map(|value| match value {
                Some(flag) => ArgValue::Value(Value::String(flag)),
                None => ArgValue::Blank,
            });
            command.user_assigned = user_assigned.map(|ids| {
                if ids.is_empty() {
                    ArgValue::Blank
                } else {
                    ArgValue::Value(Value::Array(ids.into_iter().map(Value::String).collect()))
                }
            });
            let config = ClientConfig {
                endpoint: connection.endpoint,
                subscription_id: connection.subscription,
                access_token: connection.token,
                timeout: Duration::from_secs(connection.timeout),
                assign_policy: policy,
            };
            run_identity_assign(&command, &config, pretty)
        }

        Commands::Patch {
            document,
            set,
            append,
            clear,
            policy,
            pretty,
        } => run_patch(&document, &set, &append, &clear, policy, pretty),

        Commands::Schema {
            request,
            response: _,
            pretty,
        } => run_schema(request, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

#[cfg(feature = "remote")]
fn run_identity_assign(
    command: &IdentityAssign,
    config: &ClientConfig,
    pretty: bool,
) -> Result<(), u8> {
    let subscription = config.require_subscription().map_err(report)?;
    let client = mgmt_patch::MgmtClient::from_config(config).map_err(report)?;
    let outcome = command
        .run(&client, subscription, config.update_options())
        .map_err(report)?;
    print_json(&outcome.output, pretty)
}

#[cfg(not(feature = "remote"))]
fn run_identity_assign(
    _command: &IdentityAssign,
    _config: &ClientConfig,
    _pretty: bool,
) -> Result<(), u8> {
    eprintln!("Error: built without the `remote` feature");
    Err(3)
}

fn run_patch(
    source: &str,
    set: &[String],
    append: &[String],
    clear: &[String],
    policy: AssignPolicy,
    pretty: bool,
) -> Result<(), u8> {
    let schema = build_schema(SchemaKind::ActionGroup);

    let wire = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let mut instance = deserialize(schema, &wire).map_err(report)?;

    let mut bindings = Vec::new();
    for expr in set {
        let (path, value) = split_binding(expr)?;
        bindings.push(Binding::assign(path, path, value));
    }
    for expr in append {
        let (path, value) = split_binding(expr)?;
        bindings.push(Binding::append(path, path, value));
    }
    for path in clear {
        bindings.push(Binding::blank(path.as_str(), path.as_str()));
    }

    let options = UpdateOptions::new().assign_policy(policy);
    apply_updates(schema, &mut instance, &bindings, options).map_err(report)?;

    let body = serialize(schema, &instance, Direction::Request).map_err(report)?;
    print_json(&body, pretty)
}

fn run_schema(request: bool, pretty: bool) -> Result<(), u8> {
    let direction = Direction::from_request_flag(request);
    let schema = to_json_schema(build_schema(SchemaKind::ActionGroup), direction);
    print_json(&schema, pretty)
}

/// Split `PATH=VALUE`; VALUE is JSON when it parses, a string otherwise.
fn split_binding(expr: &str) -> Result<(&str, Value), u8> {
    let Some((path, raw)) = expr.split_once('=') else {
        eprintln!("Error: expected PATH=VALUE, got '{}'", expr);
        return Err(2);
    };
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path, value))
}

fn print_json(value: &Value, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

/// Print an error to stderr and return its exit code.
fn report(error: OperationError) -> u8 {
    match &error {
        OperationError::Validation { errors } => {
            eprintln!("Validation failed:");
            for e in errors {
                eprintln!("  {}", e);
            }
        }
        _ => eprintln!("Error: {}", error),
    }
    error.exit_code() as u8
}
