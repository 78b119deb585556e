mod cli;

use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};
use serde_json::Value;

use hivelink_core::{
    CoreError, Delayed, ErrorPolicy, HttpTransportConfig, Node, NodeConfig, Request,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let config = NodeConfig {
        url: args.node_url.clone(),
        chain_id: args.chain_id.clone(),
        transport: HttpTransportConfig {
            user: args.rpc_user.clone(),
            pass: args.rpc_pass.clone(),
            timeout: Duration::from_secs(args.timeout_secs),
            requests_per_second: args.requests_per_second,
            max_retries: args.max_retries,
            ..HttpTransportConfig::default()
        },
    };
    let node = Node::connect(&config).wrap_err("invalid node configuration")?;

    match args.command {
        cli::Command::Info => show_info(&node).await,
        cli::Command::Call { method, params } => {
            let request = Request::new(method, parse_params(params.as_deref())?);
            let result: Value = node
                .send(&request)
                .await
                .map_err(|err| connect_error(node.url(), &err))?;
            print_json(&result)
        }
        cli::Command::Batch { calls, strict } => run_batch(&node, &calls, strict).await,
    }
}

async fn show_info(node: &Node) -> eyre::Result<()> {
    let info = node
        .cached_info()
        .await
        .map_err(|err| connect_error(node.url(), &err))?;
    let chain_id = node.chain_id().await.wrap_err("resolve chain id")?;

    if chain_id != info.chain_id {
        tracing::warn!(
            configured = %chain_id,
            reported = %info.chain_id,
            "configured chain id differs from the one reported by the node"
        );
    }

    let dgp = &info.dynamic_global_properties;
    println!();
    println!("  Node:        {}", node.url());
    println!("  Status:      {}", node.online_status());
    println!("  Chain id:    {chain_id}");
    println!("  Network:     {}", info.network_type);
    println!("  Version:     {}", info.version.blockchain_version);
    println!("  Revision:    {}", info.version.hive_revision);
    println!(
        "  Head block:  {} ({}, witness {})",
        dgp.head_block_number, dgp.time, dgp.current_witness
    );
    println!("  Irreversible: {}", dgp.last_irreversible_block_num);
    println!();
    Ok(())
}

async fn run_batch(node: &Node, calls: &[String], strict: bool) -> eyre::Result<()> {
    let policy = if strict {
        ErrorPolicy::Immediate
    } else {
        ErrorPolicy::DeferToAccess
    };

    let requests = calls
        .iter()
        .map(|arg| parse_call(arg))
        .collect::<eyre::Result<Vec<_>>>()?;
    let results: Vec<Delayed<Value>> = node
        .with_batch(policy, |batch| {
            Ok::<_, CoreError>(requests.into_iter().map(|req| batch.add::<Value>(req)).collect())
        })
        .await
        .map_err(|err| connect_error(node.url(), &err))?;

    for delayed in &results {
        match delayed.get() {
            Ok(value) => {
                println!("[{}] {}:", delayed.id(), delayed.method());
                print_json(&value)?;
            }
            Err(err) => println!("[{}] {}: error: {err}", delayed.id(), delayed.method()),
        }
    }
    Ok(())
}

/// Parse `method` or `method=<json params>`.
fn parse_call(arg: &str) -> eyre::Result<Request> {
    let (method, params) = match arg.split_once('=') {
        Some((method, params)) => (method, Some(params)),
        None => (arg, None),
    };
    let method = method.trim();
    if method.is_empty() {
        return Err(eyre!("call `{arg}` has no method name"));
    }
    Ok(Request::new(method, parse_params(params)?))
}

fn parse_params(raw: Option<&str>) -> eyre::Result<Value> {
    match raw {
        None => Ok(Value::Object(Default::default())),
        Some(raw) => serde_json::from_str(raw)
            .wrap_err_with(|| format!("parameters `{raw}` are not valid JSON")),
    }
}

fn print_json(value: &Value) -> eyre::Result<()> {
    let pretty = serde_json::to_string_pretty(value).wrap_err("format result")?;
    println!("{pretty}");
    Ok(())
}

fn connect_error(node_url: &str, err: &CoreError) -> eyre::Report {
    eyre!(format_rpc_error(node_url, err)).wrap_err("while talking to the node")
}

fn format_rpc_error(node_url: &str, err: &CoreError) -> String {
    let source_error = err.to_string();
    let mut lines = vec![
        format!("request to `{node_url}` failed"),
        format!("RPC error: {source_error}"),
    ];

    let no_response = err.as_communication().is_some_and(|c| c.is_no_response());
    if no_response && source_error.contains("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the node hostname and your DNS/network"
                .into(),
        );
    } else if no_response
        && (source_error.contains("tls") || source_error.contains("certificate"))
    {
        lines.push(
            "hint: TLS handshake failed; verify certificate trust and that the node uses HTTPS"
                .into(),
        );
    } else if no_response && source_error.contains("timed out") {
        lines.push("hint: the node did not answer in time; try --timeout-secs or another node".into());
    } else if no_response {
        lines.push("hint: no response; verify the URL and that the node is reachable".into());
    } else if source_error.contains("401") || source_error.contains("403") {
        lines.push("hint: authentication failed; verify --rpc-user and --rpc-pass".into());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use hivelink_core::CommunicationError;

    use super::*;

    #[test]
    fn parse_call_without_params_uses_empty_object() {
        let req = parse_call("database_api.get_version").expect("valid call");
        assert_eq!(req.method, "database_api.get_version");
        assert_eq!(req.params, serde_json::json!({}));
    }

    #[test]
    fn parse_call_with_json_params() {
        let req = parse_call("condenser_api.get_accounts=[[\"alice\"]]").expect("valid call");
        assert_eq!(req.method, "condenser_api.get_accounts");
        assert_eq!(req.params, serde_json::json!([["alice"]]));
    }

    #[test]
    fn parse_call_rejects_bad_input() {
        assert!(parse_call("=[]").is_err());
        assert!(parse_call("block_api.get_block={not json").is_err());
    }

    #[test]
    fn no_response_errors_get_a_hint() {
        let err = CoreError::Communication(CommunicationError::NoResponse {
            url: "https://api.hive.blog".into(),
            request: "{}".into(),
            reason: "operation timed out".into(),
        });
        let message = format_rpc_error("https://api.hive.blog", &err);
        assert!(message.contains("hint: the node did not answer in time"));
    }

    #[test]
    fn server_errors_get_no_reachability_hint() {
        let err = CoreError::Communication(CommunicationError::WithResponse {
            url: "https://api.hive.blog".into(),
            request: "{}".into(),
            response: serde_json::json!({"error": {"code": -32601}}),
            code: Some(-32601),
            message: "method not found".into(),
        });
        let message = format_rpc_error("https://api.hive.blog", &err);
        assert!(!message.contains("hint:"));
    }
}
