use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "peerchain-cli")]
#[command(about = "CLI client for a peerchain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, env = "PEERCHAIN_NODE", default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Author
        #[arg(long)]
        author: String,
        /// Content
        #[arg(long)]
        content: String,
    },
    /// Mine pending transactions into a block
    Mine,
    /// Print the node's chain (after it reconciles with its peers)
    Chain,
    /// List transactions waiting to be mined
    Pending,
    /// Make the node join the network of another node
    Register {
        /// Address of a node already in the network (host:port)
        #[arg(long)]
        peer: String,
    },
}

#[derive(Serialize)]
struct Tx {
    author: String,
    content: String,
}

#[derive(Serialize)]
struct NodeAddress {
    node_address: String,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    // pretty-print JSON bodies, pass anything else through
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    debug!(node = %node, command = ?cli.cmd, "sending request");

    let res = match cli.cmd {
        Command::Submit { author, content } => {
            let tx = Tx { author, content };
            client.post(format!("{node}/new_transaction")).json(&tx).send().await?
        }
        Command::Mine => client.get(format!("{node}/mine")).send().await?,
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Pending => client.get(format!("{node}/pending_transactions")).send().await?,
        Command::Register { peer } => {
            let body = NodeAddress { node_address: peer };
            client.post(format!("{node}/register_with")).json(&body).send().await?
        }
    };
    print_response(res).await
}
