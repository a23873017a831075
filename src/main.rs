use std::sync::Arc;

use github_tools_mcp::cli::{self, CliOptions};
use github_tools_mcp::config::Config;
use github_tools_mcp::server;
use github_tools_mcp::tools::Tools;
use log::warn;

#[tokio::main(flavor = "current_thread")] // one request at a time over stdio
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let opts = CliOptions::from_matches(&matches);

    if opts.version {
        println!("github-tools-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    cli::init_logging(opts.log_level.as_deref());

    let cfg = Config::from_env()
        .map_err(anyhow::Error::msg)?
        .with_overrides(opts.owner, opts.allowed_repos);
    if !cfg.token_set() {
        warn!("No GitHub token configured; tools will report an auth error");
    }

    let tools = Tools::new(Arc::new(cfg))?;
    server::run_stdio_server(tools).await
}
