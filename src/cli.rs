use clap::{Arg, ArgAction, ArgMatches, Command};

#[derive(Debug, Default)]
pub struct CliOptions {
    pub log_level: Option<String>,
    pub version: bool,
    pub owner: Option<String>,
    pub allowed_repos: Option<String>,
}

pub fn build_cli() -> Command {
    Command::new("github-tools-mcp")
        .about("GitHub tools MCP server (stdio JSON-RPC)")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("owner")
                .long("owner")
                .num_args(1)
                .help("Default owner for activity reports (overrides OWNER)"),
        )
        .arg(
            Arg::new("allowed-repos")
                .long("allowed-repos")
                .num_args(1)
                .help(
                    "Comma-separated allow-list, e.g. \"acme/*,foo/bar\" \
                     (overrides GH_ALLOWED_REPOS)",
                ),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

impl CliOptions {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            log_level: m.get_one::<String>("log-level").cloned(),
            version: m.get_flag("version"),
            owner: m.get_one::<String>("owner").cloned(),
            allowed_repos: m.get_one::<String>("allowed-repos").cloned(),
        }
    }
}

/// Logs go to stderr; stdout carries JSON-RPC only.
pub fn init_logging(level: Option<&str>) {
    // Explicit level wins, else RUST_LOG, else info.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.target(env_logger::Target::Stderr).init();
}
