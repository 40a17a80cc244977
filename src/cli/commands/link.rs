//! Link command implementation.
//!
//! Shareable links carry a whole query as encoded JSON in the URL query
//! component, so a search can be handed to someone else and reopened.

use crate::cli::{Cli, LinkAction, LinkArgs, OutputFormat, QueryArgs};
use crate::config::Config;
use crate::error::Result;
use crate::model::QueryState;

/// Run the link command.
pub fn run(cli: &Cli, config: &Config, args: &LinkArgs) -> Result<()> {
    match &args.action {
        LinkAction::Encode { query, base } => encode(cli, config, query, base.as_deref()),
        LinkAction::Decode { link } => decode(cli, link),
    }
}

fn encode(cli: &Cli, config: &Config, args: &QueryArgs, base: Option<&str>) -> Result<()> {
    let query = args.to_query(config)?;
    let link = share_link(&query, base);

    match cli.effective_output() {
        OutputFormat::Json => println!("{}", serde_json::json!({ "link": link })),
        OutputFormat::Text => println!("{link}"),
    }

    Ok(())
}

fn decode(cli: &Cli, link: &str) -> Result<()> {
    let query = QueryState::decode(link)?;

    match cli.effective_output() {
        OutputFormat::Json => println!("{}", serde_json::to_string(&query)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&query)?),
    }

    Ok(())
}

/// Encoded query, optionally appended to a page URL.
fn share_link(query: &QueryState, base: Option<&str>) -> String {
    match base {
        Some(base) => format!("{}/?{}", base.trim_end_matches(['/', '?']), query.encode()),
        None => query.encode(),
    }
}
