//! Configs command implementation.
//!
//! Shows what the server offers: clusters, their topics, value
//! deserializers and schema registries.

use console::style;

use super::block_on;
use crate::cli::{Cli, ConfigsArgs, OutputFormat};
use crate::client::SearchClient;
use crate::config::Config;
use crate::error::Result;
use crate::model::ServerConfigs;

/// Run the configs command.
pub fn run(cli: &Cli, config: &Config, args: &ConfigsArgs) -> Result<()> {
    let client = SearchClient::from_config(cli.server.as_deref(), config)?;
    let configs = block_on(client.server_configs(args.bootstrap_servers.as_deref()))??;

    match cli.effective_output() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&configs)?),
        OutputFormat::Text => print!("{}", describe(&configs)),
    }

    Ok(())
}

fn describe(configs: &ServerConfigs) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", style("Clusters").bold()));
    for (label, servers) in &configs.bootstrap_servers {
        let topics = configs.topics_for(servers);
        out.push_str(&format!("  {label} ({servers}): {} topics\n", topics.len()));
        for topic in topics {
            out.push_str(&format!("    {topic}\n"));
        }
    }

    if !configs.value_deserializers.is_empty() {
        out.push_str(&format!("\n{}\n", style("Value deserializers").bold()));
        for (label, name) in &configs.value_deserializers {
            out.push_str(&format!("  {label}: {name}\n"));
        }
    }

    if let Some(urls) = configs.schema_registry_urls.as_ref().filter(|_| configs.has_schema_registry()) {
        out.push_str(&format!("\n{}\n", style("Schema registries").bold()));
        for (label, url) in urls {
            out.push_str(&format!("  {label}: {url}\n"));
        }
    }

    out
}
