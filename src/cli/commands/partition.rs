//! Partition command implementation.

use super::{block_on, resolve_query};
use crate::cli::{Cli, OutputFormat, PartitionArgs};
use crate::client::SearchClient;
use crate::config::Config;
use crate::error::{KbrowseError, Result};
use crate::model::SearchRequest;

/// Run the partition command.
pub fn run(cli: &Cli, config: &Config, args: &PartitionArgs) -> Result<()> {
    let client = SearchClient::from_config(cli.server.as_deref(), config)?;
    let query = args.query.to_query(config)?;
    // Fail on a missing key before any request is made.
    SearchRequest::default_partition(&query)?;

    let (query, partition) = block_on(async {
        let query = resolve_query(&client, query).await?;
        let partition = client.default_partition(&query).await?;
        Ok::<_, KbrowseError>((query, partition))
    })??;

    match cli.effective_output() {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "topic": query.topic(),
                "key": query.key(),
                "partition": partition,
            })
        ),
        OutputFormat::Text => println!("{partition}"),
    }

    Ok(())
}
