//! Curl command implementation.
//!
//! Prints the `curl` invocation that reproduces a search, so it can be run
//! or shared without this client. No request is made.

use crate::cli::{Cli, CurlArgs, OutputFormat};
use crate::client::parse_base_url;
use crate::config::Config;
use crate::error::Result;
use crate::model::{Endpoint, SearchRequest};

/// Run the curl command.
pub fn run(cli: &Cli, config: &Config, args: &CurlArgs) -> Result<()> {
    let base = parse_base_url(cli.server.as_deref().unwrap_or(&config.server.base_url))?;
    let query = args.query.to_query(config)?;
    let endpoint = if args.cached {
        Endpoint::Cached
    } else {
        Endpoint::Search
    };

    let request = SearchRequest::from_query(endpoint, &query, config.search.print_offset);
    let command = request.curl_command(&base)?;

    match cli.effective_output() {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "command": command,
                "url": request.url(&base)?.as_str(),
            });
            println!("{json}");
        }
        OutputFormat::Text => println!("{command}"),
    }

    Ok(())
}
