use anyhow::Context;
use clap::Parser;
use dohgate_application::ports::{DnsClient, DnsService};
use dohgate_application::use_cases::QueryDomainUseCase;
use dohgate_domain::CliOverrides;
use dohgate_infrastructure::dns::{create_client, create_service};
use output::OutputFormat;
use std::sync::Arc;
use tracing::{error, info};

mod bootstrap;
mod output;
mod query;

#[derive(Parser, Debug)]
#[command(name = "dohgate")]
#[command(version)]
#[command(about = "DNS gateway between plain DNS, DNS-over-HTTPS and JSON resolvers")]
struct Cli {
    /// Config files (`;` separated) merged over the default search path
    #[arg(short = 'c', long, value_name = "FILES")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    loglevel: Option<String>,

    /// Resolve NAMES and exit instead of starting the service
    #[arg(short = 'q')]
    query: bool,

    /// Print only addresses and CNAME targets
    #[arg(long, conflicts_with = "json")]
    short: bool,

    /// Print the JSON API document
    #[arg(long)]
    json: bool,

    /// EDNS client subnet, CIDR or bare IP
    #[arg(long, value_name = "CIDR")]
    subnet: Option<String>,

    /// Record type, mnemonic or number
    #[arg(short = 't', long = "type", default_value = "A")]
    record_type: String,

    /// Client driver (dns, google, rfc8484, doh)
    #[arg(long)]
    driver: Option<String>,

    /// Client URL or alias
    #[arg(long)]
    url: Option<String>,

    /// Skip certificate verification towards the upstream
    #[arg(long)]
    insecure: bool,

    /// Names to resolve with -q
    names: Vec<String>,
}

impl Cli {
    fn output_format(&self) -> OutputFormat {
        if self.short {
            OutputFormat::Short
        } else if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Dig
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Fails only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli_overrides = CliOverrides {
        url: cli.url.clone(),
        driver: cli.driver.clone(),
        insecure: cli.insecure,
        log_level: cli.loglevel.clone(),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config.logging)?;

    info!("Starting dohgate v{}", env!("CARGO_PKG_VERSION"));

    if !cli.query && config.service.is_none() {
        error!("no query nor service, quit");
        return Ok(());
    }

    let client_config = config
        .client
        .as_ref()
        .context("no client configured: pass --url or add a \"client\" section")?;
    let client: Arc<dyn DnsClient> = Arc::new(create_client(client_config, &config.aliases)?);

    if cli.query {
        let use_case = QueryDomainUseCase::new(client, client_config.timeout());
        let options = query::QueryOptions {
            record_type: cli.record_type.clone(),
            subnet: cli.subnet.clone(),
            format: cli.output_format(),
        };
        return query::run(&use_case, &cli.names, &options).await;
    }

    if let Some(service_config) = &config.service {
        let service = create_service(service_config, &config.aliases, client)?;
        info!(service = %service.url(), "Service starting");
        service.run().await?;
    }

    info!("Service stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_flags_parse() {
        let cli = Cli::try_parse_from([
            "dohgate", "-q", "--type", "AAAA", "--subnet", "203.0.113.0/24", "--short",
            "--url", "google", "example.com", "example.org",
        ])
        .unwrap();

        assert!(cli.query);
        assert_eq!(cli.record_type, "AAAA");
        assert_eq!(cli.subnet.as_deref(), Some("203.0.113.0/24"));
        assert_eq!(cli.output_format(), OutputFormat::Short);
        assert_eq!(cli.names, vec!["example.com", "example.org"]);
    }

    #[test]
    fn test_type_defaults_to_a_and_output_to_dig() {
        let cli = Cli::try_parse_from(["dohgate", "-q", "example.com"]).unwrap();
        assert_eq!(cli.record_type, "A");
        assert_eq!(cli.output_format(), OutputFormat::Dig);
    }

    #[test]
    fn test_short_and_json_conflict() {
        assert!(Cli::try_parse_from(["dohgate", "-q", "--short", "--json", "x"]).is_err());
    }
}
