use crate::output::{render, OutputFormat};
use dohgate_application::use_cases::{QueryDomainUseCase, QueryOutcome};
use dohgate_domain::{DnsQuery, DomainError, RecordType};
use tracing::{error, warn};

pub struct QueryOptions {
    pub record_type: String,
    pub subnet: Option<String>,
    pub format: OutputFormat,
}

/// Resolves and prints every name. A failure is logged and the remaining
/// names are still tried; the result is an error if any name failed.
pub async fn run(use_case: &QueryDomainUseCase, names: &[String], options: &QueryOptions) -> anyhow::Result<()> {
    if names.is_empty() {
        warn!("No names to query");
        return Ok(());
    }

    let mut failed = 0;
    for name in names {
        let printed = match resolve(use_case, name, options).await {
            Ok(outcome) => render(&outcome, options.format).map(|text| println!("{}", text)),
            Err(e) => Err(e),
        };
        if let Err(e) = printed {
            error!(domain = %name, kind = ?e.kind(), error = %e, "Query failed");
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} queries failed", failed, names.len());
    }
    Ok(())
}

async fn resolve(
    use_case: &QueryDomainUseCase,
    name: &str,
    options: &QueryOptions,
) -> Result<QueryOutcome, DomainError> {
    let record_type = RecordType::from_mnemonic_or_code(&options.record_type)?;

    let mut request = DnsQuery::new(name, record_type);
    if let Some(subnet) = &options.subnet {
        request = request.with_subnet(subnet.parse()?);
    }

    use_case.execute(&request).await
}
