mod forward_query;
mod query_domain;

pub use forward_query::ForwardQueryUseCase;
pub use query_domain::{QueryDomainUseCase, QueryOutcome};
