pub mod dns;

pub use dns::{ForwardQueryUseCase, QueryDomainUseCase, QueryOutcome};
