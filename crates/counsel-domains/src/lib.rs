pub mod legal;

pub use legal::LegalAssistant;
