mod email_client;
mod extraction_client;
mod mail;
mod smtp_client;
mod source_fetcher;

pub use email_client::EmailClient;
pub use extraction_client::{DealExtractor, ExtractionClient};
pub use mail::{Email, MailSender, Sender};
pub use smtp_client::{SmtpClient, SmtpOptions, SmtpSecurity};
pub use source_fetcher::{HttpSourceFetcher, SourceFetcher};
