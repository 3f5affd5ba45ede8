mod digest;
mod health_check;
mod helpers;
mod ingest;
mod notifications;
