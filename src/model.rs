mod deals;
mod subscribers;

pub use deals::{Deal, DealFilter, NewDeal, MANUAL_SOURCE};
pub use subscribers::{NewSubscriber, Subscriber, DEFAULT_PLAN};
