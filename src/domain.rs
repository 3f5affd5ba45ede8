mod airport_code;
mod deal_link;
mod email_address;
mod month;
mod price;
mod trip_type;

pub use airport_code::AirportCode;
pub use deal_link::DealLink;
pub use email_address::EmailAddress;
pub use month::Month;
pub use price::PriceGbp;
pub use trip_type::TripType;
