pub mod currency_api;
pub mod goldprice;
pub mod quote_source;
pub mod util;
