// Literal parsers for values found in query results

pub mod date;

pub use date::{looks_like_date, parse_date, parse_date_str};
