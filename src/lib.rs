pub mod config;
pub mod consolidate;
pub mod dates;
pub mod enrich_cities;
pub mod enrich_dates;
pub mod export;
pub mod names;
pub mod pipeline;
pub mod raw;
pub mod record;
pub mod rounds;
pub mod score;
pub mod source_2014;
pub mod source_2018;
pub mod source_2022;
pub mod source_historical;
pub mod transform;
pub mod validate;
