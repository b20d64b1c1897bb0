//! Typed access to peakbagger.com pages: search results, peak details,
//! ascent lists and ascent reports, plus ascent statistics.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod parser;
pub mod stats;

pub use models::{Ascent, AscentDate, Peak, SearchResult};
pub use parser::{
    most_recent, parse_ascent_detail, parse_peak_ascents, parse_peak_detail, parse_search_results,
    sort_by_date,
};
