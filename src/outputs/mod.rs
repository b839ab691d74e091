//! Output generation.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2024-08-16/
//!     ├── fpl.json    # {scraper_type: {sub_type: [records]}}
//!     └── odds.json   # [{home, away, date, home_odds, ...}]
//! ```

pub mod json;
