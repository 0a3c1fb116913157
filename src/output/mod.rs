//! Result writers: `<language>-calls.json` and `impact-summary.md`

pub mod json;
pub mod markdown;

pub use json::{write_all, write_impact_summary, write_json};
pub use markdown::{render_impact_summary, ImpactLevel};
