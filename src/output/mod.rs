mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use crate::aggregate::Response;
use crate::cli::OutputFormat;

/// Render an aggregation result; `None` is the "no data" result
pub fn format(response: Option<&Response>, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => JsonFormatter::format(response),
        OutputFormat::Yaml => YamlFormatter::format(response),
        OutputFormat::Table => TableFormatter::format(response),
    }
}
