use crate::aggregate::Response;

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(response: Option<&Response>) -> String {
        serde_json::to_string_pretty(&response).unwrap_or_else(|_| "null".to_string())
    }

    /// Single-line form used on the daemon wire
    pub fn format_line(response: Option<&Response>) -> String {
        serde_json::to_string(&response).unwrap_or_else(|_| "null".to_string())
    }
}
