use crate::aggregate::Response;

pub struct YamlFormatter;

impl YamlFormatter {
    pub fn format(response: Option<&Response>) -> String {
        serde_yaml::to_string(&response).unwrap_or_else(|_| "null\n".to_string())
    }
}
