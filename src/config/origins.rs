use std::env;

/// Origins the API recognizes, split by how tokens are delivered to them.
///
/// Browser origins get HttpOnly cookies. Native origins (and requests that
/// carry no `Origin` header at all) receive tokens in the JSON body only.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    pub web_origins: Vec<String>,
    pub native_origins: Vec<String>,
}

impl OriginPolicy {
    pub fn from_env() -> Self {
        Self {
            web_origins: parse_list(&env::var("WEB_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:5173".to_string()
            })),
            native_origins: parse_list(&env::var("NATIVE_ORIGINS").unwrap_or_default()),
        }
    }

    pub fn new(web_origins: &[&str], native_origins: &[&str]) -> Self {
        Self {
            web_origins: web_origins.iter().map(|o| normalize(o)).collect(),
            native_origins: native_origins.iter().map(|o| normalize(o)).collect(),
        }
    }

    pub fn is_web_origin(&self, origin: &str) -> bool {
        let origin = normalize(origin);
        self.web_origins.iter().any(|allowed| *allowed == origin)
    }

    pub fn is_native_origin(&self, origin: &str) -> bool {
        let origin = normalize(origin);
        self.native_origins.iter().any(|allowed| *allowed == origin)
    }
}

fn normalize(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize)
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_normalizes_entries() {
        assert_eq!(
            parse_list(" https://PetAdopt.example/ ,, capacitor://localhost"),
            vec![
                "https://petadopt.example".to_string(),
                "capacitor://localhost".to_string()
            ]
        );
    }

    #[test]
    fn test_origin_matching_ignores_case_and_trailing_slash() {
        let policy = OriginPolicy::new(&["https://petadopt.example"], &["capacitor://localhost"]);
        assert!(policy.is_web_origin("https://PETADOPT.example/"));
        assert!(!policy.is_web_origin("https://evil.example"));
        assert!(policy.is_native_origin("capacitor://localhost"));
    }
}
