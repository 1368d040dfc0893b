use serde::{Deserialize, Serialize};

/// Name given to the rule we install; an existing rule with the same name is
/// replaced by the update call.
pub const RULE_NAME: &str = "s3UploadFromFrontend";

/// How long browsers may cache the preflight response.
pub const MAX_AGE_SECONDS: u32 = 3600;

/// A single B2 CORS rule, serialized with the wire field names the
/// `b2_update_bucket` call and the `--cors-rules` CLI flag both expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    pub cors_rule_name: String,
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allowed_operations: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_seconds: u32,
}

impl CorsRule {
    /// Builds the rule applied to the bucket: browser uploads and downloads
    /// (put/head/get over the S3 interface) from the given origins.
    pub fn for_origins(origins: Vec<String>) -> Self {
        CorsRule {
            cors_rule_name: RULE_NAME.to_string(),
            allowed_origins: origins,
            allowed_headers: vec!["*".to_string()],
            allowed_operations: vec![
                "s3_put".to_string(),
                "s3_head".to_string(),
                "s3_get".to_string(),
            ],
            expose_headers: vec![
                "ETag".to_string(),
                "x-amz-request-id".to_string(),
                "x-amz-id-2".to_string(),
            ],
            max_age_seconds: MAX_AGE_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The non-origin fields are fixed regardless of configuration.
    #[test]
    fn rule_defaults() {
        let rule = CorsRule::for_origins(vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ]);

        assert_eq!(rule.cors_rule_name, "s3UploadFromFrontend");
        assert_eq!(
            rule.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(rule.allowed_headers, vec!["*"]);
        assert_eq!(rule.allowed_operations, vec!["s3_put", "s3_head", "s3_get"]);
        assert_eq!(
            rule.expose_headers,
            vec!["ETag", "x-amz-request-id", "x-amz-id-2"]
        );
        assert_eq!(rule.max_age_seconds, 3600);
    }

    /// The B2 API is picky about field names; make sure serde emits the
    /// camelCase wire names and not the Rust ones.
    #[test]
    fn rule_wire_names() {
        let rule = CorsRule::for_origins(vec!["https://a.example".to_string()]);
        let value = serde_json::to_value(&rule).expect("rule should serialize");
        let object = value.as_object().expect("rule should be a JSON object");

        for field in [
            "corsRuleName",
            "allowedOrigins",
            "allowedHeaders",
            "allowedOperations",
            "exposeHeaders",
            "maxAgeSeconds",
        ] {
            assert!(object.contains_key(field), "missing wire field {field}");
        }
        assert_eq!(object.len(), 6);
    }
}
