//! HTTP response types for the code server.

use serde::Serialize;

use crate::{Capacity, CodeStatus};

/// Response for issue requests.
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    /// Status of the response.
    pub status: String,
    /// The newly issued code.
    pub code: String,
}

impl IssueResponse {
    pub fn success(code: String) -> Self {
        Self {
            status: "success".to_string(),
            code,
        }
    }
}

/// Response for dump and status requests.
#[derive(Debug, Serialize)]
pub struct CodeStatusResponse {
    /// Status of the response.
    pub status: String,
    pub code: String,
    /// Lifecycle status of the code (`issued` or `dumped`).
    pub code_status: String,
}

impl CodeStatusResponse {
    pub fn success(code: String, code_status: CodeStatus) -> Self {
        Self {
            status: "success".to_string(),
            code,
            code_status: code_status.as_str().to_string(),
        }
    }
}

/// Response for info requests.
///
/// Counts are decimal strings because they can exceed any fixed-width
/// integer (and JSON number precision).
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Status of the response.
    pub status: String,
    pub issued: String,
    pub remaining: String,
    pub total: String,
}

impl InfoResponse {
    pub fn success(capacity: &Capacity) -> Self {
        Self {
            status: "success".to_string(),
            issued: capacity.issued.to_string(),
            remaining: capacity.remaining.to_string(),
            total: capacity.total.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;

    #[test]
    fn should_serialize_counts_as_decimal_strings() {
        // given
        let capacity = Capacity {
            issued: BigUint::from(1u32),
            remaining: BigUint::from(3u32),
            total: BigUint::from(4u32),
        };

        // when
        let json = serde_json::to_value(InfoResponse::success(&capacity)).unwrap();

        // then
        assert_eq!(
            json,
            serde_json::json!({
                "status": "success",
                "issued": "1",
                "remaining": "3",
                "total": "4"
            })
        );
    }

    #[test]
    fn should_serialize_code_status_in_lowercase() {
        let json = serde_json::to_value(CodeStatusResponse::success(
            "00".to_string(),
            CodeStatus::Dumped,
        ))
        .unwrap();

        assert_eq!(json["code_status"], "dumped");
        assert_eq!(json["code"], "00");
    }
}
