use serde::{Deserialize, Serialize};

use crate::constants::ANONYMOUS_USER_ID;

/// Session-scoped identity of the user driving a capture.
///
/// Passed into the pipeline explicitly; the pipeline never looks up the
/// signed-in profile on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// The user id, or the anonymous sentinel when nobody is signed in.
    pub fn resolved_user_id(&self) -> &str {
        match self.user_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => ANONYMOUS_USER_ID,
        }
    }
}

/// What evidence is being gathered. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub requirement_id: Option<String>,
    pub requirement_name: Option<String>,
    pub loan_id: Option<String>,
    pub user_id: String,
}

impl CaptureRequest {
    pub fn new(session: &SessionContext) -> Self {
        Self {
            requirement_id: None,
            requirement_name: None,
            loan_id: None,
            user_id: session.resolved_user_id().to_string(),
        }
    }

    pub fn with_requirement(mut self, id: Option<String>, name: Option<String>) -> Self {
        self.requirement_id = id;
        self.requirement_name = name;
        self
    }

    pub fn with_loan(mut self, loan_id: impl Into<String>) -> Self {
        self.loan_id = Some(loan_id.into());
        self
    }
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::new(&SessionContext::anonymous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_uses_sentinel() {
        let request = CaptureRequest::new(&SessionContext::anonymous());
        assert_eq!(request.user_id, "anonymous");

        let blank = SessionContext {
            user_id: Some("  ".to_string()),
        };
        assert_eq!(blank.resolved_user_id(), "anonymous");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let request = CaptureRequest::new(&SessionContext::new("u1"))
            .with_loan("LN-1")
            .with_requirement(Some("R-7".into()), Some("Shop Photo".into()));
        assert_eq!(request.user_id, "u1");
        assert_eq!(request.loan_id.as_deref(), Some("LN-1"));
        assert_eq!(request.requirement_id.as_deref(), Some("R-7"));
        assert_eq!(request.requirement_name.as_deref(), Some("Shop Photo"));
    }
}
