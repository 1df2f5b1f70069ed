use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub reference_id: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("Name must not be empty");
        }
        if !self.email.contains('@') || self.email.trim().len() < 3 {
            return Err("A valid email address is required");
        }
        if self.message.trim().is_empty() {
            return Err("Message must not be empty");
        }
        if self.message.chars().count() > 5000 {
            return Err("Message must be at most 5000 characters");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ContactRequest {
        ContactRequest {
            name: "Jo Resident".into(),
            email: "jo@example.com".into(),
            subject: Some("Broken link on the knowledge base".into()),
            message: "The winter road page 404s.".into(),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn malformed_submissions_are_rejected() {
        let mut req = request();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());

        let mut req = request();
        req.message = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.message = "x".repeat(5001);
        assert!(req.validate().is_err());
    }
}
