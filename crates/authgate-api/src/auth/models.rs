//! Request and response models for the user endpoints
//!
//! Raw request bodies are deserialized into `*Request` types and then turned
//! into [`Registration`] or [`Credentials`], which only exist once the input
//! has been normalized and validated.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// User registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 6, max = 120, message = "name must be 6-120 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(
        email(message = "email must be a valid email"),
        length(min = 5, max = 60, message = "email must be 5-60 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 10, max = 255, message = "password must be 10-255 characters"))]
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(
        email(message = "email must be a valid email"),
        length(min = 5, max = 60, message = "email must be 5-60 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 10, max = 255, message = "password must be 10-255 characters"))]
    pub password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A validated registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(mut request: RegisterRequest) -> Result<Self, ValidationErrors> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        Ok(Self {
            name: request.name,
            email: request.email,
            password: request.password,
        })
    }
}

/// Validated login credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(mut request: LoginRequest) -> Result<Self, ValidationErrors> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        Ok(Self {
            email: request.email,
            password: request.password,
        })
    }
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Id of the created user
    pub user: String,
}

/// Access and refresh token issued on login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// New access token issued on refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Flatten validator output into one line, e.g. `name: name must be 6-120 characters`
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_registration_normalizes_email() {
        let registration =
            Registration::new(register("Alice Smith", "  Alice@Example.COM ", "correct horse battery"))
                .unwrap();

        assert_eq!(registration.email, "alice@example.com");
        assert_eq!(registration.name, "Alice Smith");
    }

    #[test]
    fn test_registration_rejects_short_fields() {
        let errors = Registration::new(register("Al", "a@x.com", "short")).unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let errors =
            Registration::new(register("Alice Smith", "not-an-email", "correct horse battery"))
                .unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_missing_fields_deserialize_as_empty() {
        let request: LoginRequest = serde_json::from_str(r#"{"email": "a@x.com"}"#).unwrap();
        assert_eq!(request.password, "");

        let errors = Credentials::new(request).unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_describe_validation_errors() {
        let errors = Registration::new(register("Al", "a@x.com", "correct horse battery"))
            .unwrap_err();
        assert_eq!(
            describe_validation_errors(&errors),
            "name: name must be 6-120 characters"
        );
    }

    proptest! {
        #[test]
        fn valid_registrations_are_accepted(
            name in "[A-Za-z][A-Za-z ]{5,60}",
            local in "[a-z][a-z0-9]{2,15}",
            domain in "[a-z]{3,12}",
            password in "[A-Za-z0-9!@#]{10,64}",
        ) {
            let email = format!("{local}@{domain}.com");
            let registration = Registration::new(register(&name, &email, &password));
            prop_assert!(registration.is_ok());
        }

        #[test]
        fn login_email_is_case_insensitive(
            local in "[A-Za-z][A-Za-z0-9]{2,15}",
            domain in "[A-Za-z]{3,12}",
        ) {
            let email = format!("{local}@{domain}.COM");
            let credentials = Credentials::new(LoginRequest {
                email: email.clone(),
                password: "correct horse battery".to_string(),
            })
            .unwrap();
            prop_assert_eq!(credentials.email, email.to_lowercase());
        }

        #[test]
        fn short_passwords_are_rejected(password in "[a-z0-9]{0,9}") {
            let result = Credentials::new(LoginRequest {
                email: "alice@example.com".to_string(),
                password,
            });
            prop_assert!(result.is_err());
        }
    }
}
