use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by the login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login. Fields are optional so a missing one maps to the
/// 400 "required" message instead of a body rejection.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for the password reset flow. `newPassword` is the camelCase
/// wire name existing clients send.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub username: String,
    pub email: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forgot_password_request_accepts_camel_case_wire_name() {
        let req: ForgotPasswordRequest =
            serde_json::from_str(r#"{"email":"a@b.com","newPassword":"hunter22"}"#)
                .expect("deserialize");
        assert_eq!(req.email.as_deref(), Some("a@b.com"));
        assert_eq!(req.new_password.as_deref(), Some("hunter22"));
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let req: LoginRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(req.username.is_none());
        assert!(req.password.is_none());
    }

    #[test]
    fn login_response_serializes_all_fields() {
        let res = LoginResponse {
            message: "Login successful".into(),
            token: "tok".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("Login successful"));
        assert!(json.contains("\"token\""));
        assert!(json.contains("alice@example.com"));
    }
}
