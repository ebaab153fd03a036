use serde::{Deserialize, Serialize};

pub mod client;

pub use client::{HttpInferenceClient, InferenceClient, InferenceError};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_is_a_single_prompt_field() {
        let body = serde_json::to_string(&GenerateRequest { prompt: "hi" }).unwrap();
        assert_eq!(body, r#"{"prompt":"hi"}"#);
    }

    #[test]
    fn response_ignores_extra_fields() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response":"Drink water.","model":"x"}"#).unwrap();
        assert_eq!(parsed.response, "Drink water.");
    }
}
