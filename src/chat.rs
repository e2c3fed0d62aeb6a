//! # Chat-Completions Generator
//!
//! A [`Generator`] that asks a hosted language model for notes.
//!
//! [`ChatGenerator`] turns a [`GeneratorPrompt`] into a chat-completions request
//! body and reads the first choice's message content from the response. The
//! actual network exchange sits behind [`ChatTransport`], so the crate carries no
//! HTTP stack of its own. [`CommandTransport`] runs an external program (a
//! `curl` wrapper, a proxy client) that receives the request body on stdin and
//! prints the response body on stdout.
//!
//! Everything connection-related comes from [`GeneratorConfig`]: endpoint,
//! model, response length and the name of the environment variable holding the
//! API key.

use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::EtudeError;
use crate::prompt::{Generator, GeneratorPrompt};

/// Environment variable carrying the endpoint URL to a transport command.
pub const ENDPOINT_ENV: &str = "ETUDE_ENDPOINT";

/// Environment variable carrying the API key to a transport command.
pub const API_KEY_ENV: &str = "ETUDE_API_KEY";

/// Delivers one request body to an endpoint and returns the response body.
pub trait ChatTransport {
    fn post(&mut self, endpoint: &str, api_key: &str, body: &Value) -> Result<Value, EtudeError>;
}

/// Generator backed by a chat-completions endpoint.
#[derive(Debug)]
pub struct ChatGenerator<T> {
    transport: T,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl<T: ChatTransport> ChatGenerator<T> {
    /// Build from generator settings. Fails with
    /// [`EtudeError::GeneratorUnavailable`] when the API key variable is unset.
    pub fn from_config(config: &GeneratorConfig, transport: T) -> Result<Self, EtudeError> {
        let api_key = config.api_key().ok_or_else(|| {
            EtudeError::GeneratorUnavailable(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Ok(Self {
            transport,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }
}

impl<T: ChatTransport> Generator for ChatGenerator<T> {
    fn generate(&mut self, prompt: &GeneratorPrompt) -> Result<String, EtudeError> {
        let mut body = prompt.chat_request(&self.model);
        body["max_tokens"] = Value::from(self.max_tokens);

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting generator output");
        let response = self.transport.post(&self.endpoint, &self.api_key, &body)?;

        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                EtudeError::GeneratorUnavailable("response carries no message content".to_string())
            })
    }
}

/// Runs an external program per request.
///
/// The request body is written to the program's stdin as JSON; the endpoint and
/// API key are passed in [`ENDPOINT_ENV`] and [`API_KEY_ENV`], never on the
/// command line. The program must print the response body as JSON and exit 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransport {
    program: String,
    args: Vec<String>,
}

impl CommandTransport {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` list; None when the list is empty.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl ChatTransport for CommandTransport {
    fn post(&mut self, endpoint: &str, api_key: &str, body: &Value) -> Result<Value, EtudeError> {
        let unavailable = |message: String| EtudeError::GeneratorUnavailable(message);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(ENDPOINT_ENV, endpoint)
            .env(API_KEY_ENV, api_key)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_string(body)?;
            stdin
                .write_all(payload.as_bytes())
                .map_err(|e| unavailable(format!("failed to send request to {}: {}", self.program, e)))?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| unavailable(format!("{} printed invalid JSON: {}", self.program, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::build_prompt;
    use crate::types::ExerciseRequest;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use serde_json::json;

    /// Records every request and answers with a fixed body.
    struct RecordingTransport {
        response: Value,
        requests: Vec<(String, String, Value)>,
    }

    impl ChatTransport for RecordingTransport {
        fn post(&mut self, endpoint: &str, api_key: &str, body: &Value) -> Result<Value, EtudeError> {
            self.requests.push((endpoint.to_string(), api_key.to_string(), body.clone()));
            Ok(self.response.clone())
        }
    }

    fn config(key_env: &str) -> GeneratorConfig {
        GeneratorConfig {
            endpoint: "https://example.invalid/v1/chat".to_string(),
            model: "test-model".to_string(),
            api_key_env: key_env.to_string(),
            max_tokens: 256,
            ..GeneratorConfig::default()
        }
    }

    fn prompt() -> GeneratorPrompt {
        build_prompt(&ExerciseRequest::default(), &mut Pcg32::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        std::env::remove_var("ETUDE_CHAT_TEST_MISSING_KEY");
        let transport = RecordingTransport { response: Value::Null, requests: Vec::new() };
        let result = ChatGenerator::from_config(&config("ETUDE_CHAT_TEST_MISSING_KEY"), transport);
        assert!(matches!(result, Err(EtudeError::GeneratorUnavailable(_))));
    }

    #[test]
    fn test_request_uses_configured_connection() {
        std::env::set_var("ETUDE_CHAT_TEST_KEY", "k-123");
        let transport = RecordingTransport {
            response: json!({ "choices": [{ "message": { "content": "[{\"note\": \"C4\", \"duration\": 2}]" } }] }),
            requests: Vec::new(),
        };
        let mut generator = ChatGenerator::from_config(&config("ETUDE_CHAT_TEST_KEY"), transport).unwrap();

        let text = generator.generate(&prompt()).unwrap();
        assert_eq!(text, r#"[{"note": "C4", "duration": 2}]"#);

        let (endpoint, api_key, body) = &generator.transport.requests[0];
        assert_eq!(endpoint, "https://example.invalid/v1/chat");
        assert_eq!(api_key, "k-123");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][1]["content"], prompt().user.as_str());
    }

    #[test]
    fn test_response_without_content_is_unavailable() {
        std::env::set_var("ETUDE_CHAT_TEST_EMPTY_KEY", "k");
        let transport = RecordingTransport { response: json!({ "choices": [] }), requests: Vec::new() };
        let mut generator = ChatGenerator::from_config(&config("ETUDE_CHAT_TEST_EMPTY_KEY"), transport).unwrap();
        assert!(matches!(generator.generate(&prompt()), Err(EtudeError::GeneratorUnavailable(_))));
    }

    #[test]
    fn test_from_command() {
        assert_eq!(CommandTransport::from_command(&[]), None);
        let command = vec!["chat-proxy".to_string(), "--json".to_string()];
        assert_eq!(
            CommandTransport::from_command(&command),
            Some(CommandTransport::new("chat-proxy", vec!["--json".to_string()]))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_transport_round_trip() {
        let script = r#"cat > /dev/null; printf '{"endpoint":"%s","key":"%s"}' "$ETUDE_ENDPOINT" "$ETUDE_API_KEY""#;
        let mut transport = CommandTransport::new("sh", vec!["-c".to_string(), script.to_string()]);
        let response = transport.post("https://example.invalid", "secret", &json!({ "a": 1 })).unwrap();
        assert_eq!(response, json!({ "endpoint": "https://example.invalid", "key": "secret" }));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_transport_failure() {
        let mut transport = CommandTransport::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
        assert!(matches!(
            transport.post("e", "k", &json!({})),
            Err(EtudeError::GeneratorUnavailable(_))
        ));
    }
}
