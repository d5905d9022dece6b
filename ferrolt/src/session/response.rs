//! Response type for command execution results.

use std::time::Duration;

/// Output of one command sent to the device.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output with the echo and trailing prompt removed.
    pub result: String,

    /// Everything read from the device for this command.
    pub raw_result: String,

    /// The prompt line that ended the read.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Device-reported failure, if the output contained one.
    pub failure_message: Option<String>,
}

impl Response {
    /// Build a response from the raw output of `command`.
    pub fn new(command: impl Into<String>, raw_result: impl Into<String>, elapsed: Duration) -> Self {
        let command = command.into();
        let raw_result = raw_result.into();
        let prompt = last_line(&raw_result).trim().to_string();
        let result = strip_echo_and_prompt(&raw_result, &command);

        Self {
            command,
            result,
            raw_result,
            prompt,
            elapsed,
            failure_message: None,
        }
    }

    /// Attach a failure message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

}

/// Last non-empty line of device output.
pub(crate) fn last_line(output: &str) -> &str {
    output
        .trim_end()
        .rsplit(['\n', '\r'])
        .next()
        .unwrap_or_default()
}

fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let body = raw.trim_start_matches(['\r', '\n']);
    let body = body
        .strip_prefix(command)
        .unwrap_or(body)
        .trim_start_matches(['\r', '\n']);

    match body.trim_end().rfind('\n') {
        Some(pos) => body[..pos].trim_end_matches(['\r', '\n']).to_string(),
        None => String::new(),
    }
}
