//! External programs as functions under test.
//!
//! The call vector is written to the program's stdin as a JSON array. A zero
//! exit status is a return: stdout parsed as JSON, or the trimmed text when
//! it is not JSON, or `undefined` when empty. A non-zero exit status is a
//! failure carrying the trimmed stderr.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use chaos_core::{CallError, CallResult, Target, Value};

/// How to launch a target program.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Wrap the program as a [`Target`]. Concurrent targets spawn through
    /// tokio and are run on the engine's async path.
    pub fn into_target(self, name: impl Into<String>, concurrent: bool) -> Target {
        let spec = Arc::new(self);
        if concurrent {
            Target::asynchronous(name, move |inputs: Vec<Value>| {
                let spec = Arc::clone(&spec);
                async move { spec.call_async(&inputs).await }
            })
        } else {
            Target::sync(name, move |inputs| spec.call_blocking(inputs))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    pub fn call_blocking(&self, inputs: &[Value]) -> CallResult {
        let payload = encode_inputs(inputs)?;
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| spawn_error(&self.program, e))?;
        // Feed stdin from its own thread so a program that fills its stdout
        // pipe before reading all of its input cannot stall the call.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(move |scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => ignore_broken_pipe(stdin.write_all(&payload)),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(CallError::new("program input writer panicked")));
            (written, output)
        });
        written?;
        let output =
            output.map_err(|e| CallError::new(format!("failed to wait for program: {}", e)))?;
        decode_output(&output)
    }

    pub async fn call_async(&self, inputs: &[Value]) -> CallResult {
        let payload = encode_inputs(inputs)?;
        let mut child = tokio::process::Command::from(self.command())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.program, e))?;
        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => ignore_broken_pipe(stdin.write_all(&payload).await),
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        written?;
        let output =
            output.map_err(|e| CallError::new(format!("failed to wait for program: {}", e)))?;
        decode_output(&output)
    }
}

fn spawn_error(program: &Path, err: io::Error) -> CallError {
    CallError::new(format!("failed to spawn {}: {}", program.display(), err))
}

/// Programs that exit without reading stdin close the pipe early.
fn ignore_broken_pipe(result: io::Result<()>) -> Result<(), CallError> {
    match result {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(CallError::new(format!(
            "failed to write program input: {}",
            e
        ))),
        _ => Ok(()),
    }
}

/// JSON array of the call vector, special values rendered by name.
pub fn encode_inputs(inputs: &[Value]) -> Result<Vec<u8>, CallError> {
    let json = serde_json::Value::Array(inputs.iter().map(Value::to_json).collect());
    let mut payload = serde_json::to_vec(&json)
        .map_err(|e| CallError::new(format!("failed to encode inputs: {}", e)))?;
    payload.push(b'\n');
    Ok(payload)
}

pub fn decode_output(output: &Output) -> CallResult {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if !stderr.is_empty() {
            stderr
        } else {
            match output.status.code() {
                Some(code) => format!("exited with status {}", code),
                None => format!("exited with {}", output.status),
            }
        };
        debug!(status = %output.status, "target program failed");
        return Err(CallError::new(message));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = stdout.trim();
    if text.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(text),
    })
}
