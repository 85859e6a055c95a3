use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::{FILE_TYPE_FIELD, MetadataExtractor, MetadataRecord};
use crate::timestamp::TIMESTAMP_FIELDS;

/// Line exiftool prints after each `-execute` in `-stay_open` mode.
const READY_MARKER: &str = "{ready}";

/// Metadata reader that drives one long-lived `exiftool -stay_open` process.
///
/// Starting exiftool costs far more than reading a file, so the process is spawned once
/// and reused for every request. Requests are serialised through a mutex: exiftool
/// answers one command at a time on a single pipe.
pub struct ExifToolExtractor {
    session: Mutex<Session>,
}

struct Session {
    // Held so the child is killed when the extractor is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Set once an exchange fails part-way. The pipe may still hold the tail of that
    /// response, so nothing read from it afterwards can be trusted.
    broken: bool,
}

impl ExifToolExtractor {
    /// Spawn exiftool and check that it answers.
    pub async fn spawn(binary: &str) -> Result<Self> {
        Self::start(Command::new(binary))
            .await
            .with_context(|| format!("Failed to launch {binary}"))
    }

    async fn start(mut command: Command) -> Result<Self> {
        let mut child = command
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().context("exiftool stdin unavailable")?;
        let stdout = child.stdout.take().context("exiftool stdout unavailable")?;
        let mut session = Session {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
            broken: false,
        };

        let version = session.execute(&["-ver"]).await?;
        log::info!("Using exiftool {}", version.trim());

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Session {
    /// Send one command and return everything exiftool printed before `{ready}`.
    async fn execute(&mut self, args: &[&str]) -> Result<String> {
        if self.broken {
            bail!("exiftool session is out of sync after an earlier failure");
        }

        let mut request = String::new();
        for arg in args {
            // exiftool reads one argument per line.
            if arg.contains('\n') {
                bail!("argument contains a newline: {arg:?}");
            }
            request.push_str(arg);
            request.push('\n');
        }
        request.push_str("-execute\n");

        let result = self.exchange(&request).await;
        if result.is_err() {
            self.broken = true;
        }
        result
    }

    async fn exchange(&mut self, request: &str) -> Result<String> {
        self.stdin
            .write_all(request.as_bytes())
            .await
            .context("Failed to write to exiftool")?;
        self.stdin.flush().await.context("Failed to write to exiftool")?;

        // Read raw bytes: tag values are not guaranteed to be UTF-8, and a decode
        // error half-way through would leave the rest of the response in the pipe.
        let mut output = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = self
                .stdout
                .read_until(b'\n', &mut line)
                .await
                .context("Failed to read from exiftool")?;
            if read == 0 {
                bail!("exiftool exited unexpectedly");
            }
            let text = String::from_utf8_lossy(&line);
            if text.trim_end() == READY_MARKER {
                return Ok(output);
            }
            output.push_str(&text);
        }
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for ExifToolExtractor {
    fn name(&self) -> &str {
        "exiftool"
    }

    async fn extract(&self, path: &Path) -> Result<MetadataRecord> {
        let path = path
            .to_str()
            .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))?;

        let mut args = vec!["-json".to_string(), format!("-{FILE_TYPE_FIELD}")];
        args.extend(TIMESTAMP_FIELDS.iter().map(|f| format!("-{f}")));
        args.push(path.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = self.session.lock().await.execute(&args).await?;
        Ok(parse_json_output(&output))
    }
}

/// Turn exiftool's `-json` output for a single file into a record.
///
/// exiftool prints nothing on stdout when it cannot read the file at all, and an
/// `Error` field when it can open the file but not parse it.
fn parse_json_output(output: &str) -> MetadataRecord {
    if output.trim().is_empty() {
        return MetadataRecord::failed("exiftool returned no metadata");
    }

    let objects: Vec<HashMap<String, Value>> = match serde_json::from_str(output) {
        Ok(objects) => objects,
        Err(e) => return MetadataRecord::failed(format!("unreadable exiftool output: {e}")),
    };
    let Some(object) = objects.into_iter().next() else {
        return MetadataRecord::failed("exiftool returned no metadata");
    };

    if let Some(error) = object.get("Error") {
        return MetadataRecord::failed(value_to_string(error));
    }

    object
        .into_iter()
        .filter(|(key, _)| key != "SourceFile")
        .map(|(key, value)| (key, value_to_string(&value)))
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
