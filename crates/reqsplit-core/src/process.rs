use std::{
    io::{self, Read},
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{anyhow, bail, Context, Result};

pub(crate) const DEFAULT_MAX_CAPTURE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Either stream went past the capture limit.
    pub truncated: bool,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs `program` to completion with stdin closed, keeping at most `limit`
/// bytes of stdout and of stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned, waited on, or its
/// output streams cannot be read.
pub fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
    limit: usize,
) -> Result<RunOutput> {
    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(key, value)| (key, value)))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        bail!("{program} was started without captured output");
    };

    let (stdout, stderr) = thread::scope(|scope| -> Result<(Capture, Capture)> {
        let stderr_reader = scope.spawn(move || Capture::read(stderr, limit));
        let stdout = Capture::read(stdout, limit)
            .with_context(|| format!("failed to read stdout of {program}"))?;
        let stderr = stderr_reader
            .join()
            .map_err(|_| anyhow!("stderr reader for {program} panicked"))?
            .with_context(|| format!("failed to read stderr of {program}"))?;
        Ok((stdout, stderr))
    })?;
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;

    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        truncated: stdout.truncated || stderr.truncated,
        stdout: stdout.text,
        stderr: stderr.text,
    })
}

struct Capture {
    text: String,
    truncated: bool,
}

impl Capture {
    /// Keeps the first `limit` bytes and drains the rest so the child never
    /// blocks on a full pipe.
    fn read(mut reader: impl Read, limit: usize) -> io::Result<Self> {
        let mut kept = Vec::new();
        (&mut reader)
            .take(u64::try_from(limit).unwrap_or(u64::MAX))
            .read_to_end(&mut kept)?;
        let dropped = io::copy(&mut reader, &mut io::sink())?;
        Ok(Self {
            text: String::from_utf8_lossy(&kept).into_owned(),
            truncated: dropped > 0,
        })
    }
}
