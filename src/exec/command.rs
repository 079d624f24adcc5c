// src/exec/command.rs

//! External process execution scoped to an execution context.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RunContext;
use crate::errors::{Result, RuntreeError};
use crate::exec::Output;

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `program args...` in the context's current directory.
///
/// - The working directory is the root directory joined with the current
///   resolved path.
/// - The managed tool directory is prepended to `PATH`.
/// - stdout/stderr are copied into the context's output sink.
/// - The process leads its own process group. If the context is cancelled,
///   the whole group gets an interrupt, then a kill once the grace period has
///   passed.
/// - Output still arriving more than one grace period after the process
///   exited (a background grandchild holding the pipes) is abandoned.
///
/// Does nothing in collect mode.
pub async fn run_command(ctx: &RunContext, program: &str, args: &[String]) -> Result<()> {
    if ctx.is_collecting() {
        return Ok(());
    }

    let command_line = display_command(program, args);
    let dir = ctx.working_dir();

    if ctx.verbose() {
        ctx.println(format!("$ {command_line}"))?;
    }

    info!(command = %command_line, dir = %dir.display(), "starting process");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(path) = prepend_path(&ctx.tool_dir()) {
        cmd.env("PATH", path);
    }

    let mut child = cmd.spawn().map_err(|source| RuntreeError::Spawn {
        command: command_line.clone(),
        source,
    })?;

    let stdout_pump = child
        .stdout
        .take()
        .map(|s| spawn_pump(s, ctx.output().clone(), Stream::Stdout));
    let stderr_pump = child
        .stderr
        .take()
        .map(|s| spawn_pump(s, ctx.output().clone(), Stream::Stderr));

    // The child leads its group, so its pid is the group id. Captured now
    // because `Child::id` is gone once the child is reaped.
    let group = child.id();
    let cancel = ctx.cancel_token().clone();
    let grace = ctx.shutdown_grace();

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res?;
            join_pumps([stdout_pump, stderr_pump], grace).await;

            let code = status.code().unwrap_or(-1);
            info!(
                command = %command_line,
                exit_code = code,
                success = status.success(),
                "process exited"
            );

            if status.success() {
                Ok(())
            } else {
                Err(RuntreeError::CommandFailed { command: command_line, code })
            }
        }

        _ = cancel.cancelled() => {
            shutdown(&mut child, group, grace, &command_line).await;
            join_pumps([stdout_pump, stderr_pump], grace).await;
            Err(RuntreeError::Cancelled)
        }
    }
}

/// Interrupt first, kill after `grace` if the process is still around.
async fn shutdown(child: &mut Child, group: Option<u32>, grace: Duration, command_line: &str) {
    if signal_group(group, GroupSignal::Interrupt) {
        info!(command = %command_line, "cancellation requested; sent interrupt");

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(command = %command_line, ?status, "process exited after interrupt");
                // Descendants that ignored the interrupt go down with the group.
                signal_group(group, GroupSignal::Kill);
                return;
            }
            Ok(Err(e)) => {
                warn!(
                    command = %command_line,
                    error = %e,
                    "waiting for interrupted process failed"
                );
            }
            Err(_) => {
                warn!(
                    command = %command_line,
                    grace_secs = grace.as_secs_f64(),
                    "process still running after grace period; killing"
                );
            }
        }
    }

    signal_group(group, GroupSignal::Kill);
    if let Err(e) = child.kill().await {
        warn!(
            command = %command_line,
            error = %e,
            "failed to kill child process on cancellation"
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Interrupt,
    Kill,
}

/// Signal process group `group`. Returns whether it was sent.
#[cfg(unix)]
fn signal_group(group: Option<u32>, signal: GroupSignal) -> bool {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = group else {
        return false;
    };
    let signal = match signal {
        GroupSignal::Interrupt => Signal::SIGINT,
        GroupSignal::Kill => Signal::SIGKILL,
    };
    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) => true,
        Err(e) => {
            debug!(pid, ?signal, error = %e, "signalling process group failed");
            false
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_group: Option<u32>, _signal: GroupSignal) -> bool {
    false
}

fn spawn_pump<R>(mut reader: R, output: Output, stream: Stream) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let res = match stream {
                        Stream::Stdout => output.write_stdout(&buf[..n]),
                        Stream::Stderr => output.write_stderr(&buf[..n]),
                    };
                    if let Err(e) = res {
                        debug!(?stream, error = %e, "dropping process output");
                    }
                }
                Err(e) => {
                    debug!(?stream, error = %e, "reading process output failed");
                    break;
                }
            }
        }
    })
}

async fn join_pumps(pumps: [Option<JoinHandle<()>>; 2], limit: Duration) {
    for mut pump in pumps.into_iter().flatten() {
        match tokio::time::timeout(limit, &mut pump).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "output pump task failed"),
            Err(_) => {
                warn!(
                    limit_secs = limit.as_secs_f64(),
                    "process output still open after exit; abandoning it"
                );
                pump.abort();
            }
        }
    }
}

fn prepend_path(dir: &Path) -> Option<OsString> {
    let existing = std::env::var_os("PATH").unwrap_or_default();
    let paths = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(&existing));
    std::env::join_paths(paths).ok()
}

fn display_command(program: &str, args: &[String]) -> String {
    let mut s = program.to_string();
    for arg in args {
        s.push(' ');
        s.push_str(arg);
    }
    s
}
