//! Limited runner implementation
//!
//! Runs one process directly on the host while enforcing wall-clock, CPU-time
//! and memory limits. The process gets its own process group so that every
//! kill also reaches whatever it forked. It is reaped with `wait4` so that CPU
//! time and the memory high-water mark come from the kernel.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::libc;
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::sys::time::TimeVal;
use nix::unistd::{setpgid, Pid};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::monitor::MemoryMonitor;
use super::{CommandSpec, ExitKind, RunLimits, RunOutcome, Runner};
use crate::config::JudgeConfig;

/// How long pipe readers may keep running after the child is gone
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What the kernel reports for a reaped process
#[derive(Debug, Clone, Copy)]
struct Reaped {
    status: ExitStatus,
    /// User plus system time of the process and the children it reaped
    cpu_time: Duration,
    /// Resident memory high-water mark in bytes
    max_rss: u64,
}

/// Why the supervising loop stopped
#[derive(Clone, Copy)]
enum Supervision {
    Exited(Reaped),
    WallTimeExceeded,
    MemoryExceeded,
}

/// Runner that enforces time and memory limits on a directly spawned process
pub struct LimitedRunner {
    /// Cap on captured stdout/stderr bytes, per stream
    output_limit: usize,
    /// Memory sampling period
    poll_interval: Duration,
}

impl LimitedRunner {
    pub fn new(output_limit: usize, poll_interval: Duration) -> Self {
        Self {
            output_limit,
            poll_interval,
        }
    }

    pub fn from_config(config: &JudgeConfig) -> Self {
        Self::new(config.output_limit_bytes, config.memory_poll_interval)
    }

    /// Run a program under limits
    ///
    /// Setup failures are logged and reported as `Signaled(None)`.
    pub async fn execute(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&[u8]>,
    ) -> RunOutcome {
        match self.supervise(cmd, limits, stdin).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to run {}: {:#}", cmd.program, e);
                RunOutcome::failed_to_start()
            }
        }
    }

    async fn supervise(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&[u8]>,
    ) -> Result<RunOutcome> {
        if cmd.program.is_empty() {
            bail!("No command specified for execution");
        }

        let program = cmd.resolved_program();
        let mut command = Command::new(&program);
        command
            .args(&cmd.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }

        // An unprivileged process cannot raise its hard limit
        let (_, cpu_hard) = getrlimit(Resource::RLIMIT_CPU).context("Failed to read RLIMIT_CPU")?;
        let cpu_secs = cpu_rlimit_secs(limits.cpu_time);
        let (cpu_soft, cpu_hard) = (cpu_secs.min(cpu_hard), (cpu_secs + 1).min(cpu_hard));
        // SAFETY: the hook only issues setpgid/setrlimit, which are
        // async-signal-safe, between fork and exec.
        unsafe {
            command.pre_exec(move || {
                setpgid(Pid::from_raw(0), Pid::from_raw(0))?;
                setrlimit(Resource::RLIMIT_CPU, cpu_soft, cpu_hard)?;
                setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
                Ok(())
            });
        }

        debug!("Spawning {:?} {:?} in {:?}", program, cmd.args, cmd.work_dir);
        let started = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program.display()))?;
        let pid = child.id();

        let pipes = (
            child.stdin.take().map(ChildStdin::from_std).transpose(),
            child.stdout.take().map(ChildStdout::from_std).transpose(),
            child.stderr.take().map(ChildStderr::from_std).transpose(),
        );
        let mut reaper = tokio::task::spawn_blocking(move || reap(child));
        let (stdin_pipe, stdout_pipe, stderr_pipe) = match pipes {
            (Ok(pipe_in), Ok(pipe_out), Ok(pipe_err)) => (pipe_in, pipe_out, pipe_err),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                kill_group(pid);
                let _ = reaper.await;
                return Err(e).context("Failed to register child pipes");
            }
        };

        let stdin_task = match (stdin_pipe, stdin) {
            (Some(mut pipe), Some(input)) => {
                let input = input.to_vec();
                Some(tokio::spawn(async move {
                    // A program that never reads its input closes the pipe early
                    if let Err(e) = pipe.write_all(&input).await {
                        debug!("Stdin write stopped: {}", e);
                    }
                }))
            }
            _ => None,
        };
        let mut stdout_task = tokio::spawn(read_capped(stdout_pipe, self.output_limit));
        let mut stderr_task = tokio::spawn(read_capped(stderr_pipe, self.output_limit));

        let mut monitor = MemoryMonitor::new(pid);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(limits.wall_time);
        tokio::pin!(deadline);

        let supervision = loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if monitor.sample() > limits.memory_bytes {
                        break Supervision::MemoryExceeded;
                    }
                }
                reaped = &mut reaper => {
                    let reaped = reaped
                        .context("Reaper task failed")?
                        .context("Failed to wait for process")?;
                    break Supervision::Exited(reaped);
                }
                _ = &mut deadline => {
                    if monitor.sample() > limits.memory_bytes {
                        break Supervision::MemoryExceeded;
                    }
                    break Supervision::WallTimeExceeded;
                }
            }
        };

        // Leftover group members must not outlive the run
        kill_group(pid);
        let reaped = match supervision {
            Supervision::Exited(reaped) => reaped,
            _ => reaper
                .await
                .context("Reaper task failed")?
                .context("Failed to reap killed process")?,
        };

        let wall_time = started.elapsed();
        let cpu_time = reaped.cpu_time;
        let peak = monitor.peak().max(reaped.max_rss);

        if let Some(task) = stdin_task {
            task.abort();
        }
        let stdout = collect_output(&mut stdout_task).await;
        let stderr = collect_output(&mut stderr_task).await;

        let exit = match supervision {
            Supervision::MemoryExceeded => ExitKind::MemoryExceeded,
            Supervision::WallTimeExceeded => ExitKind::TimeExceeded,
            Supervision::Exited(reaped) => classify_exit(reaped.status, peak, cpu_time, limits),
        };

        let (time, wall_time, memory) = match exit {
            ExitKind::TimeExceeded => {
                let wall = if matches!(supervision, Supervision::WallTimeExceeded) {
                    limits.wall_time
                } else {
                    wall_time
                };
                (limits.cpu_time, wall, peak.min(limits.memory_bytes))
            }
            ExitKind::MemoryExceeded => (
                cpu_time.min(limits.cpu_time),
                wall_time,
                limits.memory_bytes,
            ),
            _ => (cpu_time.min(limits.cpu_time), wall_time, peak),
        };

        debug!(
            "Process {} finished: {:?}, cpu {:?}, wall {:?}, memory {} bytes",
            pid, exit, time, wall_time, memory
        );

        Ok(RunOutcome {
            exit,
            time,
            wall_time,
            memory,
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl Runner for LimitedRunner {
    async fn run(&self, cmd: &CommandSpec, limits: &RunLimits, stdin: Option<&[u8]>) -> RunOutcome {
        self.execute(cmd, limits, stdin).await
    }
}

/// Interpret the status of a process that exited on its own
fn classify_exit(status: ExitStatus, peak: u64, cpu_time: Duration, limits: &RunLimits) -> ExitKind {
    if peak > limits.memory_bytes {
        return ExitKind::MemoryExceeded;
    }

    let signal = status.signal();
    if signal == Some(Signal::SIGXCPU as i32) || cpu_time > limits.cpu_time {
        return ExitKind::TimeExceeded;
    }

    match signal {
        Some(sig) => ExitKind::Signaled(Some(sig)),
        None => ExitKind::Normal(status.code().unwrap_or(-1)),
    }
}

/// Kernel CPU limit in whole seconds, one second above the enforced limit
fn cpu_rlimit_secs(cpu_time: Duration) -> u64 {
    let whole = cpu_time.as_secs() + u64::from(cpu_time.subsec_nanos() > 0);
    whole + 1
}

fn kill_group(pid: u32) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    // ESRCH just means the whole group is already gone
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            warn!("Failed to kill process group {}: {}", raw, e);
        }
    }
}

/// Block until the child terminates and collect its resource usage
fn reap(child: Child) -> nix::Result<Reaped> {
    let pid = child.id() as libc::pid_t;
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain data, an all-zero value is valid
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: both out-pointers are valid for the whole call
        let ret = unsafe { libc::wait4(pid, &mut status, 0, &mut usage) };
        match Errno::result(ret) {
            Ok(_) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Reaped {
        status: ExitStatus::from_raw(status),
        cpu_time: timeval_to_duration(TimeVal::from(usage.ru_utime))
            + timeval_to_duration(TimeVal::from(usage.ru_stime)),
        // Linux reports kilobytes
        max_rss: u64::try_from(usage.ru_maxrss).unwrap_or(0) * 1024,
    })
}

fn timeval_to_duration(tv: TimeVal) -> Duration {
    Duration::from_secs(tv.tv_sec().max(0) as u64) + Duration::from_micros(tv.tv_usec().max(0) as u64)
}

/// Read a pipe to the end, keeping at most `limit` bytes
async fn read_capped<R: AsyncRead + Unpin>(pipe: Option<R>, limit: usize) -> Vec<u8> {
    let mut captured = Vec::new();
    let Some(mut pipe) = pipe else {
        return captured;
    };

    if let Err(e) = (&mut pipe).take(limit as u64).read_to_end(&mut captured).await {
        debug!("Pipe read stopped: {}", e);
        return captured;
    }
    // Keep draining so the writer never blocks on a full pipe
    if let Err(e) = tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await {
        debug!("Pipe drain stopped: {}", e);
    }
    captured
}

async fn collect_output(task: &mut JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(PIPE_DRAIN_TIMEOUT, &mut *task).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!("Output reader failed: {}", e);
            Vec::new()
        }
        Err(_) => {
            task.abort();
            warn!("Output reader did not finish after the process ended");
            Vec::new()
        }
    }
}
