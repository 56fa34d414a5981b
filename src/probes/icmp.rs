use super::resolve::resolve_host;
use super::{ErrorKind, Probe, ProbeFailure, ProbeOutcome};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::debug;

/// Headroom left between ping's own reply wait and the probe deadline, so a
/// silent host is reported by ping before the child is killed.
const DEADLINE_MARGIN: Duration = Duration::from_millis(500);

/// ICMP echo probe wrapper (uses system ping).
///
/// The child process is killed if the deadline passes first.
pub struct IcmpProbe {
    program: PathBuf,
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ping"),
        }
    }
}

impl IcmpProbe {
    /// Use `program` instead of the `ping` found on `PATH`. It must accept
    /// iputils arguments and exit codes.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl Probe for IcmpProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> ProbeOutcome {
        let deadline = tokio::time::Instant::now() + timeout;

        let ip = match timeout_at(deadline, resolve_host(host)).await {
            Ok(Ok(ip)) => ip,
            Ok(Err(failure)) => return ProbeOutcome::failed(failure),
            Err(_) => return ProbeOutcome::failed(ProbeFailure::timed_out(timeout)),
        };

        // ping only waits in whole seconds. With less than a second to spare
        // it still gets -W 1, but its "no reply" no longer fits the deadline.
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let wait_secs = remaining.saturating_sub(DEADLINE_MARGIN).as_secs();
        let wait_fits = wait_secs >= 1;

        // -c 1: one echo request
        // -n: numeric output, no reverse lookup
        // -W N: reply wait in whole seconds
        let start = Instant::now();
        let output = timeout_at(
            deadline,
            tokio::process::Command::new(&self.program)
                .arg("-c")
                .arg("1")
                .arg("-n")
                .arg("-W")
                .arg(wait_secs.max(1).to_string())
                .arg(ip.to_string())
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;
        let elapsed = start.elapsed();

        let output = match output {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ProbeOutcome::failed(ProbeFailure::new(
                    ErrorKind::Unknown,
                    format!("failed to execute {}: {e}", self.program.display()),
                ))
            }
            Err(_) => return ProbeOutcome::failed(ProbeFailure::timed_out(timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);

        if output.status.success() {
            debug!(
                %host,
                %ip,
                reported_rtt_ms = reply_rtt_ms(&stdout),
                elapsed_ms = elapsed.as_millis() as u64,
                "Echo reply received"
            );
            return ProbeOutcome::Reachable { elapsed };
        }

        // iputils ping exits 1 when no reply arrived, which includes an ICMP
        // error answer from a router, and 2 on other errors.
        if output.status.code() == Some(1) {
            if let Some(line) = unreachable_reply(&stdout) {
                debug!(%host, %ip, reply = line, "Destination unreachable");
                return ProbeOutcome::failed(ProbeFailure::new(ErrorKind::IoFailure, line));
            }
            if !wait_fits {
                return ProbeOutcome::failed(ProbeFailure::timed_out(timeout));
            }
            debug!(%host, %ip, wait_secs, "No echo reply");
            return ProbeOutcome::Unreachable { failure: None };
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        ProbeOutcome::failed(classify_ping_error(stderr.trim(), output.status.code()))
    }
}

/// Classify a ping run that failed before it could send.
///
/// Name errors cannot occur here: ping is only ever handed an IP literal.
fn classify_ping_error(stderr: &str, code: Option<i32>) -> ProbeFailure {
    let lower = stderr.to_ascii_lowercase();
    let kind = if lower.contains("unreachable") || lower.contains("no route") {
        ErrorKind::IoFailure
    } else {
        ErrorKind::Unknown
    };

    let message = if stderr.is_empty() {
        match code {
            Some(code) => format!("ping exited with status {code}"),
            None => "ping terminated by signal".to_string(),
        }
    } else {
        stderr.to_string()
    };

    ProbeFailure::new(kind, message)
}

/// The line of an ICMP error answer, e.g.
/// `From 10.0.0.1 icmp_seq=1 Destination Host Unreachable`.
fn unreachable_reply(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.contains("Unreachable"))
}

/// Round trip ping printed on its reply line (`time=0.045 ms`).
fn reply_rtt_ms(stdout: &str) -> Option<f64> {
    stdout
        .split_whitespace()
        .find_map(|token| token.strip_prefix("time="))
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_rtt() {
        let out = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=14.2 ms\n";
        assert_eq!(reply_rtt_ms(out), Some(14.2));
        assert_eq!(reply_rtt_ms("1 packets transmitted, 0 received"), None);
    }

    #[test]
    fn test_unreachable_reply_line() {
        let out = "PING 192.0.2.1 (192.0.2.1) 56(84) bytes of data.\n\
                   From 192.0.2.254 icmp_seq=1 Destination Host Unreachable\n\n\
                   --- 192.0.2.1 ping statistics ---\n\
                   1 packets transmitted, 0 received, +1 errors, 100% packet loss\n";
        assert_eq!(
            unreachable_reply(out),
            Some("From 192.0.2.254 icmp_seq=1 Destination Host Unreachable")
        );
        assert_eq!(unreachable_reply("1 packets transmitted, 0 received"), None);
    }

    #[test]
    fn test_classify_ping_errors() {
        let failure = classify_ping_error("connect: Network is unreachable", Some(2));
        assert_eq!(failure.kind, ErrorKind::IoFailure);

        let failure = classify_ping_error("ping: socket: Operation not permitted", Some(2));
        assert_eq!(failure.kind, ErrorKind::Unknown);
        assert!(failure.message.contains("Operation not permitted"));

        let failure = classify_ping_error("", Some(2));
        assert_eq!(failure.message, "ping exited with status 2");
    }

    /// Stand-in `ping` that records its arguments next to itself.
    #[cfg(unix)]
    fn fake_ping(dir: &tempfile::TempDir, body: &str) -> IcmpProbe {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("ping");
        let script = format!(
            "#!/bin/sh\necho \"$@\" > \"$(dirname \"$0\")/args\"\n{body}\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        IcmpProbe::with_program(path)
    }

    #[cfg(unix)]
    fn recorded_args(dir: &tempfile::TempDir) -> String {
        std::fs::read_to_string(dir.path().join("args")).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_host_is_plain_negative() {
        let dir = tempfile::tempdir().unwrap();
        // Waits out its -W, then reports no reply the way iputils does.
        let ping = fake_ping(
            &dir,
            "while [ $# -gt 0 ]; do [ \"$1\" = \"-W\" ] && wait=\"$2\"; shift; done\n\
             sleep \"$wait\"\n\
             echo '1 packets transmitted, 0 received, 100% packet loss'\n\
             exit 1",
        );

        let outcome = ping.probe("192.0.2.1", Duration::from_millis(2000)).await;
        assert_eq!(outcome, ProbeOutcome::Unreachable { failure: None });
        assert_eq!(recorded_args(&dir).trim(), "-c 1 -n -W 1 192.0.2.1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reply_wait_leaves_margin_before_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(&dir, "exit 1");

        let outcome = ping.probe("192.0.2.1", Duration::from_millis(5000)).await;
        assert_eq!(outcome, ProbeOutcome::Unreachable { failure: None });
        assert!(recorded_args(&dir).contains("-W 4 "));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_reply_under_a_second_is_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(&dir, "exit 1");

        let outcome = ping.probe("192.0.2.1", Duration::from_millis(800)).await;
        let failure = outcome.failure().expect("failure detail");
        assert_eq!(failure.kind, ErrorKind::Timeout);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_destination_unreachable_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(
            &dir,
            "echo 'From 192.0.2.254 icmp_seq=1 Destination Host Unreachable'\n\
             echo '1 packets transmitted, 0 received, +1 errors, 100% packet loss'\n\
             exit 1",
        );

        let outcome = ping.probe("192.0.2.1", Duration::from_millis(2000)).await;
        let failure = outcome.failure().expect("failure detail");
        assert_eq!(failure.kind, ErrorKind::IoFailure);
        assert!(failure.message.contains("Destination Host Unreachable"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_reply_is_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(
            &dir,
            "echo '64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.045 ms'\nexit 0",
        );

        let outcome = ping.probe("127.0.0.1", Duration::from_millis(2000)).await;
        assert!(outcome.is_reachable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_ping_is_killed_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(&dir, "exec sleep 30");

        let started = Instant::now();
        let outcome = ping.probe("192.0.2.1", Duration::from_millis(300)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        let failure = outcome.failure().expect("failure detail");
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert_eq!(failure.message, "no answer within 300 ms");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_error_exit_uses_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let ping = fake_ping(&dir, "echo 'ping: socket: Operation not permitted' >&2\nexit 2");

        let outcome = ping.probe("192.0.2.1", Duration::from_millis(2000)).await;
        let failure = outcome.failure().expect("failure detail");
        assert_eq!(failure.kind, ErrorKind::Unknown);
        assert_eq!(failure.message, "ping: socket: Operation not permitted");
    }
}
