//! Timeout governor: races a running session against its deadline

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::warn;

use crate::error::ExecError;
use crate::session::Session;

/// How long to keep collecting in-flight output after a forced close
pub const TERMINATION_GRACE: Duration = Duration::from_millis(500);

/// Per-call deadline from whole seconds; zero or negative disables it
#[must_use]
pub fn deadline_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Wait for `session` to finish, terminating it if `deadline` passes first
///
/// Completion and expiry are exclusive: when both are ready in the same poll
/// the completed command wins. On expiry the session is killed and closed,
/// output already in flight is collected for [`TERMINATION_GRACE`], and a
/// timeout error is reported.
///
/// # Errors
/// Returns the command's own error, or `ExecError::Timeout` on expiry
pub async fn await_with_deadline(
    session: &mut Session,
    deadline: Option<Duration>,
) -> Result<(), ExecError> {
    let Some(limit) = deadline else {
        return session.wait().await;
    };

    let start = Instant::now();

    let finished = tokio::select! {
        biased;
        result = session.wait() => Some(result),
        () = sleep(limit) => None,
    };

    if let Some(result) = finished {
        return result;
    }

    warn!(
        timeout = ?limit,
        elapsed = ?start.elapsed(),
        "command timed out, terminating session"
    );

    session.terminate().await;
    session.drain(TERMINATION_GRACE).await;

    Err(ExecError::Timeout { timeout: limit })
}
