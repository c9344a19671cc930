//! Ordered return values carried from a worker to a pending call

use tether_exec::{ExecError, ExecOutput};

/// One value pushed onto a completion channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnValue {
    Text(String),
    Error(ExecError),
}

/// A call result that can travel as an ordered list of values
pub trait CallResult: Sized + Send + 'static {
    /// Most values this result ever produces; sizes the completion channel
    const MAX_VALUES: usize;

    /// Values in delivery order
    fn into_values(self) -> Vec<ReturnValue>;

    /// Rebuild the result from every value the worker delivered
    fn from_values(values: Vec<ReturnValue>) -> Self;

    /// Result reported when the worker died without finishing
    fn interrupted() -> Self;
}

/// `connect`: no values on success, the error on failure
impl CallResult for Result<(), ExecError> {
    const MAX_VALUES: usize = 1;

    fn into_values(self) -> Vec<ReturnValue> {
        match self {
            Ok(()) => Vec::new(),
            Err(e) => vec![ReturnValue::Error(e)],
        }
    }

    fn from_values(values: Vec<ReturnValue>) -> Self {
        match values.as_slice() {
            [] => Ok(()),
            [ReturnValue::Error(e)] => Err(e.clone()),
            _ => Self::interrupted(),
        }
    }

    fn interrupted() -> Self {
        Err(ExecError::Interrupted)
    }
}

/// `exec`: stdout, stderr, then the error if there is one
impl CallResult for ExecOutput {
    const MAX_VALUES: usize = 3;

    fn into_values(self) -> Vec<ReturnValue> {
        let mut values = vec![ReturnValue::Text(self.stdout), ReturnValue::Text(self.stderr)];
        if let Err(e) = self.outcome {
            values.push(ReturnValue::Error(e));
        }
        values
    }

    fn from_values(values: Vec<ReturnValue>) -> Self {
        let mut values = values.into_iter();
        match (values.next(), values.next(), values.next(), values.next()) {
            (Some(ReturnValue::Text(stdout)), Some(ReturnValue::Text(stderr)), None, None) => {
                ExecOutput {
                    stdout,
                    stderr,
                    outcome: Ok(()),
                }
            }
            (
                Some(ReturnValue::Text(stdout)),
                Some(ReturnValue::Text(stderr)),
                Some(ReturnValue::Error(e)),
                None,
            ) => ExecOutput {
                stdout,
                stderr,
                outcome: Err(e),
            },
            _ => Self::interrupted(),
        }
    }

    fn interrupted() -> Self {
        ExecOutput::failed(ExecError::Interrupted)
    }
}
