use crate::types::JsValue;

/// Completion records (§6.2.3). Every evaluator step produces one of
/// these; abstract operations that can only complete normally or throw
/// use the `Result<T, JsValue>` projection instead, with the thrown value
/// as the error. The two encodings never mix within one function.
///
/// `Suspend` is not one of the standard's completion types: it is the
/// engine-internal
/// signal that a generator or async body reached a suspension point
/// during a replay run. It never escapes the generator/async drivers in
/// `function.rs`.
#[derive(Clone, Debug)]
pub enum Completion {
    Normal(JsValue),
    Return(JsValue),
    Throw(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
    Suspend(SuspendKind, JsValue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuspendKind {
    Yield,
    Await,
}

impl Completion {
    /// `normal/empty`: a normal completion with no interesting value.
    pub fn empty() -> Completion {
        Completion::Normal(JsValue::Undefined)
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    /// UpdateEmpty (§6.2.3.4): loops and blocks keep the last meaningful
    /// statement value. Break/continue pass through untouched.
    pub fn update_value(self, previous: JsValue) -> Completion {
        match self {
            Completion::Normal(JsValue::Undefined) => Completion::Normal(previous),
            other => other,
        }
    }

    /// Consume a `break` completion targeting this unlabelled construct
    /// or one of `labels`.
    pub fn consume_break(self, labels: &[String]) -> Completion {
        match self {
            Completion::Break(None) => Completion::empty(),
            Completion::Break(Some(l)) if labels.contains(&l) => Completion::empty(),
            other => other,
        }
    }

    /// Whether a `continue` completion belongs to this loop.
    pub fn is_continue_for(&self, labels: &[String]) -> bool {
        match self {
            Completion::Continue(None) => true,
            Completion::Continue(Some(l)) => labels.contains(l),
            _ => false,
        }
    }
}

/// Lift the normal-or-throw projection back into a completion.
impl From<Result<JsValue, JsValue>> for Completion {
    fn from(r: Result<JsValue, JsValue>) -> Completion {
        match r {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

/// The "?" propagation shorthand for evaluator code: extract a normal
/// value or return the abrupt completion to the caller.
#[macro_export]
macro_rules! try_normal {
    ($e:expr) => {
        match $e {
            $crate::interpreter::Completion::Normal(v) => v,
            abrupt => return abrupt,
        }
    };
}

/// Like `try_normal!` but for `Result`-shaped abstract operations called
/// from completion-shaped evaluator code.
#[macro_export]
macro_rules! try_op {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return $crate::interpreter::Completion::Throw(e),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsValue;

    #[test]
    fn update_value_keeps_previous_on_empty() {
        let c = Completion::empty().update_value(JsValue::Number(3.0));
        assert!(matches!(c, Completion::Normal(JsValue::Number(n)) if n == 3.0));
        let c = Completion::Normal(JsValue::Number(7.0)).update_value(JsValue::Number(3.0));
        assert!(matches!(c, Completion::Normal(JsValue::Number(n)) if n == 7.0));
    }

    #[test]
    fn break_consumption_respects_labels() {
        let labels = vec!["outer".to_string()];
        assert!(!Completion::Break(None).consume_break(&labels).is_abrupt());
        assert!(!Completion::Break(Some("outer".into()))
            .consume_break(&labels)
            .is_abrupt());
        assert!(Completion::Break(Some("other".into()))
            .consume_break(&labels)
            .is_abrupt());
    }

    #[test]
    fn continue_matching() {
        let labels = vec!["l".to_string()];
        assert!(Completion::Continue(None).is_continue_for(&labels));
        assert!(Completion::Continue(Some("l".into())).is_continue_for(&labels));
        assert!(!Completion::Continue(Some("x".into())).is_continue_for(&labels));
    }
}
