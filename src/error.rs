use std::fmt;

use crate::AnyAdapter;

/// Why an erased adapter could not be recovered as the requested type.
///
/// Statically typed construction never produces these: a mismatched model
/// does not compile. They only arise on the dynamic path through
/// [`AnyAdapter`], where the model is known at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EraseError {
    /// Same capability, different model type.
    BindingMismatch {
        capability: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// The adapter erases a different capability altogether.
    UnsupportedCapability {
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for EraseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EraseError::BindingMismatch {
                capability,
                expected,
                found,
            } => write!(
                f,
                "{} adapter is bound to model {}, not {}",
                capability, found, expected
            ),
            EraseError::UnsupportedCapability { expected, found } => {
                write!(f, "expected a {} adapter, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for EraseError {}

/// A by-value downcast that failed. Carries the adapter back to the caller.
pub struct Rejected {
    error: EraseError,
    adapter: AnyAdapter,
}

impl Rejected {
    pub(crate) fn new(error: EraseError, adapter: AnyAdapter) -> Self {
        Self { error, adapter }
    }

    pub fn error(&self) -> &EraseError {
        &self.error
    }

    /// Recover the adapter that was not the requested type.
    pub fn into_inner(self) -> AnyAdapter {
        self.adapter
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .field("binding", self.adapter.binding())
            .finish()
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Rejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
