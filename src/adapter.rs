//! Adapter - the common surface of every generated adapter, and the
//! runtime-checked path for adapters whose model is only known at runtime.
//!
//! ## Example
//!
//! ```ignore
//! use erased_rust::{AnyAdapter, EraseError};
//!
//! let erased = AnyAdapter::new(AnyRow::<File>::new(FileRow::new("a.txt")));
//!
//! assert!(erased.is::<AnyRow<File>>());
//! assert!(matches!(
//!     erased.downcast_ref::<AnyRow<Folder>>(),
//!     Err(EraseError::BindingMismatch { .. })
//! ));
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;

use tracing::debug;

use crate::error::{EraseError, Rejected};

/// Implemented by every adapter `#[erasable]` generates.
pub trait Adapter: 'static {
    /// The model the adapter was bound to at construction.
    type Model: 'static;

    /// Name of the erased capability trait.
    const CAPABILITY: &'static str;
}

/// What an erased adapter was bound to: its capability and its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    capability: &'static str,
    model: &'static str,
    model_id: TypeId,
    adapter: &'static str,
}

impl Binding {
    /// The binding of adapter type `A`.
    pub fn of<A: Adapter>() -> Self {
        Self {
            capability: A::CAPABILITY,
            model: type_name::<A::Model>(),
            model_id: TypeId::of::<A::Model>(),
            adapter: type_name::<A>(),
        }
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn model_id(&self) -> TypeId {
        self.model_id
    }

    /// Whether the bound model is `M`.
    pub fn is_model<M: 'static>(&self) -> bool {
        self.model_id == TypeId::of::<M>()
    }

    /// The error explaining why this binding is not adapter `A`.
    fn mismatch<A: Adapter>(&self) -> EraseError {
        if self.capability == A::CAPABILITY && !self.is_model::<A::Model>() {
            EraseError::BindingMismatch {
                capability: self.capability,
                expected: type_name::<A::Model>(),
                found: self.model,
            }
        } else {
            EraseError::UnsupportedCapability {
                expected: type_name::<A>(),
                found: self.adapter,
            }
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.capability, self.model)
    }
}

/// Any adapter, with its model checked at runtime instead of compile time.
///
/// Use this where adapters over different models must share a container.
/// Recovering the typed adapter never coerces: asking for the wrong model or
/// the wrong capability returns an [`EraseError`].
pub struct AnyAdapter {
    binding: Binding,
    adapter: Box<dyn Any>,
}

impl AnyAdapter {
    pub fn new<A: Adapter>(adapter: A) -> Self {
        Self {
            binding: Binding::of::<A>(),
            adapter: Box::new(adapter),
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn is<A: Adapter>(&self) -> bool {
        self.adapter.is::<A>()
    }

    /// Recover the typed adapter by value. On failure the erased adapter is
    /// handed back inside the error.
    pub fn downcast<A: Adapter>(self) -> Result<A, Rejected> {
        let binding = self.binding;
        match self.adapter.downcast::<A>() {
            Ok(adapter) => Ok(*adapter),
            Err(adapter) => {
                let error = binding.mismatch::<A>();
                debug!(binding = %binding, error = %error, "rejected adapter downcast");
                Err(Rejected::new(error, AnyAdapter { binding, adapter }))
            }
        }
    }

    pub fn downcast_ref<A: Adapter>(&self) -> Result<&A, EraseError> {
        match self.adapter.downcast_ref::<A>() {
            Some(adapter) => Ok(adapter),
            None => Err(self.reject::<A>()),
        }
    }

    pub fn downcast_mut<A: Adapter>(&mut self) -> Result<&mut A, EraseError> {
        let binding = self.binding;
        match self.adapter.downcast_mut::<A>() {
            Some(adapter) => Ok(adapter),
            None => {
                let error = binding.mismatch::<A>();
                debug!(binding = %binding, error = %error, "rejected adapter downcast");
                Err(error)
            }
        }
    }

    fn reject<A: Adapter>(&self) -> EraseError {
        let error = self.binding.mismatch::<A>();
        debug!(binding = %self.binding, error = %error, "rejected adapter downcast");
        error
    }
}

impl fmt::Debug for AnyAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyAdapter")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
