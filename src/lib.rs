//! Type-erased adapters for capability traits with associated types.
//!
//! A trait with an associated type cannot be used as `dyn Trait` without
//! fixing that type, so implementations of different concrete types cannot
//! share a `Vec`. `#[erasable]` generates an adapter that is generic over
//! the associated type only:
//!
//! ```
//! use erased_rust::erasable;
//!
//! pub struct File {
//!     pub name: String,
//! }
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn configure(&mut self, model: &Self::Model) -> String;
//! }
//!
//! struct FileRow;
//! struct ImageRow {
//!     configured: usize,
//! }
//!
//! impl Row for FileRow {
//!     type Model = File;
//!     fn configure(&mut self, model: &File) -> String {
//!         format!("file {}", model.name)
//!     }
//! }
//!
//! impl Row for ImageRow {
//!     type Model = File;
//!     fn configure(&mut self, model: &File) -> String {
//!         self.configured += 1;
//!         format!("image {} #{}", model.name, self.configured)
//!     }
//! }
//!
//! let mut rows: Vec<AnyRow<File>> = vec![
//!     AnyRow::new(FileRow),
//!     AnyRow::new(ImageRow { configured: 0 }),
//! ];
//!
//! let file = File { name: "a.png".to_string() };
//! let labels: Vec<String> = rows.iter_mut().map(|row| row.configure(&file)).collect();
//! assert_eq!(labels, ["file a.png", "image a.png #1"]);
//! ```
//!
//! Two strategies are available. The default boxed strategy holds one
//! `Box<dyn Handle<Model>>` over a private handle trait; `strategy =
//! "closure"` captures one closure per operation instead. Either way the
//! adapter implements the capability trait itself and forwards every call
//! unchanged.
//!
//! For reference semantics, erase a clone of a [`Shared`] or [`SyncShared`]
//! handle (see `#[erasable(shared)]`). For adapters whose model is only
//! known at runtime, see [`AnyAdapter`].
//!
//! # Rejected at compile time
//!
//! An implementation bound to a different model does not fit the adapter:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! pub struct File;
//! pub struct Folder;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn configure(&mut self, model: &Self::Model);
//! }
//!
//! struct FileRow;
//! impl Row for FileRow {
//!     type Model = File;
//!     fn configure(&mut self, _: &File) {}
//! }
//!
//! let row: AnyRow<Folder> = AnyRow::new(FileRow);
//! ```
//!
//! The abstract handle behind an adapter cannot be named, and an adapter
//! cannot be assembled without an implementation:
//!
//! ```compile_fail
//! mod rows {
//!     use erased_rust::erasable;
//!
//!     pub struct File;
//!
//!     #[erasable]
//!     pub trait Row {
//!         type Model;
//!         fn configure(&mut self, model: &Self::Model);
//!     }
//! }
//!
//! let handle: Box<dyn rows::__AnyRowHandle<rows::File>> = todo!();
//! ```
//!
//! ```compile_fail
//! mod rows {
//!     use erased_rust::erasable;
//!
//!     pub struct File;
//!
//!     #[erasable(strategy = "closure")]
//!     pub trait Row {
//!         type Model;
//!         fn configure(&mut self, model: &Self::Model);
//!     }
//! }
//!
//! let row = rows::AnyRow::<rows::File> {
//!     configure: Box::new(|_| {}),
//!     __bound: std::rc::Rc::new(()),
//! };
//! ```
//!
//! An implementation that leaves an operation out is not an implementation:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! pub struct File;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn configure(&mut self, model: &Self::Model);
//!     fn name(&self) -> String;
//! }
//!
//! struct FileRow;
//! impl Row for FileRow {
//!     type Model = File;
//!     fn configure(&mut self, _: &File) {}
//! }
//!
//! let row = AnyRow::new(FileRow);
//! ```
//!
//! Operations the adapter could not forward are refused by the macro:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn configure<T>(&mut self, model: &Self::Model, extra: T);
//! }
//! ```
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable(strategy = "closure")]
//! pub trait Row {
//!     type Model;
//!     fn name(&self) -> &str;
//! }
//! ```
//!
//! Shared handles forward through a borrow or a lock, so nothing borrowed
//! can be returned through them:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable(shared)]
//! pub trait Row {
//!     type Model;
//!     fn name(&self) -> &str;
//! }
//! ```
//!
//! Operations must borrow their receiver:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn into_model(self) -> Self::Model;
//! }
//! ```
//!
//! `Self` may only appear as the model:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     fn duplicate(&self) -> Box<Self>;
//! }
//! ```
//!
//! The capability itself must be a single trait with at most one model:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! pub trait Named {
//!     fn name(&self) -> String;
//! }
//!
//! #[erasable]
//! pub trait Row: Named {
//!     type Model;
//!     fn configure(&mut self, model: &Self::Model);
//! }
//! ```
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable]
//! pub trait Row {
//!     type Model;
//!     type Style;
//!     fn configure(&mut self, model: &Self::Model);
//! }
//! ```
//!
//! A closure-captured adapter is single-threaded, and cannot be asked to be
//! anything else:
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable(strategy = "closure", sync)]
//! pub trait Row {
//!     type Model;
//!     fn configure(&self, model: &Self::Model);
//! }
//! ```
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! #[erasable(strategy = "closure", send)]
//! pub trait Row {
//!     type Model;
//!     fn configure(&self, model: &Self::Model);
//! }
//! ```
//!
//!
//! ```compile_fail
//! use erased_rust::erasable;
//!
//! pub struct File;
//!
//! #[erasable(strategy = "closure")]
//! pub trait Row {
//!     type Model;
//!     fn configure(&self, model: &Self::Model);
//! }
//!
//! fn assert_send<T: Send>() {}
//! assert_send::<AnyRow<File>>();
//! ```

extern crate self as erased_rust;

mod adapter;
mod error;
mod shared;

#[cfg(feature = "feed")]
pub mod feed;

pub use adapter::{Adapter, AnyAdapter, Binding};
pub use error::{EraseError, Rejected};
pub use shared::{Shared, SyncShared};

pub use erased_rust_macros::erasable;

#[doc(hidden)]
pub mod __private {
    /// Object-safe stand-in for "anything", used to keep a closure adapter's
    /// implementation alive without requiring it to be `'static`.
    pub trait Owned {}

    impl<T: ?Sized> Owned for T {}
}

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
