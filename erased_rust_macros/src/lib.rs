mod boxed;
mod capability;
mod closure;
mod shared;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Ident, ItemTrait, LitStr};

use capability::Capability;

// ============================================================================
// #[erasable] attribute macro
// ============================================================================

/// Attribute macro that generates a type-erased adapter for a capability trait.
///
/// The trait may declare at most one associated type (the model). The
/// generated adapter is generic over that model only, never over the
/// implementation it wraps, so implementations of different concrete types
/// that share a model can live in one `Vec`.
///
/// # Usage
///
/// Default boxed strategy, adapter named `AnyRow`:
/// ```ignore
/// #[erasable]
/// pub trait Row {
///     type Model;
///     fn configure(&mut self, model: &Self::Model);
/// }
///
/// let rows: Vec<AnyRow<File>> = vec![AnyRow::new(FileRow::new()), AnyRow::new(ImageRow::new())];
/// ```
///
/// The adapter carries the lifetime of what it wraps, so `AnyRow<'a, Model>`
/// can hold implementations that borrow:
/// ```ignore
/// let mut log = Vec::new();
/// let mut row: AnyRow<'_, File> = AnyRow::new(LogRow::new(&mut log));
/// ```
///
/// Custom name, thread-safe adapter, and forwarding impls for shared handles:
/// ```ignore
/// #[erasable(name = RowAdapter, sync, shared)]
/// pub trait Row { /* ... */ }
///
/// let shared = Shared::new(FileRow::new());
/// let mut row = RowAdapter::new(shared.clone());
/// row.set_name("renamed".into());
/// assert_eq!(shared.borrow().name(), "renamed");
/// ```
///
/// One captured closure per operation instead of a boxed handle:
/// ```ignore
/// #[erasable(strategy = "closure")]
/// pub trait Row { /* ... */ }
/// ```
///
/// The macro supports:
/// - `name = Ident`: adapter name (default `Any` + trait name)
/// - `strategy = "boxed" | "closure"`: erasure strategy (default `"boxed"`)
/// - `send` / `sync`: the boxed adapter is `Send` / `Send + Sync`, and
///   requires the same of every wrapped implementation
/// - `shared`: also implement the trait for `erased_rust::Shared<T>` and
///   `erased_rust::SyncShared<T>`
#[proc_macro_attribute]
pub fn erasable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = ErasableArgs::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            args.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("strategy") {
            let value: LitStr = meta.value()?.parse()?;
            args.strategy = match value.value().as_str() {
                "boxed" => Strategy::Boxed,
                "closure" => Strategy::Closure,
                other => {
                    return Err(syn::Error::new(
                        value.span(),
                        format!(
                            "unknown erasure strategy `{}`, expected \"boxed\" or \"closure\"",
                            other
                        ),
                    ))
                }
            };
        } else if meta.path.is_ident("send") {
            args.send = true;
        } else if meta.path.is_ident("sync") {
            args.sync = true;
        } else if meta.path.is_ident("shared") {
            args.shared = true;
        } else {
            return Err(meta.error(
                "unsupported erasable argument, expected `name`, `strategy`, `send`, `sync` or `shared`",
            ));
        }
        Ok(())
    });
    parse_macro_input!(attr with parser);

    let item = parse_macro_input!(item as ItemTrait);

    match expand(&args, &item) {
        Ok(generated) => TokenStream::from(quote! { #item #generated }),
        Err(error) => {
            let error = error.to_compile_error();
            TokenStream::from(quote! { #item #error })
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Strategy {
    #[default]
    Boxed,
    Closure,
}

#[derive(Default)]
pub(crate) struct ErasableArgs {
    name: Option<Ident>,
    strategy: Strategy,
    send: bool,
    sync: bool,
    shared: bool,
}

impl ErasableArgs {
    /// Extra bounds on the boxed handle and on wrapped implementations.
    pub(crate) fn auto_bounds(&self) -> TokenStream2 {
        if self.sync {
            quote! { + ::core::marker::Send + ::core::marker::Sync }
        } else if self.send {
            quote! { + ::core::marker::Send }
        } else {
            TokenStream2::new()
        }
    }
}

fn expand(args: &ErasableArgs, item: &ItemTrait) -> syn::Result<TokenStream2> {
    let capability = Capability::parse(item)?;
    let adapter = args
        .name
        .clone()
        .unwrap_or_else(|| format_ident!("Any{}", capability.ident));

    let erased = match args.strategy {
        Strategy::Boxed => boxed::expand(&capability, &adapter, args),
        Strategy::Closure => {
            if args.send || args.sync {
                return Err(syn::Error::new(
                    adapter.span(),
                    "closure-captured adapters are single-threaded; `send` and `sync` need \
                     `strategy = \"boxed\"`",
                ));
            }
            closure::check(&capability)?;
            closure::expand(&capability, &adapter)
        }
    };

    let shared = if args.shared {
        shared::check(&capability)?;
        shared::expand(&capability)
    } else {
        TokenStream2::new()
    };

    let support = support(&capability, &adapter);

    Ok(quote! {
        #erased
        #support
        #shared
    })
}

/// Impls every adapter gets regardless of strategy.
///
/// Only owning adapters (`'static`) take part in the runtime-checked path,
/// and their capability is identified by its full module path.
fn support(capability: &Capability, adapter: &Ident) -> TokenStream2 {
    let adapter_params = capability.adapter_params();
    let static_args = capability.static_args();
    let trait_name = capability.ident.to_string();
    let adapter_name = adapter.to_string();

    let (static_params, model) = match &capability.model {
        Some(model) => {
            let ident = &model.ident;
            (quote! { <#ident: 'static> }, quote! { #ident })
        }
        None => (TokenStream2::new(), quote! { () }),
    };

    quote! {
        impl #static_params erased_rust::Adapter for #adapter #static_args {
            type Model = #model;
            const CAPABILITY: &'static str =
                ::core::concat!(::core::module_path!(), "::", #trait_name);
        }

        impl #adapter_params ::core::fmt::Debug for #adapter #adapter_params {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(#adapter_name).finish_non_exhaustive()
            }
        }
    }
}
