use proc_macro2::TokenStream;
use quote::quote;

use crate::capability::{Capability, Errors};

pub(crate) fn check(capability: &Capability) -> syn::Result<()> {
    let mut errors = Errors::default();
    for operation in &capability.operations {
        if operation.borrows {
            errors.at(
                operation.ident.span(),
                "operations returning borrowed data cannot be forwarded through a shared handle",
            );
        }
    }
    errors.finish()
}

/// Implements the capability for `Shared<T>` and `SyncShared<T>` so a
/// cloned handle can be erased with reference semantics.
pub(crate) fn expand(capability: &Capability) -> TokenStream {
    let single = forward(
        capability,
        quote! { erased_rust::Shared },
        quote! { &*erased_rust::Shared::borrow(self) },
        quote! { &mut *erased_rust::Shared::borrow_mut(self) },
    );
    let sync = forward(
        capability,
        quote! { erased_rust::SyncShared },
        quote! { &*erased_rust::SyncShared::read(self) },
        quote! { &mut *erased_rust::SyncShared::write(self) },
    );
    quote! { #single #sync }
}

fn forward(
    capability: &Capability,
    handle: TokenStream,
    read: TokenStream,
    write: TokenStream,
) -> TokenStream {
    let trait_ident = &capability.ident;
    let imp = capability.implementation_param();

    let model = capability.model.as_ref().map(|model| {
        let ident = &model.ident;
        quote! { type #ident = <#imp as #trait_ident>::#ident; }
    });

    let fns = capability.operations.iter().map(|operation| {
        let sig = &operation.sig;
        let ident = &operation.ident;
        let names = operation.arg_idents();
        let inner = if operation.mutable { &write } else { &read };
        quote! {
            #[inline]
            #sig {
                <#imp as #trait_ident>::#ident(#inner #(, #names)*)
            }
        }
    });

    quote! {
        impl<#imp> #trait_ident for #handle<#imp> where #imp: #trait_ident {
            #model
            #(#fns)*
        }
    }
}
