use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use crate::capability::{where_clause, Capability};
use crate::ErasableArgs;

/// Abstract handle plus one boxed forwarder per wrapped type.
///
/// Expands to a private object-safe handle trait over the model, a private
/// generic box that implements it by forwarding to the capability, and the
/// public adapter holding a single `Box<dyn Handle<Model> + 'a>`.
pub(crate) fn expand(capability: &Capability, adapter: &Ident, args: &ErasableArgs) -> TokenStream {
    let vis = &capability.vis;
    let trait_ident = &capability.ident;
    let handle = format_ident!("__{}Handle", adapter);
    let boxed = format_ident!("__{}Box", adapter);
    let params = capability.params();
    let adapter_params = capability.adapter_params();
    let binding = capability.binding();
    let model_assignment = capability.model_assignment();
    let imp = capability.implementation_param();
    let auto = args.auto_bounds();

    let handle_fns = capability.operations.iter().map(|operation| {
        let sig = operation.erased_sig();
        quote! { #sig; }
    });

    let box_fns = capability.operations.iter().map(|operation| {
        let sig = operation.erased_sig();
        let ident = &operation.ident;
        let names = operation.arg_idents();
        let inner = if operation.mutable {
            quote! { &mut self.0 }
        } else {
            quote! { &self.0 }
        };
        quote! {
            #[inline]
            #sig {
                <#imp as #trait_ident>::#ident(#inner #(, #names)*)
            }
        }
    });

    let adapter_fns = capability.operations.iter().map(|operation| {
        let sig = &operation.sig;
        let ident = &operation.ident;
        let names = operation.arg_idents();
        let handle_ref = if operation.mutable {
            quote! { &mut *self.handle }
        } else {
            quote! { &*self.handle }
        };
        quote! {
            #[inline]
            #sig {
                #handle::#ident(#handle_ref #(, #names)*)
            }
        }
    });

    let box_where = where_clause(
        std::iter::once(quote! { #imp: #binding })
            .chain(capability.model_predicate()),
    );
    let box_params = match &capability.model {
        Some(model) => {
            let model = &model.ident;
            quote! { <#imp, #model> }
        }
        None => quote! { <#imp> },
    };
    let new_where = where_clause(
        std::iter::once(quote! { #imp: #binding + 'a #auto })
            .chain(capability.model_predicate()),
    );
    let model_where = where_clause(capability.model_predicate());

    let doc = format!(
        " Type-erased [`{}`]: any implementation behind one concrete type.",
        trait_ident
    );

    quote! {
        #[doc = #doc]
        #vis struct #adapter #adapter_params {
            handle: ::std::boxed::Box<dyn #handle #params + 'a #auto>,
        }

        #[doc(hidden)]
        trait #handle #params {
            #(#handle_fns)*
        }

        #[doc(hidden)]
        struct #boxed<#imp>(#imp);

        impl #box_params #handle #params for #boxed<#imp> #box_where {
            #(#box_fns)*
        }

        impl #adapter_params #adapter #adapter_params {
            /// Erases `implementation` behind this adapter. The adapter owns it
            /// from here on and forwards every operation to it unchanged.
            #vis fn new<#imp>(implementation: #imp) -> Self #new_where {
                Self {
                    handle: ::std::boxed::Box::new(#boxed(implementation)),
                }
            }
        }

        impl #adapter_params #trait_ident for #adapter #adapter_params #model_where {
            #model_assignment
            #(#adapter_fns)*
        }
    }
}
