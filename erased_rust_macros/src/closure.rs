use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::capability::{where_clause, Capability, Errors};

/// Rejects operations a captured closure cannot forward.
pub(crate) fn check(capability: &Capability) -> syn::Result<()> {
    let mut errors = Errors::default();
    for operation in &capability.operations {
        if operation.borrows {
            errors.at(
                operation.ident.span(),
                "closure-captured adapters cannot forward operations that return borrowed data; \
                 use `strategy = \"boxed\"`",
            );
        }
    }
    errors.finish()
}

/// One captured closure per operation.
///
/// The implementation moves into a single `Rc<RefCell<_>>` at construction;
/// every closure holds a clone of it, borrowing for `&self` operations and
/// borrowing mutably for `&mut self` ones.
pub(crate) fn expand(capability: &Capability, adapter: &Ident) -> TokenStream {
    let vis = &capability.vis;
    let trait_ident = &capability.ident;
    let adapter_params = capability.adapter_params();
    let binding = capability.binding();
    let model_assignment = capability.model_assignment();
    let imp = capability.implementation_param();

    let fields = capability.operations.iter().map(|operation| {
        let ident = &operation.ident;
        let types = operation.arg_types();
        let output = &operation.output;
        quote! {
            #ident: ::std::boxed::Box<dyn ::core::ops::Fn(#(#types),*) #output + 'a>,
        }
    });

    let captures = capability.operations.iter().map(|operation| {
        let ident = &operation.ident;
        let names: Vec<_> = operation.arg_idents().collect();
        let types = operation.arg_types();
        let output = &operation.output;
        let borrow = if operation.mutable {
            quote! { &mut *__bound.borrow_mut() }
        } else {
            quote! { &*__bound.borrow() }
        };
        quote! {
            #ident: {
                let __bound = ::std::rc::Rc::clone(&__bound);
                ::std::boxed::Box::new(move |#(#names: #types),*| #output {
                    <#imp as #trait_ident>::#ident(#borrow #(, #names)*)
                })
            },
        }
    });

    let adapter_fns = capability.operations.iter().map(|operation| {
        let sig = &operation.sig;
        let ident = &operation.ident;
        let names = operation.arg_idents();
        quote! {
            #[inline]
            #sig {
                (self.#ident)(#(#names),*)
            }
        }
    });

    let new_where = where_clause(
        std::iter::once(quote! { #imp: #binding + 'a })
            .chain(capability.model_predicate()),
    );
    let model_where = where_clause(capability.model_predicate());

    let doc = format!(
        " Type-erased [`{}`] built from one captured closure per operation.",
        trait_ident
    );

    quote! {
        #[doc = #doc]
        #vis struct #adapter #adapter_params {
            #(#fields)*
            __bound: ::std::rc::Rc<dyn erased_rust::__private::Owned + 'a>,
        }

        impl #adapter_params #adapter #adapter_params {
            /// Erases `implementation` behind this adapter. The adapter owns it
            /// from here on and forwards every operation to it unchanged.
            #vis fn new<#imp>(implementation: #imp) -> Self #new_where {
                let __bound = ::std::rc::Rc::new(::std::cell::RefCell::new(implementation));
                Self {
                    #(#captures)*
                    __bound,
                }
            }
        }

        impl #adapter_params #trait_ident for #adapter #adapter_params #model_where {
            #model_assignment
            #(#adapter_fns)*
        }
    }
}
