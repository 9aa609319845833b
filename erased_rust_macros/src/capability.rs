//! Parsed view of a trait annotated with `#[erasable]`.
//!
//! Validates that the trait can be erased and rewrites every mention of
//! `Self::Model` in operation signatures to the adapter's generic parameter.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    punctuated::Punctuated,
    spanned::Spanned,
    visit::{self, Visit},
    visit_mut::{self, VisitMut},
    FnArg, Ident, ItemTrait, Lifetime, ParenthesizedGenericArguments, Pat, PatIdent, ReturnType,
    Signature, Token, TraitBoundModifier, TraitItem, TraitItemFn, Type, TypeBareFn, TypeParamBound,
    TypePath, TypeReference, Visibility,
};

/// Accumulates errors so one expansion reports every problem at once.
#[derive(Default)]
pub(crate) struct Errors(Option<syn::Error>);

impl Errors {
    pub(crate) fn push(&mut self, error: syn::Error) {
        match &mut self.0 {
            Some(existing) => existing.combine(error),
            None => self.0 = Some(error),
        }
    }

    pub(crate) fn at(&mut self, span: Span, message: &str) {
        self.push(syn::Error::new(span, message));
    }

    pub(crate) fn finish(self) -> syn::Result<()> {
        match self.0 {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// The associated type standing in for the implementation-specific model.
pub(crate) struct Model {
    pub ident: Ident,
    pub bounds: Punctuated<TypeParamBound, Token![+]>,
}

pub(crate) struct Argument {
    pub ident: Ident,
    /// Declared type with `Self::Model` replaced by the model parameter.
    pub ty: Type,
}

/// One method of the capability trait.
pub(crate) struct Operation {
    pub ident: Ident,
    pub mutable: bool,
    pub args: Vec<Argument>,
    /// Declared return type with `Self::Model` replaced by the model parameter.
    pub output: ReturnType,
    /// Whether the return type borrows (mentions a reference or lifetime).
    pub borrows: bool,
    /// The trait's own signature with argument patterns normalized to plain
    /// identifiers, used wherever the capability trait itself is implemented.
    pub sig: Signature,
}

pub(crate) struct Capability {
    pub ident: Ident,
    pub vis: Visibility,
    pub model: Option<Model>,
    pub operations: Vec<Operation>,
}

impl Capability {
    pub(crate) fn parse(item: &ItemTrait) -> syn::Result<Self> {
        let mut errors = Errors::default();

        if item.unsafety.is_some() {
            errors.at(item.unsafety.span(), "unsafe traits cannot be erased");
        }
        if item.auto_token.is_some() {
            errors.at(item.auto_token.span(), "auto traits cannot be erased");
        }
        if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
            errors.at(
                item.generics.span(),
                "erasable traits cannot declare generic parameters; use an associated type",
            );
        }
        if !item.supertraits.is_empty() {
            errors.at(
                item.supertraits.span(),
                "erasable traits cannot declare supertraits",
            );
        }

        let mut model: Option<Model> = None;
        let mut methods = Vec::new();

        for trait_item in &item.items {
            match trait_item {
                TraitItem::Type(assoc) => {
                    if model.is_some() {
                        errors.at(
                            assoc.ident.span(),
                            "erasable traits may declare at most one associated type",
                        );
                        continue;
                    }
                    if !assoc.generics.params.is_empty() {
                        errors.at(
                            assoc.generics.span(),
                            "generic associated types cannot be erased",
                        );
                    }
                    if let Some((eq, _)) = &assoc.default {
                        errors.at(eq.span(), "associated type defaults cannot be erased");
                    }
                    for bound in &assoc.bounds {
                        if let TypeParamBound::Trait(trait_bound) = bound {
                            if let TraitBoundModifier::Maybe(question) = &trait_bound.modifier {
                                errors.at(question.span(), "the model type must be sized");
                            }
                        }
                    }
                    model = Some(Model {
                        ident: assoc.ident.clone(),
                        bounds: assoc.bounds.clone(),
                    });
                }
                TraitItem::Fn(method) => methods.push(method),
                other => errors.at(
                    other.span(),
                    "erasable traits may only declare methods and one associated type",
                ),
            }
        }

        let model_ident = model.as_ref().map(|m| m.ident.clone());
        let mut operations = Vec::with_capacity(methods.len());
        for method in methods {
            match Operation::parse(method, model_ident.as_ref()) {
                Ok(operation) => operations.push(operation),
                Err(error) => errors.push(error),
            }
        }

        errors.finish()?;

        Ok(Capability {
            ident: item.ident.clone(),
            vis: item.vis.clone(),
            model,
            operations,
        })
    }

    /// `<Model>` for capabilities with a model, nothing otherwise.
    pub(crate) fn params(&self) -> TokenStream {
        match &self.model {
            Some(model) => {
                let ident = &model.ident;
                quote! { <#ident> }
            }
            None => TokenStream::new(),
        }
    }

    /// `<'a, Model>`: the adapter borrows for `'a` whatever its
    /// implementation borrows.
    pub(crate) fn adapter_params(&self) -> TokenStream {
        match &self.model {
            Some(model) => {
                let ident = &model.ident;
                quote! { <'a, #ident> }
            }
            None => quote! { <'a> },
        }
    }

    /// `<'static, Model>`, for impls that need an owning adapter.
    pub(crate) fn static_args(&self) -> TokenStream {
        match &self.model {
            Some(model) => {
                let ident = &model.ident;
                quote! { <'static, #ident> }
            }
            None => quote! { <'static> },
        }
    }

    /// `Row<Model = Model>`, or just `Row` without a model.
    pub(crate) fn binding(&self) -> TokenStream {
        let ident = &self.ident;
        match &self.model {
            Some(model) => {
                let model = &model.ident;
                quote! { #ident<#model = #model> }
            }
            None => quote! { #ident },
        }
    }

    /// The bounds declared on the associated type, restated on the parameter.
    pub(crate) fn model_predicate(&self) -> Option<TokenStream> {
        let model = self.model.as_ref()?;
        if model.bounds.is_empty() {
            return None;
        }
        let ident = &model.ident;
        let bounds = &model.bounds;
        Some(quote! { #ident: #bounds })
    }

    /// `type Model = Model;` inside impls of the capability for an adapter.
    pub(crate) fn model_assignment(&self) -> TokenStream {
        match &self.model {
            Some(model) => {
                let ident = &model.ident;
                quote! { type #ident = #ident; }
            }
            None => TokenStream::new(),
        }
    }

    /// Name for the wrapped implementation's type parameter. Reserved so it
    /// cannot capture the model or a type named in an operation.
    pub(crate) fn implementation_param(&self) -> Ident {
        format_ident!("__Impl")
    }
}

/// Joins predicates into a where clause, or nothing when there are none.
pub(crate) fn where_clause(predicates: impl IntoIterator<Item = TokenStream>) -> TokenStream {
    let predicates: Vec<_> = predicates.into_iter().collect();
    if predicates.is_empty() {
        TokenStream::new()
    } else {
        quote! { where #(#predicates),* }
    }
}

impl Operation {
    fn parse(method: &TraitItemFn, model: Option<&Ident>) -> syn::Result<Self> {
        let mut errors = Errors::default();
        let sig = &method.sig;

        if let Some(constness) = &sig.constness {
            errors.at(constness.span(), "const operations cannot be erased");
        }
        if let Some(asyncness) = &sig.asyncness {
            errors.at(asyncness.span(), "async operations cannot be erased");
        }
        if let Some(unsafety) = &sig.unsafety {
            errors.at(unsafety.span(), "unsafe operations cannot be erased");
        }
        if let Some(abi) = &sig.abi {
            errors.at(abi.span(), "extern operations cannot be erased");
        }
        if let Some(variadic) = &sig.variadic {
            errors.at(variadic.span(), "variadic operations cannot be erased");
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            errors.at(
                sig.generics.span(),
                "erasable operations cannot be generic",
            );
        }

        let mut mutable = false;
        match sig.inputs.first() {
            Some(FnArg::Receiver(receiver))
                if receiver.reference.is_some() && receiver.colon_token.is_none() =>
            {
                mutable = receiver.mutability.is_some();
            }
            Some(FnArg::Receiver(receiver)) => errors.at(
                receiver.span(),
                "erasable operations must take `&self` or `&mut self`",
            ),
            _ => errors.at(
                sig.ident.span(),
                "erasable operations need a `&self` or `&mut self` receiver",
            ),
        }

        let mut eraser = EraseSelf {
            model,
            errors: Errors::default(),
        };
        let mut normalized = sig.clone();
        let mut args = Vec::new();

        for (index, input) in normalized.inputs.iter_mut().skip(1).enumerate() {
            let FnArg::Typed(typed) = input else {
                continue;
            };
            let ident = match &*typed.pat {
                Pat::Ident(pat) if pat.by_ref.is_none() && pat.subpat.is_none() => {
                    pat.ident.clone()
                }
                _ => format_ident!("__arg{}", index),
            };
            typed.pat = Box::new(Pat::Ident(PatIdent {
                attrs: Vec::new(),
                by_ref: None,
                mutability: None,
                ident: ident.clone(),
                subpat: None,
            }));

            let mut ty = (*typed.ty).clone();
            eraser.visit_type_mut(&mut ty);
            args.push(Argument { ident, ty });
        }

        let mut output = sig.output.clone();
        eraser.visit_return_type_mut(&mut output);

        let mut borrows = Borrows(false);
        borrows.visit_return_type(&output);

        errors.push_all(eraser.errors);
        errors.finish()?;

        Ok(Operation {
            ident: sig.ident.clone(),
            mutable,
            args,
            output,
            borrows: borrows.0,
            sig: normalized,
        })
    }

    /// `&self` or `&mut self`.
    pub(crate) fn receiver(&self) -> TokenStream {
        if self.mutable {
            quote! { &mut self }
        } else {
            quote! { &self }
        }
    }

    /// The operation restated over the model parameter instead of `Self`.
    pub(crate) fn erased_sig(&self) -> TokenStream {
        let ident = &self.ident;
        let receiver = self.receiver();
        let names = self.arg_idents();
        let types = self.arg_types();
        let output = &self.output;
        quote! { fn #ident(#receiver #(, #names: #types)*) #output }
    }

    pub(crate) fn arg_idents(&self) -> impl Iterator<Item = &Ident> {
        self.args.iter().map(|arg| &arg.ident)
    }

    pub(crate) fn arg_types(&self) -> impl Iterator<Item = &Type> {
        self.args.iter().map(|arg| &arg.ty)
    }
}

impl Errors {
    fn push_all(&mut self, other: Errors) {
        if let Some(error) = other.0 {
            self.push(error);
        }
    }
}

/// Rewrites `Self::Model` and `<Self as Trait>::Model` to `Model`, and
/// rejects every other use of `Self` or `impl Trait`.
struct EraseSelf<'a> {
    model: Option<&'a Ident>,
    errors: Errors,
}

impl EraseSelf<'_> {
    fn is_model_path(&self, path: &TypePath) -> bool {
        let Some(model) = self.model else {
            return false;
        };
        let Some(last) = path.path.segments.last() else {
            return false;
        };
        if last.ident != *model || !last.arguments.is_none() {
            return false;
        }
        match &path.qself {
            Some(qself) => matches!(&*qself.ty, Type::Path(inner) if inner.qself.is_none() && inner.path.is_ident("Self")),
            None => {
                path.path.leading_colon.is_none()
                    && path.path.segments.len() == 2
                    && path.path.segments[0].ident == "Self"
                    && path.path.segments[0].arguments.is_none()
            }
        }
    }
}

fn mentions_self(path: &TypePath) -> bool {
    path.qself.is_none()
        && path
            .path
            .segments
            .first()
            .map_or(false, |segment| segment.ident == "Self")
}

impl VisitMut for EraseSelf<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        match ty {
            Type::Path(path) if self.is_model_path(path) => {
                if let Some(model) = self.model {
                    *ty = Type::Path(TypePath {
                        qself: None,
                        path: model.clone().into(),
                    });
                }
                return;
            }
            Type::Path(path) if mentions_self(path) => {
                let message = match self.model {
                    Some(model) => format!(
                        "`Self` cannot appear in an erasable operation except as `Self::{}`",
                        model
                    ),
                    None => "`Self` cannot appear in an erasable operation".to_string(),
                };
                self.errors.at(path.span(), &message);
                return;
            }
            Type::ImplTrait(impl_trait) => {
                self.errors.at(
                    impl_trait.span(),
                    "`impl Trait` cannot appear in an erasable operation",
                );
                return;
            }
            _ => {}
        }
        visit_mut::visit_type_mut(self, ty);
    }
}

struct Borrows(bool);

impl<'ast> Visit<'ast> for Borrows {
    fn visit_type_reference(&mut self, reference: &'ast TypeReference) {
        match &reference.lifetime {
            Some(lifetime) if lifetime.ident == "static" => {
                visit::visit_type_reference(self, reference)
            }
            _ => self.0 = true,
        }
    }

    // References under `fn(..)` or `Fn(..)` are higher-ranked: they belong to
    // the callee's arguments, not to the returned value.
    fn visit_type_bare_fn(&mut self, _: &'ast TypeBareFn) {}

    fn visit_parenthesized_generic_arguments(
        &mut self,
        _: &'ast ParenthesizedGenericArguments,
    ) {
    }

    fn visit_lifetime(&mut self, lifetime: &'ast Lifetime) {
        if lifetime.ident != "static" {
            self.0 = true;
        }
        visit::visit_lifetime(self, lifetime);
    }
}
