//! `#[derive(Injectable)]` expansion.

use darling::ast::Data;
use darling::util::Flag;
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericArgument, Ident, Path, PathArguments, Type, parse_quote};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: syn::Generics,
    data: Data<(), InjectableField>,
    #[darling(default)]
    entry: Option<String>,
    #[darling(default)]
    target: Flag,
    #[darling(default, rename = "crate")]
    krate: Option<Path>,
}

#[derive(FromField)]
#[darling(forward_attrs(inject))]
struct InjectableField {
    ident: Option<Ident>,
    ty: Type,
    attrs: Vec<syn::Attribute>,
}

impl InjectableField {
    fn is_injected(&self) -> bool {
        self.attrs.iter().any(|attr| attr.path().is_ident("inject"))
    }
}

pub fn expand(input: DeriveInput) -> darling::Result<TokenStream> {
    let input = InjectableInput::from_derive_input(&input)?;
    let krate = input.krate.clone().unwrap_or_else(|| parse_quote!(::khidma));
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut errors = darling::Error::accumulator();
    let mut steps = Vec::new();

    if let Data::Struct(fields) = &input.data {
        for field in fields.iter().filter(|f| f.is_injected()) {
            let Some(member) = &field.ident else {
                continue;
            };
            match contract_of(&field.ty) {
                Some(contract) => steps.push(quote! {
                    plan.field::<#contract>(::core::stringify!(#member), |this: &mut Self, value| {
                        this.#member = ::core::option::Option::Some(value);
                    });
                }),
                None => errors.push(
                    darling::Error::custom(
                        "#[inject] fields must have the type Option<Arc<Contract>>",
                    )
                    .with_span(&field.ty),
                ),
            }
        }
    }

    if let Some(entry) = &input.entry {
        match syn::parse_str::<Ident>(entry) {
            Ok(method) => steps.push(quote! {
                plan.entry_point(#entry, Self::#method);
            }),
            Err(_) => errors.push(darling::Error::custom("entry must name a method").with_span(ident)),
        }
    }

    let target = if input.target.is_present() {
        if !input.generics.params.is_empty() {
            errors.push(
                darling::Error::custom("generic types cannot be discovered as injection targets")
                    .with_span(ident),
            );
        }
        let describe = format_ident!("__khidma_target_{}", ident);
        quote! {
            const _: () = {
                #[allow(non_snake_case)]
                fn #describe() -> #krate::TargetDescriptor {
                    #krate::TargetDescriptor::of::<#ident>()
                }
                #krate::inventory::submit! {
                    #krate::TargetEntry::new(#describe)
                }
            };
        }
    } else {
        TokenStream::new()
    };

    errors.finish()?;

    Ok(quote! {
        impl #impl_generics #krate::Injectable for #ident #ty_generics #where_clause {
            fn declare(plan: &mut #krate::PlanBuilder<Self>) {
                let _ = &plan;
                #(#steps)*
            }
        }

        #target
    })
}

/// `Option<Arc<C>>` → `C`.
fn contract_of(ty: &Type) -> Option<&Type> {
    let inner = single_argument(ty, "Option")?;
    single_argument(inner, "Arc")
}

fn single_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
