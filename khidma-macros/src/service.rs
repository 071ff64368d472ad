//! `#[service(...)]` expansion.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::{Ident, Item, LitStr, Path, Token, Type, parse_quote};

pub struct ServiceArgs {
    contract: Type,
    lifetime: Ident,
    eager: bool,
    krate: Path,
}

impl Parse for ServiceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let contract: Type = input.parse()?;
        input.parse::<Token![,]>()?;

        let lifetime: Ident = input.parse()?;
        if !matches!(lifetime.to_string().as_str(), "Transient" | "Singleton" | "Scoped") {
            return Err(syn::Error::new(
                lifetime.span(),
                "expected one of `Transient`, `Singleton`, `Scoped`",
            ));
        }

        let mut eager = false;
        let mut krate: Path = parse_quote!(::khidma);

        while input.parse::<Option<Token![,]>>()?.is_some() {
            if input.is_empty() {
                break;
            }
            if input.peek(Token![crate]) {
                input.parse::<Token![crate]>()?;
                input.parse::<Token![=]>()?;
                krate = input.parse::<LitStr>()?.parse()?;
                continue;
            }
            let flag: Ident = input.parse()?;
            if flag != "eager" {
                return Err(syn::Error::new(flag.span(), "unknown service option"));
            }
            eager = true;
        }

        if !input.is_empty() {
            return Err(input.error("unexpected tokens in #[service]"));
        }

        Ok(Self {
            contract,
            lifetime,
            eager,
            krate,
        })
    }
}

pub fn expand(args: ServiceArgs, item: Item) -> syn::Result<TokenStream> {
    let (ident, generics) = match &item {
        Item::Struct(s) => (&s.ident, &s.generics),
        Item::Enum(e) => (&e.ident, &e.generics),
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "#[service] can only be applied to a struct or an enum",
            ));
        }
    };

    if !generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            generics,
            "#[service] cannot register a generic type",
        ));
    }

    let ServiceArgs {
        contract,
        lifetime,
        eager,
        krate,
    } = args;
    let describe = format_ident!("__khidma_describe_{}", ident);
    let eager = eager.then(|| quote!(.eager()));

    Ok(quote! {
        #item

        const _: () = {
            #[allow(non_snake_case)]
            fn #describe() -> #krate::ServiceDescriptor {
                #krate::ServiceDescriptor::new::<#contract, #ident>(
                    #krate::Lifetime::#lifetime,
                    |service: ::std::sync::Arc<#ident>| -> ::std::sync::Arc<#contract> { service },
                )
                #eager
            }
            #krate::inventory::submit! {
                #krate::ServiceEntry::new(#describe)
            }
        };
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_contract_lifetime_and_flags() {
        let args: ServiceArgs = syn::parse_quote!(dyn Clock, Singleton, eager);
        assert!(args.eager);
        assert_eq!(args.lifetime, "Singleton");
    }

    #[test]
    fn parses_crate_override() {
        let args: ServiceArgs = syn::parse_quote!(Store, Scoped, crate = "::engine::di");
        assert!(!args.eager);
        let krate = &args.krate;
        assert_eq!(quote!(#krate).to_string(), ":: engine :: di");
    }

    #[test]
    fn rejects_unknown_lifetime() {
        assert!(syn::parse_str::<ServiceArgs>("dyn Clock, Forever").is_err());
    }

    #[test]
    fn expansion_submits_entry() {
        let args: ServiceArgs = syn::parse_quote!(dyn Clock, Singleton, eager);
        let item: Item = syn::parse_quote!(struct SystemClock;);
        let out = expand(args, item).unwrap().to_string();
        assert!(out.contains("ServiceEntry :: new"));
        assert!(out.contains(". eager ()"));
    }

    #[test]
    fn rejects_generic_types() {
        let args: ServiceArgs = syn::parse_quote!(dyn Clock, Singleton);
        let item: Item = syn::parse_quote!(struct Wrapper<T>(T););
        assert!(expand(args, item).is_err());
    }
}
