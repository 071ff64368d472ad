//! Procedural macros for Khidma DI.
//!
//! Use them through the `khidma` crate, which re-exports both:
//!
//! - `#[derive(Injectable)]` builds an injection plan from `#[inject]`
//!   fields and an optional entry point method.
//! - `#[service(Contract, Lifetime)]` submits a service registration that
//!   `ContainerBuilder::discover()` picks up.

use proc_macro::TokenStream;
use syn::{DeriveInput, Item, parse_macro_input};

mod injectable;
mod service;

/// Derives `Injectable`.
///
/// ```rust,ignore
/// #[derive(Default, Injectable)]
/// #[injectable(entry = "inject", target)]
/// struct HealthBar {
///     #[inject]
///     clock: Option<Arc<dyn Clock>>,
///     logger: Option<Arc<dyn Logger>>,
/// }
///
/// impl HealthBar {
///     fn inject(&mut self, logger: Arc<dyn Logger>) {
///         self.logger = Some(logger);
///     }
/// }
/// ```
///
/// Container attributes:
/// - `entry = "method"`: a method taking `&mut self` and `Arc<Contract>`
///   parameters, called after field injection
/// - `target`: declares the type as an injection target for discovery
/// - `crate = "path"`: path of the `khidma` crate (default `::khidma`)
#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(input)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}

/// Registers the annotated type as the implementation of a contract.
///
/// ```rust,ignore
/// #[service(dyn Clock, Singleton)]
/// #[derive(Default, Injectable)]
/// struct SystemClock;
///
/// #[service(SessionStore, Scoped, eager)]
/// #[derive(Default, Injectable)]
/// struct SessionStore;
/// ```
///
/// The type must implement `Default` and `Injectable`.
#[proc_macro_attribute]
pub fn service(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as service::ServiceArgs);
    let item = parse_macro_input!(item as Item);
    service::expand(args, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
