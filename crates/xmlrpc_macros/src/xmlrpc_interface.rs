//! Logic for deriving a service descriptor from a trait.
//!
//! Each trait method becomes a `MethodDesc`; receivers are not part of the
//! wire signature and are skipped.

use std::collections::HashSet;

use quote::{quote, ToTokens};
use syn::{FnArg, Ident, ItemTrait, Pat, ReturnType, TraitItem};

use crate::attrs;

pub fn derive(mut item: ItemTrait) -> syn::Result<proc_macro2::TokenStream> {
    let service_ident = Ident::new(&format!("{}Service", item.ident), item.ident.span());
    let vis = item.vis.clone();

    let mut names = vec![];
    let mut methods = vec![];
    let mut seen = HashSet::new();

    for trait_item in item.items.iter_mut() {
        let method = match trait_item {
            TraitItem::Fn(f) => f,
            _ => continue,
        };

        let method_attrs = attrs::parse(&method.attrs)?;
        attrs::strip(&mut method.attrs);

        let name = method_attrs
            .name
            .unwrap_or_else(|| method.sig.ident.to_string());
        if !seen.insert(name.clone()) {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                format!("duplicate xmlrpc method name {}", name),
            ));
        }

        let return_type = match &method.sig.output {
            ReturnType::Default => quote! { ::xmlrpc_core::TypeDesc::Void },
            ReturnType::Type(_, ty) => quote! {
                <#ty as ::xmlrpc_core::FromXmlRpc>::type_desc()
            },
        };

        let param_count = method
            .sig
            .inputs
            .iter()
            .filter(|arg| matches!(arg, FnArg::Typed(_)))
            .count();

        let mut params = vec![];
        for arg in method.sig.inputs.iter_mut() {
            let typed = match arg {
                FnArg::Receiver(_) => continue,
                FnArg::Typed(typed) => typed,
            };

            let variadic = attrs::has_marker(&typed.attrs, attrs::VARIADIC);
            attrs::strip(&mut typed.attrs);

            let is_last = params.len() + 1 == param_count;
            if variadic && !is_last {
                return Err(syn::Error::new_spanned(
                    &*typed,
                    "only the last parameter can be variadic",
                ));
            }

            let param_name = match typed.pat.as_ref() {
                Pat::Ident(i) => i.ident.to_string(),
                other => other.to_token_stream().to_string(),
            };
            let ty = &typed.ty;

            let constructor = match variadic {
                true => quote! { variadic },
                false => quote! { new },
            };
            params.push(quote! {
                ::xmlrpc_core::ParamDesc::#constructor(
                    #param_name,
                    <#ty as ::xmlrpc_core::FromXmlRpc>::type_desc(),
                )
            });
        }

        methods.push(quote! {
            ::xmlrpc_core::MethodDesc::new(#name, #return_type)
                #(.param(#params))*
        });
        names.push(name);
    }

    Ok(quote! {
        #item

        /// Service descriptor derived from the trait of the same name.
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #service_ident;

        impl #service_ident {
            /// Wire names of every method of the service.
            pub fn method_names() -> &'static [&'static str] {
                &[#(#names),*]
            }
        }

        impl ::xmlrpc_core::ServiceDescriptor for #service_ident {
            fn method(&self, name: &str) -> ::core::option::Option<::xmlrpc_core::MethodDesc> {
                match name {
                    #(#names => ::core::option::Option::Some(#methods),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}
