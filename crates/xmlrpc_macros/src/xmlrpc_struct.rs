//! Logic for deriving `FromXmlRpc` on a struct.
//!
//! The derived descriptor lists every named field as a member whose type is
//! resolved on first use, so structs may refer to themselves. Conversion
//! starts from `Default` and sets each member present in the decoded value.

use quote::quote;
use syn::{ext::IdentExt, Data, DataStruct, DeriveInput, Fields};

use crate::attrs;

pub fn derive(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let DeriveInput {
        attrs,
        ident,
        generics,
        data,
        ..
    } = input;

    if !generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            generics,
            "XmlRpcStruct cannot be derived for generic structs",
        ));
    }

    let fields = match data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => named.named,
        _ => {
            return Err(syn::Error::new(
                ident.span(),
                "XmlRpcStruct can only be derived for structs with named fields",
            ))
        }
    };

    let struct_attrs = attrs::parse(&attrs)?;
    let type_name = ident.to_string();

    let mut members = vec![];
    let mut setters = vec![];

    for field in fields.iter() {
        let field_ident = match &field.ident {
            Some(i) => i,
            None => return Err(syn::Error::new_spanned(field, "field must be named")),
        };
        let field_attrs = attrs::parse(&field.attrs)?;
        let ty = &field.ty;
        let name = field_ident.unraw().to_string();

        let mut member = quote! {
            ::xmlrpc_core::MemberDesc::deferred(
                #name,
                <#ty as ::xmlrpc_core::FromXmlRpc>::type_desc,
            )
        };
        if let Some(rename) = &field_attrs.rename {
            member = quote! { #member.rename(#rename) };
        }
        if field_attrs.skip {
            member = quote! { #member.exclude() };
        }
        if let Some(mapping) = field_attrs.mapping {
            member = quote! { #member.mapping(#mapping) };
        }
        members.push(member);

        if field_attrs.skip {
            continue;
        }

        // values built against the descriptor are keyed by field name,
        // untyped ones by wire name
        let lookup = match &field_attrs.rename {
            Some(rename) => quote! {
                members.take(#name).or_else(|| members.take(#rename))
            },
            None => quote! { members.take(#name) },
        };
        setters.push(quote! {
            if let Some(value) = #lookup {
                target.#field_ident = <#ty as ::xmlrpc_core::FromXmlRpc>::from_xmlrpc(value)?;
            }
        });
    }

    let struct_mapping = struct_attrs
        .mapping
        .map(|mapping| quote! { .mapping(#mapping) });

    Ok(quote! {
        impl ::xmlrpc_core::FromXmlRpc for #ident {
            fn type_desc() -> ::xmlrpc_core::TypeDesc {
                ::xmlrpc_core::TypeDesc::from(
                    ::xmlrpc_core::StructDesc::builder(#type_name)
                        #(.member(#members))*
                        #struct_mapping
                        .build(),
                )
            }

            #[allow(unused_mut)]
            fn from_xmlrpc(value: ::xmlrpc_core::Value) -> ::xmlrpc_core::XmlRpcResult<Self> {
                let mut members = ::xmlrpc_core::typed::expect_struct(value, #type_name)?;
                let mut target = <Self as ::core::default::Default>::default();
                #(#setters)*
                Ok(target)
            }
        }
    })
}
