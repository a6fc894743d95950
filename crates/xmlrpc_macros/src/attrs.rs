//! Parsing of the `#[xmlrpc(..)]` helper attribute.

use quote::{quote, ToTokens};
use syn::{Attribute, LitStr};

pub const XMLRPC: &str = "xmlrpc";
pub const VARIADIC: &str = "variadic";

/// Missing-member policy named in an attribute.
#[derive(Debug, Clone, Copy)]
pub enum Mapping {
    Strict,
    Lenient,
}

impl ToTokens for Mapping {
    fn to_tokens(&self, tokens: &mut proc_macro2::TokenStream) {
        let action = match self {
            Mapping::Strict => quote! { ::xmlrpc_core::MappingAction::Strict },
            Mapping::Lenient => quote! { ::xmlrpc_core::MappingAction::Lenient },
        };
        action.to_tokens(tokens);
    }
}

/// Options collected from every `#[xmlrpc(..)]` on an item.
#[derive(Debug, Default)]
pub struct XmlRpcAttrs {
    /// `rename = ".."`, wire name of a struct member
    pub rename: Option<String>,
    /// `name = ".."`, wire name of an interface method
    pub name: Option<String>,
    /// `skip`, member excluded from mapping
    pub skip: bool,
    /// `mapping = "strict" | "lenient"`
    pub mapping: Option<Mapping>,
}

/// Parse the `#[xmlrpc(..)]` attributes in `attrs`. Other attributes are ignored.
pub fn parse(attrs: &[Attribute]) -> syn::Result<XmlRpcAttrs> {
    let mut parsed = XmlRpcAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident(XMLRPC)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else if meta.path.is_ident("mapping") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.mapping = match lit.value().as_str() {
                    "strict" => Some(Mapping::Strict),
                    "lenient" => Some(Mapping::Lenient),
                    _ => return Err(meta.error("mapping must be \"strict\" or \"lenient\"")),
                };
                Ok(())
            } else {
                Err(meta.error("unknown xmlrpc attribute"))
            }
        })?;
    }

    Ok(parsed)
}

/// Returns `true` if `attrs` contains a bare `#[name]`.
pub fn has_marker(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|a| a.path().is_ident(name))
}

/// Drop the helper attributes so the item can be re-emitted.
pub fn strip(attrs: &mut Vec<Attribute>) {
    attrs.retain(|a| !a.path().is_ident(XMLRPC) && !a.path().is_ident(VARIADIC));
}
