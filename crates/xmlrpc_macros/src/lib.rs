//! Proc-macros for xmlrpc_core.
//!
//! Generated code refers to the runtime through `::xmlrpc_core`.

mod attrs;
mod xmlrpc_interface;
mod xmlrpc_struct;

/// Derives `FromXmlRpc` for a struct with named fields.
///
/// The struct must implement `Default`: members missing from the wire keep
/// their default value when the mapping is lenient.
///
/// ```ignore
/// #[derive(Default, XmlRpcStruct)]
/// #[xmlrpc(mapping = "lenient")]
/// struct Account {
///     /// Wire member `userName`.
///     #[xmlrpc(rename = "userName")]
///     user_name: String,
///
///     /// Never mapped, a wire member of this name is an error.
///     #[xmlrpc(skip)]
///     session: Option<String>,
///
///     /// Missing members fail only under a strict member policy.
///     #[xmlrpc(mapping = "strict")]
///     id: i32,
/// }
/// ```
#[proc_macro_derive(XmlRpcStruct, attributes(xmlrpc))]
pub fn derive_xmlrpc_struct(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(item as syn::DeriveInput);

    xmlrpc_struct::derive(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Generates a `<Trait>Service` descriptor for the methods of a trait.
///
/// Parameter and return types must implement `FromXmlRpc`. A method
/// without a return type returns nothing on the wire.
///
/// ```ignore
/// #[xmlrpc_interface]
/// pub trait Calculator {
///     fn add(a: i32, b: i32) -> i32;
///
///     /// Called as `calc.sum` with any number of integers.
///     #[xmlrpc(name = "calc.sum")]
///     fn sum(#[variadic] values: Vec<i32>) -> i64;
/// }
///
/// let method = CalculatorService.method("add");
/// ```
#[proc_macro_attribute]
pub fn xmlrpc_interface(
    _attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = syn::parse_macro_input!(item as syn::ItemTrait);

    xmlrpc_interface::derive(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
