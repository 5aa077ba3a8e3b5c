mod bind;
mod common;

use proc_macro::TokenStream;

/// Derive `optbind::Bind` for a struct with named fields.
///
/// Every field with an `#[opts(tag = "...")]` attribute is bound; its
/// description is `#[opts(desc = "...")]` or, failing that, its doc comment.
/// Fields marked `#[opts(embed)]` are structures which themselves implement
/// `Bind`, and their options are flattened in place. Other fields are ignored.
#[proc_macro_derive(Bind, attributes(opts))]
pub fn derive_bind(item: TokenStream) -> TokenStream {
    match bind::derive_bind_result(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
