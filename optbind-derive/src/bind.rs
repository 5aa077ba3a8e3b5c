use std::collections::{HashMap, hash_map::Entry};

use darling::util::SpannedValue;
use itertools::Itertools as _;
use lazy_format::lazy_format;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{DeriveInput, Field, Ident, Token, punctuated::Punctuated, spanned::Spanned as _};

use crate::common::{ParsedFieldInfo, Shape};

fn detect_collision(
    known_tags: &mut HashMap<String, Span>,
    new_tag: SpannedValue<String>,
) -> syn::Result<()> {
    let span = new_tag.span();
    let tag = new_tag.as_str();

    match known_tags.entry(tag.to_owned()) {
        Entry::Occupied(entry) => {
            let mut err1 = syn::Error::new(span, lazy_format!("duplicate option {tag}"));
            let err2 = syn::Error::new(*entry.get(), "original use here");

            err1.combine(err2);
            Err(err1)
        }
        Entry::Vacant(entry) => {
            entry.insert(span);
            Ok(())
        }
    }
}

pub fn derive_bind_result(item: TokenStream2) -> syn::Result<TokenStream2> {
    let input: DeriveInput = syn::parse2(item)?;

    if let Some(param) = input.generics.params.first() {
        return Err(syn::Error::new(
            param.span(),
            "generic types and lifetimes aren't supported by `derive(Bind)`",
        ));
    }

    let empty = Punctuated::new();

    let fields = match input.data {
        syn::Data::Struct(ref data) => match data.fields {
            syn::Fields::Named(ref fields) => &fields.named,
            syn::Fields::Unnamed(ref fields) => &fields.unnamed,
            syn::Fields::Unit => &empty,
        },
        syn::Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "can't derive `Bind` on an enum",
            ));
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "can't derive `Bind` on a union",
            ));
        }
    };

    derive_bind_struct(&input.ident, fields)
}

fn derive_bind_struct(
    name: &Ident,
    fields: &Punctuated<Field, Token![,]>,
) -> syn::Result<TokenStream2> {
    let fields: Vec<ParsedFieldInfo> = fields
        .iter()
        .map(ParsedFieldInfo::from_field)
        .try_collect()?;

    // Collisions with the flags of embedded structures are only found when
    // the option set is built
    {
        let mut flags = HashMap::new();

        for info in fields.iter().filter_map(|field| match field {
            ParsedFieldInfo::Bound(info) => Some(info),
            ParsedFieldInfo::Embedded(_) | ParsedFieldInfo::Ignored => None,
        }) {
            info.flag_names()
                .try_for_each(|flag| detect_collision(&mut flags, flag))?;
        }
    }

    let fields_ident = format_ident!("fields");

    let declarations = fields.iter().filter_map(|field| match field {
        ParsedFieldInfo::Ignored => None,
        ParsedFieldInfo::Embedded(info) => {
            let ident = info.ident;

            Some(quote! {
                #fields_ident.embed(|this: &mut Self| &mut this.#ident);
            })
        }
        ParsedFieldInfo::Bound(info) => {
            let ident = info.ident;
            let field = ident.to_string();
            let tag = info.tag.as_str();
            let description = info.description.as_str();

            let method = match info.shape {
                Shape::Value => format_ident!("value"),
                Shape::Pointer => format_ident!("pointer"),
                Shape::Slice => format_ident!("slice"),
            };

            Some(quote! {
                #fields_ident.#method(
                    #field,
                    #tag,
                    #description,
                    |this: &mut Self| &mut this.#ident,
                );
            })
        }
    });

    Ok(quote! {
        impl ::optbind::Bind for #name {
            #[allow(unused_variables)]
            fn declare(#fields_ident: &mut ::optbind::Fields<Self>) {
                #(#declarations)*
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(item: TokenStream2) -> String {
        match derive_bind_result(item) {
            Ok(tokens) => tokens.to_string(),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn declarations() {
        let tokens = derive(quote! {
            struct Options {
                /// Display more output
                #[opts(tag = "-v,--verbose")]
                verbose: bool,

                #[opts(tag = "arg:1", desc = "Serial port")]
                port: Option<String>,

                #[opts(tag = "args")]
                rest: Vec<String>,

                #[opts(embed)]
                common: Common,

                cache: Vec<u8>,
            }
        });

        let expected = quote! {
            impl ::optbind::Bind for Options {
                #[allow(unused_variables)]
                fn declare(fields: &mut ::optbind::Fields<Self>) {
                    fields.value(
                        "verbose",
                        "-v,--verbose",
                        "Display more output",
                        |this: &mut Self| &mut this.verbose,
                    );
                    fields.pointer(
                        "port",
                        "arg:1",
                        "Serial port",
                        |this: &mut Self| &mut this.port,
                    );
                    fields.slice(
                        "rest",
                        "args",
                        "",
                        |this: &mut Self| &mut this.rest,
                    );
                    fields.embed(|this: &mut Self| &mut this.common);
                }
            }
        };

        assert_eq!(tokens, expected.to_string());
    }

    #[test]
    fn duplicate_flags() {
        let message = derive(quote! {
            struct Options {
                #[opts(tag = "-v,--verbose")]
                verbose: bool,

                #[opts(tag = "-v,--version")]
                version: bool,
            }
        });

        assert_eq!(message, "duplicate option -v");
    }

    #[test]
    fn duplicate_flags_point_at_both_uses() {
        let err = derive_bind_result(quote! {
            struct Options {
                #[opts(tag = "-q,--quiet")]
                quiet: bool,

                #[opts(tag = "--verbose,--quiet")]
                verbose: bool,
            }
        })
        .unwrap_err();

        let messages: Vec<String> = err.into_iter().map(|err| err.to_string()).collect();
        assert_eq!(messages, ["duplicate option --quiet", "original use here"]);
    }

    #[test]
    fn rejected_inputs() {
        assert_eq!(
            derive(quote! { struct Options<T> { value: T } }),
            "generic types and lifetimes aren't supported by `derive(Bind)`"
        );
        assert_eq!(
            derive(quote! { enum Options { A } }),
            "can't derive `Bind` on an enum"
        );
        assert_eq!(
            derive(quote! { struct Options(#[opts(tag = "-x")] bool); }),
            "can't bind the fields of tuple structs"
        );
    }

    #[test]
    fn unit_structs_bind_nothing() {
        let tokens = derive(quote! { struct Nothing; });
        assert!(tokens.contains("fn declare"));
    }
}
