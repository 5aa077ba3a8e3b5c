use darling::{FromAttributes as _, util::SpannedValue};
use itertools::Itertools as _;
use syn::{
    Attribute, Expr, Field, GenericArgument, Ident, PathArguments, Type, spanned::Spanned as _,
};

#[derive(darling::FromAttributes, Debug)]
#[darling(attributes(opts))]
struct RawParsedAttr {
    tag: Option<SpannedValue<String>>,
    desc: Option<String>,
    embed: Option<()>,
}

/// Which of the `Fields` registration methods a field's type calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Value,
    Pointer,
    Slice,
}

pub struct BoundFieldInfo<'a> {
    pub ident: &'a Ident,
    pub tag: SpannedValue<String>,
    pub description: String,
    pub shape: Shape,
}

impl BoundFieldInfo<'_> {
    /// The flag names in the tag, such as `-v` and `--verbose`
    pub fn flag_names(&self) -> impl Iterator<Item = SpannedValue<String>> + '_ {
        split_tag(&self.tag)
            .into_iter()
            .filter(|token| token.starts_with('-') && token.len() > 1)
            .map(|token| SpannedValue::new(token, self.tag.span()))
    }
}

pub struct EmbeddedFieldInfo<'a> {
    pub ident: &'a Ident,
}

pub enum ParsedFieldInfo<'a> {
    Bound(BoundFieldInfo<'a>),
    Embedded(EmbeddedFieldInfo<'a>),

    /// A field without an `#[opts]` attribute
    Ignored,
}

// TODO: keep paragraph breaks of doc comments once descriptions are rewrapped
pub fn compute_docs(attrs: &[Attribute]) -> syn::Result<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter_map(|attr| match attr.meta {
            syn::Meta::NameValue(ref meta) => Some(meta),
            _ => None,
        })
        .filter(|meta| meta.path.is_ident("doc"))
        .map(|meta| match meta.value {
            Expr::Lit(ref lit) => match lit.lit {
                syn::Lit::Str(ref lit) => Ok(lit.value()),
                _ => Err(syn::Error::new(meta.span(), "malformed #[doc] attribute")),
            },
            Expr::Macro(ref expr) => Err(syn::Error::new(
                expr.span(),
                "macro #[doc] attributes aren't supported",
            )),
            _ => Err(syn::Error::new(meta.span(), "malformed #[doc] attribute")),
        })
        .try_collect()?;

    Ok(lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .join(" "))
}

/// `Option<V>` is a pointer and `Vec<V>` a slice; anything else is a value.
/// This only looks at the name of the type, so aliases are values.
pub fn field_shape(ty: &Type) -> Shape {
    let Type::Path(ref path) = *ty else {
        return Shape::Value;
    };

    let Some(segment) = path.path.segments.last() else {
        return Shape::Value;
    };

    let PathArguments::AngleBracketed(ref arguments) = segment.arguments else {
        return Shape::Value;
    };

    match arguments.args.iter().exactly_one() {
        Ok(GenericArgument::Type(_)) if segment.ident == "Option" => Shape::Pointer,
        Ok(GenericArgument::Type(_)) if segment.ident == "Vec" => Shape::Slice,
        _ => Shape::Value,
    }
}

/// Split a tag at its unescaped commas. Escapes are kept; only the split
/// matters here.
fn split_tag(tag: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut chars = tag.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                token.push(c);
                token.extend(chars.next());
            }
            ',' => tokens.push(std::mem::take(&mut token)),
            c => token.push(c),
        }
    }

    tokens.push(token);
    tokens.iter().map(|token| token.trim().to_owned()).collect()
}

impl<'a> ParsedFieldInfo<'a> {
    pub fn from_field(field: &'a Field) -> syn::Result<Self> {
        let parsed = RawParsedAttr::from_attributes(&field.attrs)?;

        if parsed.tag.is_none() && parsed.desc.is_none() && parsed.embed.is_none() {
            return Ok(Self::Ignored);
        }

        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new(field.span(), "can't bind the fields of tuple structs")
        })?;

        if let Some(()) = parsed.embed {
            return match parsed.tag {
                Some(tag) => Err(syn::Error::new(
                    tag.span(),
                    "embedded structures take their options from their own fields; \
                    they can't have a tag",
                )),
                None if parsed.desc.is_some() => Err(syn::Error::new(
                    field.span(),
                    "embedded structures can't have a description",
                )),
                None => Ok(Self::Embedded(EmbeddedFieldInfo { ident })),
            };
        }

        let tag = parsed.tag.ok_or_else(|| {
            syn::Error::new(
                field.span(),
                "bound fields need a tag, such as #[opts(tag = \"-v,--verbose\")]",
            )
        })?;

        if tag.trim().is_empty() {
            return Err(syn::Error::new(tag.span(), "tags can't be empty"));
        }

        let description = match parsed.desc {
            Some(desc) => desc,
            None => compute_docs(&field.attrs)?,
        };

        Ok(Self::Bound(BoundFieldInfo {
            ident,
            tag,
            description,
            shape: field_shape(&field.ty),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn shapes() {
        assert_eq!(field_shape(&parse_quote!(bool)), Shape::Value);
        assert_eq!(field_shape(&parse_quote!(Option<String>)), Shape::Pointer);
        assert_eq!(field_shape(&parse_quote!(std::option::Option<u8>)), Shape::Pointer);
        assert_eq!(field_shape(&parse_quote!(Vec<PathBuf>)), Shape::Slice);
        assert_eq!(field_shape(&parse_quote!(HashMap<String, u8>)), Shape::Value);
        assert_eq!(field_shape(&parse_quote!(&'static str)), Shape::Value);
    }

    #[test]
    fn tag_tokens() {
        assert_eq!(split_tag("-v, --verbose"), ["-v", "--verbose"]);
        assert_eq!(split_tag(r"--items,sep:\,"), ["--items", r"sep:\,"]);
    }

    #[test]
    fn docs_are_joined() {
        let field: Field = parse_quote! {
            /// Display more
            /// output
            #[opts(tag = "-v")]
            verbose: bool
        };

        assert_eq!(compute_docs(&field.attrs).unwrap(), "Display more output");
    }

    #[test]
    fn fields() {
        let bound: Field = parse_quote! {
            #[opts(tag = "-p,--port", desc = "Serial port")]
            port: Option<String>
        };

        match ParsedFieldInfo::from_field(&bound).unwrap() {
            ParsedFieldInfo::Bound(info) => {
                assert_eq!(info.ident.to_string(), "port");
                assert_eq!(info.description, "Serial port");
                assert_eq!(info.shape, Shape::Pointer);

                let names: Vec<String> =
                    info.flag_names().map(|name| name.as_str().to_owned()).collect();
                assert_eq!(names, ["-p", "--port"]);
            }
            _ => panic!("expected a bound field"),
        }

        let ignored: Field = parse_quote!(cache: Vec<u8>);
        assert!(matches!(
            ParsedFieldInfo::from_field(&ignored).unwrap(),
            ParsedFieldInfo::Ignored
        ));

        let embedded_with_tag: Field = parse_quote! {
            #[opts(embed, tag = "-x")]
            inner: Inner
        };
        assert!(ParsedFieldInfo::from_field(&embedded_with_tag).is_err());

        let untagged: Field = parse_quote! {
            #[opts(desc = "no tag")]
            value: u8
        };
        assert!(ParsedFieldInfo::from_field(&untagged).is_err());
    }
}
