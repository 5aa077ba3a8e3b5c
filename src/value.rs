/*!
Conversion of raw strings into typed field values.

A [`ValueRegistry`] maps a [`TypeId`] to the way values of that type are
parsed. There are three ways to teach a registry about a type, tried in this
order when a value is parsed:

1. An exact conversion function, registered with [`ValueRegistry::register`].
2. The [`SetFromStr`] capability, registered with
   [`ValueRegistry::register_settable`]. The value starts as
   `T::default()` and is updated in place.
3. The [`FromStr`] capability, registered with
   [`ValueRegistry::register_text`].

[`ValueRegistry::default`] comes with conversions for the primitive numbers,
`bool`, [`String`], [`PathBuf`][std::path::PathBuf] and
[`Duration`][std::time::Duration] already registered.
 */

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::{ConfigError, ValueError};

/**
A type whose value can be updated from a raw string. This is the equivalent
of [`FromStr`] for types that naturally start from an empty state and are
configured in place.
 */
pub trait SetFromStr {
    type Err: Display;

    fn set_from_str(&mut self, raw: &str) -> Result<(), Self::Err>;
}

type Conversion = Box<dyn Fn(&str) -> Result<Box<dyn Any>, String>>;

struct Registered {
    /// Address of the registered function, so that re-registering the same
    /// function can be detected
    address: usize,
    convert: Conversion,
}

/// A table of string conversions, keyed by the type they produce. See the
/// [module docs][crate::value] for details.
pub struct ValueRegistry {
    functions: HashMap<TypeId, Registered>,
    settable: HashMap<TypeId, Conversion>,
    text: HashMap<TypeId, Conversion>,
}

impl ValueRegistry {
    /// Create a registry that can't parse anything at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
            settable: HashMap::new(),
            text: HashMap::new(),
        }
    }

    /**
    Register the conversion function for `T`. Registering the same function
    twice is allowed and does nothing; registering a different function for
    a type that already has one is an error.
     */
    pub fn register<T, E>(&mut self, parse: fn(&str) -> Result<T, E>) -> Result<&mut Self, ConfigError>
    where
        T: Any,
        E: Display + 'static,
    {
        let address = parse as usize;

        if let Some(existing) = self.functions.get(&TypeId::of::<T>()) {
            return match existing.address == address {
                true => Ok(self),
                false => Err(ConfigError::DuplicateParser {
                    type_name: short_type_name(type_name::<T>()),
                }),
            };
        }

        log::trace!("registering parse function for {}", type_name::<T>());

        self.functions.insert(
            TypeId::of::<T>(),
            Registered {
                address,
                convert: Box::new(move |raw| boxed(parse(raw))),
            },
        );

        Ok(self)
    }

    /// Register the [`SetFromStr`] capability of `T`
    pub fn register_settable<T>(&mut self) -> &mut Self
    where
        T: SetFromStr + Default + Any,
    {
        self.settable.insert(
            TypeId::of::<T>(),
            Box::new(|raw| {
                let mut value = T::default();
                boxed(value.set_from_str(raw).map(|()| value))
            }),
        );

        self
    }

    /// Register the [`FromStr`] capability of `T`
    pub fn register_text<T>(&mut self) -> &mut Self
    where
        T: FromStr + Any,
        T::Err: Display,
    {
        self.text
            .insert(TypeId::of::<T>(), Box::new(|raw| boxed(raw.parse::<T>())));

        self
    }

    /// True if values of the type can be parsed by this registry
    #[must_use]
    pub fn can_parse(&self, type_id: TypeId) -> bool {
        self.conversion(type_id).is_some()
    }

    /// True if values of `T` can be parsed by this registry
    #[inline]
    #[must_use]
    pub fn can_parse_type<T: Any>(&self) -> bool {
        self.can_parse(TypeId::of::<T>())
    }

    fn conversion(&self, type_id: TypeId) -> Option<&Conversion> {
        self.functions
            .get(&type_id)
            .map(|registered| &registered.convert)
            .or_else(|| self.settable.get(&type_id))
            .or_else(|| self.text.get(&type_id))
    }

    /**
    Parse `raw` into a value of the given type, returned type-erased.

    # Panics

    Panics if the type can't be parsed at all. Option sets check
    [`can_parse`][Self::can_parse] for every field when they're built, so
    this can only happen if that check was skipped.
     */
    pub fn parse_any(
        &self,
        type_id: TypeId,
        type_name: &str,
        raw: &str,
    ) -> Result<Box<dyn Any>, ValueError> {
        let Some(convert) = self.conversion(type_id) else {
            unreachable!("no conversion for '{type_name}'; option sets check can_parse when built")
        };

        convert(raw).map_err(|message| ValueError {
            type_name: short_type_name(type_name),
            message,
        })
    }

    /// Parse `raw` into a `T`
    pub fn parse<T: Any>(&self, raw: &str) -> Result<T, ValueError> {
        self.parse_any(TypeId::of::<T>(), type_name::<T>(), raw)
            .map(|value| match value.downcast::<T>() {
                Ok(value) => *value,
                Err(_) => unreachable!("conversions are keyed by the type they produce"),
            })
    }
}

impl Default for ValueRegistry {
    /// A registry with the built-in conversions
    fn default() -> Self {
        let mut registry = Self::empty();
        crate::impls::register_builtins(&mut registry);
        registry
    }
}

impl fmt::Debug for ValueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRegistry")
            .field("functions", &self.functions.len())
            .field("settable", &self.settable.len())
            .field("text", &self.text.len())
            .finish()
    }
}

fn boxed<T: Any, E: Display>(result: Result<T, E>) -> Result<Box<dyn Any>, String> {
    match result {
        Ok(value) => Ok(Box::new(value)),
        Err(err) => Err(err.to_string()),
    }
}

/// Strip the module paths from a type name, turning
/// `core::option::Option<alloc::string::String>` into `Option<String>`
pub(crate) fn short_type_name(name: &str) -> String {
    name.split_inclusive(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .map(|piece| match piece.rfind("::") {
            Some(i) => &piece[i + 2..],
            None => piece,
        })
        .collect()
}
