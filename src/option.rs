/*!
The [`Opt`] type, describing how a single field of a structure is bound to
the command line and environment, and how values are written into it.
 */

use std::any::TypeId;
use std::fmt::{self, Write as _};

use lazy_format::lazy_format;

use crate::Tags;
use crate::errors::{Signal, ValueError};
use crate::fields::Slot;
use crate::usage::Description;
use crate::value::ValueRegistry;

/// How an option receives its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A plain value, replaced every time the option is given
    Value,

    /// A boolean flag. It doesn't consume a token: its presence sets it to
    /// `true`, though `--flag=false` is still possible.
    Boolean,

    /// An `Option<V>`, which is `Some` once any value was given
    Pointer,

    /// A `Vec<V>`, which is appended to every time the option is given
    Slice,

    /// A flag that aborts resolution with a [`Signal`]
    Special(Signal),
}

impl Kind {
    /// True if the option consumes a value when given as a flag
    #[inline]
    #[must_use]
    pub const fn takes_value(self) -> bool {
        matches!(self, Kind::Value | Kind::Pointer | Kind::Slice)
    }
}

/**
A bound option: a flag, a positional argument, or the catch-all. `T` is the
structure the option writes into.

Options are read-only once their [`OptionSet`][crate::OptionSet] is built;
values are written with [`set_value`][Opt::set_value] and
[`set_true`][Opt::set_true], which take the target structure explicitly.
 */
pub struct Opt<T> {
    pub(crate) short: Option<char>,
    pub(crate) long: Option<String>,
    pub(crate) kind: Kind,
    pub(crate) position: usize,
    pub(crate) catch_all: bool,
    pub(crate) optional: bool,

    /// True if the field is an `Option<V>`, even if it's a boolean
    pub(crate) pointer: bool,

    pub(crate) default: String,
    pub(crate) env: String,
    pub(crate) sep: String,
    pub(crate) value_name: String,
    pub(crate) description: String,
    pub(crate) field: &'static str,
    pub(crate) value_type: TypeId,
    pub(crate) type_name: &'static str,

    /// Absent only for special flags, which have no field
    pub(crate) slot: Option<Box<dyn Slot<T>>>,
}

impl<T> Opt<T> {
    /// Create a special flag, which raises `signal` when it's given
    pub(crate) fn special(
        short: Option<char>,
        long: &str,
        description: &str,
        signal: Signal,
    ) -> Self {
        Self {
            short,
            long: Some(long.to_owned()).filter(|long| !long.is_empty()),
            kind: Kind::Special(signal),
            position: 0,
            catch_all: false,
            optional: false,
            pointer: false,
            default: String::new(),
            env: String::new(),
            sep: String::new(),
            value_name: String::new(),
            description: description.to_owned(),
            field: "",
            value_type: TypeId::of::<()>(),
            type_name: "()",
            slot: None,
        }
    }

    /// The flag names of this option, if it has any
    #[must_use]
    pub fn tags(&self) -> Option<Tags<'_>> {
        match (self.short, self.long.as_deref()) {
            (Some(short), Some(long)) => Some(Tags::LongShort { long, short }),
            (Some(short), None) => Some(Tags::Short { short }),
            (None, Some(long)) => Some(Tags::Long { long }),
            (None, None) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn short(&self) -> Option<char> {
        self.short
    }

    #[inline]
    #[must_use]
    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The signal raised by a special flag
    #[inline]
    #[must_use]
    pub fn signal(&self) -> Option<Signal> {
        match self.kind {
            Kind::Special(signal) => Some(signal),
            _ => None,
        }
    }

    /// The 1-based positional index, or 0 if this isn't a positional
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// True for trailing `Option<V>` positionals, which may be omitted
    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default
    }

    #[inline]
    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }

    #[inline]
    #[must_use]
    pub fn separators(&self) -> &str {
        &self.sep
    }

    #[inline]
    #[must_use]
    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The name of the field this option is bound to. Empty for special
    /// flags.
    #[inline]
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The full name of the value type; the element type for sequences
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The type of the value; the element type for sequences
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// A display name for the option, as used in error messages: `--long`,
    /// `-s`, `<arg[2]>` or `<args>...`
    #[must_use]
    pub fn name(&self) -> String {
        let value_name = self.value_name.as_str();

        if self.catch_all {
            match value_name {
                "" => "<args>...".to_owned(),
                name => format!("<{name}>..."),
            }
        } else if self.position > 0 {
            match value_name {
                "" => format!("<arg[{}]>", self.position),
                name => format!("<{name}>"),
            }
        } else {
            self.tags().map(flag_name).map(|name| name.to_string()).unwrap_or_default()
        }
    }

    /// `<value-name>`, or empty if this option doesn't take a value
    fn value_description(&self) -> Option<impl fmt::Display + '_> {
        match self.kind {
            Kind::Boolean | Kind::Special(_) => None,
            _ => Some(lazy_format!(match (self.value_name.as_str()) {
                "" => "<value>",
                name => "<{name}>",
            })),
        }
    }

    /// The description, followed by the default and the environment variable
    fn full_description(&self) -> String {
        let mut description = self.description.clone();
        let extras = [("default", &self.default), ("env", &self.env)];

        for (key, value) in extras {
            if value.is_empty() {
                continue;
            }
            if !description.is_empty() {
                description.push_str(", ");
            }
            let _ = write!(description, "{key}: {value}");
        }

        description
    }

    fn with_value_description(&self, option: String) -> Description {
        let option = match (self.value_description(), option.is_empty()) {
            (None, _) => option,
            (Some(value), true) => value.to_string(),
            (Some(value), false) => format!("{option} {value}"),
        };

        Description {
            option,
            description: self.full_description(),
        }
    }

    /// The usage line for this option, such as `-s, --speed <baud>`
    #[must_use]
    pub fn usage(&self) -> Description {
        let option = match self.tags() {
            None => String::new(),
            Some(tags) => lazy_format!(match (tags) {
                Tags::LongShort { short, long } => "-{short}, --{long}",
                Tags::Short { short } => "-{short}",
                Tags::Long { long } => "    --{long}",
            })
            .to_string(),
        };

        self.with_value_description(option)
    }

    /// The completion candidate for this option, such as `--speed <baud>`,
    /// preferring the long name
    #[must_use]
    pub fn completion_usage(&self) -> Description {
        let option = self.tags().map(flag_name).map(|name| name.to_string());

        self.with_value_description(option.unwrap_or_default())
    }

    fn slot(&self) -> &dyn Slot<T> {
        match &self.slot {
            Some(slot) => slot.as_ref(),
            None => unreachable!("special flags never receive values"),
        }
    }

    /**
    Set a boolean flag to `true`.

    # Panics

    Panics if this option isn't a [`Kind::Boolean`].
     */
    pub fn set_true(&self, target: &mut T) {
        assert_eq!(
            self.kind,
            Kind::Boolean,
            "set_true called on the non-boolean option {}",
            self.name()
        );

        self.slot().store(target, Box::new(true));
    }

    /**
    Parse `raw` with the registry and write it into the field of `target`.

    For sequences with separators, `raw` is split into several values, each
    appended in turn; if one of them fails to parse, the values before it
    stay appended. An empty `raw` resets a sequence to empty.
     */
    pub fn set_value(
        &self,
        registry: &ValueRegistry,
        target: &mut T,
        raw: &str,
    ) -> Result<(), ValueError> {
        let slot = self.slot();

        match self.kind {
            Kind::Slice if raw.is_empty() => {
                slot.reset(target);
                Ok(())
            }
            Kind::Slice if !self.sep.is_empty() => split_slice_values(raw, &self.sep)
                .iter()
                .try_for_each(|piece| self.store(registry, slot, target, piece)),
            _ => self.store(registry, slot, target, raw),
        }
    }

    fn store(
        &self,
        registry: &ValueRegistry,
        slot: &dyn Slot<T>,
        target: &mut T,
        raw: &str,
    ) -> Result<(), ValueError> {
        let value = registry.parse_any(self.value_type, self.type_name, raw)?;
        slot.store(target, value);
        Ok(())
    }
}

impl<T> fmt::Debug for Opt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opt")
            .field("name", &self.name())
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// The preferred name of a flag, such as `--verbose`
fn flag_name(tags: Tags<'_>) -> impl fmt::Display + '_ {
    lazy_format!(match (tags) {
        Tags::LongShort { long, .. } | Tags::Long { long } => "--{long}",
        Tags::Short { short } => "-{short}",
    })
}

/// Split `raw` at any of the `separators`. A backslash makes the next
/// character literal. A trailing empty piece is dropped.
fn split_slice_values(raw: &str, separators: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => piece.extend(chars.next()),
            c if separators.contains(c) => pieces.push(std::mem::take(&mut piece)),
            c => piece.push(c),
        }
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }

    pieces
}
