/*!
The [`OptionSet`]: the validated collection of the options of a structure,
and the phases that resolve defaults, environment variables and
command-line arguments onto an instance of that structure.
 */

use std::any::TypeId;
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashMap;

use optbind_lexer::{ArgAccess, ArgumentsParser, Visitor};

use crate::errors::{ConfigError, ResolveError, Signal, Stop};
use crate::fields::{Bind, Declaration, Fields, Shape};
use crate::option::{Kind, Opt};
use crate::tags::Tag;
use crate::value::{ValueRegistry, short_type_name};

/**
The options of a structure `T`: flags in declaration order, positionals in
index order, and the optional catch-all. An option set is a model of the
structure's bindings; every operation that writes values takes the target
instance explicitly.
 */
pub struct OptionSet<T> {
    registry: ValueRegistry,
    flags: Vec<Opt<T>>,
    positionals: Vec<Opt<T>>,
    catch_all: Option<Opt<T>>,
}

impl<T: Bind> OptionSet<T> {
    /// Build the option set of `T` with the default [`ValueRegistry`]
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_registry(ValueRegistry::default())
    }

    /// Build the option set of `T`, parsing values with the given registry
    pub fn with_registry(registry: ValueRegistry) -> Result<Self, ConfigError> {
        Self::from_fields(Fields::of(), registry)
    }
}

/// Parse the tag of a single declaration and classify it
fn build_option<T>(
    declaration: Declaration<T>,
    registry: &ValueRegistry,
) -> Result<Opt<T>, ConfigError> {
    let field = declaration.field;

    if !registry.can_parse(declaration.value_type) {
        return Err(ConfigError::NotParsable {
            field,
            type_name: short_type_name(declaration.field_type_name),
        });
    }

    let tag = Tag::parse(&declaration.tag).map_err(|source| ConfigError::Tag { field, source })?;

    let named = tag.short.is_some() || tag.long.is_some();
    let roles = [named, tag.position > 0, tag.catch_all];

    match roles.into_iter().filter(|&role| role).count() {
        0 => return Err(ConfigError::Unnamed { field }),
        1 => {}
        _ => return Err(ConfigError::AmbiguousRole { field }),
    }

    let kind = match declaration.shape {
        Shape::Slice => Kind::Slice,
        _ if declaration.value_type == TypeId::of::<bool>() => Kind::Boolean,
        Shape::Pointer => Kind::Pointer,
        Shape::Value => Kind::Value,
    };

    Ok(Opt {
        short: tag.short,
        long: tag.long,
        kind,
        position: tag.position,
        catch_all: tag.catch_all,
        optional: false,
        pointer: declaration.shape == Shape::Pointer,
        default: tag.default,
        env: tag.env,
        sep: tag.sep,
        value_name: tag.value_name,
        description: declaration.description,
        field,
        value_type: declaration.value_type,
        type_name: declaration.value_type_name,
        slot: Some(declaration.slot),
    })
}

/// The first flag name shared by two options, if any
fn shared_name<T>(a: &Opt<T>, b: &Opt<T>) -> Option<String> {
    match (a.short, b.short) {
        (Some(x), Some(y)) if x == y => return Some(format!("-{x}")),
        _ => {}
    }

    match (a.long(), b.long()) {
        (Some(x), Some(y)) if x == y => Some(format!("--{x}")),
        _ => None,
    }
}

impl<T: 'static> OptionSet<T> {
    /**
    Build an option set from a collection of declared fields. Fails if any
    tag is malformed, any value type is unknown to the registry, or the
    options don't form a consistent set: flag names must be unique,
    positional indices must run from 1 without gaps, there can be at most one
    catch-all and it must be a `Vec`, and positionals can't be `Vec`s.
     */
    pub fn from_fields(fields: Fields<T>, registry: ValueRegistry) -> Result<Self, ConfigError> {
        let mut flags: Vec<Opt<T>> = Vec::new();
        let mut positionals: BTreeMap<usize, Opt<T>> = BTreeMap::new();
        let mut catch_all: Option<Opt<T>> = None;

        for declaration in fields.declarations {
            let opt = build_option(declaration, &registry)?;

            if opt.catch_all {
                if let Some(first) = &catch_all {
                    return Err(ConfigError::DuplicateCatchAll {
                        first: first.field,
                        second: opt.field,
                    });
                }
                catch_all = Some(opt);
            } else if opt.position > 0 {
                match positionals.entry(opt.position) {
                    Entry::Occupied(entry) => {
                        return Err(ConfigError::DuplicatePositional {
                            index: opt.position,
                            first: entry.get().field,
                            second: opt.field,
                        });
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(opt);
                    }
                }
            } else {
                if let Some((first, flag)) = flags
                    .iter()
                    .find_map(|existing| shared_name(existing, &opt).map(|flag| (existing, flag)))
                {
                    return Err(ConfigError::DuplicateFlag {
                        flag,
                        first: first.field,
                        second: opt.field,
                    });
                }
                flags.push(opt);
            }
        }

        let count = positionals.len();
        if let Some(missing) = (1..=count).find(|index| !positionals.contains_key(index)) {
            return Err(ConfigError::PositionalGap { count, missing });
        }

        if let Some(opt) = catch_all.as_ref().filter(|opt| opt.kind != Kind::Slice) {
            return Err(ConfigError::CatchAllNotSlice {
                field: opt.field,
                type_name: short_type_name(opt.type_name),
            });
        }

        let mut positionals: Vec<Opt<T>> = positionals.into_values().collect();

        if let Some(opt) = positionals.iter().find(|opt| opt.kind == Kind::Slice) {
            return Err(ConfigError::PositionalSlice {
                field: opt.field,
                type_name: format!("Vec<{}>", short_type_name(opt.type_name)),
            });
        }

        positionals
            .iter_mut()
            .rev()
            .take_while(|opt| opt.pointer)
            .for_each(|opt| opt.optional = true);

        log::debug!(
            "built option set with {} flags, {} positionals and {} catch-all",
            flags.len(),
            positionals.len(),
            match catch_all {
                Some(_) => "a",
                None => "no",
            },
        );

        Ok(Self {
            registry,
            flags,
            positionals,
            catch_all,
        })
    }

    /// The registry used to parse values
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ValueRegistry {
        &self.registry
    }

    /// The flags, in declaration order, followed by any special flags
    #[inline]
    #[must_use]
    pub fn flags(&self) -> &[Opt<T>] {
        &self.flags
    }

    /// The positional arguments, in index order
    #[inline]
    #[must_use]
    pub fn positionals(&self) -> &[Opt<T>] {
        &self.positionals
    }

    /// The option receiving the remaining arguments, if any
    #[inline]
    #[must_use]
    pub fn catch_all(&self) -> Option<&Opt<T>> {
        self.catch_all.as_ref()
    }

    /// Every option: flags, then positionals, then the catch-all
    pub fn options(&self) -> impl Iterator<Item = &Opt<T>> {
        self.flags
            .iter()
            .chain(&self.positionals)
            .chain(&self.catch_all)
    }

    /// Find a flag by its short or long name, without dashes
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&Opt<T>> {
        let mut chars = name.chars();

        match (chars.next(), chars.next()) {
            (None, _) => None,
            (Some(short), None) => self
                .short_flag(short)
                .or_else(|| self.long_flag(name)),
            (Some(_), Some(_)) => self.long_flag(name),
        }
    }

    pub(crate) fn short_flag(&self, short: char) -> Option<&Opt<T>> {
        self.flags.iter().find(|opt| opt.short == Some(short))
    }

    pub(crate) fn long_flag(&self, long: &str) -> Option<&Opt<T>> {
        self.flags.iter().find(|opt| opt.long() == Some(long))
    }

    /**
    Add a flag that raises `signal` when it's given, such as `--help`.

    If `long` is already taken the special flag isn't added at all. If
    `short` is taken, its upper case version is used instead, and if that is
    also taken the special flag gets no short name. Adding the same special
    flag again does nothing.
     */
    pub fn add_special_flag(
        &mut self,
        short: Option<char>,
        long: &str,
        description: &str,
        signal: Signal,
    ) {
        if !long.is_empty() && self.long_flag(long).is_some() {
            log::debug!("skipping special flag --{long}: already taken");
            return;
        }

        let short = short
            .map(|short| match self.short_flag(short) {
                None => short,
                Some(_) => short.to_ascii_uppercase(),
            })
            .filter(|&short| self.short_flag(short).is_none());

        self.flags
            .push(Opt::special(short, long, description, signal));
    }

    fn assign(&self, opt: &Opt<T>, target: &mut T, raw: &str) -> Result<(), ResolveError> {
        log::trace!("setting {} to {raw:?}", opt.name());

        opt.set_value(&self.registry, target, raw)
            .map_err(|source| ResolveError::InvalidValue {
                option: opt.name(),
                source,
            })
    }

    /// Set every option that has a default value to that value
    pub fn apply_defaults(&self, target: &mut T) -> Result<(), ResolveError> {
        self.options()
            .filter(|opt| !opt.default.is_empty())
            .try_for_each(|opt| {
                log::trace!("default for {}: {:?}", opt.name(), opt.default);

                opt.set_value(&self.registry, target, &opt.default)
                    .map_err(|source| ResolveError::Defaults {
                        option: opt.name(),
                        source,
                    })
            })
    }

    /// Set every option bound to an environment variable present in `env`
    /// to the value of that variable
    pub fn apply_env(
        &self,
        target: &mut T,
        env: &HashMap<String, String>,
    ) -> Result<(), ResolveError> {
        self.options()
            .filter(|opt| !opt.env.is_empty())
            .filter_map(|opt| env.get(&opt.env).map(|value| (opt, value)))
            .try_for_each(|(opt, value)| {
                log::trace!("{}={value:?} for {}", opt.env, opt.name());

                opt.set_value(&self.registry, target, value)
                    .map_err(|source| ResolveError::Environment {
                        variable: opt.env.clone(),
                        option: opt.name(),
                        source,
                    })
            })
    }

    /**
    Apply the command-line arguments (excluding the program name) to
    `target`. Flags are applied as they're scanned; the remaining tokens
    then fill the positionals in order, and whatever is left goes to the
    catch-all.

    Scanning stops at the first special flag, which is reported as
    [`Stop::Signal`], or at the first error.
     */
    pub fn apply_args<S: AsRef<str>>(&self, target: &mut T, args: &[S]) -> Result<(), Stop> {
        let mut parser = ArgumentsParser::new(args.iter().map(S::as_ref));
        let mut tokens = Vec::new();

        while let Some(result) = parser.next_arg(ApplyVisitor {
            set: self,
            target: &mut *target,
            tokens: &mut tokens,
        }) {
            result?;
        }

        let mut tokens = tokens.into_iter();

        for opt in &self.positionals {
            match tokens.next() {
                Some(token) => self.assign(opt, target, token)?,
                None if opt.optional => break,
                None => {
                    return Err(ResolveError::MissingArgument {
                        option: opt.name(),
                    }
                    .into());
                }
            }
        }

        let extra: Vec<&str> = tokens.collect();

        match (&self.catch_all, extra.is_empty()) {
            (_, true) => Ok(()),
            (Some(opt), false) => extra
                .into_iter()
                .try_for_each(|token| self.assign(opt, target, token))
                .map_err(Stop::Error),
            (None, false) => Err(ResolveError::UnsupportedArguments {
                arguments: extra.into_iter().map(str::to_owned).collect(),
            }
            .into()),
        }
    }
}

impl<T> std::fmt::Debug for OptionSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionSet")
            .field("flags", &self.flags)
            .field("positionals", &self.positionals)
            .field("catch_all", &self.catch_all)
            .finish_non_exhaustive()
    }
}

/// Visitor applying each scanned flag to the target; positional tokens are
/// collected for later
struct ApplyVisitor<'a, 'arg, T> {
    set: &'a OptionSet<T>,
    target: &'a mut T,
    tokens: &'a mut Vec<&'arg str>,
}

impl<'arg, T: 'static> ApplyVisitor<'_, 'arg, T> {
    fn activate(self, opt: &Opt<T>, arg: impl ArgAccess<'arg>) -> Result<(), Stop> {
        match opt.kind {
            Kind::Special(signal) => Err(Stop::Signal(signal)),
            Kind::Boolean => {
                log::trace!("setting {}", opt.name());
                opt.set_true(self.target);
                Ok(())
            }
            _ => match arg.take() {
                Some(value) => Ok(self.set.assign(opt, self.target, value)?),
                None => Err(ResolveError::MissingArgument {
                    option: opt.name(),
                }
                .into()),
            },
        }
    }
}

impl<'arg, T: 'static> Visitor<'arg> for ApplyVisitor<'_, 'arg, T> {
    type Value = Result<(), Stop>;

    fn visit_positional(self, argument: &'arg str) -> Self::Value {
        self.tokens.push(argument);
        Ok(())
    }

    fn visit_long_option(self, option: &'arg str, argument: &'arg str) -> Self::Value {
        let opt = self
            .set
            .long_flag(option)
            .ok_or_else(|| ResolveError::InvalidFlag {
                flag: format!("--{option}"),
            })?;

        match opt.kind {
            Kind::Special(signal) => Err(Stop::Signal(signal)),
            Kind::Boolean if argument.is_empty() => {
                opt.set_true(self.target);
                Ok(())
            }
            _ => Ok(self.set.assign(opt, self.target, argument)?),
        }
    }

    fn visit_long(self, option: &'arg str, arg: impl ArgAccess<'arg>) -> Self::Value {
        let opt = self
            .set
            .long_flag(option)
            .ok_or_else(|| ResolveError::InvalidFlag {
                flag: format!("--{option}"),
            })?;

        self.activate(opt, arg)
    }

    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value {
        let opt = self
            .set
            .short_flag(option)
            .ok_or_else(|| ResolveError::InvalidFlag {
                flag: format!("-{option}"),
            })?;

        self.activate(opt, arg)
    }
}
