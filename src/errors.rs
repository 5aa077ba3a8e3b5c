/*!
Error types for the two phases of `optbind`: building an
[`OptionSet`][crate::OptionSet] from a structure's declarations
([`ConfigError`]), and resolving values onto that structure
([`ResolveError`]).

A [`ConfigError`] means the host program's declarations are wrong and should
be treated as a bug. A [`ResolveError`] means the end user gave a bad command
line or environment, and its message is meant to be shown to them verbatim.
 */

use joinery::JoinableIterator;
use thiserror::Error;

use crate::tags::TagError;

/// The declarations of a structure can't be turned into an option set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The binding tag of the field couldn't be parsed
    #[error("invalid tag on field '{field}': {source}")]
    Tag {
        field: &'static str,
        #[source]
        source: TagError,
    },

    /// No conversion is registered for the field's value type
    #[error("type '{type_name}' of field '{field}' is not parsable")]
    NotParsable {
        field: &'static str,
        type_name: String,
    },

    /// The tag names no flag, positional index, or catch-all
    #[error("field '{field}' needs a flag name, an 'arg:N' index, or 'args'")]
    Unnamed { field: &'static str },

    /// The tag mixes flag names, positional indices, and `args`
    #[error("field '{field}' can only be one of a flag, a positional argument, or 'args'")]
    AmbiguousRole { field: &'static str },

    /// Two fields claim the same flag name
    #[error("flag '{flag}' defined by multiple fields: '{first}' and '{second}'")]
    DuplicateFlag {
        flag: String,
        first: &'static str,
        second: &'static str,
    },

    /// Two fields claim the same positional index
    #[error("positional argument '{index}' defined by multiple fields: '{first}' and '{second}'")]
    DuplicatePositional {
        index: usize,
        first: &'static str,
        second: &'static str,
    },

    /// The positional indices don't form a contiguous run from 1
    #[error("{count} positional arguments defined, but 'arg:{missing}' is missing")]
    PositionalGap { count: usize, missing: usize },

    /// More than one field is tagged `args`
    #[error("multiple fields capturing remaining args: '{first}' and '{second}'")]
    DuplicateCatchAll {
        first: &'static str,
        second: &'static str,
    },

    /// The `args` field isn't a sequence
    #[error("field '{field}' of type '{type_name}' must be a Vec to receive additional arguments")]
    CatchAllNotSlice {
        field: &'static str,
        type_name: String,
    },

    /// A positional field is a sequence
    #[error("field '{field}' of type '{type_name}' cannot be a Vec to receive a positional argument")]
    PositionalSlice {
        field: &'static str,
        type_name: String,
    },

    /// A different conversion function is already registered for the type
    #[error("parse function for type '{type_name}' is already registered")]
    DuplicateParser { type_name: String },
}

/// A raw string couldn't be converted into the type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse value for type '{type_name}': {message}")]
pub struct ValueError {
    pub(crate) type_name: String,
    pub(crate) message: String,
}

impl ValueError {
    /// The (shortened) name of the type that failed to parse
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The message of the underlying conversion error
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The end user's input couldn't be resolved onto the structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// A `--long` or `-s` flag on the command line isn't recognized
    #[error("invalid flag '{flag}'")]
    InvalidFlag { flag: String },

    /// An option or a required positional didn't get its value
    #[error("missing argument for '{option}'")]
    MissingArgument { option: String },

    /// A value from the command line failed to parse
    #[error("failed to set value for '{option}': {source}")]
    InvalidValue {
        option: String,
        #[source]
        source: ValueError,
    },

    /// Tokens were left over and there is no `args` field to take them
    #[error("unsupported extra arguments: {}", .arguments.iter().join_with(' '))]
    UnsupportedArguments { arguments: Vec<String> },

    /// A compiled-in default failed to parse
    #[error("while applying defaults, failed to set value for '{option}': {source}")]
    Defaults {
        option: String,
        #[source]
        source: ValueError,
    },

    /// A value from the environment failed to parse
    #[error(
        "while applying value from environment variable '{variable}', \
        failed to set value for '{option}': {source}"
    )]
    Environment {
        variable: String,
        option: String,
        #[source]
        source: ValueError,
    },
}

/// A control outcome raised by a special flag. These aren't errors: the
/// caller is expected to print something specific and exit successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `--help` was given
    Help,

    /// `--version` was given
    Version,

    /// `--bash-completion-script` was given
    CompletionScript,
}

/// The reason a command line scan stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stop {
    /// A special flag was found. This supersedes any error that later
    /// tokens would have caused.
    Signal(Signal),

    /// The command line was invalid
    Error(ResolveError),
}

impl From<ResolveError> for Stop {
    #[inline]
    fn from(error: ResolveError) -> Self {
        Self::Error(error)
    }
}

/// Any error produced by [`Command::resolve`][crate::Command::resolve].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
