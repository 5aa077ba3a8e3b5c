/*!
A tag-driven command line options library: the fields of a structure are bound
to flags, positional arguments, default values and environment variables by
short declarative tags, and resolved in place from the process context. The
same bindings answer shell completion requests.

```
use optbind::{Bind, Command, Handler, Outcome};

#[derive(Debug, Default, Bind)]
struct Options {
    /// Display more output
    #[opts(tag = "-v,--verbose")]
    verbose: bool,

    #[opts(tag = "-b,--baud,default:115200,env:BAUD", desc = "Baud rate")]
    baud: u32,

    #[opts(tag = "arg:1,name:port", desc = "Serial port to open")]
    port: String,
}

impl Handler for Options {}

let mut command = Command::new(Options::default());
command.args = ["sercat", "-v", "/dev/ttyUSB0"].map(String::from).into();

assert_eq!(command.resolve().unwrap(), Outcome::Ready);

let options = command.into_handler();
assert!(options.verbose);
assert_eq!(options.baud, 115200);
assert_eq!(options.port, "/dev/ttyUSB0");
```

A tag is a comma separated list of:

- `-x`: a short flag
- `--name`: a long flag
- `arg:N`: the `N`th positional argument, counting from 1
- `args`: every remaining positional argument, for a `Vec` field
- `default:VALUE`: a default value, applied before anything else
- `env:NAME`: an environment variable overriding the default
- `sep:CHARS`: for `Vec` fields, characters separating several values in
  a single argument
- `name:NAME`: the name of the value in usage messages

Commas, colons and backslashes in values are escaped with a backslash.

The pieces can be used separately: [`Fields`] and [`OptionSet`] build the
option model of a structure and apply each source to an instance, and
[`OptionSet::completion`] works out what could be completed at a point of
a command line. [`Command`] drives them in order for a [`Handler`].
 */

extern crate self as optbind;

pub mod command;
pub mod completion;
pub mod duration;
pub mod errors;
pub mod fields;
mod impls;
pub mod option;
pub mod set;
pub mod tags;
pub mod usage;
pub mod value;

pub use command::{COMP_INDEX, COMP_WORD, Command, Handler, Outcome};
pub use completion::{Completion, Pending};
pub use errors::{ConfigError, Error, ResolveError, Signal, Stop, ValueError};
pub use fields::{Bind, Fields};
pub use option::{Kind, Opt};
pub use optbind_derive::Bind;
pub use set::OptionSet;
pub use usage::Description;
pub use value::{SetFromStr, ValueRegistry};

/// The set of tags that identify a flag (`-short`, `--long`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tags<'a> {
    /// This flag uses only a long tag
    Long { long: &'a str },

    /// This flag uses only a short tag
    Short { short: char },

    /// This flag uses both a long and short tag
    LongShort { long: &'a str, short: char },
}

impl<'a> Tags<'a> {
    /// Get the long tag, if any
    #[inline]
    #[must_use]
    pub const fn long(&self) -> Option<&'a str> {
        match self {
            Tags::Long { long } | Tags::LongShort { long, .. } => Some(long),
            Tags::Short { .. } => None,
        }
    }

    /// Get the short tag, if any
    #[inline]
    #[must_use]
    pub const fn short(&self) -> Option<char> {
        match self {
            Tags::Short { short } | Tags::LongShort { short, .. } => Some(*short),
            Tags::Long { .. } => None,
        }
    }
}
