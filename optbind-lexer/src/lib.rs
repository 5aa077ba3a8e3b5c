#![no_std]

/*!
Low-level scanning of command-line tokens. Takes care of distinctions between
long flags, short flag clusters, positionals and the `--` terminator. No
value handling happens here; whether a flag consumes a value is decided by
the [`Visitor`]. Usually this is too low level to use directly.
*/

#[cfg(test)]
extern crate std;

mod cluster;

use cluster::Cluster;

/**
The [`ArgumentsParser`] type operates by passing the tokens it finds into a
[`Visitor`], to be handled.

All of the `&'arg str` values handed to the visitor borrow from the original
token list. For instance, given `--target foo --path=bar input.txt`,
`target`, `foo`, `path`, `bar`, and `input.txt` would all be passed to the
relevant methods.
 */
pub trait Visitor<'arg> {
    type Value;

    /// A positional token, or any token after a lone `--`.
    fn visit_positional(self, argument: &'arg str) -> Self::Value;

    /// A long flag that definitely has a value, because it was given as
    /// `--option=argument`. The argument may be empty.
    fn visit_long_option(self, option: &'arg str, argument: &'arg str) -> Self::Value;

    /// A long flag, such as `--option`
    fn visit_long(self, option: &'arg str, arg: impl ArgAccess<'arg>) -> Self::Value;

    /// A single flag from a short cluster, such as the `o` in `-vo`
    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value;
}

/**
[`ArgAccess`] allows a visitor to decide if a given flag needs a value, based
on the identity of the flag.

Consider `--foo bar`. Is this a pair of tokens (the flag `--foo` and the
positional `bar`) or a single option `--foo bar` that takes a value?
Similarly, `-abfoo` could be `-a -b foo` or `-a -b -f -o -o`. The
[`ArgumentsParser`] can't independently classify a given token, so instead a
visitor requests a value via this trait only for options that need one and
the parser takes care of where that value comes from.
*/
pub trait ArgAccess<'arg>: Sized {
    /**
    Get a value from the parser. This should only be called by options that
    need it; boolean flags should simply ignore it, so that the rest of a
    short cluster (or the next token) is scanned independently.

    For a short flag with characters remaining in its cluster, the value is
    the remainder of the cluster. Otherwise it is the next token, taken
    verbatim, even if it looks like a flag or is a lone `--`. Returns [`None`]
    if the tokens are exhausted.
    */
    fn take(self) -> Option<&'arg str>;
}

#[derive(Debug, Clone, Copy)]
enum State<'arg> {
    Ready,
    PositionalOnly,
    ShortInProgress(Cluster<'arg>),
}

/**
An `ArgumentsParser` is the main entry point into `optbind_lexer`. It scans a
token in each call to `next_arg`, sending what it finds to the given
[`Visitor`]. It handles distinguishing flags, options, and positionals; how
options get their values; and the `--` terminator.

The parser operates entirely on borrowed data. The ubiquitous `'arg`
lifetime refers to the borrowed token list.
*/
#[derive(Debug, Clone)]
pub struct ArgumentsParser<'arg, I> {
    state: State<'arg>,
    args: I,
}

impl<'arg, I> ArgumentsParser<'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    /**
    Create a new [`ArgumentsParser`] from an iterator of tokens. This list
    should *exclude* the name of the program, which is commonly passed as the
    first token.
     */
    #[inline]
    #[must_use]
    pub fn new(args: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            state: State::Ready,
            args: args.into_iter(),
        }
    }

    /// Put `self` into a `PositionalOnly` state, then process a positional
    /// token
    #[inline]
    fn positional_only_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        debug_assert!(!matches!(self.state, State::ShortInProgress(_)));

        self.state = State::PositionalOnly;
        self.args.next().map(|arg| visitor.visit_positional(arg))
    }

    /// Put `self` into a `Ready` state, then return a StandardArgAccess
    #[inline]
    fn standard_arg(&mut self) -> StandardArgAccess<'_, 'arg, I> {
        debug_assert!(!matches!(self.state, State::PositionalOnly));

        self.state = State::Ready;
        StandardArgAccess { parent: self }
    }

    /// Put `self` into a `ShortInProgress` state, then return a
    /// ShortArgAccess.
    #[inline]
    fn short_arg(&mut self, rest: Cluster<'arg>) -> ShortArgAccess<'_, 'arg> {
        debug_assert!(!matches!(self.state, State::PositionalOnly));

        self.state = State::ShortInProgress(rest);
        ShortArgAccess {
            rest: rest.get(),
            state: &mut self.state,
        }
    }

    /// Handle the first flag of a short cluster. If there is remaining
    /// content in the cluster, it's the candidate value; otherwise, the next
    /// token is the candidate.
    #[inline]
    fn handle_short<V>(&mut self, cluster: Cluster<'arg>, visitor: V) -> V::Value
    where
        V: Visitor<'arg>,
    {
        let (option, rest) = cluster.split_first();

        match Cluster::new(rest) {
            None => visitor.visit_short(option, self.standard_arg()),
            Some(rest) => visitor.visit_short(option, self.short_arg(rest)),
        }
    }

    /// Scan the next flag or token, returning [`None`] once every token has
    /// been consumed.
    pub fn next_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        match self.state {
            State::Ready => match self.args.next()? {
                "--" => self.positional_only_arg(visitor),
                argument => Some(match argument.strip_prefix("--") {
                    Some(option) => match split_once(option, b'=') {
                        Some((option, argument)) => visitor.visit_long_option(option, argument),
                        None => visitor.visit_long(option, self.standard_arg()),
                    },
                    None => match argument.strip_prefix('-').map(Cluster::new) {
                        Some(Some(cluster)) => self.handle_short(cluster, visitor),
                        // A lone `-` conventionally means stdin
                        Some(None) | None => visitor.visit_positional(argument),
                    },
                }),
            },
            State::PositionalOnly => self.positional_only_arg(visitor),
            State::ShortInProgress(cluster) => Some(self.handle_short(cluster, visitor)),
        }
    }
}

/// ArgAccess implementation that gets the next token from the list.
struct StandardArgAccess<'a, 'arg, I> {
    parent: &'a mut ArgumentsParser<'arg, I>,
}

impl<'arg, I> ArgAccess<'arg> for StandardArgAccess<'_, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    #[inline]
    fn take(self) -> Option<&'arg str> {
        self.parent.args.next()
    }
}

/// ArgAccess implementation that gets the remainder of a short cluster.
/// Handles things like `-ovalue`, which is equivalent to `-o value`.
struct ShortArgAccess<'a, 'arg> {
    rest: &'arg str,
    state: &'a mut State<'arg>,
}

impl<'arg> ArgAccess<'arg> for ShortArgAccess<'_, 'arg> {
    #[inline]
    fn take(self) -> Option<&'arg str> {
        debug_assert!(
            matches!(*self.state, State::ShortInProgress(rest) if rest.get() == self.rest)
        );

        *self.state = State::Ready;
        Some(self.rest)
    }
}

fn split_once(input: &str, delimiter: u8) -> Option<(&str, &str)> {
    // `delimiter` is ascii, so both halves are on char boundaries
    memchr::memchr(delimiter, input.as_bytes()).map(|i| (&input[..i], &input[i + 1..]))
}

#[cfg(test)]
mod tests {
    use std::{format, string::String, vec, vec::Vec};

    use super::{ArgAccess, ArgumentsParser, Visitor};

    /// Records every scanned item. Flags listed in `takes_value` request a
    /// value; everything else is treated as a boolean flag.
    struct Recorder<'a> {
        takes_value: &'a [char],
        events: &'a mut Vec<String>,
    }

    impl<'arg> Visitor<'arg> for Recorder<'_> {
        type Value = ();

        fn visit_positional(self, argument: &'arg str) -> Self::Value {
            self.events.push(format!("pos {argument}"));
        }

        fn visit_long_option(self, option: &'arg str, argument: &'arg str) -> Self::Value {
            self.events.push(format!("long {option}={argument}"));
        }

        fn visit_long(self, option: &'arg str, arg: impl ArgAccess<'arg>) -> Self::Value {
            let event = match option.starts_with("val") {
                true => format!("long {option} {:?}", arg.take()),
                false => format!("long {option}"),
            };
            self.events.push(event);
        }

        fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value {
            let event = match self.takes_value.contains(&option) {
                true => format!("short {option} {:?}", arg.take()),
                false => format!("short {option}"),
            };
            self.events.push(event);
        }
    }

    fn scan(tokens: &[&str], takes_value: &[char]) -> Vec<String> {
        let mut events = Vec::new();
        let mut parser = ArgumentsParser::new(tokens.iter().copied());

        while let Some(()) = parser.next_arg(Recorder {
            takes_value,
            events: &mut events,
        }) {}

        events
    }

    #[test]
    fn short_cluster_value_takes_remainder() {
        assert_eq!(
            scan(&["-abcxyz"], &['c']),
            vec!["short a", "short b", "short c Some(\"xyz\")"]
        );
    }

    #[test]
    fn short_cluster_value_takes_next_token() {
        assert_eq!(
            scan(&["-abc", "--", "rest"], &['c']),
            vec!["short a", "short b", "short c Some(\"--\")", "pos rest"]
        );
    }

    #[test]
    fn short_cluster_value_at_end() {
        assert_eq!(
            scan(&["-abc"], &['c']),
            vec!["short a", "short b", "short c None"]
        );
    }

    #[test]
    fn long_forms() {
        assert_eq!(
            scan(&["--verbose", "--value", "x", "--name=", "--k=a=b"], &[]),
            vec![
                "long verbose",
                "long value Some(\"x\")",
                "long name=",
                "long k=a=b",
            ]
        );
    }

    #[test]
    fn terminator_makes_everything_positional() {
        assert_eq!(
            scan(&["a", "--", "-v", "--verbose", "--"], &[]),
            vec!["pos a", "pos -v", "pos --verbose", "pos --"]
        );
    }

    #[test]
    fn lone_dash_is_positional() {
        assert_eq!(scan(&["-", "-v"], &[]), vec!["pos -", "short v"]);
    }
}
