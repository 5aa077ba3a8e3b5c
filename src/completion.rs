/*!
Shell completion. [`OptionSet::completion`] replays the scanning of the
tokens before the cursor, without writing any values, to work out what could
come next: the value of an option, or a positional argument and/or more
flags.
 */

use std::fmt;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path};

use globset::Glob;
use optbind_lexer::{ArgAccess, ArgumentsParser, Visitor};

use crate::option::{Kind, Opt};
use crate::set::OptionSet;
use crate::usage::Description;

/// The option whose value would be completed at the cursor
pub enum Pending<'a, T> {
    /// The tokens end with a flag that is waiting for its value
    Value(&'a Opt<T>),

    /// The next positional argument, or the catch-all
    Positional(&'a Opt<T>),
}

impl<'a, T> Pending<'a, T> {
    #[must_use]
    pub fn option(&self) -> &'a Opt<T> {
        match *self {
            Pending::Value(opt) | Pending::Positional(opt) => opt,
        }
    }
}

/// What could come next on the command line
pub struct Completion<'a, T> {
    /// The partial word at the cursor
    pub word: String,

    /// The flags that could still be given. Always empty when an option is
    /// waiting for its value.
    pub flags: Vec<Description>,

    pub pending: Option<Pending<'a, T>>,
}

impl<T> fmt::Debug for Pending<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pending::Value(opt) => f.debug_tuple("Value").field(opt).finish(),
            Pending::Positional(opt) => f.debug_tuple("Positional").field(opt).finish(),
        }
    }
}

impl<T> fmt::Debug for Completion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("word", &self.word)
            .field("flags", &self.flags)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<T> Completion<'_, T> {
    /// The flags starting with the partial word at the cursor
    pub fn matching_flags(&self) -> impl Iterator<Item = &Description> {
        self.flags
            .iter()
            .filter(|flag| flag.option.starts_with(&self.word))
    }
}

/// Record of what the tokens before the cursor used up
struct Replay<'a, T> {
    used: Vec<bool>,
    positionals: usize,
    pending: Option<&'a Opt<T>>,
}

struct ReplayVisitor<'s, 'a, T> {
    set: &'a OptionSet<T>,
    replay: &'s mut Replay<'a, T>,
}

impl<'a, T: 'static> ReplayVisitor<'_, 'a, T> {
    fn activate<'arg>(self, index: Option<usize>, arg: impl ArgAccess<'arg>) {
        let Some(index) = index else {
            log::trace!("ignoring unknown flag");
            return;
        };

        let opt = &self.set.flags()[index];
        self.replay.used[index] = true;

        if opt.kind().takes_value() && arg.take().is_none() {
            self.replay.pending = Some(opt);
        }
    }
}

impl<'arg, 'a, T: 'static> Visitor<'arg> for ReplayVisitor<'_, 'a, T> {
    type Value = ();

    fn visit_positional(self, argument: &'arg str) -> Self::Value {
        log::trace!("positional {argument:?}");
        self.replay.positionals += 1;
    }

    fn visit_long_option(self, option: &'arg str, _argument: &'arg str) -> Self::Value {
        if let Some(index) = self.set.flags().iter().position(|opt| opt.long() == Some(option)) {
            self.replay.used[index] = true;
        }
    }

    fn visit_long(self, option: &'arg str, arg: impl ArgAccess<'arg>) -> Self::Value {
        let index = self.set.flags().iter().position(|opt| opt.long() == Some(option));
        self.activate(index, arg);
    }

    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value {
        let index = self.set.flags().iter().position(|opt| opt.short() == Some(option));
        self.activate(index, arg);
    }
}

impl<T: 'static> OptionSet<T> {
    /**
    Work out what could be completed after `args`, the command-line tokens
    before the cursor (excluding the program name), with `word` being the
    partial token at the cursor. Unknown flags are ignored.

    If the tokens end with an option waiting for its value, that option is
    the only thing pending. If a special flag such as `--help` was given,
    nothing else makes sense and the completion is empty. Otherwise the
    candidate flags are those not used yet, and sequences which can be
    repeated; special flags are only candidates while nothing else was given.
     */
    pub fn completion<S: AsRef<str>>(&self, args: &[S], word: &str) -> Completion<'_, T> {
        let mut replay = Replay {
            used: vec![false; self.flags().len()],
            positionals: 0,
            pending: None,
        };

        let mut parser = ArgumentsParser::new(args.iter().map(S::as_ref));
        while let Some(()) = parser.next_arg(ReplayVisitor {
            set: self,
            replay: &mut replay,
        }) {}

        let mut completion = Completion {
            word: word.to_owned(),
            flags: Vec::new(),
            pending: None,
        };

        if let Some(opt) = replay.pending {
            completion.pending = Some(Pending::Value(opt));
            return completion;
        }

        let used = || {
            self.flags()
                .iter()
                .zip(&replay.used)
                .filter_map(|(opt, &used)| used.then_some(opt))
        };

        if used().any(|opt| opt.signal().is_some()) {
            return completion;
        }

        let exclusive = replay.positionals == 0 && used().next().is_none();

        completion.flags = self
            .flags()
            .iter()
            .zip(&replay.used)
            .filter(|&(opt, &used)| !used || opt.kind() == Kind::Slice)
            .filter(|&(opt, _)| exclusive || opt.signal().is_none())
            .map(|(opt, _)| opt.completion_usage())
            .collect();

        completion.pending = self
            .positionals()
            .get(replay.positionals)
            .or(self.catch_all())
            .map(Pending::Positional);

        log::debug!("completion of {word:?} after {} tokens: {completion:?}", args.len());

        completion
    }
}

/**
Complete `word` as a file path, the way a shell would by default. If a single
directory matches, its contents are completed instead.
 */
#[must_use]
pub fn complete_filenames(word: &str) -> Vec<Description> {
    let (directory, prefix) = match word.rfind(MAIN_SEPARATOR) {
        Some(i) => (&word[..=i], &word[i + 1..]),
        None => ("", word),
    };

    let entries = match fs::read_dir(match directory {
        "" => Path::new("."),
        directory => Path::new(directory),
    }) {
        Ok(entries) => entries,
        Err(err) => {
            log::debug!("can't list {directory:?} for completion: {err}");
            return Vec::new();
        }
    };

    let mut candidates: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());

            name.starts_with(prefix).then(|| match is_dir {
                true => format!("{directory}{name}{MAIN_SEPARATOR}"),
                false => format!("{directory}{name}"),
            })
        })
        .collect();

    candidates.sort();

    match candidates.as_slice() {
        [single] if single.ends_with(MAIN_SEPARATOR) && single != word => {
            complete_filenames(single)
        }
        _ => candidates
            .into_iter()
            .map(|option| Description {
                option,
                description: String::new(),
            })
            .collect(),
    }
}

fn has_glob_syntax(path: &str) -> bool {
    path.contains(['*', '?', '[', '{'])
}

/// The paths matching `pattern`. Each component of the pattern matches the
/// entries of a single directory.
fn glob_paths(pattern: &str) -> Vec<String> {
    if !has_glob_syntax(pattern) {
        return match Path::new(pattern).exists() {
            true => vec![pattern.to_owned()],
            false => Vec::new(),
        };
    }

    let (directory, name) = match pattern.rfind(MAIN_SEPARATOR) {
        Some(i) => (&pattern[..=i], &pattern[i + 1..]),
        None => ("", pattern),
    };

    let matcher = match Glob::new(name) {
        Ok(glob) => glob.compile_matcher(),
        Err(err) => {
            log::debug!("invalid completion pattern {pattern:?}: {err}");
            return Vec::new();
        }
    };

    let matcher = &matcher;

    let directories = match has_glob_syntax(directory) {
        true => glob_paths(directory.trim_end_matches(MAIN_SEPARATOR))
            .into_iter()
            .map(|parent| format!("{parent}{MAIN_SEPARATOR}"))
            .collect(),
        false => vec![directory.to_owned()],
    };

    let mut paths: Vec<String> = directories
        .iter()
        .filter_map(|directory| {
            let listing = match directory.as_str() {
                "" => Path::new("."),
                directory => Path::new(directory),
            };

            fs::read_dir(listing)
                .ok()
                .map(|entries| (directory, entries))
        })
        .flat_map(move |(directory, entries)| {
            entries
                .filter_map(Result::ok)
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(move |name| matcher.is_match(name))
                .map(move |name| format!("{directory}{name}"))
        })
        .collect();

    paths.sort();
    paths
}

/**
Complete `word` from the paths matching the glob `pattern`, such as
`/dev/tty*`. If nothing matching starts with `word`, this is the same as
[`complete_filenames`].
 */
#[must_use]
pub fn complete_matching_filenames(pattern: &str, word: &str) -> Vec<Description> {
    let matches: Vec<Description> = glob_paths(pattern)
        .into_iter()
        .filter(|path| path.starts_with(word))
        .map(Description::bare)
        .collect();

    match matches.is_empty() {
        true => complete_filenames(word),
        false => matches,
    }
}
