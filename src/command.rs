/*!
[`Command`]: the resolution pipeline of a [`Handler`] structure, from the
process context (arguments, environment, console width) to either a populated
structure or an [`Outcome`] the host should act upon.
 */

use std::collections::HashMap;
use std::path::Path;

use crate::completion::complete_filenames;
use crate::errors::{ConfigError, Error, Signal, Stop};
use crate::fields::Bind;
use crate::option::Opt;
use crate::set::OptionSet;
use crate::usage::{self, Description};
use crate::value::ValueRegistry;

/// Environment variable holding the index of the word being completed
pub const COMP_INDEX: &str = "COMP_INDEX";

/// Environment variable holding the partial word being completed
pub const COMP_WORD: &str = "COMP_WORD";

const DEFAULT_CONSOLE_WIDTH: usize = 80;

/**
A structure driven by a [`Command`]. Every method has a default, so a plain
`impl Handler for Options {}` is enough.
 */
pub trait Handler: Bind {
    /// The version of the command. If there is one, a `-v, --version` flag
    /// is added.
    fn version(&self) -> Option<String> {
        None
    }

    /// A custom usage message, replacing the generated one
    fn usage(&self, name: &str, width: usize) -> Option<String> {
        let _ = (name, width);
        None
    }

    /**
    Suggest values for `opt`, starting with `word`. The default suggests
    file names, like a shell would. Suggestions not starting with `word` are
    discarded.
     */
    fn complete(&self, opt: &Opt<Self>, word: &str) -> Vec<Description> {
        let _ = opt;
        complete_filenames(word)
    }
}

/// What the host should do once a [`Command`] is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler is populated and ready to run
    Ready,

    /// `--help` was given; print the usage
    Help,

    /// `--version` was given; print the version
    Version,

    /// `--bash-completion-script` was given; print the script
    CompletionScript,

    /// The shell asked for completions; print them
    Completion(Vec<Description>),
}

impl From<Signal> for Outcome {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Help => Outcome::Help,
            Signal::Version => Outcome::Version,
            Signal::CompletionScript => Outcome::CompletionScript,
        }
    }
}

/**
A command: a [`Handler`] plus the process context it's resolved against. The
public fields are the configuration, set by the host before calling
[`resolve`][Command::resolve].
 */
pub struct Command<H: Handler> {
    /// Shown under the synopsis in the usage message
    pub description: String,

    /// The name of the command, as shown in usage and completion scripts
    pub process_name: String,

    /// Every argument, including the program name
    pub args: Vec<String>,

    pub env: HashMap<String, String>,
    pub console_width: usize,

    /// Don't add `--bash-completion-script`, and ignore completion requests
    pub disable_completion: bool,

    handler: H,
    options: Option<OptionSet<H>>,
    registry: Option<ValueRegistry>,
}

/// A special flag, as passed to [`OptionSet::add_special_flag`]
type Special = (Option<char>, &'static str, String, Signal);

/// Build the option set on first use. A free function so that the option
/// set and the handler can be borrowed separately.
fn initialize<'a, H: Handler>(
    options: &'a mut Option<OptionSet<H>>,
    registry: &mut Option<ValueRegistry>,
    specials: &[Special],
) -> Result<&'a OptionSet<H>, ConfigError> {
    let set = match options.take() {
        Some(set) => set,
        None => {
            let mut set = OptionSet::with_registry(registry.take().unwrap_or_default())?;

            for (short, long, description, signal) in specials {
                set.add_special_flag(*short, long, description, *signal);
            }

            set
        }
    };

    Ok(options.insert(set))
}

/// The tokens before the cursor (program name excluded) and the word being
/// completed, if the shell asked for a completion
fn completion_request<'a>(
    env: &HashMap<String, String>,
    args: &'a [String],
) -> Option<(&'a [String], String)> {
    let index: usize = env
        .get(COMP_INDEX)?
        .parse()
        .ok()
        .filter(|&index| index > 0)?;

    let word = match (env.get(COMP_WORD), args.get(index)) {
        (Some(word), Some(arg)) if arg.starts_with(word.as_str()) => word.clone(),
        _ => String::new(),
    };

    let end = index.min(args.len());
    let tokens = args.get(1..end).unwrap_or_default();

    Some((tokens, word))
}

/// The final component of the program path, or the whole path if it has none
fn process_name(program: &str) -> String {
    match Path::new(program).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => program.to_owned(),
    }
}

impl<H: Handler> Command<H> {
    /// Create a command for `handler`, with an empty process context
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            description: String::new(),
            process_name: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            console_width: DEFAULT_CONSOLE_WIDTH,
            disable_completion: false,
            handler,
            options: None,
            registry: None,
        }
    }

    /// Create a command whose values are parsed by `registry`
    #[must_use]
    pub fn with_registry(handler: H, registry: ValueRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new(handler)
        }
    }

    /**
    Take the process context from the current process: its arguments, its
    environment, and a process name taken from the program path. The console
    width is left alone; the host sets it from the terminal.
     */
    pub fn capture_process(&mut self) {
        self.args = std::env::args().collect();
        self.env = std::env::vars().collect();
        self.process_name = self
            .args
            .first()
            .map(|program| process_name(program))
            .unwrap_or_default();
    }

    /// Replace the environment with `KEY=VALUE` entries. Entries without an
    /// `=` are ignored.
    pub fn set_process_env<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.env = entries
            .into_iter()
            .filter_map(|entry| {
                entry
                    .as_ref()
                    .split_once('=')
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
            })
            .collect();
    }

    #[inline]
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    #[inline]
    #[must_use]
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    #[inline]
    #[must_use]
    pub fn into_handler(self) -> H {
        self.handler
    }

    fn specials(&self) -> Vec<Special> {
        let version = self.handler.version().map(|_| {
            (
                Some('v'),
                "version",
                "display version information".to_owned(),
                Signal::Version,
            )
        });

        let help = (
            Some('h'),
            "help",
            "display usage information".to_owned(),
            Signal::Help,
        );

        let script = (!self.disable_completion).then(|| {
            (
                None,
                "bash-completion-script",
                format!(
                    "generate a bash script that sets up completion for this command; \
                    to use, run the following line or add it to your .bash_profile:\n\
                    eval $({} --bash-completion-script)",
                    self.process_name
                ),
                Signal::CompletionScript,
            )
        });

        version.into_iter().chain([help]).chain(script).collect()
    }

    /// The option set of the handler, built on first use
    pub fn options(&mut self) -> Result<&OptionSet<H>, ConfigError> {
        let specials = self.specials();
        initialize(&mut self.options, &mut self.registry, &specials)
    }

    /**
    Resolve the handler against the process context.

    Unless completion is disabled, a completion request from the shell is
    answered first, with [`Outcome::Completion`]. Otherwise the defaults,
    the environment and the arguments are applied in turn, each overriding
    the previous. A special flag stops everything and is reported as its
    outcome. The first error stops everything too; whatever was applied
    before it stays applied.
     */
    pub fn resolve(&mut self) -> Result<Outcome, Error> {
        let specials = self.specials();
        let options = initialize(&mut self.options, &mut self.registry, &specials)?;

        if !self.disable_completion {
            if let Some((tokens, word)) = completion_request(&self.env, &self.args) {
                log::debug!("completion request for {word:?} after {tokens:?}");

                let completion = options.completion(tokens, &word);
                let mut suggestions: Vec<Description> =
                    completion.matching_flags().cloned().collect();

                if let Some(pending) = &completion.pending {
                    suggestions.extend(
                        self.handler
                            .complete(pending.option(), &word)
                            .into_iter()
                            .filter(|suggestion| suggestion.option.starts_with(&word)),
                    );
                }

                return Ok(Outcome::Completion(suggestions));
            }
        }

        log::debug!("applying defaults");
        options.apply_defaults(&mut self.handler)?;

        log::debug!("applying environment");
        options.apply_env(&mut self.handler, &self.env)?;

        log::debug!("applying {} arguments", self.args.len().saturating_sub(1));
        let args = self.args.get(1..).unwrap_or_default();

        match options.apply_args(&mut self.handler, args) {
            Ok(()) => Ok(Outcome::Ready),
            Err(Stop::Signal(signal)) => {
                log::debug!("stopped by {signal:?}");
                Ok(signal.into())
            }
            Err(Stop::Error(err)) => Err(err.into()),
        }
    }

    /// The usage message: the handler's own, or one generated from its
    /// options
    pub fn usage(&mut self) -> Result<String, ConfigError> {
        if let Some(usage) = self.handler.usage(&self.process_name, self.console_width) {
            return Ok(usage);
        }

        let specials = self.specials();
        let options = initialize(&mut self.options, &mut self.registry, &specials)?;

        Ok(usage::command_usage(
            &self.process_name,
            &self.description,
            options,
            self.console_width,
        ))
    }

    /// The version of the handler, if it has one
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.handler.version()
    }

    /**
    The text to print for an outcome: the usage, the version, the completion
    script, or the completion candidates. `None` for [`Outcome::Ready`].
     */
    pub fn message(&mut self, outcome: &Outcome) -> Result<Option<String>, ConfigError> {
        Ok(match outcome {
            Outcome::Ready => None,
            Outcome::Help => Some(self.usage()?),
            Outcome::Version => Some(match self.version() {
                Some(version) => format!("{version}\n"),
                None => String::new(),
            }),
            Outcome::CompletionScript => Some(usage::bash_completion_script(&self.process_name)),
            Outcome::Completion(suggestions) => Some(usage::format_completion(
                self.console_width,
                suggestions,
            )),
        })
    }
}

impl<H: Handler> std::fmt::Debug for Command<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("process_name", &self.process_name)
            .field("args", &self.args)
            .field("console_width", &self.console_width)
            .field("disable_completion", &self.disable_completion)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
