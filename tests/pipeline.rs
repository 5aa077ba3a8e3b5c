use std::path::PathBuf;
use std::time::Duration;

use expect_test::expect;
use optbind::errors::{ConfigError, Error, ResolveError};
use optbind::{Bind, COMP_INDEX, COMP_WORD, Command, Handler, OptionSet, Outcome, SetFromStr, ValueRegistry};

fn command<H: Handler>(handler: H, args: &[&str]) -> Command<H> {
    let mut command = Command::new(handler);
    command.process_name = "prog".to_owned();
    command.args = ["prog"].iter().chain(args).map(|&arg| arg.to_owned()).collect();
    command
}

fn resolve<H: Handler + Default>(args: &[&str]) -> Result<H, Error> {
    let mut command = command(H::default(), args);
    assert_eq!(command.resolve()?, Outcome::Ready);
    Ok(command.into_handler())
}

#[derive(Debug, Default, Bind)]
struct Cluster {
    #[opts(tag = "-a")]
    a: bool,

    #[opts(tag = "-b")]
    b: bool,

    #[opts(tag = "-c")]
    c: String,
}

impl Handler for Cluster {}

#[test]
fn short_clusters() {
    let cluster: Cluster = resolve(&["-abcxyz"]).unwrap();
    assert!(cluster.a);
    assert!(cluster.b);
    assert_eq!(cluster.c, "xyz");

    let cluster: Cluster = resolve(&["-ba", "-c", "-a"]).unwrap();
    assert!(cluster.a && cluster.b);
    assert_eq!(cluster.c, "-a");

    assert_eq!(
        resolve::<Cluster>(&["-abc"]).unwrap_err(),
        Error::Resolve(ResolveError::MissingArgument {
            option: "-c".to_owned()
        })
    );
}

#[derive(Debug, Default, Bind)]
struct Items {
    #[opts(tag = "-i,--item,sep:\\,")]
    items: Vec<String>,

    #[opts(tag = "-n,--number")]
    numbers: Vec<i64>,
}

impl Handler for Items {}

#[test]
fn slices_accumulate() {
    let items: Items = resolve(&["--item", "a,b", "-i", "c", "-n1", "--number=0x10"]).unwrap();
    assert_eq!(items.items, ["a", "b", "c"]);
    assert_eq!(items.numbers, [1, 16]);

    let items: Items = resolve(&["-i", "a,b", "--item=", "-i", r"c\,d"]).unwrap();
    assert_eq!(items.items, ["c,d"]);
}

#[derive(Debug, Default, Bind)]
struct Positionals {
    #[opts(tag = "arg:1")]
    first: Option<String>,

    #[opts(tag = "arg:2")]
    second: Option<String>,

    #[opts(tag = "arg:3")]
    third: Option<PathBuf>,
}

impl Handler for Positionals {}

#[derive(Debug, Default, Bind)]
struct Mixed {
    #[opts(tag = "arg:3")]
    third: Option<String>,

    #[opts(tag = "arg:1")]
    first: Option<String>,

    #[opts(tag = "arg:2")]
    second: u16,
}

impl Handler for Mixed {}

#[test]
fn trailing_pointer_positionals_are_optional() {
    let set = OptionSet::<Positionals>::new().unwrap();
    assert!(set.positionals().iter().all(|opt| opt.is_optional()));

    let positionals: Positionals = resolve(&[]).unwrap();
    assert_eq!(positionals.first, None);

    let positionals: Positionals = resolve(&["x", "y"]).unwrap();
    assert_eq!(positionals.first.as_deref(), Some("x"));
    assert_eq!(positionals.second.as_deref(), Some("y"));
    assert_eq!(positionals.third, None);

    let set = OptionSet::<Mixed>::new().unwrap();
    let optional: Vec<bool> = set.positionals().iter().map(|opt| opt.is_optional()).collect();
    assert_eq!(optional, [false, false, true]);

    assert_eq!(
        resolve::<Mixed>(&["x"]).unwrap_err(),
        Error::Resolve(ResolveError::MissingArgument {
            option: "<arg[2]>".to_owned()
        })
    );

    let mut usage = command(Mixed::default(), &[]);
    let usage = usage.usage().unwrap();
    assert_eq!(
        usage.lines().next(),
        Some("Usage: prog [options] <arg[1]> <arg[2]> [<arg[3]>]")
    );
}

#[derive(Debug, Default, Bind)]
struct Periodic {
    #[opts(tag = "-p,--period,default:5m,env:PERIOD")]
    period: Duration,
}

impl Handler for Periodic {}

#[test]
fn sources_override_each_other_in_order() {
    let cases: &[(&[&str], &[&str], u64)] = &[
        (&[], &[], 5 * 60),
        (&[], &["PERIOD=10m"], 10 * 60),
        (&["--period", "1h"], &["PERIOD=10m"], 60 * 60),
        (&["-p1h30m"], &[], 90 * 60),
    ];

    for &(args, env, seconds) in cases {
        let mut command = command(Periodic::default(), args);
        command.set_process_env(env);

        assert_eq!(command.resolve(), Ok(Outcome::Ready));
        assert_eq!(command.handler().period, Duration::from_secs(seconds));
    }
}

#[derive(Debug, Default, Bind)]
struct Clashing {
    #[opts(tag = "-v")]
    verbose: bool,

    #[opts(tag = "arg:2")]
    source: String,

    #[opts(tag = "arg:2")]
    destination: String,
}

impl Handler for Clashing {}

#[test]
fn configuration_errors_leave_the_handler_untouched() {
    let mut command = command(Clashing::default(), &["-v", "a", "b"]);

    assert_eq!(
        command.resolve(),
        Err(Error::Config(ConfigError::DuplicatePositional {
            index: 2,
            first: "source",
            second: "destination",
        }))
    );

    let clashing = command.into_handler();
    assert!(!clashing.verbose);
    assert_eq!(clashing.source, "");
}

#[derive(Debug, Default, Bind)]
struct Completed {
    /// Verbose output
    #[opts(tag = "-v,--verbose")]
    verbose: bool,

    /// An option
    #[opts(tag = "-o,--option")]
    option: String,

    #[opts(tag = "--level")]
    level: u8,
}

impl Handler for Completed {}

#[test]
fn completion_of_a_single_flag() {
    let mut command = command(Completed::default(), &["-v", "--o"]);
    command.set_process_env([format!("{COMP_INDEX}=2"), format!("{COMP_WORD}=--o")]);

    let outcome = command.resolve().unwrap();
    let Outcome::Completion(ref suggestions) = outcome else {
        panic!("expected a completion, got {outcome:?}");
    };

    let options: Vec<&str> = suggestions.iter().map(|s| s.option.as_str()).collect();
    assert_eq!(options, ["--option <value>"]);

    assert_eq!(command.message(&outcome), Ok(Some("--option\n".to_owned())));
}

#[test]
fn completion_of_every_flag() {
    let mut command = command(Completed::default(), &[]);
    command.set_process_env([format!("{COMP_INDEX}=1"), format!("{COMP_WORD}=")]);

    let outcome = command.resolve().unwrap();

    expect![[r#"
        --verbose                : Verbose output
        --option <value>         : An option
        --level <value>
        --help                   : display usage information
        --bash-completion-script : generate a bash script that sets up completion for...
    "#]]
    .assert_eq(&command.message(&outcome).unwrap().unwrap());
}

#[derive(Debug, Default, PartialEq)]
struct Level(u8);

impl SetFromStr for Level {
    type Err = String;

    fn set_from_str(&mut self, s: &str) -> Result<(), Self::Err> {
        self.0 = match s {
            "low" => 1,
            "medium" => 2,
            "high" => 3,
            _ => return Err(format!("unknown level {s:?}")),
        };
        Ok(())
    }
}

#[derive(Debug, Default, Bind)]
struct Common {
    /// Logging level
    #[opts(tag = "-L,--level,env:LEVEL")]
    level: Option<Level>,
}

#[derive(Debug, Default, Bind)]
struct Tool {
    #[opts(tag = "-n,--dry-run")]
    dry_run: bool,

    #[opts(embed)]
    common: Common,

    /// Files to process
    #[opts(tag = "args,name:file")]
    files: Vec<PathBuf>,
}

impl Handler for Tool {}

fn run_tool(args: &[&str], env: &[&str]) -> Result<Tool, Error> {
    let mut registry = ValueRegistry::default();
    registry.register_settable::<Level>();

    let mut command = Command::with_registry(Tool::default(), registry);
    command.process_name = "tool".to_owned();
    command.args = ["tool"].iter().chain(args).map(|&arg| arg.to_owned()).collect();
    command.set_process_env(env);

    assert_eq!(command.resolve()?, Outcome::Ready);
    Ok(command.into_handler())
}

#[test]
fn embedded_fields_and_custom_values() {
    let tool = run_tool(&["-n", "a", "--level", "high", "b"], &[]).unwrap();
    assert!(tool.dry_run);
    assert_eq!(tool.common.level, Some(Level(3)));
    assert_eq!(tool.files, [PathBuf::from("a"), PathBuf::from("b")]);

    let tool = run_tool(&[], &["LEVEL=low"]).unwrap();
    assert_eq!(tool.common.level, Some(Level(1)));

    let err = run_tool(&["-L", "extreme"], &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to set value for '--level': \
        failed to parse value for type 'Level': unknown level \"extreme\""
    );
}

#[test]
fn unregistered_types_are_rejected() {
    assert_eq!(
        OptionSet::<Tool>::new().unwrap_err(),
        ConfigError::NotParsable {
            field: "level",
            type_name: "Option<Level>".to_owned(),
        }
    );
}

#[test]
fn tool_usage() {
    let mut registry = ValueRegistry::default();
    registry.register_settable::<Level>();

    let mut command = Command::with_registry(Tool::default(), registry);
    command.process_name = "tool".to_owned();
    command.description = "Process some files".to_owned();
    command.disable_completion = true;

    expect![[r#"
        Usage: tool [options] <file>...
        Process some files

          <file>              : Files to process
          -n, --dry-run
          -L, --level <value> : Logging level, env: LEVEL
          -h, --help          : display usage information
    "#]]
    .assert_eq(&command.usage().unwrap());
}
