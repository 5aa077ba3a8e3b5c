/*!
Text formatting for usage messages and completion output.
 */

use std::fmt::Write as _;

use indent_write::fmt::IndentWriter;
use joinery::JoinableIterator;
use lazy_format::lazy_format;

use crate::set::OptionSet;

/// A display token for a flag or a value, paired with its human description.
/// Used for usage tables, completion candidates, and the value suggestions
/// of a [`Handler`][crate::Handler].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Description {
    pub option: String,
    pub description: String,
}

impl Description {
    /// A suggestion without any description
    #[must_use]
    pub fn bare(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            description: String::new(),
        }
    }
}

/// Narrowest column left for descriptions, however wide the options are
const MIN_DESCRIPTION_WIDTH: usize = 20;

fn wrap_options(width: usize) -> textwrap::Options<'static> {
    textwrap::Options::new(width)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
        .word_splitter(textwrap::WordSplitter::NoHyphenation)
}

/**
Format a table of descriptions, one per line, with the options aligned in a
column followed by ` : ` and the description. Each line starts with `prefix`.
Descriptions are wrapped to fit in `width`, with continuation lines indented
to the description column; explicit newlines in descriptions are kept.
 */
#[must_use]
pub fn format_option_table(prefix: &str, width: usize, descriptions: &[Description]) -> String {
    let column = descriptions
        .iter()
        .map(|description| description.option.chars().count())
        .max()
        .unwrap_or(0);

    let padding = " ".repeat(prefix.chars().count() + column + 3);
    let wrap_width = width
        .saturating_sub(padding.len())
        .max(MIN_DESCRIPTION_WIDTH);

    let mut out = String::new();

    for Description {
        option,
        description,
    } in descriptions
    {
        if description.is_empty() {
            let _ = writeln!(out, "{prefix}{option}");
            continue;
        }

        let lines = textwrap::wrap(description, wrap_options(wrap_width));
        let Some((first, rest)) = lines.split_first() else {
            continue;
        };

        let _ = writeln!(out, "{prefix}{option:column$} : {first}");

        let mut indented = IndentWriter::new(&padding, &mut out);
        for line in rest {
            let _ = writeln!(indented, "{line}");
        }
    }

    out
}

/**
Format completion candidates for the shell, one per line. A single candidate
is emitted as just its first word, so that the shell inserts it; otherwise
each line shows the option and its description, truncated to `width`.
 */
#[must_use]
pub fn format_completion(width: usize, suggestions: &[Description]) -> String {
    if let [single] = suggestions {
        let word = single.option.split_whitespace().next().unwrap_or_default();
        return format!("{word}\n");
    }

    let column = suggestions
        .iter()
        .map(|suggestion| suggestion.option.chars().count())
        .max()
        .unwrap_or(0);

    let description_width = match width.saturating_sub(column + 3) {
        width if width < 3 => 0,
        width => width,
    };

    let mut out = String::new();

    for suggestion in suggestions {
        let description = suggestion.description.split_whitespace().join_with(' ').to_string();

        if description_width == 0 || description.is_empty() {
            let _ = writeln!(out, "{}", suggestion.option);
            continue;
        }

        let description = match description.chars().count() > description_width {
            false => description,
            true => {
                let kept: String = description.chars().take(description_width - 3).collect();
                format!("{kept}...")
            }
        };

        let _ = writeln!(out, "{:column$} : {description}", suggestion.option);
    }

    out
}

/// The bash script that sets up completion for the command `name`, by
/// re-invoking it with `COMP_INDEX` and `COMP_WORD` set
#[must_use]
pub fn bash_completion_script(name: &str) -> String {
    format!(
        "_{name}_completion() {{\n    \
            local IFS=$'\\n' ;\n    \
            COMPREPLY=($(COMP_INDEX=$COMP_CWORD COMP_WORD=$2 ${{COMP_WORDS[@]}})) ;\n    \
            return 0 ;\n\
        }} ;\n\
        complete -F _{name}_completion {name} ;\n"
    )
}

/**
The default usage message of a command: a synopsis line, the description,
and a table of the documented positionals, the catch-all, and every flag.
 */
#[must_use]
pub fn command_usage<T: 'static>(
    name: &str,
    description: &str,
    options: &OptionSet<T>,
    width: usize,
) -> String {
    let positionals = options.positionals().iter().map(|opt| {
        let name = opt.name();
        match opt.is_optional() {
            true => format!("[{name}]"),
            false => name,
        }
    });

    let arguments = positionals
        .chain(options.catch_all().map(|opt| opt.name()))
        .map(|argument| lazy_format!(" {argument}"))
        .join_concat();

    let mut out = format!("Usage: {name} [options]{arguments}\n");

    if !description.is_empty() {
        let _ = writeln!(out, "{description}");
    }

    let documented = options
        .positionals()
        .iter()
        .chain(options.catch_all())
        .map(|opt| opt.usage())
        .filter(|usage| !usage.description.is_empty());

    let table: Vec<Description> = documented
        .chain(options.flags().iter().map(|opt| opt.usage()))
        .collect();

    if !table.is_empty() {
        out.push('\n');
        out.push_str(&format_option_table("  ", width, &table));
    }

    out
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    fn description(option: &str, description: &str) -> Description {
        Description {
            option: option.to_owned(),
            description: description.to_owned(),
        }
    }

    #[test]
    fn option_table_wraps_descriptions() {
        let table = format_option_table(
            "",
            50,
            &[
                description("-v, --verbose", "Display additional information on startup, including the port settings"),
                description("    --list", ""),
                description("-b <baud>", "Baud rate\nof the port"),
            ],
        );

        expect![[r#"
            -v, --verbose : Display additional information on
                            startup, including the port
                            settings
                --list
            -b <baud>     : Baud rate
                            of the port
        "#]]
        .assert_eq(&table);
    }

    #[test]
    fn completion_lines_are_truncated() {
        let lines = format_completion(
            30,
            &[
                description("--format <value>", "communication format, e.g. 8N1"),
                description("--verbose", "more   output"),
                description("--timestamp", ""),
            ],
        );

        expect![[r#"
            --format <value> : communic...
            --verbose        : more output
            --timestamp
        "#]]
        .assert_eq(&lines);
    }

    #[test]
    fn single_completion_is_a_bare_word() {
        assert_eq!(
            format_completion(80, &[description("--option <value>", "An option")]),
            "--option\n"
        );
        assert_eq!(format_completion(80, &[]), "");
    }

    #[test]
    fn completion_script() {
        expect![[r#"
            _sercat_completion() {
                local IFS=$'\n' ;
                COMPREPLY=($(COMP_INDEX=$COMP_CWORD COMP_WORD=$2 ${COMP_WORDS[@]})) ;
                return 0 ;
            } ;
            complete -F _sercat_completion sercat ;
        "#]]
        .assert_eq(&bash_completion_script("sercat"));
    }
}
