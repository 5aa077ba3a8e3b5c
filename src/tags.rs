/*!
The binding tag grammar. A tag is a comma separated list of tokens describing
how a field is bound:

| token           | meaning                                        |
|-----------------|------------------------------------------------|
| `-X`            | the short flag name                            |
| `--long-name`   | the long flag name                             |
| `arg:N`         | the field receives positional argument `N ≥ 1` |
| `args`          | the field receives all remaining arguments     |
| `default:VALUE` | the default value, as a raw string             |
| `env:NAME`      | an environment variable supplying the value    |
| `sep:CHARS`     | delimiter characters for sequence values       |
| `name:NAME`     | the value name shown in usage (`<NAME>`)       |

Keys are split from values at the first `:`. A backslash makes the
following character literal, so `default:a\,b` has the default `a,b`.
 */

use std::fmt::{self, Display, Formatter, Write as _};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TagError {
    #[error("invalid empty tag")]
    Empty,

    #[error("invalid tag in opts: '{0}'")]
    InvalidKey(String),

    #[error("invalid index '{0}' for arg: tag")]
    InvalidIndex(String),
}

/// Iterator over the `(key, value)` pairs of a tag, unescaped and trimmed.
/// Created by [`fields`].
#[derive(Debug, Clone)]
pub struct TagFields<'a> {
    rest: &'a str,
}

/// Split the tag text into its `(key, value)` pairs. A token without a `:`
/// has an empty value.
#[must_use]
pub fn fields(tag: &str) -> TagFields<'_> {
    TagFields { rest: tag }
}

/// Find the first unescaped `delimiter`
fn find_unescaped(input: &str, delimiter: char) -> Option<usize> {
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c == delimiter => return Some(i),
            _ => {}
        }
    }

    None
}

/// Drop the backslash from every escape, and a trailing unpaired backslash
fn unescape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => output.extend(chars.next()),
            c => output.push(c),
        }
    }

    output
}

impl Iterator for TagFields<'_> {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let field = match find_unescaped(self.rest, ',') {
            Some(i) => {
                let field = &self.rest[..i];
                self.rest = &self.rest[i + 1..];
                field
            }
            None => std::mem::take(&mut self.rest),
        };

        let (key, value) = match find_unescaped(field, ':') {
            Some(i) => (&field[..i], &field[i + 1..]),
            None => (field, ""),
        };

        Some((
            unescape(key).trim().to_owned(),
            unescape(value).trim().to_owned(),
        ))
    }
}

/// A parsed binding tag. Empty strings mean the attribute is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub short: Option<char>,
    pub long: Option<String>,

    /// The positional index, or 0 if the field isn't positional
    pub position: usize,

    /// True if the field receives all the remaining arguments (`args`)
    pub catch_all: bool,

    pub default: String,
    pub env: String,
    pub sep: String,
    pub value_name: String,
}

impl Tag {
    /// Parse the text of a tag
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        if tag.is_empty() {
            return Err(TagError::Empty);
        }

        let mut parsed = Tag::default();

        for (key, value) in fields(tag) {
            match key.as_str() {
                "args" if value.is_empty() => parsed.catch_all = true,
                "arg" => {
                    parsed.position = match value.parse() {
                        Ok(0) | Err(_) => return Err(TagError::InvalidIndex(value)),
                        Ok(position) => position,
                    }
                }
                "default" => parsed.default = value,
                "env" => parsed.env = value,
                "sep" => parsed.sep = value,
                "name" => parsed.value_name = value,
                flag => match (flag.strip_prefix("--"), flag.strip_prefix('-')) {
                    (Some(long), _) if long.chars().nth(1).is_some() => {
                        parsed.long = Some(long.to_owned())
                    }
                    (None, Some(short)) => match short.chars().collect::<Vec<_>>()[..] {
                        [short] => parsed.short = Some(short),
                        _ => return Err(TagError::InvalidKey(key)),
                    },
                    _ => return Err(TagError::InvalidKey(key)),
                },
            }
        }

        Ok(parsed)
    }
}

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.chars().try_for_each(|c| {
            if matches!(c, ',' | ':' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(c)
        })
    }
}

impl Display for Tag {
    /// Render the tag in its canonical form, which parses back to an equal
    /// tag
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        let mut token = |f: &mut Formatter<'_>, args: fmt::Arguments<'_>| {
            let result = write!(f, "{separator}{args}");
            separator = ",";
            result
        };

        if let Some(short) = self.short {
            let mut buffer = [0; 4];
            token(f, format_args!("-{}", Escaped(short.encode_utf8(&mut buffer))))?;
        }

        if let Some(long) = &self.long {
            token(f, format_args!("--{}", Escaped(long)))?;
        }

        if self.position > 0 {
            token(f, format_args!("arg:{}", self.position))?;
        }

        if self.catch_all {
            token(f, format_args!("args"))?;
        }

        let values = [
            ("default", &self.default),
            ("env", &self.env),
            ("sep", &self.sep),
            ("name", &self.value_name),
        ];

        for (key, value) in values {
            if !value.is_empty() {
                token(f, format_args!("{key}:{}", Escaped(value)))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(tag: &str) -> Vec<(String, String)> {
        fields(tag).collect()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn scan_fields() {
        assert_eq!(
            pairs("-v, --verbose,default:10"),
            [pair("-v", ""), pair("--verbose", ""), pair("default", "10")]
        );
        assert_eq!(pairs("-v,"), [pair("-v", "")]);
        assert!(pairs("").is_empty());
    }

    #[test]
    fn scan_escapes() {
        assert_eq!(pairs(r"default:a\,b"), [pair("default", "a,b")]);
        assert_eq!(pairs(r"sep:\,\:"), [pair("sep", ",:")]);
        assert_eq!(pairs(r"default:a:b"), [pair("default", "a:b")]);
        assert_eq!(pairs(r"default:x\\,-v"), [pair("default", r"x\"), pair("-v", "")]);
        assert_eq!(pairs(r"default:x\"), [pair("default", "x")]);
    }

    #[test]
    fn parse_flag_tag() {
        let tag = Tag::parse("-p, --period, default:5m, env:PERIOD, name:duration").unwrap();

        assert_eq!(
            tag,
            Tag {
                short: Some('p'),
                long: Some("period".to_owned()),
                default: "5m".to_owned(),
                env: "PERIOD".to_owned(),
                value_name: "duration".to_owned(),
                ..Tag::default()
            }
        );
    }

    #[test]
    fn parse_positionals() {
        assert_eq!(Tag::parse("arg:2").unwrap().position, 2);
        assert!(Tag::parse("args").unwrap().catch_all);
        assert_eq!(Tag::parse("arg:0"), Err(TagError::InvalidIndex("0".to_owned())));
        assert_eq!(Tag::parse("arg:x"), Err(TagError::InvalidIndex("x".to_owned())));
        assert_eq!(Tag::parse("arg:-1"), Err(TagError::InvalidIndex("-1".to_owned())));
    }

    #[test]
    fn invalid_tags() {
        assert_eq!(Tag::parse(""), Err(TagError::Empty));
        assert_eq!(Tag::parse("--"), Err(TagError::InvalidKey("--".to_owned())));
        assert_eq!(Tag::parse("--x"), Err(TagError::InvalidKey("--x".to_owned())));
        assert_eq!(Tag::parse("-xy"), Err(TagError::InvalidKey("-xy".to_owned())));
        assert_eq!(Tag::parse("-"), Err(TagError::InvalidKey("-".to_owned())));
        assert_eq!(Tag::parse("args:3"), Err(TagError::InvalidKey("args".to_owned())));
        assert_eq!(Tag::parse("verbose"), Err(TagError::InvalidKey("verbose".to_owned())));
        assert_eq!(Tag::parse("-v,,"), Err(TagError::InvalidKey(String::new())));
        assert_eq!(
            Tag::parse("-v,,").unwrap_err().to_string(),
            "invalid tag in opts: ''"
        );
    }

    #[test]
    fn render_round_trip() {
        let tag = Tag {
            short: Some('s'),
            long: Some("sep-list".to_owned()),
            default: r"a,b:c\d".to_owned(),
            sep: ",".to_owned(),
            value_name: "item".to_owned(),
            ..Tag::default()
        };

        let rendered = tag.to_string();
        assert_eq!(rendered, r"-s,--sep-list,default:a\,b\:c\\d,sep:\,,name:item");
        assert_eq!(Tag::parse(&rendered), Ok(tag));

        let positional = Tag::parse("arg:3,env:FILE").unwrap();
        assert_eq!(positional.to_string(), "arg:3,env:FILE");
        assert_eq!(Tag::parse("args").unwrap().to_string(), "args");
    }

    #[test]
    fn render_escaped_flag_names() {
        let tag = Tag::parse(r"-\,,--a\:b").unwrap();
        assert_eq!(tag.short, Some(','));
        assert_eq!(tag.long.as_deref(), Some("a:b"));

        let rendered = tag.to_string();
        assert_eq!(rendered, r"-\,,--a\:b");
        assert_eq!(Tag::parse(&rendered), Ok(tag));
    }
}
