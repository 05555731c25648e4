use std::collections::HashMap;

use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::{
    prelude::*,
    token::{any, one_of, take_while},
};

type Input<'a> = &'a str;
type ParserResult<T> = winnow::PResult<T>;

/// Integer field value. `None` stands for text that does not start with a number and is
/// sent to the server as JSON `null`.
pub type Numeric = Option<i64>;

/// Flag name to value mapping extracted from one command line.
///
/// Flag names are case sensitive. When a flag repeats the last occurrence wins.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ArgumentMap {
    arguments: HashMap<String, String>,
}

impl ArgumentMap {
    /// Raw value of `name`, if the flag was given at all.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// Value of `name` only when it is non-empty. `-fit=""` counts as not given.
    pub fn present(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    fn insert(&mut self, name: String, value: String) {
        self.arguments.insert(name, value);
    }
}

/// Extract every `-name=value` argument from `command`.
///
/// This never fails: anything that does not look like an argument is skipped.
pub fn extract(command: &str) -> ArgumentMap {
    WinnowArgumentParser::extract(command)
}

/// Parse the leading base-10 integer of `text`.
///
/// Leading whitespace and a sign are accepted and anything after the digits is ignored,
/// so `"10M"` reads as `10`. Text without leading digits yields `None`.
pub fn parse_integer(text: &str) -> Numeric {
    let mut input = text.trim_start();
    let digits: ParserResult<&str> = (opt(one_of(['+', '-'])), digit1)
        .take()
        .parse_next(&mut input);

    digits.ok().and_then(|digits| digits.parse::<i64>().ok())
}

/// Scanner for the argument part of a command line
/// The scanner walks the input left to right, reading an argument wherever one starts
/// and stepping over one character wherever none does.
/// It is based on the [Winnow](https://docs.rs/winnow) parser combinator library
pub struct WinnowArgumentParser;

impl WinnowArgumentParser {
    pub fn extract(command: &str) -> ArgumentMap {
        let mut input = command;

        Self::parse_arguments(&mut input).unwrap_or_default()
    }

    /// Parse every argument of a line
    ///
    /// # Grammar
    ///
    /// ```md
    /// arguments := (argument | any)*;
    /// ```
    fn parse_arguments(input: &mut Input<'_>) -> ParserResult<ArgumentMap> {
        repeat(0.., alt((Self::parse_argument.map(Some), any.value(None))))
            .fold(ArgumentMap::default, |mut map, item| {
                if let Some((name, value)) = item {
                    map.insert(name, value);
                }
                map
            })
            .parse_next(input)
    }

    /// Parse a single argument
    ///
    /// # Grammar
    ///
    /// ```md
    /// argument := "-" name "=" (quoted_value | bare_value);
    /// ```
    fn parse_argument(input: &mut Input<'_>) -> ParserResult<(String, String)> {
        (
            preceded('-', Self::parse_name),
            preceded('=', alt((Self::parse_quoted_value, Self::parse_bare_value))),
        )
            .map(|(name, value): (&str, &str)| (name.to_string(), value.replace('"', "")))
            .parse_next(input)
    }

    /// Parse a flag name
    ///
    /// # Grammar
    ///
    /// ```md
    /// name := [A-Za-z0-9_]+;
    /// ```
    fn parse_name<'a>(input: &mut Input<'a>) -> ParserResult<&'a str> {
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
    }

    /// Parse a double quoted value, returning what is between the quotes
    ///
    /// # Grammar
    ///
    /// ```md
    /// quoted_value := "\"" ^"\""* "\"";
    /// ```
    fn parse_quoted_value<'a>(input: &mut Input<'a>) -> ParserResult<&'a str> {
        delimited('"', take_while(0.., |c: char| c != '"'), '"').parse_next(input)
    }

    /// Parse a run of non whitespace characters
    fn parse_bare_value<'a>(input: &mut Input<'a>) -> ParserResult<&'a str> {
        take_while(1.., |c: char| !c.is_whitespace()).parse_next(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_arguments() {
        // Arrange
        let args = extract("mkdisk -size=10 -unit=M -fit=BF -path=/home/disk.mia");

        // Assert
        assert_eq!(args.len(), 4);
        assert_eq!(args.get("size"), Some("10"));
        assert_eq!(args.get("unit"), Some("M"));
        assert_eq!(args.get("fit"), Some("BF"));
        assert_eq!(args.get("path"), Some("/home/disk.mia"));
    }

    #[test]
    fn test_quoted_values_keep_inner_spaces() {
        // Arrange
        let inputs = [
            r#"mkdisk -path="value with spaces""#,
            r#"mkdisk   -path="value with spaces"   -size=3"#,
            r#"mkdisk -size=3 -path="value with spaces""#,
        ];

        for input in inputs.iter() {
            let args = extract(input);

            // Assert
            assert_eq!(args.get("path"), Some("value with spaces"));
        }
    }

    #[test]
    fn test_last_repeated_flag_wins() {
        let args = extract("fdisk -name=first -size=1 -name=second");

        assert_eq!(args.get("name"), Some("second"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_flag_names_are_case_sensitive() {
        let args = extract("mkdisk -Size=1 -size=2");

        assert_eq!(args.get("Size"), Some("1"));
        assert_eq!(args.get("size"), Some("2"));
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        // Arrange
        let inputs = [
            "mkdisk size=10",
            "mkdisk -size",
            "mkdisk -size=",
            "mkdisk -=10",
            "mkdisk - size=10",
            "mkdisk -size =10",
        ];

        for input in inputs.iter() {
            let args = extract(input);

            // Assert
            assert!(args.is_empty(), "{input} produced {args:?}");
        }
    }

    #[test]
    fn test_scanning_resumes_inside_junk() {
        let args = extract("rep --name=mbr -a-id=341A");

        assert_eq!(args.get("name"), Some("mbr"));
        assert_eq!(args.get("id"), Some("341A"));
        assert!(!args.contains("a"));
    }

    #[test]
    fn test_unterminated_quote_falls_back_to_bare_value() {
        let args = extract(r#"mkdisk -path="/tmp/my disk"#);

        assert_eq!(args.get("path"), Some("/tmp/my"));
    }

    #[test]
    fn test_stray_quotes_are_removed_from_bare_values() {
        let args = extract(r#"mount -name=par"t1"#);

        assert_eq!(args.get("name"), Some("part1"));
    }

    #[test]
    fn test_empty_quoted_value_is_not_present() {
        let args = extract(r#"fdisk -fit="""#);

        assert!(args.contains("fit"));
        assert_eq!(args.get("fit"), Some(""));
        assert_eq!(args.present("fit"), None);
    }

    #[test]
    fn test_parse_integer() {
        // Arrange
        let inputs = ["10", "  42", "-5", "+7", "10M", "0", "abc", "", "M10", "99999999999999999999"];
        let outputs = [
            Some(10),
            Some(42),
            Some(-5),
            Some(7),
            Some(10),
            Some(0),
            None,
            None,
            None,
            None,
        ];

        for (input, output) in inputs.iter().zip(outputs.iter()) {
            // Assert
            assert_eq!(parse_integer(input), *output, "input {input:?}");
        }
    }
}
