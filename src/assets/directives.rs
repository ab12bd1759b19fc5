//! Line splitter shared by the OBJ and MTL parsers
//!
//! Both formats are one directive per line: a keyword followed by
//! whitespace-separated arguments. Blank lines and `#` comments are skipped.

/// One non-empty, non-comment line of a text asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive<'a> {
    /// 1-based line number, for error messages.
    pub line: usize,
    pub keyword: &'a str,
    /// Arguments split on whitespace.
    pub args: Vec<&'a str>,
    /// Everything after the keyword, untouched apart from leading whitespace.
    /// Names and filenames may contain spaces, so they are read from here.
    pub rest: &'a str,
}

/// Iterates the directives of `text` in order.
pub fn directives(text: &str) -> impl Iterator<Item = Directive<'_>> {
    text.lines().enumerate().filter_map(|(index, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let keyword_len = line
            .find(char::is_whitespace)
            .unwrap_or(line.len());
        let (keyword, rest) = line.split_at(keyword_len);

        Some(Directive {
            line: index + 1,
            keyword,
            args: rest.split_whitespace().collect(),
            rest: rest.trim_start(),
        })
    })
}
