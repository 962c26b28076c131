//! MML line splitter

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::errors::{ErrorWithLocation, SourceError};
use crate::file_pos::{split_lines, LineGroup, Location, MAX_MML_TEXT_LENGTH};
use crate::sources::{include_candidates, MmlSource, SourceResolver};

use std::sync::Arc;

use tracing::debug;

const LINE_CONTINUATION: char = '\\';

/// The logical lines of every source, sorted by kind.
#[derive(Debug, Default)]
pub struct MmlLines {
    /// `#meta`, `#basecount` and `#conditional` lines
    pub pragmas: Vec<LineGroup>,
    pub variables: Vec<LineGroup>,
    pub macros: Vec<LineGroup>,
    pub tracks: Vec<LineGroup>,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Variable,
    Macro,
    Track,
}

type Piece = (Location, String);

/// Removes a `//` comment (ignoring `//` inside strings)
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escape = false;
    let mut prev_slash = false;

    for (i, c) in line.char_indices() {
        if in_string {
            match (escape, c) {
                (true, _) => escape = false,
                (false, '\\') => escape = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if prev_slash => return &line[..i - 1],
            _ => {}
        }
        prev_slash = c == '/';
    }

    line
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

struct Reader<'a> {
    resolver: &'a dyn SourceResolver,
    sink: &'a mut dyn DiagnosticSink,
    include_stack: Vec<String>,
    defines: Vec<(String, String)>,
    last_target: Option<Target>,
    lines: MmlLines,
}

impl Reader<'_> {
    fn read(&mut self, name: &str, text: &str) -> Result<(), ErrorWithLocation<SourceError>> {
        if text.len() > MAX_MML_TEXT_LENGTH {
            return Err(ErrorWithLocation(
                None,
                SourceError::SourceTooLarge(name.to_owned()),
            ));
        }

        let file: Arc<str> = Arc::from(name);
        let mut in_block_comment = false;

        let mut lines = split_lines(text);
        while let Some(line) = lines.next() {
            let location = Location::new(file.clone(), line.line_number, 1);
            let text = strip_comment(line.text).trim_end();

            if in_block_comment {
                if text.trim() == "#endcomment" {
                    in_block_comment = false;
                }
                continue;
            }

            let mut pieces: Vec<Piece> = vec![(location, text.to_owned())];
            loop {
                match pieces.last_mut() {
                    Some((_, t)) if t.ends_with(LINE_CONTINUATION) => {
                        t.pop();
                    }
                    _ => break,
                }
                match lines.next() {
                    Some(next) => pieces.push((
                        Location::new(file.clone(), next.line_number, 1),
                        strip_comment(next.text).trim_end().to_owned(),
                    )),
                    None => break,
                }
            }

            self.process_line(name, pieces, &mut in_block_comment)?;
        }

        Ok(())
    }

    fn process_line(
        &mut self,
        file_name: &str,
        pieces: Vec<Piece>,
        in_block_comment: &mut bool,
    ) -> Result<(), ErrorWithLocation<SourceError>> {
        let (location, first) = match pieces.first() {
            Some(p) => p,
            None => return Ok(()),
        };

        match first.chars().next() {
            None => Ok(()),
            Some('#') => {
                let (directive, args) = split_word(&first[1..]);
                let keyword_len = 1 + directive.len();
                let err = |e| Err(ErrorWithLocation::new(location, e));

                match directive {
                    "comment" => {
                        *in_block_comment = true;
                        Ok(())
                    }
                    "endcomment" => err(SourceError::UnexpectedEndComment),
                    "include" => {
                        let location = location.clone();
                        let args = args.to_owned();
                        self.include(file_name, &location, &args)
                    }
                    "define" => {
                        let location = location.clone();
                        let args = args.to_owned();
                        self.define(&location, &args)
                    }
                    "variable" => {
                        self.push_group(Target::Variable, pieces, keyword_len);
                        Ok(())
                    }
                    "macro" => {
                        self.push_group(Target::Macro, pieces, keyword_len);
                        Ok(())
                    }
                    "meta" | "basecount" | "conditional" => {
                        let mut iter = pieces.into_iter();
                        if let Some((location, text)) = iter.next() {
                            let mut group = LineGroup::new(text, location);
                            for (location, text) in iter {
                                group.push_line(&text, location);
                            }
                            self.lines.pragmas.push(group);
                        }
                        self.last_target = None;
                        Ok(())
                    }
                    d => err(SourceError::UnknownDirective(d.to_owned())),
                }
            }
            Some(c) if c.is_whitespace() => match self.last_target {
                Some(target) => self.continue_group(target, location.clone(), pieces),
                None => Err(ErrorWithLocation::new(
                    location,
                    SourceError::NoLineToContinue,
                )),
            },
            Some(c) if c.is_ascii_alphanumeric() => {
                self.push_group(Target::Track, pieces, 0);
                Ok(())
            }
            Some(c) => Err(ErrorWithLocation::new(
                location,
                SourceError::CannotParseLine(c),
            )),
        }
    }

    fn apply_defines(&self, text: &str) -> String {
        let mut s = text.to_owned();
        for (name, value) in &self.defines {
            if s.contains(name.as_str()) {
                s = s.replace(name.as_str(), value);
            }
        }
        s
    }

    fn group_list(&mut self, target: Target) -> &mut Vec<LineGroup> {
        match target {
            Target::Variable => &mut self.lines.variables,
            Target::Macro => &mut self.lines.macros,
            Target::Track => &mut self.lines.tracks,
        }
    }

    // `keyword_len` bytes at the start of the first line are not subject to `#define` replacement
    fn push_group(&mut self, target: Target, pieces: Vec<Piece>, keyword_len: usize) {
        let mut iter = pieces.into_iter();
        let (location, first) = match iter.next() {
            Some(p) => p,
            None => return,
        };

        let (keyword, rest) = first.split_at(keyword_len.min(first.len()));
        let mut group = LineGroup::new(format!("{}{}", keyword, self.apply_defines(rest)), location);
        for (location, text) in iter {
            group.push_line(&self.apply_defines(&text), location);
        }

        self.group_list(target).push(group);
        self.last_target = Some(target);
    }

    fn continue_group(
        &mut self,
        target: Target,
        location: Location,
        pieces: Vec<Piece>,
    ) -> Result<(), ErrorWithLocation<SourceError>> {
        let pieces: Vec<Piece> = pieces
            .into_iter()
            .map(|(l, t)| (l, self.apply_defines(&t)))
            .collect();

        match self.group_list(target).last_mut() {
            Some(group) => {
                for (location, text) in pieces {
                    group.push_line(&text, location);
                }
                Ok(())
            }
            None => Err(ErrorWithLocation(
                Some(location),
                SourceError::NoLineToContinue,
            )),
        }
    }

    fn define(&mut self, location: &Location, args: &str) -> Result<(), ErrorWithLocation<SourceError>> {
        let (name, value) = split_word(args);
        if name.is_empty() {
            return Err(ErrorWithLocation::new(
                location,
                SourceError::MissingDefineName,
            ));
        }

        match self.defines.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => {
                self.sink.report(Diagnostic::warning(
                    location,
                    format!("{} is already defined", name),
                ));
                *v = value.to_owned();
            }
            None => self.defines.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    fn include(
        &mut self,
        current_file: &str,
        location: &Location,
        args: &str,
    ) -> Result<(), ErrorWithLocation<SourceError>> {
        let name = args.trim();
        let name = match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
            Some(n) => n,
            None => name,
        };
        if name.is_empty() {
            return Err(ErrorWithLocation::new(
                location,
                SourceError::MissingIncludeName,
            ));
        }

        let mut found = None;
        for candidate in include_candidates(current_file, name) {
            match self.resolver.resolve(&candidate) {
                Ok(text) => {
                    found = Some((candidate, text));
                    break;
                }
                Err(SourceError::NotFound(_)) => continue,
                Err(e) => return Err(ErrorWithLocation::new(location, e)),
            }
        }

        let (resolved_name, text) = match found {
            Some(f) => f,
            None => {
                return Err(ErrorWithLocation::new(
                    location,
                    SourceError::NotFound(name.to_owned()),
                ))
            }
        };

        if self.include_stack.contains(&resolved_name) {
            return Err(ErrorWithLocation::new(
                location,
                SourceError::RecursiveInclude(resolved_name),
            ));
        }

        debug!(name = resolved_name.as_str(), "including source");

        self.include_stack.push(resolved_name.clone());
        let r = self.read(&resolved_name, &text);
        self.include_stack.pop();
        r
    }
}

/// Splits the sources into logical lines, processing `#include`, `#define` and comments.
pub fn read_sources(
    sources: &[MmlSource],
    resolver: &dyn SourceResolver,
    sink: &mut dyn DiagnosticSink,
) -> Result<MmlLines, ErrorWithLocation<SourceError>> {
    let mut reader = Reader {
        resolver,
        sink,
        include_stack: Vec::new(),
        defines: Vec::new(),
        last_target: None,
        lines: MmlLines::default(),
    };

    for source in sources {
        reader.include_stack.push(source.name.clone());
        reader.read(&source.name, &source.text)?;
        reader.include_stack.pop();
    }

    Ok(reader.lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticList, Severity};
    use crate::sources::StringResolver;

    fn read(text: &str, resolver: &StringResolver) -> Result<MmlLines, SourceError> {
        let mut sink = DiagnosticList::new();
        read_sources(&[MmlSource::new("test.mml", text)], resolver, &mut sink).map_err(|e| e.1)
    }

    fn texts(groups: &[LineGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.text()).collect()
    }

    #[test]
    fn comments() {
        let lines = read(
            "1 cde // comment\n#comment\n2 ignored\n#endcomment\n3 \"a//b\"",
            &StringResolver::new(),
        )
        .unwrap();

        assert_eq!(texts(&lines.tracks), vec!["1 cde", "3 \"a//b\""]);
    }

    #[test]
    fn continuation_lines() {
        let lines = read(
            "#macro X { c\n   d }\n1 c \\\ne\n  f",
            &StringResolver::new(),
        )
        .unwrap();

        assert_eq!(texts(&lines.macros), vec!["#macro X { c\n   d }"]);
        assert_eq!(texts(&lines.tracks), vec!["1 c \ne\n  f"]);
    }

    #[test]
    fn defines() {
        let lines = read(
            "#define BASS 3\n#define riff cdef\nBASS riff riff",
            &StringResolver::new(),
        )
        .unwrap();

        assert_eq!(texts(&lines.tracks), vec!["3 cdef cdef"]);
    }

    #[test]
    fn redefine() {
        let mut sink = DiagnosticList::new();
        let lines = read_sources(
            &[MmlSource::new("test.mml", "#define A c\n#define A d\n1 A")],
            &StringResolver::new(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(texts(&lines.tracks), vec!["1 d"]);
        assert_eq!(sink.messages(Severity::Warning), ["A is already defined"]);
        assert_eq!(sink.0.len(), 1);

        let l = sink.0[0].location.as_ref().unwrap();
        assert_eq!(l.line_number(), 2);
    }

    #[test]
    fn includes() {
        let mut resolver = StringResolver::new();
        resolver.add("inc.mml", "#macro X { c }");
        resolver.add("loop.mml", "#include \"loop.mml\"");

        let lines = read("#include \"inc.mml\"\n1 X", &resolver).unwrap();
        assert_eq!(texts(&lines.macros), vec!["#macro X { c }"]);
        assert_eq!(lines.macros[0].location().file(), "inc.mml");

        assert_eq!(
            read("#include \"loop.mml\"", &resolver).err(),
            Some(SourceError::RecursiveInclude("loop.mml".to_owned()))
        );
        assert_eq!(
            read("#include missing.mml", &resolver).err(),
            Some(SourceError::NotFound("missing.mml".to_owned()))
        );
    }

    #[test]
    fn unknown_lines() {
        let r = StringResolver::new();
        assert_eq!(
            read("#unknown", &r).err(),
            Some(SourceError::UnknownDirective("unknown".to_owned()))
        );
        assert_eq!(read("  c", &r).err(), Some(SourceError::NoLineToContinue));
        assert_eq!(read("!x", &r).err(), Some(SourceError::CannotParseLine('!')));
    }
}
