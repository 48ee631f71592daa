//! Line classification for build files.
//!
//! Recognizes the three directive shapes that carry inter-stage edges:
//! stage introductions (`FROM ... [AS name]`), artifact copies
//! (`COPY --from=ref ...`), and bind mounts
//! (`RUN --mount=type=bind,from=ref,...`). Everything else is ignored.
//! Keywords match case-insensitively; leading whitespace is tolerated.

/// A logical source line after continuation stitching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based physical line number where the logical line starts.
    pub number: usize,
    pub text: String,
}

/// Result of stitching a file's physical lines.
#[derive(Debug, Default)]
pub struct StitchedLines {
    pub lines: Vec<LogicalLine>,
    /// Start line of a continuation run left open at end of file, if any.
    /// The accumulated text is discarded.
    pub unterminated: Option<usize>,
}

/// Joins trailing-backslash continuations into logical lines.
///
/// Comment lines (first non-blank character `#`) are dropped entirely,
/// including inside a continuation run, matching the BuildKit frontend.
/// Blank lines outside a continuation are dropped.
pub fn stitch(content: &str) -> StitchedLines {
    let mut out = StitchedLines::default();
    let mut current = String::new();
    let mut start_line = 0usize;
    let mut continuing = false;

    for (idx, raw) in content.lines().enumerate() {
        let number = idx + 1;
        let trimmed = raw.trim();

        if trimmed.starts_with('#') {
            continue;
        }
        if trimmed.is_empty() && !continuing {
            continue;
        }

        let (piece, continues) = match trimmed.strip_suffix('\\') {
            Some(rest) => (rest.trim(), true),
            None => (trimmed, false),
        };

        if continuing {
            if !piece.is_empty() {
                current.push(' ');
                current.push_str(piece);
            }
        } else {
            start_line = number;
            current = piece.to_string();
        }

        continuing = continues;
        if !continuing {
            if !current.is_empty() {
                out.lines.push(LogicalLine { number: start_line, text: std::mem::take(&mut current) });
            }
            current.clear();
        }
    }

    if continuing {
        out.unterminated = Some(start_line);
        current.clear();
    }

    out
}

/// A recognized edge-bearing directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `FROM <base> [AS <alias>]`
    Stage { base: String, alias: Option<String> },
    /// `COPY --from=<ref> ...`
    CopyFrom { reference: String },
    /// `RUN --mount=...,from=<ref>,...`
    MountFrom { reference: String },
}

/// Classifies one logical line.
///
/// Returns every directive the line carries (a single `RUN` may hold
/// several `--mount=` flags), an empty list for lines that carry no
/// edges, or an error message for a malformed directive.
pub fn classify(line: &str) -> Result<Vec<Directive>, String> {
    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Ok(Vec::new());
    };

    if keyword.eq_ignore_ascii_case("FROM") {
        return classify_from(tokens).map(|d| vec![d]);
    }
    if keyword.eq_ignore_ascii_case("COPY") {
        return Ok(tokens
            .filter_map(|tok| flag_value(tok, "--from="))
            .filter(|reference| !reference.is_empty())
            .map(|reference| Directive::CopyFrom { reference: reference.to_string() })
            .collect());
    }
    if keyword.eq_ignore_ascii_case("RUN") {
        let mut out = Vec::new();
        for tok in tokens {
            let Some(options) = flag_value(tok, "--mount=") else {
                continue;
            };
            // Only the mount's `from=` key yields an edge; the other
            // comma-separated options (type=, source=, target=) do not.
            for opt in options.split(',') {
                if let Some(reference) = flag_value(opt, "from=") {
                    if !reference.is_empty() {
                        out.push(Directive::MountFrom { reference: reference.to_string() });
                    }
                }
            }
        }
        return Ok(out);
    }

    Ok(Vec::new())
}

fn classify_from<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<Directive, String> {
    // Skip flags such as --platform=... between FROM and the image.
    let base = loop {
        match tokens.next() {
            Some(tok) if tok.starts_with("--") => continue,
            Some(tok) => break tok,
            None => return Err("FROM instruction requires an image reference".to_string()),
        }
    };

    let alias = match tokens.next() {
        Some(tok) if tok.eq_ignore_ascii_case("AS") => match tokens.next() {
            Some(name) => Some(name.to_string()),
            None => return Err("FROM ... AS requires a stage name".to_string()),
        },
        _ => None,
    };

    Ok(Directive::Stage { base: base.to_string(), alias })
}

/// Case-insensitive prefix match returning the value after the flag.
fn flag_value<'a>(token: &'a str, flag: &str) -> Option<&'a str> {
    if token.len() >= flag.len()
        && token.is_char_boundary(flag.len())
        && token[..flag.len()].eq_ignore_ascii_case(flag)
    {
        Some(&token[flag.len()..])
    } else {
        None
    }
}
