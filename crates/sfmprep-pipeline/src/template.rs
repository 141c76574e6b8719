use crate::params::ParameterSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A command line argument with parameter placeholders.
///
/// `${name}` and `$name` are replaced by the value of `name`, `$$` produces a literal `$`.
/// In the short form the name runs over ASCII letters, digits and underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Template {
    /// Parse an argument template.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for an unterminated `${`, an empty name or a
    /// `$` not followed by a name.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = s.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }

            let name = match chars.peek().map(|&(_, next)| next) {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                    continue;
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(format!("unterminated placeholder at {pos}")),
                        }
                    }
                    name.trim().to_string()
                }
                Some(next) if is_name_char(next) => {
                    let mut name = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    name
                }
                _ => return Err(format!("invalid placeholder at {pos}")),
            };

            if name.is_empty() {
                return Err(format!("empty placeholder at {pos}"));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// The parameter names referenced by the template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder.
    ///
    /// # Errors
    ///
    /// Returns the name of the first placeholder missing from `params`. Nothing is
    /// substituted partially.
    pub fn resolve(&self, params: &ParameterSet) -> Result<String, String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = params.get(name).ok_or_else(|| name.clone())?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::builder()
            .set("path", "/data/scene")
            .set("num_gpus", 2i64)
            .set("ratio", 0.5)
            .build()
    }

    #[test]
    fn test_resolve() -> Result<(), String> {
        let cases = [
            ("--workspace_path", "--workspace_path"),
            ("${path}/colmap", "/data/scene/colmap"),
            ("$path/stereo", "/data/scene/stereo"),
            ("${num_gpus}x${ratio}", "2x0.5"),
            ("$$HOME", "$HOME"),
            ("cost$$", "cost$"),
            ("${ path }", "/data/scene"),
        ];
        for (template, expected) in cases {
            assert_eq!(Template::parse(template)?.resolve(&params())?, expected);
        }
        Ok(())
    }

    #[test]
    fn test_placeholders() -> Result<(), String> {
        let template = Template::parse("${a}-$b_c.$$d${e}")?;
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["a", "b_c", "e"]);
        Ok(())
    }

    #[test]
    fn test_missing_parameter() -> Result<(), String> {
        let template = Template::parse("${path}/${missing}/${other}")?;
        assert_eq!(template.resolve(&params()), Err("missing".to_string()));
        Ok(())
    }

    #[test]
    fn test_invalid_templates() {
        assert!(Template::parse("${path").is_err());
        assert!(Template::parse("${}").is_err());
        assert!(Template::parse("cost $ 5").is_err());
        assert!(Template::parse("trailing$").is_err());
    }
}
