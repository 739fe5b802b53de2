//! Config document abstraction layer.
//!
//! `ConfigDocument`, `ConfigSection`, and `ParseNode` wrap the `kdl` crate
//! types so the rest of the config module never touches KDL directly.

use super::ConfigError;

/// Parsed KDL document paired with its source text.
pub(super) struct ConfigDocument {
    doc: kdl::KdlDocument,
    source: String,
}

impl ConfigDocument {
    /// Parse a KDL source string into a document.
    pub(super) fn parse(source: &str) -> Result<Self, ConfigError> {
        let doc: kdl::KdlDocument = source
            .parse()
            .map_err(|e: kdl::KdlError| ConfigError::ParseError(e.to_string()))?;
        Ok(Self {
            doc,
            source: source.to_string(),
        })
    }

    /// Get a named top-level section's children.
    ///
    /// `section("dsp")` returns the contents of the `dsp { … }` block.
    /// A section that appears more than once is an error.
    pub(super) fn section(&self, name: &str) -> Result<Option<ConfigSection<'_>>, ConfigError> {
        let top = ConfigSection {
            doc: &self.doc,
            source: &self.source,
        };
        let Some(node) = top.unique(name)? else {
            return Ok(None);
        };
        node.children()
            .map(Some)
            .ok_or_else(|| node.invalid("needs a { … } block"))
    }

    /// Names of top-level nodes, with their lines.
    pub(super) fn top_level(&self) -> Vec<(String, usize)> {
        ConfigSection {
            doc: &self.doc,
            source: &self.source,
        }
        .nodes()
        .iter()
        .map(|n| (n.name().to_string(), n.line()))
        .collect()
    }
}

/// Borrowed view into a KDL section (children block of a top-level node).
pub(super) struct ConfigSection<'a> {
    doc: &'a kdl::KdlDocument,
    source: &'a str,
}

impl<'a> ConfigSection<'a> {
    /// All child nodes, in source order.
    pub(super) fn nodes(&self) -> Vec<ParseNode<'a>> {
        self.doc
            .nodes()
            .iter()
            .map(|node| ParseNode {
                node,
                source: self.source,
            })
            .collect()
    }

    /// The single child node called `name`, if any.
    pub(super) fn unique(&self, name: &str) -> Result<Option<ParseNode<'a>>, ConfigError> {
        let mut found = self.nodes().into_iter().filter(|n| n.name() == name);
        let first = found.next();
        if let Some(dup) = found.next() {
            return Err(ConfigError::ValidationError(format!(
                "line {}: duplicate {name} node",
                dup.line()
            )));
        }
        Ok(first)
    }

    /// Reject any child whose name is not in `known`.
    pub(super) fn deny_unknown(&self, section: &str, known: &[&str]) -> Result<(), ConfigError> {
        match self.nodes().into_iter().find(|n| !known.contains(&n.name())) {
            Some(node) => Err(ConfigError::ValidationError(format!(
                "line {}: unknown node {} in {section}; expected one of: {}",
                node.line(),
                node.name(),
                known.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

/// Single KDL node with source context for line-number reporting.
pub(super) struct ParseNode<'a> {
    node: &'a kdl::KdlNode,
    source: &'a str,
}

impl<'a> ParseNode<'a> {
    /// The node's identifier (e.g. `"type"`, `"bus-number"`).
    pub(super) fn name(&self) -> &'a str {
        self.node.name().value()
    }

    /// The node's only argument as a string.
    pub(super) fn string_value(&self) -> Result<&'a str, ConfigError> {
        self.single_value()?
            .as_string()
            .ok_or_else(|| self.invalid("expects a string"))
    }

    /// The node's only argument as an integer.
    pub(super) fn integer_value(&self) -> Result<i128, ConfigError> {
        self.single_value()?
            .as_integer()
            .ok_or_else(|| self.invalid("expects an integer"))
    }

    /// Get the children block as a borrowed `ConfigSection` (preserving source).
    pub(super) fn children(&self) -> Option<ConfigSection<'a>> {
        self.node.children().map(|doc| ConfigSection {
            doc,
            source: self.source,
        })
    }

    /// 1-based line number of this node in the source text.
    pub(super) fn line(&self) -> usize {
        let offset = self.node.span().offset();
        self.source[..offset.min(self.source.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }

    pub(super) fn invalid(&self, message: &str) -> ConfigError {
        ConfigError::ValidationError(format!("line {}: {} {message}", self.line(), self.name()))
    }

    fn single_value(&self) -> Result<&'a kdl::KdlValue, ConfigError> {
        match self.node.entries() {
            [entry] if entry.name().is_none() => Ok(entry.value()),
            _ => Err(self.invalid("takes exactly one argument")),
        }
    }
}
