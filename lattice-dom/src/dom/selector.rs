//! CSS selector subset.
//!
//! Supported syntax: type (`div`), universal (`*`), class (`.item`), id
//! (`#app`), attribute presence and equality (`[href]`, `[type="text"]`),
//! compound selectors (`li.item.active`), descendant and child combinators
//! (`ul li`, `ul > li`) and selector lists (`a, button`).

use std::str::FromStr;

use smallvec::SmallVec;

use super::element::Element;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeMatch {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
    attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|attribute| match attribute {
            AttributeMatch::Exists(name) => element.attribute(name).is_some(),
            AttributeMatch::Equals(name, value) => {
                element.attribute(name).as_deref() == Some(value.as_str())
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    // combinators[i] joins compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, element: &Element) -> bool {
        self.matches_at(self.compounds.len() - 1, element)
    }

    fn matches_at(&self, index: usize, element: &Element) -> bool {
        if !self.compounds[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_at(index - 1, &parent)),
            Combinator::Descendant => {
                let mut ancestor = element.parent();
                while let Some(candidate) = ancestor {
                    if self.matches_at(index - 1, &candidate) {
                        return true;
                    }
                    ancestor = candidate.parent();
                }
                false
            }
        }
    }
}

/// A parsed CSS selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::invalid_selector(source, "empty selector"));
        }

        let mut parser = Parser {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(parser.complex()?);
            parser.skip_whitespace();
            match parser.peek() {
                Some(',') => parser.pos += 1,
                None => break,
                Some(c) => return Err(parser.error(format!("unexpected '{c}'"))),
            }
        }

        Ok(Self {
            source: source.to_owned(),
            alternatives,
        })
    }

    /// The selector text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element` matches any alternative of the list.
    pub fn matches(&self, element: &Element) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(element))
    }

    /// The class name when the selector is exactly one class (`.name`).
    pub fn single_class(&self) -> Option<&str> {
        let [complex] = self.alternatives.as_slice() else {
            return None;
        };
        let [compound] = complex.compounds.as_slice() else {
            return None;
        };
        let plain = !compound.universal
            && compound.tag.is_none()
            && compound.id.is_none()
            && compound.attributes.is_empty();
        match compound.classes.as_slice() {
            [class] if plain => Some(class.as_str()),
            _ => None,
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Self::parse(source)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_selector(self.source, reason)
    }

    /// Skip whitespace, reporting whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> Result<Complex> {
        self.skip_whitespace();
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let spaced = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                    compounds.push(self.compound()?);
                }
                Some(_) if spaced => {
                    combinators.push(Combinator::Descendant);
                    compounds.push(self.compound()?);
                }
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.universal = true;
                any = true;
            }
            Some(c) if is_name_char(c) => {
                compound.tag = Some(self.name()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.name()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.name()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            any = true;
        }

        if !any {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected '{c}'")),
                None => self.error("expected a selector"),
            });
        }
        Ok(compound)
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("expected a name at offset {start}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Result<AttributeMatch> {
        self.skip_whitespace();
        let name = self.name()?;
        self.skip_whitespace();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttributeMatch::Exists(name))
            }
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(self.error("unterminated string"));
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.name()?,
                };
                self.skip_whitespace();
                if self.peek() != Some(']') {
                    return Err(self.error("expected ']'"));
                }
                self.pos += 1;
                Ok(AttributeMatch::Equals(name, value))
            }
            _ => Err(self.error("expected ']' or '='")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Element, Element, Element) {
        // <div id="app" class="app"><ul class="list"><li class="item" data-x="1"/></ul></div>
        let app = Element::new("div");
        app.set_attribute("id", "app");
        app.set_class_name("app");
        let list = Element::new("ul");
        list.set_class_name("list");
        let item = Element::new("li");
        item.set_class_name("item active");
        item.set_attribute("data-x", "1");
        list.append_child(item.clone());
        app.append_child(list.clone());
        (app, list, item)
    }

    #[test]
    fn matches_compound_selectors() {
        let (app, _list, item) = tree();
        assert!(Selector::parse("li").unwrap().matches(&item));
        assert!(Selector::parse("LI.item.active").unwrap().matches(&item));
        assert!(Selector::parse("#app").unwrap().matches(&app));
        assert!(Selector::parse("[data-x]").unwrap().matches(&item));
        assert!(Selector::parse("[data-x='1']").unwrap().matches(&item));
        assert!(!Selector::parse("[data-x=\"2\"]").unwrap().matches(&item));
        assert!(Selector::parse("*").unwrap().matches(&item));
    }

    #[test]
    fn matches_combinators() {
        let (_app, list, item) = tree();
        assert!(Selector::parse("#app li").unwrap().matches(&item));
        assert!(Selector::parse(".list > .item").unwrap().matches(&item));
        assert!(!Selector::parse("#app > li").unwrap().matches(&item));
        assert!(Selector::parse("div>ul").unwrap().matches(&list));
        assert!(Selector::parse("span, li").unwrap().matches(&item));
    }

    #[test]
    fn single_class_detection() {
        assert_eq!(Selector::parse(".item").unwrap().single_class(), Some("item"));
        assert_eq!(Selector::parse(" .item ").unwrap().single_class(), Some("item"));
        assert_eq!(Selector::parse("li.item").unwrap().single_class(), None);
        assert_eq!(Selector::parse(".a.b").unwrap().single_class(), None);
        assert_eq!(Selector::parse(".a .b").unwrap().single_class(), None);
        assert_eq!(Selector::parse(".a, .b").unwrap().single_class(), None);
    }

    #[test]
    fn rejects_malformed_selectors() {
        for source in ["", "   ", ".", "..a", "div >", "[x", "[x='1'", "a,", "a $b"] {
            assert!(
                matches!(Selector::parse(source), Err(Error::InvalidSelector { .. })),
                "expected '{source}' to be rejected"
            );
        }
    }
}
