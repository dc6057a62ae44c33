//! Markup parsing boundary.
//!
//! The compiler only needs a way to turn generated markup into a detached
//! subtree. [`HtmlParser`] is a lenient tokenizer that covers what templates
//! produce; hosts with a real HTML engine can plug in their own
//! [`MarkupParser`].

use crate::dom::{is_raw_text, is_void, Document, Namespace, NodeId};

pub trait MarkupParser {
    /// Parses `markup` into a new detached fragment of `document` and returns
    /// the fragment id. Elements at the top level are created in `namespace`.
    fn parse_fragment(&self, document: &mut Document, markup: &str, namespace: Namespace)
        -> NodeId;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlParser;

impl MarkupParser for HtmlParser {
    fn parse_fragment(
        &self,
        document: &mut Document,
        markup: &str,
        namespace: Namespace,
    ) -> NodeId {
        let root = document.create_fragment();
        let mut tokenizer = Tokenizer {
            document,
            source: markup,
            pos: 0,
            stack: vec![Frame {
                node: root,
                name: String::new(),
                namespace,
            }],
            text: String::new(),
        };
        tokenizer.run();
        root
    }
}

struct Frame {
    node: NodeId,
    name: String,
    namespace: Namespace,
}

struct Tokenizer<'a> {
    document: &'a mut Document,
    source: &'a str,
    pos: usize,
    stack: Vec<Frame>,
    text: String,
}

impl<'a> Tokenizer<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn current(&self) -> &Frame {
        // The root frame is never popped.
        &self.stack[self.stack.len() - 1]
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current().node;
        // Both ids were just created by this tokenizer.
        let _ = self.document.append_child(parent, node);
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let data = decode_entities(&std::mem::take(&mut self.text));
        let node = self.document.create_text(data);
        self.append(node);
    }

    fn run(&mut self) {
        while self.pos < self.source.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.flush_text();
                self.comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.flush_text();
                self.skip_declaration();
            } else if rest.starts_with("</") && starts_tag_name(&rest[2..]) {
                self.flush_text();
                self.end_tag();
            } else if rest.starts_with('<') && starts_tag_name(&rest[1..]) {
                self.flush_text();
                self.start_tag();
            } else {
                let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                let next = rest[first..]
                    .find('<')
                    .map(|i| i + first)
                    .unwrap_or(rest.len());
                self.text.push_str(&rest[..next]);
                self.pos += next;
            }
        }
        self.flush_text();
    }

    fn comment(&mut self) {
        let body = &self.rest()[4..];
        let (data, consumed) = match body.find("-->") {
            Some(end) => (&body[..end], end + 3),
            None => (body, body.len()),
        };
        let node = self.document.create_comment(data);
        self.pos += 4 + consumed;
        self.append(node);
    }

    fn skip_declaration(&mut self) {
        self.pos += self.rest().find('>').map(|i| i + 1).unwrap_or(self.rest().len());
    }

    fn end_tag(&mut self) {
        let body = &self.rest()[2..];
        let name_len = body
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(body.len());
        let name = body[..name_len].to_string();
        self.pos += 2 + body.find('>').map(|i| i + 1).unwrap_or(body.len());
        let matches = |frame: &Frame| match frame.namespace {
            Namespace::Html => frame.name.eq_ignore_ascii_case(&name),
            Namespace::Svg => frame.name == name,
        };
        if let Some(index) = self.stack.iter().skip(1).rposition(matches) {
            self.stack.truncate(index + 1);
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let raw_name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let parent_namespace = self.current().namespace;
        let namespace = if raw_name.eq_ignore_ascii_case("svg") {
            Namespace::Svg
        } else {
            parent_namespace
        };
        let name = match namespace {
            Namespace::Html => raw_name.to_ascii_lowercase(),
            Namespace::Svg if raw_name.eq_ignore_ascii_case("svg") => "svg".to_string(),
            Namespace::Svg => raw_name,
        };
        let element = self.document.create_element(&name, namespace);
        let self_closing = self.attributes(element, namespace);
        self.append(element);

        if namespace == Namespace::Html && is_void(&name) {
            return;
        }
        if self_closing {
            return;
        }
        if namespace == Namespace::Html && is_raw_text(&name) {
            self.raw_text(element, &name);
            return;
        }
        self.stack.push(Frame {
            node: element,
            name,
            namespace,
        });
    }

    /// Reads attributes up to the end of the tag. Returns whether the tag was
    /// written in self-closing form.
    fn attributes(&mut self, element: NodeId, namespace: Namespace) -> bool {
        loop {
            self.take_while(char::is_whitespace);
            let rest = self.rest();
            if rest.is_empty() {
                return false;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let mut name = self.take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/');
            if name.is_empty() {
                // A stray '=' with no name in front of it.
                self.pos += 1;
                continue;
            }
            if namespace == Namespace::Html {
                name = name.to_ascii_lowercase();
            }
            self.take_while(char::is_whitespace);
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.take_while(char::is_whitespace);
                self.attribute_value()
            } else {
                String::new()
            };
            if self.document.attribute(element, &name).is_none() {
                let _ = self
                    .document
                    .set_attribute(element, &name, decode_entities(&value));
            }
        }
    }

    fn attribute_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                let value = body[..end].to_string();
                self.pos += 1 + (end + 1).min(body.len());
                value
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        }
    }

    fn raw_text(&mut self, element: NodeId, name: &str) {
        let rest = self.rest();
        let close = format!("</{name}");
        let end = find_ignore_case(rest, &close).unwrap_or(rest.len());
        let content = &rest[..end];
        if !content.is_empty() {
            let data = if matches!(name, "textarea" | "title") {
                decode_entities(content)
            } else {
                content.to_string()
            };
            let text = self.document.create_text(data);
            let _ = self.document.append_child(element, text);
        }
        self.pos += end;
        let tail = self.rest();
        self.pos += tail.find('>').map(|i| i + 1).unwrap_or(tail.len());
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let rest = self.rest();
        let end = rest.find(|c: char| !predicate(c)).unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_string()
    }
}

fn starts_tag_name(rest: &str) -> bool {
    rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let lower = haystack.to_ascii_lowercase();
    lower.find(&needle.to_ascii_lowercase())
}

/// Decodes the character references templates commonly contain. Unknown
/// references are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                output.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_reference(reference: &str) -> Option<char> {
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = reference.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
#[path = "tests/markup_tests.rs"]
mod tests;
