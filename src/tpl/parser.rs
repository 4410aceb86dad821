use crate::config::Config;
use crate::error::{Error, Pos, Result};
use crate::tags::{TagEntry, TagRegistry};
use crate::tpl::ast::{BlockNode, Clause, Node, ObjectNode, SeqNode, TagNode};
use crate::tpl::expr::parse_expression;
use crate::tpl::token::{Token, tokenize};

/// An open block while its body is being collected.
struct BlockFrame {
    name: String,
    args: String,
    pos: Pos,
    end: String,
    markers: Vec<String>,
    /// The body before the first marker, once a marker has closed it.
    body: Option<SeqNode>,
    clauses: Vec<Clause>,
    /// The marker whose body is currently being collected.
    open_clause: Option<(String, String, Pos)>,
}

impl BlockFrame {
    /// Files the section that just ended under the body or the open clause.
    fn close_section(&mut self, seq: SeqNode) {
        match self.open_clause.take() {
            None => self.body = Some(seq),
            Some((name, args, pos)) => self.clauses.push(Clause {
                name,
                args,
                pos,
                body: seq,
            }),
        }
    }

    fn into_node(self) -> BlockNode {
        BlockNode {
            name: self.name,
            args: self.args,
            pos: self.pos,
            body: self.body.unwrap_or_default(),
            clauses: self.clauses,
        }
    }
}

/// Builds the node tree from the token stream.
///
/// Two parallel stacks track nesting: `nodes_stack` holds the sequence being
/// filled at each level (the root sequence first) and `tag_stack` holds the
/// open blocks. `nodes_stack` is always one longer than `tag_stack`.
struct Parser<'a> {
    tags: &'a TagRegistry,
    nodes_stack: Vec<SeqNode>,
    tag_stack: Vec<BlockFrame>,
}

impl<'a> Parser<'a> {
    fn new(tags: &'a TagRegistry) -> Self {
        Self {
            tags,
            nodes_stack: vec![SeqNode::default()],
            tag_stack: Vec::new(),
        }
    }

    fn parse(mut self, src: &str, config: &Config) -> Result<SeqNode> {
        for token in tokenize(src, config) {
            match token? {
                Token::Text { text, .. } => self.current().push_text(text),
                Token::Object { source, pos } => {
                    let expr = parse_expression(source, pos)?;
                    self.append_node(Node::Object(ObjectNode {
                        args: source.to_string(),
                        expr,
                        pos,
                    }));
                }
                Token::Tag { name, args, pos } => self.handle_tag(name, args, pos)?,
            }
        }

        if let Some(frame) = self.tag_stack.pop() {
            return Err(Error::UnclosedBlock {
                name: frame.name,
                pos: frame.pos,
            });
        }
        Ok(self.nodes_stack.pop().unwrap_or_default())
    }

    fn handle_tag(&mut self, name: &str, args: &str, pos: Pos) -> Result<()> {
        if let Some(frame) = self.tag_stack.last() {
            if frame.end == name {
                return self.close_block();
            }
            if frame.markers.iter().any(|m| m == name) {
                self.open_clause(name, args, pos);
                return Ok(());
            }
        }

        match self.tags.get(name) {
            Some(TagEntry::Inline(_)) => {
                self.append_node(Node::Tag(TagNode {
                    name: name.to_string(),
                    args: args.to_string(),
                    pos,
                }));
                Ok(())
            }
            Some(TagEntry::Block { end, markers, .. }) => {
                self.nodes_stack.push(SeqNode::default());
                self.tag_stack.push(BlockFrame {
                    name: name.to_string(),
                    args: args.to_string(),
                    pos,
                    end,
                    markers,
                    body: None,
                    clauses: Vec::new(),
                    open_clause: None,
                });
                Ok(())
            }
            None if self.tags.is_closer_or_marker(name) => Err(Error::UnmatchedTag {
                name: name.to_string(),
                pos,
            }),
            None => Err(Error::UnknownTag {
                name: name.to_string(),
                pos,
            }),
        }
    }

    fn open_clause(&mut self, name: &str, args: &str, pos: Pos) {
        let seq = self.nodes_stack.pop().unwrap_or_default();
        if let Some(frame) = self.tag_stack.last_mut() {
            frame.close_section(seq);
            frame.open_clause = Some((name.to_string(), args.to_string(), pos));
        }
        self.nodes_stack.push(SeqNode::default());
    }

    fn close_block(&mut self) -> Result<()> {
        let seq = self.nodes_stack.pop().unwrap_or_default();
        if let Some(mut frame) = self.tag_stack.pop() {
            frame.close_section(seq);
            self.append_node(Node::Block(frame.into_node()));
        }
        Ok(())
    }

    fn current(&mut self) -> &mut SeqNode {
        if self.nodes_stack.is_empty() {
            self.nodes_stack.push(SeqNode::default());
        }
        let last = self.nodes_stack.len() - 1;
        &mut self.nodes_stack[last]
    }

    fn append_node(&mut self, node: Node) {
        self.current().children.push(node);
    }
}

/// Compiles template source into its root sequence.
pub(crate) fn parse_template(src: &str, config: &Config, tags: &TagRegistry) -> Result<SeqNode> {
    Parser::new(tags).parse(src, config)
}
