use crate::error::Pos;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    And,
    Or,
}

/// One step of a variable path after the head identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`
    Key(String),
    /// `[expr]`
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Head variable name plus property/index steps.
    Path(String, Vec<Segment>),
    Filter {
        input: Box<Expr>,
        name: String,
        args: Vec<Expr>,
        named: Vec<(String, Expr)>,
    },
    Binary(Op, Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// The head variable names this expression reads, in source order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Path(head, segments) => {
                out.push(head);
                for segment in segments {
                    if let Segment::Index(e) = segment {
                        e.collect_variables(out);
                    }
                }
            }
            Expr::Filter {
                input, args, named, ..
            } => {
                input.collect_variables(out);
                args.iter().for_each(|a| a.collect_variables(out));
                named.iter().for_each(|(_, a)| a.collect_variables(out));
            }
            Expr::Binary(_, l, r) | Expr::Range(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Seq,
    Text,
    Object,
    Tag,
    Block,
}

#[derive(Debug, Clone)]
pub enum Node {
    Seq(SeqNode),
    Text(TextNode),
    Object(ObjectNode),
    Tag(TagNode),
    Block(BlockNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Seq(_) => NodeKind::Seq,
            Node::Text(_) => NodeKind::Text,
            Node::Object(_) => NodeKind::Object,
            Node::Tag(_) => NodeKind::Tag,
            Node::Block(_) => NodeKind::Block,
        }
    }
}

/// Ordered children; the root of every template and every block body.
#[derive(Debug, Clone, Default)]
pub struct SeqNode {
    pub(crate) children: Vec<Node>,
}

impl SeqNode {
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Visits every node below this sequence depth-first, block bodies and
    /// clause bodies included.
    pub fn walk<F: FnMut(&Node)>(&self, f: &mut F) {
        for child in &self.children {
            f(child);
            match child {
                Node::Seq(seq) => seq.walk(f),
                Node::Block(block) => {
                    block.body.walk(f);
                    for clause in &block.clauses {
                        clause.body.walk(f);
                    }
                }
                _ => {}
            }
        }
    }

    /// Appends text, merging with a preceding text node.
    pub(crate) fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.text.push_str(text);
        } else {
            self.children.push(Node::Text(TextNode {
                text: text.to_string(),
            }));
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub(crate) text: String,
}

impl TextNode {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `{{ expr }}`
#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub(crate) args: String,
    pub(crate) expr: Expr,
    pub(crate) pos: Pos,
}

impl ObjectNode {
    /// The raw expression source between the delimiters.
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }
}

/// `{% name args %}` for an inline tag.
#[derive(Debug, Clone)]
pub struct TagNode {
    pub(crate) name: String,
    pub(crate) args: String,
    pub(crate) pos: Pos,
}

impl TagNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }
}

/// An intermediate marker inside a block (`else`, `elsif`, `when`, ...) and
/// the body that follows it.
#[derive(Debug, Clone)]
pub struct Clause {
    pub(crate) name: String,
    pub(crate) args: String,
    pub(crate) pos: Pos,
    pub(crate) body: SeqNode,
}

impl Clause {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn body(&self) -> &SeqNode {
        &self.body
    }
}

/// `{% name args %} body {% marker %} ... {% endname %}`
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub(crate) name: String,
    pub(crate) args: String,
    pub(crate) pos: Pos,
    pub(crate) body: SeqNode,
    pub(crate) clauses: Vec<Clause>,
}

impl BlockNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// The body before the first intermediate marker.
    pub fn body(&self) -> &SeqNode {
        &self.body
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}
