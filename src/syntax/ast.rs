//! Closed syntax tree for the fallback parser
//!
//! Every node kind is a variant with statically known child slots; traversal
//! lives in [`visit`](super::visit).

/// Which top-level grammar produced a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Import/export declarations and top-level `await` allowed; strict-mode
    /// reserved words rejected as binding names
    Module,
    /// Plain script: import/export declarations rejected
    Script,
}

/// How the tree was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOrigin {
    Full(Dialect),
    /// Last resort: a single isolated array literal wrapped as a one-statement script
    ArrayFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub origin: ParseOrigin,
}

impl Program {
    /// The array of the last-resort fragment wrapper, if this is one
    pub fn fragment_array(&self) -> Option<&[Option<Expr>]> {
        if self.origin != ParseOrigin::ArrayFragment {
            return None;
        }
        match self.body.as_slice() {
            [Stmt::Expr(Expr::Array(elements))] => Some(elements),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub is_generator: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<String>,
    pub superclass: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Method {
        key: PropKey,
        func: Function,
        is_static: bool,
    },
    Field {
        key: PropKey,
        value: Option<Expr>,
        is_static: bool,
    },
    StaticBlock(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    Var(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// One `name` or `name as alias` entry in an import/export list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpecifier {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Function(Function),
    Class(Class),
    Expr(Expr),
    Block(Vec<Stmt>),
    Empty,
    Return(Option<Expr>),
    Throw(Expr),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    For {
        init: Option<ForHead>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForInOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        is_of: bool,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Import {
        source: String,
        default: Option<String>,
        namespace: Option<String>,
        named: Vec<ModuleSpecifier>,
    },
    ExportDecl(Box<Stmt>),
    ExportDefault(Expr),
    ExportNamed {
        specifiers: Vec<ModuleSpecifier>,
        source: Option<String>,
    },
    ExportAll {
        source: String,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(String),
    Computed(Box<Expr>),
}

impl PropKey {
    /// Statically known property name, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            PropKey::Ident(s) | PropKey::Str(s) | PropKey::Num(s) => Some(s),
            PropKey::Computed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue { key: PropKey, value: Expr },
    Shorthand(String),
    Method { key: PropKey, func: Function },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Ident(String),
    Computed(Box<Expr>),
}

/// String-literal payload: decoded value plus the source text with its quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    pub value: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Str(StrLit),
    Num(String),
    Bool(bool),
    Null,
    Regex(String),
    /// Template literal source text, backticks included; `cooked` is set when
    /// it has no substitutions
    Template {
        raw: String,
        cooked: Option<String>,
    },
    TaggedTemplate {
        tag: Box<Expr>,
        raw: String,
    },
    Array(Vec<Option<Expr>>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Arrow(Box<Arrow>),
    Class(Box<Class>),
    Unary {
        op: String,
        arg: Box<Expr>,
    },
    Update {
        op: String,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Sequence(Vec<Expr>),
    Spread(Box<Expr>),
    Await(Box<Expr>),
    Yield {
        arg: Option<Box<Expr>>,
        delegate: bool,
    },
    Paren(Box<Expr>),
}

impl Expr {
    /// Strip any number of enclosing parentheses
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(inner) = expr {
            expr = inner;
        }
        expr
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternProp {
    KeyValue { key: PropKey, value: Pattern },
    Shorthand { name: String, default: Option<Expr> },
    Rest(Box<Pattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object(Vec<PatternProp>),
    Array(Vec<Option<Pattern>>),
    Rest(Box<Pattern>),
    Default(Box<Pattern>, Box<Expr>),
}

impl Pattern {
    /// The bound name when the pattern is a plain identifier (possibly defaulted)
    pub fn ident(&self) -> Option<&str> {
        match self {
            Pattern::Ident(name) => Some(name),
            Pattern::Default(inner, _) => inner.ident(),
            _ => None,
        }
    }
}
