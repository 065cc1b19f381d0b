use crate::types::JsString;

/// Syntax tree consumed by the evaluator. One node kind per evaluation
/// contract; string data is kept as UTF-16 so escape sequences with lone
/// surrogates survive parsing.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    Script,
    Module,
}

#[derive(Clone, Debug)]
pub struct Program {
    pub kind: ProgramKind,
    pub body: Vec<Statement>,
    pub strict: bool,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(VariableDeclaration),
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    While {
        test: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        test: Expression,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },
    ForIn {
        left: ForHead,
        right: Expression,
        body: Box<Statement>,
    },
    ForOf {
        left: ForHead,
        right: Expression,
        body: Box<Statement>,
        is_await: bool,
    },
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expression),
    Try {
        block: Vec<Statement>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Statement>>,
    },
    Switch {
        discriminant: Expression,
        cases: Vec<SwitchCase>,
    },
    Labeled(String, Box<Statement>),
    With(Expression, Box<Statement>),
    Debugger,
    FunctionDeclaration(FunctionNode),
    ClassDeclaration(ClassNode),
    // Module-only items; the parser rejects them elsewhere.
    Import(ImportDeclaration),
    Export(ExportDeclaration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

impl DeclarationKind {
    pub fn is_lexical(self) -> bool {
        !matches!(self, DeclarationKind::Var)
    }
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub kind: DeclarationKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Clone, Debug)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Declaration(VariableDeclaration),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub enum ForHead {
    Declaration(DeclarationKind, Pattern),
    /// Assignment-style head: identifier, member expression, or a
    /// destructuring target reinterpreted as a pattern.
    Assign(Pattern),
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
}

/// Binding targets for declarations, parameters, and destructuring
/// assignment. `Default` wraps another pattern with an initializer;
/// `Rest` collects the remainder.
#[derive(Clone, Debug)]
pub enum Pattern {
    Identifier(String),
    Array(Vec<Option<Pattern>>),
    Object {
        properties: Vec<ObjectPatternProperty>,
        rest: Option<Box<Pattern>>,
    },
    Default(Box<Pattern>, Box<Expression>),
    Rest(Box<Pattern>),
    // Destructuring assignment can target member expressions.
    Member(Box<Expression>),
}

#[derive(Clone, Debug)]
pub struct ObjectPatternProperty {
    pub key: PropName,
    pub value: Pattern,
    pub shorthand: bool,
}

#[derive(Clone, Debug)]
pub enum PropName {
    Ident(String),
    Str(JsString),
    Num(f64),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectProperty>),
    Function(FunctionNode),
    Class(ClassNode),
    Template(TemplateLiteral),
    TaggedTemplate(Box<Expression>, TemplateLiteral),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expression>,
    },
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    /// Destructuring assignment: `[a, b] = rhs`, `({x} = rhs)`.
    AssignPattern(Box<Pattern>, Box<Expression>),
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Argument>,
        optional: bool,
    },
    New {
        callee: Box<Expression>,
        args: Vec<Argument>,
    },
    Member {
        object: Box<Expression>,
        property: MemberKey,
        optional: bool,
    },
    /// Root of an `?.` chain; nullish short-circuit stops here.
    OptionalChain(Box<Expression>),
    SuperProperty(MemberKey),
    SuperCall(Vec<Argument>),
    NewTarget,
    Sequence(Vec<Expression>),
    Yield {
        argument: Option<Box<Expression>>,
        delegate: bool,
    },
    Await(Box<Expression>),
    /// Dynamic `import(specifier)`.
    ImportCall(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum ArrayElement {
    Elision,
    Item(Expression),
    Spread(Expression),
}

#[derive(Clone, Debug)]
pub enum Argument {
    Item(Expression),
    Spread(Expression),
}

#[derive(Clone, Debug)]
pub enum MemberKey {
    Ident(String),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum ObjectProperty {
    /// `key: value`, shorthand `{ x }`, or a method definition.
    Init {
        key: PropName,
        value: Expression,
    },
    Method {
        key: PropName,
        func: FunctionNode,
    },
    Accessor {
        key: PropName,
        kind: AccessorKind,
        func: FunctionNode,
    },
    Spread(Expression),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(num_bigint::BigInt),
    /// Pattern and flags. The engine materialises an inert RegExp-classed
    /// object; matching semantics are outside the built-in surface.
    RegExp(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    LooseEq,
    LooseNotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    InstanceOf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Nullish,
}

#[derive(Clone, Debug)]
pub struct TemplateLiteral {
    /// Cooked strings; `None` marks an invalid escape (legal only in
    /// tagged templates).
    pub cooked: Vec<Option<JsString>>,
    pub raw: Vec<JsString>,
    pub expressions: Vec<Expression>,
    /// Parse-site identity for the realm's template object cache.
    pub site: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Generator,
    Async,
    AsyncGenerator,
    Arrow,
    AsyncArrow,
    Method,
    Getter,
    Setter,
    ClassConstructor,
}

impl FunctionKind {
    pub fn is_arrow(self) -> bool {
        matches!(self, FunctionKind::Arrow | FunctionKind::AsyncArrow)
    }

    pub fn is_generator(self) -> bool {
        matches!(self, FunctionKind::Generator | FunctionKind::AsyncGenerator)
    }

    pub fn is_async(self) -> bool {
        matches!(
            self,
            FunctionKind::Async | FunctionKind::AsyncGenerator | FunctionKind::AsyncArrow
        )
    }
}

#[derive(Clone, Debug)]
pub enum FunctionBody {
    Block(Vec<Statement>),
    /// Arrow concise body.
    Expression(Box<Expression>),
}

impl FunctionBody {
    pub fn statements(&self) -> &[Statement] {
        match self {
            FunctionBody::Block(stmts) => stmts,
            FunctionBody::Expression(_) => &[],
        }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    pub strict: bool,
}

#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: Option<String>,
    pub heritage: Option<Box<Expression>>,
    pub elements: Vec<ClassElement>,
}

#[derive(Clone, Debug)]
pub enum ClassElement {
    Method {
        key: PropName,
        kind: MethodKind,
        func: FunctionNode,
        is_static: bool,
    },
    /// Gated behind the `class-fields` feature flag.
    Field {
        key: PropName,
        value: Option<Expression>,
        is_static: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

#[derive(Clone, Debug)]
pub struct ImportDeclaration {
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Clone, Debug)]
pub enum ImportBinding {
    /// `import d from "m"`: the export named "default".
    Default(String),
    /// `import { a as b } from "m"`.
    Named { import: String, local: String },
    /// `import * as ns from "m"`.
    Namespace(String),
}

#[derive(Clone, Debug)]
pub enum ExportDeclaration {
    /// `export { a as b }` or `export { a as b } from "m"`.
    Named {
        entries: Vec<ExportEntryNode>,
        from: Option<String>,
    },
    /// `export *` / `export * as ns from "m"`.
    Star {
        alias: Option<String>,
        from: String,
    },
    /// `export <declaration>`.
    Declaration(Box<Statement>),
    /// `export default <expr or declaration>`.
    Default(Box<Statement>),
}

#[derive(Clone, Debug)]
pub struct ExportEntryNode {
    pub local: String,
    pub exported: String,
}

impl Expression {
    /// True for function and class expressions with no binding name;
    /// these pick up the name of the binding they initialise (§14.1 and
    /// friends, NamedEvaluation).
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.name.is_none(),
            Expression::Class(c) => c.name.is_none(),
            _ => false,
        }
    }
}

impl Pattern {
    /// Collect every identifier the pattern binds, in source order.
    /// BoundNames in the spec's static semantics.
    pub fn bound_names(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Identifier(name) => out.push(name.clone()),
            Pattern::Array(elements) => {
                for p in elements.iter().flatten() {
                    p.bound_names(out);
                }
            }
            Pattern::Object { properties, rest } => {
                for prop in properties {
                    prop.value.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Default(inner, _) | Pattern::Rest(inner) => inner.bound_names(out),
            Pattern::Member(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_names_cover_nested_patterns() {
        let pat = Pattern::Array(vec![
            Some(Pattern::Identifier("a".into())),
            None,
            Some(Pattern::Object {
                properties: vec![ObjectPatternProperty {
                    key: PropName::Ident("b".into()),
                    value: Pattern::Default(
                        Box::new(Pattern::Identifier("c".into())),
                        Box::new(Expression::Literal(Literal::Number(1.0))),
                    ),
                    shorthand: false,
                }],
                rest: Some(Box::new(Pattern::Identifier("d".into()))),
            }),
            Some(Pattern::Rest(Box::new(Pattern::Identifier("e".into())))),
        ]);
        let mut names = Vec::new();
        pat.bound_names(&mut names);
        assert_eq!(names, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn anonymous_function_definitions() {
        let anon = Expression::Function(FunctionNode {
            name: None,
            params: vec![],
            body: FunctionBody::Block(vec![]),
            kind: FunctionKind::Normal,
            strict: false,
        });
        assert!(anon.is_anonymous_function_definition());
        assert!(!Expression::This.is_anonymous_function_definition());
    }
}
