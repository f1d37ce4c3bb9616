//! Statement tree for generated code
//!
//! Generated functions are built as a small tree of statements and rendered in
//! one pass, so indentation and braces never have to be tracked by hand.

use std::fmt::Write;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `let name = value;`
    Let { name: String, value: String },
    /// `expr;`
    Expr(String),
    /// `return expr;`
    Return(String),
    /// `if condition { body }`
    If { condition: String, body: Block },
    /// Trailing expression without a semicolon.
    Tail(String),
    Comment(String),
    Blank,
}

impl Stmt {
    pub fn let_(name: impl Into<String>, value: impl Into<String>) -> Self {
        Stmt::Let {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn expr(expr: impl Into<String>) -> Self {
        Stmt::Expr(expr.into())
    }

    pub fn ret(expr: impl Into<String>) -> Self {
        Stmt::Return(expr.into())
    }

    pub fn tail(expr: impl Into<String>) -> Self {
        Stmt::Tail(expr.into())
    }

    pub fn if_(condition: impl Into<String>, body: Block) -> Self {
        Stmt::If {
            condition: condition.into(),
            body,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block(pub Vec<Stmt>);

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.0.push(stmt);
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Stmt>) {
        self.0.extend(stmts);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Stmt> for Block {
    fn from_iter<I: IntoIterator<Item = Stmt>>(iter: I) -> Self {
        Block(iter.into_iter().collect())
    }
}

/// A function definition inside an `impl` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDef {
    pub visibility: Option<&'static str>,
    pub name: String,
    pub generics: Option<String>,
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub body: Block,
}

/// Accumulates rendered source text.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `header {` and indents.
    pub fn open(&mut self, header: &str) {
        self.open_with(&format!("{} {{", header));
    }

    /// Writes `text` verbatim and indents.
    pub fn open_with(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedents and writes `}`.
    pub fn close(&mut self) {
        self.close_with("}");
    }

    pub fn close_with(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, value } => self.line(&format!("let {} = {};", name, value)),
            Stmt::Expr(expr) => self.line(&format!("{};", expr)),
            Stmt::Return(expr) => self.line(&format!("return {};", expr)),
            Stmt::Tail(expr) => self.line(expr),
            Stmt::Comment(text) => self.line(&format!("// {}", text)),
            Stmt::Blank => self.blank(),
            Stmt::If { condition, body } => {
                self.open(&format!("if {}", condition));
                self.block(body);
                self.close();
            }
        }
    }

    pub fn block(&mut self, block: &Block) {
        for stmt in &block.0 {
            self.stmt(stmt);
        }
    }

    pub fn function(&mut self, def: &FnDef) {
        let mut header = String::new();
        if let Some(visibility) = def.visibility {
            header.push_str(visibility);
            header.push(' ');
        }
        let _ = write!(header, "fn {}", def.name);
        if let Some(generics) = &def.generics {
            let _ = write!(header, "<{}>", generics);
        }
        let _ = write!(header, "({})", def.params.join(", "));
        if let Some(return_type) = &def.return_type {
            let _ = write!(header, " -> {}", return_type);
        }
        self.open(&header);
        self.block(&def.body);
        self.close();
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested_if() {
        let mut writer = CodeWriter::new();
        writer.function(&FnDef {
            visibility: None,
            name: "run".to_string(),
            generics: Some("'js".to_string()),
            params: vec!["info: &CallInfo<'js>".to_string()],
            return_type: Some("BindingResult<Value<'js>>".to_string()),
            body: Block(vec![
                Stmt::if_(
                    "args.count() >= 1",
                    Block(vec![Stmt::ret("Ok(info.undefined())")]),
                ),
                Stmt::tail("Err(BindingError::MissingArguments)"),
            ]),
        });
        let expected = "\
fn run<'js>(info: &CallInfo<'js>) -> BindingResult<Value<'js>> {
    if args.count() >= 1 {
        return Ok(info.undefined());
    }
    Err(BindingError::MissingArguments)
}
";
        assert_eq!(writer.finish(), expected);
    }

    #[test]
    fn test_blank_lines_are_not_indented() {
        let mut writer = CodeWriter::new();
        writer.open("impl Foo");
        writer.stmt(&Stmt::Blank);
        writer.stmt(&Stmt::Comment("generated".to_string()));
        writer.close();
        assert_eq!(writer.finish(), "impl Foo {\n\n    // generated\n}\n");
    }
}
