use super::*;

impl Parser {
    pub(super) fn parse_import_declaration(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Import)?;

        // Side-effect import: `import "m";`
        if let Token::Str { value, .. } = &self.current.token {
            let specifier = value.to_rust_string();
            self.advance()?;
            self.semicolon()?;
            return Ok(Statement::Import(ImportDeclaration {
                specifier,
                bindings: Vec::new(),
            }));
        }

        let mut bindings = Vec::new();

        if let Some(name) = self.identifier_reference() {
            // Default binding, optionally followed by more clauses.
            self.advance()?;
            bindings.push(ImportBinding::Default(name));
            if self.eat_punct(Punct::Comma)? {
                if self.eat_punct(Punct::Star)? {
                    bindings.push(self.parse_namespace_import()?);
                } else {
                    self.parse_named_imports(&mut bindings)?;
                }
            }
        } else if self.eat_punct(Punct::Star)? {
            bindings.push(self.parse_namespace_import()?);
        } else if self.is_punct(Punct::LBrace) {
            self.parse_named_imports(&mut bindings)?;
        } else {
            return Err(self.error("Expected import bindings"));
        }

        self.expect_from()?;
        let specifier = self.parse_module_specifier()?;
        self.semicolon()?;
        Ok(Statement::Import(ImportDeclaration {
            specifier,
            bindings,
        }))
    }

    fn parse_namespace_import(&mut self) -> Result<ImportBinding, ParseError> {
        self.expect_as()?;
        let local = self.parse_binding_identifier()?;
        Ok(ImportBinding::Namespace(local))
    }

    fn parse_named_imports(&mut self, out: &mut Vec<ImportBinding>) -> Result<(), ParseError> {
        self.expect_punct(Punct::LBrace)?;
        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            let import = self
                .identifier_name()
                .ok_or_else(|| self.error("Expected import name"))?;
            self.advance()?;
            let local = if self.is_as() {
                self.advance()?;
                self.parse_binding_identifier()?
            } else {
                import.clone()
            };
            out.push(ImportBinding::Named { import, local });
            if !self.is_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(())
    }

    pub(super) fn parse_export_declaration(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Export)?;

        // `export default ...`
        if self.eat_keyword(Keyword::Default)? {
            let stmt = if self.is_keyword(Keyword::Function)
                || (self.is_keyword(Keyword::Async) && self.async_starts_function())
            {
                let base = if self.eat_keyword(Keyword::Async)? {
                    FunctionKind::Async
                } else {
                    FunctionKind::Normal
                };
                let func = self.parse_function(base, false)?;
                Statement::FunctionDeclaration(func)
            } else if self.is_keyword(Keyword::Class) {
                let class = self.parse_class()?;
                Statement::ClassDeclaration(class)
            } else {
                let expr = self.parse_assignment_expression()?;
                self.semicolon()?;
                Statement::Expression(expr)
            };
            return Ok(Statement::Export(ExportDeclaration::Default(Box::new(
                stmt,
            ))));
        }

        // `export * [as name] from "m"`
        if self.eat_punct(Punct::Star)? {
            let alias = if self.is_as() {
                self.advance()?;
                let name = self
                    .identifier_name()
                    .ok_or_else(|| self.error("Expected export alias"))?;
                self.advance()?;
                Some(name)
            } else {
                None
            };
            self.expect_from()?;
            let from = self.parse_module_specifier()?;
            self.semicolon()?;
            return Ok(Statement::Export(ExportDeclaration::Star { alias, from }));
        }

        // `export { a, b as c } [from "m"]`
        if self.eat_punct(Punct::LBrace)? {
            let mut entries = Vec::new();
            loop {
                if self.eat_punct(Punct::RBrace)? {
                    break;
                }
                let local = self
                    .identifier_name()
                    .ok_or_else(|| self.error("Expected export name"))?;
                self.advance()?;
                let exported = if self.is_as() {
                    self.advance()?;
                    let name = self
                        .identifier_name()
                        .ok_or_else(|| self.error("Expected export alias"))?;
                    self.advance()?;
                    name
                } else {
                    local.clone()
                };
                entries.push(ExportEntryNode { local, exported });
                if !self.is_punct(Punct::RBrace) {
                    self.expect_punct(Punct::Comma)?;
                }
            }
            let from = if self.is_from() {
                self.advance()?;
                Some(self.parse_module_specifier()?)
            } else {
                None
            };
            self.semicolon()?;
            return Ok(Statement::Export(ExportDeclaration::Named { entries, from }));
        }

        // `export <declaration>`
        let async_function = self.is_keyword(Keyword::Async) && self.async_starts_function();
        let decl = match &self.current.token {
            Token::Keyword(Keyword::Var) => {
                let d = self.parse_variable_declaration(DeclarationKind::Var)?;
                self.semicolon()?;
                Statement::Variable(d)
            }
            Token::Keyword(Keyword::Let) => {
                let d = self.parse_variable_declaration(DeclarationKind::Let)?;
                self.semicolon()?;
                Statement::Variable(d)
            }
            Token::Keyword(Keyword::Const) => {
                let d = self.parse_variable_declaration(DeclarationKind::Const)?;
                self.semicolon()?;
                Statement::Variable(d)
            }
            Token::Keyword(Keyword::Function) => {
                Statement::FunctionDeclaration(self.parse_function(FunctionKind::Normal, true)?)
            }
            Token::Keyword(Keyword::Async) if async_function => {
                self.advance()?;
                Statement::FunctionDeclaration(self.parse_function(FunctionKind::Async, true)?)
            }
            Token::Keyword(Keyword::Class) => {
                let class = self.parse_class()?;
                if class.name.is_none() {
                    return Err(self.error("Exported class declarations require a name"));
                }
                Statement::ClassDeclaration(class)
            }
            other => {
                return Err(self.error(format!("Unexpected token {other:?} after 'export'")));
            }
        };
        Ok(Statement::Export(ExportDeclaration::Declaration(Box::new(
            decl,
        ))))
    }

    fn is_as(&self) -> bool {
        matches!(&self.current.token, Token::Ident(n) if n == "as")
    }

    fn is_from(&self) -> bool {
        matches!(&self.current.token, Token::Ident(n) if n == "from")
    }

    fn expect_as(&mut self) -> Result<(), ParseError> {
        if self.is_as() {
            self.advance()
        } else {
            Err(self.error("Expected 'as'"))
        }
    }

    fn expect_from(&mut self) -> Result<(), ParseError> {
        if self.is_from() {
            self.advance()
        } else {
            Err(self.error("Expected 'from'"))
        }
    }

    fn parse_module_specifier(&mut self) -> Result<String, ParseError> {
        match &self.current.token {
            Token::Str { value, .. } => {
                let s = value.to_rust_string();
                self.advance()?;
                Ok(s)
            }
            _ => Err(self.error("Module specifier must be a string literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_module, ParserOptions};
    use crate::ast::*;

    fn module(src: &str) -> Program {
        parse_module(src, ParserOptions::default()).expect("parse error")
    }

    #[test]
    fn import_forms() {
        let p = module(
            "import d from 'a';\n\
             import * as ns from 'b';\n\
             import { x, y as z } from 'c';\n\
             import d2, { w } from 'd';\n\
             import 'e';",
        );
        assert_eq!(p.body.len(), 5);
        match &p.body[2] {
            Statement::Import(decl) => {
                assert_eq!(decl.specifier, "c");
                assert_eq!(decl.bindings.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn export_forms() {
        let p = module(
            "export const x = 1;\n\
             export { x as y };\n\
             export * from 'm';\n\
             export default 42;\n\
             export function f() {}",
        );
        assert_eq!(p.body.len(), 5);
        assert!(matches!(
            &p.body[3],
            Statement::Export(ExportDeclaration::Default(_))
        ));
    }

    #[test]
    fn import_only_in_modules() {
        use super::super::parse_script;
        assert!(parse_script("import x from 'm';", ParserOptions::default()).is_err());
    }

    #[test]
    fn dynamic_import_allowed_in_modules() {
        let p = module("import('m');");
        assert!(matches!(
            &p.body[0],
            Statement::Expression(Expression::ImportCall(_))
        ));
    }
}
