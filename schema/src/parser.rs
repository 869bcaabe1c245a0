//! A recursive-descent parser from IDL text to a [`ThriftFileElement`].

use std::ops::Range;
use std::path::Path;

use crate::ast::{
    Annotations, BaseType, ConstDeclElement, ConstElement, ConstValueElement, Declaration,
    EnumElement, EnumMemberElement, FieldElement, FunctionElement, IncludeElement,
    NamespaceElement, Requiredness, ServiceElement, StructElement, StructKind, ThriftFileElement,
    TypeElement, TypedefElement,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::lexer::{self, Spanned, Token};
use crate::location::{FileId, LineIndex, Location};

/// Field ids must fit in a signed 16-bit integer and be positive.
pub const MAX_FIELD_ID: i64 = i16::MAX as i64;

type ParseResult<T> = Result<T, Diagnostic>;

/// Parses one IDL file.
///
/// Syntax errors in one definition do not stop the parse: the parser skips ahead to the next
/// top-level keyword and carries on, so that every error in the file is reported at once.
pub fn parse(
    file_id: FileId,
    path: &Path,
    source: &str,
) -> Result<ThriftFileElement, Vec<Diagnostic>> {
    let index = LineIndex::new(file_id, path, source);
    let mut parser = Parser::new(&index, source);
    let declarations = parser.parse_declarations();
    if parser.errors.is_empty() {
        Ok(ThriftFileElement {
            location: index.location(0..0),
            declarations,
        })
    } else {
        Err(parser.errors)
    }
}

struct Parser<'a, 'source> {
    index: &'a LineIndex,
    tokens: Vec<Spanned<'source>>,
    /// Comments directly preceding token `i`.
    leading_docs: Vec<Option<String>>,
    /// A comment starting on the same line right after token `i`.
    trailing_docs: Vec<Option<String>>,
    position: usize,
    eof: Range<usize>,
    errors: Vec<Diagnostic>,
}

impl<'a, 'source> Parser<'a, 'source> {
    fn new(index: &'a LineIndex, source: &'source str) -> Self {
        let mut tokens = Vec::new();
        let mut leading_docs = Vec::new();
        let mut trailing_docs: Vec<Option<String>> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut previous_line = None;

        for (token, span) in lexer::tokenize(source) {
            match token {
                Token::LineComment(text) | Token::BlockComment(text) => {
                    let line = index.location(span.clone()).line;
                    let text = lexer::comment_text(text);
                    if previous_line == Some(line) && pending.is_empty() {
                        if let Some(slot) = trailing_docs.last_mut() {
                            append_doc(slot, text);
                            continue;
                        }
                    }
                    if !text.is_empty() {
                        pending.push(text);
                    }
                }
                token => {
                    previous_line = Some(index.location(span.end.saturating_sub(1)..span.end).line);
                    let doc = (!pending.is_empty()).then(|| pending.join("\n"));
                    pending.clear();
                    tokens.push((token, span));
                    leading_docs.push(doc);
                    trailing_docs.push(None);
                }
            }
        }

        Self {
            index,
            tokens,
            leading_docs,
            trailing_docs,
            position: 0,
            eof: source.len()..source.len(),
            errors: Vec::new(),
        }
    }

    // --- Token helpers ---

    fn peek(&self) -> Option<&Token<'source>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token<'source>> {
        self.tokens.get(self.position + n).map(|(token, _)| token)
    }

    fn current_span(&self) -> Range<usize> {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| self.eof.clone())
    }

    fn location(&self) -> Location {
        self.index.location(self.current_span())
    }

    fn advance(&mut self) -> Option<Token<'source>> {
        let token = self.tokens.get(self.position).map(|(token, _)| token.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.describe(),
            None => "end of file".to_owned(),
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::SyntaxError,
            format!("expected {expected}, found {}", self.found()),
            &self.location(),
        )
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.describe()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.position += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn eat_list_separator(&mut self) {
        if !self.eat(&Token::Comma) {
            self.eat(&Token::Semicolon);
        }
    }

    fn leading_doc(&self) -> Option<String> {
        self.leading_docs.get(self.position).cloned().flatten()
    }

    /// Appends the trailing comment of the previously consumed token, if any.
    fn with_trailing_doc(&self, doc: Option<String>) -> Option<String> {
        let trailing = self
            .position
            .checked_sub(1)
            .and_then(|previous| self.trailing_docs[previous].clone());
        match (doc, trailing) {
            (Some(mut doc), Some(trailing)) => {
                doc.push('\n');
                doc.push_str(&trailing);
                Some(doc)
            }
            (doc, trailing) => doc.or(trailing),
        }
    }

    fn is_at_top_level_keyword(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::KeywordInclude
                    | Token::KeywordCppInclude
                    | Token::KeywordNamespace
                    | Token::KeywordConst
                    | Token::KeywordTypedef
                    | Token::KeywordEnum
                    | Token::KeywordStruct
                    | Token::KeywordUnion
                    | Token::KeywordException
                    | Token::KeywordService
            )
        )
    }

    fn recover(&mut self) {
        // Always make progress, even if the error was reported at a top-level keyword.
        self.advance();
        while self.peek().is_some() && !self.is_at_top_level_keyword() {
            self.advance();
        }
    }

    // --- Declarations ---

    fn parse_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while self.peek().is_some() {
            match self.parse_declaration() {
                Ok(declaration) => declarations.push(declaration),
                Err(error) => {
                    self.errors.push(error);
                    self.recover();
                }
            }
        }
        declarations
    }

    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let documentation = self.leading_doc();
        let location = self.location();
        let declaration = match self.peek() {
            Some(Token::KeywordInclude) | Some(Token::KeywordCppInclude) => {
                let is_cpp = self.advance() == Some(Token::KeywordCppInclude);
                let path = self.parse_literal("an include path")?;
                Declaration::Include(IncludeElement {
                    location,
                    path,
                    is_cpp,
                })
            }
            Some(Token::KeywordNamespace) => {
                self.advance();
                Declaration::Namespace(self.parse_namespace(location)?)
            }
            Some(Token::KeywordConst) => {
                self.advance();
                Declaration::Const(self.parse_const(location, documentation)?)
            }
            Some(Token::KeywordTypedef) => {
                self.advance();
                Declaration::Typedef(self.parse_typedef(location, documentation)?)
            }
            Some(Token::KeywordEnum) => {
                self.advance();
                Declaration::Enum(self.parse_enum(location, documentation)?)
            }
            Some(Token::KeywordStruct) => {
                self.advance();
                Declaration::Struct(self.parse_struct(StructKind::Struct, location, documentation)?)
            }
            Some(Token::KeywordUnion) => {
                self.advance();
                Declaration::Union(self.parse_struct(StructKind::Union, location, documentation)?)
            }
            Some(Token::KeywordException) => {
                self.advance();
                Declaration::Exception(self.parse_struct(
                    StructKind::Exception,
                    location,
                    documentation,
                )?)
            }
            Some(Token::KeywordService) => {
                self.advance();
                Declaration::Service(self.parse_service(location, documentation)?)
            }
            _ => return Err(self.unexpected("a definition")),
        };
        self.eat_list_separator();
        Ok(declaration)
    }

    fn parse_literal(&mut self, what: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Literal(text)) => {
                let text = unescape(text);
                self.position += 1;
                Ok(text)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn parse_namespace(&mut self, location: Location) -> ParseResult<NamespaceElement> {
        let scope = match self.peek() {
            Some(Token::Star) => "*".to_owned(),
            Some(token) => match token.as_name() {
                Some(name) => name.to_owned(),
                None => return Err(self.unexpected("a namespace scope")),
            },
            None => return Err(self.unexpected("a namespace scope")),
        };
        self.advance();
        let namespace = match self.peek() {
            Some(Token::Identifier(name)) | Some(Token::Literal(name)) => name.to_string(),
            _ => return Err(self.unexpected("a namespace")),
        };
        self.advance();
        self.parse_annotations()?;
        Ok(NamespaceElement {
            location,
            scope,
            namespace,
        })
    }

    fn parse_const(
        &mut self,
        location: Location,
        documentation: Option<String>,
    ) -> ParseResult<ConstDeclElement> {
        let const_type = self.parse_field_type()?;
        let name = self.expect_identifier("a constant name")?;
        self.expect(&Token::Equals)?;
        let value = self.parse_const_value()?;
        Ok(ConstDeclElement {
            location,
            documentation,
            const_type,
            name,
            value,
        })
    }

    fn parse_typedef(
        &mut self,
        location: Location,
        documentation: Option<String>,
    ) -> ParseResult<TypedefElement> {
        let old_type = self.parse_field_type()?;
        let new_name = self.expect_identifier("a typedef name")?;
        let annotations = self.parse_annotations()?;
        Ok(TypedefElement {
            location,
            documentation,
            old_type,
            new_name,
            annotations,
        })
    }

    fn parse_enum(
        &mut self,
        location: Location,
        documentation: Option<String>,
    ) -> ParseResult<EnumElement> {
        let name = self.expect_identifier("an enum name")?;
        self.expect(&Token::OpenBrace)?;
        let mut members = Vec::new();
        while !self.eat(&Token::CloseBrace) {
            let documentation = self.leading_doc();
            let location = self.location();
            let name = self.expect_identifier("an enum member or `}`")?;
            let value = if self.eat(&Token::Equals) {
                Some(self.parse_integer("an enum value")?)
            } else {
                None
            };
            let annotations = self.parse_annotations()?;
            self.eat_list_separator();
            members.push(EnumMemberElement {
                location,
                documentation: self.with_trailing_doc(documentation),
                name,
                value,
                annotations,
            });
        }
        let annotations = self.parse_annotations()?;
        Ok(EnumElement {
            location,
            documentation,
            name,
            members,
            annotations,
        })
    }

    fn parse_struct(
        &mut self,
        kind: StructKind,
        location: Location,
        documentation: Option<String>,
    ) -> ParseResult<StructElement> {
        let name = self.expect_identifier(&format!("a {} name", kind.keyword()))?;
        // Legacy `xsd_all` marker.
        if self.peek() == Some(&Token::Identifier("xsd_all")) {
            self.advance();
        }
        self.expect(&Token::OpenBrace)?;
        let fields = self.parse_fields(&Token::CloseBrace)?;
        let annotations = self.parse_annotations()?;
        Ok(StructElement {
            location,
            documentation,
            kind,
            name,
            fields,
            annotations,
        })
    }

    fn parse_service(
        &mut self,
        location: Location,
        documentation: Option<String>,
    ) -> ParseResult<ServiceElement> {
        let name = self.expect_identifier("a service name")?;
        let extends = if self.eat(&Token::KeywordExtends) {
            let location = self.location();
            let name = self.expect_identifier("a service name")?;
            Some(TypeElement::Named {
                name,
                location,
                annotations: Annotations::default(),
            })
        } else {
            None
        };
        self.expect(&Token::OpenBrace)?;
        let mut functions = Vec::new();
        while !self.eat(&Token::CloseBrace) {
            functions.push(self.parse_function()?);
        }
        let annotations = self.parse_annotations()?;
        Ok(ServiceElement {
            location,
            documentation,
            name,
            extends,
            functions,
            annotations,
        })
    }

    fn parse_function(&mut self) -> ParseResult<FunctionElement> {
        let documentation = self.leading_doc();
        let location = self.location();
        let oneway = self.eat(&Token::KeywordOneway);
        let return_type = if self.eat(&Token::KeywordVoid) {
            None
        } else {
            Some(self.parse_field_type()?)
        };
        let name = self.expect_identifier("a method name")?;
        self.expect(&Token::OpenParen)?;
        let params = self.parse_fields(&Token::CloseParen)?;
        let exceptions = if self.eat(&Token::KeywordThrows) {
            self.expect(&Token::OpenParen)?;
            self.parse_fields(&Token::CloseParen)?
        } else {
            Vec::new()
        };
        let annotations = self.parse_annotations()?;
        self.eat_list_separator();
        Ok(FunctionElement {
            location,
            documentation: self.with_trailing_doc(documentation),
            oneway,
            return_type,
            name,
            params,
            exceptions,
            annotations,
        })
    }

    /// Parses fields up to and including `close`.
    fn parse_fields(&mut self, close: &Token) -> ParseResult<Vec<FieldElement>> {
        let mut fields = Vec::new();
        let mut last_id = 0;
        while !self.eat(close) {
            let field = self.parse_field(last_id + 1)?;
            last_id = last_id.max(field.id);
            fields.push(field);
        }
        Ok(fields)
    }

    fn parse_field(&mut self, implicit_id: i32) -> ParseResult<FieldElement> {
        let documentation = self.leading_doc();
        let location = self.location();

        let (id, explicit_id) = if matches!(self.peek(), Some(Token::IntConstant(_)))
            && self.peek_nth(1) == Some(&Token::Colon)
        {
            let id_location = self.location();
            let id = self.parse_integer("a field id")?;
            self.expect(&Token::Colon)?;
            if !(1..=MAX_FIELD_ID).contains(&id) {
                // Not fatal for the rest of the file; the linker never sees this program.
                self.errors.push(Diagnostic::new(
                    DiagnosticKind::InvalidFieldId,
                    format!("field id {id} is out of range; ids must be between 1 and {MAX_FIELD_ID}"),
                    &id_location,
                ));
            }
            (id.clamp(i32::MIN as i64, i32::MAX as i64) as i32, true)
        } else {
            (implicit_id, false)
        };

        let requiredness = if self.eat(&Token::KeywordRequired) {
            Requiredness::Required
        } else if self.eat(&Token::KeywordOptional) {
            Requiredness::Optional
        } else {
            Requiredness::Default
        };

        let field_type = self.parse_field_type()?;
        let name = self.expect_identifier("a field name")?;
        let default_value = if self.eat(&Token::Equals) {
            Some(self.parse_const_value()?)
        } else {
            None
        };
        let annotations = self.parse_annotations()?;
        self.eat_list_separator();

        Ok(FieldElement {
            location,
            documentation: self.with_trailing_doc(documentation),
            id,
            explicit_id,
            requiredness,
            field_type,
            name,
            default_value,
            annotations,
        })
    }

    // --- Types ---

    fn parse_field_type(&mut self) -> ParseResult<TypeElement> {
        let location = self.location();
        let base = match self.peek() {
            Some(Token::KeywordBool) => Some(BaseType::Bool),
            Some(Token::KeywordByte) => Some(BaseType::Byte),
            Some(Token::KeywordI8) => Some(BaseType::I8),
            Some(Token::KeywordI16) => Some(BaseType::I16),
            Some(Token::KeywordI32) => Some(BaseType::I32),
            Some(Token::KeywordI64) => Some(BaseType::I64),
            Some(Token::KeywordDouble) => Some(BaseType::Double),
            Some(Token::KeywordString) => Some(BaseType::String),
            Some(Token::KeywordBinary) => Some(BaseType::Binary),
            _ => None,
        };

        if let Some(base) = base {
            self.advance();
            let annotations = self.parse_annotations()?;
            return Ok(TypeElement::Base {
                base,
                location,
                annotations,
            });
        }

        match self.peek() {
            Some(Token::KeywordList) => {
                self.advance();
                self.expect(&Token::Less)?;
                let element = Box::new(self.parse_field_type()?);
                self.expect(&Token::Greater)?;
                let annotations = self.parse_annotations()?;
                Ok(TypeElement::List {
                    element,
                    location,
                    annotations,
                })
            }
            Some(Token::KeywordSet) => {
                self.advance();
                self.expect(&Token::Less)?;
                let element = Box::new(self.parse_field_type()?);
                self.expect(&Token::Greater)?;
                let annotations = self.parse_annotations()?;
                Ok(TypeElement::Set {
                    element,
                    location,
                    annotations,
                })
            }
            Some(Token::KeywordMap) => {
                self.advance();
                self.expect(&Token::Less)?;
                let key = Box::new(self.parse_field_type()?);
                self.expect(&Token::Comma)?;
                let value = Box::new(self.parse_field_type()?);
                self.expect(&Token::Greater)?;
                let annotations = self.parse_annotations()?;
                Ok(TypeElement::Map {
                    key,
                    value,
                    location,
                    annotations,
                })
            }
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.advance();
                let annotations = self.parse_annotations()?;
                Ok(TypeElement::Named {
                    name,
                    location,
                    annotations,
                })
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    fn parse_annotations(&mut self) -> ParseResult<Annotations> {
        let mut annotations = Vec::new();
        if self.peek() != Some(&Token::OpenParen) {
            return Ok(Annotations::default());
        }
        self.advance();
        while !self.eat(&Token::CloseParen) {
            let key = match self.peek().and_then(Token::as_name) {
                Some(key) => key.to_owned(),
                None => return Err(self.unexpected("an annotation name or `)`")),
            };
            self.advance();
            let value = if self.eat(&Token::Equals) {
                let value = match self.peek() {
                    Some(Token::Literal(text)) => unescape(text),
                    Some(Token::IntConstant(text)) | Some(Token::Identifier(text)) => {
                        text.to_string()
                    }
                    _ => return Err(self.unexpected("an annotation value")),
                };
                self.advance();
                Some(value)
            } else {
                None
            };
            self.eat_list_separator();
            annotations.push((key, value));
        }
        Ok(Annotations(annotations))
    }

    // --- Constants ---

    fn parse_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.peek() {
            Some(Token::IntConstant(text)) => {
                let value = parse_int(text).ok_or_else(|| {
                    Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        format!("integer `{text}` does not fit in 64 bits"),
                        &self.location(),
                    )
                })?;
                self.position += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn parse_const_value(&mut self) -> ParseResult<ConstElement> {
        let location = self.location();
        let value = match self.peek() {
            Some(Token::IntConstant(_)) => ConstValueElement::Integer(self.parse_integer("")?),
            Some(Token::DoubleConstant(text)) => {
                let value = text.parse::<f64>().map_err(|_| {
                    Diagnostic::new(
                        DiagnosticKind::SyntaxError,
                        format!("invalid double `{text}`"),
                        &location,
                    )
                })?;
                self.advance();
                ConstValueElement::Double(value)
            }
            Some(Token::Literal(_)) => ConstValueElement::Literal(self.parse_literal("")?),
            Some(Token::KeywordTrue) => {
                self.advance();
                ConstValueElement::Bool(true)
            }
            Some(Token::KeywordFalse) => {
                self.advance();
                ConstValueElement::Bool(false)
            }
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.advance();
                ConstValueElement::Identifier(name)
            }
            Some(Token::OpenBracket) => {
                self.advance();
                let mut elements = Vec::new();
                while !self.eat(&Token::CloseBracket) {
                    elements.push(self.parse_const_value()?);
                    self.eat_list_separator();
                }
                ConstValueElement::List(elements)
            }
            Some(Token::OpenBrace) => {
                self.advance();
                let mut entries = Vec::new();
                while !self.eat(&Token::CloseBrace) {
                    let key = self.parse_const_value()?;
                    self.expect(&Token::Colon)?;
                    let value = self.parse_const_value()?;
                    self.eat_list_separator();
                    entries.push((key, value));
                }
                ConstValueElement::Map(entries)
            }
            _ => return Err(self.unexpected("a constant value")),
        };
        Ok(ConstElement { value, location })
    }
}

fn append_doc(slot: &mut Option<String>, text: String) {
    match slot {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(&text);
        }
        None => *slot = Some(text),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
