use std::ops::Range;

use logos::Logos;

pub const KEYWORDS: &[&str] = &[
    "binary",
    "bool",
    "byte",
    "const",
    "cpp_include",
    "double",
    "enum",
    "exception",
    "extends",
    "false",
    "i16",
    "i32",
    "i64",
    "i8",
    "include",
    "list",
    "map",
    "namespace",
    "oneway",
    "optional",
    "required",
    "service",
    "set",
    "string",
    "struct",
    "throws",
    "true",
    "typedef",
    "union",
    "void",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|keyword| word == *keyword)
}

#[derive(Clone, Debug, PartialEq, Logos)]
pub enum Token<'source> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*")]
    Identifier(&'source str),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| &lex.slice()[1..(lex.slice().len() - 1)])]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| &lex.slice()[1..(lex.slice().len() - 1)])]
    Literal(&'source str),
    #[regex(r"[+-]?[0-9]+")]
    #[regex(r"[+-]?0[xX][0-9a-fA-F]+")]
    IntConstant(&'source str),
    #[regex(r"[+-]?[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[+-]?[0-9]+[eE][+-]?[0-9]+")]
    DoubleConstant(&'source str),

    #[regex(r"//[^\n]*")]
    #[regex(r"#[^\n]*")]
    LineComment(&'source str),
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment(&'source str),

    #[token("include")]
    KeywordInclude,
    #[token("cpp_include")]
    KeywordCppInclude,
    #[token("namespace")]
    KeywordNamespace,
    #[token("const")]
    KeywordConst,
    #[token("typedef")]
    KeywordTypedef,
    #[token("enum")]
    KeywordEnum,
    #[token("struct")]
    KeywordStruct,
    #[token("union")]
    KeywordUnion,
    #[token("exception")]
    KeywordException,
    #[token("service")]
    KeywordService,
    #[token("extends")]
    KeywordExtends,
    #[token("throws")]
    KeywordThrows,
    #[token("oneway")]
    KeywordOneway,
    #[token("void")]
    KeywordVoid,
    #[token("required")]
    KeywordRequired,
    #[token("optional")]
    KeywordOptional,
    #[token("true")]
    KeywordTrue,
    #[token("false")]
    KeywordFalse,
    #[token("list")]
    KeywordList,
    #[token("set")]
    KeywordSet,
    #[token("map")]
    KeywordMap,
    #[token("bool")]
    KeywordBool,
    #[token("byte")]
    KeywordByte,
    #[token("i8")]
    KeywordI8,
    #[token("i16")]
    KeywordI16,
    #[token("i32")]
    KeywordI32,
    #[token("i64")]
    KeywordI64,
    #[token("double")]
    KeywordDouble,
    #[token("string")]
    KeywordString,
    #[token("binary")]
    KeywordBinary,

    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("*")]
    Star,

    #[error]
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Error,
}

impl<'source> Token<'source> {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment(_) | Token::BlockComment(_))
    }

    /// A short human readable description, used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier `{name}`"),
            Token::Literal(text) => format!("string literal \"{text}\""),
            Token::IntConstant(text) => format!("integer `{text}`"),
            Token::DoubleConstant(text) => format!("double `{text}`"),
            Token::LineComment(_) | Token::BlockComment(_) => "comment".to_owned(),
            Token::Error => "invalid token".to_owned(),
            other => match other.keyword_or_symbol() {
                Some(text) => format!("`{text}`"),
                None => format!("{other:?}"),
            },
        }
    }

    fn keyword_or_symbol(&self) -> Option<&'static str> {
        Some(match self {
            Token::KeywordInclude => "include",
            Token::KeywordCppInclude => "cpp_include",
            Token::KeywordNamespace => "namespace",
            Token::KeywordConst => "const",
            Token::KeywordTypedef => "typedef",
            Token::KeywordEnum => "enum",
            Token::KeywordStruct => "struct",
            Token::KeywordUnion => "union",
            Token::KeywordException => "exception",
            Token::KeywordService => "service",
            Token::KeywordExtends => "extends",
            Token::KeywordThrows => "throws",
            Token::KeywordOneway => "oneway",
            Token::KeywordVoid => "void",
            Token::KeywordRequired => "required",
            Token::KeywordOptional => "optional",
            Token::KeywordTrue => "true",
            Token::KeywordFalse => "false",
            Token::KeywordList => "list",
            Token::KeywordSet => "set",
            Token::KeywordMap => "map",
            Token::KeywordBool => "bool",
            Token::KeywordByte => "byte",
            Token::KeywordI8 => "i8",
            Token::KeywordI16 => "i16",
            Token::KeywordI32 => "i32",
            Token::KeywordI64 => "i64",
            Token::KeywordDouble => "double",
            Token::KeywordString => "string",
            Token::KeywordBinary => "binary",
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::OpenBracket => "[",
            Token::CloseBracket => "]",
            Token::Less => "<",
            Token::Greater => ">",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Equals => "=",
            Token::Star => "*",
            _ => return None,
        })
    }

    /// Keywords that may still appear where the grammar expects a plain name, e.g. a
    /// namespace scope (`namespace set ...` is unusual but legal in some dialects).
    pub fn as_name(&self) -> Option<&'source str> {
        match self {
            Token::Identifier(name) => Some(name),
            other => other.keyword_or_symbol().filter(|text| is_keyword(text)),
        }
    }
}

pub type Spanned<'source> = (Token<'source>, Range<usize>);

/// Splits `source` into tokens, including comment tokens.
pub fn tokenize(source: &str) -> Vec<Spanned<'_>> {
    Token::lexer(source).spanned().collect()
}

/// Strips comment markers from the text of a comment token.
pub fn comment_text(comment: &str) -> String {
    if let Some(body) = comment.strip_prefix("/*") {
        let body = body.strip_suffix("*/").unwrap_or(body);
        let body = body.strip_prefix('*').unwrap_or(body);
        body.lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix('*').map(str::trim_start).unwrap_or(line)
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_owned()
    } else if let Some(body) = comment.strip_prefix("//") {
        body.trim_start_matches('/').trim().to_owned()
    } else {
        comment.trim_start_matches('#').trim().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        tokenize(source).into_iter().map(|(token, _)| token).collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            tokens("struct structure"),
            vec![Token::KeywordStruct, Token::Identifier("structure")]
        );
    }

    #[test]
    fn qualified_identifiers_are_single_tokens() {
        assert_eq!(
            tokens("shared.Foo Foo.BAR"),
            vec![Token::Identifier("shared.Foo"), Token::Identifier("Foo.BAR")]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            tokens("10 -3 0x1F 1.5 -2e3"),
            vec![
                Token::IntConstant("10"),
                Token::IntConstant("-3"),
                Token::IntConstant("0x1F"),
                Token::DoubleConstant("1.5"),
                Token::DoubleConstant("-2e3"),
            ]
        );
    }

    #[test]
    fn string_literals_drop_quotes() {
        assert_eq!(
            tokens(r#""bar" 'baz'"#),
            vec![Token::Literal("bar"), Token::Literal("baz")]
        );
    }

    #[test]
    fn comments_are_kept() {
        let tokens = tokens("// a\n# b\n/** c */ enum");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[..3].iter().all(Token::is_comment));
        assert_eq!(tokens[3], Token::KeywordEnum);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        assert!(tokens("/* never closed").contains(&Token::Error));
    }

    #[test]
    fn comment_text_strips_markers() {
        assert_eq!(comment_text("/** Represents\n * a build */"), "Represents\na build");
        assert_eq!(comment_text("/// hello"), "hello");
        assert_eq!(comment_text("# hash"), "hash");
    }
}
