//! Recursive-descent parser for the `http { server { location { } } }` grammar
//! (spec §6). Follows the donor's `ConfigParser` shape (cursor over a token
//! vector, `peek`/`consume`, a `ConfigError` carrying a `Loc` and a context
//! trace with colorized `Display`) even though the grammar underneath is new.

use std::fmt;

use crate::config::lexer::{Lexer, Loc, Token, TokenKind};
use crate::config::types::{Config, RouteConfig, ServerConfig};
use crate::http::Method;

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub loc: Option<Loc>,
    pub context: Vec<String>,
}

impl ConfigError {
    fn new(message: impl Into<String>, loc: Option<Loc>) -> Self {
        Self { message: message.into(), loc, context: Vec::new() }
    }

    fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc {
            Some(loc) => write!(f, "\x1b[31mconfig error\x1b[0m at {}: {}", loc, self.message)?,
            None => write!(f, "\x1b[31mconfig error\x1b[0m: {}", self.message)?,
        }
        for ctx in self.context.iter().rev() {
            write!(f, "\n  \x1b[38;5;244mwhile parsing {}\x1b[0m", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

pub type ParseResult<T> = Result<T, ConfigError>;

pub struct ConfigParser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl ConfigParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_loc(&self) -> Option<Loc> {
        self.peek().map(|t| t.loc)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.cursor).cloned();
        self.cursor += 1;
        tok
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::new(message, self.peek_loc())
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        match self.peek() {
            Some(t) if std::mem::discriminant(&t.kind) == std::mem::discriminant(&kind) => {
                Ok(self.advance().unwrap())
            }
            Some(t) => Err(self.error(format!("expected {:?}, found {}", kind, t.kind))),
            None => Err(self.error(format!("expected {:?}, found end of file", kind))),
        }
    }

    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        match self.peek() {
            Some(Token { kind: TokenKind::Word(w), .. }) if w == word => {
                self.advance();
                Ok(())
            }
            Some(t) => Err(self.error(format!("expected '{}', found {}", word, t.kind))),
            None => Err(self.error(format!("expected '{}', found end of file", word))),
        }
    }

    fn next_word(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token { kind: TokenKind::Word(w), .. }) => Ok(w),
            Some(t) => Err(self.error(format!("expected a word, found {}", t.kind))),
            None => Err(self.error("expected a word, found end of file")),
        }
    }

    fn next_value_string(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token { kind: TokenKind::Word(w), .. }) => Ok(w),
            Some(Token { kind: TokenKind::StringLit(s), .. }) => Ok(s),
            Some(Token { kind: TokenKind::Number(n), .. }) => Ok(n.to_string()),
            Some(t) => Err(self.error(format!("expected a value, found {}", t.kind))),
            None => Err(self.error("expected a value, found end of file")),
        }
    }

    fn next_number(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token { kind: TokenKind::Number(n), .. }) => Ok(n),
            Some(t) => Err(self.error(format!("expected a number, found {}", t.kind))),
            None => Err(self.error("expected a number, found end of file")),
        }
    }

    fn at_rbrace(&self) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::RBrace, .. }))
    }

    fn at_eof(&self) -> bool {
        self.peek().is_none()
    }

    pub fn parse(source: &str) -> ParseResult<Config> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(|e| ConfigError::new(e, None))?;
        let mut parser = ConfigParser::new(tokens);
        let config = parser.parse_config()?;
        if !parser.at_eof() {
            return Err(parser.error("unexpected trailing content after 'http' block"));
        }
        Ok(config)
    }

    fn parse_config(&mut self) -> ParseResult<Config> {
        self.expect_word("http").map_err(|e| e.with_context("top-level config"))?;
        self.expect(TokenKind::LBrace).map_err(|e| e.with_context("'http' block"))?;

        let mut servers = Vec::new();
        while !self.at_rbrace() {
            if self.at_eof() {
                return Err(self.error("unterminated 'http' block"));
            }
            self.expect_word("server").map_err(|e| e.with_context("'http' block"))?;
            servers.push(self.parse_server_block()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Config { servers })
    }

    fn parse_server_block(&mut self) -> ParseResult<ServerConfig> {
        self.expect(TokenKind::LBrace).map_err(|e| e.with_context("'server' block"))?;
        let mut server = ServerConfig { ports: Vec::new(), ..Default::default() };
        let mut explicit_ports = false;

        while !self.at_rbrace() {
            if self.at_eof() {
                return Err(self.error("unterminated 'server' block"));
            }
            let key = self.next_word().map_err(|e| e.with_context("'server' block"))?;
            match key.as_str() {
                "listen" => {
                    let port = self.next_number().map_err(|e| e.with_context("'listen' directive"))?;
                    server.ports.push(port as u16);
                    explicit_ports = true;
                    self.expect(TokenKind::Semicolon)?;
                }
                "host" => {
                    server.host = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "server_name" => {
                    server.server_name = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "default_server" => {
                    let v = self.next_value_string()?;
                    server.default_server = v == "on";
                    self.expect(TokenKind::Semicolon)?;
                }
                "error_page" => {
                    let code = self.next_number().map_err(|e| e.with_context("'error_page' directive"))?;
                    let path = self.next_value_string()?;
                    server.error_pages.insert(code as u16, path);
                    self.expect(TokenKind::Semicolon)?;
                }
                "client_max_body_size" => {
                    server.client_max_body_size = self.parse_byte_size()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "request_timeout" => {
                    server.ms_request_timeout = self.next_number()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "response_handling_timeout" => {
                    server.ms_response_handling_timeout = self.next_number()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "response_delivery_timeout" => {
                    server.ms_response_delivery_timeout = self.next_number()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "idle_timeout" => {
                    server.ms_idle_timeout = self.next_number()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "location" => {
                    let mut route = self.parse_location_block()?;
                    if route.cgi_path.is_empty() {
                        route.cgi_path = "/usr/bin/python3".to_string();
                    }
                    server.routes.push(route);
                }
                other => {
                    return Err(self.error(format!("unknown server directive '{}'", other)));
                }
            }
        }
        self.expect(TokenKind::RBrace)?;

        if !explicit_ports {
            server.ports = vec![crate::config::types::DEFAULT_PORT];
        }
        for route in server.routes.iter_mut() {
            if route.root == crate::config::types::DEFAULT_ROOT {
                // inherit nothing special; root stays per-location as parsed
            }
        }
        Ok(server)
    }

    fn parse_location_block(&mut self) -> ParseResult<RouteConfig> {
        let path = self.next_value_string().map_err(|e| e.with_context("'location' directive"))?;
        self.expect(TokenKind::LBrace).map_err(|e| e.with_context("'location' block"))?;

        let mut route = RouteConfig { path, methods: Vec::new(), ..Default::default() };
        let mut explicit_methods = false;

        while !self.at_rbrace() {
            if self.at_eof() {
                return Err(self.error("unterminated 'location' block"));
            }
            let key = self.next_word().map_err(|e| e.with_context("'location' block"))?;
            match key.as_str() {
                "root" => {
                    route.root = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "index" => {
                    route.default_file = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "upload_dir" => {
                    route.upload_dir = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "autoindex" => {
                    let v = self.next_value_string()?;
                    route.autoindex = match v.as_str() {
                        "on" => true,
                        "off" => false,
                        other => return Err(self.error(format!("'autoindex' expects on/off, found '{}'", other))),
                    };
                    self.expect(TokenKind::Semicolon)?;
                }
                "methods" => {
                    explicit_methods = true;
                    loop {
                        let m = self.next_value_string()?;
                        let method = m.parse::<Method>().map_err(|_| {
                            self.error(format!("unknown HTTP method '{}'", m))
                        })?;
                        route.methods.push(method);
                        if matches!(self.peek(), Some(Token { kind: TokenKind::Semicolon, .. })) {
                            break;
                        }
                    }
                    self.expect(TokenKind::Semicolon)?;
                }
                "cgi_extension" => {
                    loop {
                        let ext = self.next_value_string()?;
                        route.cgi_ext.push(ext);
                        if matches!(self.peek(), Some(Token { kind: TokenKind::Semicolon, .. })) {
                            break;
                        }
                    }
                    self.expect(TokenKind::Semicolon)?;
                }
                "cgi_path" => {
                    route.cgi_path = self.next_value_string()?;
                    self.expect(TokenKind::Semicolon)?;
                }
                "return" => {
                    let code = self.next_number().map_err(|e| e.with_context("'return' directive"))?;
                    let target = self.next_value_string()?;
                    route.redirect = Some((code as u16, target));
                    self.expect(TokenKind::Semicolon)?;
                }
                other => {
                    return Err(self.error(format!("unknown location directive '{}'", other)));
                }
            }
        }
        self.expect(TokenKind::RBrace)?;

        if !explicit_methods {
            route.methods = vec![Method::GET];
        }
        Ok(route)
    }

    fn parse_byte_size(&mut self) -> ParseResult<usize> {
        match self.advance() {
            Some(Token { kind: TokenKind::Number(n), .. }) => Ok(n as usize),
            Some(Token { kind: TokenKind::Word(w), .. }) => {
                let (digits, mult) = if let Some(d) = w.strip_suffix(['k', 'K']) {
                    (d, 1024usize)
                } else if let Some(d) = w.strip_suffix(['m', 'M']) {
                    (d, 1024 * 1024)
                } else {
                    (w.as_str(), 1)
                };
                let value: usize = digits
                    .parse()
                    .map_err(|_| self.error(format!("invalid byte size '{}'", w)))?;
                Ok(value * mult)
            }
            Some(t) => Err(self.error(format!("expected a byte size, found {}", t.kind))),
            None => Err(self.error("expected a byte size, found end of file")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_server() {
        let src = r#"
            http {
                server {
                    listen 8080;
                    host "127.0.0.1";
                    server_name "x";
                    location "/" {
                        root "./www";
                        index "index.html";
                        methods GET;
                    }
                }
            }
        "#;
        let config = ConfigParser::parse(src).unwrap();
        assert_eq!(config.servers.len(), 1);
        let s = &config.servers[0];
        assert_eq!(s.ports, vec![8080]);
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.routes.len(), 1);
        assert_eq!(s.routes[0].root, "./www");
        assert_eq!(s.routes[0].methods, vec![Method::GET]);
    }

    #[test]
    fn parses_byte_suffixes() {
        let src = r#"
            http { server { client_max_body_size 10M; } }
        "#;
        let config = ConfigParser::parse(src).unwrap();
        assert_eq!(config.servers[0].client_max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn parses_redirect_and_cgi() {
        let src = r#"
            http {
                server {
                    listen 80;
                    location "/old" {
                        return 301 "https://example.com/new";
                    }
                    location "/cgi-bin" {
                        root "./cgi-bin";
                        cgi_extension ".py";
                        methods GET POST;
                    }
                }
            }
        "#;
        let config = ConfigParser::parse(src).unwrap();
        let routes = &config.servers[0].routes;
        assert_eq!(routes[0].redirect, Some((301, "https://example.com/new".to_string())));
        assert!(routes[1].is_cgi_extension("py"));
        assert!(routes[1].allows(Method::POST));
    }

    #[test]
    fn rejects_unknown_directive() {
        let src = "http { server { bogus 1; } }";
        let err = ConfigParser::parse(src).unwrap_err();
        assert!(format!("{}", err).contains("unknown server directive"));
    }

    #[test]
    fn rejects_missing_brace() {
        let src = "http { server { listen 80; }";
        assert!(ConfigParser::parse(src).is_err());
    }
}
