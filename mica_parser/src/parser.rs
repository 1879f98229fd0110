//! Line-oriented IL parser
//!
//! Grammar, per line: a label (`@name:`), an instruction, a comment
//! (`; …`), or metadata (`;#!`, `;@!`, `;%!` for CFG / block /
//! instruction scope). Instruction metadata attaches to the most
//! recent instruction until another instruction or a label intervenes;
//! a label discards pending attachment. Surface comparisons `>` and
//! `>=` normalize to `<` / `<=` with swapped operands. Anonymous
//! blocks are rejected: code before the first label, or after a
//! terminator without a fresh label, is an error.

use mica_common::ParseError;
use mica_ir::{BinOp, Cfg, Instruction, MetadataStore, Operand, Scope, Value};
use num_bigint::BigInt;

/// Parse IL source into a CFG and its metadata.
pub fn parse(source: &str) -> Result<(Cfg, MetadataStore), ParseError> {
    Parser::new().parse(source)
}

struct Parser {
    cfg: Option<Cfg>,
    meta: MetadataStore,
    current: Option<String>,
    terminated: bool,
    last_instr: Option<(String, usize)>,
}

fn syntax(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        reason: reason.into(),
    }
}

impl Parser {
    fn new() -> Parser {
        Parser {
            cfg: None,
            meta: MetadataStore::new(),
            current: None,
            terminated: false,
            last_instr: None,
        }
    }

    fn parse(mut self, source: &str) -> Result<(Cfg, MetadataStore), ParseError> {
        let mut last_line = 0;
        for (number, raw) in source.lines().enumerate() {
            let number = number + 1;
            last_line = number;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix(';') {
                self.comment_chain(number, rest)?;
            } else if let Some(rest) = line.strip_prefix('@') {
                self.label_line(number, rest)?;
            } else {
                self.instr_line(number, line)?;
            }
        }

        let Some(mut cfg) = self.cfg else {
            return Err(syntax(last_line, "program has no blocks"));
        };
        if let Some(current) = &self.current {
            if !self.terminated {
                return Err(syntax(
                    last_line,
                    format!("block @{current} has no terminator"),
                ));
            }
        }
        cfg.refresh_edges();
        cfg.validate().map_err(|source| ParseError::Structural {
            line: last_line,
            source,
        })?;
        Ok((cfg, self.meta))
    }

    /// A `;`-introduced tail: zero or more metadata segments, then an
    /// ordinary comment swallowing the rest of the line.
    fn comment_chain(&mut self, number: usize, mut rest: &str) -> Result<(), ParseError> {
        loop {
            let (segment, tail) = match rest.find(';') {
                Some(split) => (&rest[..split], &rest[split + 1..]),
                None => (rest, ""),
            };
            rest = tail;
            let segment = segment.trim();
            if let Some(body) = segment.strip_prefix("#!") {
                let (key, values) = parse_metadata(number, body)?;
                self.meta.append(Scope::Cfg, key, values);
            } else if let Some(body) = segment.strip_prefix("@!") {
                let (key, values) = parse_metadata(number, body)?;
                let Some(block) = self.current.clone() else {
                    return Err(syntax(number, "block metadata outside any block"));
                };
                self.meta.append(Scope::block(block), key, values);
            } else if let Some(body) = segment.strip_prefix("%!") {
                let (key, values) = parse_metadata(number, body)?;
                match self.last_instr.clone() {
                    Some((block, index)) => {
                        self.meta.append(Scope::instr(block, index), key, values);
                    }
                    // A label intervened (or nothing precedes): the
                    // attachment point is gone.
                    None => log::debug!("line {number}: instruction metadata discarded"),
                }
            } else {
                // Plain comment; everything to end of line is prose.
                break;
            }
            if rest.is_empty() {
                break;
            }
        }
        Ok(())
    }

    fn label_line(&mut self, number: usize, rest: &str) -> Result<(), ParseError> {
        let (head, tail) = match rest.find(';') {
            Some(split) => (&rest[..split], Some(&rest[split + 1..])),
            None => (rest, None),
        };
        let head = head.trim();
        let Some(name) = head.strip_suffix(':') else {
            return Err(syntax(number, format!("label @{head} is missing its ':'")));
        };
        let name = name.trim();

        if let Some(current) = &self.current {
            if !self.terminated {
                return Err(syntax(
                    number,
                    format!("block @{current} has no terminator"),
                ));
            }
        }
        match &mut self.cfg {
            None => {
                self.cfg = Some(Cfg::new(name).map_err(|source| ParseError::Structural {
                    line: number,
                    source,
                })?);
            }
            Some(cfg) => {
                cfg.add_block(name).map_err(|source| ParseError::Structural {
                    line: number,
                    source,
                })?;
            }
        }
        self.current = Some(name.to_string());
        self.terminated = false;
        self.last_instr = None;

        if let Some(tail) = tail {
            self.comment_chain(number, tail)?;
        }
        Ok(())
    }

    fn instr_line(&mut self, number: usize, line: &str) -> Result<(), ParseError> {
        let (head, tail) = match line.find(';') {
            Some(split) => (&line[..split], Some(&line[split + 1..])),
            None => (line, None),
        };

        let Some(current) = self.current.clone() else {
            return Err(syntax(number, "instruction before any label"));
        };
        if self.terminated {
            return Err(syntax(
                number,
                format!("instruction after the terminator of @{current}; blocks need labels"),
            ));
        }

        let tokens = scan(number, head)?;
        let instr = parse_instr(number, &tokens)?;
        let Some(cfg) = self.cfg.as_mut() else {
            return Err(syntax(number, "instruction before any label"));
        };
        let block = cfg.get_mut(&current).map_err(|source| ParseError::Structural {
            line: number,
            source,
        })?;
        if instr.is_terminator() {
            block
                .set_terminator(instr)
                .map_err(|source| ParseError::Structural {
                    line: number,
                    source,
                })?;
            self.terminated = true;
        } else {
            block.push(instr).map_err(|source| ParseError::Structural {
                line: number,
                source,
            })?;
        }
        self.last_instr = Some((current, block.len() - 1));

        if let Some(tail) = tail {
            self.comment_chain(number, tail)?;
        }
        Ok(())
    }
}

fn parse_metadata(number: usize, body: &str) -> Result<(String, Vec<String>), ParseError> {
    let Some((key, values)) = body.split_once(':') else {
        return Err(syntax(number, "metadata is missing its ':'"));
    };
    let key = key.trim();
    if !mica_ir::value::is_valid_name(key) {
        return Err(syntax(number, format!("invalid metadata key {key:?}")));
    }
    Ok((
        key.to_string(),
        values.split_whitespace().map(str::to_string).collect(),
    ))
}

// ---------------------------------------------------------------------
// Instruction scanning

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    /// `%name`
    Reg(String),
    /// `@name`
    Lbl(String),
    /// `!name` (breakpoint)
    Bang(String),
    Int(Value),
    /// Bare keyword: `read`, `write`, `goto`, `branch`, `exit`,
    /// `brkpt`, `phi`.
    Word(String),
    /// Punctuation or operator.
    Sym(&'static str),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn take_name(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if is_name_char(c) {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

fn scan(number: usize, text: &str) -> Result<Vec<Tok>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        // A value operand was just seen iff the previous token can end
        // an operand; `-` after one is subtraction, otherwise a sign.
        let after_operand = matches!(tokens.last(), Some(Tok::Reg(_)) | Some(Tok::Int(_)));
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '%' => {
                chars.next();
                if chars.peek().copied().map(is_name_char).unwrap_or(false) {
                    tokens.push(Tok::Reg(take_name(&mut chars)));
                } else {
                    tokens.push(Tok::Sym("%"));
                }
            }
            '@' => {
                chars.next();
                let name = take_name(&mut chars);
                if name.is_empty() {
                    return Err(syntax(number, "'@' without a label name"));
                }
                tokens.push(Tok::Lbl(name));
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Tok::Sym("!="));
                } else {
                    let name = take_name(&mut chars);
                    if name.is_empty() {
                        return Err(syntax(number, "'!' without a breakpoint name"));
                    }
                    tokens.push(Tok::Bang(name));
                }
            }
            '-' if !after_operand => {
                chars.next();
                let value = scan_int(number, &mut chars)?;
                tokens.push(Tok::Int(-value));
            }
            '-' => {
                chars.next();
                tokens.push(Tok::Sym("-"));
            }
            '0'..='9' => {
                let value = scan_int(number, &mut chars)?;
                tokens.push(Tok::Int(value));
            }
            '<' => {
                chars.next();
                tokens.push(match chars.peek() {
                    Some('<') => {
                        chars.next();
                        Tok::Sym("<<")
                    }
                    Some('=') => {
                        chars.next();
                        Tok::Sym("<=")
                    }
                    _ => Tok::Sym("<"),
                });
            }
            '>' => {
                chars.next();
                tokens.push(match chars.peek() {
                    Some('>') => {
                        chars.next();
                        Tok::Sym(">>")
                    }
                    Some('=') => {
                        chars.next();
                        Tok::Sym(">=")
                    }
                    _ => Tok::Sym(">"),
                });
            }
            '=' => {
                chars.next();
                tokens.push(if chars.peek() == Some(&'=') {
                    chars.next();
                    Tok::Sym("==")
                } else {
                    Tok::Sym("=")
                });
            }
            '+' | '*' | '/' | '&' | '|' | '^' | '?' | ':' | '[' | ']' | ',' => {
                chars.next();
                tokens.push(Tok::Sym(match c {
                    '+' => "+",
                    '*' => "*",
                    '/' => "/",
                    '&' => "&",
                    '|' => "|",
                    '^' => "^",
                    '?' => "?",
                    ':' => ":",
                    '[' => "[",
                    ']' => "]",
                    _ => ",",
                }));
            }
            c if is_name_char(c) => {
                tokens.push(Tok::Word(take_name(&mut chars)));
            }
            other => {
                return Err(syntax(number, format!("unexpected character {other:?}")));
            }
        }
    }
    Ok(tokens)
}

fn scan_int(
    number: usize,
    chars: &mut std::iter::Peekable<std::str::Chars>,
) -> Result<Value, ParseError> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if is_name_char(c) {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    let (radix, digits) = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, digits.as_str()),
    };
    if digits.is_empty() {
        return Err(syntax(number, "integer literal has no digits"));
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| syntax(number, format!("invalid integer literal {digits:?}")))
}

// ---------------------------------------------------------------------
// Instruction grammar

fn parse_instr(number: usize, tokens: &[Tok]) -> Result<Instruction, ParseError> {
    let structural = |source| ParseError::Structural {
        line: number,
        source,
    };
    match tokens {
        [Tok::Word(word), Tok::Reg(dst)] if word == "read" => {
            Instruction::read(dst.clone()).map_err(structural)
        }
        [Tok::Word(word), rest @ ..] if word == "write" => {
            let [operand_tok] = rest else {
                return Err(syntax(number, "write takes one operand"));
            };
            let src = operand(number, operand_tok)?;
            Instruction::write(src).map_err(structural)
        }
        [Tok::Word(word), Tok::Lbl(target)] if word == "goto" => {
            Instruction::goto(target.clone()).map_err(structural)
        }
        [Tok::Word(word), Tok::Reg(cond), Tok::Sym("?"), Tok::Lbl(if_true), Tok::Sym(":"), Tok::Lbl(if_false)]
            if word == "branch" =>
        {
            Instruction::branch(cond.clone(), if_true.clone(), if_false.clone())
                .map_err(structural)
        }
        [Tok::Word(word)] if word == "exit" => Ok(Instruction::exit()),
        [Tok::Word(word), Tok::Bang(name)] if word == "brkpt" => {
            Instruction::brkpt(name.clone()).map_err(structural)
        }
        [Tok::Reg(dst), Tok::Sym("="), rest @ ..] => parse_rhs(number, dst, rest),
        _ => Err(syntax(number, "unrecognized instruction")),
    }
}

fn parse_rhs(number: usize, dst: &str, rest: &[Tok]) -> Result<Instruction, ParseError> {
    let structural = |source| ParseError::Structural {
        line: number,
        source,
    };
    match rest {
        [Tok::Word(word), entries @ ..] if word == "phi" => {
            let entries = parse_phi_entries(number, entries)?;
            Instruction::phi(dst, entries).map_err(structural)
        }
        [single] => {
            let src = operand(number, single)?;
            Instruction::mov(dst, src).map_err(structural)
        }
        [lhs_tok, Tok::Sym(symbol), rhs_tok] => {
            let lhs = operand(number, lhs_tok)?;
            let rhs = operand(number, rhs_tok)?;
            // `>` and `>=` are aliases: swap operands for `<` / `<=`.
            let (op, lhs, rhs) = match *symbol {
                ">" => (BinOp::Lt, rhs, lhs),
                ">=" => (BinOp::Le, rhs, lhs),
                canonical => match BinOp::from_symbol(canonical) {
                    Some(op) => (op, lhs, rhs),
                    None => {
                        return Err(syntax(
                            number,
                            format!("unknown operator {canonical:?}"),
                        ));
                    }
                },
            };
            Instruction::binary(dst, op, lhs, rhs).map_err(structural)
        }
        _ => Err(syntax(number, format!("malformed right-hand side for %{dst}"))),
    }
}

fn parse_phi_entries(
    number: usize,
    mut tokens: &[Tok],
) -> Result<Vec<(Operand, String)>, ParseError> {
    let mut entries = Vec::new();
    loop {
        let [Tok::Sym("["), value_tok, Tok::Sym(","), Tok::Lbl(label), Tok::Sym("]"), rest @ ..] =
            tokens
        else {
            return Err(syntax(number, "malformed phi row; expected [value, @label]"));
        };
        entries.push((operand(number, value_tok)?, label.clone()));
        match rest {
            [] => return Ok(entries),
            [Tok::Sym(","), more @ ..] => tokens = more,
            _ => return Err(syntax(number, "phi rows must be comma-separated")),
        }
    }
}

fn operand(number: usize, token: &Tok) -> Result<Operand, ParseError> {
    match token {
        Tok::Reg(name) => Ok(Operand::Register(name.clone())),
        Tok::Int(value) => Ok(Operand::Const(value.clone())),
        _ => Err(syntax(number, "expected a register or integer operand")),
    }
}
