//! Decoder for settings saved as base64-wrapped pickle streams
//!
//! The stream is replayed on a small stack machine. Only the value shapes in
//! [`PyValue`] are materialised: built-in containers and scalars, saved file
//! references (`RecentPath`), and an opaque marker for every other class.
//! Nothing is imported or executed.

use std::cell::Cell;
use std::collections::HashMap;

use log::trace;

use crate::errors::{Error, Result, pickle_decoding_error};

use super::{MAX_DEPTH, PathRecord, PyValue};

const HIGHEST_PROTOCOL: u8 = 5;

/// Upper bound on values copied or materialised while decoding one stream
const MAX_NODES: usize = 1_000_000;

/// Decodes a raw pickle stream
pub fn unpickle(data: &[u8]) -> Result<PyValue> {
    let mut machine = Unpickler {
        data,
        pos: 0,
        stack: Vec::new(),
        marks: Vec::new(),
        memo: HashMap::new(),
        budget: Cell::new(MAX_NODES),
    };
    let root = machine.run()?;
    machine.resolve(&root, 0)
}

/// Stack entries; memoised entries are replaced by `Ref` so later mutation
/// through the memo stays visible to every holder
#[derive(Debug, Clone)]
enum Raw {
    None,
    Bool(bool),
    Int(i64),
    BigInt,
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Raw>),
    Tuple(Vec<Raw>),
    Set(Vec<Raw>),
    Dict(Vec<(Raw, Raw)>),
    Global(String, String),
    Instance {
        module: String,
        name: String,
        state: Option<Box<Raw>>,
    },
    Ref(u32),
}

impl Raw {
    /// Node count, not following memo references, counting at most to `limit`
    ///
    /// Nesting past [`MAX_DEPTH`] counts as the whole limit.
    fn size(&self, limit: usize, depth: usize) -> usize {
        if depth > MAX_DEPTH {
            return limit;
        }
        let children: Box<dyn Iterator<Item = &Raw> + '_> = match self {
            Raw::List(items) | Raw::Tuple(items) | Raw::Set(items) => Box::new(items.iter()),
            Raw::Dict(entries) => Box::new(entries.iter().flat_map(|(k, v)| [k, v])),
            Raw::Instance {
                state: Some(state), ..
            } => Box::new(std::iter::once(state.as_ref())),
            _ => Box::new(std::iter::empty()),
        };
        let mut count = 1;
        for child in children {
            if count >= limit {
                break;
            }
            count += child.size(limit - count, depth + 1);
        }
        count
    }
}

struct Unpickler<'a> {
    data: &'a [u8],
    pos: usize,
    stack: Vec<Raw>,
    marks: Vec<usize>,
    memo: HashMap<u32, Raw>,
    /// Nodes left before the stream counts as too large
    budget: Cell<usize>,
}

impl<'a> Unpickler<'a> {
    fn error(&self, detail: &str) -> Error {
        pickle_decoding_error(self.pos, detail)
    }

    /// Charges `nodes` against the budget
    ///
    /// Shared references expand into separate copies, so a short stream can
    /// describe an exponentially large tree.
    fn spend(&self, nodes: usize) -> Result<()> {
        let left = self.budget.get();
        if nodes > left {
            return Err(self.error("object graph too large"));
        }
        self.budget.set(left - nodes);
        Ok(())
    }

    /// Clones a stack value after charging its size
    fn copy_of(&self, raw: &Raw) -> Result<Raw> {
        self.spend(raw.size(self.budget.get().saturating_add(1), 0))?;
        Ok(raw.clone())
    }

    fn run(&mut self) -> Result<Raw> {
        loop {
            let opcode = self.read_u8()?;
            match opcode {
                // protocol framing
                0x80 => {
                    let protocol = self.read_u8()?;
                    if protocol > HIGHEST_PROTOCOL {
                        return Err(self.error(&format!("unsupported protocol {protocol}")));
                    }
                }
                0x95 => {
                    self.read_bytes(8)?;
                }
                b'.' => return self.pop(),

                // stack manipulation
                b'(' => self.marks.push(self.stack.len()),
                b'0' => {
                    self.pop()?;
                }
                b'1' => {
                    self.pop_mark()?;
                }
                b'2' => {
                    let top = self.copy_of(self.top()?)?;
                    self.stack.push(top);
                }

                // scalars
                b'N' => self.stack.push(Raw::None),
                0x88 => self.stack.push(Raw::Bool(true)),
                0x89 => self.stack.push(Raw::Bool(false)),
                b'I' => {
                    let line = self.read_text_line()?;
                    let value = match line.as_str() {
                        "01" => Raw::Bool(true),
                        "00" => Raw::Bool(false),
                        text => Raw::Int(
                            text.parse()
                                .map_err(|_| self.error("invalid INT argument"))?,
                        ),
                    };
                    self.stack.push(value);
                }
                b'L' => {
                    let line = self.read_text_line()?;
                    let text = line.trim_end_matches('L');
                    let value = text.parse().map(Raw::Int).unwrap_or(Raw::BigInt);
                    self.stack.push(value);
                }
                b'J' => {
                    let value = i32::from_le_bytes(self.read_array()?);
                    self.stack.push(Raw::Int(value.into()));
                }
                b'K' => {
                    let value = self.read_u8()?;
                    self.stack.push(Raw::Int(value.into()));
                }
                b'M' => {
                    let value = u16::from_le_bytes(self.read_array()?);
                    self.stack.push(Raw::Int(value.into()));
                }
                0x8a => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.read_bytes(len)?;
                    self.stack.push(decode_long(bytes));
                }
                0x8b => {
                    let len = self.read_len_i32()?;
                    let bytes = self.read_bytes(len)?;
                    self.stack.push(decode_long(bytes));
                }
                b'F' => {
                    let line = self.read_text_line()?;
                    let value = line
                        .trim()
                        .parse()
                        .map_err(|_| self.error("invalid FLOAT argument"))?;
                    self.stack.push(Raw::Float(value));
                }
                b'G' => {
                    let value = f64::from_be_bytes(self.read_array()?);
                    self.stack.push(Raw::Float(value));
                }

                // text and bytes
                b'S' => {
                    let line = self.read_text_line()?;
                    let text = match super::parse_literal(&line) {
                        Ok(PyValue::Str(text)) => text,
                        _ => return Err(self.error("invalid STRING argument")),
                    };
                    self.stack.push(Raw::Str(text));
                }
                b'T' => {
                    let len = self.read_len_i32()?;
                    let bytes = self.read_bytes(len)?;
                    self.stack.push(Raw::Str(latin1(bytes)));
                }
                b'U' => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.read_bytes(len)?;
                    self.stack.push(Raw::Str(latin1(bytes)));
                }
                b'V' => {
                    let line = self.read_line()?;
                    let text = decode_raw_unicode_escape(line)
                        .ok_or_else(|| self.error("invalid UNICODE argument"))?;
                    self.stack.push(Raw::Str(text));
                }
                b'X' => {
                    let len = self.read_len_u32()?;
                    self.push_utf8(len)?;
                }
                0x8c => {
                    let len = usize::from(self.read_u8()?);
                    self.push_utf8(len)?;
                }
                0x8d => {
                    let len = self.read_len_u64()?;
                    self.push_utf8(len)?;
                }
                b'B' => {
                    let len = self.read_len_u32()?;
                    let bytes = self.read_bytes(len)?.to_vec();
                    self.stack.push(Raw::Bytes(bytes));
                }
                b'C' => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.read_bytes(len)?.to_vec();
                    self.stack.push(Raw::Bytes(bytes));
                }
                0x8e | 0x96 => {
                    let len = self.read_len_u64()?;
                    let bytes = self.read_bytes(len)?.to_vec();
                    self.stack.push(Raw::Bytes(bytes));
                }

                // containers
                b']' => self.stack.push(Raw::List(Vec::new())),
                b')' => self.stack.push(Raw::Tuple(Vec::new())),
                b'}' => self.stack.push(Raw::Dict(Vec::new())),
                0x8f => self.stack.push(Raw::Set(Vec::new())),
                b'l' => {
                    let items = self.pop_mark()?;
                    self.stack.push(Raw::List(items));
                }
                b't' => {
                    let items = self.pop_mark()?;
                    self.stack.push(Raw::Tuple(items));
                }
                0x85..=0x87 => {
                    let count = usize::from(opcode - 0x84);
                    if self.stack.len() < count {
                        return Err(self.error("stack underflow"));
                    }
                    let items = self.stack.split_off(self.stack.len() - count);
                    self.stack.push(Raw::Tuple(items));
                }
                b'd' => {
                    let items = self.pop_mark()?;
                    let entries = self.pairs(items)?;
                    self.stack.push(Raw::Dict(entries));
                }
                0x91 => {
                    let items = self.pop_mark()?;
                    self.stack.push(Raw::Set(items));
                }
                b'a' => {
                    let item = self.pop()?;
                    self.extend_top(vec![item])?;
                }
                b'e' | 0x90 => {
                    let items = self.pop_mark()?;
                    self.extend_top(items)?;
                }
                b's' => {
                    let value = self.pop()?;
                    let key = self.pop()?;
                    self.insert_top(vec![(key, value)])?;
                }
                b'u' => {
                    let items = self.pop_mark()?;
                    let entries = self.pairs(items)?;
                    self.insert_top(entries)?;
                }

                // memo
                b'p' => {
                    let id = self.read_memo_id_line()?;
                    self.memoize(id)?;
                }
                b'q' => {
                    let id = self.read_u8()?;
                    self.memoize(id.into())?;
                }
                b'r' => {
                    let id = u32::from_le_bytes(self.read_array()?);
                    self.memoize(id)?;
                }
                0x94 => {
                    let id = u32::try_from(self.memo.len())
                        .map_err(|_| self.error("memo overflow"))?;
                    self.memoize(id)?;
                }
                b'g' => {
                    let id = self.read_memo_id_line()?;
                    self.push_ref(id)?;
                }
                b'h' => {
                    let id = self.read_u8()?;
                    self.push_ref(id.into())?;
                }
                b'j' => {
                    let id = u32::from_le_bytes(self.read_array()?);
                    self.push_ref(id)?;
                }

                // classes and instances
                b'c' => {
                    let module = self.read_text_line()?;
                    let name = self.read_text_line()?;
                    self.stack.push(Raw::Global(module, name));
                }
                0x93 => {
                    let name = self.pop()?;
                    let module = self.pop()?;
                    let name = self.text_of(&name)?;
                    let module = self.text_of(&module)?;
                    self.stack.push(Raw::Global(module, name));
                }
                b'R' => {
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    let value = self.reduce(&callable, args)?;
                    self.stack.push(value);
                }
                0x81 => {
                    let _args = self.pop()?;
                    let class = self.pop()?;
                    let value = self.instantiate(&class);
                    self.stack.push(value);
                }
                0x92 => {
                    let _kwargs = self.pop()?;
                    let _args = self.pop()?;
                    let class = self.pop()?;
                    let value = self.instantiate(&class);
                    self.stack.push(value);
                }
                b'o' => {
                    let mut items = self.pop_mark()?;
                    if items.is_empty() {
                        return Err(self.error("OBJ without a class"));
                    }
                    let class = items.remove(0);
                    let value = self.instantiate(&class);
                    self.stack.push(value);
                }
                b'i' => {
                    let module = self.read_text_line()?;
                    let name = self.read_text_line()?;
                    self.pop_mark()?;
                    let value = self.instantiate(&Raw::Global(module, name));
                    self.stack.push(value);
                }
                b'b' => {
                    let state = self.pop()?;
                    self.build_top(state)?;
                }

                b'P' | b'Q' => return Err(self.error("persistent ids are not supported")),
                0x82..=0x84 => return Err(self.error("extension registry is not supported")),
                0x97 | 0x98 => return Err(self.error("out-of-band buffers are not supported")),
                other => {
                    return Err(pickle_decoding_error(
                        self.pos - 1,
                        &format!("unknown opcode 0x{other:02x}"),
                    ));
                }
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    fn read_len_i32(&mut self) -> Result<usize> {
        let len = i32::from_le_bytes(self.read_array()?);
        usize::try_from(len).map_err(|_| self.error("negative length"))
    }

    fn read_len_u32(&mut self) -> Result<usize> {
        let len = u32::from_le_bytes(self.read_array()?);
        usize::try_from(len).map_err(|_| self.error("length out of range"))
    }

    fn read_len_u64(&mut self) -> Result<usize> {
        let len = u64::from_le_bytes(self.read_array()?);
        usize::try_from(len).map_err(|_| self.error("length out of range"))
    }

    fn read_line(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| self.error("unterminated line argument"))?;
        self.pos += len + 1;
        let line = &rest[..len];
        Ok(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn read_text_line(&mut self) -> Result<String> {
        let line = self.read_line()?;
        std::str::from_utf8(line)
            .map(str::to_string)
            .map_err(|_| self.error("line argument is not valid UTF-8"))
    }

    fn read_memo_id_line(&mut self) -> Result<u32> {
        let line = self.read_text_line()?;
        line.trim()
            .parse()
            .map_err(|_| self.error("invalid memo key"))
    }

    fn push_utf8(&mut self, len: usize) -> Result<()> {
        let bytes = self.read_bytes(len)?;
        self.stack
            .push(Raw::Str(String::from_utf8_lossy(bytes).into_owned()));
        Ok(())
    }

    fn pop(&mut self) -> Result<Raw> {
        self.stack.pop().ok_or_else(|| self.error("stack underflow"))
    }

    fn top(&self) -> Result<&Raw> {
        self.stack.last().ok_or_else(|| self.error("stack underflow"))
    }

    fn pop_mark(&mut self) -> Result<Vec<Raw>> {
        let mark = self.marks.pop().ok_or_else(|| self.error("missing MARK"))?;
        if mark > self.stack.len() {
            return Err(self.error("MARK beyond stack"));
        }
        Ok(self.stack.split_off(mark))
    }

    fn pairs(&self, items: Vec<Raw>) -> Result<Vec<(Raw, Raw)>> {
        if items.len() % 2 != 0 {
            return Err(self.error("odd number of mapping items"));
        }
        let mut entries = Vec::with_capacity(items.len() / 2);
        let mut items = items.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn memoize(&mut self, id: u32) -> Result<()> {
        let offset = self.pos;
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| pickle_decoding_error(offset, "memoize on empty stack"))?;
        let value = match top {
            Raw::Ref(existing) => Raw::Ref(*existing),
            other => std::mem::replace(other, Raw::Ref(id)),
        };
        self.memo.insert(id, value);
        Ok(())
    }

    fn push_ref(&mut self, id: u32) -> Result<()> {
        if !self.memo.contains_key(&id) {
            return Err(self.error(&format!("memo key {id} not found")));
        }
        self.stack.push(Raw::Ref(id));
        Ok(())
    }

    fn extend_top(&mut self, items: Vec<Raw>) -> Result<()> {
        let offset = self.pos;
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| pickle_decoding_error(offset, "stack underflow"))?;
        match target_mut(top, &mut self.memo, offset)? {
            Raw::List(list) | Raw::Set(list) => list.extend(items),
            // appends to other classes have no visible effect here
            Raw::Instance { .. } => {}
            _ => return Err(pickle_decoding_error(offset, "append to a non-sequence")),
        }
        Ok(())
    }

    fn insert_top(&mut self, entries: Vec<(Raw, Raw)>) -> Result<()> {
        let offset = self.pos;
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| pickle_decoding_error(offset, "stack underflow"))?;
        match target_mut(top, &mut self.memo, offset)? {
            Raw::Dict(dict) => dict.extend(entries),
            Raw::Instance { .. } => {}
            _ => return Err(pickle_decoding_error(offset, "setitem on a non-mapping")),
        }
        Ok(())
    }

    fn build_top(&mut self, new_state: Raw) -> Result<()> {
        let offset = self.pos;
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| pickle_decoding_error(offset, "stack underflow"))?;
        if let Raw::Instance { state, .. } = target_mut(top, &mut self.memo, offset)? {
            *state = Some(Box::new(new_state));
        }
        Ok(())
    }

    /// Follows memo references at the top level only
    fn deref<'s>(&'s self, raw: &'s Raw) -> Result<&'s Raw> {
        let mut current = raw;
        for _ in 0..MAX_DEPTH {
            match current {
                Raw::Ref(id) => {
                    current = self
                        .memo
                        .get(id)
                        .ok_or_else(|| self.error(&format!("memo key {id} not found")))?;
                }
                other => return Ok(other),
            }
        }
        Err(self.error("memo reference cycle"))
    }

    fn text_of(&self, raw: &Raw) -> Result<String> {
        match self.deref(raw)? {
            Raw::Str(text) => Ok(text.clone()),
            _ => Err(self.error("expected a string")),
        }
    }

    fn global_of(&self, raw: &Raw) -> Option<(String, String)> {
        match self.deref(raw).ok()? {
            Raw::Global(module, name) => Some((module.clone(), name.clone())),
            _ => None,
        }
    }

    /// First positional argument of a call, dereferenced
    fn first_arg(&self, args: &Raw) -> Result<Option<Raw>> {
        match self.deref(args)? {
            Raw::Tuple(items) => match items.first() {
                Some(first) => Ok(Some(self.copy_of(self.deref(first)?)?)),
                None => Ok(None),
            },
            _ => Err(self.error("call arguments are not a tuple")),
        }
    }

    fn reduce(&self, callable: &Raw, args: Raw) -> Result<Raw> {
        let Some((module, name)) = self.global_of(callable) else {
            return Err(self.error("REDUCE on a non-callable"));
        };
        let first = self.first_arg(&args)?;
        let builtin = matches!(module.as_str(), "builtins" | "__builtin__");

        let value = match (module.as_str(), name.as_str()) {
            ("copy_reg" | "copyreg", "_reconstructor") => match first {
                Some(class) => self.instantiate(&class),
                None => return Err(self.error("_reconstructor without a class")),
            },
            (_, "set" | "frozenset" | "list" | "tuple") if builtin => {
                let items = match first {
                    Some(Raw::List(items) | Raw::Tuple(items) | Raw::Set(items)) => items,
                    None => Vec::new(),
                    Some(_) => return Err(self.error("unsupported sequence constructor")),
                };
                match name.as_str() {
                    "list" => Raw::List(items),
                    "tuple" => Raw::Tuple(items),
                    _ => Raw::Set(items),
                }
            }
            (_, "dict") if builtin => self.mapping_from(first)?,
            ("collections", "OrderedDict" | "defaultdict") => {
                // defaultdict's first argument is the factory, not the items
                if name == "defaultdict" {
                    Raw::Dict(Vec::new())
                } else {
                    self.mapping_from(first)?
                }
            }
            ("_codecs", "encode") => match first {
                Some(Raw::Str(text)) => Raw::Bytes(text.chars().map(|c| c as u32 as u8).collect()),
                _ => return Err(self.error("unsupported _codecs.encode call")),
            },
            (_, "bytes" | "bytearray") if builtin => match first {
                Some(Raw::Bytes(bytes)) => Raw::Bytes(bytes),
                None => Raw::Bytes(Vec::new()),
                Some(_) => return Err(self.error("unsupported bytes constructor")),
            },
            _ => Raw::Instance {
                module,
                name,
                state: None,
            },
        };
        Ok(value)
    }

    fn mapping_from(&self, first: Option<Raw>) -> Result<Raw> {
        let items = match first {
            None => return Ok(Raw::Dict(Vec::new())),
            Some(Raw::Dict(entries)) => return Ok(Raw::Dict(entries)),
            Some(Raw::List(items) | Raw::Tuple(items)) => items,
            Some(_) => return Err(self.error("unsupported mapping constructor")),
        };
        let mut entries = Vec::with_capacity(items.len());
        for item in &items {
            match self.deref(item)? {
                Raw::List(pair) | Raw::Tuple(pair) if pair.len() == 2 => {
                    entries.push((pair[0].clone(), pair[1].clone()));
                }
                _ => return Err(self.error("mapping item is not a pair")),
            }
        }
        Ok(Raw::Dict(entries))
    }

    /// `cls.__new__(cls, ...)` for the classes we understand
    fn instantiate(&self, class: &Raw) -> Raw {
        let Some((module, name)) = self.global_of(class) else {
            return Raw::Instance {
                module: "builtins".to_string(),
                name: "object".to_string(),
                state: None,
            };
        };
        let builtin = matches!(module.as_str(), "builtins" | "__builtin__");
        match (module.as_str(), name.as_str()) {
            (_, "list") if builtin => Raw::List(Vec::new()),
            (_, "set") if builtin => Raw::Set(Vec::new()),
            (_, "dict") if builtin => Raw::Dict(Vec::new()),
            ("collections", "OrderedDict" | "defaultdict") => Raw::Dict(Vec::new()),
            _ => Raw::Instance {
                module,
                name,
                state: None,
            },
        }
    }

    fn resolve(&self, raw: &Raw, depth: usize) -> Result<PyValue> {
        if depth > MAX_DEPTH {
            return Err(self.error("object graph too deep or recursive"));
        }
        self.spend(1)?;
        let next = depth + 1;
        let resolve_all = |items: &[Raw]| -> Result<Vec<PyValue>> {
            items.iter().map(|item| self.resolve(item, next)).collect()
        };

        Ok(match raw {
            Raw::None => PyValue::None,
            Raw::Bool(b) => PyValue::Bool(*b),
            Raw::Int(i) => PyValue::Int(*i),
            Raw::BigInt => PyValue::Opaque("builtins.int".to_string()),
            Raw::Float(f) => PyValue::Float(*f),
            Raw::Str(s) => PyValue::Str(s.clone()),
            Raw::Bytes(b) => PyValue::Bytes(b.clone()),
            Raw::List(items) => PyValue::List(resolve_all(items)?),
            Raw::Tuple(items) => PyValue::Tuple(resolve_all(items)?),
            Raw::Set(items) => PyValue::Set(resolve_all(items)?),
            Raw::Dict(entries) => PyValue::Dict(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.resolve(k, next)?, self.resolve(v, next)?)))
                    .collect::<Result<_>>()?,
            ),
            Raw::Global(module, name) => PyValue::Opaque(format!("{module}.{name}")),
            Raw::Instance {
                module,
                name,
                state,
            } => {
                let state = match state {
                    Some(state) => Some(self.resolve(state, next)?),
                    None => None,
                };
                match state.as_ref().and_then(|state| path_record(name, state)) {
                    Some(record) => PyValue::Path(record),
                    None => {
                        trace!("Keeping {module}.{name} instance as opaque value");
                        PyValue::Opaque(format!("{module}.{name}"))
                    }
                }
            }
            Raw::Ref(id) => {
                let target = self
                    .memo
                    .get(id)
                    .ok_or_else(|| self.error(&format!("memo key {id} not found")))?;
                self.resolve(target, next)?
            }
        })
    }
}

/// The memo entry a stack slot refers to, or the slot itself
fn target_mut<'s>(
    slot: &'s mut Raw,
    memo: &'s mut HashMap<u32, Raw>,
    offset: usize,
) -> Result<&'s mut Raw> {
    let mut id = match slot {
        Raw::Ref(id) => *id,
        other => return Ok(other),
    };
    for _ in 0..MAX_DEPTH {
        match memo.get(&id) {
            Some(Raw::Ref(next)) => id = *next,
            Some(_) => break,
            None => return Err(pickle_decoding_error(offset, "dangling memo reference")),
        }
    }
    memo.get_mut(&id)
        .filter(|target| !matches!(target, Raw::Ref(_)))
        .ok_or_else(|| pickle_decoding_error(offset, "memo reference cycle"))
}

/// Builds a path record from an instance state carrying `abspath`
fn path_record(class_name: &str, state: &PyValue) -> Option<PathRecord> {
    let abspath = state.get("abspath")?.as_str()?;
    if class_name != "RecentPath" && !state.is_dict() {
        return None;
    }
    let field = |key: &str| state.get(key).and_then(PyValue::as_str).map(str::to_string);
    Some(PathRecord {
        abspath: abspath.to_string(),
        prefix: field("prefix"),
        relpath: field("relpath"),
        title: field("title"),
        sheet: field("sheet"),
        file_format: field("file_format"),
    })
}

/// Little-endian two's complement integer of arbitrary width
fn decode_long(bytes: &[u8]) -> Raw {
    if bytes.is_empty() {
        return Raw::Int(0);
    }
    let negative = bytes[bytes.len() - 1] & 0x80 != 0;
    let fill = if negative { 0xff } else { 0x00 };
    if bytes.len() > 8 {
        let (low, high) = bytes.split_at(8);
        let fits = high.iter().all(|b| *b == fill) && (low[7] & 0x80 != 0) == negative;
        if !fits {
            return Raw::BigInt;
        }
        return decode_long(low);
    }
    let mut buffer = [fill; 8];
    buffer[..bytes.len()].copy_from_slice(bytes);
    Raw::Int(i64::from_le_bytes(buffer))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// Python's `raw-unicode-escape` codec: latin-1 plus `\uXXXX`/`\UXXXXXXXX`
fn decode_raw_unicode_escape(bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        let width = match (byte, bytes.get(index + 1)) {
            (b'\\', Some(b'u')) => 4,
            (b'\\', Some(b'U')) => 8,
            _ => 0,
        };
        if width == 0 {
            out.push(char::from(byte));
            index += 1;
            continue;
        }
        let digits = bytes.get(index + 2..index + 2 + width)?;
        let code = u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()?;
        out.push(char::from_u32(code)?);
        index += 2 + width;
    }
    Some(out)
}
