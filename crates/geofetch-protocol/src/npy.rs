//! NumPy `.npy` container decoding.
//!
//! Pixel responses arrive as a single `.npy` array. Multi-band images use a
//! structured dtype with one named field per band; single-band arrays may
//! use a plain dtype. Every numeric kind is widened to `f64`.
//!
//! Layout: 6-byte magic `\x93NUMPY`, major/minor version bytes, header
//! length (u16 LE for version 1, u32 LE for 2 and 3), then an ASCII Python
//! dict literal such as
//! `{'descr': [('B1', '<f8')], 'fortran_order': False, 'shape': (2, 3), }`,
//! then the raw records.

use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Band name given to arrays with a plain (unstructured) dtype.
pub const DEFAULT_BAND_NAME: &str = "b1";

/// A decoded array: one flat, C-ordered `f64` vector per field.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub fields: Vec<(String, Vec<f64>)>,
}

impl NpyArray {
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// Decode an `.npy` payload.
pub fn decode_npy(bytes: &[u8]) -> ProtocolResult<NpyArray> {
    let (header, data) = split_header(bytes)?;
    let header = parse_header(header)?;
    debug!(
        shape = ?header.shape,
        fortran_order = header.fortran_order,
        fields = header.fields.len(),
        record_size = header.record_size,
        "Decoded NPY header"
    );

    let count: usize = header.shape.iter().product();
    let needed = count
        .checked_mul(header.record_size)
        .ok_or_else(|| ProtocolError::invalid_npy("array size overflows"))?;
    if data.len() < needed {
        return Err(ProtocolError::invalid_npy(format!(
            "truncated data: need {} bytes, have {}",
            needed,
            data.len()
        )));
    }

    let mut fields: Vec<(String, Vec<f64>)> = header
        .fields
        .iter()
        .map(|f| (f.name.clone(), vec![0.0; count]))
        .collect();

    for (k, record) in data[..needed]
        .chunks_exact(header.record_size.max(1))
        .enumerate()
        .take(count)
    {
        let target = if header.fortran_order {
            fortran_to_c_index(k, &header.shape)
        } else {
            k
        };
        for (field, (_, values)) in header.fields.iter().zip(fields.iter_mut()) {
            let raw = &record[field.offset..field.offset + field.scalar.size];
            values[target] = field.scalar.read(raw);
        }
    }

    Ok(NpyArray {
        shape: header.shape,
        fields,
    })
}

fn split_header(bytes: &[u8]) -> ProtocolResult<(&str, &[u8])> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(ProtocolError::invalid_npy("missing \\x93NUMPY magic"));
    }
    let major = bytes[6];
    let (header_len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(ProtocolError::invalid_npy("truncated header length"));
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        other => {
            return Err(ProtocolError::invalid_npy(format!(
                "unsupported format version {}.{}",
                other, bytes[7]
            )))
        }
    };
    let end = start + header_len;
    if bytes.len() < end {
        return Err(ProtocolError::invalid_npy("truncated header"));
    }
    let header = std::str::from_utf8(&bytes[start..end])
        .map_err(|_| ProtocolError::invalid_npy("header is not valid text"))?;
    Ok((header, &bytes[end..]))
}

// ============================================================================
// Dtypes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Float,
    Int,
    UInt,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scalar {
    kind: ScalarKind,
    size: usize,
    little_endian: bool,
}

macro_rules! read_as {
    ($ty:ty, $raw:expr, $le:expr) => {{
        let mut buf = [0u8; std::mem::size_of::<$ty>()];
        buf.copy_from_slice($raw);
        if $le {
            <$ty>::from_le_bytes(buf) as f64
        } else {
            <$ty>::from_be_bytes(buf) as f64
        }
    }};
}

impl Scalar {
    fn read(&self, raw: &[u8]) -> f64 {
        let le = self.little_endian;
        match (self.kind, self.size) {
            (ScalarKind::Float, 4) => read_as!(f32, raw, le),
            (ScalarKind::Float, _) => read_as!(f64, raw, le),
            (ScalarKind::Int, 1) => raw[0] as i8 as f64,
            (ScalarKind::Int, 2) => read_as!(i16, raw, le),
            (ScalarKind::Int, 4) => read_as!(i32, raw, le),
            (ScalarKind::Int, _) => read_as!(i64, raw, le),
            (ScalarKind::UInt, 1) => raw[0] as f64,
            (ScalarKind::UInt, 2) => read_as!(u16, raw, le),
            (ScalarKind::UInt, 4) => read_as!(u32, raw, le),
            (ScalarKind::UInt, _) => read_as!(u64, raw, le),
            (ScalarKind::Bool, _) => {
                if raw[0] != 0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Parsed type string: a numeric scalar, or void padding of `n` bytes.
enum TypeStr {
    Scalar(Scalar),
    Padding(usize),
}

fn parse_type_str(s: &str) -> ProtocolResult<TypeStr> {
    let unsupported = || ProtocolError::UnsupportedDtype(s.to_string());
    let mut chars = s.chars();
    let mut next = chars.next().ok_or_else(unsupported)?;

    let little_endian = match next {
        '<' | '=' | '|' => {
            next = chars.next().ok_or_else(unsupported)?;
            true
        }
        '>' => {
            next = chars.next().ok_or_else(unsupported)?;
            false
        }
        _ => true,
    };
    let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;

    let kind = match (next, size) {
        ('f', 4) | ('f', 8) => ScalarKind::Float,
        ('i', 1) | ('i', 2) | ('i', 4) | ('i', 8) => ScalarKind::Int,
        ('u', 1) | ('u', 2) | ('u', 4) | ('u', 8) => ScalarKind::UInt,
        ('b', 1) => ScalarKind::Bool,
        ('V', n) => return Ok(TypeStr::Padding(n)),
        _ => return Err(unsupported()),
    };
    Ok(TypeStr::Scalar(Scalar {
        kind,
        size,
        little_endian,
    }))
}

#[derive(Debug)]
struct FieldLayout {
    name: String,
    scalar: Scalar,
    offset: usize,
}

#[derive(Debug)]
struct Header {
    fields: Vec<FieldLayout>,
    record_size: usize,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn parse_header(text: &str) -> ProtocolResult<Header> {
    let literal = LiteralParser::new(text).parse()?;
    let PyLiteral::Dict(entries) = literal else {
        return Err(ProtocolError::invalid_npy("header is not a dict"));
    };
    let lookup = |key: &str| {
        entries
            .iter()
            .find(|(k, _)| matches!(k, PyLiteral::Str(s) if s == key))
            .map(|(_, v)| v)
            .ok_or_else(|| ProtocolError::invalid_npy(format!("header has no '{}'", key)))
    };

    let fortran_order = match lookup("fortran_order")? {
        PyLiteral::Bool(b) => *b,
        _ => return Err(ProtocolError::invalid_npy("'fortran_order' is not a bool")),
    };

    let shape = match lookup("shape")? {
        PyLiteral::Tuple(items) => items
            .iter()
            .map(|item| match item {
                PyLiteral::Int(n) if *n >= 0 => Ok(*n as usize),
                _ => Err(ProtocolError::invalid_npy("bad 'shape' entry")),
            })
            .collect::<ProtocolResult<Vec<_>>>()?,
        _ => return Err(ProtocolError::invalid_npy("'shape' is not a tuple")),
    };

    let (fields, record_size) = match lookup("descr")? {
        PyLiteral::Str(s) => match parse_type_str(s)? {
            TypeStr::Scalar(scalar) => (
                vec![FieldLayout {
                    name: DEFAULT_BAND_NAME.to_string(),
                    scalar,
                    offset: 0,
                }],
                scalar.size,
            ),
            TypeStr::Padding(_) => return Err(ProtocolError::UnsupportedDtype(s.clone())),
        },
        PyLiteral::List(items) => structured_fields(items)?,
        _ => return Err(ProtocolError::invalid_npy("'descr' is neither a string nor a list")),
    };

    Ok(Header {
        fields,
        record_size,
        fortran_order,
        shape,
    })
}

fn structured_fields(items: &[PyLiteral]) -> ProtocolResult<(Vec<FieldLayout>, usize)> {
    let mut fields = Vec::new();
    let mut offset = 0;
    for item in items {
        let parts = match item {
            PyLiteral::Tuple(parts) => parts,
            _ => return Err(ProtocolError::invalid_npy("structured field is not a tuple")),
        };
        if parts.len() != 2 {
            return Err(ProtocolError::UnsupportedDtype(
                "sub-array fields".to_string(),
            ));
        }
        let name = match &parts[0] {
            PyLiteral::Str(name) => name.clone(),
            // (title, name) pair
            PyLiteral::Tuple(pair) => match pair.as_slice() {
                [_, PyLiteral::Str(name)] => name.clone(),
                _ => return Err(ProtocolError::invalid_npy("bad field name")),
            },
            _ => return Err(ProtocolError::invalid_npy("bad field name")),
        };
        let type_str = match &parts[1] {
            PyLiteral::Str(s) => s,
            _ => {
                return Err(ProtocolError::UnsupportedDtype(format!(
                    "nested dtype in field '{}'",
                    name
                )))
            }
        };
        match parse_type_str(type_str)? {
            TypeStr::Scalar(scalar) => {
                fields.push(FieldLayout {
                    name,
                    scalar,
                    offset,
                });
                offset += scalar.size;
            }
            TypeStr::Padding(n) => offset += n,
        }
    }
    Ok((fields, offset))
}

/// Position in C order of the `k`-th element stored in Fortran order.
fn fortran_to_c_index(mut k: usize, shape: &[usize]) -> usize {
    let mut index = vec![0; shape.len()];
    for (axis, &dim) in shape.iter().enumerate() {
        if dim > 0 {
            index[axis] = k % dim;
            k /= dim;
        }
    }
    index
        .iter()
        .zip(shape)
        .fold(0, |acc, (&i, &dim)| acc * dim + i)
}

// ============================================================================
// Python literal parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum PyLiteral {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    List(Vec<PyLiteral>),
    Tuple(Vec<PyLiteral>),
    Dict(Vec<(PyLiteral, PyLiteral)>),
}

struct LiteralParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> LiteralParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    fn parse(mut self) -> ProtocolResult<PyLiteral> {
        let value = self.value()?;
        self.skip_ws();
        match self.chars.peek() {
            None => Ok(value),
            Some(c) => Err(ProtocolError::invalid_npy(format!(
                "unexpected '{}' after header dict",
                c
            ))),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expect(&mut self, want: char) -> ProtocolResult<()> {
        self.skip_ws();
        match self.chars.next() {
            Some(c) if c == want => Ok(()),
            other => Err(ProtocolError::invalid_npy(format!(
                "expected '{}' in header, found {:?}",
                want, other
            ))),
        }
    }

    fn value(&mut self) -> ProtocolResult<PyLiteral> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('{') => self.dict(),
            Some('[') => Ok(PyLiteral::List(self.sequence('[', ']')?)),
            Some('(') => Ok(PyLiteral::Tuple(self.sequence('(', ')')?)),
            Some(q @ ('\'' | '"')) => self.string(q),
            Some(c) if c == '-' || c.is_ascii_digit() => self.int(),
            Some(c) if c.is_ascii_alphabetic() => self.ident(),
            other => Err(ProtocolError::invalid_npy(format!(
                "unexpected {:?} in header",
                other
            ))),
        }
    }

    /// Comma-separated items between `open` and `close`, trailing comma allowed.
    fn sequence(&mut self, open: char, close: char) -> ProtocolResult<Vec<PyLiteral>> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.peek() == Some(&close) {
                self.chars.next();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                other => {
                    return Err(ProtocolError::invalid_npy(format!(
                        "expected ',' or '{}', found {:?}",
                        close, other
                    )))
                }
            }
        }
    }

    fn dict(&mut self) -> ProtocolResult<PyLiteral> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.peek() == Some(&'}') {
                self.chars.next();
                return Ok(PyLiteral::Dict(entries));
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some('}') => return Ok(PyLiteral::Dict(entries)),
                other => {
                    return Err(ProtocolError::invalid_npy(format!(
                        "expected ',' or '}}', found {:?}",
                        other
                    )))
                }
            }
        }
    }

    fn string(&mut self, quote: char) -> ProtocolResult<PyLiteral> {
        self.chars.next();
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(PyLiteral::Str(out)),
                c => out.push(c),
            }
        }
        Err(ProtocolError::invalid_npy("unterminated string in header"))
    }

    fn int(&mut self) -> ProtocolResult<PyLiteral> {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '-' || c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        // numpy on some platforms writes shapes like (3L, 4L)
        if self.chars.peek() == Some(&'L') {
            self.chars.next();
        }
        digits
            .parse()
            .map(PyLiteral::Int)
            .map_err(|_| ProtocolError::invalid_npy(format!("bad integer '{}'", digits)))
    }

    fn ident(&mut self) -> ProtocolResult<PyLiteral> {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match word.as_str() {
            "True" => Ok(PyLiteral::Bool(true)),
            "False" => Ok(PyLiteral::Bool(false)),
            "None" => Ok(PyLiteral::None),
            _ => Err(ProtocolError::invalid_npy(format!(
                "unknown identifier '{}' in header",
                word
            ))),
        }
    }
}
