//! Managed-runtime call surface.
//!
//! Arguments arrive as [`Term`]s. A call either raises [`HostError`]
//! (wrong arity or argument type) or returns `{ok, Mime}` / `{error, Reason}`.

use exmagic_core::MagicError;

use crate::magic;

/// Module name the exported functions are registered under.
pub const MODULE: &str = "Elixir.ExMagic";

/// A value crossing the host boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Binary(Vec<u8>),
    Atom(&'static str),
    Integer(i64),
    List(Vec<Term>),
    Tuple(Vec<Term>),
}

impl Term {
    fn as_binary(&self) -> NifResult<&[u8]> {
        match self {
            Term::Binary(bytes) => Ok(bytes),
            _ => Err(HostError::BadArg),
        }
    }
}

/// Raised to the host instead of returning a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    BadArg,
    Undefined,
}

pub type NifResult<T> = Result<T, HostError>;

pub type NifFn = fn(&[Term]) -> NifResult<Term>;

/// Exported functions: (name, arity, implementation).
pub const EXPORTS: &[(&str, usize, NifFn)] = &[
    ("from_buffer", 2, from_buffer),
    ("from_file", 2, from_file),
];

/// Call an exported function by name.
pub fn dispatch(name: &str, args: &[Term]) -> NifResult<Term> {
    let (_, arity, fun) = EXPORTS
        .iter()
        .find(|(n, _, _)| *n == name)
        .ok_or(HostError::Undefined)?;
    if args.len() != *arity {
        return Err(HostError::Undefined);
    }
    fun(args)
}

/// `from_buffer(Content, DatabasePath)`
pub fn from_buffer(args: &[Term]) -> NifResult<Term> {
    let [content, database] = args else {
        return Err(HostError::BadArg);
    };
    let (content, database) = (content.as_binary()?, database.as_binary()?);
    into_term(magic::classify_buffer(content, database))
}

/// `from_file(FilePath, DatabasePath)`
pub fn from_file(args: &[Term]) -> NifResult<Term> {
    let [path, database] = args else {
        return Err(HostError::BadArg);
    };
    let (path, database) = (path.as_binary()?, database.as_binary()?);
    into_term(magic::classify_file(path, database))
}

fn into_term(result: Result<Vec<u8>, MagicError>) -> NifResult<Term> {
    match result {
        Ok(mime) => Ok(Term::Tuple(vec![Term::Atom("ok"), Term::Binary(mime)])),
        Err(MagicError::BadArgument) => Err(HostError::BadArg),
        Err(e) => Ok(Term::Tuple(vec![Term::Atom("error"), Term::Atom(e.reason())])),
    }
}
