//! Program resolution and the CLVM operations the pipeline relies on.
//!
//! A program can be handed to the pipeline in four encodings. [`ProgramSource`]
//! names them explicitly and [`ProgramSource::classify`] decides which one a
//! locator string denotes, with this precedence:
//!
//! 1. a value that is already a [`Program`] is used as is
//! 2. text containing `(` is inline CLVM assembly
//! 3. text without a `.` is hex-encoded serialized CLVM
//! 4. anything else is a file path, and the file's contents decide:
//!    a `(mod ` declaration is Chialisp to compile, other text with `(` is
//!    assembly, and the rest is serialized hex

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chia::protocol::{Bytes32, Program};
use clvm_tools_rs::classic::clvm_tools::binutils::assemble as assemble_text;
use clvm_tools_rs::classic::clvm_tools::clvmc::compile_clvm_text;
use clvm_tools_rs::compiler::compiler::DefaultCompilerOpts;
use clvm_tools_rs::compiler::comptypes::CompilerOpts;
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::CurriedProgram;
use clvmr::serde::{node_from_bytes, node_to_bytes, serialized_length_from_bytes};
use clvmr::{Allocator, NodePtr};
use clvmr_compiler::serde::node_to_bytes as compiler_node_to_bytes;
use clvmr_compiler::Allocator as CompilerAllocator;

use crate::error::IssuanceError;

/// The encodings a program can arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Already resolved
    Resolved(Program),
    /// Inline CLVM assembly, e.g. `(q . 1)`
    Inline(String),
    /// Hex-encoded serialized CLVM, inline or read from `origin`
    SerializedBytes { origin: String, hex: String },
    /// A Chialisp file containing a `(mod ...)` declaration
    SourceFile { path: PathBuf, text: String },
    /// A file of compiled CLVM assembly
    CompiledFile { path: PathBuf, text: String },
}

impl ProgramSource {
    /// Decide what `locator` denotes. Only the file case touches the filesystem.
    pub fn classify(locator: &str) -> Result<Self, IssuanceError> {
        if locator.contains('(') {
            return Ok(ProgramSource::Inline(locator.to_string()));
        }
        if !locator.contains('.') {
            return Ok(ProgramSource::SerializedBytes {
                origin: locator.to_string(),
                hex: locator.to_string(),
            });
        }

        let path = PathBuf::from(locator);
        let text =
            std::fs::read_to_string(&path).map_err(|e| IssuanceError::resolution(locator, e))?;
        Ok(Self::from_file_contents(path, text))
    }

    /// Classify the contents of a program file.
    pub fn from_file_contents(path: PathBuf, text: String) -> Self {
        if text.contains('(') {
            if declares_module(&text) {
                ProgramSource::SourceFile { path, text }
            } else {
                ProgramSource::CompiledFile { path, text }
            }
        } else {
            ProgramSource::SerializedBytes {
                origin: path.display().to_string(),
                hex: text,
            }
        }
    }

    /// Short name of the input, used in error messages.
    pub fn label(&self) -> String {
        match self {
            ProgramSource::Resolved(_) => "<program>".to_string(),
            ProgramSource::Inline(text) => text.clone(),
            ProgramSource::SerializedBytes { origin, .. } => origin.clone(),
            ProgramSource::SourceFile { path, .. } | ProgramSource::CompiledFile { path, .. } => {
                path.display().to_string()
            }
        }
    }

    /// Turn the source into a program. `include` lists Chialisp include directories.
    pub fn resolve(self, include: &[PathBuf]) -> Result<Program, IssuanceError> {
        let label = self.label();

        let bytes = match self {
            ProgramSource::Resolved(program) => return Ok(program),
            ProgramSource::Inline(text) | ProgramSource::CompiledFile { text, .. } => {
                assemble_bytes(&text).map_err(|e| IssuanceError::resolution(&label, e))?
            }
            ProgramSource::SerializedBytes { hex, .. } => {
                let hex = hex.trim();
                hex::decode(hex.strip_prefix("0x").unwrap_or(hex))
                    .map_err(|e| IssuanceError::resolution(&label, e))?
            }
            ProgramSource::SourceFile { path, text } => compile_module(&path, &text, include)
                .map_err(|e| IssuanceError::resolution(&label, e))?,
        };

        check_serialized(&bytes).map_err(|e| IssuanceError::resolution(&label, e))?;
        Ok(Program::from(bytes))
    }
}

impl From<Program> for ProgramSource {
    fn from(program: Program) -> Self {
        ProgramSource::Resolved(program)
    }
}

/// Classify and resolve a locator in one step.
pub fn resolve_program(locator: &str, include: &[PathBuf]) -> Result<Program, IssuanceError> {
    let source = ProgramSource::classify(locator)?;
    tracing::debug!(input = %source.label(), kind = source_kind(&source), "resolving program");
    source.resolve(include)
}

fn source_kind(source: &ProgramSource) -> &'static str {
    match source {
        ProgramSource::Resolved(_) => "resolved",
        ProgramSource::Inline(_) => "inline",
        ProgramSource::SerializedBytes { .. } => "serialized",
        ProgramSource::SourceFile { .. } => "chialisp",
        ProgramSource::CompiledFile { .. } => "clvm",
    }
}

/// A `(mod` token followed by whitespace.
fn declares_module(text: &str) -> bool {
    text.match_indices("(mod").any(|(i, m)| {
        text[i + m.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
    })
}

fn compile_module(path: &Path, text: &str, include: &[PathBuf]) -> Result<Vec<u8>, String> {
    let mut search_paths: Vec<String> = include
        .iter()
        .map(|dir| dir.to_string_lossy().into_owned())
        .collect();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        search_paths.push(parent.to_string_lossy().into_owned());
    }
    search_paths.push(".".to_string());

    let file_name = path.to_string_lossy().into_owned();
    let opts = Rc::new(DefaultCompilerOpts::new(&file_name)).set_search_paths(&search_paths);
    let mut symbol_table = HashMap::new();

    let mut a = CompilerAllocator::new();
    let node = compile_clvm_text(&mut a, opts, &mut symbol_table, text, &file_name, false)
        .map_err(|e| format!("compile error: {e:?}"))?;
    compiler_node_to_bytes(&a, node).map_err(|e| e.to_string())
}

// clvm_tools_rs runs on its own clvmr release, so its output crosses over as bytes
fn assemble_bytes(text: &str) -> Result<Vec<u8>, String> {
    let mut a = CompilerAllocator::new();
    let node = assemble_text(&mut a, text).map_err(|e| format!("{e:?}"))?;
    compiler_node_to_bytes(&a, node).map_err(|e| e.to_string())
}

/// Serialized CLVM must hold exactly one object and nothing after it.
fn check_serialized(bytes: &[u8]) -> Result<(), String> {
    let length = serialized_length_from_bytes(bytes).map_err(|e| e.to_string())?;
    if length != bytes.len() as u64 {
        return Err(format!(
            "{} trailing bytes after the program",
            (bytes.len() as u64).saturating_sub(length)
        ));
    }
    Ok(())
}

/// Assemble a single CLVM expression, e.g. a curry argument.
pub fn assemble(expr: &str) -> Result<Program, IssuanceError> {
    let assembly_error = |reason: String| IssuanceError::Assembly {
        expr: expr.to_string(),
        reason,
    };

    assemble_bytes(expr)
        .map(Program::from)
        .map_err(assembly_error)
}

/// Load a program into an allocator.
pub fn load(a: &mut Allocator, program: &Program) -> Result<NodePtr, IssuanceError> {
    node_from_bytes(a, program.as_ref()).map_err(|e| IssuanceError::Alloc(e.to_string()))
}

/// Serialize a node back into an owned program.
pub fn to_program(a: &Allocator, node: NodePtr) -> Result<Program, String> {
    node_to_bytes(a, node)
        .map(Program::from)
        .map_err(|e| e.to_string())
}

/// The tree hash of a program.
pub fn tree_hash(program: &Program) -> Result<Bytes32, IssuanceError> {
    let mut a = Allocator::new();
    let node = load(&mut a, program)?;
    Ok(clvm_utils::tree_hash(&a, node).into())
}

/// Curry `args` into `program`.
///
/// Currying an already curried program extends its argument list instead of
/// nesting, so currying twice is the same as currying once with both argument
/// lists. An empty `args` returns the program untouched.
pub fn curry(program: &Program, args: &[Program]) -> Result<Program, IssuanceError> {
    if args.is_empty() {
        return Ok(program.clone());
    }

    let mut a = Allocator::new();
    let node = load(&mut a, program)?;
    let (base, mut all_args) = uncurry_node(&a, node).unwrap_or((node, Vec::new()));
    for arg in args {
        all_args.push(load(&mut a, arg)?);
    }

    let curried = curry_node(&mut a, base, &all_args)?;
    to_program(&a, curried).map_err(IssuanceError::Serialize)
}

/// Split a curried program into its base program and curried arguments.
pub fn uncurry(program: &Program) -> Result<Option<(Program, Vec<Program>)>, IssuanceError> {
    let mut a = Allocator::new();
    let node = load(&mut a, program)?;
    let Some((base, args)) = uncurry_node(&a, node) else {
        return Ok(None);
    };

    let base = to_program(&a, base).map_err(IssuanceError::Serialize)?;
    let args = args
        .into_iter()
        .map(|arg| to_program(&a, arg).map_err(IssuanceError::Serialize))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some((base, args)))
}

// (c (q . arg) rest) ... terminated by the environment atom 1
fn curry_node(a: &mut Allocator, program: NodePtr, args: &[NodePtr]) -> Result<NodePtr, IssuanceError> {
    let alloc_error = |e: clvm_traits::ToClvmError| IssuanceError::Alloc(format!("{e:?}"));

    let mut env = 1u8.to_clvm(a).map_err(alloc_error)?;
    for arg in args.iter().rev() {
        env = (4u8, ((1u8, *arg), (env, ())))
            .to_clvm(a)
            .map_err(alloc_error)?;
    }

    CurriedProgram { program, args: env }
        .to_clvm(a)
        .map_err(alloc_error)
}

fn uncurry_node(a: &Allocator, node: NodePtr) -> Option<(NodePtr, Vec<NodePtr>)> {
    let curried = CurriedProgram::<NodePtr, NodePtr>::from_clvm(a, node).ok()?;

    let mut args = Vec::new();
    let mut env = curried.args;
    loop {
        if matches!(u8::from_clvm(a, env), Ok(1)) {
            return Some((curried.program, args));
        }
        let (op, ((quote, arg), (rest, ()))) =
            <(u8, ((u8, NodePtr), (NodePtr, ())))>::from_clvm(a, env).ok()?;
        if op != 4 || quote != 1 {
            return None;
        }
        args.push(arg);
        env = rest;
    }
}
