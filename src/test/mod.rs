//! Factories and instrumented collaborators for unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    disassembler::{CilWalker, Instruction, InstructionWalker},
    metadata::{
        builder::{MethodDefBuilder, ModuleBuilder, TypeDefBuilder},
        identity::AssemblyIdentity,
        references::{MethodReference, TypeReference},
        token::Token,
    },
    sandbox::{Policy, Verifier},
    Result,
};

/// A [`CilWalker`] that counts the bodies it is asked to decode.
#[derive(Debug, Default)]
pub struct CountingWalker {
    walks: AtomicUsize,
}

impl CountingWalker {
    pub fn walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }
}

impl InstructionWalker for CountingWalker {
    fn walk<'a>(&self, code: &'a [u8]) -> Box<dyn Iterator<Item = Result<Instruction>> + 'a> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        CilWalker.walk(code)
    }
}

/// A verifier for `policy` decoding through a fresh [`CountingWalker`].
pub fn counting_verifier(policy: Policy) -> (Verifier, Arc<CountingWalker>) {
    let walker = Arc::new(CountingWalker::default());
    let verifier = Verifier::with_walker(Arc::new(policy), walker.clone());
    (verifier, walker)
}

/// `opcode <token>`
pub fn with_token(opcode: u8, token: Token) -> Vec<u8> {
    let mut code = vec![opcode];
    code.extend_from_slice(&token.value().to_le_bytes());
    code
}

/// `call <token>; ret`
pub fn call(token: Token) -> Vec<u8> {
    let mut code = with_token(0x28, token);
    code.push(0x2A);
    code
}

pub fn scoped(namespace: &str, name: &str, assembly: &str) -> TypeReference {
    TypeReference::new(namespace, name).with_scope(AssemblyIdentity::simple(assembly))
}

pub fn file_delete() -> MethodReference {
    MethodReference::new(scoped("System.IO", "File", "System.IO"), "Delete", "Void")
}

/// A module of assembly `Plugin` with one type `Plugin.Main`.
pub fn plugin() -> ModuleBuilder {
    let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
    TypeDefBuilder::new()
        .namespace("Plugin")
        .name("Main")
        .extends(scoped("System", "Object", "mscorlib"))
        .build(&mut module)
        .unwrap();
    module
}

/// `plugin()` with a public method `Run` whose body calls `System.IO.File.Delete`.
pub fn plugin_calling_delete() -> ModuleBuilder {
    let mut module = plugin();
    let delete = module.member_ref(file_delete());
    MethodDefBuilder::new()
        .name("Run")
        .public()
        .code(call(delete))
        .build(&mut module)
        .unwrap();
    module
}
