#![no_main]

use std::sync::Arc;

use cilguard::disassembler::decode_stream;
use cilguard::metadata::{
    builder::{MethodDefBuilder, ModuleBuilder, TypeDefBuilder},
    identity::AssemblyIdentity,
    method::MethodBody,
};
use cilguard::{Policy, Verifier};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_stream(data);
    let _ = MethodBody::parse(data);

    let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Fuzz"));
    if TypeDefBuilder::new().name("Target").build(&mut module).is_ok()
        && MethodDefBuilder::new().name("Run").code(data).build(&mut module).is_ok()
    {
        let result = Verifier::new(Arc::new(Policy::default())).check(&module.build());
        assert!(result.violation().is_none());
    }
});
