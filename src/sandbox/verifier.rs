//! The fail-fast verification loop.
//!
//! [`Verifier::check`] walks a module in a fixed order and stops at the first finding:
//!
//! 1. the module's own assembly identity
//! 2. every declared type, in declaration order: the type, then its direct ancestor
//! 3. the type's fields
//! 4. the type's constructors and methods: the method itself, its required attributes, then
//!    every instruction of its body (the referenced symbol first, the instruction second)
//! 5. the type's properties: each accessor gets the checks of step 4
//!
//! A denied type is reported before any of its methods is decoded. Anything that prevents a
//! complete analysis (an undecodable body, a token that does not resolve, an exhausted
//! [`ScanConfig`] limit) makes the result [`CheckResult::Unverifiable`].

use std::{sync::Arc, time::Instant};

use rayon::prelude::*;

use crate::{
    disassembler::{CilWalker, Instruction, InstructionWalker},
    metadata::{
        method::MethodDef,
        module::Module,
        typesystem::{PropertyDef, TypeDef},
    },
    sandbox::{
        classify::{
            classify_assembly, classify_attributes, classify_field, classify_method,
            classify_operand, classify_property, classify_reference, classify_type,
            classify_type_on_base,
        },
        config::ScanConfig,
        descriptor::{MethodRole, OperandOwner, SymbolDescriptor},
        policy::{Policy, RuleKind},
        result::{BlockReason, CheckResult, Unverifiable, UnverifiableReason, Violation},
    },
};

/// Instructions decoded between two deadline checks.
const DEADLINE_INTERVAL: usize = 1024;

/// Verifies modules against one [`Policy`] snapshot.
///
/// A `Verifier` holds no per-scan state and is `Send + Sync`; share it between threads or
/// use [`Verifier::check_all`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use cilguard::{Policy, Verifier};
/// use cilguard::metadata::{builder::*, identity::AssemblyIdentity, references::*};
///
/// let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
/// let delete = module.member_ref(MethodReference::new(
///     TypeReference::new("System.IO", "File").with_scope(AssemblyIdentity::simple("System.IO")),
///     "Delete",
///     "Void",
/// ));
///
/// let mut code = vec![0x28];
/// code.extend_from_slice(&delete.value().to_le_bytes());
/// code.push(0x2A);
///
/// TypeDefBuilder::new().namespace("Plugin").name("Main").build(&mut module)?;
/// MethodDefBuilder::new().name("Run").public().code(code).build(&mut module)?;
///
/// let policy = Policy::builder().deny_assembly("System.IO").build()?;
/// let result = Verifier::new(Arc::new(policy)).check(&module.build());
///
/// let violation = result.violation().unwrap();
/// assert!(violation.illegal_instruction.to_string().starts_with("[METHOD]"));
/// # Ok::<(), cilguard::Error>(())
/// ```
#[derive(Clone)]
pub struct Verifier {
    policy: Arc<Policy>,
    walker: Arc<dyn InstructionWalker>,
    config: ScanConfig,
}

impl Verifier {
    /// Verifier decoding ECMA-335 CIL with the default [`ScanConfig`].
    #[must_use]
    pub fn new(policy: Arc<Policy>) -> Self {
        Self::with_walker(policy, Arc::new(CilWalker))
    }

    /// Verifier using a custom instruction walker.
    #[must_use]
    pub fn with_walker(policy: Arc<Policy>, walker: Arc<dyn InstructionWalker>) -> Self {
        Verifier {
            policy,
            walker,
            config: ScanConfig::default(),
        }
    }

    /// Replace the scan limits.
    #[must_use]
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// The policy this verifier checks against.
    #[must_use]
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// The scan limits.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Verify one module.
    #[must_use]
    pub fn check(&self, module: &Module) -> CheckResult {
        let started = Instant::now();
        let scan = Scan {
            verifier: self,
            module,
            deadline: self
                .config
                .time_budget
                .and_then(|budget| started.checked_add(budget)),
        };

        let result = match scan.run() {
            Ok(()) => CheckResult::Passed,
            Err(Stop::Rejected(violation)) => CheckResult::Rejected(violation),
            Err(Stop::Unverifiable(unverifiable)) => CheckResult::Unverifiable(unverifiable),
        };

        let name = module.assembly().simple_name();
        let elapsed = started.elapsed();
        match &result {
            CheckResult::Passed => log::debug!("{} passed in {:?}", name, elapsed),
            CheckResult::Rejected(violation) => {
                log::debug!("{} rejected in {:?}: {}", name, elapsed, violation);
            }
            CheckResult::Unverifiable(unverifiable) => {
                log::warn!("{} refused: {}", name, unverifiable);
            }
        }
        result
    }

    /// Verify several modules in parallel. Results are in input order.
    #[must_use]
    pub fn check_all(&self, modules: &[Module]) -> Vec<CheckResult> {
        modules.par_iter().map(|module| self.check(module)).collect()
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("rules", &self.policy.rule_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `ldstr` takes a user string and `calli` a signature. Every other token operand names a
/// type or member.
fn takes_symbol(instruction: &Instruction) -> bool {
    !matches!(instruction.mnemonic, "ldstr" | "calli")
}

/// Why a scan stopped early.
enum Stop {
    Rejected(Violation),
    Unverifiable(Unverifiable),
}

impl Stop {
    fn violation(
        illegal_instruction: SymbolDescriptor,
        position: SymbolDescriptor,
        reason: BlockReason,
    ) -> Self {
        Stop::Rejected(Violation {
            illegal_instruction,
            position,
            reason,
        })
    }

    fn unverifiable(location: Option<&SymbolDescriptor>, reason: UnverifiableReason) -> Self {
        Stop::Unverifiable(Unverifiable {
            location: location.cloned(),
            reason,
        })
    }
}

type ScanResult = std::result::Result<(), Stop>;

/// State of one [`Verifier::check`] call.
struct Scan<'a> {
    verifier: &'a Verifier,
    module: &'a Module,
    deadline: Option<Instant>,
}

impl Scan<'_> {
    fn policy(&self) -> &Policy {
        &self.verifier.policy
    }

    fn run(&self) -> ScanResult {
        let assembly = classify_assembly(self.module.assembly());
        if let Some(reason) = self.policy().evaluate(&assembly) {
            return Err(Stop::violation(assembly.clone(), assembly, reason));
        }

        for ty in self.module.types() {
            self.check_deadline(None)?;
            self.check_type(ty)?;

            for field in &ty.fields {
                let descriptor = SymbolDescriptor::FieldRef(classify_field(ty, field));
                if let Some(reason) = self.policy().evaluate(&descriptor) {
                    return Err(Stop::violation(descriptor.clone(), descriptor, reason));
                }
            }

            for method in &ty.methods {
                self.check_deadline(None)?;
                let method_ref = classify_method(ty, method);
                let role = if method_ref.is_constructor {
                    MethodRole::Constructor
                } else {
                    MethodRole::Method
                };
                self.check_member(
                    SymbolDescriptor::MethodRef(method_ref.clone()),
                    OperandOwner::Method(method_ref),
                    role,
                    method,
                )?;
            }

            for property in &ty.properties {
                self.check_property(ty, property)?;
            }
        }

        Ok(())
    }

    fn check_type(&self, ty: &TypeDef) -> ScanResult {
        let descriptor = classify_type(ty);
        match self.policy().check(&descriptor) {
            Some(matched) if matched.kind == RuleKind::BaseType => {
                let on_base = classify_type_on_base(ty);
                Err(Stop::violation(on_base.clone(), on_base, matched.reason))
            }
            Some(matched) => Err(Stop::violation(
                descriptor.clone(),
                descriptor,
                matched.reason,
            )),
            None => Ok(()),
        }
    }

    fn check_property(&self, ty: &TypeDef, property: &PropertyDef) -> ScanResult {
        for accessor in property.accessors() {
            self.check_deadline(None)?;
            let property_ref = classify_property(ty, property, accessor);
            self.check_member(
                SymbolDescriptor::PropertyRef(property_ref.clone()),
                OperandOwner::Property(property_ref),
                MethodRole::Accessor,
                accessor,
            )?;
        }
        Ok(())
    }

    /// The member itself, its required attributes, then its body.
    fn check_member(
        &self,
        location: SymbolDescriptor,
        owner: OperandOwner,
        role: MethodRole,
        method: &MethodDef,
    ) -> ScanResult {
        if let Some(reason) = self.policy().evaluate(&location) {
            return Err(Stop::violation(location.clone(), location, reason));
        }

        let missing = self.policy().missing_attributes(role, &method.attributes);
        if !missing.is_empty() {
            let mask = classify_attributes(role, missing);
            if let Some(reason) = self.policy().evaluate(&mask) {
                return Err(Stop::violation(mask, location, reason));
            }
        }

        let Some(body) = &method.body else {
            return Ok(());
        };

        if let Some(limit) = self.verifier.config.max_body_size {
            if body.size_code() > limit {
                return Err(Stop::unverifiable(
                    Some(&location),
                    UnverifiableReason::BodyTooLarge {
                        size: body.size_code(),
                        limit,
                    },
                ));
            }
        }

        log::trace!("decoding {} ({} bytes)", location, body.size_code());
        for (index, decoded) in self.verifier.walker.walk(&body.code).enumerate() {
            if index % DEADLINE_INTERVAL == DEADLINE_INTERVAL - 1 {
                self.check_deadline(Some(&location))?;
            }

            let instruction = decoded.map_err(|error| {
                Stop::unverifiable(Some(&location), UnverifiableReason::Decode(error.to_string()))
            })?;
            self.check_instruction(&location, &owner, &instruction)?;
        }

        Ok(())
    }

    /// The referenced symbol, then the instruction position against opcode rules.
    fn check_instruction(
        &self,
        location: &SymbolDescriptor,
        owner: &OperandOwner,
        instruction: &Instruction,
    ) -> ScanResult {
        let operand = match instruction.token() {
            Some(token) if token.is_symbol() => match self.module.resolve(token) {
                Some(reference) => Some(classify_reference(reference)),
                None => {
                    return Err(Stop::unverifiable(
                        Some(location),
                        UnverifiableReason::UnresolvedToken(token),
                    ))
                }
            },
            Some(token) if takes_symbol(instruction) => {
                return Err(Stop::unverifiable(
                    Some(location),
                    UnverifiableReason::UnexpectedToken {
                        opcode: instruction.mnemonic,
                        token,
                    },
                ))
            }
            _ => None,
        };

        let position = classify_operand(owner, instruction, operand.as_ref());
        if let Some(symbol) = operand {
            if let Some(reason) = self.policy().evaluate(&symbol) {
                return Err(Stop::violation(symbol, position, reason));
            }
        }

        if let Some(reason) = self.policy().evaluate(&position) {
            return Err(Stop::violation(position.clone(), position, reason));
        }

        Ok(())
    }

    fn check_deadline(&self, location: Option<&SymbolDescriptor>) -> ScanResult {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Stop::unverifiable(
                location,
                UnverifiableReason::BudgetExceeded,
            )),
            _ => Ok(()),
        }
    }
}
