//! Cranelift-based JIT compiler backend
//!
//! Provides real native code generation using Cranelift for function bodies
//! inside the integer subset. Every generated function has the signature
//! `extern "C" fn(*const i64) -> i64`: it reads its parameters from the
//! argument pointer and returns an integer or a 0/1 boolean.

use std::sync::Arc;

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{types, AbiParam, InstBuilder, MemFlags, Value as ClValue};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};

use core_types::CompiledCode;
use interpreter::{BackendError, CompileRequest, CompilerBackend};

use crate::cache::{fingerprint, CodeCache};
use crate::compiled::{Entry, NativeCode};
use crate::error::CompileError;
use crate::ir::{self, ArithOp, Comparison, IrExpr, IrFunction};

/// Cranelift-based JIT compiler backend
///
/// Compiles hot Kai functions to native machine code using Cranelift.
pub struct CraneliftBackend {
    module: JITModule,
    ctx: Context,
    builder_ctx: FunctionBuilderContext,
    func_counter: u32,
    cache: CodeCache,
}

// SAFETY: the module is only touched through `&mut self`, it holds no
// thread-local state, and finalized code memory is immutable.
unsafe impl Send for CraneliftBackend {}

impl CraneliftBackend {
    /// Create a new Cranelift backend for the host machine
    pub fn new() -> Result<Self, CompileError> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", "speed")
            .map_err(CompileError::codegen)?;
        flag_builder
            .set("is_pic", "false")
            .map_err(CompileError::codegen)?;

        let isa_builder = cranelift_native::builder().map_err(CompileError::codegen)?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(CompileError::codegen)?;

        let builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        let module = JITModule::new(builder);
        let ctx = module.make_context();

        Ok(Self {
            module,
            ctx,
            builder_ctx: FunctionBuilderContext::new(),
            func_counter: 0,
            cache: CodeCache::new(),
        })
    }

    /// The compiled-code cache
    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }

    /// Mutable access to the compiled-code cache
    pub fn cache_mut(&mut self) -> &mut CodeCache {
        &mut self.cache
    }

    /// Lower, generate and finalize one function, consulting the cache
    pub fn compile_lambda(
        &mut self,
        request: &CompileRequest<'_>,
    ) -> Result<Arc<NativeCode>, CompileError> {
        let function = ir::lower(request.code, request.primitives)?;
        let key = fingerprint(request.code, &function.guards);
        if let Some(code) = self.cache.get(key, &function) {
            return Ok(code);
        }

        let entry = self.compile_function(&function)?;
        let code = Arc::new(NativeCode::new(
            entry,
            function.arity,
            function.returns,
            function.guards.clone(),
            key,
        ));
        self.cache.insert(key, function, Arc::clone(&code));
        Ok(code)
    }

    fn compile_function(&mut self, function: &IrFunction) -> Result<Entry, CompileError> {
        self.build_ir(function);

        // Generate unique function name
        let func_name = format!("kai_fn_{}", self.func_counter);
        self.func_counter += 1;

        let declared = self
            .module
            .declare_function(&func_name, Linkage::Export, &self.ctx.func.signature)
            .map_err(CompileError::codegen);
        let defined = declared.and_then(|id| {
            self.module
                .define_function(id, &mut self.ctx)
                .map(|()| id)
                .map_err(CompileError::codegen)
        });
        // Clear context for reuse, also after a failure
        self.module.clear_context(&mut self.ctx);
        let id = defined?;

        self.module
            .finalize_definitions()
            .map_err(CompileError::codegen)?;
        let code_ptr = self.module.get_finalized_function(id);

        // SAFETY: the function was declared with the `Entry` signature and is
        // finalized; JIT memory is never freed while the process runs.
        Ok(unsafe { std::mem::transmute::<*const u8, Entry>(code_ptr) })
    }

    fn build_ir(&mut self, function: &IrFunction) {
        let pointer = self.module.target_config().pointer_type();
        let mut sig = self.module.make_signature();
        sig.params.push(AbiParam::new(pointer));
        sig.returns.push(AbiParam::new(types::I64));
        self.ctx.func.signature = sig;

        let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_ctx);
        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);

        let args = builder.block_params(entry_block)[0];
        let result = translate(&mut builder, args, &function.body);
        builder.ins().return_(&[result]);
        builder.seal_all_blocks();
        builder.finalize();
    }
}

/// Emit `expr`; every value is an i64
fn translate(builder: &mut FunctionBuilder<'_>, args: ClValue, expr: &IrExpr) -> ClValue {
    match expr {
        IrExpr::Integer(n) => builder.ins().iconst(types::I64, *n),
        IrExpr::Boolean(b) => builder.ins().iconst(types::I64, i64::from(*b)),
        IrExpr::Param(index) => {
            let offset = (index * std::mem::size_of::<i64>()) as i32;
            builder
                .ins()
                .load(types::I64, MemFlags::trusted(), args, offset)
        }
        IrExpr::Arith { op, args: operands } => {
            let values: Vec<ClValue> = operands
                .iter()
                .map(|operand| translate(builder, args, operand))
                .collect();
            let Some((first, rest)) = values.split_first() else {
                return builder.ins().iconst(types::I64, 0);
            };
            rest.iter().fold(*first, |acc, &value| match op {
                ArithOp::Add => builder.ins().iadd(acc, value),
                ArithOp::Sub => builder.ins().isub(acc, value),
                ArithOp::Mul => builder.ins().imul(acc, value),
            })
        }
        IrExpr::Negate(operand) => {
            let value = translate(builder, args, operand);
            builder.ins().ineg(value)
        }
        IrExpr::Compare { cmp, lhs, rhs } => {
            let lhs = translate(builder, args, lhs);
            let rhs = translate(builder, args, rhs);
            let cc = match cmp {
                Comparison::Less => IntCC::SignedLessThan,
                Comparison::Greater => IntCC::SignedGreaterThan,
                Comparison::LessEqual => IntCC::SignedLessThanOrEqual,
                Comparison::GreaterEqual => IntCC::SignedGreaterThanOrEqual,
                Comparison::Equal => IntCC::Equal,
            };
            let flag = builder.ins().icmp(cc, lhs, rhs);
            builder.ins().uextend(types::I64, flag)
        }
        IrExpr::Not(operand) => {
            let value = translate(builder, args, operand);
            let flag = builder.ins().icmp_imm(IntCC::Equal, value, 0);
            builder.ins().uextend(types::I64, flag)
        }
        IrExpr::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let condition = translate(builder, args, condition);
            let then_block = builder.create_block();
            let else_block = builder.create_block();
            let merge_block = builder.create_block();
            builder.append_block_param(merge_block, types::I64);

            builder.ins().brif(condition, then_block, &[], else_block, &[]);

            builder.switch_to_block(then_block);
            let then_value = translate(builder, args, then_branch);
            builder.ins().jump(merge_block, &[then_value]);

            builder.switch_to_block(else_block);
            let else_value = translate(builder, args, else_branch);
            builder.ins().jump(merge_block, &[else_value]);

            builder.switch_to_block(merge_block);
            builder.block_params(merge_block)[0]
        }
    }
}

impl CompilerBackend for CraneliftBackend {
    fn name(&self) -> &str {
        "cranelift"
    }

    fn compile(
        &mut self,
        request: &CompileRequest<'_>,
    ) -> Result<Arc<dyn CompiledCode>, BackendError> {
        match self.compile_lambda(request) {
            Ok(code) => {
                tracing::debug!(
                    fingerprint = code.fingerprint(),
                    arity = code.arity(),
                    "compiled function"
                );
                Ok(code)
            }
            Err(error) => {
                tracing::debug!(%error, "function left to the interpreter");
                Err(error.into())
            }
        }
    }
}

impl std::fmt::Debug for CraneliftBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CraneliftBackend")
            .field("functions", &self.func_counter)
            .field("cache", &self.cache.len())
            .finish_non_exhaustive()
    }
}
