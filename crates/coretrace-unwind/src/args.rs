//! Resolving a frame's function arguments.
//!
//! Given a frame whose function entry is known, each formal parameter's
//! location expression is evaluated against the frame's registers, CFA and
//! frame base. The result is a typed location; rendering the value behind
//! it is the front-end's business.

use coretrace_dwarf::expr::{evaluate, ExprResult};
use coretrace_dwarf::{DwAt, DwTag};

use crate::target::Target;
use crate::walker::{Frame, FrameContext};

/// Where one argument lives in this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLocation {
    /// In target memory at this address.
    Address(u64),
    /// In this register.
    Register(u16),
    /// The value itself, computed by the expression.
    Value(u64),
    /// A compile-time constant (`DW_AT_const_value`).
    Const(i64),
}

/// One formal parameter of the frame's function.
#[derive(Debug, Clone)]
pub struct FrameArg {
    pub name: Option<String>,
    /// `None` when the parameter has no resolvable location here.
    pub location: Option<ArgLocation>,
}

/// Resolves the formal parameters of `frame`'s function, in declaration
/// order. Empty when the frame has no resolved function.
pub fn frame_arguments(target: &dyn Target, frame: &Frame) -> Vec<FrameArg> {
    let (Some(function), Some(object)) = (&frame.function, &frame.object) else {
        return Vec::new();
    };
    let Some(info) = &object.dwarf else {
        return Vec::new();
    };

    // The function's frame base anchors fbreg locations; it is usually
    // just the CFA.
    let frame_base = function.block_attr(DwAt::FrameBase).and_then(|block| {
        let ctx = FrameContext {
            regs: &frame.regs,
            memory: target.memory(),
            cfa: frame.cfa,
            frame_base: None,
        };
        match evaluate(info.reader().as_ref(), block, info.address_size(), &ctx) {
            Ok(ExprResult::Value(v)) | Ok(ExprResult::Address(v)) => Some(v),
            Ok(ExprResult::Register(reg)) => frame.regs.get(reg),
            Err(err) => {
                log::debug!("frame base of {:#x} did not evaluate: {err}", frame.ip);
                None
            }
        }
    });

    let mut args = Vec::new();
    for child in function.children() {
        if child.tag() != DwTag::FormalParameter {
            continue;
        }
        let name = child.name(info);

        let location = if let Some(block) = child.block_attr(DwAt::Location) {
            let ctx = FrameContext {
                regs: &frame.regs,
                memory: target.memory(),
                cfa: frame.cfa,
                frame_base,
            };
            match evaluate(info.reader().as_ref(), block, info.address_size(), &ctx) {
                Ok(ExprResult::Address(a)) => Some(ArgLocation::Address(a)),
                Ok(ExprResult::Value(v)) => Some(ArgLocation::Value(v)),
                Ok(ExprResult::Register(r)) => Some(ArgLocation::Register(r)),
                Err(err) => {
                    log::debug!(
                        "location of parameter {:?} did not evaluate: {err}",
                        name
                    );
                    None
                }
            }
        } else {
            child.signed_attr(DwAt::ConstValue).map(ArgLocation::Const)
        };

        args.push(FrameArg { name, location });
    }
    args
}
