//! The DWARF expression stack machine.
//!
//! Location expressions and CFA expressions share this evaluator. The
//! machine works on target-sized unsigned integers; comparisons and
//! division reinterpret their operands as signed two's-complement values.
//! The result distinguishes a computed *address*, a computed *value*, and
//! the degenerate "the datum lives in register N" description.

#![allow(non_upper_case_globals)]

use crate::reader::{Block, Cursor, Reader};
use crate::{Error, Result};

/// What an expression evaluated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprResult {
    /// The value itself (stack-value and implicit-value descriptions).
    Value(u64),
    /// The address where the value lives.
    Address(u64),
    /// The register holding the value (a bare register-name description).
    Register(u16),
}

/// The machine's view of the frame being evaluated against.
pub trait ExprContext {
    /// Current value of a register, by DWARF number.
    fn register(&self, reg: u16) -> Result<u64>;

    /// Reads `size` bytes of target memory as a little-endian integer.
    fn read_memory(&self, addr: u64, size: u8) -> Result<u64>;

    /// The frame base, for `DW_OP_fbreg`.
    fn frame_base(&self) -> Result<u64>;

    /// The canonical frame address, for `DW_OP_call_frame_cfa`.
    fn cfa(&self) -> Result<u64>;
}

fn pop(stack: &mut Vec<u64>) -> Result<u64> {
    stack.pop().ok_or(Error::Expression("stack underflow"))
}

fn peek(stack: &[u64], depth: usize) -> Result<u64> {
    if depth >= stack.len() {
        return Err(Error::Expression("stack underflow"));
    }
    Ok(stack[stack.len() - 1 - depth])
}

/// Evaluates the expression in `block` of `io`.
pub fn evaluate(
    io: &dyn Reader,
    block: Block,
    address_size: u8,
    ctx: &dyn ExprContext,
) -> Result<ExprResult> {
    let mut cur = Cursor::block(io, block);
    let mut stack: Vec<u64> = Vec::new();

    while !cur.is_empty() {
        let op = cur.u8()?;
        match op {
            DW_OP_addr => stack.push(cur.uint(address_size as usize)?),

            DW_OP_deref => {
                let addr = pop(&mut stack)?;
                stack.push(ctx.read_memory(addr, address_size)?);
            }
            DW_OP_deref_size => {
                let size = cur.u8()?;
                if size == 0 || size > 8 {
                    return Err(Error::Expression("bad deref size"));
                }
                let addr = pop(&mut stack)?;
                stack.push(ctx.read_memory(addr, size)?);
            }

            DW_OP_const1u => stack.push(cur.u8()? as u64),
            DW_OP_const1s => stack.push(cur.i8()? as i64 as u64),
            DW_OP_const2u => stack.push(cur.u16()? as u64),
            DW_OP_const2s => stack.push(cur.u16()? as i16 as i64 as u64),
            DW_OP_const4u => stack.push(cur.u32()? as u64),
            DW_OP_const4s => stack.push(cur.u32()? as i32 as i64 as u64),
            DW_OP_const8u | DW_OP_const8s => stack.push(cur.u64()?),
            DW_OP_constu => stack.push(cur.uleb128()?),
            DW_OP_consts => stack.push(cur.sleb128()? as u64),

            DW_OP_dup => {
                let top = peek(&stack, 0)?;
                stack.push(top);
            }
            DW_OP_drop => {
                pop(&mut stack)?;
            }
            DW_OP_over => {
                let second = peek(&stack, 1)?;
                stack.push(second);
            }
            DW_OP_pick => {
                let depth = cur.u8()? as usize;
                let picked = peek(&stack, depth)?;
                stack.push(picked);
            }
            DW_OP_swap => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(a);
                stack.push(b);
            }
            DW_OP_rot => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                let c = pop(&mut stack)?;
                stack.push(a);
                stack.push(c);
                stack.push(b);
            }

            DW_OP_abs => {
                let a = pop(&mut stack)?;
                stack.push((a as i64).wrapping_abs() as u64);
            }
            DW_OP_and => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b & a);
            }
            DW_OP_div => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                if a == 0 {
                    return Err(Error::Expression("division by zero"));
                }
                stack.push((b as i64).wrapping_div(a as i64) as u64);
            }
            DW_OP_minus => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b.wrapping_sub(a));
            }
            DW_OP_mod => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                if a == 0 {
                    return Err(Error::Expression("division by zero"));
                }
                stack.push(b % a);
            }
            DW_OP_mul => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b.wrapping_mul(a));
            }
            DW_OP_neg => {
                let a = pop(&mut stack)?;
                stack.push((a as i64).wrapping_neg() as u64);
            }
            DW_OP_not => {
                let a = pop(&mut stack)?;
                stack.push(!a);
            }
            DW_OP_or => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b | a);
            }
            DW_OP_plus => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b.wrapping_add(a));
            }
            DW_OP_plus_uconst => {
                let addend = cur.uleb128()?;
                let a = pop(&mut stack)?;
                stack.push(a.wrapping_add(addend));
            }
            DW_OP_shl => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(if a >= 64 { 0 } else { b << a });
            }
            DW_OP_shr => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(if a >= 64 { 0 } else { b >> a });
            }
            DW_OP_shra => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(((b as i64) >> a.min(63)) as u64);
            }
            DW_OP_xor => {
                let a = pop(&mut stack)?;
                let b = pop(&mut stack)?;
                stack.push(b ^ a);
            }

            DW_OP_bra => {
                let disp = cur.uint(2)? as u16 as i16;
                let taken = pop(&mut stack)? != 0;
                if taken {
                    branch(&mut cur, block, disp)?;
                }
            }
            DW_OP_skip => {
                let disp = cur.uint(2)? as u16 as i16;
                branch(&mut cur, block, disp)?;
            }

            DW_OP_eq | DW_OP_ge | DW_OP_gt | DW_OP_le | DW_OP_lt | DW_OP_ne => {
                let a = pop(&mut stack)? as i64;
                let b = pop(&mut stack)? as i64;
                let hit = match op {
                    DW_OP_eq => b == a,
                    DW_OP_ge => b >= a,
                    DW_OP_gt => b > a,
                    DW_OP_le => b <= a,
                    DW_OP_lt => b < a,
                    _ => b != a,
                };
                stack.push(hit as u64);
            }

            DW_OP_lit0..=DW_OP_lit31 => stack.push((op - DW_OP_lit0) as u64),

            DW_OP_reg0..=DW_OP_reg31 => {
                return register_result(&cur, &stack, (op - DW_OP_reg0) as u16);
            }
            DW_OP_regx => {
                let reg = cur.uleb128()?;
                return register_result(&cur, &stack, reg as u16);
            }

            DW_OP_breg0..=DW_OP_breg31 => {
                let off = cur.sleb128()?;
                let base = ctx.register((op - DW_OP_breg0) as u16)?;
                stack.push(base.wrapping_add_signed(off));
            }
            DW_OP_bregx => {
                let reg = cur.uleb128()?;
                let off = cur.sleb128()?;
                let base = ctx.register(reg as u16)?;
                stack.push(base.wrapping_add_signed(off));
            }

            DW_OP_fbreg => {
                let off = cur.sleb128()?;
                stack.push(ctx.frame_base()?.wrapping_add_signed(off));
            }
            DW_OP_call_frame_cfa => stack.push(ctx.cfa()?),

            DW_OP_nop => {}

            DW_OP_implicit_value => {
                let len = cur.uleb128()?;
                if len == 0 || len > 8 {
                    return Err(Error::Expression("implicit value width"));
                }
                let v = cur.uint(len as usize)?;
                return Ok(ExprResult::Value(v));
            }
            DW_OP_stack_value => {
                let v = pop(&mut stack)?;
                return Ok(ExprResult::Value(v));
            }

            _ => return Err(Error::Expression("unsupported operation")),
        }
    }

    Ok(ExprResult::Address(pop(&mut stack)?))
}

/// A register-name description must be the entire expression.
fn register_result(cur: &Cursor, stack: &[u64], reg: u16) -> Result<ExprResult> {
    if !cur.is_empty() || !stack.is_empty() {
        return Err(Error::Expression("register name is not alone"));
    }
    Ok(ExprResult::Register(reg))
}

/// Applies a signed displacement, measured from the byte after the
/// operand, staying within the expression block.
fn branch(cur: &mut Cursor, block: Block, disp: i16) -> Result<()> {
    let target = cur.offset() as i64 + disp as i64;
    if target < block.offset as i64 || target > (block.offset + block.length) as i64 {
        return Err(Error::Expression("branch out of expression"));
    }
    cur.seek(target as u64)
}

const DW_OP_addr: u8 = 0x03;
const DW_OP_deref: u8 = 0x06;
const DW_OP_const1u: u8 = 0x08;
const DW_OP_const1s: u8 = 0x09;
const DW_OP_const2u: u8 = 0x0a;
const DW_OP_const2s: u8 = 0x0b;
const DW_OP_const4u: u8 = 0x0c;
const DW_OP_const4s: u8 = 0x0d;
const DW_OP_const8u: u8 = 0x0e;
const DW_OP_const8s: u8 = 0x0f;
const DW_OP_constu: u8 = 0x10;
const DW_OP_consts: u8 = 0x11;
const DW_OP_dup: u8 = 0x12;
const DW_OP_drop: u8 = 0x13;
const DW_OP_over: u8 = 0x14;
const DW_OP_pick: u8 = 0x15;
const DW_OP_swap: u8 = 0x16;
const DW_OP_rot: u8 = 0x17;
const DW_OP_abs: u8 = 0x19;
const DW_OP_and: u8 = 0x1a;
const DW_OP_div: u8 = 0x1b;
const DW_OP_minus: u8 = 0x1c;
const DW_OP_mod: u8 = 0x1d;
const DW_OP_mul: u8 = 0x1e;
const DW_OP_neg: u8 = 0x1f;
const DW_OP_not: u8 = 0x20;
const DW_OP_or: u8 = 0x21;
const DW_OP_plus: u8 = 0x22;
const DW_OP_plus_uconst: u8 = 0x23;
const DW_OP_shl: u8 = 0x24;
const DW_OP_shr: u8 = 0x25;
const DW_OP_shra: u8 = 0x26;
const DW_OP_xor: u8 = 0x27;
const DW_OP_bra: u8 = 0x28;
const DW_OP_eq: u8 = 0x29;
const DW_OP_ge: u8 = 0x2a;
const DW_OP_gt: u8 = 0x2b;
const DW_OP_le: u8 = 0x2c;
const DW_OP_lt: u8 = 0x2d;
const DW_OP_ne: u8 = 0x2e;
const DW_OP_skip: u8 = 0x2f;
const DW_OP_lit0: u8 = 0x30;
const DW_OP_lit31: u8 = 0x4f;
const DW_OP_reg0: u8 = 0x50;
const DW_OP_reg31: u8 = 0x6f;
const DW_OP_breg0: u8 = 0x70;
const DW_OP_breg31: u8 = 0x8f;
const DW_OP_regx: u8 = 0x90;
const DW_OP_fbreg: u8 = 0x91;
const DW_OP_bregx: u8 = 0x92;
const DW_OP_deref_size: u8 = 0x94;
const DW_OP_nop: u8 = 0x96;
const DW_OP_call_frame_cfa: u8 = 0x9c;
const DW_OP_implicit_value: u8 = 0x9e;
const DW_OP_stack_value: u8 = 0x9f;
