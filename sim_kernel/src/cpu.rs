//! # CPU
//!
//! An 8-bit accumulator machine with X and Y index registers, a zero flag and
//! a 16-bit program counter. Addresses are partition-relative and encoded
//! little-endian after the opcode.
//!
//! ## Instruction set
//!
//! | opcode | mnemonic | operand | effect |
//! |---|---|---|---|
//! | `A9` | LDA | `#imm` | ACC = imm |
//! | `AD` | LDA | `addr` | ACC = mem[addr] |
//! | `8D` | STA | `addr` | mem[addr] = ACC |
//! | `6D` | ADC | `addr` | ACC = ACC + mem[addr] (wrapping) |
//! | `A2` | LDX | `#imm` | X = imm |
//! | `AE` | LDX | `addr` | X = mem[addr] |
//! | `A0` | LDY | `#imm` | Y = imm |
//! | `AC` | LDY | `addr` | Y = mem[addr] |
//! | `EA` | NOP | | |
//! | `00` | BRK | | process completes |
//! | `EC` | CPX | `addr` | Z = (X == mem[addr]) |
//! | `D0` | BNE | `rel` | if !Z, PC = (PC + rel) mod partition size |
//! | `EE` | INC | `addr` | mem[addr] = mem[addr] + 1 (wrapping) |
//! | `FF` | SYS | | X=1 print Y as a number, X=2 print string at Y |
//!
//! The CPU executes exactly one instruction per `step` and only while the
//! executing flag is set.

use crate::memory::{Bounds, Memory};
use hal::ConsoleDevice;
use kernel_api::Registers;
use thiserror::Error;

/// Execution faults
///
/// A fault terminates the offending process; it never stops the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuFault {
    #[error("invalid opcode {opcode:#04x} at {pc:#06x}")]
    InvalidOpcode { opcode: u8, pc: u16 },

    #[error("program counter {pc:#06x} is outside the partition")]
    PcOutOfBounds { pc: u16 },

    #[error("address {address:#06x} is outside the partition")]
    AddressOutOfBounds { address: u16 },

    #[error("invalid system call {x}")]
    InvalidSystemCall { x: u8 },

    #[error("string at {address:#06x} is not terminated")]
    UnterminatedString { address: u16 },
}

/// Opcodes understood by the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    LoadAccImmediate = 0xA9,
    LoadAccMemory = 0xAD,
    StoreAcc = 0x8D,
    AddWithCarry = 0x6D,
    LoadXImmediate = 0xA2,
    LoadXMemory = 0xAE,
    LoadYImmediate = 0xA0,
    LoadYMemory = 0xAC,
    NoOperation = 0xEA,
    Break = 0x00,
    CompareX = 0xEC,
    BranchNotEqual = 0xD0,
    Increment = 0xEE,
    SystemCall = 0xFF,
}

impl Opcode {
    /// Decodes an opcode byte
    pub fn decode(byte: u8) -> Option<Self> {
        let opcode = match byte {
            0xA9 => Opcode::LoadAccImmediate,
            0xAD => Opcode::LoadAccMemory,
            0x8D => Opcode::StoreAcc,
            0x6D => Opcode::AddWithCarry,
            0xA2 => Opcode::LoadXImmediate,
            0xAE => Opcode::LoadXMemory,
            0xA0 => Opcode::LoadYImmediate,
            0xAC => Opcode::LoadYMemory,
            0xEA => Opcode::NoOperation,
            0x00 => Opcode::Break,
            0xEC => Opcode::CompareX,
            0xD0 => Opcode::BranchNotEqual,
            0xEE => Opcode::Increment,
            0xFF => Opcode::SystemCall,
            _ => return None,
        };
        Some(opcode)
    }

    /// Instruction width in bytes, opcode included
    pub fn width(self) -> u16 {
        match self {
            Opcode::LoadAccImmediate
            | Opcode::LoadXImmediate
            | Opcode::LoadYImmediate
            | Opcode::BranchNotEqual => 2,
            Opcode::LoadAccMemory
            | Opcode::StoreAcc
            | Opcode::AddWithCarry
            | Opcode::LoadXMemory
            | Opcode::LoadYMemory
            | Opcode::CompareX
            | Opcode::Increment => 3,
            Opcode::NoOperation | Opcode::Break | Opcode::SystemCall => 1,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadAccImmediate | Opcode::LoadAccMemory => "LDA",
            Opcode::StoreAcc => "STA",
            Opcode::AddWithCarry => "ADC",
            Opcode::LoadXImmediate | Opcode::LoadXMemory => "LDX",
            Opcode::LoadYImmediate | Opcode::LoadYMemory => "LDY",
            Opcode::NoOperation => "NOP",
            Opcode::Break => "BRK",
            Opcode::CompareX => "CPX",
            Opcode::BranchNotEqual => "BNE",
            Opcode::Increment => "INC",
            Opcode::SystemCall => "SYS",
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// CPU is not executing
    Idle,
    /// Instruction executed, process continues
    Continue,
    /// Process executed BRK
    Break,
    /// Process faulted
    Fault(CpuFault),
}

/// System call numbers, selected by X
const SYS_PRINT_INTEGER: u8 = 1;
const SYS_PRINT_STRING: u8 = 2;

/// The CPU
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    registers: Registers,
    executing: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a saved register set
    pub fn load(&mut self, registers: Registers) {
        self.registers = registers;
    }

    /// Returns a copy of the live registers
    pub fn save(&self) -> Registers {
        self.registers
    }

    /// Zeroes every register
    pub fn clear(&mut self) {
        self.registers = Registers::default();
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn set_executing(&mut self, executing: bool) {
        self.executing = executing;
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Executes one instruction inside `window`
    ///
    /// On a fault the registers keep the values they had when the faulting
    /// instruction was fetched, except IR.
    pub fn step(
        &mut self,
        memory: &mut Memory,
        window: Bounds,
        console: &mut dyn ConsoleDevice,
    ) -> StepOutcome {
        if !self.executing {
            return StepOutcome::Idle;
        }
        match self.execute(memory, window, console) {
            Ok(outcome) => outcome,
            Err(fault) => StepOutcome::Fault(fault),
        }
    }

    fn execute(
        &mut self,
        memory: &mut Memory,
        window: Bounds,
        console: &mut dyn ConsoleDevice,
    ) -> Result<StepOutcome, CpuFault> {
        let pc = self.registers.pc;
        let byte = fetch(memory, window, pc)?;
        self.registers.ir = byte;
        let opcode = Opcode::decode(byte).ok_or(CpuFault::InvalidOpcode { opcode: byte, pc })?;

        let operand = |offset: u16| fetch(memory, window, pc.wrapping_add(offset));
        let (low, high) = match opcode.width() {
            3 => (operand(1)?, operand(2)?),
            2 => (operand(1)?, 0),
            _ => (0, 0),
        };
        let address = u16::from_le_bytes([low, high]);
        let next_pc = pc.wrapping_add(opcode.width());

        let regs = &mut self.registers;
        match opcode {
            Opcode::LoadAccImmediate => regs.acc = low,
            Opcode::LoadAccMemory => regs.acc = load(memory, window, address)?,
            Opcode::StoreAcc => store(memory, window, address, regs.acc)?,
            Opcode::AddWithCarry => {
                regs.acc = regs.acc.wrapping_add(load(memory, window, address)?);
            }
            Opcode::LoadXImmediate => regs.x = low,
            Opcode::LoadXMemory => regs.x = load(memory, window, address)?,
            Opcode::LoadYImmediate => regs.y = low,
            Opcode::LoadYMemory => regs.y = load(memory, window, address)?,
            Opcode::NoOperation => {}
            Opcode::Break => {
                regs.pc = next_pc;
                return Ok(StepOutcome::Break);
            }
            Opcode::CompareX => regs.zero_flag = regs.x == load(memory, window, address)?,
            Opcode::BranchNotEqual => {
                if !regs.zero_flag {
                    let target = (next_pc as usize + low as usize) % window.len();
                    regs.pc = target as u16;
                    return Ok(StepOutcome::Continue);
                }
            }
            Opcode::Increment => {
                let value = load(memory, window, address)?.wrapping_add(1);
                store(memory, window, address, value)?;
            }
            Opcode::SystemCall => match regs.x {
                SYS_PRINT_INTEGER => console.put_text(&regs.y.to_string()),
                SYS_PRINT_STRING => {
                    let text = read_string(memory, window, regs.y as u16)?;
                    console.put_text(&text);
                }
                x => return Err(CpuFault::InvalidSystemCall { x }),
            },
        }

        regs.pc = next_pc;
        Ok(StepOutcome::Continue)
    }
}

fn fetch(memory: &Memory, window: Bounds, pc: u16) -> Result<u8, CpuFault> {
    memory
        .read(window, pc as usize)
        .map_err(|_| CpuFault::PcOutOfBounds { pc })
}

fn load(memory: &Memory, window: Bounds, address: u16) -> Result<u8, CpuFault> {
    memory
        .read(window, address as usize)
        .map_err(|_| CpuFault::AddressOutOfBounds { address })
}

fn store(memory: &mut Memory, window: Bounds, address: u16, value: u8) -> Result<(), CpuFault> {
    memory
        .write(window, address as usize, value)
        .map_err(|_| CpuFault::AddressOutOfBounds { address })
}

fn read_string(memory: &Memory, window: Bounds, start: u16) -> Result<String, CpuFault> {
    if !window.contains_offset(start as usize) {
        return Err(CpuFault::AddressOutOfBounds { address: start });
    }
    let mut text = String::new();
    for offset in start as usize..window.len() {
        let byte = memory
            .read(window, offset)
            .map_err(|_| CpuFault::AddressOutOfBounds { address: start })?;
        if byte == 0 {
            return Ok(text);
        }
        text.push(char::from(byte));
    }
    Err(CpuFault::UnterminatedString { address: start })
}
