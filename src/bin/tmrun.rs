// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal host that runs a program image on the CPU core.
//!
//! The host maps the machine's fixed memory layout: the program image is
//! read-only at the code base, work RAM sits in the DRAM window, and the
//! two stacks, quick RAM and the I/O page live at the top of the address
//! space. Region access rights are enforced here, not in the core; a write
//! into ROM comes back as a `BAD_WRITE` error code. Writing a byte to I/O
//! port 0xFFFF_FF01 prints it, which is all the peripherals this host has.
//!
//! Usage: `tmrun <program file> [-s <max steps>]`

use std::process::ExitCode;

use tmvm::memory::{
    Bus, CODE_BEGIN, CSTACK_BEGIN, CSTACK_END, DATA_END, DRAM_BEGIN, DSTACK_BEGIN, DSTACK_END,
    IO_BEGIN, QRAM_BEGIN, QRAM_END,
};
use tmvm::program::Header;
use tmvm::Cpu;

/// Work RAM to provide when the program header does not ask for a size.
const DEFAULT_WRAM: u32 = 0x10_0000;

/// The debug output port.
const PORT_DEBUG_OUT: u32 = IO_BEGIN + 1;

/// The fixed-map host memory.
struct HostBus {
    rom: Vec<u8>,
    wram: Vec<u8>,
    dstack: Vec<u8>,
    cstack: Vec<u8>,
    qram: Vec<u8>,
    io: [u8; 0x100],
    cycles: u64,
}

impl HostBus {
    fn new(rom: Vec<u8>, wram_size: u32) -> Self {
        Self {
            rom,
            wram: vec![0; wram_size as usize],
            dstack: vec![0; (DSTACK_END - DSTACK_BEGIN + 1) as usize],
            cstack: vec![0; (CSTACK_END - CSTACK_BEGIN + 1) as usize],
            qram: vec![0; (QRAM_END - QRAM_BEGIN + 1) as usize],
            io: [0; 0x100],
            cycles: 0,
        }
    }
}

impl Bus for HostBus {
    fn read(&mut self, addr: u32) -> Option<u8> {
        let byte = if (CODE_BEGIN..=DATA_END).contains(&addr) {
            // Program code and data, one flat read-only image.
            self.rom
                .get((addr - CODE_BEGIN) as usize)
                .copied()
                .unwrap_or(0xFF)
        } else if addr >= DRAM_BEGIN && ((addr - DRAM_BEGIN) as usize) < self.wram.len() {
            self.wram[(addr - DRAM_BEGIN) as usize]
        } else if (DSTACK_BEGIN..=DSTACK_END).contains(&addr) {
            self.dstack[(addr - DSTACK_BEGIN) as usize]
        } else if (CSTACK_BEGIN..=CSTACK_END).contains(&addr) {
            self.cstack[(addr - CSTACK_BEGIN) as usize]
        } else if (QRAM_BEGIN..=QRAM_END).contains(&addr) {
            self.qram[(addr - QRAM_BEGIN) as usize]
        } else if addr >= IO_BEGIN {
            self.io[(addr - IO_BEGIN) as usize]
        } else {
            // Open bus: unmapped reads come back as 0xFF.
            0xFF
        };
        Some(byte)
    }

    fn write(&mut self, addr: u32, value: u8) -> Option<()> {
        if addr >= DRAM_BEGIN && ((addr - DRAM_BEGIN) as usize) < self.wram.len() {
            self.wram[(addr - DRAM_BEGIN) as usize] = value;
        } else if (DSTACK_BEGIN..=DSTACK_END).contains(&addr) {
            self.dstack[(addr - DSTACK_BEGIN) as usize] = value;
        } else if (CSTACK_BEGIN..=CSTACK_END).contains(&addr) {
            self.cstack[(addr - CSTACK_BEGIN) as usize] = value;
        } else if (QRAM_BEGIN..=QRAM_END).contains(&addr) {
            self.qram[(addr - QRAM_BEGIN) as usize] = value;
        } else if addr >= IO_BEGIN {
            if addr == PORT_DEBUG_OUT {
                print!("{}", value as char);
            }
            self.io[(addr - IO_BEGIN) as usize] = value;
        } else {
            // ROM, the vector pages and unmapped space are not writable.
            return None;
        }
        Some(())
    }

    fn tick(&mut self, cycles: u32) -> bool {
        self.cycles += cycles as u64;
        true
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args();
    let exec = args.next().unwrap_or_else(|| "tmrun".to_string());
    let Some(program) = args.next() else {
        println!("Runs a program image until the CPU stops.");
        println!("Usage: {exec} <program file> [-s <max steps>]");
        return ExitCode::FAILURE;
    };

    let mut max_steps = u64::MAX;
    while let Some(arg) = args.next() {
        match &arg[..] {
            "-s" => {
                max_steps = args
                    .next()
                    .expect("Expected a step count with parameter -s")
                    .parse()
                    .expect("Expected a number for the step count")
            }
            _ => {
                eprintln!("Unknown parameter \"{arg}\"");
                return ExitCode::FAILURE;
            }
        }
    }

    let file = match std::fs::read(&program) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open program \"{program}\": {e}");
            return ExitCode::FAILURE;
        }
    };

    // A headed program declares its own sizes; a bare image is the ROM.
    let (image, wram_size) = if Header::present(&file) {
        match Header::parse(&file) {
            Ok((header, image)) => {
                log::debug!(
                    "program \"{}\" by {}, {} bytes",
                    header.name,
                    header.author,
                    header.program_size
                );
                let wram = if header.wram_size > 0 { header.wram_size } else { DEFAULT_WRAM };
                (image.to_vec(), wram)
            }
            Err(e) => {
                eprintln!("Bad program header: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        (file, DEFAULT_WRAM)
    };

    if image.len() as u64 > (DATA_END - CODE_BEGIN + 1) as u64 {
        eprintln!("Program image does not fit the ROM window");
        return ExitCode::FAILURE;
    }

    let mut bus = HostBus::new(image, wram_size);
    let mut cpu = Cpu::new();

    let start = std::time::Instant::now();
    let mut steps = 0u64;
    while steps < max_steps && cpu.step(&mut bus) {
        steps += 1;
    }
    let elapsed = start.elapsed();

    println!();
    println!(
        "{steps} steps, {} cycles in {elapsed:?}; EC = {:#04X}",
        bus.cycles,
        cpu.error_code()
    );
    if cpu.error_code() != 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
