use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use clap::Parser;

use pearl::instructions::Instruction;
use pearl::io::{StdInput, StdOutput};
use pearl::loader;
use pearl::runtime::{Config, Mode, Processor};

#[derive(Parser, Debug)]
#[command(
    name = "pearl",
    version,
    about = "Pearl - a hybrid classical/quantum processor emulator and assembly language",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Runs an assembly program on the emulated processor.
    Run {
        /// Program file: .pasm/.asm/.txt text form, or .json structured form.
        program: PathBuf,
        /// Number of simulated qubits.
        #[arg(long, default_value_t = 8)]
        qubits: usize,
        /// Instruction families to accept: classical or hybrid.
        #[arg(long, default_value = "hybrid", value_parser = Mode::from_str)]
        mode: Mode,
        /// Fixed seed for measurement outcomes.
        #[arg(long)]
        seed: Option<u64>,
        /// Classical memory size in cells.
        #[arg(long, default_value_t = 1024)]
        memory: usize,
        /// Classical alu width in bits.
        #[arg(long, default_value_t = 8)]
        bit_width: u32,
        /// Milliseconds to sleep between cycles, for display pacing.
        #[arg(long)]
        delay: Option<u64>,
        /// Prints the machine snapshot and surviving amplitudes after the run.
        #[arg(long)]
        dump_state: bool,
    },
    /// Parses and validates a program without executing it.
    Check {
        /// Program file path.
        program: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            program,
            qubits,
            mode,
            seed,
            memory,
            bit_width,
            delay,
            dump_state,
        } => {
            let instructions = load_or_exit(&program);
            let config = Config {
                qubits,
                memory_size: memory,
                bit_width,
                mode,
            };
            let mut cpu = match seed {
                Some(seed) => {
                    Processor::with_seed(config, seed, Box::new(StdOutput), Box::new(StdInput))
                }
                None => Processor::new(config, Box::new(StdOutput), Box::new(StdInput)),
            };
            cpu.load_instructions(instructions);
            match delay {
                Some(ms) => {
                    while cpu.step() {
                        thread::sleep(Duration::from_millis(ms));
                    }
                }
                None => cpu.run(),
            }
            if dump_state {
                dump(&cpu);
            }
        }
        Commands::Check { program } => {
            let instructions = load_or_exit(&program);
            println!("ok: {} instructions", instructions.len());
        }
    }
}

fn load_or_exit(path: &PathBuf) -> Vec<Instruction> {
    match loader::load_program_file(path) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("error: failed to load {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn dump(cpu: &Processor) {
    match serde_json::to_string_pretty(&cpu.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: could not serialize snapshot: {e}"),
    }
    println!("surviving amplitudes:");
    for (i, amp) in cpu.quantum.nonzero_amplitudes() {
        println!(
            "|{}>: {:.4} + {:.4}i (prob {:.4})",
            cpu.quantum.basis_label(i),
            amp.re,
            amp.im,
            amp.norm_sqr(),
        );
    }
}
