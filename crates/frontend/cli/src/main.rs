use std::fs::{self, File};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use prof_core::cpu_6502::{Cpu6502, CpuModel};
use prof_core::memory::{
    BankSwitchedMemory, LinearMemory, Memory, MmuMemory, TrackSectorMemory,
};
use prof_core::stats::{self, LabelMap};

#[derive(Parser)]
#[command(about = "Cycle-counting 6502/65C02 profiler")]
struct Args {
    /// Program binary: two little-endian load-address bytes plus payload
    binary: String,

    /// CPU model: "6502" or "65c02"
    #[arg(long, default_value = "6502")]
    cpu: String,

    /// Memory model: "linear", "banked", "tracksector" or "mmu"
    #[arg(long, default_value = "linear")]
    memory: String,

    /// Linear memory size in bytes (clamped to 64 KiB)
    #[arg(long, default_value_t = 0x1_0000)]
    mem_size: usize,

    /// Sector-address bits for the tracksector model (1-8)
    #[arg(long, default_value_t = 8)]
    sector_bits: u32,

    /// Start address; defaults to the program's load address
    #[arg(long)]
    start: Option<u16>,

    /// Report range "<address>:<length>", both decimal
    #[arg(long)]
    dump: Option<String>,

    /// Hotspot fraction in [0, 1]
    #[arg(long, default_value_t = 0.1)]
    percent: f64,

    /// Cutoff strategy: "distinct" or "rank"
    #[arg(long, default_value = "distinct")]
    strategy: String,

    /// JSON label map file, e.g. {"2049": ["start", "loop"]}
    #[arg(long)]
    labels: Option<String>,

    /// Report output file
    #[arg(long, default_value = "hotspots.txt")]
    out: String,

    /// Print the run summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model = match args.cpu.as_str() {
        "6502" => CpuModel::Mos6502,
        "65c02" => CpuModel::Wdc65C02,
        other => bail!("unsupported cpu model: {other}"),
    };
    let memory: Box<dyn Memory> = match args.memory.as_str() {
        "linear" => Box::new(LinearMemory::new(args.mem_size)),
        "banked" => Box::new(BankSwitchedMemory::new()),
        "tracksector" => Box::new(TrackSectorMemory::new(args.sector_bits)),
        "mmu" => Box::new(MmuMemory::new()),
        other => bail!("unsupported memory model: {other}"),
    };

    let data = fs::read(&args.binary).with_context(|| format!("reading {}", args.binary))?;
    let mut cpu = Cpu6502::new(memory, model);
    let (load_addr, len) = cpu.load_program(&data)?;
    info!("loaded {len} bytes at {load_addr:#06X}");

    let start = args.start.unwrap_or(load_addr);
    // On a fault the partial cycle count is discarded along with the run.
    cpu.run(start)
        .with_context(|| format!("run from {start:#06X} failed"))?;
    println!("{} cycles", cpu.num_cycles());

    if let Some(dump) = args.dump.as_deref() {
        let (addr, dump_len) = stats::parse_dump_range(dump)?;
        let end = (addr as u32 + dump_len - 1) as u16;
        let cutoff = match args.strategy.as_str() {
            "distinct" => stats::distinct_cutoff(&cpu.memory, addr, end, args.percent)?,
            "rank" => stats::rank_cutoff(&cpu.memory, addr, end, args.percent)?,
            other => bail!("unsupported cutoff strategy: {other}"),
        };
        let labels = match args.labels.as_deref() {
            Some(path) => {
                let text =
                    fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
                stats::parse_label_map(&text)?
            }
            None => LabelMap::new(),
        };
        let mut report = File::create(&args.out)
            .with_context(|| format!("creating {}", args.out))?;
        stats::render_report(&mut cpu.memory, addr, end, cutoff, &labels, &mut report)?;
        info!("report written to {}", args.out);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cpu.state())?);
    }

    cpu.memory.close()?;
    Ok(())
}
