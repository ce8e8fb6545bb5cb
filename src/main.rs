use clap::{Parser, Subcommand};
use mcbkit::archive::McbFile;
use mcbkit::batch::verify_dir;
use mcbkit::codec::{decode_codes, encode_text};
use mcbkit::export::McbDocument;
use mcbkit::report::{write_dump, DumpOptions, Summary};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcb", about = "Inspect and edit MCB dialogue containers")]
struct Cli {
    /// Log load/save phases (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every text entry, one per line
    Dump {
        input: PathBuf,
        /// Render position/typing/arrow fields symbolically
        #[arg(short, long)]
        friendly: bool,
    },
    /// Show header facts and layout status
    Info {
        input: PathBuf,
    },
    /// Export texts and extras to JSON
    Export {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build an MCB file from a JSON export
    Import {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load and save, recomputing size and offsets
    Resave {
        input: PathBuf,
        /// Write here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Round-trip check every .mcb file under a directory
    Verify {
        root: PathBuf,
    },
    /// Convert between text and character codes
    Text {
        #[command(subcommand)]
        op: TextOp,
    },
}

#[derive(Subcommand)]
enum TextOp {
    /// Text to codes
    Encode { text: String },
    /// Codes to text
    Decode {
        #[arg(required = true, num_args = 1..)]
        codes: Vec<u16>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, friendly } => {
            let mcb = McbFile::open(&input)?;
            let opts = DumpOptions { friendly, show_path: true };
            write_dump(&mcb, &opts, io::stdout().lock())?;
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let data = std::fs::read(&input)?;
            let s = Summary::from_bytes(&data)?;

            println!("── MCB ──────────────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Wrapped        {}", s.wrapped);
            if let Some(outer) = &s.outer_header {
                println!("  Outer header   {outer}");
            }
            println!("  Header         {} ({})", s.header, s.header_hex);
            println!("  Size           {} B on disk, {} declared", s.byte_len, s.declared_size);
            match s.computed_size {
                Some(size) => println!("  Recomputed     {size}"),
                None       => println!("  Recomputed     (layout overflow)"),
            }
            println!("  Texts          {}", s.text_count);
            println!("  Filenames      {}", s.file_count);
            println!("  Canonical      {}", s.canonical);
            println!("  CRC32          {:08x}", s.crc32);
            if s.reset_on_save > 0 {
                println!("  Slot resets    {} extra block(s) hold non-standard sentinels", s.reset_on_save);
            }
            if s.relocated_on_save > 0 {
                println!("  Slot moves     {} extra block(s) will move their portrait slot", s.relocated_on_save);
            }
        }

        // ── Export / Import ──────────────────────────────────────────────────
        Commands::Export { input, output } => {
            let mcb = McbFile::open(&input)?;
            std::fs::write(&output, McbDocument::from_mcb(&mcb).to_bytes()?)?;
            println!("Exported {} entries → {}", mcb.len(), output.display());
        }

        Commands::Import { input, output } => {
            let doc = McbDocument::from_bytes(&std::fs::read(&input)?)?;
            let mut mcb = doc.to_mcb()?;
            mcb.save_as(&output)?;
            println!("Imported {} entries → {}", mcb.len(), output.display());
        }

        // ── Resave ───────────────────────────────────────────────────────────
        Commands::Resave { input, output } => {
            let mut mcb = McbFile::open(&input)?;
            let dest = output.unwrap_or(input);
            mcb.save_as(&dest)?;
            println!("Saved {}", dest.display());
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { root } => {
            let results = verify_dir(&root);
            let mut failed = 0usize;
            for (path, result) in &results {
                match result {
                    Ok(v) if v.passed() => {
                        let note = if v.byte_identical { "identical" } else { "canonicalized" };
                        println!("  ok    {:<48} {:>5} texts  {note}", path.display(), v.texts);
                    }
                    Ok(v) => {
                        failed += 1;
                        println!("  FAIL  {:<48} model_equal={} idempotent={}",
                            path.display(), v.model_equal, v.idempotent);
                    }
                    Err(e) => {
                        failed += 1;
                        println!("  ERR   {:<48} {e}", path.display());
                    }
                }
            }
            println!("{} file(s), {} failed", results.len(), failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }

        // ── Text ─────────────────────────────────────────────────────────────
        Commands::Text { op } => match op {
            TextOp::Encode { text } => {
                let codes: Vec<String> = encode_text(&text).iter().map(u16::to_string).collect();
                println!("{}", codes.join(" "));
            }
            TextOp::Decode { codes } => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", decode_codes(&codes))?;
            }
        },
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
