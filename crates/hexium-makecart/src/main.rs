//! Cartridge authoring tool.
//!
//! Builds cartridge images out of bank-type directives and raw binary
//! files. Directives are applied in command-line order, so later ranges
//! override earlier ones and each file import uses the most recent
//! `--fill` value for its tail padding.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::parser::ArgMatches;
use clap::{Arg, ArgAction, Command};
use hexium_core::cartridge::Cartridge;
use hexium_core::cartridge::header::BankType;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("makecart")
        .about("Pack binary files into a cartridge (.crt) image")
        .after_help(
            "Bank directives are applied in-order from left to right. \
             Banks are numbered in CPU bank space; the first cartridge bank is 32.",
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .value_name("TEXT")
                .help("Description field (32 bytes, NUL padded)"),
        )
        .arg(
            Arg::new("author")
                .long("author")
                .value_name("TEXT")
                .help("Author field (32 bytes, NUL padded)"),
        )
        .arg(
            Arg::new("copyright")
                .long("copyright")
                .value_name("TEXT")
                .help("Copyright field (32 bytes, NUL padded)"),
        )
        .arg(
            Arg::new("program-version")
                .long("program-version")
                .value_name("TEXT")
                .help("Program version field (32 bytes, NUL padded)"),
        )
        .arg(
            Arg::new("fill")
                .long("fill")
                .value_name("VALUE")
                .action(ArgAction::Append)
                .help(
                    "Fill value for partially-filled banks; decimal or hex with a '$' or '0x' \
                     prefix. 8-bit values repeat every byte, 16-bit every two, 32-bit every four",
                ),
        )
        .arg(
            Arg::new("rom-file")
                .long("rom-file")
                .value_names(["START_BANK", "FILE"])
                .num_args(2..)
                .action(ArgAction::Append)
                .help("Define ROM banks from files, tightly packed from START_BANK"),
        )
        .arg(
            Arg::new("ram")
                .long("ram")
                .value_names(["START_BANK", "END_BANK"])
                .num_args(1..=2)
                .action(ArgAction::Append)
                .help("Define uninitialized RAM banks"),
        )
        .arg(
            Arg::new("ram-file")
                .long("ram-file")
                .value_names(["START_BANK", "FILE"])
                .num_args(2..)
                .action(ArgAction::Append)
                .help("Define pre-initialized RAM banks from files"),
        )
        .arg(
            Arg::new("nvram")
                .long("nvram")
                .value_names(["START_BANK", "END_BANK"])
                .num_args(1..=2)
                .action(ArgAction::Append)
                .help("Define uninitialized NVRAM banks"),
        )
        .arg(
            Arg::new("nvram-file")
                .long("nvram-file")
                .value_names(["START_BANK", "FILE"])
                .num_args(2..)
                .action(ArgAction::Append)
                .help("Define pre-initialized NVRAM banks from files"),
        )
        .arg(
            Arg::new("nvram-value")
                .long("nvram-value")
                .value_names(["START_BANK", "END_BANK"])
                .num_args(1..=2)
                .action(ArgAction::Append)
                .help("Define pre-initialized NVRAM banks holding the fill value"),
        )
        .arg(
            Arg::new("none")
                .long("none")
                .value_names(["START_BANK", "END_BANK"])
                .num_args(1..=2)
                .action(ArgAction::Append)
                .help("Define unpopulated banks (the default for unmentioned banks)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT.CRT")
                .help("Cartridge file to write (.crt, or .crt.gz for compressed)"),
        )
}

/// One bank directive with its command-line position.
#[derive(Debug)]
enum Directive {
    Fill(u32),
    Import(BankType, u8, Vec<PathBuf>),
    Range(BankType, u8, u8),
    RangeFill(BankType, u8, u8),
}

fn parse_bank(text: &str) -> Result<u8> {
    let bank: u8 = text
        .parse()
        .with_context(|| format!("invalid bank number \"{text}\""))?;
    if bank < 32 {
        bail!("bank {bank} is below the cartridge space (32..=255)");
    }
    Ok(bank)
}

/// Fill values repeat at their natural width: an 8-bit value is replicated
/// into all four pattern bytes, a 16-bit value into both halves.
fn parse_fill(text: &str) -> Result<u32> {
    let mut value = if let Some(hex) = text.strip_prefix('$') {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = text.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse()
    }
    .with_context(|| format!("invalid fill value \"{text}\""))?;

    if value & 0xFFFF_FF00 == 0 {
        value |= value << 8;
    }
    if value & 0xFFFF_0000 == 0 {
        value |= value << 16;
    }
    Ok(value)
}

/// Collects every occurrence of `id` with the command-line index of its
/// first value, so directives of different kinds can be replayed in order.
fn occurrences<'a>(
    matches: &'a ArgMatches,
    id: &str,
) -> impl Iterator<Item = (usize, Vec<&'a String>)> {
    let indices: Vec<usize> = matches.indices_of(id).into_iter().flatten().collect();
    let mut cursor = 0;
    matches
        .get_occurrences::<String>(id)
        .into_iter()
        .flatten()
        .map(move |occurrence| {
            let values: Vec<&String> = occurrence.collect();
            let index = indices[cursor];
            cursor += values.len();
            (index, values)
        })
}

fn range_directive(values: &[&String], bank_type: BankType, fill: bool) -> Result<Directive> {
    let start = parse_bank(values[0])?;
    let end = match values.get(1) {
        Some(text) => parse_bank(text)?,
        None => start,
    };
    Ok(if fill {
        Directive::RangeFill(bank_type, start, end)
    } else {
        Directive::Range(bank_type, start, end)
    })
}

fn import_directive(values: &[&String], bank_type: BankType) -> Result<Directive> {
    let start = parse_bank(values[0])?;
    let files = values[1..].iter().map(PathBuf::from).collect();
    Ok(Directive::Import(bank_type, start, files))
}

fn collect_directives(matches: &ArgMatches) -> Result<Vec<Directive>> {
    let mut directives: Vec<(usize, Directive)> = Vec::new();

    for (index, values) in occurrences(matches, "fill") {
        directives.push((index, Directive::Fill(parse_fill(values[0])?)));
    }
    for (index, values) in occurrences(matches, "rom-file") {
        directives.push((index, import_directive(&values, BankType::Rom)?));
    }
    for (index, values) in occurrences(matches, "ram") {
        directives.push((
            index,
            range_directive(&values, BankType::UninitializedRam, false)?,
        ));
    }
    for (index, values) in occurrences(matches, "ram-file") {
        directives.push((index, import_directive(&values, BankType::InitializedRam)?));
    }
    for (index, values) in occurrences(matches, "nvram") {
        directives.push((
            index,
            range_directive(&values, BankType::UninitializedNvram, false)?,
        ));
    }
    for (index, values) in occurrences(matches, "nvram-file") {
        directives.push((index, import_directive(&values, BankType::InitializedNvram)?));
    }
    for (index, values) in occurrences(matches, "nvram-value") {
        directives.push((
            index,
            range_directive(&values, BankType::InitializedNvram, true)?,
        ));
    }
    for (index, values) in occurrences(matches, "none") {
        directives.push((index, range_directive(&values, BankType::None, false)?));
    }

    directives.sort_by_key(|(index, _)| *index);
    Ok(directives.into_iter().map(|(_, directive)| directive).collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let matches = cli().get_matches();
    let mut cartridge = Cartridge::new();

    if let Some(desc) = matches.get_one::<String>("desc") {
        cartridge.header_mut().set_description(desc);
    }
    if let Some(author) = matches.get_one::<String>("author") {
        cartridge.header_mut().set_author(author);
    }
    if let Some(copyright) = matches.get_one::<String>("copyright") {
        cartridge.header_mut().set_copyright(copyright);
    }
    if let Some(version) = matches.get_one::<String>("program-version") {
        cartridge.header_mut().set_program_version(version);
    }

    let mut fill = 0u32;
    for directive in collect_directives(&matches)? {
        match directive {
            Directive::Fill(value) => fill = value,
            Directive::Import(bank_type, start, files) => {
                cartridge
                    .import_files(&files, start, bank_type, fill)
                    .with_context(|| format!("importing files at bank {start}"))?;
            }
            Directive::Range(bank_type, start, end) => {
                cartridge
                    .define_bank_range(start, end, bank_type)
                    .with_context(|| format!("defining banks {start}..={end}"))?;
            }
            Directive::RangeFill(bank_type, start, end) => {
                cartridge
                    .fill(start, end, bank_type, fill)
                    .with_context(|| format!("filling banks {start}..={end}"))?;
            }
        }
    }

    if let Some(output) = matches.get_one::<String>("output") {
        cartridge
            .save(output)
            .with_context(|| format!("writing \"{output}\""))?;
    }

    Ok(())
}
