use crate::{mem_size::MemSize, name_pattern::compile_patterns, ERR, YES};
use memmap2::Mmap;
use npzs::{NpyArray, NpzArchive, NpzEntry, NpzError};
use std::{cmp::max, fs::File, path::PathBuf, process::ExitCode};

#[derive(Args)]
pub struct ShowArgs {
    /// Archive to inspect
    file: PathBuf,
    /// Only show arrays matching these globs
    #[clap(long, short)]
    filter: Option<String>,
}

impl ShowArgs {
    pub fn show(self) -> ExitCode {
        let Self { file, filter } = self;
        let filter = compile_patterns(filter.as_deref().unwrap_or("*"));

        let file_name = file.display().to_string();
        println!(
            "\
+-{0:-<1$}-+
| {file_name} |
+-{0:-<1$}-+
",
            "",
            file_name.len()
        );

        let map = match File::open(&file).and_then(|f| unsafe { Mmap::map(&f) }) {
            Ok(map) => map,
            Err(e) => {
                println!("{ERR}{e}");
                return ExitCode::FAILURE;
            }
        };
        let npz = match NpzArchive::new(&map) {
            Ok(npz) => npz,
            Err(e) => {
                println!("{ERR}{e}");
                return ExitCode::FAILURE;
            }
        };
        println!("{YES}Members = {}", npz.entries.len());
        println!("{YES}Size    = {}", MemSize(map.len()));
        println!();

        let rows = npz
            .names()
            .zip(npz.entries.values())
            .filter(|(name, _)| filter.is_match(name))
            .map(|(name, entry)| Row::new(name, entry))
            .collect::<Vec<_>>();
        show_rows(&rows);

        if rows.iter().any(|row| row.array.is_err()) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

struct Row<'a> {
    name: &'a str,
    entry: &'a NpzEntry<'a>,
    array: Result<NpyArray<'a>, NpzError>,
}

impl<'a> Row<'a> {
    fn new(name: &'a str, entry: &'a NpzEntry<'a>) -> Self {
        Self {
            name,
            entry,
            array: entry.array(),
        }
    }
}

fn show_rows(rows: &[Row]) {
    const NAME: &str = "Name";
    const STORAGE: &str = "Storage";
    const DTYPE: &str = "DType";
    const ORDER: &str = "Order";
    const SHAPE: &str = "Shape";
    const SIZE: &str = "Size";

    let Some(name_width) = rows.iter().map(|r| r.name.len()).max() else {
        println!("{ERR}No array matched.");
        return;
    };
    let name_width = max(name_width, NAME.len());

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let storage = format!(
            "{} {}",
            row.entry.compression().name(),
            MemSize(row.entry.compressed_size())
        );
        match &row.array {
            Ok(array) => cells.push([
                storage,
                array.dtype.to_string(),
                if array.fortran_order { "F" } else { "C" }.to_string(),
                format!("{:?}", array.shape),
                MemSize(array.nbytes()).to_string(),
            ]),
            Err(e) => cells.push([storage, e.to_string(), "".into(), "".into(), "".into()]),
        }
    }
    let mut widths = [STORAGE, DTYPE, ORDER, SHAPE, SIZE].map(str::len);
    for (row, cell) in rows.iter().zip(&cells) {
        if row.array.is_ok() {
            for (w, c) in widths.iter_mut().zip(cell) {
                *w = max(*w, c.len());
            }
        }
    }
    let [ws, wd, wo, wsh, wsz] = widths;

    let line = format!(
        "+-{0:-<name_width$}-+-{0:-<ws$}-+-{0:-<wd$}-+-{0:-<wo$}-+-{0:-<wsh$}-+-{0:-<wsz$}-+",
        ""
    );
    println!("{line}");
    println!("| {NAME:^name_width$} | {STORAGE:^ws$} | {DTYPE:^wd$} | {ORDER:^wo$} | {SHAPE:^wsh$} | {SIZE:^wsz$} |");
    println!("{line}");
    for (row, [s, d, o, sh, sz]) in itertools::izip!(rows, cells) {
        let name = row.name;
        match &row.array {
            Ok(_) => println!(
                "| {name:<name_width$} | {s:<ws$} | {d:<wd$} | {o:^wo$} | {sh:<wsh$} | {sz:>wsz$} |"
            ),
            Err(_) => println!("| {name:<name_width$} | {s:<ws$} | {ERR}{d}"),
        }
    }
    println!("{line}");
}
