//! Simple export example: check a board snapshot and write its fabrication files.

use boardfab::prelude::*;
use std::path::Path;

fn main() -> Result<(), BoardFabError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/clean_board.json".to_string());
    let out_dir = std::env::args().nth(2).unwrap_or_else(|| "fabrication".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_export [board.json] [output dir]");
        std::process::exit(1);
    }

    let board = BoardFabCore::load_board(path)?;
    let report = BoardFabCore::run_drc(&board, DrcOptions::default(), &ApprovalSet::new())?;

    println!("Design rule check of: {}", report.board);
    for message in &report.messages {
        println!("  [{}] {}", message.severity, message.message);
    }
    if report.stats.errors > 0 {
        println!("\nNot exporting, {} errors found.", report.stats.errors);
        std::process::exit(1);
    }

    let written = BoardFabricationExport::new(&board, FabricationSettings::default())
        .write_to_dir(Path::new(&out_dir))?;
    println!("\nWrote {} files:", written.len());
    for file in written {
        println!("  {}", file.display());
    }
    Ok(())
}
