//! Run the design rule check on a worker thread and follow its progress.

use boardfab::prelude::*;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::thread;

fn main() -> Result<(), BoardFabError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/thin_trace_board.json".to_string());
    let board = BoardFabCore::load_board(Path::new(&path))?;

    let (tx, rx) = mpsc::channel();
    // set this from another thread (e.g. a UI cancel button) to stop early
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let worker = thread::spawn(move || {
        let mut tx = tx;
        let mut drc = BoardDesignRuleCheck::new(&board, DrcOptions::default()).with_cancel_flag(flag);
        drc.execute(&mut tx).map(|messages| messages.len())
    });

    for event in rx {
        match event {
            DrcEvent::Progress(percent) => println!("[{:>3}%]", percent),
            DrcEvent::Status(status) => println!("       {}", status),
            DrcEvent::Message(message) => {
                println!("       {}: {}", message.severity, message.message)
            }
        }
    }

    match worker.join() {
        Ok(result) => println!("\n{} messages", result?),
        Err(_) => eprintln!("DRC worker panicked"),
    }
    Ok(())
}
