//! Interaction with the person in front of the board.

use anyhow::{anyhow, Context};
use balance_board::{
    balance_board_sys::{Channel, Unit},
    display::DisplayFrame,
    sink::DisplaySink,
    BoardError, KnownWeight, Operator,
};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Calibration prompts on stdout, answers on stdin.
pub struct Terminal {
    unit: Unit,
}

impl Terminal {
    pub fn new(unit: Unit) -> Self {
        Terminal { unit }
    }

    fn read_line(&mut self) -> balance_board::Result<String> {
        io::stdout().flush().context("flushing stdout")?;
        let mut line = String::new();
        let nb_read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading stdin")?;
        if nb_read == 0 {
            return Err(anyhow!("stdin closed during calibration").into());
        }
        Ok(line)
    }
}

impl Operator for Terminal {
    fn confirm_unloaded(&mut self) -> balance_board::Result<()> {
        println!("{}", "Step 1: remove everything from the board.".bold());
        print!("Press Enter when the board is empty...");
        self.read_line()?;
        Ok(())
    }

    fn ask_known_weight(&mut self, prompt: &str) -> balance_board::Result<String> {
        print!("{} ({}): ", prompt, self.unit);
        self.read_line()
    }

    fn reject_known_weight(&mut self, reason: &BoardError) {
        println!("{}", reason.to_string().red());
    }

    fn confirm_loaded(&mut self, weight: KnownWeight) -> balance_board::Result<()> {
        println!(
            "{}",
            format!("Place {} {} on the board.", weight.get(), self.unit).bold()
        );
        print!("Press Enter to start sampling...");
        self.read_line()?;
        Ok(())
    }
}

/// Rewrites a single status line with the weights of each frame.
#[derive(Default)]
pub struct Console;

impl DisplaySink for Console {
    fn show(&mut self, frame: &DisplayFrame) -> balance_board::Result<()> {
        let mut out = io::stdout();
        write!(out, "\r").context("writing to stdout")?;
        for channel in Channel::ALL {
            let shade = frame.intensity(channel);
            let label = format!("{} {:6.1}", channel, frame.weights[channel]);
            write!(out, "{}  ", label.truecolor(shade, 100, 255 - shade))
                .context("writing to stdout")?;
        }
        let balance = match frame.balance {
            Some(p) => format!("({:+.2}, {:+.2})", p.x, p.y),
            None => "(empty)".dimmed().to_string(),
        };
        write!(
            out,
            "total {:6.1} {}  balance {:<16}",
            frame.total, frame.unit, balance
        )
        .context("writing to stdout")?;
        out.flush().context("flushing stdout")?;
        Ok(())
    }
}
