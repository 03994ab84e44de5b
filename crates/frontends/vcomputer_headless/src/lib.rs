/*
    VComputer

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    vcomputer_headless::lib.rs

    VComputer headless frontend.

*/

//! VComputer headless front-end main library component.
//!
//! Runs a scripted session against the keyboard and TDA without a window. The last
//! rendered frame can be written to a PNG file and the device state to a JSON file.

#![forbid(unsafe_code)]

pub mod host;
pub mod render_worker;
pub mod session;

use crate::session::run_session;

pub fn run() {
    env_logger::init();

    // Resolve the configuration by parsing the configuration toml and merging it with
    // command line arguments.
    let config = match vcomputer_config::read_config_file("./vcomputer.toml") {
        Ok(config) => config,
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) => {
                eprintln!("Error reading configuration file:\n{}", e);
                std::process::exit(1);
            }
            None => {
                eprintln!(
                    "Failed to parse configuration file. There may be a typo or otherwise invalid toml:\n{}",
                    e
                );
                std::process::exit(1);
            }
        },
    };

    log::info!(
        "Starting session: {} KiB RAM, {} KiB ROM, {} frames ({})",
        config.machine.ram_size / 1024,
        config.machine.rom_size / 1024,
        config.display.frames,
        config.display.channel_order
    );

    match run_session(&config) {
        Ok(report) => {
            let stats = &report.stats;
            println!(
                "Ran {} frames: {} keys typed, {} dropped, {} echoed, {} vsync / {} keyboard interrupts",
                stats.frames,
                stats.keys_typed,
                stats.keys_dropped,
                stats.keys_echoed,
                stats.vsync_irqs,
                stats.keyboard_irqs
            );
        }
        Err(e) => {
            log::error!("Session failed: {:?}", e);
            eprintln!("Session failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
