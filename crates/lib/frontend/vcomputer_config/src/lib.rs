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

    vcomputer_config::lib.rs

    Configuration file and command line handling for VComputer frontends.

*/

//! The `vcomputer_config` crate parses VComputer's main configuration file and overlays
//! command line arguments on top of it. Command line arguments always take priority over
//! the configuration file.

mod bpaf_config;

use std::{fmt, path::Path, path::PathBuf, str::FromStr};

use serde_derive::Deserialize;
use vcomputer_core::{
    coreconfig::{DEFAULT_RAM_SIZE, DEFAULT_ROM_SIZE},
    MemoryLayout,
};

pub use bpaf_config::{cli_args, CmdLineArgs};

pub const DEFAULT_FRAMES: u32 = 60;

const fn _default_true() -> bool {
    true
}
const fn _default_ram_size() -> usize {
    DEFAULT_RAM_SIZE
}
const fn _default_rom_size() -> usize {
    DEFAULT_ROM_SIZE
}
const fn _default_frames() -> u32 {
    DEFAULT_FRAMES
}

/// Byte order of the rendered texture.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    #[serde(alias = "rgba")]
    Rgba,
    #[serde(alias = "bgra")]
    Bgra,
}

impl FromStr for ChannelOrder {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "rgba" => Ok(ChannelOrder::Rgba),
            "bgra" => Ok(ChannelOrder::Bgra),
            _ => Err("Bad value for channel_order".to_string()),
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOrder::Rgba => write!(f, "RGBA"),
            ChannelOrder::Bgra => write!(f, "BGRA"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Machine {
    #[serde(default = "_default_ram_size")]
    pub ram_size: usize,
    #[serde(default = "_default_rom_size")]
    pub rom_size: usize,
    /// Optional image loaded at the start of ROM.
    pub rom_image: Option<PathBuf>,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            ram_size:  DEFAULT_RAM_SIZE,
            rom_size:  DEFAULT_ROM_SIZE,
            rom_image: None,
        }
    }
}

impl Machine {
    pub fn layout(&self) -> MemoryLayout {
        MemoryLayout::new(self.ram_size, self.rom_size)
    }
}

#[derive(Debug, Deserialize)]
pub struct Display {
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default = "_default_frames")]
    pub frames: u32,
    pub screenshot: Option<PathBuf>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            channel_order: ChannelOrder::default(),
            frames: DEFAULT_FRAMES,
            screenshot: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Keyboard {
    #[serde(default)]
    pub text: String,
    /// Copy every key pulled from the keyboard into the text buffer.
    #[serde(default = "_default_true")]
    pub echo: bool,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self {
            text: String::new(),
            echo: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileParams {
    #[serde(default)]
    pub machine: Machine,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub keyboard: Keyboard,
    #[serde(default)]
    pub snapshot: Snapshot,
}

impl ConfigFileParams {
    pub fn overlay(&mut self, shell_args: CmdLineArgs) {
        if let Some(ram_size) = shell_args.ram_size {
            self.machine.ram_size = ram_size;
        }
        if let Some(rom_size) = shell_args.rom_size {
            self.machine.rom_size = rom_size;
        }
        if let Some(rom_image) = shell_args.rom_image {
            self.machine.rom_image = Some(rom_image);
        }

        if let Some(channel_order) = shell_args.channel_order {
            self.display.channel_order = channel_order;
        }
        if let Some(frames) = shell_args.frames {
            self.display.frames = frames;
        }
        if let Some(screenshot) = shell_args.screenshot {
            self.display.screenshot = Some(screenshot);
        }

        if let Some(text) = shell_args.text {
            self.keyboard.text = text;
        }
        self.keyboard.echo &= !shell_args.no_echo;

        if let Some(path) = shell_args.snapshot {
            self.snapshot.path = Some(path);
        }
    }
}

pub fn read_config(toml_string: impl AsRef<str>, shell_args: CmdLineArgs) -> Result<ConfigFileParams, anyhow::Error> {
    let mut toml_args: ConfigFileParams = toml::from_str(toml_string.as_ref())?;

    // Command line arguments override config file arguments
    toml_args.overlay(shell_args);

    log::debug!("Configuration: {:?}", toml_args);
    Ok(toml_args)
}

/// Read the TOML configuration from a file path, then parse and overlay the command line.
/// If the file does not exist, defaults are used.
pub fn read_config_file<P>(default_path: P) -> Result<ConfigFileParams, anyhow::Error>
where
    P: AsRef<Path>,
{
    log::debug!("Reading command line arguments...");
    let shell_args = cli_args().run();

    // Allow configuration file path to be overridden by command line argument 'config_file'
    let toml_string = if let Some(configfile_path) = shell_args.config_file.as_ref() {
        std::fs::read_to_string(configfile_path)?
    }
    else if default_path.as_ref().exists() {
        std::fs::read_to_string(default_path)?
    }
    else {
        log::warn!(
            "Config file {} not found, using defaults",
            default_path.as_ref().display()
        );
        String::new()
    };

    read_config(toml_string, shell_args)
}
