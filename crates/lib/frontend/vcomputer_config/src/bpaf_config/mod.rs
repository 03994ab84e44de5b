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

    vcomputer_config::bpaf_config::mod.rs

    Command line arguments. Every option here overrides the matching value
    from the configuration file.

*/

use std::path::PathBuf;

use bpaf::Bpaf;

use crate::ChannelOrder;

#[derive(Bpaf, Debug, Default)]
#[bpaf(options, version, generate(cli_args))]
pub struct CmdLineArgs {
    #[bpaf(long("config_file"), long("configfile"))]
    pub config_file: Option<PathBuf>,

    // Machine options
    #[bpaf(long)]
    pub ram_size: Option<usize>,
    #[bpaf(long)]
    pub rom_size: Option<usize>,
    #[bpaf(long)]
    pub rom_image: Option<PathBuf>,

    // Display options
    #[bpaf(long)]
    pub channel_order: Option<ChannelOrder>,
    #[bpaf(long)]
    pub frames: Option<u32>,
    #[bpaf(long)]
    pub screenshot: Option<PathBuf>,

    /// Text to type on the emulated keyboard
    #[bpaf(long)]
    pub text: Option<String>,

    #[bpaf(long("no_echo"), long("noecho"), switch)]
    pub no_echo: bool,

    /// Write the device state to this file after the session
    #[bpaf(long)]
    pub snapshot: Option<PathBuf>,
}
