//! mml2smf binary

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use clap::{Args, Parser, Subcommand, ValueEnum};
use mml_compiler::diagnostics::StderrSink;
use mml_compiler::encoding::set_string_encoder;
use mml_compiler::mml::{compile_mml, CompileOptions, ResolvedMusic};
use mml_compiler::project::{load_project_file, StringEncoding};
use mml_compiler::smf::{build_smf, SmfOptions};
use mml_compiler::sources::{FileSystemResolver, MmlSource};

use tracing::info;
use tracing_subscriber::EnvFilter;

use std::fs;
use std::path::{Path, PathBuf};

macro_rules! error {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit(1);
    }};
}

#[derive(Parser)]
#[command(author, version)]
#[command(about = "MML to Standard MIDI File compiler")]
#[command(arg_required_else_help = true)]
struct ArgParser {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile MML files
    Compile(CompileArgs),

    /// Compile the sources listed in a JSON project file
    Project(ProjectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Utf8,
    Latin1,
}

impl From<Encoding> for StringEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Utf8 => StringEncoding::Utf8,
            Encoding::Latin1 => StringEncoding::Latin1,
        }
    }
}

// Compile
// =======

#[derive(Args)]
struct CompileArgs {
    #[arg(short = 'o', long, value_name = "FILE", help = "output file")]
    output: Option<PathBuf>,

    #[arg(long, help = "do not include the default macro library")]
    no_default_macros: bool,

    #[arg(long, help = "report resolve errors and keep compiling")]
    continue_on_error: bool,

    #[arg(long, help = "write the status byte of every channel event")]
    disable_running_status: bool,

    #[arg(long, value_enum, default_value = "utf8", help = "string encoding")]
    encoding: Encoding,

    #[arg(long, help = "write the resolved events as JSON instead of a MIDI file")]
    dump_json: bool,

    #[arg(value_name = "MML_FILE", required = true, help = "mml files")]
    sources: Vec<PathBuf>,
}

fn compile(args: CompileArgs) {
    let output = match &args.output {
        Some(o) => o.clone(),
        None => default_output_path(&args.sources[0], args.dump_json),
    };
    let sources: Vec<MmlSource> = args.sources.iter().map(|p| load_source(p, p)).collect();

    let options = CompileOptions {
        use_default_macros: !args.no_default_macros,
        continue_on_error: args.continue_on_error,
    };
    let smf_options = SmfOptions {
        disable_running_status: args.disable_running_status,
        ..SmfOptions::default()
    };

    set_string_encoder(StringEncoding::from(args.encoding).encoder());

    let resolver = FileSystemResolver::new(PathBuf::from("."));
    let music = compile_sources(&sources, &resolver, &options);

    match args.dump_json {
        true => write_json(output, &music),
        false => write_smf(output, &music, &smf_options),
    }
}

// Project
// =======

#[derive(Args)]
struct ProjectArgs {
    #[arg(short = 'o', long, value_name = "FILE", help = "output file")]
    output: Option<PathBuf>,

    #[arg(value_name = "JSON_FILE", help = "project json file")]
    project_file: PathBuf,
}

fn compile_project(args: ProjectArgs) {
    let pf = match load_project_file(args.project_file) {
        Ok(pf) => pf,
        Err(e) => error!("{}", e),
    };
    let project = &pf.project;

    let output = match (args.output, pf.output_path()) {
        (Some(o), _) | (None, Some(o)) => o,
        (None, None) => default_output_path(&pf.path, false),
    };

    let sources: Vec<MmlSource> = project
        .sources
        .iter()
        .zip(pf.source_paths())
        .map(|(name, path)| load_source(Path::new(name.as_str()), &path))
        .collect();

    let options = CompileOptions {
        use_default_macros: project.use_default_macros,
        continue_on_error: project.continue_on_error,
    };
    let smf_options = SmfOptions {
        disable_running_status: project.disable_running_status,
        ..SmfOptions::default()
    };

    set_string_encoder(project.string_encoding.encoder());

    let resolver = FileSystemResolver::new(pf.parent_path.clone());
    let music = compile_sources(&sources, &resolver, &options);

    write_smf(output, &music, &smf_options);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = ArgParser::parse();

    match args.command {
        Command::Compile(c) => compile(c),
        Command::Project(p) => compile_project(p),
    }
}

fn default_output_path(source: &Path, json: bool) -> PathBuf {
    match json {
        true => source.with_extension("json"),
        false => source.with_extension("mid"),
    }
}

// `name` is used in diagnostics and to resolve `#include`s
fn load_source(name: &Path, path: &Path) -> MmlSource {
    match fs::read_to_string(path) {
        Ok(text) => MmlSource::new(name.to_string_lossy(), text),
        Err(e) => error!("Cannot read {}: {}", path.display(), e),
    }
}

fn compile_sources(
    sources: &[MmlSource],
    resolver: &FileSystemResolver,
    options: &CompileOptions,
) -> ResolvedMusic {
    let mut sink = StderrSink::new();

    let music = match compile_mml(sources, resolver, options, &mut sink) {
        Ok(m) => m,
        Err(e) => error!("{}", e),
    };

    if sink.error_count() > 0 {
        error!("Compiled with {} errors", sink.error_count());
    }
    music
}

fn write_smf(path: PathBuf, music: &ResolvedMusic, options: &SmfOptions) {
    match build_smf(music, options) {
        Ok(data) => write_data(path, data),
        Err(e) => error!("{}", e),
    }
}

fn write_json(path: PathBuf, music: &ResolvedMusic) {
    match serde_json::to_vec_pretty(music) {
        Ok(data) => write_data(path, data),
        Err(e) => error!("Cannot serialize resolved music: {}", e),
    }
}

fn write_data(path: PathBuf, data: Vec<u8>) {
    match fs::write(&path, data) {
        Ok(()) => info!(path = %path.display(), "wrote output"),
        Err(why) => error!("Error writing {}: {}", path.display(), why),
    }
}
