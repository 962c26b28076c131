#![no_main]

use libfuzzer_sys::fuzz_target;

use mml_compiler::diagnostics::DiagnosticList;
use mml_compiler::mml::{compile_mml, CompileOptions};
use mml_compiler::smf::{build_smf, SmfOptions};
use mml_compiler::sources::{MmlSource, StringResolver};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let sources = [MmlSource::new("fuzz.mml", s)];
        let options = CompileOptions {
            continue_on_error: true,
            ..CompileOptions::default()
        };
        let mut sink = DiagnosticList::new();

        if let Ok(music) = compile_mml(&sources, &StringResolver::new(), &options, &mut sink) {
            let _ = build_smf(&music, &SmfOptions::default());
        }
    }
});
