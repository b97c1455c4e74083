// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_blip_content(size: usize) -> String {
    let base = "The cat sat on the mat. Another cat walked by, and the cat watched.\n";
    format!("\n{}", base.repeat(size))
}
